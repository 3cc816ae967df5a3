use crate::domain::model::Table;
use crate::models::{ModelKind, ModelParams};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn models_dir(&self) -> &str;
    fn reports_dir(&self) -> &str;
    fn id_column(&self) -> Option<&str>;
    fn model_kind(&self) -> ModelKind;
    fn model_params(&self) -> ModelParams;
    fn test_size(&self) -> f64;
    fn cv_folds(&self) -> usize;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Output: Send;

    async fn extract(&self) -> Result<Table>;
    async fn transform(&self, data: Table) -> Result<Self::Output>;
    async fn load(&self, result: Self::Output) -> Result<String>;
}
