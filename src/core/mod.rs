pub mod artifacts;
pub mod encoder;
pub mod engine;
pub mod features;
pub mod metrics;
pub mod preprocess;
pub mod risk;
pub mod scaler;
pub mod split;
pub mod summary;
pub mod training;

pub use crate::domain::model::{Record, Table};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
