use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs a [`Pipeline`] through its extract, transform and load phases.
pub struct PipelineEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> PipelineEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting pipeline...");
        self.monitor.log_stats("Start");

        // Extract
        tracing::info!("Extracting data...");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", raw_data.len());
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("Transforming data...");
        let transformed = self.pipeline.transform(raw_data).await?;
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("Loading results...");
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("Load");

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Table;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPipeline {
        phases: Mutex<Vec<&'static str>>,
    }

    impl RecordingPipeline {
        fn record(&self, phase: &'static str) {
            self.phases.lock().unwrap().push(phase);
        }
    }

    #[async_trait]
    impl Pipeline for RecordingPipeline {
        type Output = usize;

        async fn extract(&self) -> Result<Table> {
            self.record("extract");
            Table::from_csv_bytes(b"a\n1\n2\n3\n")
        }

        async fn transform(&self, data: Table) -> Result<usize> {
            self.record("transform");
            Ok(data.len())
        }

        async fn load(&self, result: usize) -> Result<String> {
            self.record("load");
            Ok(format!("{} rows", result))
        }
    }

    #[tokio::test]
    async fn runs_all_three_phases_in_order() {
        let engine = PipelineEngine::new(RecordingPipeline::default());

        let output = engine.run().await.unwrap();
        assert_eq!(output, "3 rows");
        assert_eq!(
            *engine.pipeline().phases.lock().unwrap(),
            vec!["extract", "transform", "load"]
        );
    }
}
