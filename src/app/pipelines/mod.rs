pub mod scoring_pipeline;
pub mod training_pipeline;

pub use scoring_pipeline::{ScoredBatch, ScoredCustomer, ScoringPipeline, SCORED_FILENAME};
pub use training_pipeline::{TrainingPipeline, REPORT_FILENAME};

use std::path::Path;

/// Storage-relative path of `file` inside `dir`.
pub(crate) fn output_path(dir: &str, file: &str) -> String {
    Path::new(dir).join(file).to_string_lossy().into_owned()
}
