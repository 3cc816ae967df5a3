// Application layer: use cases wired on top of the domain ports.

pub mod pipelines;
pub mod predict;
pub mod stages;

pub use pipelines::{ScoringPipeline, TrainingPipeline};
