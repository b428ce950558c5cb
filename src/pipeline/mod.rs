// Listing pipeline: ingestion, normalization, checkpoints, stage policy and
// the workflow engine that ties them together.

pub mod checkpoint;
pub mod engine;
pub mod ingestion;
pub mod policy;
pub mod processing;
pub mod report;
pub mod retry;
pub mod validation;

pub use engine::WorkflowEngine;
pub use policy::{ActionSet, Stage, StagePlan};
pub use report::RunReport;
