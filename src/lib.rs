pub mod config;
pub mod constants;
pub mod error;
pub mod logging;

// Domain data shapes shared across layers
pub mod domain;

// Ports and their adapters
pub mod app;
pub mod infra;

pub mod observability;
pub mod pipeline;
