pub mod app;
pub mod config;
pub mod errors;
pub mod lines;
pub mod listeners;
pub mod matcher;
pub mod metrics_consts;
pub mod producer;
pub mod sinks;
