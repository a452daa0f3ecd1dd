pub mod aggregator;
pub mod auditor;
pub mod cleaner;
pub mod etl;
pub mod forecaster;
pub mod joiner;
pub mod loader;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
