//! 业务服务层

pub mod datasets;

pub use datasets::{Dataset, DatasetService, DatasetSource, DatasetStore, LoadOutcome};
