//! 数据转换与统计
//!
//! 每次交互都在缓存的数据集上重新执行：列映射 → 数值转换 → 类型过滤 → 聚合

pub mod correlation;
pub mod kpi;
pub mod pairplot;
pub mod scatter;
pub mod stats;
pub mod trends;
pub mod view;

use thiserror::Error;

use crate::error::AppError;

pub use correlation::{correlation_matrix, CorrelationMatrix};
pub use kpi::{compute_kpis, Kpis};
pub use pairplot::{pairplot, PairplotData};
pub use scatter::{scatter, ScatterData};
pub use trends::{count_by_year, YearCount};
pub use view::{coerce_numeric_columns, prepare_view, ColumnMapping, ContentFilter};

/// 规范列名
pub const RELEASE_YEAR: &str = "release_year";
pub const DURATION: &str = "duration";
pub const CONTENT_TYPE: &str = "type";
/// 派生数值列
pub const RELEASE_YEAR_NUM: &str = "release_year_num";
pub const DURATION_NUM: &str = "duration_num";

#[derive(Debug, Error, PartialEq)]
pub enum AnalyticsError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Unknown content type filter: {0}. Must be one of: Todos, Movie, TV Show")]
    InvalidFilter(String),

    #[error("{0}")]
    InsufficientData(String),
}

impl From<AnalyticsError> for AppError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::InsufficientData(msg) => AppError::InsufficientData(msg),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}
