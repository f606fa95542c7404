//! HTTP 处理器模块

pub mod analytics;
pub mod charts;
pub mod datasets;
pub mod health;
pub mod metrics;
pub mod page;

use crate::error::AppError;

/// 在阻塞线程池上执行 CPU 密集的计算（视图构建、聚合、渲染）
pub(crate) async fn run_blocking<F, T>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| {
        tracing::error!(error = %e, "Blocking task failed");
        AppError::Internal
    })?
}
