//! 日志与追踪系统
//! 初始化结构化日志、指标收集和进程运行时间

use once_cell::sync::OnceCell;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

static START_TIME: OnceCell<Instant> = OnceCell::new();

/// 初始化日志与追踪系统
pub fn init_telemetry(config: &LoggingConfig) {
    // RUST_LOG 优先于配置
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let log_layer = match config.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = %config.format,
        "Telemetry initialized"
    );
}

/// 初始化指标收集器
pub fn init_metrics() {
    // metrics 0.24 的指标在首次使用时创建，这里只登记说明
    metrics::describe_counter!("http_requests_total", "HTTP requests by method and status");
    metrics::describe_histogram!("http_request_duration_seconds", "HTTP request latency");
    metrics::describe_counter!("datasets_loaded_total", "Datasets parsed and cached");
    metrics::describe_counter!("datasets_cache_hits_total", "Loads answered from the dataset cache");
    metrics::describe_gauge!("datasets_cached", "Datasets currently held in memory");
    metrics::describe_counter!("charts_rendered_total", "SVG charts rendered by kind");
    tracing::debug!("Metrics initialized");
}

/// 记录启动时间，重复调用无效
pub fn set_start_time() {
    let _ = START_TIME.set(Instant::now());
}

/// 运行时间（秒），未记录启动时间时为 0
pub fn uptime_secs() -> u64 {
    START_TIME.get().map_or(0, |start| start.elapsed().as_secs())
}
