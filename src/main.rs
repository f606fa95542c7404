//! 仪表盘服务主入口

use netflix_dashboard::{
    cli::{self, Command},
    config::AppConfig,
    db,
    middleware::AppState,
    routes,
    services::{DatasetService, DatasetStore},
    storage, telemetry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let overrides = match cli::parse_args(std::env::args().skip(1)) {
        Ok(Command::Run(overrides)) => overrides,
        Ok(Command::Version) => {
            println!("netflix-dashboard {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Ok(Command::Help) => {
            cli::print_help();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{}", e);
            cli::print_help();
            std::process::exit(1);
        }
    };

    // 按优先级加载：.env.local > .env.development > .env
    if let Ok(env) = std::env::var("DASHBOARD_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    telemetry::set_start_time();

    // 1. 加载配置
    let config = AppConfig::load(&overrides).map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志与指标
    telemetry::init_telemetry(&config.logging);
    telemetry::init_metrics();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Netflix dashboard starting...");

    // 3. 数据库连接池（可选）
    let db_pool = match &config.database.url {
        Some(url) => {
            let pool = db::create_pool(&config.database, url).await?;
            tracing::info!("Database initialized");
            Some(pool)
        }
        None => {
            tracing::info!("No database configured, database import disabled");
            None
        }
    };

    // 4. 对象存储
    let objects = storage::build_object_store(&config.storage)?;
    tracing::info!(storage = objects.kind().as_str(), "Object storage initialized");

    // 5. 数据集缓存与服务
    let store = Arc::new(DatasetStore::new(config.dashboard.cache_capacity));
    let datasets = Arc::new(DatasetService::new(store, objects.clone(), db_pool.clone()));

    let app_state = Arc::new(AppState {
        config: config.clone(),
        db: db_pool,
        objects,
        datasets,
    });

    let app = routes::create_router(app_state);

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    // 超时后强制退出
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(timeout_secs)).await;
        tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(0);
    });
}
