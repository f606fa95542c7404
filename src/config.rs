//! 配置系统
//! 默认值 → 环境变量（前缀 DASHBOARD_）→ 命令行覆盖，敏感信息使用 Secret 包装

use config::{Config, ConfigError, Environment};
use secrecy::Secret;
use serde::Deserialize;

use crate::analytics::pairplot::{PAIRPLOT_MAX_ROWS, PAIRPLOT_MIN_ROWS, PAIRPLOT_ROW_STEP};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0"
    pub address: String,
    /// 监听端口
    pub port: u16,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
    /// 上传 CSV 的最大体积（MB）
    pub max_upload_mb: usize,
}

impl ServerConfig {
    /// 组合为 `address:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接 URL（未设置时禁用数据库导入）
    #[serde(default)]
    pub url: Option<Secret<String>>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
    /// 未指定表名时使用的查询
    #[serde(default)]
    pub source_query: Option<String>,
    /// 单次导入的最大行数
    pub max_rows: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

/// 仪表盘交互参数
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Pairplot 默认采样行数
    pub pairplot_default_rows: usize,
    /// 采样随机种子
    pub sample_seed: u64,
    /// 内存中缓存的数据集数量上限
    pub cache_capacity: usize,
}

/// 存储类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Local,
    S3,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Local => "local",
            StorageType::S3 => "s3",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageConfig {
    /// 基础路径
    pub base_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3StorageConfig {
    /// 区域
    #[serde(default)]
    pub region: Option<String>,
    /// 端点 URL (用于 MinIO 等兼容服务)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bucket 名称
    pub bucket: String,
    #[serde(default)]
    pub access_key: Option<Secret<String>>,
    #[serde(default)]
    pub secret_key: Option<Secret<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub storage_type: StorageType,
    pub local: LocalStorageConfig,
    pub s3: S3StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&[])
    }

    /// 加载配置，`overrides` 中的键值（如 `server.port`）优先级最高
    pub fn load(overrides: &[(String, String)]) -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .set_default("server.address", "0.0.0.0")?
            .set_default("server.port", 8501)?
            .set_default("server.graceful_shutdown_timeout_secs", 10)?
            .set_default("server.max_upload_mb", 200)?
            .set_default("database.max_connections", 5)?
            .set_default("database.min_connections", 0)?
            .set_default("database.acquire_timeout_secs", 10)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("database.max_rows", 100_000)?
            .set_default("storage.storage_type", "local")?
            .set_default("storage.local.base_path", "./data")?
            .set_default("storage.s3.region", "us-east-1")?
            .set_default("storage.s3.bucket", "dashboard-data")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("dashboard.pairplot_default_rows", 1000)?
            .set_default("dashboard.sample_seed", 42)?
            .set_default("dashboard.cache_capacity", 16)?;

        settings = settings.add_source(
            Environment::with_prefix("DASHBOARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        for (key, value) in overrides {
            settings = settings.set_override(key.as_str(), value.as_str())?;
        }

        let config: AppConfig = settings.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::Message("server.address must not be empty".to_string()));
        }

        if self.server.port < 1024 {
            return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
        }

        if self.server.max_upload_mb == 0 || self.server.max_upload_mb > 2048 {
            return Err(ConfigError::Message(
                "max_upload_mb must be between 1 and 2048".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("max_connections must be >= 1".to_string()));
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        if self.database.max_rows == 0 {
            return Err(ConfigError::Message("database.max_rows must be >= 1".to_string()));
        }

        let rows = self.dashboard.pairplot_default_rows;
        if !(PAIRPLOT_MIN_ROWS..=PAIRPLOT_MAX_ROWS).contains(&rows) || rows % PAIRPLOT_ROW_STEP != 0 {
            return Err(ConfigError::Message(format!(
                "pairplot_default_rows must be between {} and {} in steps of {}",
                PAIRPLOT_MIN_ROWS, PAIRPLOT_MAX_ROWS, PAIRPLOT_ROW_STEP
            )));
        }

        if self.dashboard.cache_capacity == 0 {
            return Err(ConfigError::Message("cache_capacity must be >= 1".to_string()));
        }

        if self.storage.storage_type == StorageType::S3 && self.storage.s3.bucket.trim().is_empty() {
            return Err(ConfigError::Message("storage.s3.bucket must not be empty".to_string()));
        }

        Ok(())
    }
}
