//! 关系数据库适配
//! 提供 PostgreSQL 连接池、健康检查和表数据读取

use futures::TryStreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, Secret};
use sqlx::{postgres::PgPoolOptions, Executor, PgPool, Row, ValueRef};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::frame::{Frame, FrameError};

static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("valid regex")
});

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig, url: &Secret<String>) -> Result<PgPool, DbError> {
    tracing::debug!("Creating database connection pool...");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect(url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create database pool: {}", e);
            DbError::ConnectionFailed(e.to_string())
        })?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool created successfully"
    );

    Ok(pool)
}

/// 数据库健康检查
pub async fn health_check(pool: &PgPool) -> HealthStatus {
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => {
            tracing::debug!("Database health check: OK");
            HealthStatus::Healthy
        }
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            HealthStatus::Unhealthy(e.to_string())
        }
    }
}

/// 表数据来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    /// `SELECT * FROM <table>`
    Table(String),
    /// 配置中的查询语句
    Query(String),
}

impl TableSource {
    /// 优先使用表名，否则退回到配置的查询
    pub fn resolve(table: Option<&str>, configured_query: Option<&str>) -> Result<Self, DbError> {
        match (table, configured_query) {
            (Some(table), _) => {
                let table = table.trim();
                if !TABLE_NAME.is_match(table) {
                    return Err(DbError::InvalidTable(table.to_string()));
                }
                Ok(TableSource::Table(table.to_string()))
            }
            (None, Some(query)) if !query.trim().is_empty() => {
                Ok(TableSource::Query(query.trim().to_string()))
            }
            _ => Err(DbError::NoSource),
        }
    }

    pub fn sql(&self, limit: usize) -> String {
        match self {
            TableSource::Table(table) => format!("SELECT * FROM {} LIMIT {}", table, limit),
            TableSource::Query(query) => query.trim_end_matches(';').to_string(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TableSource::Table(table) => table.clone(),
            TableSource::Query(_) => "configured query".to_string(),
        }
    }
}

/// 读取查询结果为数据表，最多 `max_rows` 行
///
/// 使用简单查询协议，所有列以文本形式返回，再按 CSV 相同的规则推断类型。
/// 结果为空时通过 describe 取得列名，得到只有表头的空表。
pub async fn fetch_frame(pool: &PgPool, source: &TableSource, max_rows: usize) -> Result<Frame, DbError> {
    let sql = source.sql(max_rows);
    tracing::debug!(source = %source.describe(), max_rows, "Fetching rows from database");

    let mut collector = RowCollector::new(max_rows);
    {
        let mut stream = sqlx::raw_sql(&sql).fetch(pool);
        while collector.wants_more() {
            let Some(row) = stream.try_next().await? else {
                break;
            };

            let mut cells = Vec::with_capacity(row.len());
            for index in 0..row.len() {
                let value = row.try_get_raw(index)?;
                if value.is_null() {
                    cells.push(None);
                } else {
                    let text = value.as_str().map_err(|e| DbError::Query(sqlx::Error::Decode(e)))?;
                    cells.push(Some(text.to_string()));
                }
            }
            collector.push(|| column_names(row.columns()), cells);
        }
    }

    let described = if collector.has_headers() {
        None
    } else {
        let describe = pool.describe(sql.as_str()).await?;
        Some(column_names(describe.columns()))
    };

    let frame = collector.finish(described)?;

    tracing::info!(
        source = %source.describe(),
        rows = frame.len(),
        columns = frame.width(),
        "Database rows loaded"
    );
    Ok(frame)
}

fn column_names<C: sqlx::Column>(columns: &[C]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

/// 逐行收集查询结果，达到行数上限后停止
#[derive(Debug)]
struct RowCollector {
    headers: Option<Vec<String>>,
    rows: Vec<Vec<Option<String>>>,
    max_rows: usize,
}

impl RowCollector {
    fn new(max_rows: usize) -> Self {
        Self {
            headers: None,
            rows: Vec::new(),
            max_rows,
        }
    }

    fn wants_more(&self) -> bool {
        self.rows.len() < self.max_rows
    }

    fn has_headers(&self) -> bool {
        self.headers.is_some()
    }

    /// 首行决定列名
    fn push(&mut self, headers: impl FnOnce() -> Vec<String>, cells: Vec<Option<String>>) {
        if !self.wants_more() {
            return;
        }
        if self.headers.is_none() {
            self.headers = Some(headers());
        }
        self.rows.push(cells);
    }

    /// `described` 为结果集为空时查询到的列名
    fn finish(self, described: Option<Vec<String>>) -> Result<Frame, DbError> {
        let headers = self
            .headers
            .or(described)
            .filter(|h| !h.is_empty())
            .ok_or(DbError::NoColumns)?;
        Ok(Frame::from_records(headers, self.rows)?)
    }
}

/// 数据库错误类型
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("No table given and no source query configured")]
    NoSource,

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Query returned no columns")]
    NoColumns,

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// 健康状态
#[derive(Debug, Clone)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}
