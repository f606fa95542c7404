//! Netflix 数据仪表盘
//! CSV 加载、视图聚合与 SVG 图表渲染

pub mod analytics;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod frame;
pub mod handlers;
pub mod middleware;
pub mod render;
pub mod routes;
pub mod services;
pub mod storage;
pub mod telemetry;
