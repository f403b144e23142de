//! 客户入驻平台共享基础库
//!
//! 提供各服务共用的基础能力：
//! - 统一错误类型
//! - 分层配置加载（配置文件 + 环境变量覆盖）
//! - PostgreSQL 连接池管理
//! - 日志初始化

pub mod config;
pub mod database;
pub mod error;
pub mod observability;

pub use config::AppConfig;
pub use database::Database;
pub use error::{Result, SharedError};
