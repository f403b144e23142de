//! 统一错误处理模块
//!
//! 定义各服务共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 共享错误类型
#[derive(Debug, Error)]
pub enum SharedError {
    // ==================== 数据库错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    // ==================== 配置错误 ====================
    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    #[error("配置项无效: {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    // ==================== 序列化错误 ====================
    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    // ==================== 内部错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

impl SharedError {
    /// 构造记录未找到错误
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SharedError>;
