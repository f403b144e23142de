//! 自动化引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("禁止写入的字段: {0}")]
    ForbiddenField(String),

    #[error("规则定义解析失败: rule_id={rule_id}: {reason}")]
    RuleParse { rule_id: i64, reason: String },

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("存储调用超时: {operation}")]
    StoreTimeout { operation: String },

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: i64 },

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("共享组件错误: {0}")]
    Shared(#[from] onboard_shared::SharedError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
