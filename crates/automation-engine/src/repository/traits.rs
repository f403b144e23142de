//! 仓储 Trait 定义
//!
//! 定义存储接口，便于引擎依赖抽象而非具体实现，支持 mock 测试。
//! 连接的生命周期由调用方管理，引擎只持有注入的句柄。

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::events::EventType;
use crate::models::{AutomationRule, ExecutionLogEntry};

/// 规则存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleStoreTrait: Send + Sync {
    /// 列出监听指定事件且已启用的规则
    ///
    /// 必须按 (execution_order ASC, id ASC) 返回：触发顺序有业务含义，
    /// 前序规则的字段写入对后序规则的条件可见。
    async fn list_enabled_for(&self, event_type: EventType) -> Result<Vec<AutomationRule>>;
}

/// 档案存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStoreTrait: Send + Sync {
    /// 读取档案当前字段快照
    async fn get_fields(&self, record_id: i64) -> Result<Map<String, Value>>;

    /// 写入单个字段并刷新 updated_at
    async fn write_field(&self, record_id: i64, field: &str, value: &Value) -> Result<()>;

    /// 追加一条档案审计记录
    async fn append_audit_entry(
        &self,
        record_id: i64,
        actor_id: &str,
        action: &str,
        details: &Value,
    ) -> Result<()>;

    /// 创建关联的入驻清单项，返回新清单项 ID
    async fn create_checklist_item(
        &self,
        record_id: i64,
        text: &str,
        assignee: Option<String>,
        auto_created: bool,
    ) -> Result<i64>;
}

/// 执行日志存储接口
///
/// 日志只增不改；读取接口供运维排查使用。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionLogStoreTrait: Send + Sync {
    /// 追加一条执行日志，返回新条目 ID
    async fn append(&self, entry: &ExecutionLogEntry) -> Result<i64>;

    /// 按档案查询最近的执行日志
    async fn list_by_record(&self, record_id: i64, limit: i64) -> Result<Vec<ExecutionLogEntry>>;

    /// 按规则查询最近的执行日志
    async fn list_by_rule(&self, rule_id: i64, limit: i64) -> Result<Vec<ExecutionLogEntry>>;

    /// 查询全局最近的执行日志
    async fn list_recent(&self, limit: i64) -> Result<Vec<ExecutionLogEntry>>;
}
