//! 事件模型
//!
//! 定义触发自动化规则的领域事件：事件类型枚举与统一事件信封。
//! 事件由外部系统（API 层、导入任务等）构造后交给派发器，引擎本身
//! 不做时间调度，也不订阅消息总线。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// 事件类型枚举
///
/// 序列化为 snake_case 字符串，与规则表中 `trigger_event` 列的取值一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// 客户档案创建
    RecordCreated,
    /// 客户档案字段更新（不含状态流转）
    RecordUpdated,
    /// 客户档案状态流转
    StatusChanged,
}

impl EventType {
    /// 状态流转事件才可能携带 entered_status，供 enter_only 规则门控
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::StatusChanged)
    }

    /// 从存储的字符串解析事件类型，未知取值返回 None
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "record_created" => Some(Self::RecordCreated),
            "record_updated" => Some(Self::RecordUpdated),
            "status_changed" => Some(Self::StatusChanged),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 与 serde 的 snake_case 保持一致，便于在日志和数据库中统一引用
        let s = match self {
            Self::RecordCreated => "record_created",
            Self::RecordUpdated => "record_updated",
            Self::StatusChanged => "status_changed",
        };
        write!(f, "{s}")
    }
}

/// 自动化事件信封
///
/// 进入派发器的事件统一包装在此信封中：
/// - `event_id`（UUID v7）时间有序，便于日志关联与问题排查
/// - `record` 携带档案在事件发生时刻的字段快照，派发过程中引擎会在
///   快照上叠加动作的写入，供后续规则的条件读取
/// - `entered_status` 仅在事件确实代表一次状态迁入时由调用方填写，
///   enter_only 规则的门控以此为准
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationEvent {
    pub event_id: String,
    pub event_type: EventType,
    /// 触发事件的客户档案 ID
    pub record_id: i64,
    /// 档案当前字段快照
    pub record: Map<String, Value>,
    /// 触发动作归属的操作者（用户 ID 或系统标识）
    pub actor_id: String,
    /// 本次事件迁入的状态值；非状态迁移事件为 None
    pub entered_status: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AutomationEvent {
    pub fn new(
        event_type: EventType,
        record_id: i64,
        record: Map<String, Value>,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7().to_string(),
            event_type,
            record_id,
            record,
            actor_id: actor_id.into(),
            entered_status: None,
            timestamp: Utc::now(),
        }
    }

    /// 标记本次事件为一次状态迁入
    pub fn with_entered_status(mut self, status: impl Into<String>) -> Self {
        self.entered_status = Some(status.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_display_matches_serde() {
        for (ty, s) in [
            (EventType::RecordCreated, "record_created"),
            (EventType::RecordUpdated, "record_updated"),
            (EventType::StatusChanged, "status_changed"),
        ] {
            assert_eq!(ty.to_string(), s);
            assert_eq!(serde_json::to_value(ty).unwrap(), json!(s));
            assert_eq!(EventType::parse(s), Some(ty));
        }
    }

    #[test]
    fn test_event_type_parse_unknown() {
        assert_eq!(EventType::parse("record_deleted"), None);
    }

    #[test]
    fn test_event_envelope() {
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("signing"));

        let event = AutomationEvent::new(EventType::StatusChanged, 7, fields, "user-1")
            .with_entered_status("signing");

        assert_eq!(event.record_id, 7);
        assert_eq!(event.entered_status.as_deref(), Some("signing"));
        assert!(!event.event_id.is_empty());
        assert!(event.event_type.is_transition());
    }
}
