//! 内存存储实现
//!
//! 基于 DashMap 的线程安全内存存储，与 PostgreSQL 实现行为一致，
//! 供测试、基准与内嵌部署使用。

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::traits::{ExecutionLogStoreTrait, RecordStoreTrait, RuleStoreTrait};
use crate::error::{EngineError, Result};
use crate::events::EventType;
use crate::models::{AutomationRule, ExecutionLogEntry};

/// 内存规则存储
#[derive(Default)]
pub struct MemoryRuleStore {
    rules: DashMap<i64, AutomationRule>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加载（或覆盖）一条规则
    pub fn load(&self, rule: AutomationRule) {
        self.rules.insert(rule.id, rule);
    }

    pub fn load_batch(&self, rules: Vec<AutomationRule>) {
        for rule in rules {
            self.load(rule);
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl RuleStoreTrait for MemoryRuleStore {
    async fn list_enabled_for(&self, event_type: EventType) -> Result<Vec<AutomationRule>> {
        let mut rules: Vec<AutomationRule> = self
            .rules
            .iter()
            .filter(|r| r.enabled && r.trigger_event == event_type)
            .map(|r| r.value().clone())
            .collect();

        rules.sort_by_key(|r| (r.execution_order, r.id));
        Ok(rules)
    }
}

/// 档案审计记录（内存实现的存储形态）
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub record_id: i64,
    pub actor_id: String,
    pub action: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

/// 入驻清单项（内存实现的存储形态）
#[derive(Debug, Clone)]
pub struct ChecklistItem {
    pub id: i64,
    pub record_id: i64,
    pub text: String,
    pub assignee: Option<String>,
    pub auto_created: bool,
    pub created_at: DateTime<Utc>,
}

/// 内存档案存储
#[derive(Default)]
pub struct MemoryRecordStore {
    records: DashMap<i64, Map<String, Value>>,
    audit: Mutex<Vec<AuditEntry>>,
    checklist: Mutex<Vec<ChecklistItem>>,
    next_item_id: AtomicI64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            next_item_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    /// 写入一条档案
    pub fn insert_record(&self, record_id: i64, fields: Map<String, Value>) {
        self.records.insert(record_id, fields);
    }

    /// 查询某档案的审计记录（按写入顺序）
    pub fn audit_entries(&self, record_id: i64) -> Vec<AuditEntry> {
        self.audit
            .lock()
            .iter()
            .filter(|e| e.record_id == record_id)
            .cloned()
            .collect()
    }

    /// 查询某档案的清单项（按创建顺序）
    pub fn checklist_items(&self, record_id: i64) -> Vec<ChecklistItem> {
        self.checklist
            .lock()
            .iter()
            .filter(|i| i.record_id == record_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RecordStoreTrait for MemoryRecordStore {
    async fn get_fields(&self, record_id: i64) -> Result<Map<String, Value>> {
        self.records
            .get(&record_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| EngineError::NotFound {
                entity: "client_record".to_string(),
                id: record_id,
            })
    }

    async fn write_field(&self, record_id: i64, field: &str, value: &Value) -> Result<()> {
        let mut record = self
            .records
            .get_mut(&record_id)
            .ok_or_else(|| EngineError::NotFound {
                entity: "client_record".to_string(),
                id: record_id,
            })?;

        record.insert(field.to_string(), value.clone());
        Ok(())
    }

    async fn append_audit_entry(
        &self,
        record_id: i64,
        actor_id: &str,
        action: &str,
        details: &Value,
    ) -> Result<()> {
        self.audit.lock().push(AuditEntry {
            record_id,
            actor_id: actor_id.to_string(),
            action: action.to_string(),
            details: details.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn create_checklist_item(
        &self,
        record_id: i64,
        text: &str,
        assignee: Option<String>,
        auto_created: bool,
    ) -> Result<i64> {
        let id = self.next_item_id.fetch_add(1, Ordering::SeqCst);
        self.checklist.lock().push(ChecklistItem {
            id,
            record_id,
            text: text.to_string(),
            assignee,
            auto_created,
            created_at: Utc::now(),
        });
        Ok(id)
    }
}

/// 内存执行日志存储
#[derive(Default)]
pub struct MemoryExecutionLogStore {
    entries: Mutex<Vec<ExecutionLogEntry>>,
    next_id: AtomicI64,
}

impl MemoryExecutionLogStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl ExecutionLogStoreTrait for MemoryExecutionLogStore {
    async fn append(&self, entry: &ExecutionLogEntry) -> Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = entry.clone();
        stored.id = id;
        self.entries.lock().push(stored);
        Ok(id)
    }

    async fn list_by_record(&self, record_id: i64, limit: i64) -> Result<Vec<ExecutionLogEntry>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .rev()
            .filter(|e| e.record_id == record_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_by_rule(&self, rule_id: i64, limit: i64) -> Result<Vec<ExecutionLogEntry>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .rev()
            .filter(|e| e.rule_id == rule_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<ExecutionLogEntry>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
