//! 规则仓储（PostgreSQL）
//!
//! 规则定义由创作界面写入 automation_rules 表，conditions 与 actions
//! 以 JSONB 存储。单条规则的定义损坏（未知触发事件、JSON 结构不合法）
//! 只会让这条规则被跳过并告警，不影响同事件下的其余规则。

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::warn;

use super::traits::RuleStoreTrait;
use crate::error::{EngineError, Result};
use crate::events::EventType;
use crate::models::{Action, AutomationRule, ConditionNode};

/// 规则仓储
pub struct PgRuleStore {
    pool: PgPool,
}

impl PgRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &onboard_shared::Database) -> Self {
        Self::new(db.pool().clone())
    }

    /// 解码单行规则
    fn decode_row(row: &PgRow) -> Result<AutomationRule> {
        let id: i64 = row.try_get("id")?;

        let trigger: String = row.try_get("trigger_event")?;
        let trigger_event = EventType::parse(&trigger).ok_or_else(|| EngineError::RuleParse {
            rule_id: id,
            reason: format!("未知的触发事件: {trigger}"),
        })?;

        let conditions: Value = row.try_get("conditions")?;
        let conditions: ConditionNode = if conditions.is_null() {
            ConditionNode::default()
        } else {
            serde_json::from_value(conditions).map_err(|e| EngineError::RuleParse {
                rule_id: id,
                reason: format!("条件树解析失败: {e}"),
            })?
        };

        let actions: Value = row.try_get("actions")?;
        let actions: Vec<Action> = if actions.is_null() {
            Vec::new()
        } else {
            serde_json::from_value(actions).map_err(|e| EngineError::RuleParse {
                rule_id: id,
                reason: format!("动作列表解析失败: {e}"),
            })?
        };

        Ok(AutomationRule {
            id,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            trigger_event,
            enter_only: row.try_get("enter_only")?,
            enter_only_status: row.try_get("enter_only_status")?,
            conditions,
            actions,
            enabled: row.try_get("enabled")?,
            execution_order: row.try_get("execution_order")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl RuleStoreTrait for PgRuleStore {
    async fn list_enabled_for(&self, event_type: EventType) -> Result<Vec<AutomationRule>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, trigger_event, enter_only, enter_only_status,
                   conditions, actions, enabled, execution_order, created_at, updated_at
            FROM automation_rules
            WHERE enabled = TRUE AND trigger_event = $1
            ORDER BY execution_order ASC, id ASC
            "#,
        )
        .bind(event_type.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::decode_row(row) {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    // 外部写入的规则定义属于未经校验的数据，坏一条跳一条
                    warn!(error = %e, "规则定义损坏，跳过该规则");
                }
            }
        }

        Ok(rules)
    }
}
