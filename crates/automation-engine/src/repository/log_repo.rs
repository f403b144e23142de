//! 执行日志仓储（PostgreSQL）
//!
//! 每条规则在一次派发中的结果写入 automation_execution_log 表，
//! 只增不改，供运维追溯规则为何触发或为何没触发。

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::traits::ExecutionLogStoreTrait;
use crate::error::Result;
use crate::models::ExecutionLogEntry;

/// 执行日志仓储
pub struct PgExecutionLogStore {
    pool: PgPool,
}

impl PgExecutionLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &onboard_shared::Database) -> Self {
        Self::new(db.pool().clone())
    }
}

#[async_trait]
impl ExecutionLogStoreTrait for PgExecutionLogStore {
    async fn append(&self, entry: &ExecutionLogEntry) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO automation_execution_log
                (rule_id, record_id, event_type, conditions_met, action_results,
                 error, duration_ms, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(entry.rule_id)
        .bind(entry.record_id)
        .bind(&entry.event_type)
        .bind(entry.conditions_met)
        .bind(&entry.action_results)
        .bind(&entry.error)
        .bind(entry.duration_ms)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn list_by_record(&self, record_id: i64, limit: i64) -> Result<Vec<ExecutionLogEntry>> {
        let entries = sqlx::query_as::<_, ExecutionLogEntry>(
            r#"
            SELECT id, rule_id, record_id, event_type, conditions_met, action_results,
                   error, duration_ms, created_at
            FROM automation_execution_log
            WHERE record_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(record_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn list_by_rule(&self, rule_id: i64, limit: i64) -> Result<Vec<ExecutionLogEntry>> {
        let entries = sqlx::query_as::<_, ExecutionLogEntry>(
            r#"
            SELECT id, rule_id, record_id, event_type, conditions_met, action_results,
                   error, duration_ms, created_at
            FROM automation_execution_log
            WHERE rule_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(rule_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<ExecutionLogEntry>> {
        let entries = sqlx::query_as::<_, ExecutionLogEntry>(
            r#"
            SELECT id, rule_id, record_id, event_type, conditions_met, action_results,
                   error, duration_ms, created_at
            FROM automation_execution_log
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
