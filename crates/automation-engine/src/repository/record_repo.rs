//! 客户档案仓储（PostgreSQL）
//!
//! 档案字段集中存放在 client_records.fields（JSONB）列中，引擎对
//! 档案的视角因此保持为键值映射，不与具体表结构耦合。字段写入通过
//! jsonb_set 原地更新并刷新 updated_at；每次写入由执行器配套追加一条
//! 审计记录。

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};

use super::traits::RecordStoreTrait;
use crate::error::{EngineError, Result};

/// 客户档案仓储
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &onboard_shared::Database) -> Self {
        Self::new(db.pool().clone())
    }
}

#[async_trait]
impl RecordStoreTrait for PgRecordStore {
    async fn get_fields(&self, record_id: i64) -> Result<Map<String, Value>> {
        let row = sqlx::query("SELECT fields FROM client_records WHERE id = $1")
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "client_record".to_string(),
                id: record_id,
            })?;

        let fields: Value = row.try_get("fields")?;
        match fields {
            Value::Object(map) => Ok(map),
            // 历史数据中 fields 可能为 null
            _ => Ok(Map::new()),
        }
    }

    async fn write_field(&self, record_id: i64, field: &str, value: &Value) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE client_records
            SET fields = jsonb_set(COALESCE(fields, '{}'::jsonb), ARRAY[$2], $3, true),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .bind(field)
        .bind(value)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound {
                entity: "client_record".to_string(),
                id: record_id,
            });
        }

        Ok(())
    }

    async fn append_audit_entry(
        &self,
        record_id: i64,
        actor_id: &str,
        action: &str,
        details: &Value,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO record_audit_log (record_id, actor_id, action, details, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(record_id)
        .bind(actor_id)
        .bind(action)
        .bind(details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_checklist_item(
        &self,
        record_id: i64,
        text: &str,
        assignee: Option<String>,
        auto_created: bool,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO checklist_items (record_id, text, assignee, auto_created, completed, created_at)
            VALUES ($1, $2, $3, $4, FALSE, NOW())
            RETURNING id
            "#,
        )
        .bind(record_id)
        .bind(text)
        .bind(assignee)
        .bind(auto_created)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_repository_methods_exist() {
        // 类型检查：确保方法签名正确
    }
}
