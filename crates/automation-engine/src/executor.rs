//! 动作执行器
//!
//! 按声明顺序执行规则的动作列表。失败隔离粒度是单个动作：一个动作
//! 失败被捕获为失败结果，剩余动作继续执行。对档案的写入只允许落在
//! 固定白名单内，这是防止规则作者写任意列的硬性安全边界。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::models::{Action, ActionResult, RecordContext};
use crate::repository::RecordStoreTrait;

/// 自动化动作允许写入的档案字段白名单
///
/// 状态、审批标记、运营指派与若干能力开关。白名单之外的字段一律
/// 拒绝，不论规则定义里写了什么。
pub const WRITABLE_FIELDS: &[&str] = &[
    "status",
    "approved",
    "auto_approved",
    "assigned_om",
    "assigned_warehouse",
    "portal_enabled",
    "billing_enabled",
];

/// 动作执行上下文：审计归属信息
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub record_id: i64,
    /// 动作归属的操作者（事件中的 actor）
    pub actor_id: String,
    /// 触发动作的规则名，写入审计明细
    pub rule_name: String,
}

/// 动作执行器
pub struct ActionExecutor {
    record_store: Arc<dyn RecordStoreTrait>,
    /// 单次存储调用的超时上限，防止档案存储不可达拖死整条事件流水线
    store_timeout: Duration,
}

impl ActionExecutor {
    pub fn new(record_store: Arc<dyn RecordStoreTrait>, store_timeout: Duration) -> Self {
        Self {
            record_store,
            store_timeout,
        }
    }

    /// 执行动作列表
    ///
    /// 严格按列表顺序执行；每个动作的成败独立记录。成功写入会同步
    /// 叠加到 `record` 快照上，供同一次派发中后序规则的条件读取。
    pub async fn execute(
        &self,
        actions: &[Action],
        record: &mut RecordContext,
        ctx: &ExecutionContext,
    ) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(actions.len());

        for action in actions {
            let result = match action {
                Action::SetField { field, value } => {
                    self.set_field(field, value, record, ctx).await
                }
                Action::SetMultipleFields { fields } => {
                    self.set_multiple_fields(fields, record, ctx).await
                }
                Action::CreateSubtask {
                    text,
                    assignee_field,
                    assignee_static,
                    mark_auto_created,
                } => {
                    self.create_subtask(
                        text,
                        assignee_field.as_deref(),
                        assignee_static.as_deref(),
                        mark_auto_created.unwrap_or(true),
                        record,
                        ctx,
                    )
                    .await
                }
                Action::Unknown => {
                    ActionResult::fail("unknown", Value::Null, "未知的动作类型")
                }
            };

            if !result.success {
                warn!(
                    rule = %ctx.rule_name,
                    record_id = ctx.record_id,
                    kind = %result.kind,
                    error = result.error.as_deref().unwrap_or(""),
                    "动作执行失败"
                );
            }
            results.push(result);
        }

        results
    }

    /// 写入单个白名单字段
    async fn set_field(
        &self,
        field: &str,
        value: &Value,
        record: &mut RecordContext,
        ctx: &ExecutionContext,
    ) -> ActionResult {
        let detail = json!({ "field": field, "value": value });

        match self.write_single_field(field, value, record, ctx).await {
            Ok(()) => ActionResult::ok("set_field", detail),
            Err(e) => ActionResult::fail("set_field", detail, e.to_string()),
        }
    }

    /// 单字段写入的完整流程：白名单校验 -> 存储写入 -> 审计 -> 更新快照
    ///
    /// 白名单校验在任何写入之前，校验失败时档案不发生任何变化。
    async fn write_single_field(
        &self,
        field: &str,
        value: &Value,
        record: &mut RecordContext,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        if !WRITABLE_FIELDS.contains(&field) {
            return Err(EngineError::ForbiddenField(field.to_string()));
        }

        self.with_timeout(
            "write_field",
            self.record_store.write_field(ctx.record_id, field, value),
        )
        .await?;

        let details = json!({
            "automation": ctx.rule_name,
            "field": field,
            "new_value": value,
        });
        self.with_timeout(
            "append_audit_entry",
            self.record_store.append_audit_entry(
                ctx.record_id,
                &ctx.actor_id,
                "automation_set_field",
                &details,
            ),
        )
        .await?;

        record.set(field, value.clone());
        Ok(())
    }

    /// 按映射逐字段写入
    ///
    /// 单个字段失败不阻止其余字段，逐字段结果记录在 detail 中；
    /// 任一字段失败则整个动作标记为失败。
    async fn set_multiple_fields(
        &self,
        fields: &Map<String, Value>,
        record: &mut RecordContext,
        ctx: &ExecutionContext,
    ) -> ActionResult {
        let mut field_results = Vec::with_capacity(fields.len());
        let mut failures = Vec::new();

        for (field, value) in fields {
            match self.write_single_field(field, value, record, ctx).await {
                Ok(()) => field_results.push(json!({
                    "field": field,
                    "value": value,
                    "success": true,
                })),
                Err(e) => {
                    field_results.push(json!({
                        "field": field,
                        "value": value,
                        "success": false,
                        "error": e.to_string(),
                    }));
                    failures.push(format!("{field}: {e}"));
                }
            }
        }

        let detail = json!({ "fields": field_results });
        if failures.is_empty() {
            ActionResult::ok("set_multiple_fields", detail)
        } else {
            ActionResult::fail("set_multiple_fields", detail, failures.join("; "))
        }
    }

    /// 创建入驻清单项
    ///
    /// 负责人优先取档案字段，其次取固定值；都未解析出非空值时仍然
    /// 创建（未指派），只输出一条诊断。
    async fn create_subtask(
        &self,
        text: &str,
        assignee_field: Option<&str>,
        assignee_static: Option<&str>,
        auto_created: bool,
        record: &RecordContext,
        ctx: &ExecutionContext,
    ) -> ActionResult {
        let assignee = assignee_field
            .and_then(|field| record.get(field))
            .and_then(Self::text_value)
            .or_else(|| {
                assignee_static
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
            });

        if assignee.is_none() {
            warn!(
                rule = %ctx.rule_name,
                record_id = ctx.record_id,
                assignee_field = assignee_field.unwrap_or(""),
                "清单项负责人未解析出值，将创建未指派的清单项"
            );
        }

        let detail = json!({
            "text": text,
            "assignee": assignee,
            "auto_created": auto_created,
        });

        match self
            .with_timeout(
                "create_checklist_item",
                self.record_store.create_checklist_item(
                    ctx.record_id,
                    text,
                    assignee.clone(),
                    auto_created,
                ),
            )
            .await
        {
            Ok(item_id) => {
                let mut detail = detail;
                detail["item_id"] = json!(item_id);
                ActionResult::ok("create_subtask", detail)
            }
            Err(e) => ActionResult::fail("create_subtask", detail, e.to_string()),
        }
    }

    /// 标量转为非空文本；空白字符串与非标量视为未解析出值
    fn text_value(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// 给存储调用套上超时，超时折算为存储错误
    async fn with_timeout<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::StoreTimeout {
                operation: operation.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockRecordStoreTrait;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            record_id: 7,
            actor_id: "user-1".to_string(),
            rule_name: "小件免审自动过签".to_string(),
        }
    }

    fn record_with(fields: Value) -> RecordContext {
        match fields {
            Value::Object(map) => RecordContext::new(map),
            _ => panic!("测试数据必须是 JSON 对象"),
        }
    }

    /// 白名单内的字段写入成功：存储写入 + 审计各一次，快照同步更新
    #[tokio::test]
    async fn test_set_field_success() {
        let mut store = MockRecordStoreTrait::new();
        store
            .expect_write_field()
            .withf(|record_id, field, value| {
                *record_id == 7 && field == "status" && *value == json!("signing")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_append_audit_entry()
            .withf(|record_id, actor, action, details| {
                *record_id == 7
                    && actor == "user-1"
                    && action == "automation_set_field"
                    && details["automation"] == json!("小件免审自动过签")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let executor = ActionExecutor::new(Arc::new(store), TIMEOUT);
        let mut record = record_with(json!({}));

        let actions = vec![Action::SetField {
            field: "status".to_string(),
            value: json!("signing"),
        }];
        let results = executor.execute(&actions, &mut record, &ctx()).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert_eq!(record.get("status"), Some(&json!("signing")));
    }

    /// 白名单之外的字段：动作失败，存储完全未被触碰
    #[tokio::test]
    async fn test_set_field_forbidden() {
        // 不设置任何期望：一旦调用存储即 panic
        let store = MockRecordStoreTrait::new();
        let executor = ActionExecutor::new(Arc::new(store), TIMEOUT);
        let mut record = record_with(json!({}));

        let actions = vec![Action::SetField {
            field: "internal_notes".to_string(),
            value: json!("hacked"),
        }];
        let results = executor.execute(&actions, &mut record, &ctx()).await;

        assert!(!results[0].success);
        assert!(results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("禁止写入的字段"));
        assert!(record.get("internal_notes").is_none());
    }

    /// 批量写入：单个字段被拒不阻止其余字段
    #[tokio::test]
    async fn test_set_multiple_fields_continues_past_forbidden() {
        let mut store = MockRecordStoreTrait::new();
        // Map 按键名有序遍历：approved、secret、status，其中 secret 被白名单拒绝
        store.expect_write_field().times(2).returning(|_, _, _| Ok(()));
        store
            .expect_append_audit_entry()
            .times(2)
            .returning(|_, _, _, _| Ok(()));

        let executor = ActionExecutor::new(Arc::new(store), TIMEOUT);
        let mut record = record_with(json!({}));

        let mut fields = Map::new();
        fields.insert("approved".to_string(), json!(true));
        fields.insert("secret".to_string(), json!("x"));
        fields.insert("status".to_string(), json!("signing"));

        let actions = vec![Action::SetMultipleFields { fields }];
        let results = executor.execute(&actions, &mut record, &ctx()).await;

        assert!(!results[0].success);
        let per_field = results[0].detail["fields"].as_array().unwrap();
        assert_eq!(per_field.len(), 3);
        assert_eq!(per_field[0]["success"], json!(true));
        assert_eq!(per_field[1]["success"], json!(false));
        assert_eq!(per_field[2]["success"], json!(true));

        // 被拒字段未写入快照，其余字段已写入
        assert!(record.get("secret").is_none());
        assert_eq!(record.get("approved"), Some(&json!(true)));
        assert_eq!(record.get("status"), Some(&json!("signing")));
    }

    /// 清单项负责人从档案字段解析
    #[tokio::test]
    async fn test_create_subtask_assignee_from_field() {
        let mut store = MockRecordStoreTrait::new();
        store
            .expect_create_checklist_item()
            .withf(|record_id, text, assignee, auto_created| {
                *record_id == 7
                    && text == "安排仓库巡检"
                    && assignee.as_deref() == Some("om-wang")
                    && *auto_created
            })
            .times(1)
            .returning(|_, _, _, _| Ok(301));

        let executor = ActionExecutor::new(Arc::new(store), TIMEOUT);
        let mut record = record_with(json!({"assigned_om": "om-wang"}));

        let actions = vec![Action::CreateSubtask {
            text: "安排仓库巡检".to_string(),
            assignee_field: Some("assigned_om".to_string()),
            assignee_static: None,
            mark_auto_created: None,
        }];
        let results = executor.execute(&actions, &mut record, &ctx()).await;

        assert!(results[0].success);
        assert_eq!(results[0].detail["item_id"], json!(301));
    }

    /// 负责人字段缺失时仍创建未指派的清单项，不报错
    #[tokio::test]
    async fn test_create_subtask_unresolved_assignee() {
        let mut store = MockRecordStoreTrait::new();
        store
            .expect_create_checklist_item()
            .withf(|_, _, assignee, _| assignee.is_none())
            .times(1)
            .returning(|_, _, _, _| Ok(302));

        let executor = ActionExecutor::new(Arc::new(store), TIMEOUT);
        let mut record = record_with(json!({}));

        let actions = vec![Action::CreateSubtask {
            text: "补充联系人".to_string(),
            assignee_field: Some("assigned_om".to_string()),
            assignee_static: None,
            mark_auto_created: Some(false),
        }];
        let results = executor.execute(&actions, &mut record, &ctx()).await;

        assert!(results[0].success);
        assert_eq!(results[0].detail["assignee"], Value::Null);
    }

    /// 未知动作类型记为失败结果，不中断后续动作
    #[tokio::test]
    async fn test_unknown_action_then_next_runs() {
        let mut store = MockRecordStoreTrait::new();
        store.expect_write_field().times(1).returning(|_, _, _| Ok(()));
        store
            .expect_append_audit_entry()
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let executor = ActionExecutor::new(Arc::new(store), TIMEOUT);
        let mut record = record_with(json!({}));

        let actions = vec![
            Action::Unknown,
            Action::SetField {
                field: "approved".to_string(),
                value: json!(true),
            },
        ];
        let results = executor.execute(&actions, &mut record, &ctx()).await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert_eq!(results[0].error.as_deref(), Some("未知的动作类型"));
        assert!(results[1].success);
    }

    /// 存储写入失败折算为动作失败，后续动作继续
    #[tokio::test]
    async fn test_store_error_isolated_per_action() {
        let mut store = MockRecordStoreTrait::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_write_field()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(EngineError::NotFound {
                entity: "client_record".to_string(),
                id: 7,
            }));
        store
            .expect_write_field()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        store
            .expect_append_audit_entry()
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let executor = ActionExecutor::new(Arc::new(store), TIMEOUT);
        let mut record = record_with(json!({}));

        let actions = vec![
            Action::SetField {
                field: "status".to_string(),
                value: json!("signing"),
            },
            Action::SetField {
                field: "approved".to_string(),
                value: json!(true),
            },
        ];
        let results = executor.execute(&actions, &mut record, &ctx()).await;

        assert!(!results[0].success);
        assert!(results[1].success);
        // 失败的写入不应污染快照
        assert!(record.get("status").is_none());
        assert_eq!(record.get("approved"), Some(&json!(true)));
    }
}
