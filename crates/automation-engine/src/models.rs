//! 自动化规则领域模型
//!
//! 规则、条件树、动作与执行结果的数据结构。规则定义由外部创作界面
//! 写入存储，JSON 形态也由其决定；这里的 serde 标注即是该形态的契约。

use crate::events::EventType;
use crate::operators::{ConditionOperator, LogicalOperator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 自动化规则
///
/// 存储中的一条 automation 定义。引擎只读：创建、启停由创作界面负责。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 监听的事件类型
    pub trigger_event: EventType,
    /// 仅在状态迁入时触发，而非停留在该状态期间的每次更新
    #[serde(default)]
    pub enter_only: bool,
    /// enter_only 时进一步限定迁入的目标状态；None 表示任意迁入
    #[serde(default)]
    pub enter_only_status: Option<String>,
    /// 条件树；缺省为空 AND 组，恒为真
    #[serde(default)]
    pub conditions: ConditionNode,
    /// 按声明顺序执行的动作列表
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 同一事件下按此字段升序触发，相同时按 id 升序。
    /// 顺序有业务含义：前序规则的字段写入对后序规则的条件可见。
    #[serde(default)]
    pub execution_order: i32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

/// 条件树节点（叶子条件或逻辑组）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionNode {
    Condition(Condition),
    Group(ConditionGroup),
}

impl Default for ConditionNode {
    /// 空 AND 组：表示"未配置任何条件"，求值恒为真
    fn default() -> Self {
        Self::Group(ConditionGroup::and(Vec::new()))
    }
}

/// 叶子条件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    /// 操作符相关的字面量或数组；is_empty 等操作符不使用该值
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// 逻辑组节点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub operator: LogicalOperator,
    #[serde(default)]
    pub children: Vec<ConditionNode>,
}

impl ConditionGroup {
    pub fn new(operator: LogicalOperator, children: Vec<ConditionNode>) -> Self {
        Self { operator, children }
    }

    pub fn and(children: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::And, children)
    }

    pub fn or(children: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::Or, children)
    }
}

/// 动作定义
///
/// 与条件树一样来自未经校验的外部数据，未识别的动作类型落入
/// `Unknown`，执行时记为失败结果而不是中断。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// 写入单个白名单字段
    SetField { field: String, value: Value },
    /// 按映射逐字段写入；单个字段失败不阻止其余字段
    SetMultipleFields { fields: Map<String, Value> },
    /// 创建关联的入驻清单项
    CreateSubtask {
        text: String,
        /// 从档案字段读取负责人
        #[serde(default)]
        assignee_field: Option<String>,
        /// 固定负责人，assignee_field 未解析出值时使用
        #[serde(default)]
        assignee_static: Option<String>,
        /// 标记为自动创建；缺省为 true
        #[serde(default)]
        mark_auto_created: Option<bool>,
    },
    #[serde(other)]
    Unknown,
}

impl Action {
    /// 动作类型名，用于日志与执行结果
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetField { .. } => "set_field",
            Self::SetMultipleFields { .. } => "set_multiple_fields",
            Self::CreateSubtask { .. } => "create_subtask",
            Self::Unknown => "unknown",
        }
    }
}

/// 单个动作的执行结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// 动作类型名
    pub kind: String,
    /// 实际应用（或尝试应用）的参数
    pub detail: Value,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(kind: &str, detail: Value) -> Self {
        Self {
            kind: kind.to_string(),
            detail,
            success: true,
            error: None,
        }
    }

    pub fn fail(kind: &str, detail: Value, error: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            detail,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// 档案字段上下文
///
/// 引擎视角下的客户档案：一张扁平的字段名到标量的映射。条件求值只读，
/// 动作执行通过 `set` 叠加写入，使同一次派发中后序规则看到前序写入。
#[derive(Debug, Clone, Default)]
pub struct RecordContext {
    fields: Map<String, Value>,
}

impl RecordContext {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// 读取字段值；不存在的键返回 None，Null 值的语义由求值器处理
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// 执行日志条目
///
/// 每条规则在一次派发中的结果审计，追加后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExecutionLogEntry {
    #[serde(default)]
    pub id: i64,
    pub rule_id: i64,
    pub record_id: i64,
    pub event_type: String,
    pub conditions_met: bool,
    /// 动作结果列表（JSON 数组，元素为 ActionResult）
    pub action_results: Value,
    #[serde(default)]
    pub error: Option<String>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl ExecutionLogEntry {
    pub fn new(
        rule_id: i64,
        record_id: i64,
        event_type: EventType,
        conditions_met: bool,
        action_results: &[ActionResult],
        error: Option<String>,
        duration_ms: i64,
    ) -> Self {
        Self {
            id: 0,
            rule_id,
            record_id,
            event_type: event_type.to_string(),
            conditions_met,
            action_results: serde_json::to_value(action_results).unwrap_or(Value::Null),
            error,
            duration_ms,
            created_at: Utc::now(),
        }
    }
}

/// 一次派发的汇总结果
///
/// 派发器对外的唯一返回值：单条规则的失败只体现在 `errors` 列表中，
/// 不会以错误形式抛给调用方。
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    pub event_id: String,
    pub event_type: EventType,
    pub record_id: i64,
    /// 命中触发条件（enabled + trigger_event）的规则数
    pub rules_selected: usize,
    /// 条件成立并执行了动作的规则数
    pub rules_matched: usize,
    /// 尝试执行的动作总数
    pub actions_executed: usize,
    /// 规则粒度的错误描述列表
    pub errors: Vec<String>,
    pub duration_ms: i64,
}
