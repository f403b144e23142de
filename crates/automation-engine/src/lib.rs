//! 客户档案自动化规则引擎
//!
//! 针对领域事件（档案创建、状态变更等）驱动自动化规则，提供：
//! - 条件树的递归布尔求值
//! - 白名单约束的动作执行（字段写入、批量写入、创建清单项）
//! - 按 (execution_order, id) 顺序的派发，单条规则失败不影响其余规则
//! - 每条规则一条不可变执行日志，含动作明细与耗时
//!
//! 规则、档案与执行日志均由外部存储持有，引擎通过 `repository` 中的
//! trait 注入访问，自身不管理连接生命周期。

pub mod dispatcher;
pub mod error;
pub mod events;
pub mod evaluator;
pub mod executor;
pub mod models;
pub mod operators;
pub mod repository;

pub use dispatcher::{AutomationDispatcher, DispatcherConfig};
pub use error::{EngineError, Result};
pub use events::{AutomationEvent, EventType};
pub use evaluator::ConditionEvaluator;
pub use executor::{ActionExecutor, ExecutionContext, WRITABLE_FIELDS};
pub use models::{
    Action, ActionResult, AutomationRule, Condition, ConditionGroup, ConditionNode,
    DispatchSummary, ExecutionLogEntry, RecordContext,
};
pub use operators::{ConditionOperator, LogicalOperator};
