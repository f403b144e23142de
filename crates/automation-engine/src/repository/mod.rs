//! 存储访问层
//!
//! 规则、档案与执行日志都由外部存储持有，引擎通过这里的 trait 注入
//! 访问。提供 PostgreSQL 实现与线程安全的内存实现（测试、基准与
//! 内嵌部署使用）。

pub mod log_repo;
pub mod memory;
pub mod record_repo;
pub mod rule_repo;
pub mod traits;

pub use log_repo::PgExecutionLogStore;
pub use memory::{MemoryExecutionLogStore, MemoryRecordStore, MemoryRuleStore};
pub use record_repo::PgRecordStore;
pub use rule_repo::PgRuleStore;
pub use traits::{ExecutionLogStoreTrait, RecordStoreTrait, RuleStoreTrait};

#[cfg(test)]
pub use traits::{MockExecutionLogStoreTrait, MockRecordStoreTrait, MockRuleStoreTrait};
