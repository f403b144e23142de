//! 规则派发器
//!
//! 一次派发：针对一个事件，选取监听该事件的启用规则，按序做迁入门控、
//! 条件求值、动作执行，并为每条规则追加一条执行日志。失败隔离在规则
//! 边界：一条规则的缺陷永远不会阻止后续规则或其日志写入。派发器对外
//! 只返回汇总结果，从不抛出错误。
//!
//! 同一档案的两次派发并发进行时，引擎不做跨派发的串行化；需要严格
//! 按档案串行的调用方应在派发器之前自行排队。

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use crate::error::{EngineError, Result};
use crate::evaluator::ConditionEvaluator;
use crate::events::AutomationEvent;
use crate::executor::{ActionExecutor, ExecutionContext};
use crate::models::{
    ActionResult, AutomationRule, DispatchSummary, ExecutionLogEntry, RecordContext,
};
use crate::repository::{ExecutionLogStoreTrait, RecordStoreTrait, RuleStoreTrait};

/// 派发器配置
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// 总开关，关闭后派发直接返回空汇总
    pub enabled: bool,
    /// 单次派发最多处理的规则数
    pub max_rules_per_dispatch: usize,
    /// 单次存储调用的超时上限（毫秒）
    pub store_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_rules_per_dispatch: 100,
            store_timeout_ms: 5000,
        }
    }
}

/// 单条规则在一次派发中的结果
struct RuleOutcome {
    conditions_met: bool,
    action_results: Vec<ActionResult>,
}

/// 规则派发器
///
/// 存储以 trait 对象注入，连接生命周期由调用方管理。
pub struct AutomationDispatcher {
    config: DispatcherConfig,
    rule_store: Arc<dyn RuleStoreTrait>,
    log_store: Arc<dyn ExecutionLogStoreTrait>,
    executor: ActionExecutor,
    store_timeout: Duration,
}

impl AutomationDispatcher {
    pub fn new(
        config: DispatcherConfig,
        rule_store: Arc<dyn RuleStoreTrait>,
        record_store: Arc<dyn RecordStoreTrait>,
        log_store: Arc<dyn ExecutionLogStoreTrait>,
    ) -> Self {
        let store_timeout = Duration::from_millis(config.store_timeout_ms);
        Self {
            executor: ActionExecutor::new(record_store, store_timeout),
            config,
            rule_store,
            log_store,
            store_timeout,
        }
    }

    /// 派发一个事件
    ///
    /// 规则按 (execution_order, id) 顺序串行执行；同一次派发内，前序
    /// 规则的字段写入通过共享的档案上下文对后序规则的条件可见。
    #[instrument(skip(self, event), fields(
        event_id = %event.event_id,
        event_type = %event.event_type,
        record_id = event.record_id
    ))]
    pub async fn dispatch(&self, event: &AutomationEvent) -> DispatchSummary {
        let start = Instant::now();
        let mut summary = DispatchSummary {
            event_id: event.event_id.clone(),
            event_type: event.event_type,
            record_id: event.record_id,
            rules_selected: 0,
            rules_matched: 0,
            actions_executed: 0,
            errors: Vec::new(),
            duration_ms: 0,
        };

        if !self.config.enabled {
            info!("自动化派发已禁用，跳过");
            summary.duration_ms = start.elapsed().as_millis() as i64;
            return summary;
        }

        // 1. 选取规则；选取本身失败时中止整次派发，记一条系统级错误
        let rules = match self
            .with_timeout(
                "list_enabled_for",
                self.rule_store.list_enabled_for(event.event_type),
            )
            .await
        {
            Ok(rules) => rules,
            Err(e) => {
                error!(error = %e, "规则选取失败，中止本次派发");
                summary.errors.push(format!("规则选取失败: {e}"));
                summary.duration_ms = start.elapsed().as_millis() as i64;
                return summary;
            }
        };

        summary.rules_selected = rules.len();
        if rules.is_empty() {
            debug!("无监听该事件的启用规则，跳过");
            summary.duration_ms = start.elapsed().as_millis() as i64;
            return summary;
        }

        if rules.len() > self.config.max_rules_per_dispatch {
            warn!(
                selected = rules.len(),
                max = self.config.max_rules_per_dispatch,
                "超出单次派发规则数上限，超出部分不执行"
            );
        }

        // 2. 共享的档案上下文：动作写入逐条叠加
        let mut record = RecordContext::new(event.record.clone());

        for rule in rules.iter().take(self.config.max_rules_per_dispatch) {
            let rule_start = Instant::now();

            match self.run_rule(rule, event, &mut record).await {
                Ok(outcome) => {
                    if outcome.conditions_met {
                        summary.rules_matched += 1;
                        summary.actions_executed += outcome.action_results.len();

                        for failed in outcome.action_results.iter().filter(|r| !r.success) {
                            summary.errors.push(format!(
                                "规则 {} 动作 {} 失败: {}",
                                rule.name,
                                failed.kind,
                                failed.error.as_deref().unwrap_or("未知原因")
                            ));
                        }
                    }

                    self.append_log(
                        rule,
                        event,
                        outcome.conditions_met,
                        &outcome.action_results,
                        None,
                        rule_start,
                    )
                    .await;
                }
                Err(e) => {
                    // 规则边界兜底：异常只影响本条规则
                    warn!(rule_id = rule.id, error = %e, "规则执行异常，继续后续规则");
                    summary
                        .errors
                        .push(format!("规则 {} 执行异常: {e}", rule.name));
                    self.append_log(rule, event, false, &[], Some(e.to_string()), rule_start)
                        .await;
                }
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as i64;

        info!(
            rules_selected = summary.rules_selected,
            rules_matched = summary.rules_matched,
            actions_executed = summary.actions_executed,
            error_count = summary.errors.len(),
            duration_ms = summary.duration_ms,
            "事件派发完成"
        );

        summary
    }

    /// 执行单条规则：门控 -> 条件求值 -> 动作执行
    async fn run_rule(
        &self,
        rule: &AutomationRule,
        event: &AutomationEvent,
        record: &mut RecordContext,
    ) -> Result<RuleOutcome> {
        // 迁入门控：enter_only 规则只在事件代表一次（符合目标的）状态
        // 迁入时触发，否则按条件不成立处理，不再求值
        if rule.enter_only && !Self::passes_enter_gate(rule, event) {
            debug!(rule_id = rule.id, "迁入门控不通过，跳过条件求值");
            return Ok(RuleOutcome {
                conditions_met: false,
                action_results: Vec::new(),
            });
        }

        if !ConditionEvaluator::evaluate(Some(&rule.conditions), record) {
            return Ok(RuleOutcome {
                conditions_met: false,
                action_results: Vec::new(),
            });
        }

        let ctx = ExecutionContext {
            record_id: event.record_id,
            actor_id: event.actor_id.clone(),
            rule_name: rule.name.clone(),
        };
        let action_results = self.executor.execute(&rule.actions, record, &ctx).await;

        Ok(RuleOutcome {
            conditions_met: true,
            action_results,
        })
    }

    /// 迁入门控判定
    ///
    /// 事件是否代表迁入由调用方在信封里声明；未声明迁入的事件对
    /// enter_only 规则一律不触发。
    fn passes_enter_gate(rule: &AutomationRule, event: &AutomationEvent) -> bool {
        match (&event.entered_status, &rule.enter_only_status) {
            (Some(entered), Some(required)) => entered == required,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// 追加执行日志（尽力而为）
    ///
    /// 日志在该规则的动作全部尝试完之后写入；写入失败只上报告警，
    /// 既不回滚已生效的动作，也不影响派发继续。
    async fn append_log(
        &self,
        rule: &AutomationRule,
        event: &AutomationEvent,
        conditions_met: bool,
        action_results: &[ActionResult],
        rule_error: Option<String>,
        rule_start: Instant,
    ) {
        let entry = ExecutionLogEntry::new(
            rule.id,
            event.record_id,
            event.event_type,
            conditions_met,
            action_results,
            rule_error,
            rule_start.elapsed().as_millis() as i64,
        );

        if let Err(e) = self
            .with_timeout("append_log", self.log_store.append(&entry))
            .await
        {
            error!(rule_id = rule.id, error = %e, "执行日志写入失败");
        }
    }

    /// 给存储调用套上超时，防止单个不可达依赖拖死整条事件流水线
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
