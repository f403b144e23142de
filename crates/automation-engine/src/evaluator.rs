//! 条件求值器
//!
//! 对条件树做递归布尔求值。求值是纯函数且永不失败：未识别的操作符、
//! 类型不匹配等异常一律降级为 false 并输出诊断日志，不向上传播 ——
//! 一条规则的条件写坏了，只会让它自己不匹配。

use crate::models::{Condition, ConditionGroup, ConditionNode, RecordContext};
use crate::operators::{ConditionOperator, LogicalOperator};
use serde_json::Value;
use tracing::{debug, warn};

/// 条件求值器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 顶层入口
    ///
    /// 缺失的条件树视同空 AND 组，恒为真。
    pub fn evaluate(tree: Option<&ConditionNode>, record: &RecordContext) -> bool {
        match tree {
            None => true,
            Some(node) => Self::evaluate_node(node, record),
        }
    }

    fn evaluate_node(node: &ConditionNode, record: &RecordContext) -> bool {
        match node {
            ConditionNode::Condition(cond) => Self::evaluate_leaf(cond, record),
            ConditionNode::Group(group) => Self::evaluate_group(group, record),
        }
    }

    /// 逻辑组求值
    ///
    /// 空子列表恒为真，与声明的逻辑操作符无关：空组的含义是"未配置
    /// 条件"，而不是零个析取项的经典布尔语义。
    pub fn evaluate_group(group: &ConditionGroup, record: &RecordContext) -> bool {
        if group.children.is_empty() {
            return true;
        }

        match group.operator {
            LogicalOperator::And => group
                .children
                .iter()
                .all(|child| Self::evaluate_node(child, record)),
            LogicalOperator::Or => group
                .children
                .iter()
                .any(|child| Self::evaluate_node(child, record)),
        }
    }

    /// 叶子条件求值
    ///
    /// 字段缺失（或为 null）时只有 is_empty 成立；null 不满足任何
    /// 关系、相等或成员测试，这是刻意的严格策略。
    pub fn evaluate_leaf(cond: &Condition, record: &RecordContext) -> bool {
        let field_value = record.get(&cond.field).filter(|v| !v.is_null());

        let Some(value) = field_value else {
            return matches!(cond.operator, ConditionOperator::IsEmpty);
        };

        match cond.operator {
            ConditionOperator::Equals => Self::strict_eq(value, &cond.value),
            ConditionOperator::NotEquals => !Self::strict_eq(value, &cond.value),
            ConditionOperator::GreaterThan => Self::compare(value, &cond.value, |a, b| a > b),
            ConditionOperator::LessThan => Self::compare(value, &cond.value, |a, b| a < b),
            ConditionOperator::GreaterOrEqual => Self::compare(value, &cond.value, |a, b| a >= b),
            ConditionOperator::LessOrEqual => Self::compare(value, &cond.value, |a, b| a <= b),
            ConditionOperator::Contains => Self::contains(value, &cond.value),
            ConditionOperator::NotContains => !Self::contains(value, &cond.value),
            ConditionOperator::In => Self::in_list(value, &cond.value),
            ConditionOperator::NotIn => {
                // 与 in 对称：value 不是数组时同样判 false，而不是取反为 true
                match cond.value.as_array() {
                    Some(list) => !list.iter().any(|item| Self::strict_eq(value, item)),
                    None => {
                        debug!(field = %cond.field, "not_in 的比较值不是数组，判为不匹配");
                        false
                    }
                }
            }
            ConditionOperator::IsEmpty => Self::is_empty(value),
            ConditionOperator::IsNotEmpty => Self::is_not_empty(value),
            ConditionOperator::IsTrue => Self::matches_bool(value, true),
            ConditionOperator::IsFalse => Self::matches_bool(value, false),
            ConditionOperator::Unknown => {
                warn!(field = %cond.field, "未识别的条件操作符，判为不匹配");
                false
            }
        }
    }

    /// 严格相等
    ///
    /// 不做字符串与数值间的类型转换；数值之间统一转为 f64 比较，
    /// 避免整数与浮点表示差异（如 100 与 100.0）造成误判。
    fn strict_eq(field: &Value, expected: &Value) -> bool {
        if let (Value::Number(a), Value::Number(b)) = (field, expected) {
            return match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
        }

        field == expected
    }

    /// 数值比较
    ///
    /// 两侧都转为数值后比较；任一侧转换失败即为 false（NaN 语义）。
    fn compare<F>(field: &Value, expected: &Value, cmp: F) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        match (Self::as_f64(field), Self::as_f64(expected)) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => {
                debug!("数值比较的输入无法转换为数值，判为不匹配");
                false
            }
        }
    }

    /// 大小写不敏感的子串包含，两侧先转为文本
    fn contains(field: &Value, expected: &Value) -> bool {
        let haystack = Self::as_text(field).to_lowercase();
        let needle = Self::as_text(expected).to_lowercase();
        haystack.contains(&needle)
    }

    /// 列表成员检查
    ///
    /// 比较值必须是数组，否则判 false。
    fn in_list(field: &Value, expected: &Value) -> bool {
        match expected.as_array() {
            Some(list) => list.iter().any(|item| Self::strict_eq(field, item)),
            None => {
                debug!("in 的比较值不是数组，判为不匹配");
                false
            }
        }
    }

    /// 空值判定：假值（null/false/0/空串）或文本表示去空白后为空
    fn is_empty(value: &Value) -> bool {
        Self::is_falsy(value) || Self::as_text(value).trim().is_empty()
    }

    /// 非空判定
    ///
    /// 独立实现而非对 is_empty 取反，保持与历史行为一致：
    /// 假值一律判为"非空不成立"。
    fn is_not_empty(value: &Value) -> bool {
        !Self::is_falsy(value) && !Self::as_text(value).trim().is_empty()
    }

    /// 布尔真值的三种表示：布尔字面量、"true"/"false" 字符串、数值 1/0
    fn matches_bool(value: &Value, want: bool) -> bool {
        match value {
            Value::Bool(b) => *b == want,
            Value::String(s) => s == if want { "true" } else { "false" },
            Value::Number(n) => n.as_f64() == Some(if want { 1.0 } else { 0.0 }),
            _ => false,
        }
    }

    fn is_falsy(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// 转为数值：仅接受数值与数值字符串
    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// 文本表示，用于包含与空值判定
    fn as_text(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(arr) => arr
                .iter()
                .map(Self::as_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => value.to_string(),
        }
    }
}
