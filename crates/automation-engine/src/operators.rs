//! 条件操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件操作符
///
/// 规则定义来自外部创作界面，属于未经校验的数据源，因此保留
/// `Unknown` 兜底变体：未识别的操作符在求值时记一条诊断并判 false，
/// 而不是让整条规则反序列化失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    // 相等比较（严格相等，不做类型转换）
    Equals,
    NotEquals,

    // 数值比较
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,

    // 文本包含（大小写不敏感）
    Contains,
    NotContains,

    // 列表成员
    In,
    NotIn,

    // 空值检查
    IsEmpty,
    IsNotEmpty,

    // 布尔检查
    IsTrue,
    IsFalse,

    #[serde(other)]
    Unknown,
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterOrEqual => "greater_or_equal",
            Self::LessOrEqual => "less_or_equal",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
            Self::IsTrue => "is_true",
            Self::IsFalse => "is_false",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// 逻辑操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}
