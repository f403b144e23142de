//! 条件求值器性能基准测试
//!
//! 针对 ConditionEvaluator 的各类操作符与条件树形态做细粒度性能测试。

use automation_engine::{
    Condition, ConditionEvaluator, ConditionGroup, ConditionNode, ConditionOperator, RecordContext,
};
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Map, Value};
use std::hint::black_box;

fn sample_record() -> RecordContext {
    let mut fields = Map::new();
    fields.insert("battery".to_string(), json!("No"));
    fields.insert("num_pallets".to_string(), json!("1-10"));
    fields.insert("num_skus".to_string(), json!("10-50"));
    fields.insert("status".to_string(), json!("new"));
    fields.insert("monthly_orders".to_string(), json!(1200));
    fields.insert("company_name".to_string(), json!("Acme Logistics"));
    RecordContext::new(fields)
}

fn leaf(field: &str, op: ConditionOperator, value: Value) -> ConditionNode {
    ConditionNode::Condition(Condition::new(field, op, value))
}

/// 单叶子条件基准
fn bench_leaf_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaf_operators");
    let record = sample_record();

    let cases = vec![
        ("equals", leaf("battery", ConditionOperator::Equals, json!("No"))),
        (
            "greater_than",
            leaf("monthly_orders", ConditionOperator::GreaterThan, json!(500)),
        ),
        (
            "contains",
            leaf("company_name", ConditionOperator::Contains, json!("ACME")),
        ),
        (
            "not_in",
            leaf(
                "num_pallets",
                ConditionOperator::NotIn,
                json!(["50-100", ">100"]),
            ),
        ),
        (
            "is_not_empty",
            leaf("status", ConditionOperator::IsNotEmpty, json!(null)),
        ),
    ];

    for (name, node) in &cases {
        group.bench_function(*name, |b| {
            b.iter(|| ConditionEvaluator::evaluate(black_box(Some(node)), black_box(&record)))
        });
    }

    group.finish();
}

/// 组合条件树基准
fn bench_condition_trees(c: &mut Criterion) {
    let mut group = c.benchmark_group("condition_trees");
    let record = sample_record();

    let flat_and = ConditionNode::Group(ConditionGroup::and(vec![
        leaf("battery", ConditionOperator::Equals, json!("No")),
        leaf(
            "num_pallets",
            ConditionOperator::NotIn,
            json!(["50-100", ">100"]),
        ),
        leaf(
            "num_skus",
            ConditionOperator::NotIn,
            json!(["50-100", ">100"]),
        ),
    ]));

    let nested = ConditionNode::Group(ConditionGroup::and(vec![
        leaf("battery", ConditionOperator::Equals, json!("No")),
        ConditionNode::Group(ConditionGroup::or(vec![
            leaf("monthly_orders", ConditionOperator::GreaterThan, json!(1000)),
            leaf("status", ConditionOperator::Equals, json!("vip")),
        ])),
    ]));

    let empty = ConditionNode::Group(ConditionGroup::and(vec![]));

    group.bench_function("flat_and_3", |b| {
        b.iter(|| ConditionEvaluator::evaluate(black_box(Some(&flat_and)), black_box(&record)))
    });
    group.bench_function("nested_and_or", |b| {
        b.iter(|| ConditionEvaluator::evaluate(black_box(Some(&nested)), black_box(&record)))
    });
    group.bench_function("empty_group", |b| {
        b.iter(|| ConditionEvaluator::evaluate(black_box(Some(&empty)), black_box(&record)))
    });

    group.finish();
}

criterion_group!(benches, bench_leaf_operators, bench_condition_trees);
criterion_main!(benches);
