use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use helpdesk_dispatch_engine::prelude::*;
use helpdesk_dispatch_engine::routing::rules::first_matching_rule;

const RULE_COUNTS: [usize; 4] = [10, 100, 1000, 5000];

/// Rules that never match, followed by the one that does
fn rule_set(count: usize) -> Vec<AssignmentRule> {
    let mut rules: Vec<AssignmentRule> = (0..count.saturating_sub(1))
        .map(|i| {
            AssignmentRule::new(format!("dept {}", i), i as i64, AssignToType::Group, "g")
                .with_condition(Condition::new(
                    ConditionField::Department,
                    ConditionOperator::In,
                    format!("dept-{}, dept-{}-alt", i, i),
                ))
                .with_condition(Condition::new(ConditionField::Subject, ConditionOperator::Contains, "outage"))
        })
        .collect();

    rules.push(
        AssignmentRule::new("urgent", count as i64, AssignToType::RoundRobin, "g-net")
            .with_condition(Condition::new(ConditionField::Priority, ConditionOperator::Equals, "urgent")),
    );
    rules
}

fn ticket() -> TicketSnapshot {
    TicketSnapshot {
        priority: Some("Urgent".to_string()),
        department: Some("finance".to_string()),
        subject: Some("VPN outage in building 4".to_string()),
        ..Default::default()
    }
}

fn bench_first_matching_rule(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_matching_rule");
    let ticket = ticket();

    for count in RULE_COUNTS {
        let rules = rule_set(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &rules, |b, rules| {
            b.iter(|| first_matching_rule(black_box(rules), black_box(&ticket)))
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("dispatch");
    let ticket = ticket();

    for count in RULE_COUNTS {
        let engine = rt.block_on(async {
            let store = Arc::new(InMemoryStore::new());
            store.add_group(
                Group::new("g-net", "Network")
                    .with_member("a")
                    .with_member("b")
                    .with_member("c"),
            );
            for rule in rule_set(count) {
                store.add_rule(rule);
            }
            DispatchEngine::new(store, DispatchConfig::default())
                .await
                .expect("engine")
        });

        group.bench_with_input(BenchmarkId::from_parameter(count), &engine, |b, engine| {
            b.to_async(&rt).iter(|| engine.dispatch(black_box(&ticket)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_first_matching_rule, bench_dispatch);
criterion_main!(benches);
