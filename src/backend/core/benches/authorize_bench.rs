//! Authorization benchmarks. Run with: cargo bench --bench authorize_bench
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

use apex_authz::policy::{
    apply_middleware, with_audit_sink, with_hooks, AbacPolicy, AuditRecord, AuditSink,
    AuthContext, CombinationMode, CompositePolicy, Condition, Hooks, Permission, Policy,
    RbacPolicy, Role, Rule,
};

struct NullSink;

impl AuditSink for NullSink {
    fn record(&self, record: &AuditRecord) {
        black_box(record);
    }
}

fn rbac(subjects: usize) -> RbacPolicy {
    let rbac = RbacPolicy::new("rbac");
    rbac.add_role(Role::new(
        "reader",
        [Permission::MEMORY_READ, Permission::TOOL_LIST],
    ))
    .unwrap();
    rbac.add_role(Role::new(
        "operator",
        [Permission::TOOL_EXECUTE, Permission::EXTERNAL_API],
    ))
    .unwrap();
    for i in 0..subjects {
        let subject = format!("agent-{i}");
        rbac.assign_role(&subject, "reader").unwrap();
        if i % 2 == 0 {
            rbac.assign_role(&subject, "operator").unwrap();
        }
    }
    rbac
}

fn abac(rules: usize) -> AbacPolicy {
    let abac = AbacPolicy::new("abac");
    for i in 0..rules {
        abac.add_rule(
            Rule::allow(format!("rule-{i}"))
                .priority(i as i32)
                .when(Condition::attribute_equals("tenant", format!("tenant-{i}")))
                .when(Condition::permission_is(Permission::TOOL_EXECUTE)),
        )
        .unwrap();
    }
    abac
}

fn bench_rbac(c: &mut Criterion) {
    let mut g = c.benchmark_group("rbac");
    g.measurement_time(Duration::from_secs(5));
    let ctx = AuthContext::new();
    for &n in &[10usize, 1_000, 10_000] {
        let policy = rbac(n);
        g.bench_with_input(BenchmarkId::new("allow", n), &policy, |b, p| {
            b.iter(|| black_box(p.authorize(&ctx, "agent-0", &Permission::TOOL_EXECUTE, "shell")))
        });
        g.bench_with_input(BenchmarkId::new("deny_unknown_subject", n), &policy, |b, p| {
            b.iter(|| black_box(p.authorize(&ctx, "nobody", &Permission::TOOL_EXECUTE, "shell")))
        });
    }
    g.finish();
}

fn bench_abac(c: &mut Criterion) {
    let mut g = c.benchmark_group("abac");
    g.measurement_time(Duration::from_secs(5));
    for &n in &[1usize, 16, 128] {
        let policy = abac(n);
        // lowest priority rule matches, so every rule is checked
        let ctx = AuthContext::new().with_attribute("tenant", "tenant-0");
        g.throughput(Throughput::Elements(n as u64));
        g.bench_with_input(BenchmarkId::new("worst_case_match", n), &policy, |b, p| {
            b.iter(|| black_box(p.authorize(&ctx, "agent", &Permission::TOOL_EXECUTE, "shell")))
        });
    }
    g.finish();
}

fn bench_stack(c: &mut Criterion) {
    let mut g = c.benchmark_group("stack");
    g.measurement_time(Duration::from_secs(5));
    let ctx = AuthContext::new().with_attribute("tenant", "tenant-3");

    let root: Arc<dyn Policy> = Arc::new(CompositePolicy::new(
        "root",
        CombinationMode::DenyIfAny,
        [Arc::new(rbac(100)) as Arc<dyn Policy>, Arc::new(abac(16)) as Arc<dyn Policy>],
    ));
    g.bench_function("composite", |b| {
        b.iter(|| black_box(root.authorize(&ctx, "agent-2", &Permission::TOOL_EXECUTE, "shell")))
    });

    let decorated = apply_middleware(
        root.clone(),
        [
            with_audit_sink(Arc::new(NullSink)),
            with_hooks(Hooks::new().on_authorize(|_, _, _, _| Ok(()))),
        ],
    );
    g.bench_function("composite_hooks_audit", |b| {
        b.iter(|| {
            black_box(decorated.authorize(&ctx, "agent-2", &Permission::TOOL_EXECUTE, "shell"))
        })
    });
    g.finish();
}

criterion_group!(benches, bench_rbac, bench_abac, bench_stack);
criterion_main!(benches);
