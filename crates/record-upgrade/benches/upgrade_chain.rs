use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use record_upgrade::transform::{self, EnumRemap};
use record_upgrade::{FnStep, NoContext, Record, StepRegistry, UpgradeContext, Upgrader};
use serde_json::json;

fn rename_chain(len: u32) -> Upgrader {
    let mut registry = StepRegistry::new();
    for version in 1..=len {
        let from = format!("field_{version}");
        let to = format!("field_{}", version + 1);
        let step = FnStep::new(
            format!("rename_{version}"),
            move |rec: &mut Record, _ctx: &dyn UpgradeContext| {
                transform::rename_field(rec, &from, &to);
                Ok(())
            },
        );
        registry.register("bench", version, Arc::new(step)).unwrap();
    }
    Upgrader::new(registry)
}

fn sample_record() -> Record {
    let mut rec = Record::new();
    rec.insert("field_1".into(), json!("value"));
    for i in 0..30 {
        rec.insert(format!("other_{i}"), json!({"n": i, "tags": ["a", "b"]}));
    }
    rec
}

fn bench_chain(c: &mut Criterion) {
    let rec = sample_record();

    let short = rename_chain(1);
    c.bench_function("Upgrader::upgrade 1 step", |b| {
        b.iter(|| black_box(short.upgrade("bench", &rec, 1, 2, &NoContext).unwrap()))
    });

    let long = rename_chain(20);
    c.bench_function("Upgrader::upgrade 20 steps", |b| {
        b.iter(|| black_box(long.upgrade("bench", &rec, 1, 21, &NoContext).unwrap()))
    });

    c.bench_function("Upgrader::upgrade at current", |b| {
        b.iter(|| black_box(long.upgrade("bench", &rec, 21, 21, &NoContext).unwrap()))
    });
}

fn bench_remap(c: &mut Criterion) {
    const REMAP: EnumRemap = EnumRemap::new(&[
        ("male", "Male"),
        ("female", "Female"),
        ("other", "Other"),
    ])
    .vocabulary(&["Male", "Female", "Other", "-"])
    .fallback("-")
    .case_insensitive();

    let inputs = ["Male", "FEMALE", "unknown", "other", ""];
    c.bench_function("EnumRemap::remap x5", |b| {
        b.iter(|| {
            for input in inputs {
                black_box(REMAP.remap(input));
            }
        })
    });
}

criterion_group!(benches, bench_chain, bench_remap);
criterion_main!(benches);
