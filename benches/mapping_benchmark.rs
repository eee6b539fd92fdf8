//! Row mapping benchmarks.
//!
//! Measures:
//! - Plan resolution, cold and through the plan cache
//! - Per-row materialization into tuples and records
//! - Sequential vs parallel batch materialization

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rowbind::{
    materialize, ColumnDef, ColumnMetadata, ColumnType, ConverterRegistry, Instance,
    MapperConfig, RecordShape, Result, Row, RowMapper, RowType, ShapeResolver, TargetDescriptor,
    Value,
};

struct User {
    user_name: String,
    domain: String,
    visits: i64,
    nickname: Option<String>,
}

impl RowType for User {
    fn descriptor() -> TargetDescriptor {
        RecordShape::new("User")
            .param::<String>("userName")
            .param::<String>("domain")
            .param::<i64>("visits")
            .setter::<Option<String>>("nickname")
            .into()
    }

    fn from_instance(instance: Instance) -> Result<Self> {
        let mut record = instance.into_record()?;
        Ok(User {
            user_name: record.take_arg(0)?,
            domain: record.take_arg(1)?,
            visits: record.take_arg(2)?,
            nickname: record.take_prop::<Option<String>>("nickname")?.flatten(),
        })
    }
}

fn columns() -> ColumnMetadata {
    ColumnMetadata::new(vec![
        ColumnDef::new("domain", ColumnType::Text)
            .expect("column")
            .partition_key(0),
        ColumnDef::new("user_name", ColumnType::Text)
            .expect("column")
            .clustering(0),
        ColumnDef::new("visits", ColumnType::Int).expect("column"),
        ColumnDef::new("nickname", ColumnType::Text).expect("column"),
        ColumnDef::new("password_hash", ColumnType::Text).expect("column"),
    ])
    .expect("metadata")
}

fn rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            Row::new(vec![
                Value::Text("example.com".into()),
                Value::Text(format!("user{i}")),
                Value::Int(i as i32),
                if i % 3 == 0 {
                    Value::Null
                } else {
                    Value::Text(format!("nick{i}"))
                },
                Value::Text("hash".into()),
            ])
        })
        .collect()
}

/// Benchmark plan resolution with and without the cache
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    let cols = columns();
    let target = User::descriptor();

    let resolver = ShapeResolver::new(Arc::new(ConverterRegistry::new()));
    group.bench_function("cold", |b| {
        b.iter(|| black_box(resolver.resolve(&cols, &target).expect("resolve")));
    });

    let mapper = RowMapper::with_registry(MapperConfig::default(), Arc::new(ConverterRegistry::new()));
    group.bench_function("cached", |b| {
        b.iter(|| black_box(mapper.resolve(&cols, &target).expect("resolve")));
    });

    group.finish();
}

/// Benchmark single-row materialization
fn bench_materialize_row(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize_row");
    let mapper = RowMapper::with_registry(MapperConfig::default(), Arc::new(ConverterRegistry::new()));
    let cols = columns();
    let row = rows(2).pop().expect("row");

    let tuple = cols.select(&["user_name", "visits"]).expect("select");
    let tuple_row = tuple.project(&row);
    let tuple_plan = mapper
        .bind::<(String, i64)>(&tuple.columns)
        .expect("bind tuple");
    group.bench_function("tuple", |b| {
        b.iter(|| black_box(tuple_plan.materialize(&tuple_row).expect("tuple")));
    });

    let record_plan = mapper.bind::<User>(&cols).expect("bind record");
    group.bench_function("record", |b| {
        b.iter(|| {
            let user = record_plan.materialize(&row).expect("record");
            black_box((user.user_name, user.domain, user.visits, user.nickname))
        });
    });

    let raw_plan = Arc::clone(record_plan.plan());
    group.bench_function("untyped_instance", |b| {
        b.iter(|| black_box(materialize(&raw_plan, &row).expect("instance")));
    });

    group.finish();
}

/// Benchmark batch materialization across sizes and thresholds
fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize_batch");
    let cols = columns();

    for size in &[1_000usize, 10_000, 100_000] {
        let batch = rows(*size);
        group.throughput(Throughput::Elements(*size as u64));

        for (label, threshold) in [("sequential", usize::MAX), ("parallel", 0)] {
            let mapper = RowMapper::with_registry(
                MapperConfig::default().with_parallel_threshold(threshold),
                Arc::new(ConverterRegistry::new()),
            );
            group.bench_with_input(BenchmarkId::new(label, size), &batch, |b, batch| {
                b.iter(|| black_box(mapper.map_batch::<User>(&cols, batch).expect("batch")));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_resolution, bench_materialize_row, bench_batch);
criterion_main!(benches);
