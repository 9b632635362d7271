// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for writing and observing `understory_property` containers.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Once;

use understory_callqueue::CallQueue;
use understory_property::{
    Descriptor, HasProperties, HostOptions, Int, Property, PropertyValue, Schema, Str,
};

fn host() -> (HasProperties, Property<Int>, Property<Str>) {
    let mut builder = Schema::builder("Bench");
    let count = builder
        .register("count", &Descriptor::from(Int::new().min(0).max(1_000_000)))
        .unwrap();
    let label = builder.register("label", &Descriptor::from(Str::new())).unwrap();
    let host = HasProperties::with_options(
        &builder.build(),
        HostOptions::new().queue(CallQueue::new(false)),
    );
    (host, count, label)
}

fn bench_property(c: &mut Criterion) {
    static PRINT_SIZES: Once = Once::new();
    PRINT_SIZES.call_once(|| {
        eprintln!(
            "sizes: PropertyValue<i64>={} HasProperties={} ErasedValue={}",
            size_of::<PropertyValue<i64>>(),
            size_of::<HasProperties>(),
            size_of::<understory_property::ErasedValue>(),
        );
    });

    let mut group = c.benchmark_group("property/get");

    group.bench_function("container", |b| {
        let prop = PropertyValue::new("p", 7_i64);
        b.iter(|| black_box(prop.get()));
    });

    group.bench_function("host_typed", |b| {
        let (host, count, _) = host();
        b.iter(|| black_box(host.get(count)));
    });

    group.bench_function("host_named", |b| {
        let (host, ..) = host();
        b.iter(|| black_box(host.get_as::<i64>("count")));
    });

    group.finish();

    let mut group = c.benchmark_group("property/set");

    group.bench_function("container/no_listener", |b| {
        let prop = PropertyValue::builder("p", 0_i64)
            .queue(CallQueue::new(false))
            .build();
        let mut next = 0_i64;
        b.iter(|| {
            next += 1;
            black_box(prop.set(next))
        });
    });

    for listeners in [1_usize, 8, 32] {
        group.bench_function(BenchmarkId::new("container/listeners", listeners), |b| {
            let prop = PropertyValue::builder("p", 0_i64)
                .queue(CallQueue::new(false))
                .build();
            for i in 0..listeners {
                prop.add_listener(
                    &format!("l{i}"),
                    |change| {
                        black_box(change.value);
                        Ok(())
                    },
                    false,
                )
                .unwrap();
            }
            let mut next = 0_i64;
            b.iter(|| {
                next += 1;
                black_box(prop.set(next))
            });
        });
    }

    group.bench_function("container/unchanged", |b| {
        let prop = PropertyValue::builder("p", 5_i64)
            .queue(CallQueue::new(false))
            .build();
        b.iter(|| black_box(prop.set(5)));
    });

    group.bench_function("host/int_validated", |b| {
        let (host, count, _) = host();
        let mut next = 0_i64;
        b.iter(|| {
            next = (next + 1) % 1_000_000;
            black_box(host.set(count, next))
        });
    });

    group.bench_function("host/string", |b| {
        b.iter_batched(
            host,
            |(host, _, label)| {
                black_box(host.set(label, String::from("hello world")));
                black_box(host);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_property);
criterion_main!(benches);
