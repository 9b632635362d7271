// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for propagation through bound containers and lists.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use understory_callqueue::CallQueue;
use understory_property::{BindFlags, PropertyValue, PropertyValueList};

fn chain(len: usize, queue: &CallQueue) -> Vec<PropertyValue<i64>> {
    let nodes: Vec<PropertyValue<i64>> = (0..len)
        .map(|i| {
            PropertyValue::builder(&format!("n{i}"), 0)
                .queue(queue.clone())
                .build()
        })
        .collect();
    for pair in nodes.windows(2) {
        pair[1].bind(&pair[0], BindFlags::VALUE).unwrap();
    }
    nodes
}

fn bench_binding(c: &mut Criterion) {
    let mut group = c.benchmark_group("binding/scalar");

    for len in [2_usize, 16, 128] {
        group.bench_function(BenchmarkId::new("chain_set", len), |b| {
            let queue = CallQueue::new(false);
            let nodes = chain(len, &queue);
            let mut next = 0_i64;
            b.iter(|| {
                next += 1;
                black_box(nodes[0].set(next))
            });
        });
    }

    group.bench_function("star_set/64", |b| {
        let queue = CallQueue::new(false);
        let hub = PropertyValue::builder("hub", 0_i64).queue(queue.clone()).build();
        let spokes: Vec<_> = (0..64)
            .map(|i| {
                let spoke = PropertyValue::builder(&format!("s{i}"), 0_i64)
                    .queue(queue.clone())
                    .build();
                spoke.bind(&hub, BindFlags::all()).unwrap();
                spoke
            })
            .collect();
        let mut next = 0_i64;
        b.iter(|| {
            next += 1;
            black_box(spokes[0].set(next))
        });
    });

    group.finish();

    let mut group = c.benchmark_group("binding/list");

    for len in [8_usize, 64] {
        group.bench_function(BenchmarkId::new("bind", len), |b| {
            let queue = CallQueue::new(false);
            let values: Vec<i64> = (0..len as i64).collect();
            b.iter_batched(
                || {
                    (
                        PropertyValueList::builder("m", values.clone())
                            .queue(queue.clone())
                            .build(),
                        PropertyValueList::builder("s", Vec::new())
                            .queue(queue.clone())
                            .build(),
                    )
                },
                |(master, slave)| {
                    slave.bind(&master, BindFlags::VALUE).unwrap();
                    black_box((master, slave));
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(BenchmarkId::new("append_bound", len), |b| {
            let queue = CallQueue::new(false);
            let values: Vec<i64> = (0..len as i64).collect();
            let master = PropertyValueList::builder("m", values)
                .queue(queue.clone())
                .build();
            let slave = PropertyValueList::builder("s", Vec::new())
                .queue(queue.clone())
                .build();
            slave.bind(&master, BindFlags::VALUE).unwrap();
            b.iter(|| {
                master.append(1).unwrap();
                black_box(master.pop())
            });
        });

        group.bench_function(BenchmarkId::new("reverse_bound", len), |b| {
            let queue = CallQueue::new(false);
            let values: Vec<i64> = (0..len as i64).collect();
            let master = PropertyValueList::builder("m", values)
                .queue(queue.clone())
                .build();
            let slave = PropertyValueList::builder("s", Vec::new())
                .queue(queue.clone())
                .build();
            slave.bind(&master, BindFlags::VALUE).unwrap();
            let order: Vec<usize> = (0..len).rev().collect();
            b.iter(|| black_box(master.reorder(&order)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_binding);
criterion_main!(benches);
