// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use replicated_data::{
    AnyReplicatedData, ReplicatedCounter, ReplicatedCounterMap, ReplicatedData, ReplicatedMap,
    ReplicatedSet,
};
use std::hint::black_box;
use tango_bench::{IntoBenchmarks, benchmark_fn, tango_benchmarks, tango_main};

fn set_benchmarks() -> impl IntoBenchmarks {
    replicated_data::enable_determinism();

    let mut big = ReplicatedSet::new();
    big.add_all(0..1024u64);
    let _ = big.get_and_reset_delta(false);
    let big: &'static _ = Box::leak(Box::new(big));

    let mut source = ReplicatedSet::new();
    source.add_all(0..1024u64);
    let delta = source.get_and_reset_delta(false).unwrap();
    let delta: &'static _ = Box::leak(Box::new(delta));

    [
        benchmark_fn("set::add_and_harvest", move |b| {
            b.iter(move || {
                let mut set = black_box(big.clone());
                set.add(4096);
                set.get_and_reset_delta(false)
            })
        }),
        benchmark_fn("set::delete_and_harvest", move |b| {
            b.iter(move || {
                let mut set = black_box(big.clone());
                set.delete(&512);
                set.get_and_reset_delta(false)
            })
        }),
        benchmark_fn("set::apply_big_delta", move |b| {
            b.iter(move || {
                let mut set = ReplicatedSet::<u64>::new();
                set.apply_delta(black_box(delta.clone())).unwrap();
                set
            })
        }),
    ]
}

fn counter_map_benchmarks() -> impl IntoBenchmarks {
    replicated_data::enable_determinism();

    let mut big = ReplicatedCounterMap::new();
    for i in 0..1024u64 {
        big.increment(i, 1);
    }
    let _ = big.get_and_reset_delta(false);
    let big: &'static _ = Box::leak(Box::new(big));

    [
        benchmark_fn("counter-map::increment_one", move |b| {
            b.iter(move || {
                let mut map = black_box(big.clone());
                map.increment(512, 1);
                map.get_and_reset_delta(false)
            })
        }),
        benchmark_fn("counter-map::harvest_clean", move |b| {
            b.iter(move || {
                let mut map = black_box(big.clone());
                map.get_and_reset_delta(false)
            })
        }),
    ]
}

fn nested_map_benchmarks() -> impl IntoBenchmarks {
    replicated_data::enable_determinism();

    let mut doc = ReplicatedMap::<String, AnyReplicatedData<String>>::new();
    for i in 0..256 {
        let mut counter = ReplicatedCounter::default();
        counter.increment(i);
        doc.set(format!("counter-{i}"), counter.into());
        let mut set = ReplicatedSet::new();
        set.add(format!("element-{i}"));
        doc.set(format!("set-{i}"), set.into());
    }
    let delta = doc.get_and_reset_delta(false).unwrap();
    let doc: &'static _ = Box::leak(Box::new(doc));
    let delta: &'static _ = Box::leak(Box::new(delta));

    [
        benchmark_fn("map::update_nested", move |b| {
            b.iter(move || {
                let mut doc = black_box(doc.clone());
                if let Some(AnyReplicatedData::Counter(c)) = doc.get_mut(&"counter-128".into()) {
                    c.increment(1);
                }
                doc.get_and_reset_delta(false)
            })
        }),
        benchmark_fn("map::apply_full_document", move |b| {
            b.iter(move || {
                let mut replica = ReplicatedMap::<String, AnyReplicatedData<String>>::new();
                replica.apply_delta(black_box(delta.clone())).unwrap();
                replica
            })
        }),
    ]
}

tango_benchmarks!(
    set_benchmarks(),
    counter_map_benchmarks(),
    nested_map_benchmarks()
);
tango_main!();
