// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use criterion::{criterion_group, criterion_main, Criterion};
use pattern_reader::{open_bytes, CachePolicy, Dataset, OpenOptions, Result};
use std::time::Duration;

#[path = "../tests/common/mod.rs"]
mod common;

use common::FixtureVersion;

fn open(data: &[u8]) -> Result<Dataset> {
    open_bytes(data.to_vec(), OpenOptions::default())
}

fn open_uncached(data: &[u8]) -> Result<Dataset> {
    let mut options = OpenOptions::default();
    options.caches.strings = CachePolicy::None;
    options.caches.nodes = CachePolicy::None;
    options.caches.signatures = CachePolicy::None;

    open_bytes(data.to_vec(), options)
}

fn iter_strings(dataset: &Dataset) -> Result<()> {
    for record in dataset.strings()?.iter() {
        record?;
    }

    Ok(())
}

fn iter_nodes(dataset: &Dataset) -> Result<()> {
    for record in dataset.nodes()?.iter() {
        record?;
    }

    Ok(())
}

fn walk_signatures(dataset: &Dataset) -> Result<()> {
    for index in 0..dataset.signatures()?.len() {
        let signature = dataset.signatures()?.get(index)?;

        for node in signature.nodes(dataset)? {
            let _ = node.characters(dataset)?;
        }
    }

    Ok(())
}

pub fn bench_fixture(c: &mut Criterion) {
    let fixture = common::build(FixtureVersion::V32);

    let mut group = c.benchmark_group("v3.2 fixture");

    group.bench_function("open", |b| b.iter(|| open(&fixture.data).unwrap()));

    let dataset = open(&fixture.data).unwrap();
    let uncached = open_uncached(&fixture.data).unwrap();

    group.bench_function("iter-strings", |b| {
        b.iter(|| iter_strings(&dataset).unwrap())
    });
    group.bench_function("iter-nodes", |b| b.iter(|| iter_nodes(&dataset).unwrap()));
    group.bench_function("walk-signatures", |b| {
        b.iter(|| walk_signatures(&dataset).unwrap())
    });
    group.bench_function("walk-signatures-uncached", |b| {
        b.iter(|| walk_signatures(&uncached).unwrap())
    });

    group.finish();
}

criterion_group! {
    name = fixture;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(500))
        .measurement_time(Duration::from_secs(2));
    targets = bench_fixture,
}
criterion_main!(fixture);
