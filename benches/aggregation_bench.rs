//! Aggregation benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tilescope::features::FeatureFilter;
use tilescope::genomics::{
    AlignmentRecord, CompositionAggregator, CompositionConfig, DensityAggregator, DensityConfig,
    MemorySequence,
};
use tilescope::store::MemoryAlignmentStore;

fn bases(len: usize) -> Vec<u8> {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            b"ACGT"[(state & 3) as usize]
        })
        .collect()
}

fn benchmark_composition(c: &mut Criterion) {
    let sequence = MemorySequence::new("chrBench", bases(1_000_000));
    let aggregator = CompositionAggregator::new(CompositionConfig::default()).expect("valid config");

    c.bench_function("composition_1Mb_500_bins", |b| {
        b.iter(|| {
            let features = aggregator
                .aggregate(&sequence, &FeatureFilter::All, 500)
                .expect("composition succeeds");
            black_box(features.len());
        });
    });
}

fn benchmark_density(c: &mut Criterion) {
    let mut store = MemoryAlignmentStore::new();
    store.add_reference("chrBench", 1_000_000);
    for i in 0..50_000i64 {
        let start = 1 + (i * 7_919) % 999_800;
        let record = AlignmentRecord::new(format!("r{}", i / 2), start, start + 99);
        let record = if i % 2 == 0 {
            record.with_mate(start + 200, true, true)
        } else {
            record
        };
        store.push("chrBench", record);
    }
    let aggregator = DensityAggregator::new(DensityConfig::default()).expect("valid config");

    c.bench_function("density_50k_reads_500_bins", |b| {
        b.iter(|| {
            let features = aggregator
                .aggregate(&mut store, "chrBench", &FeatureFilter::All, 500)
                .expect("density succeeds");
            black_box(features.len());
        });
    });
}

criterion_group!(benches, benchmark_composition, benchmark_density);
criterion_main!(benches);
