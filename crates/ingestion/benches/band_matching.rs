//! Benchmarks for band matching and coordinate derivation.
//!
//! Run with: cargo bench --package ingestion --bench band_matching

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ingestion::{match_bands, BandMetadata, BandSpec};
use raster_common::GeoTransform;
use raster_reader::Tags;

fn bands(count: usize) -> Vec<BandMetadata> {
    (0..count)
        .map(|i| {
            let tags: Tags = [
                ("band".to_string(), format!("b{i:03}")),
                ("long_name".to_string(), format!("Surface Reflectance Band {i}")),
                ("units".to_string(), "reflectance".to_string()),
            ]
            .into_iter()
            .collect();
            BandMetadata::new(format!("scene:b{i:03}"), tags, 2400, 2400)
        })
        .collect()
}

fn bench_match_bands(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_bands");

    for count in [16usize, 64, 256] {
        let bands = bands(count);
        let exact: Vec<BandSpec> = (0..count)
            .step_by(4)
            .map(|i| BandSpec::tag_equals(format!("b{i}"), "band", format!("b{i:03}")))
            .collect();
        let patterns: Vec<BandSpec> = (0..count)
            .step_by(4)
            .map(|i| {
                BandSpec::pattern(format!("b{i}"), "^long_name$", &format!("band {i}$"), false, true)
                    .expect("valid pattern")
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("tag_equals", count), &bands, |b, bands| {
            b.iter(|| match_bands(black_box(bands), Some(&exact)).expect("all matched"))
        });
        group.bench_with_input(BenchmarkId::new("pattern", count), &bands, |b, bands| {
            b.iter(|| match_bands(black_box(bands), Some(&patterns)).expect("all matched"))
        });
    }

    group.finish();
}

fn bench_coordinates(c: &mut Criterion) {
    let mut group = c.benchmark_group("coordinates");
    let gt = GeoTransform::from_gdal([399_960.0, 30.0, 0.0, 4_200_000.0, 0.0, -30.0]);

    for size in [256usize, 2048, 8192] {
        group.bench_with_input(BenchmarkId::new("axes", size), &size, |b, &size| {
            b.iter(|| gt.coordinates(black_box(size), black_box(size)).expect("finite"))
        });
        group.bench_with_input(BenchmarkId::new("bounds", size), &size, |b, &size| {
            b.iter(|| gt.bounds(black_box(size), black_box(size)).expect("finite"))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_match_bands, bench_coordinates);
criterion_main!(benches);
