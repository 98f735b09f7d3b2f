use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sift_core::{GrayImage, SiftConfig};
use sift_detect::{OrientationAssigner, SiftDetector};

/// Benchmark image: textured background with a grid of Gaussian blobs.
fn create_benchmark_image(width: usize, height: usize) -> GrayImage {
    let mut img = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let gradient = (x * 40 / width) as u8;
            let noise = ((x + y) % 5) as u8;
            img.set(x, y, 60 + gradient + noise);
        }
    }
    for by in 1..4 {
        for bx in 1..4 {
            let cx = (bx * width / 4) as f64;
            let cy = (by * height / 4) as f64;
            for y in 0..height {
                for x in 0..width {
                    let dx = x as f64 - cx;
                    let dy = y as f64 - cy;
                    let bump = 150.0 * (-(dx * dx + dy * dy) / 18.0).exp();
                    let v = img.get(x, y) as f64 + bump;
                    img.set(x, y, v.min(255.0) as u8);
                }
            }
        }
    }
    img
}

fn create_test_config() -> SiftConfig {
    SiftConfig { n_threads: 1, ..SiftConfig::default() }
}

fn bench_scale_space(c: &mut Criterion) {
    let mut group = c.benchmark_group("scale_space");
    for &size in &[128usize, 256, 512] {
        let detector = SiftDetector::new(create_test_config()).unwrap();
        let img = create_benchmark_image(size, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &img, |b, img| {
            b.iter(|| black_box(detector.build_scale_space(black_box(img)).unwrap()))
        });
    }
    group.finish();
}

fn bench_keypoint_detection(c: &mut Criterion) {
    let detector = SiftDetector::new(create_test_config()).unwrap();
    let img = create_benchmark_image(256, 256);
    let (_, dog) = detector.build_scale_space(&img).unwrap();

    c.bench_function("detect_keypoints_256", |b| {
        b.iter(|| black_box(detector.detect_keypoints(black_box(&dog))))
    });
}

fn bench_orientation(c: &mut Criterion) {
    let cfg = create_test_config();
    let detector = SiftDetector::new(cfg.clone()).unwrap();
    let img = create_benchmark_image(256, 256);
    let (gaussian, dog) = detector.build_scale_space(&img).unwrap();
    let keypoints = detector.detect_keypoints(&dog);

    if let Some(k) = keypoints.first().copied() {
        c.bench_function("dominant_orientations", |b| {
            b.iter(|| {
                black_box(OrientationAssigner::dominant_orientations(
                    black_box(&gaussian),
                    black_box(&k),
                    &cfg,
                ))
            })
        });
    }
}

criterion_group!(
    benches,
    bench_scale_space,
    bench_keypoint_detection,
    bench_orientation
);
criterion_main!(benches);
