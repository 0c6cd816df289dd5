use ar_cube_core::GrayImage;
use ar_cube_quad::{QuadDetector, QuadDetectorParams};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn marker_scene(w: usize, h: usize) -> GrayImage {
    let mut img = GrayImage::filled(w, h, 20);
    let (x0, y0) = (w / 4, h / 4);
    for y in y0..h - y0 {
        for x in x0..w - x0 {
            img.data[y * w + x] = 230;
        }
    }
    img
}

fn bench_detect(c: &mut Criterion) {
    let detector = QuadDetector::new(QuadDetectorParams::default());
    for (w, h) in [(400, 300), (1280, 720)] {
        let img = marker_scene(w, h);
        c.bench_function(&format!("detect_quad_{w}x{h}"), |b| {
            b.iter(|| detector.detect(black_box(&img.view())))
        });
    }
}

criterion_group!(benches, bench_detect);
criterion_main!(benches);
