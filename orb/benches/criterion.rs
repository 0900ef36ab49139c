use criterion::{criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma};
use orb::Orb;

fn load_image() -> orb::image::GrayFloatImage {
    let gray = GrayImage::from_fn(1024, 768, |x, y| {
        Luma([((x / 17 * 53 + y / 23 * 97 + (x ^ y) % 7) % 256) as u8])
    });
    orb::image::GrayFloatImage::from_gray(&gray)
}

fn extract(c: &mut Criterion) {
    let image = load_image();
    let orb = Orb::new(5000);
    c.bench_function("extract", |b| {
        b.iter(|| orb.extract_from_gray_float_image(&image))
    });
}

criterion_group!(
    name = orb_extract;
    config = Criterion::default().sample_size(10);
    targets = extract
);

fn bench_gaussian_blur(c: &mut Criterion) {
    let image = load_image();
    c.bench_function("gaussian_blur_7x7", |b| {
        b.iter(|| orb::image::gaussian_blur(&image, 2.0, 7))
    });
}

criterion_group!(
    name = orb_image;
    config = Criterion::default().sample_size(10);
    targets = bench_gaussian_blur
);

criterion_main!(orb_extract, orb_image);
