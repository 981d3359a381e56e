use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ultrabar::binarize::{AdaptiveMeanBinarizer, Binarizer, GlobalThresholdBinarizer};
use ultrabar::one_d::synth::{encode, render_image, render_row};
use ultrabar::prelude::*;

const CASES: [(BarcodeFormat, &str); 6] = [
    (BarcodeFormat::Ean13, "4006381333931"),
    (BarcodeFormat::Code128, "BENCH-128"),
    (BarcodeFormat::Code39, "BENCH39"),
    (BarcodeFormat::Code93, "BENCH93"),
    (BarcodeFormat::Codabar, "A1234567B"),
    (BarcodeFormat::Itf, "30712345000010"),
];

fn bench_decode_row(c: &mut Criterion) {
    let opts = DecodeOptions::default();
    for (format, text) in CASES {
        let row = render_row(&encode(format, text).unwrap(), 2, 10);
        let mut reader = MultiFormatOneDReader::new(&opts);
        c.bench_function(&format!("decode_row_{format}"), |b| {
            b.iter(|| reader.decode_row(black_box(0), black_box(&row), &opts))
        });
    }
}

fn bench_not_found_row(c: &mut Criterion) {
    // худший случай: все декодеры перебирают строку без символа
    let mut row = BitRow::new(2048);
    let mut x = 123u32;
    for i in 0..row.len() {
        x = x.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        if x >> 31 == 1 {
            row.set(i, true);
        }
    }
    let opts = DecodeOptions::default();
    let mut reader = MultiFormatOneDReader::new(&opts);
    c.bench_function("decode_row_noise_2048", |b| {
        b.iter(|| reader.decode_row(black_box(0), black_box(&row), &opts))
    });
}

fn bench_binarize(c: &mut Criterion) {
    let img = render_image(&encode(BarcodeFormat::Ean13, "4006381333931").unwrap(), 3, 10, 8);
    let mut row = BitRow::new(img.width);
    c.bench_function("binarize_global", |b| {
        b.iter(|| GlobalThresholdBinarizer.black_row(black_box(&img), 4, &mut row))
    });
    let adaptive = AdaptiveMeanBinarizer::default();
    c.bench_function("binarize_adaptive", |b| {
        b.iter(|| adaptive.black_row(black_box(&img), 4, &mut row))
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let img = render_image(&encode(BarcodeFormat::Code128, "PIPELINE").unwrap(), 2, 10, 120);
    let pipeline = Pipeline::new();
    c.bench_function("pipeline_code128_image", |b| b.iter(|| pipeline.decode(black_box(&img))));

    let blank = LumaImage {
        data: vec![255; 640 * 480],
        width: 640,
        height: 480,
    };
    let harder = Pipeline::builder().try_harder(true).build();
    c.bench_function("pipeline_blank_640x480_try_harder", |b| {
        b.iter(|| harder.decode(black_box(&blank)))
    });
}

criterion_group!(
    benches,
    bench_decode_row,
    bench_not_found_row,
    bench_binarize,
    bench_pipeline
);
criterion_main!(benches);
