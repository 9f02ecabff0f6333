use criterion::{black_box, criterion_group, criterion_main, Criterion};
use objtrack_core::{Frame, PixelFormat, PixelRect, Rect};
use objtrack_template::ncc::TemplatePlan;
use objtrack_template::{TemplateParams, TemplateTracker};

fn textured_frame(width: usize, height: usize) -> Frame {
    let data = (0..width * height)
        .map(|i| {
            let mut h = (i as u32).wrapping_mul(0x9E37_79B9);
            h ^= h >> 15;
            (h >> 24) as u8
        })
        .collect();
    let mut frame = Frame::new(width, height, PixelFormat::Gray, data).expect("frame");
    frame.fill_rect(PixelRect::new(150, 100, 40, 40), 200);
    frame
}

fn bench_correlation(c: &mut Criterion) {
    let frame = textured_frame(320, 240);
    let gray = frame.view().as_gray().expect("gray");

    let tpl = gray.crop(PixelRect::new(140, 90, 48, 48));
    let plan = TemplatePlan::new(tpl.view(), 1.0).expect("plan");
    c.bench_function("ncc_best_match_320x240_48px", |b| {
        b.iter(|| black_box(plan.best_match(black_box(&gray))))
    });

    let mut tracker = TemplateTracker::new(TemplateParams::default());
    tracker.set_template(Rect::new(140.0, 90.0, 32.0, 32.0), &frame.view());
    let mut out = frame.clone();
    c.bench_function("template_track_320x240_32px", |b| {
        b.iter(|| black_box(tracker.track(black_box(&frame.view()), &mut out)))
    });
}

criterion_group!(benches, bench_correlation);
criterion_main!(benches);
