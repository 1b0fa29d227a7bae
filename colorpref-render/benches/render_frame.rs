use colorpref_core::{Color, DrawItem, Frame, Shape};
use colorpref_render::{MaskBank, SkiaRenderer};
use colorpref_timing::HighPrecisionTimer;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;
const ASPECT: f32 = WIDTH as f32 / HEIGHT as f32;

fn harness() -> (SkiaRenderer, Vec<u8>, HighPrecisionTimer) {
    let masks = MaskBank::procedural(10, &mut StdRng::seed_from_u64(7)).expect("masks");
    let r = SkiaRenderer::new(WIDTH, HEIGHT, masks, None).expect("renderer");
    let fb = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
    (r, fb, HighPrecisionTimer::new())
}

/// A masked breaking-time frame: two mondrians, the probe and both fusion frames.
fn masked_frame(index: usize) -> Frame {
    let square = |w: f32| (w, w * ASPECT);
    let mut frame = Frame::new(Color::GRAY);
    for x in [-0.4, 0.4] {
        frame.push(DrawItem::new(
            Shape::Lattice {
                size: square(0.3),
                color: Color::WHITE,
            },
            (x, 0.1),
        ));
    }
    for dx in [0.0625, -0.0625] {
        frame.push(DrawItem::new(
            Shape::Mondrian {
                index,
                size: square(0.08),
            },
            (0.4 + dx, 0.1),
        ));
    }
    frame.push(
        DrawItem::new(
            Shape::CrossDisc {
                size: square(0.018),
                color: Color::new(3, 6, 24),
            },
            (-0.4625, 0.155),
        )
        .with_opacity(0.4),
    );
    frame
}

pub fn bench_masked_frame(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40);

    g.bench_function("masked_warm", |b| {
        let (mut r, mut fb, mut t) = harness();
        let frames: Vec<Frame> = (0..10).map(masked_frame).collect();
        for f in &frames {
            r.render_frame(f, &mut fb, &mut t).expect("warm-up");
        }
        let mut n = 0;
        b.iter(|| {
            n = (n + 1) % frames.len();
            black_box(r.render_frame(&frames[n], &mut fb, &mut t).expect("frame").total)
        });
    });

    g.bench_function("masked_cold", |b| {
        b.iter_batched(
            harness,
            |(mut r, mut fb, mut t)| {
                black_box(r.render_frame(&masked_frame(0), &mut fb, &mut t).expect("frame").total)
            },
            BatchSize::SmallInput,
        )
    });

    g.finish();
}

criterion_group!(benches, bench_masked_frame);
criterion_main!(benches);
