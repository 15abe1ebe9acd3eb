use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rtl2832_tuners::tuners::synth;
use rtl2832_tuners::tuners::DEFAULT_XTAL;

// 50 MHz to 1.75 GHz in 1 MHz steps
fn sweep() -> impl Iterator<Item = u32> {
    (50..1750).map(|mhz| mhz * 1_000_000)
}

fn bench_planners(c: &mut Criterion) {
    c.bench_function("fc0012_plan sweep", |b| {
        b.iter(|| {
            for freq in (50..950).map(|mhz| mhz * 1_000_000) {
                let _ = black_box(synth::fc0012_plan(black_box(freq), DEFAULT_XTAL));
            }
        })
    });
    c.bench_function("fc0013_plan sweep", |b| {
        b.iter(|| {
            for freq in sweep() {
                let _ = black_box(synth::fc0013_plan(black_box(freq), DEFAULT_XTAL));
            }
        })
    });
    c.bench_function("e4000_plan sweep", |b| {
        b.iter(|| {
            for freq in sweep() {
                let _ = black_box(synth::e4000_plan(black_box(freq), DEFAULT_XTAL));
            }
        })
    });
    c.bench_function("e4k_plan sweep", |b| {
        b.iter(|| {
            for freq in sweep() {
                let _ = black_box(synth::e4k_plan(DEFAULT_XTAL, black_box(freq)));
            }
        })
    });
    c.bench_function("r82xx_plan sweep", |b| {
        b.iter(|| {
            for freq in sweep() {
                let _ = black_box(synth::r82xx_plan(black_box(freq), DEFAULT_XTAL));
            }
        })
    });
}

criterion_group!(benches, bench_planners);
criterion_main!(benches);
