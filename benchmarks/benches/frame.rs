//! Per-frame PCSS update benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench frame
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench frame -- steady

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rein_pcss::{
    FilterMode, FrameContext, GlobalShaderState, HeadlessAllocator, HeadlessLight, PcssConfig,
    PcssLight, PcssParameters, PixelFormat, QualitySettings,
};

fn ready_light(
    alloc: &mut HeadlessAllocator,
    globals: &mut GlobalShaderState,
) -> PcssLight<HeadlessLight> {
    let mut pcss = PcssLight::with_light(PcssConfig::default(), HeadlessLight::new());
    let mut ctx = FrameContext::new(alloc, globals);
    pcss.on_setup(&mut ctx);
    pcss
}

// ---------------------------------------------------------------------------
// Parameter derivation
// ---------------------------------------------------------------------------

fn bench_derive(c: &mut Criterion) {
    let config = PcssConfig::default();
    let quality = QualitySettings::default();
    c.bench_function("derive/default", |b| {
        b.iter(|| PcssParameters::derive(&config, &quality));
    });
}

// ---------------------------------------------------------------------------
// Frame update
// ---------------------------------------------------------------------------

fn bench_update(c: &mut Criterion) {
    {
        let mut alloc = HeadlessAllocator::new();
        let mut globals = GlobalShaderState::new();
        let mut pcss = ready_light(&mut alloc, &mut globals);
        let mut ctx = FrameContext::new(&mut alloc, &mut globals);
        c.bench_function("update/steady", |b| {
            b.iter(|| pcss.on_update(&mut ctx));
        });
    }

    {
        let mut group = c.benchmark_group("update/config_churn");
        for &period in &[1u32, 10, 100] {
            let mut alloc = HeadlessAllocator::new();
            let mut globals = GlobalShaderState::new();
            let mut pcss = ready_light(&mut alloc, &mut globals);
            let mut ctx = FrameContext::new(&mut alloc, &mut globals);
            let mut tick = 0u32;
            group.bench_with_input(BenchmarkId::from_parameter(period), &period, |b, &period| {
                b.iter(|| {
                    tick += 1;
                    if tick % period == 0 {
                        let config = pcss.config_mut();
                        config.filter_mode = match config.filter_mode {
                            FilterMode::Point => FilterMode::Bilinear,
                            _ => FilterMode::Point,
                        };
                        config.pixel_format = match config.pixel_format {
                            PixelFormat::RFloat => PixelFormat::RHalf,
                            _ => PixelFormat::RFloat,
                        };
                    }
                    pcss.on_update(&mut ctx);
                });
            });
        }
        group.finish();
    }
}

criterion_group!(benches, bench_derive, bench_update);
criterion_main!(benches);
