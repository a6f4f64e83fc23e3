//! Integration tests for the wgpu FFT kernels.
//!
//! Every test returns early when no GPU adapter is available.

use gpu_fft2d::fft::{ChannelMode, FftError, FftRuntime};
use gpu_fft2d::gpu::{create_surface, FftComputeModule, GpuContext, GpuFftRuntime, Surface, SurfaceFormat};
use rand::{Rng, SeedableRng};
use rustfft::{num_complex::Complex, FftPlanner};
use wgpu::FilterMode;

async fn create_gpu_context() -> Option<GpuContext> {
    GpuContext::new().await.ok()
}

fn create_runtime(ctx: &GpuContext, size: usize, mode: ChannelMode) -> GpuFftRuntime {
    let module = FftComputeModule::new(ctx).expect("Failed to parse FFT kernels");
    FftRuntime::with_size(module, size, mode).expect("Failed to configure FFT runtime")
}

fn surface(ctx: &GpuContext, format: SurfaceFormat, size: usize) -> Surface {
    create_surface(ctx, format, FilterMode::Nearest, size as u32)
        .expect("Failed to create surface")
}

fn uploaded(ctx: &GpuContext, format: SurfaceFormat, size: usize, texels: &[f32]) -> Surface {
    let surface = surface(ctx, format, size);
    surface.upload(&ctx.queue, texels);
    surface
}

fn impulse(size: usize) -> Vec<f32> {
    let mut texels = vec![0.0; size * size];
    texels[(size / 4) * size + size / 3] = 1.0;
    texels
}

fn noise(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(0.0..1.0)).collect()
}

fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "texel component {}: expected {}, got {}",
            i,
            e,
            a
        );
    }
}

/// Centred 2D DFT of a single-channel plane on the CPU.
fn reference_spectrum(plane: &[f32], size: usize) -> Vec<Complex<f32>> {
    let mut data: Vec<Complex<f32>> = plane
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let (y, x) = (i / size, i % size);
            let sign = if (x + y) % 2 == 0 { 1.0 } else { -1.0 };
            Complex::new(v * sign, 0.0)
        })
        .collect();

    let fft = FftPlanner::<f32>::new().plan_fft_forward(size);
    for row in data.chunks_exact_mut(size) {
        fft.process(row);
    }
    let mut column = vec![Complex::new(0.0, 0.0); size];
    for x in 0..size {
        for y in 0..size {
            column[y] = data[y * size + x];
        }
        fft.process(&mut column);
        for y in 0..size {
            data[y * size + x] = column[y];
        }
    }
    data
}

async fn round_trip(size: usize, mode: ChannelMode, format: SurfaceFormat, texels: Vec<f32>) {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    let mut runtime = create_runtime(&ctx, size, mode);

    let input = uploaded(&ctx, format, size, &texels);
    let re = surface(&ctx, format, size);
    let im = surface(&ctx, format, size);
    let restored = surface(&ctx, format, size);

    runtime.forward(&input, &re, &im).unwrap();
    runtime.inverse(&re, &im, &restored).unwrap();

    let result = restored.read_texels(&ctx.device, &ctx.queue).unwrap();
    assert_close(&result, &texels, 1e-3);
}

#[tokio::test]
async fn test_round_trip_impulse() {
    for size in [64, 256] {
        round_trip(
            size,
            ChannelMode::Single,
            SurfaceFormat::SingleChannelFloat,
            impulse(size),
        )
        .await;
    }
}

#[tokio::test]
async fn test_round_trip_constant() {
    for size in [64, 256] {
        round_trip(
            size,
            ChannelMode::Single,
            SurfaceFormat::SingleChannelFloat,
            vec![0.75; size * size],
        )
        .await;
    }
}

#[tokio::test]
async fn test_round_trip_noise_multi_channel() {
    for size in [64, 256] {
        // Alpha is written as 1.0 on output.
        let texels: Vec<f32> = noise(size * size * 4, size as u64)
            .chunks_exact(4)
            .flat_map(|t| [t[0], t[1], t[2], 1.0])
            .collect();
        round_trip(size, ChannelMode::Multi, SurfaceFormat::MultiChannelFloat, texels).await;
    }
}

#[tokio::test]
async fn test_forward_matches_reference() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    let size = 64;
    let mut runtime = create_runtime(&ctx, size, ChannelMode::Single);

    let plane = noise(size * size, 7);
    let input = uploaded(&ctx, SurfaceFormat::SingleChannelFloat, size, &plane);
    let re = surface(&ctx, SurfaceFormat::SingleChannelFloat, size);
    let im = surface(&ctx, SurfaceFormat::SingleChannelFloat, size);
    runtime.forward(&input, &re, &im).unwrap();

    let expected = reference_spectrum(&plane, size);
    let tolerance = 1e-4 * (size * size) as f32;
    assert_close(
        &re.read_texels(&ctx.device, &ctx.queue).unwrap(),
        &expected.iter().map(|c| c.re).collect::<Vec<_>>(),
        tolerance,
    );
    assert_close(
        &im.read_texels(&ctx.device, &ctx.queue).unwrap(),
        &expected.iter().map(|c| c.im).collect::<Vec<_>>(),
        tolerance,
    );
}

#[tokio::test]
async fn test_power_spectrum_of_constant_is_centred() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    let size = 128;
    let mut runtime = create_runtime(&ctx, size, ChannelMode::Multi);

    let texels: Vec<f32> = (0..size * size).flat_map(|_| [0.5, 0.25, 1.0, 1.0]).collect();
    let input = uploaded(&ctx, SurfaceFormat::MultiChannelFloat, size, &texels);
    let output = surface(&ctx, SurfaceFormat::MultiChannelFloat, size);
    runtime.power_spectrum(&input, &output).unwrap();

    let spectrum = output.read_texels(&ctx.device, &ctx.queue).unwrap();
    let centre = (size / 2) * size + size / 2;
    for (i, texel) in spectrum.chunks_exact(4).enumerate() {
        let expected: [f32; 3] = if i == centre {
            [0.5, 0.25, 1.0]
        } else {
            [0.0; 3]
        };
        for c in 0..3 {
            assert!(
                (texel[c] - expected[c]).abs() < 1e-4,
                "texel {} channel {}: expected {}, got {}",
                i,
                c,
                expected[c],
                texel[c]
            );
        }
        assert_eq!(texel[3], 1.0);
    }
}

#[tokio::test]
async fn test_deferred_matches_immediate() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    let size = 128;
    let format = SurfaceFormat::SingleChannelFloat;
    let mut runtime = create_runtime(&ctx, size, ChannelMode::Single);

    let plane = noise(size * size, 11);
    let input = uploaded(&ctx, format, size, &plane);

    let immediate = surface(&ctx, format, size);
    runtime.power_spectrum(&input, &immediate).unwrap();

    let deferred = surface(&ctx, format, size);
    let re = surface(&ctx, format, size);
    let im = surface(&ctx, format, size);
    let restored = surface(&ctx, format, size);
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("deferred_test_encoder"),
        });
    runtime
        .power_spectrum_deferred(&mut encoder, &input, &deferred)
        .unwrap();
    runtime
        .forward_deferred(&mut encoder, &input, &re, &im)
        .unwrap();
    runtime
        .inverse_deferred(&mut encoder, &re, &im, &restored)
        .unwrap();
    ctx.queue.submit(Some(encoder.finish()));

    assert_close(
        &deferred.read_texels(&ctx.device, &ctx.queue).unwrap(),
        &immediate.read_texels(&ctx.device, &ctx.queue).unwrap(),
        1e-6,
    );
    assert_close(
        &restored.read_texels(&ctx.device, &ctx.queue).unwrap(),
        &plane,
        1e-3,
    );
}

/// Records a power spectrum into an external encoder, lets `between` touch
/// the runtime, then submits and compares against an immediate run.
async fn deferred_survives(between: impl FnOnce(GpuFftRuntime)) {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    let size = 64;
    let format = SurfaceFormat::SingleChannelFloat;
    let mut runtime = create_runtime(&ctx, size, ChannelMode::Single);

    let plane = noise(size * size, 23);
    let input = uploaded(&ctx, format, size, &plane);
    let immediate = surface(&ctx, format, size);
    runtime.power_spectrum(&input, &immediate).unwrap();

    let deferred = surface(&ctx, format, size);
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("deferred_release_encoder"),
        });
    runtime
        .power_spectrum_deferred(&mut encoder, &input, &deferred)
        .unwrap();

    between(runtime);
    ctx.queue.submit(Some(encoder.finish()));

    assert_close(
        &deferred.read_texels(&ctx.device, &ctx.queue).unwrap(),
        &immediate.read_texels(&ctx.device, &ctx.queue).unwrap(),
        1e-6,
    );
}

#[tokio::test]
async fn test_deferred_submit_after_reconfigure() {
    deferred_survives(|mut runtime| {
        runtime.configure_for_size(128, ChannelMode::Single).unwrap();
        assert_eq!(runtime.size(), Some(128));
    })
    .await;
}

#[tokio::test]
async fn test_deferred_submit_after_dispose() {
    deferred_survives(|mut runtime| runtime.dispose()).await;
}

#[tokio::test]
async fn test_deferred_submit_after_drop() {
    deferred_survives(drop).await;
}

#[tokio::test]
async fn test_commented_out_kernel_is_missing() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    let source = "
        @compute @workgroup_size(THREADS)
        fn R2C() {}

        // @compute @workgroup_size(THREADS) fn C2R() {}

        @compute @workgroup_size(THREADS)
        fn R2R() {}
    ";
    let module = FftComputeModule::with_source(&ctx, source).unwrap();
    assert_eq!(module.entry_points(), ["R2C".to_string(), "R2R".to_string()]);
    assert!(matches!(
        FftRuntime::new(module),
        Err(FftError::InvalidKernelModule("C2R"))
    ));
}

#[tokio::test]
async fn test_unparsable_kernel_source_is_rejected() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    assert!(matches!(
        FftComputeModule::with_source(&ctx, "@compute fn R2C( {"),
        Err(FftError::InvalidShader(_))
    ));
}

#[tokio::test]
async fn test_reconfigure_between_sizes() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    let format = SurfaceFormat::SingleChannelFloat;
    let mut runtime = create_runtime(&ctx, 64, ChannelMode::Single);

    for size in [64, 512, 128] {
        runtime.configure_for_size(size, ChannelMode::Single).unwrap();
        assert_eq!(runtime.size(), Some(size));

        let plane = noise(size * size, size as u64);
        let input = uploaded(&ctx, format, size, &plane);
        let re = surface(&ctx, format, size);
        let im = surface(&ctx, format, size);
        let restored = surface(&ctx, format, size);
        runtime.forward(&input, &re, &im).unwrap();
        runtime.inverse(&re, &im, &restored).unwrap();

        assert_close(
            &restored.read_texels(&ctx.device, &ctx.queue).unwrap(),
            &plane,
            1e-3,
        );
    }
    assert_eq!(runtime.module().compiled_variants(), 6);
}

#[tokio::test]
async fn test_wrong_surface_size_is_rejected() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    let mut runtime = create_runtime(&ctx, 128, ChannelMode::Single);
    let input = surface(&ctx, SurfaceFormat::SingleChannelFloat, 64);
    let output = surface(&ctx, SurfaceFormat::SingleChannelFloat, 128);

    assert!(matches!(
        runtime.power_spectrum(&input, &output),
        Err(FftError::SurfaceMismatch {
            binding: "inputRE",
            expected: 128,
            ..
        })
    ));
}

#[tokio::test]
async fn test_single_channel_half_requires_feature() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    let result = create_surface(
        &ctx,
        SurfaceFormat::SingleChannelHalf,
        FilterMode::Nearest,
        64,
    );
    if ctx.storage_formats.contains(SurfaceFormat::SingleChannelHalf) {
        assert!(result.is_ok());
    } else {
        assert!(matches!(result, Err(FftError::UnsupportedFormat(_))));
    }
}

#[tokio::test]
async fn test_dispose_then_transform_fails() {
    let Some(ctx) = create_gpu_context().await else {
        return;
    };
    let mut runtime = create_runtime(&ctx, 64, ChannelMode::Single);
    let texture = surface(&ctx, SurfaceFormat::SingleChannelFloat, 64);

    runtime.dispose();
    runtime.dispose();
    assert!(matches!(
        runtime.power_spectrum(&texture, &texture),
        Err(FftError::Disposed)
    ));
}
