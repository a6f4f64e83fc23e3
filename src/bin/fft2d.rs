//! Transform an image on the GPU and write the results as PNGs.
//!
//! Writes `<stem>_spectrum.png` (normalized magnitude), `<stem>_re.png` /
//! `<stem>_im.png` (forward transform) and `<stem>_roundtrip.png` (inverse of
//! the forward transform) next to the input.
//!
//! Run with:
//!     cargo run --bin fft2d -- <image> [size] [single|multi]
//!     cargo run --bin fft2d -- <image> --config fft.json

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use gpu_fft2d::gpu::{create_surface, FftComputeModule, GpuContext, Surface, SurfaceFormat};
use gpu_fft2d::{fit_to_size, image_to_texels, texels_to_image, ChannelMode, FftConfig, FftRuntime};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (input, config) = parse_args(&args)?;

    let image = image::open(&input).with_context(|| format!("Failed to open {}", input.display()))?;
    log::info!(
        "Loaded {} ({}x{})",
        input.display(),
        image.width(),
        image.height()
    );

    let ctx = GpuContext::new_blocking().context("Failed to create GPU context")?;
    let module = FftComputeModule::new(&ctx)?;
    let mut runtime = FftRuntime::from_config(module, &config)?;

    let size = config.size as u32;
    let format = match config.mode {
        ChannelMode::Single => SurfaceFormat::SingleChannelFloat,
        ChannelMode::Multi => SurfaceFormat::MultiChannelFloat,
    };
    let surface = || create_surface(&ctx, format, wgpu::FilterMode::Nearest, size);

    let source = surface()?;
    source.upload(&ctx.queue, &image_to_texels(&fit_to_size(&image, size), format));

    let spectrum = surface()?;
    let real = surface()?;
    let imaginary = surface()?;
    let restored = surface()?;

    let started = Instant::now();
    runtime.power_spectrum(&source, &spectrum)?;
    runtime.forward(&source, &real, &imaginary)?;
    runtime.inverse(&real, &imaginary, &restored)?;
    ctx.device
        .poll(wgpu::PollType::wait_indefinitely())
        .context("GPU poll failed")?;
    log::info!("Transforms finished in {:?}", started.elapsed());

    let save = |surface: &Surface, suffix: &str, normalize: bool| -> Result<()> {
        let texels = surface.read_texels(&ctx.device, &ctx.queue)?;
        let path = output_path(&input, suffix);
        texels_to_image(&texels, size, size, format.components(), normalize)
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote {}", path.display());
        Ok(())
    };

    save(&spectrum, "spectrum", true)?;
    save(&real, "re", true)?;
    save(&imaginary, "im", true)?;
    save(&restored, "roundtrip", false)?;

    runtime.dispose();
    Ok(())
}

fn parse_args(args: &[String]) -> Result<(PathBuf, FftConfig)> {
    let Some(input) = args.first() else {
        bail!("Usage: fft2d <image> [size] [single|multi] | fft2d <image> --config <file.json>");
    };

    if args.get(1).map(String::as_str) == Some("--config") {
        let path = args.get(2).context("--config requires a path")?;
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path))?;
        let config: FftConfig = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config in {}", path))?;
        return Ok((PathBuf::from(input), config));
    }

    let mut config = FftConfig::default();
    if let Some(size) = args.get(1) {
        config.size = size
            .parse()
            .with_context(|| format!("Invalid size: {}", size))?;
    }
    if let Some(mode) = args.get(2) {
        config.mode = match mode.to_lowercase().as_str() {
            "single" => ChannelMode::Single,
            "multi" => ChannelMode::Multi,
            _ => bail!("Unknown channel mode: {}", mode),
        };
    }
    Ok((PathBuf::from(input), config))
}

fn output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    input.with_file_name(format!("{}_{}.png", stem, suffix))
}
