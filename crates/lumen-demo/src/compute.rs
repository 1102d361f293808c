use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use lumen_engine::compute::{ComputeConfig, ComputeJob};
use lumen_engine::device::{GpuInit, HeadlessGpu};
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::resources::load_shader_source;

const BUNDLED_SHADER: &str = include_str!("../resources/compute.wgsl");

#[derive(Parser)]
#[command(name = "lumen-compute", version, about = "Run a compute kernel and read back its output")]
struct Args {
    /// Number of f32 elements to process
    #[arg(short = 'n', long, default_value_t = 64)]
    count: usize,
    /// WGSL compute shader with a `main` entry point (default: bundled)
    #[arg(long, value_name = "PATH")]
    shader: Option<PathBuf>,
    /// Seconds to wait for each GPU request before giving up
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    request_timeout: u64,
}

fn run(args: Args) -> Result<()> {
    let shader = match &args.shader {
        Some(path) => load_shader_source(path)?,
        None => BUNDLED_SHADER.to_string(),
    };

    let mut init = GpuInit::default();
    init.request_policy = init
        .request_policy
        .with_timeout(Some(Duration::from_secs(args.request_timeout)));

    let gpu = HeadlessGpu::new(init).context("failed to acquire a GPU")?;
    let info = gpu.adapter_info();
    log::info!("computing on {} ({:?})", info.name, info.backend);

    let job = ComputeJob::new(gpu.device(), &shader, args.count, &ComputeConfig::default())?;

    let input: Vec<f32> = (0..args.count).map(|i| i as f32 * 0.1).collect();
    let output = job.run(&gpu, &input)?;

    for (x, y) in input.iter().zip(&output) {
        println!("{x:.3} -> {y:.3}");
    }

    Ok(())
}

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
