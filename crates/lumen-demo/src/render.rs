use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use lumen_engine::core::{App, AppControl, FrameCtx};
use lumen_engine::device::{Gpu, GpuInit};
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::render::MeshRenderer;
use lumen_engine::resources::{load_geometry, load_shader_source, parse_geometry, Geometry};
use lumen_engine::window::{Runtime, RuntimeConfig};

const BUNDLED_GEOMETRY: &str = include_str!("../resources/geometry.txt");
const BUNDLED_SHADER: &str = include_str!("../resources/scene.wgsl");

const CLEAR: wgpu::Color = wgpu::Color {
    r: 0.9,
    g: 0.1,
    b: 0.2,
    a: 1.0,
};

#[derive(Parser)]
#[command(name = "lumen-render", version, about = "Draw an animated indexed mesh")]
struct Args {
    /// Geometry file with [points] and [indices] sections (default: bundled)
    #[arg(long, value_name = "PATH")]
    geometry: Option<PathBuf>,
    /// WGSL shader with vs_main/fs_main entry points (default: bundled)
    #[arg(long, value_name = "PATH")]
    shader: Option<PathBuf>,
    /// Window title
    #[arg(long, default_value = "Learn WebGPU")]
    title: String,
    /// Window width in logical pixels
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// Window height in logical pixels
    #[arg(long, default_value_t = 480)]
    height: u32,
    /// Allow resizing the window
    #[arg(long)]
    resizable: bool,
    /// Seconds to wait for the adapter and device before giving up
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    request_timeout: u64,
}

struct SceneApp {
    geometry: Geometry,
    shader: String,
    renderer: MeshRenderer,
}

impl App for SceneApp {
    fn on_gpu_ready(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let info = gpu.adapter_info();
        log::info!("rendering on {} ({:?})", info.name, info.backend);

        self.renderer
            .prepare(gpu.device(), gpu.surface_format(), &self.geometry, &self.shader)
            .context("failed to prepare scene")
    }

    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let renderer = &mut self.renderer;
        ctx.render(CLEAR, |rctx, target| renderer.render(rctx, target))
    }

    fn on_shutdown(&mut self) {
        self.renderer.release();
    }
}

fn load_scene(args: &Args) -> Result<(Geometry, String)> {
    let geometry = match &args.geometry {
        Some(path) => load_geometry(path)?,
        None => parse_geometry(BUNDLED_GEOMETRY).context("bundled geometry is malformed")?,
    };

    let shader = match &args.shader {
        Some(path) => load_shader_source(path)?,
        None => BUNDLED_SHADER.to_string(),
    };

    Ok((geometry, shader))
}

fn run(args: Args) -> Result<()> {
    let (geometry, shader) = load_scene(&args)?;
    log::info!(
        "scene: {} vertices, {} indices",
        geometry.vertex_count()?,
        geometry.index_count()?
    );

    let config = RuntimeConfig {
        title: args.title.clone(),
        initial_size: LogicalSize::new(args.width as f64, args.height as f64),
        resizable: args.resizable,
    };

    let mut gpu_init = GpuInit::default();
    gpu_init.request_policy = gpu_init
        .request_policy
        .with_timeout(Some(Duration::from_secs(args.request_timeout)));

    let app = SceneApp {
        geometry,
        shader,
        renderer: MeshRenderer::new(),
    };

    Runtime::run(config, gpu_init, app)
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
