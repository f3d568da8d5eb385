use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use afterimage::{
    AaMode, Camera, ContextDesc, CpuRenderer, CpuRendererOpts, FixedStepClock, FrameScheduler,
    ManualHost, Mat4, Material, Mesh, Node, ObjectId, PipelineConfig, RenderTarget, Renderer,
    SceneGraph, Stage, Vec3, rgba,
};

#[derive(Parser, Debug)]
#[command(name = "afterimage", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an animated demo scene and write the last frame as a PNG.
    Render(RenderArgs),
    /// Print the jitter sequence as JSON.
    Jitter(JitterArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Pipeline config JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Antialiasing mode (none, msaa, ssaa, taa, motion).
    #[arg(long)]
    mode: Option<String>,

    /// Frames to render.
    #[arg(long, default_value_t = 30)]
    frames: usize,

    /// Output width.
    #[arg(long)]
    width: Option<u32>,

    /// Output height.
    #[arg(long)]
    height: Option<u32>,

    /// Simulated frames per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct JitterArgs {
    /// Samples to generate.
    #[arg(long, default_value_t = 16)]
    length: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Jitter(args) => cmd_jitter(args),
    }
}

fn load_config(args: &RenderArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let src = std::fs::read_to_string(path)
                .with_context(|| format!("read config '{}'", path.display()))?;
            PipelineConfig::from_json(&src)?
        }
        None => PipelineConfig::default(),
    };
    if let Some(mode) = &args.mode {
        config.mode = mode.parse::<AaMode>()?;
    }
    if let Some(w) = args.width {
        config.width = w;
    }
    if let Some(h) = args.height {
        config.height = h;
    }
    config.validate()?;
    Ok(config)
}

/// A checkered cube spinning above a sliding floor tile.
fn demo_stage(aspect: f32) -> anyhow::Result<(Stage<SceneGraph>, ObjectId, ObjectId)> {
    let mut scene = SceneGraph::new(rgba(0.05, 0.06, 0.09, 1.0));
    let cube = scene.add(Node::drawable(
        Arc::new(Mesh::cube(1.0)),
        Material::checker(rgba(0.95, 0.9, 0.8, 1.0), rgba(0.15, 0.2, 0.6, 1.0), 4.0),
        Mat4::IDENTITY,
    ))?;
    let floor = scene.add(Node::drawable(
        Arc::new(Mesh::quad(3.0, 3.0)),
        Material::checker(rgba(0.3, 0.3, 0.3, 1.0), rgba(0.8, 0.8, 0.8, 1.0), 2.0),
        floor_transform(0.0),
    ))?;
    let camera = Camera::perspective(
        Vec3::new(1.6, 1.2, 2.6),
        Vec3::new(0.0, -0.2, 0.0),
        50.0,
        aspect,
        0.1,
        100.0,
    )?;
    Ok((Stage::new(scene, camera), cube, floor))
}

fn floor_transform(t: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new((t * 0.7).sin() * 0.5, -0.8, 0.0))
        * Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let extent = config.extent()?;
    let renderer = CpuRenderer::new(
        ContextDesc { extent, samples: 1 },
        CpuRendererOpts::default(),
    )?;
    let (stage, cube, floor) = demo_stage(extent.aspect())?;
    let mut scheduler = FrameScheduler::new(
        config,
        Box::new(renderer),
        stage,
        Box::new(FixedStepClock::from_fps(args.fps)),
    )?;

    let mut elapsed = Duration::ZERO;
    scheduler.on_pre_render(move |stage, dt| {
        elapsed += dt;
        let t = elapsed.as_secs_f32();
        stage
            .scene
            .set_local(cube, Mat4::from_rotation_y(t * 0.9) * Mat4::from_rotation_x(t * 0.4))?;
        stage.scene.set_local(floor, floor_transform(t))
    });

    let mut host = ManualHost::new();
    scheduler.start(&mut host);
    let reports = host.drive(&mut scheduler, args.frames)?;
    for d in reports.iter().flat_map(|r| &r.diagnostics) {
        tracing::warn!(frame = ?d.frame, "{}", d.message);
    }

    let img = scheduler.renderer().read_pixels(RenderTarget::Display)?;
    let stats = scheduler.renderer().stats();
    scheduler.dispose()?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &img.to_rgba8(),
        extent.width,
        extent.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    tracing::info!(
        frames = reports.len(),
        scene_renders = stats.scene_renders,
        fullscreen_passes = stats.fullscreen_passes,
        "render finished"
    );
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_jitter(args: JitterArgs) -> anyhow::Result<()> {
    let samples: Vec<[f32; 2]> = afterimage::temporal::jitter::generate(args.length)
        .into_iter()
        .map(|v| v.to_array())
        .collect();
    println!("{}", serde_json::to_string_pretty(&samples)?);
    Ok(())
}
