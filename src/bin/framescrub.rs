use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use framescrub::{
    Attempt, FsLoader, ManualTicker, PixelSurface, PlayerConfig, ScrubPlayer, SessionState,
    SlotState, Smoothing, SurfaceSize, ViewportGeometry, normalize_rel_path,
};

#[derive(Parser, Debug)]
#[command(name = "framescrub", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Paint the frame shown at one scroll progress value as a PNG.
    Frame(FrameArgs),
    /// Simulate a full scroll pass and write one PNG per step.
    Scrub(ScrubArgs),
    /// Verify that every frame of the sequence exists on disk.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct SourceArgs {
    /// Player configuration JSON.
    #[arg(long)]
    config: PathBuf,

    /// Directory frame locators are resolved against (defaults to the config's directory).
    #[arg(long)]
    root: Option<PathBuf>,
}

impl SourceArgs {
    fn load(&self) -> anyhow::Result<(PlayerConfig, PathBuf)> {
        let cfg = PlayerConfig::from_path(&self.config)?;
        let root = match &self.root {
            Some(root) => root.clone(),
            None => self
                .config
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf(),
        };
        Ok((cfg, root))
    }
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Scroll progress in [0, 1].
    #[arg(long)]
    progress: f64,

    /// Surface width in pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Surface height in pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Override decode worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct ScrubArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Surface width in pixels.
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Surface height in pixels.
    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Number of scroll positions sampled between entering and leaving the viewport.
    #[arg(long, default_value_t = 10)]
    steps: u32,

    /// Output directory for `step_NNNN.png` files.
    #[arg(long)]
    out: PathBuf,

    /// Override decode worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Give up on a step after this many milliseconds.
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    #[command(flatten)]
    source: SourceArgs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Scrub(args) => cmd_scrub(args),
        Command::Check(args) => cmd_check(args),
    }
}

/// Geometry of a container one viewport tall that yields `progress`.
fn geometry_at(progress: f64, viewport_height: f64) -> ViewportGeometry {
    let container_height = viewport_height;
    let top = viewport_height - progress.clamp(0.0, 1.0) * (container_height + viewport_height);
    ViewportGeometry {
        container_top: top,
        container_height,
        viewport_height,
    }
}

/// Drive the player until playback converged and the resolved frame settled.
fn settle(player: &mut ScrubPlayer<PixelSurface>, timeout: Duration) -> anyhow::Result<()> {
    let interpolated = player.is_tick_loop_running();
    let deadline = Instant::now() + timeout;
    loop {
        let now = Instant::now();
        if interpolated {
            player.on_tick(now);
        } else {
            player.service(now);
        }

        let st = player.playback_state();
        let resolved = player.resolved_frame();
        let loading = player.store().state(resolved) == Some(SlotState::Loading);
        if st.current_frame == st.target_frame && !loading {
            return Ok(());
        }
        if now >= deadline {
            anyhow::bail!("timed out waiting for frame {resolved}");
        }
        if loading {
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

fn write_png(surface: &PixelSurface, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let frame = surface.snapshot().into_straight();
    image::save_buffer_with_format(
        out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))
}

fn build_player(
    cfg: &PlayerConfig,
    root: &Path,
    size: SurfaceSize,
    threads: Option<usize>,
) -> anyhow::Result<ScrubPlayer<PixelSurface>> {
    let loader = FsLoader::new(root, threads)?;
    let surface = PixelSurface::new(size, cfg.background_rgba);
    let player = ScrubPlayer::new(cfg, Box::new(loader), surface, SessionState::default())?
        .with_scheduler(Rc::new(ManualTicker::new()));
    Ok(player)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (mut cfg, root) = args.source.load()?;
    cfg.smoothing = Smoothing::Immediate;
    // only the frame being painted matters here
    cfg.preload_window = 0;

    let size = SurfaceSize::new(args.width, args.height);
    let mut player = build_player(&cfg, &root, size, args.threads)?;
    player.mount(size, Some(geometry_at(args.progress, f64::from(args.height))));
    settle(&mut player, Duration::from_secs(30))?;

    let resolved = player.resolved_frame();
    if player.painted_frame() != Some(resolved) {
        anyhow::bail!("frame {resolved} could not be loaded");
    }
    write_png(player.surface(), &args.out)?;
    eprintln!("wrote {} (frame {resolved})", args.out.display());
    Ok(())
}

fn cmd_scrub(args: ScrubArgs) -> anyhow::Result<()> {
    let (cfg, root) = args.source.load()?;
    let size = SurfaceSize::new(args.width, args.height);
    let viewport = f64::from(args.height);
    let steps = args.steps.max(1);
    let timeout = Duration::from_millis(args.timeout_ms);

    let mut player = build_player(&cfg, &root, size, args.threads)?;
    player.mount(size, Some(geometry_at(0.0, viewport)));
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    for step in 0..steps {
        let progress = if steps == 1 {
            0.0
        } else {
            f64::from(step) / f64::from(steps - 1)
        };
        player.on_scroll(Some(geometry_at(progress, viewport)));
        settle(&mut player, timeout)?;

        let out = args.out.join(format!("step_{step:04}.png"));
        write_png(player.surface(), &out)?;
        eprintln!(
            "step {step}: progress {progress:.3} -> frame {} (painted {:?})",
            player.resolved_frame(),
            player.painted_frame()
        );
    }

    let stats = player.store().stats();
    eprintln!(
        "loaded {} failed {} (primary attempts {}, fallback attempts {}), ready: {}, complete: {}",
        stats.loaded,
        stats.failed,
        stats.primary_attempts,
        stats.fallback_attempts,
        player.is_ready(),
        player.is_complete()
    );
    player.teardown();
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let (cfg, root) = args.source.load()?;
    let sequence = cfg.sequence()?;
    let exists = |locator: Option<String>| -> anyhow::Result<bool> {
        let Some(locator) = locator else {
            return Ok(false);
        };
        let norm = normalize_rel_path(&locator)?;
        Ok(root.join(norm).is_file())
    };

    let mut missing = Vec::new();
    let mut via_fallback = 0u32;
    for index in 0..sequence.frame_count() {
        if exists(sequence.locator(index, Attempt::Primary))? {
            continue;
        }
        if exists(sequence.locator(index, Attempt::Fallback))? {
            via_fallback += 1;
        } else {
            missing.push(index);
        }
    }

    eprintln!(
        "{} frames, {} served by fallback, {} missing",
        sequence.frame_count(),
        via_fallback,
        missing.len()
    );
    for index in &missing {
        if let Some(locator) = sequence.locator(*index, Attempt::Primary) {
            eprintln!("  missing frame {index}: {locator}");
        }
    }
    if !missing.is_empty() {
        anyhow::bail!("{} frame(s) missing under '{}'", missing.len(), root.display());
    }
    Ok(())
}
