//! # lottie
//!
//! Inspect and render Lottie documents from the command line.
//!
//! ## Commands
//! - `info`: summary of a document (size, timing, layers, markers)
//! - `render`: one frame to PNG
//! - `sequence`: every frame of the document or a marker to numbered PNGs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lottie_core::{Composition, EngineConfig, ExpressionErrorPolicy, FileResolver, LottiePlayer};
use lottie_raster::{render_frame, RenderOptions};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "lottie")]
#[command(about = "Inspect and render Lottie animations")]
#[command(version)]
struct Cli {
    /// Engine settings as JSON (see `EngineConfig`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Abort on the first failing expression instead of falling back
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show a summary of the document
    Info {
        input: PathBuf,

        /// Print machine readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Render one frame to PNG
    Render {
        input: PathBuf,

        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,

        /// Frame number; defaults to the first frame
        #[arg(short, long, conflicts_with = "time")]
        frame: Option<f32>,

        /// Time in seconds from the first frame
        #[arg(short, long)]
        time: Option<f32>,

        #[command(flatten)]
        raster: RasterArgs,
    },

    /// Render the whole animation, or one marker, to numbered PNGs
    Sequence {
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "frames")]
        output: PathBuf,

        /// Output frames per second; defaults to the document's frame rate
        #[arg(long)]
        fps: Option<f32>,

        /// Restrict to a named marker
        #[arg(short, long)]
        marker: Option<String>,

        #[command(flatten)]
        raster: RasterArgs,
    },
}

#[derive(clap::Args, Debug)]
struct RasterArgs {
    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Background as RRGGBB or RRGGBBAA hex; transparent when omitted
    #[arg(long)]
    background: Option<String>,
}

impl RasterArgs {
    fn options(&self, comp: &Composition) -> Result<RenderOptions> {
        let (w, h) = comp.size();
        let size = match (self.width, self.height) {
            (None, None) => None,
            (Some(width), None) => Some((width, scaled(width, h / w))),
            (None, Some(height)) => Some((scaled(height, w / h), height)),
            (Some(width), Some(height)) => Some((width, height)),
        };
        let background = self.background.as_deref().map(parse_hex).transpose()?;
        Ok(RenderOptions { size, background })
    }
}

fn scaled(v: u32, ratio: f32) -> u32 {
    ((v as f32 * ratio).round() as u32).max(1)
}

fn parse_hex(s: &str) -> Result<[u8; 4]> {
    let s = s.trim_start_matches('#');
    let byte = |i: usize| {
        s.get(i..i + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .with_context(|| format!("invalid color `{s}`"))
    };
    match s.len() {
        6 => Ok([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Ok([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => bail!("color `{s}` must be RRGGBB or RRGGBBAA"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lottie=info,lottie_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.strict)?;

    match cli.command {
        Commands::Info { input, json } => cmd_info(&input, config, json),
        Commands::Render {
            input,
            output,
            frame,
            time,
            raster,
        } => cmd_render(&input, config, &output, frame, time, &raster),
        Commands::Sequence {
            input,
            output,
            fps,
            marker,
            raster,
        } => cmd_sequence(&input, config, &output, fps, marker.as_deref(), &raster),
    }
}

fn load_config(path: Option<&Path>, strict: bool) -> Result<EngineConfig> {
    let mut config = match path {
        Some(p) => {
            let text =
                fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            EngineConfig::from_json(&text).with_context(|| format!("parsing {}", p.display()))?
        }
        None => EngineConfig::default(),
    };
    if strict {
        config.expression_errors = ExpressionErrorPolicy::Fail;
        config.strict_expressions = true;
    }
    Ok(config)
}

/// Builds the composition and pulls in external images next to the file.
fn open(input: &Path, config: EngineConfig) -> Result<Composition> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let mut comp = Composition::from_slice(&bytes, config)
        .with_context(|| format!("loading {}", input.display()))?;
    let resolver = FileResolver {
        root: input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    if let Err(err) = comp.resolve_images(&resolver) {
        warn!(error = %err, "some images could not be loaded");
    }
    Ok(comp)
}

fn cmd_info(input: &Path, config: EngineConfig, json: bool) -> Result<()> {
    let comp = open(input, config)?;
    let (w, h) = comp.size();
    let markers: Vec<_> = comp
        .markers()
        .iter()
        .map(|m| serde_json::json!({"name": m.name, "start": m.start, "duration": m.duration}))
        .collect();
    let effects: Vec<_> = comp
        .effect_names()
        .into_iter()
        .map(|(layer, effect)| format!("{layer}: {effect}"))
        .collect();
    let missing: Vec<_> = comp.missing_images().map(|r| r.path.clone()).collect();

    if json {
        let summary = serde_json::json!({
            "name": comp.name(),
            "width": w,
            "height": h,
            "frame_rate": comp.frame_rate(),
            "start_frame": comp.start_frame(),
            "end_frame": comp.end_frame(),
            "duration": comp.duration(),
            "layers": comp.layer_names(),
            "markers": markers,
            "effects": effects,
            "missing_images": missing,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", comp.name().unwrap_or("(unnamed)"));
    println!("  size:      {w} x {h}");
    println!(
        "  frames:    {} - {} at {} fps ({:.2}s)",
        comp.start_frame(),
        comp.end_frame(),
        comp.frame_rate(),
        comp.duration()
    );
    println!("  layers:    {}", comp.layer_names().join(", "));
    for m in comp.markers() {
        println!("  marker:    {} @ {} (+{})", m.name, m.start, m.duration);
    }
    for e in &effects {
        println!("  effect:    {e}");
    }
    for path in &missing {
        println!("  missing:   {path}");
    }
    Ok(())
}

fn cmd_render(
    input: &Path,
    config: EngineConfig,
    output: &Path,
    frame: Option<f32>,
    time: Option<f32>,
    raster: &RasterArgs,
) -> Result<()> {
    let comp = open(input, config)?;
    let frame = match (frame, time) {
        (Some(f), _) => f,
        (None, Some(t)) => comp.start_frame() + t * comp.frame_rate(),
        (None, None) => comp.start_frame(),
    };
    let pixmap = render_frame(&comp, frame, raster.options(&comp)?)
        .with_context(|| format!("rendering frame {frame}"))?;
    pixmap
        .save_png(output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(frame, output = %output.display(), "rendered");
    Ok(())
}

fn cmd_sequence(
    input: &Path,
    config: EngineConfig,
    output: &Path,
    fps: Option<f32>,
    marker: Option<&str>,
    raster: &RasterArgs,
) -> Result<()> {
    let comp = open(input, config)?;
    let options = raster.options(&comp)?;
    let fps = fps.unwrap_or(comp.frame_rate());
    if !(fps.is_finite() && fps > 0.0) {
        bail!("fps must be positive");
    }
    fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;

    let mut player = LottiePlayer::new(comp);
    player.set_looping(false);
    if let Some(name) = marker {
        if !player.play_marker(name) {
            bail!("no marker named `{name}`");
        }
    }

    let mut count = 0usize;
    loop {
        let frame = player.current_frame();
        let pixmap = render_frame(player.composition(), frame, options)
            .with_context(|| format!("rendering frame {frame}"))?;
        let path = output.join(format!("frame_{count:05}.png"));
        pixmap
            .save_png(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        count += 1;
        if player.is_finished() {
            break;
        }
        player.advance(1.0 / fps);
    }
    info!(frames = count, output = %output.display(), "rendered sequence");
    Ok(())
}
