//! xmesh CLI - Inspect mesh sequences and their timing.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use xmesh::core::{ClampMode, FrameRange, FrameSet, LoadingMode, SamplePlan, DEFAULT_DERIVATIVE_STEP};
use xmesh::loader::LoaderSettings;
use xmesh::sequence::FilenameSequence;
use xmesh::Frame;

#[derive(Parser)]
#[command(name = "xmesh", version, about = "xmesh sequence toolkit")]
#[command(after_help = concat!("Built ", env!("XMESH_BUILD_DATE"), " ", env!("XMESH_BUILD_TIME")))]
struct Cli {
    /// Show debug output (-vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the frames available for a sequence pattern
    #[command(visible_alias = "f")]
    Frames {
        /// Sequence pattern, e.g. /cache/fluid_####.xmesh
        pattern: PathBuf,
        /// Print every frame
        #[arg(short, long)]
        list: bool,
    },

    /// Show which frames an evaluation at a host time would load
    #[command(visible_alias = "p")]
    Plan {
        /// Sequence pattern
        pattern: PathBuf,
        /// Host frame to evaluate
        #[arg(short, long, allow_negative_numbers = true)]
        time: Frame,
        /// Loader settings file (JSON); the pattern overrides its render path
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Loading mode
        #[arg(short, long)]
        mode: Option<LoadingMode>,
        /// Frame offset
        #[arg(short, long, allow_negative_numbers = true)]
        offset: Option<Frame>,
        /// Custom frame range
        #[arg(long, num_args = 2, value_names = ["START", "END"], allow_negative_numbers = true)]
        range: Option<Vec<Frame>>,
        /// Behavior before the range (hold, blank)
        #[arg(long)]
        start_clamp: Option<ClampMode>,
        /// Behavior after the range (hold, blank)
        #[arg(long)]
        end_clamp: Option<ClampMode>,
    },

    /// Print loader settings as JSON, or write them to a file
    #[command(visible_alias = "s")]
    Settings {
        /// Settings file to read instead of the defaults
        #[arg(long)]
        input: Option<PathBuf>,
        /// Write to this file instead of printing
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Frames { pattern, list } => cmd_frames(&pattern, list),
        Command::Plan { pattern, time, settings, mode, offset, range, start_clamp, end_clamp } => {
            let mut s = match settings {
                Some(path) => LoaderSettings::load(&path)
                    .with_context(|| format!("failed to read settings {}", path.display()))?,
                None => LoaderSettings::default(),
            };
            s.render_path = pattern;
            if let Some(mode) = mode {
                s.loading_mode = mode;
            }
            if let Some(offset) = offset {
                s.frame_offset = offset;
            }
            if let Some(range) = range {
                s.use_custom_range = true;
                s.range_start = range[0];
                s.range_end = range[1];
            }
            if let Some(clamp) = start_clamp {
                s.start_clamp = clamp;
            }
            if let Some(clamp) = end_clamp {
                s.end_clamp = clamp;
            }
            cmd_plan(&s, time)
        }
        Command::Settings { input, output } => cmd_settings(input, output),
    }
}

/// Log filter from `XMESH_LOG`, falling back to the verbosity flags.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("XMESH_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_frames(pattern: &Path, list: bool) -> anyhow::Result<()> {
    let seq = FilenameSequence::open(pattern)
        .with_context(|| format!("failed to scan {}", pattern.display()))?;
    let frames = seq.frames();

    println!("Pattern: {}", seq.pattern());
    println!("Frames:  {}", frames.len());
    if let (Some(min), Some(max)) = (frames.min(), frames.max()) {
        println!("Range:   {min} - {max}");
        let subframes = frames.iter().filter(|f| f.fract() != 0.0).count();
        if subframes > 0 {
            println!("Subframes: {subframes}");
        }
    }
    if list {
        for frame in frames.iter() {
            println!("  {:>10}  {}", frame, seq.file_for(frame).display());
        }
    }
    Ok(())
}

fn cmd_plan(settings: &LoaderSettings, time: Frame) -> anyhow::Result<()> {
    settings.validate()?;
    let mode = settings.loading_mode;
    println!("Mode:     {mode}");

    match mode {
        LoadingMode::Blank => {
            println!("Plan:     blank");
            return Ok(());
        }
        LoadingMode::Static => {
            println!("Plan:     static file {}", settings.render_path.display());
            return Ok(());
        }
        _ => {}
    }

    let seq = FilenameSequence::open(&settings.render_path)
        .with_context(|| format!("failed to scan {}", settings.render_path.display()))?;
    if seq.frames().is_empty() {
        bail!("no frames found for {}", seq.pattern());
    }

    let timing = settings.timing(None)?;
    let source = timing.resolve(time)?;
    let derivative = timing.time_derivative(time, DEFAULT_DERIVATIVE_STEP)?;
    println!("Source:   {source} (d/dt {derivative})");
    if let Some(FrameRange { start, end }) = timing.range() {
        println!("Range:    {start} - {end}");
    }

    let planned = if mode.is_interpolation() {
        timing.plan_bracket(time, seq.frames(), mode.frame_step(), settings.clamp_policy())?
    } else {
        timing.plan_offset(time, seq.frames(), mode.frame_step(), settings.clamp_policy())?
    };
    println!("Region:   {:?}", planned.region);

    match planned.plan {
        SamplePlan::Blank => println!("Plan:     blank"),
        SamplePlan::Frame { frame, offset } => {
            println!("Plan:     frame {frame}, offset {offset:+} frames");
            println!("  {}", seq.file_for(frame).display());
        }
        SamplePlan::Bracket { lo, hi, alpha } => {
            println!("Plan:     blend {lo} -> {hi}, alpha {alpha:.4}");
            println!("  {}", seq.file_for(lo).display());
            if hi != lo {
                println!("  {}", seq.file_for(hi).display());
            }
        }
    }
    Ok(())
}

fn cmd_settings(input: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = match input {
        Some(path) => LoaderSettings::load(&path)
            .with_context(|| format!("failed to read settings {}", path.display()))?,
        None => LoaderSettings::default(),
    };
    match output {
        Some(path) => {
            settings.save(&path)?;
            tracing::info!(path = %path.display(), "settings written");
        }
        None => println!("{}", serde_json::to_string_pretty(&settings)?),
    }
    Ok(())
}
