//! DanMu CLI Tool
//!
//! Command-line interface for inspecting comment files and simulating their
//! playback through the scheduler without a display.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use danmu_core::{Category, Color, CommentEvent, CommentSequence};
use danmu_scheduler::{
    CommentDispatcher, HeadlessRenderer, ManualTime, SchedulerConfig, TimeSource,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "danmu")]
#[command(about = "DanMu - timed comment overlay scheduler")]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides the level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a comment file
    Info {
        /// JSON file of normalized comment records
        input: PathBuf,
    },

    /// Write randomly generated comments to a JSON file
    Generate {
        /// Output JSON file
        output: PathBuf,

        /// Number of comments to generate
        #[arg(long, default_value = "500")]
        count: usize,

        /// Time span of generated comments in seconds
        #[arg(long, default_value = "60")]
        span: f64,

        /// Seed for the generator
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Play a comment file through the scheduler without a display
    Simulate {
        /// JSON file of normalized comment records (omit to use --demo)
        input: Option<PathBuf>,

        /// Generate this many random comments instead of reading a file
        #[arg(long, default_value = "500")]
        demo: usize,

        /// Time span of generated comments in seconds
        #[arg(long, default_value = "60")]
        demo_span: f64,

        /// Seed for generated comments and admission draws
        #[arg(long)]
        seed: Option<u64>,

        /// JSON scheduler configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the speed multiplier
        #[arg(long)]
        speed: Option<f64>,

        /// Override the font size multiplier
        #[arg(long)]
        font_scale: Option<f64>,

        /// Override the active comment capacity
        #[arg(long)]
        max_active: Option<usize>,

        /// Override the screen width in pixels
        #[arg(long)]
        width: Option<f64>,

        /// Override the screen height in pixels
        #[arg(long)]
        height: Option<f64>,

        /// Playback time at which to seek once
        #[arg(long)]
        seek_at: Option<f64>,

        /// Seconds to seek by at --seek-at (negative rewinds)
        #[arg(long, default_value = "-5", allow_hyphen_values = true)]
        seek_by: f64,

        /// Print progress every this many playback seconds
        #[arg(long, default_value = "5")]
        report_every: f64,

        /// Run on the system clock, sleeping between ticks
        #[arg(long)]
        realtime: bool,
    },
}

struct SimulateOptions {
    seek_at: Option<f64>,
    seek_by: f64,
    report_every: f64,
    realtime: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => show_info(&input)?,

        Commands::Generate {
            output,
            count,
            span,
            seed,
        } => {
            let sequence = demo_sequence(count, span, seed)?;
            write_sequence(&sequence, &output)?;
            println!("Wrote {} comments to {}", sequence.len(), output.display());
        }

        Commands::Simulate {
            input,
            demo,
            demo_span,
            seed,
            config,
            speed,
            font_scale,
            max_active,
            width,
            height,
            seek_at,
            seek_by,
            report_every,
            realtime,
        } => {
            let mut config = match config {
                Some(path) => read_config(&path)?,
                None => SchedulerConfig::default(),
            };
            if let Some(speed) = speed {
                config.settings.speed_multiplier = speed;
            }
            if let Some(font_scale) = font_scale {
                config.settings.font_size_multiplier = font_scale;
            }
            if let Some(max_active) = max_active {
                config.settings.max_active_count = max_active;
            }
            if let Some(width) = width {
                config.screen.width = width;
            }
            if let Some(height) = height {
                config.screen.height = height;
            }
            if seed.is_some() {
                config.rng_seed = seed;
            }

            let sequence = match input {
                Some(path) => read_sequence(&path)?,
                None => demo_sequence(demo, demo_span, seed)?,
            };

            let options = SimulateOptions {
                seek_at,
                seek_by,
                report_every: report_every.max(0.1),
                realtime,
            };
            simulate(sequence, config, &options)?;
        }
    }

    Ok(())
}

/// Installs the tracing subscriber. `RUST_LOG` is honoured, falling back to
/// `debug` with `--verbose` and `info` otherwise.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_sequence(path: &Path) -> Result<CommentSequence> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let sequence = CommentSequence::from_json_reader(BufReader::new(file))
        .with_context(|| format!("Failed to read comments from {}", path.display()))?;
    info!(comments = sequence.len(), path = %path.display(), "Read comment file");
    Ok(sequence)
}

fn write_sequence(sequence: &CommentSequence, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    sequence
        .to_json_writer(&mut writer)
        .with_context(|| format!("Failed to write comments to {}", path.display()))?;
    writer.flush()?;
    info!(comments = sequence.len(), path = %path.display(), "Wrote comment file");
    Ok(())
}

fn read_config(path: &Path) -> Result<SchedulerConfig> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let config: SchedulerConfig =
        serde_json::from_reader(BufReader::new(file)).context("Failed to parse scheduler config")?;
    debug!(?config, "Read scheduler config");
    Ok(config)
}

/// Random comments spread over `span` seconds, mostly scrolling right to left
fn demo_sequence(count: usize, span: f64, seed: Option<u64>) -> Result<CommentSequence> {
    const PHRASES: [&str; 8] = [
        "前方高能",
        "233333",
        "awsl",
        "this part again",
        "哈哈哈哈哈",
        "good morning from the comments",
        "名场面",
        "first time here?",
    ];

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let span = span.max(1.0);

    let events = (0..count)
        .map(|_| {
            let category = match rng.gen_range(0..20) {
                0 => Category::ScrollLeftToRight,
                1..=2 => Category::FixedTop,
                3..=4 => Category::FixedBottom,
                _ => Category::ScrollRightToLeft,
            };
            let text = PHRASES[rng.gen_range(0..PHRASES.len())];
            let color = if rng.gen_bool(0.8) {
                Color::WHITE
            } else {
                Color::from_packed_rgb(rng.gen_range(0..=0xFF_FF_FF))
            };

            CommentEvent::new(category, text, rng.gen_range(0.0..span), category.default_duration())
                .with_color(color)
        })
        .collect();

    CommentSequence::new(events).context("Failed to build demo comments")
}

fn show_info(input: &Path) -> Result<()> {
    println!("Reading comment file: {}", input.display());
    let sequence = read_sequence(input)?;

    println!("\n=== Comment File Information ===");
    println!("Comments: {}", sequence.len());

    let categories = [
        Category::ScrollRightToLeft,
        Category::ScrollLeftToRight,
        Category::FixedTop,
        Category::FixedBottom,
    ];
    for category in categories {
        let count = sequence.iter().filter(|e| e.category == category).count();
        println!("  {:?}: {}", category, count);
    }

    if let (Some(first), Some(last)) = (sequence.events().first(), sequence.events().last()) {
        println!(
            "Start times: {:.2}s to {:.2}s",
            first.start_time, last.start_time
        );
    }
    println!("Total time: {:.2} seconds", sequence.total_time());

    println!("\n=== Comments (first 10) ===");
    for (i, event) in sequence.iter().take(10).enumerate() {
        println!(
            "  [{}] {:?} at {:.2}s for {:.2}s, {} {}pt: {}",
            i,
            event.category,
            event.start_time,
            event.duration,
            event.font_name,
            event.font_size,
            event.text
        );
    }
    if sequence.len() > 10 {
        println!("  ... and {} more comments", sequence.len() - 10);
    }

    Ok(())
}

fn simulate(sequence: CommentSequence, config: SchedulerConfig, options: &SimulateOptions) -> Result<()> {
    if options.realtime {
        let dispatcher = CommentDispatcher::with_system_time(HeadlessRenderer::new(), config)
            .context("Invalid scheduler configuration")?;
        run(dispatcher, sequence, options, |step| {
            thread::sleep(Duration::from_secs_f64(step))
        })
    } else {
        let time = ManualTime::new(0.0);
        let dispatcher = CommentDispatcher::new(HeadlessRenderer::new(), time.clone(), config)
            .context("Invalid scheduler configuration")?;
        run(dispatcher, sequence, options, |step| time.advance(step))
    }
}

/// Ticks the dispatcher until every comment has been dispatched and gone off
/// screen. `wait` lets `step` seconds pass on the dispatcher's time source.
fn run<T: TimeSource>(
    mut dispatcher: CommentDispatcher<HeadlessRenderer, T>,
    sequence: CommentSequence,
    options: &SimulateOptions,
    mut wait: impl FnMut(f64),
) -> Result<()> {
    let step = dispatcher.config().tick_interval().as_secs_f64();
    let comments = sequence.len();
    dispatcher.load(sequence);
    let total = dispatcher.get_total_time();
    let time_limit = total * 4.0 + 60.0;

    println!(
        "Simulating {} comments over {:.2}s ({} lanes per group, tick {:.0} ms)",
        comments,
        total,
        dispatcher.lane_count(),
        step * 1000.0
    );

    let mut seek_at = options.seek_at;
    let mut next_report = options.report_every;

    loop {
        let now = dispatcher.time().now();
        dispatcher.renderer_mut().advance(now);
        dispatcher.tick();

        let elapsed = dispatcher.get_elapsed_time();
        if let Some(at) = seek_at {
            if elapsed >= at {
                seek_at = None;
                if options.seek_by < 0.0 {
                    dispatcher.rewind(-options.seek_by);
                } else {
                    dispatcher.fast_forward(options.seek_by);
                }
                println!(
                    "  seek by {:+.2}s at {:.2}s -> {:.2}s",
                    options.seek_by,
                    elapsed,
                    dispatcher.get_elapsed_time()
                );
                next_report = dispatcher.get_elapsed_time() + options.report_every;
            }
        }

        if elapsed >= next_report {
            let stats = dispatcher.stats();
            println!(
                "  {:>7.2}s  {:>5.1}%  on screen {:>4}  admitted {:>6}  rejected {:>6}",
                elapsed,
                dispatcher.progress() * 100.0,
                dispatcher.active_count(),
                stats.admitted,
                stats.rejected
            );
            next_report += options.report_every;
        }

        if dispatcher.cursor() >= comments && dispatcher.active_count() == 0 {
            break;
        }
        if now > time_limit {
            warn!(now, "Simulation did not drain, stopping");
            break;
        }
        wait(step);
    }

    let stats = dispatcher.stats();
    let usage = dispatcher.resource_usage();
    println!("\n=== Simulation Summary ===");
    println!("Wall time: {:.2}s", dispatcher.time().now());
    println!("Admitted: {}", stats.admitted);
    println!("Rejected: {}", stats.rejected);
    println!("Completed: {}", stats.completed);
    println!("Cleared by seeks: {} ({} seeks)", stats.cleared, stats.clears);
    println!("Peak on screen: {}", stats.peak_active);
    println!(
        "Handles created: {} labels, {} animations",
        usage.labels_created, usage.animations_created
    );

    dispatcher.stop();
    Ok(())
}
