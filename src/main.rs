use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use mp3mirror::logging::init_tracing;
use mp3mirror::{
    Action, FfmpegTranscoder, FsCopier, NoopReporter, ProgressEvent, ProgressReporter,
    SharedProgressReporter, SyncOptions, SyncPlan, SyncReport, plan, sync_library,
};

// Emoji with fallback for terminals without Unicode support
static MUSIC: Emoji<'_, '_> = Emoji("🎵 ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static TRANSCODE: Emoji<'_, '_> = Emoji("🔊 ", "[t] ");
static COPY: Emoji<'_, '_> = Emoji("📂 ", "[c] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[?] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Mirror a music library into an MP3-only copy
#[derive(Parser, Debug)]
#[command(name = "mp3mirror")]
#[command(about = "Mirror a music library, transcoding everything that is not MP3")]
#[command(version)]
struct Args {
    /// Directory in which to find original music files
    #[arg(long, default_value = "source")]
    source: PathBuf,

    /// Output directory for MP3 files
    #[arg(long, default_value = "destination")]
    destination: PathBuf,

    /// Maximum number of files processed at once
    #[arg(short = 'c', long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..=256))]
    concurrent: u16,

    /// Encoder binary used for transcoding
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Only show what would be done
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print the plan or the report as JSON
    #[arg(long)]
    json: bool,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Show debug log output
    #[arg(short, long)]
    verbose: bool,
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<usize, ProgressBar>>,
    main_bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
            main_bar,
        }
    }

    fn get_or_create_bar(&self, slot_id: usize) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(bar) = bars.get(&slot_id) {
            return bar.clone();
        }

        let style = ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {elapsed:>4} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        bars.insert(slot_id, bar.clone());
        bar
    }

    fn finish_bar(&self, slot_id: usize) {
        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = bars.remove(&slot_id) {
            bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::ScanningTree { root } => {
                self.main_bar
                    .set_message(format!("{SEARCH}Scanning {}", root.cyan()));
            }

            ProgressEvent::PlanReady {
                total_files,
                ignored_count,
                synced_count,
                to_process,
            } => {
                self.main_bar.set_message(format!(
                    "{HEADPHONES}{} files • {} already synced, {} ignored, {} to process",
                    total_files.to_string().cyan(),
                    synced_count.to_string().green(),
                    ignored_count.to_string().dimmed(),
                    to_process.to_string().yellow()
                ));
            }

            ProgressEvent::CollisionDetected {
                destination,
                sources,
            } => {
                let _ = self.multi.println(format!(
                    "{WARNING}{} {} <- {}",
                    "Collision:".yellow().bold(),
                    destination.yellow(),
                    sources.join(", ").dimmed()
                ));
            }

            ProgressEvent::ItemStarting {
                slot_id,
                source,
                action,
                item_index,
                total_items,
            } => {
                let bar = self.get_or_create_bar(slot_id);
                bar.reset_elapsed();
                let icon = match action {
                    Action::Transcode => TRANSCODE,
                    Action::Copy => COPY,
                };
                bar.set_message(format!(
                    "{icon}[{}/{}] {}",
                    (item_index + 1).to_string().cyan(),
                    total_items.to_string().cyan(),
                    truncate_path(&source, 60)
                ));
            }

            ProgressEvent::ItemCompleted {
                slot_id,
                destination,
                ..
            } => {
                let bar = self.get_or_create_bar(slot_id);
                bar.set_message(format!(
                    "{SUCCESS}{}",
                    truncate_path(&destination, 60).green()
                ));
                self.finish_bar(slot_id);
            }

            ProgressEvent::ItemFailed {
                slot_id,
                source,
                destination,
                error,
            } => {
                let _ = self.multi.println(format!(
                    "{FAILURE}{} -> {} - {}",
                    source.red(),
                    destination.yellow(),
                    error.dimmed()
                ));
                self.finish_bar(slot_id);
            }

            ProgressEvent::Cancelling { remaining } => {
                self.main_bar.set_message(format!(
                    "{WARNING}Stopping, {} items will not be started",
                    remaining.to_string().yellow()
                ));
            }

            ProgressEvent::SyncCompleted {
                processed_count,
                synced_count,
                failed_count,
                cancelled_count,
            } => {
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} written, {} already synced, {} failed, {} cancelled",
                    "Sync complete:".bold().green(),
                    processed_count.to_string().green().bold(),
                    synced_count.to_string().yellow(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    },
                    cancelled_count.to_string().dimmed()
                );
            }
        }
    }
}

/// Shorten a path from the left so the file name stays visible
fn truncate_path(path: &str, max_chars: usize) -> String {
    let count = path.chars().count();
    if count <= max_chars {
        path.to_string()
    } else {
        let tail: String = path.chars().skip(count - max_chars + 3).collect();
        format!("...{tail}")
    }
}

fn print_plan(plan: &SyncPlan) {
    for item in &plan.to_process {
        let verb = match item.action {
            Action::Transcode => format!("{TRANSCODE}transcode").cyan(),
            Action::Copy => format!("{COPY}copy").green(),
        };
        println!("{verb} {} -> {}", item.source, item.destination.bold());
    }
    for collision in &plan.collisions {
        println!(
            "{WARNING}{} {} <- {}",
            "Collision:".yellow().bold(),
            collision.destination,
            collision.sources.join(", ")
        );
    }
    println!(
        "\n{} to process, {} already synced, {} ignored",
        plan.to_process.len().to_string().yellow(),
        plan.already_synced.len().to_string().green(),
        plan.ignored.len().to_string().dimmed()
    );
}

fn print_problems(report: &SyncReport) {
    if report.failed() > 0 {
        println!("\n{}", "Failed items:".red().bold());
        for (item, error) in report.failures() {
            println!(
                "  {}{} -> {} - {}",
                CROSS,
                item.source.yellow(),
                item.destination,
                error.dimmed()
            );
        }
    }

    if !report.missing.is_empty() {
        println!("\n{}", "Not in destination after sync:".yellow().bold());
        for destination in &report.missing {
            println!("  {CROSS}{destination}");
        }
    }
}

/// Default log filter; item failures are shown by the progress reporter
fn log_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "error" }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(log_level(args.verbose));

    let show_progress = !args.quiet && !args.json;

    if show_progress {
        println!(
            "\n{}{} {}\n",
            MUSIC,
            "mp3mirror".bold().magenta(),
            "- Music Library Mirror".dimmed()
        );
    }

    if args.dry_run {
        ensure!(
            args.source.is_dir(),
            "Source directory does not exist: {}",
            args.source.display()
        );

        let plan = plan(&args.source, &args.destination).context("Failed to plan sync")?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else if !args.quiet {
            print_plan(&plan);
        }
        return Ok(());
    }

    let options = SyncOptions {
        max_concurrent: args.concurrent.into(),
        ..Default::default()
    };

    // Stop starting new items on Ctrl-C; in-flight items finish
    let shutdown = options.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    let reporter: SharedProgressReporter = if show_progress {
        Arc::new(IndicatifReporter::new())
    } else {
        NoopReporter::shared()
    };

    let transcoder = FfmpegTranscoder::with_program(&args.ffmpeg);

    let report = sync_library(
        &transcoder,
        &FsCopier,
        &args.source,
        &args.destination,
        &options,
        reporter,
    )
    .await
    .context("Failed to sync library")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if !args.quiet {
        print_problems(&report);
        println!(
            "\n{FOLDER}Output: {}\n",
            args.destination.display().to_string().cyan()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_log_level_hides_item_warnings() {
        assert_eq!(log_level(false), "error");
        assert_eq!(log_level(true), "debug");
    }

    #[test]
    fn concurrency_defaults_to_sequential() {
        let args = Args::try_parse_from(["mp3mirror"]).unwrap();
        assert_eq!(args.concurrent, 1);
        assert_eq!(args.source, PathBuf::from("source"));
        assert_eq!(args.destination, PathBuf::from("destination"));
    }

    #[test]
    fn concurrency_is_bounded() {
        assert!(Args::try_parse_from(["mp3mirror", "-c", "0"]).is_err());
        assert!(Args::try_parse_from(["mp3mirror", "-c", "257"]).is_err());
        assert!(Args::try_parse_from(["mp3mirror", "-c", "99999999999"]).is_err());
        assert_eq!(
            Args::try_parse_from(["mp3mirror", "-c", "256"])
                .unwrap()
                .concurrent,
            256
        );
    }
}
