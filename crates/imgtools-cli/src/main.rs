use std::path::PathBuf;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use imgtools_core::{
    BatchReport, DryRunFs, ExifStore, FileSystem, ResolveFlags, Resolver, ScaleOptions, StampOptions, StdFs,
};

#[derive(Parser)]
#[command(name = "imgtools", version, about = "Date stamp, scale and collect the best of your photos")]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log file operations instead of performing them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rename images to "YYYY-MM-DD title.ext" using EXIF, filename and file dates
    Stamp {
        /// Strip any existing date/time stamps from filename (ignores --time)
        #[arg(short, long)]
        strip: bool,

        /// Include time in date stamp
        #[arg(short, long)]
        time: bool,

        /// Fall back to the file modification time when nothing else has a date
        #[arg(short = 'f', long)]
        filesystem_time: bool,

        /// Images or directories (directories are not descended into)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Write downscaled "<name>.scaled.<ext>" copies, keeping EXIF
    Scale {
        /// Limit the longest side to this many pixels
        #[arg(short, long, default_value_t = imgtools_core::scaler::DEFAULT_LIMIT_SIZE)]
        limit_size: u32,

        /// Convert to greyscale
        #[arg(short, long)]
        greyscale: bool,

        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Copy images into the nearest "All Stars" folder up the directory tree
    Allstar {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print resolved date, title and rotation as JSON
    Info {
        /// Fall back to the file modification time
        #[arg(short = 'f', long)]
        filesystem_time: bool,

        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "imgtools_core=info,imgtools=info",
        _ => "imgtools_core=debug,imgtools=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}") {
        pb.set_style(style);
    }
    pb
}

fn print_report(report: &BatchReport, elapsed: f64) {
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    for error in &report.errors {
        eprintln!("error: {error}");
    }
    eprintln!(
        "Done! {} processed, {} unchanged, {} skipped, {} failed ({:.2}s)",
        report.processed, report.unchanged, report.skipped, report.failed, elapsed
    );
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let t_total = std::time::Instant::now();

    let dry_run_fs = DryRunFs::new(StdFs);
    let fs: &dyn FileSystem = if cli.dry_run { &dry_run_fs } else { &StdFs };
    let exif = ExifStore;

    let pb = progress_bar();
    let callback = |_stage: &str, current: u64, total: u64, message: &str| {
        pb.set_length(total);
        pb.set_position(current + 1);
        pb.set_message(message.to_string());
    };
    let progress = imgtools_core::ThrottledProgress::new(&callback);

    let report = match cli.command {
        Command::Stamp { strip, time, filesystem_time, paths } => {
            let options = StampOptions {
                strip,
                time,
                use_filesystem_time: filesystem_time,
            };
            let files = imgtools_core::collect_paths(fs, &paths, true)?;
            info!("stamping {} file(s)", files.len());
            imgtools_core::stamp(fs, &exif, &files, &options, &progress)?
        }
        Command::Scale { limit_size, greyscale, paths } => {
            let options = ScaleOptions {
                limit_size,
                greyscale,
                dry_run: cli.dry_run,
            };
            let files = imgtools_core::collect_paths(fs, &paths, false)?;
            imgtools_core::scale(&exif, &files, &options, &progress)?
        }
        Command::Allstar { paths } => {
            let files = imgtools_core::collect_paths(fs, &paths, false)?;
            imgtools_core::copy_to_all_stars(fs, &files, &progress)
        }
        Command::Info { filesystem_time, paths } => {
            pb.finish_and_clear();
            let resolver = Resolver::new(fs, &exif);
            let flags = ResolveFlags {
                use_filename: true,
                use_filesystem_time: filesystem_time,
            };
            for path in imgtools_core::collect_paths(fs, &paths, false)? {
                let summary = imgtools_core::summarize(&resolver, &path, flags);
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            return Ok(());
        }
    };
    pb.finish_and_clear();

    print_report(&report, t_total.elapsed().as_secs_f64());
    if report.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
