//! 🚀 tally-cli: the front door, the bouncer, the maitre d' of tally.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config,
//! sets up logging, and then lets the real code do the heavy lifting.
//! Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tally::app_config::ConfigOverrides;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// 🧮 Count the bytes in an S3 bucket by fetching every object in it.
#[derive(Debug, Parser)]
#[command(name = "tally", version)]
struct Args {
    /// Path to a TOML config file. Optional if env vars or --bucket say enough.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bucket to tally (overrides [storage.s3].bucket).
    #[arg(short, long)]
    bucket: Option<String>,

    /// Only objects whose key starts with this prefix.
    #[arg(short, long)]
    prefix: Option<String>,

    /// AWS region of the bucket.
    #[arg(short, long)]
    region: Option<String>,

    /// Number of concurrent fetch workers.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Keys allowed in flight between the lister and the workers.
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Give up on a single object after this many seconds.
    #[arg(long)]
    fetch_timeout_secs: Option<u64>,

    /// Don't draw the progress bar.
    #[arg(long)]
    no_progress: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
            region: self.region.clone(),
            worker_count: self.workers,
            queue_capacity: self.queue_capacity,
            fetch_timeout_secs: self.fetch_timeout_secs,
            show_progress: self.no_progress.then_some(false),
        }
    }
}

/// 🔊 `RUST_LOG` if set, otherwise `warn`, so every failed key still gets its line.
/// Garbage directives are skipped rather than fatal.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(rust_log.unwrap_or_default())
}

/// 🚀 main(): where it all begins. The "I pressed F5 and held my breath" moment.
///
/// 🔧 Steps:
/// 1. Pick up `.env` (AWS keys love living there)
/// 2. Init tracing
/// 3. Parse args, load config
/// 4. Run the thing
/// 5. Print the damage, or exit 1
#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    // 📡 Set up tracing, because println! debugging is a lifestyle choice we're trying to move past
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => debug!("🌱 loaded environment from {}", path.display()),
        Err(err) => debug!("🌱 no .env loaded: {}", err),
    }

    let args = Args::parse();

    // 🔒 A config path that doesn't exist is a typo, not a request for defaults
    if let Some(config_file) = &args.config {
        let exists = config_file.try_exists().with_context(|| {
            format!(
                "💀 Couldn't check whether the config file exists. Was checking here: '{}'",
                config_file.display()
            )
        })?;
        if !exists {
            error!(
                "💀 Config file '{}' does not exist. Relative paths are relative to the cwd, \
                 so when in doubt, go absolute.",
                config_file.display()
            );
            std::process::exit(1);
        }
    }

    let result = match tally::app_config::load_config_with_overrides(
        args.config.as_deref(),
        &args.overrides(),
    ) {
        Ok(app_config) => {
            let label = app_config.storage.label();
            tally::run(app_config).await.map(|stats| (stats, label))
        }
        Err(err) => Err(err),
    };

    match result {
        Ok((stats, label)) => {
            println!(
                "All workers finished in: {}",
                tally::report::format_duration(stats.elapsed())
            );
            println!("{}", tally::report::render_summary(&stats, &label));
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion, one layer at a time
            let mut the_vibes_are_giving_credential_issues = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("AccessDenied")
                    || cause_str.contains("InvalidAccessKeyId")
                    || cause_str.contains("SignatureDoesNotMatch")
                    || cause_str.contains("credentials")
                {
                    the_vibes_are_giving_credential_issues = true;
                }
            }

            if the_vibes_are_giving_credential_issues {
                error!(
                    "🔧 hint: this smells like a credentials problem. Check AWS_ACCESS_KEY_ID / \
                     AWS_SECRET_ACCESS_KEY (a .env file in the cwd works), AWS_PROFILE, and \
                     that the bucket's region matches --region."
                );
            }

            // 🗑️ Exit with prejudice.
            std::process::exit(1);
        }
    }
}
