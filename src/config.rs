use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::rate_limit::RateLimitConfig;

// One year, longer windows are a misconfiguration
const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "leadgate")]
#[command(about = "Form submission backend for the marketing landing page")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "LEADGATE_PORT", default_value_t = 8080)]
    pub port: u16,

    // SQLite database file
    #[arg(short, long, env = "LEADGATE_DATABASE", default_value = "leadgate.db")]
    pub database: String,

    // PDF served by /api/guide/download, keep it out of the public dir
    #[arg(
        long,
        env = "LEADGATE_GUIDE_PATH",
        default_value = "assets/steel-automation-guide.pdf"
    )]
    pub guide_path: PathBuf,

    // Static assets served for any other path
    #[arg(long, env = "LEADGATE_PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,

    // Form endpoints: max requests per window
    #[arg(long, env = "LEADGATE_FORM_RATE_LIMIT", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub form_rate_limit: u32,

    // Form endpoints: window in seconds
    #[arg(long, env = "LEADGATE_FORM_RATE_WINDOW", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..=MAX_WINDOW_SECS))]
    pub form_rate_window: u64,

    // Guide download: max requests per window
    #[arg(long, env = "LEADGATE_DOWNLOAD_RATE_LIMIT", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub download_rate_limit: u32,

    // Guide download: window in seconds
    #[arg(long, env = "LEADGATE_DOWNLOAD_RATE_WINDOW", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..=MAX_WINDOW_SECS))]
    pub download_rate_window: u64,

    // Seconds between rate limit sweeps, 0 turns the sweeper off
    #[arg(long, env = "LEADGATE_SWEEP_INTERVAL", default_value_t = 300)]
    pub sweep_interval: u64,

    // Log filter used when RUST_LOG is unset
    #[arg(long, env = "LEADGATE_LOG_LEVEL", default_value = "leadgate=info,tower_http=info")]
    pub log_level: String,
}

impl Args {
    pub fn form_limit(&self) -> RateLimitConfig {
        RateLimitConfig::new(
            self.form_rate_limit,
            Duration::from_secs(self.form_rate_window),
        )
    }

    pub fn download_limit(&self) -> RateLimitConfig {
        RateLimitConfig::new(
            self.download_rate_limit,
            Duration::from_secs(self.download_rate_window),
        )
    }

    pub fn sweep_every(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }
}
