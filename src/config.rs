//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{services::RingingConfig, state::AppSettings};

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "focus-alarm")]
#[command(about = "A focus-timer daemon with alarms that survive restarts")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Directory for the timer record and reminder registry
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Habit records exported by the app (JSON array)
    #[arg(long)]
    pub habits_file: Option<PathBuf>,

    /// Behave as if exact alarm permission was denied
    #[arg(long)]
    pub no_exact_alarms: bool,

    /// How late best-effort alarms may fire, in seconds
    #[arg(long, default_value = "30")]
    pub inexact_slack_secs: u64,

    /// Ringing stops by itself after this many minutes
    #[arg(long, default_value = "10")]
    pub ring_ceiling_mins: u64,

    /// Upper bound on the wake lock held while ringing, in minutes
    #[arg(long, default_value = "10")]
    pub wake_lock_ceiling_mins: u64,

    /// How long the "timer still running" notice stays up, in seconds
    #[arg(long, default_value = "8")]
    pub reassurance_secs: u64,

    /// Alarm sound file (defaults to the first available system sound)
    #[arg(long)]
    pub sound_file: Option<PathBuf>,

    /// Log notifications instead of showing desktop notifications
    #[arg(long)]
    pub headless: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("focus-alarm")
        })
    }

    pub fn timer_path(&self) -> PathBuf {
        self.data_dir().join("timer.json")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir().join("reminders.json")
    }

    pub fn habits_path(&self) -> PathBuf {
        self.habits_file
            .clone()
            .unwrap_or_else(|| self.data_dir().join("habits.json"))
    }

    /// Settings for the pipeline
    pub fn app_settings(&self) -> AppSettings {
        AppSettings {
            port: self.port,
            host: self.host.clone(),
            timer_path: self.timer_path(),
            registry_path: self.registry_path(),
            exact_alarms: !self.no_exact_alarms,
            inexact_slack: Duration::from_secs(self.inexact_slack_secs),
            ringing: RingingConfig {
                wake_lock_ceiling: Duration::from_secs(self.wake_lock_ceiling_mins.saturating_mul(60)),
                auto_dismiss_after: Duration::from_secs(self.ring_ceiling_mins.saturating_mul(60)),
            },
            reassurance_for: Duration::from_secs(self.reassurance_secs),
        }
    }
}
