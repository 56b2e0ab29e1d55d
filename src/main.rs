//! LiftCue - Adaptive Workout Feedback
//!
//! Command-line entry point: inspect detected capabilities, play event
//! feedback through the native backend, and toggle the feedback preference.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use liftcue::audio::FeedbackEvent;
use liftcue::platform::native::NativeEnvironment;
use liftcue::platform::{
    EnvironmentProbe, EnvironmentSnapshot, GestureKind, LifecycleEvent, StaticEnvironment,
};
use liftcue::storage::config::{get_config_path, load_config, load_config_from};
use liftcue::storage::{FilePreferenceStore, PreferenceStore};
use liftcue::{FeedbackHub, PlatformBackends};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "liftcue")]
#[command(about = "Adaptive sound, haptic and notification feedback for workouts", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the platform data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Environment snapshot (TOML) to simulate another runtime
    #[arg(long, global = true)]
    env: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the detected capability profile
    Probe,

    /// List feedback events
    Events,

    /// Play feedback for an event
    Play {
        /// Event name, e.g. restComplete
        event: FeedbackEvent,

        /// Also send a notification
        #[arg(long)]
        notify: bool,

        /// How long to keep running so playback can finish
        #[arg(long, default_value_t = 2500)]
        wait_ms: u64,
    },

    /// Show notification support and remediation steps
    NotifySupport,

    /// Turn sound and haptic feedback on
    Enable,

    /// Turn sound and haptic feedback off
    Disable,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!("Starting LiftCue v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => load_config()
            .with_context(|| format!("Failed to load config from {:?}", get_config_path()))?,
    };
    let preferences = Arc::new(FilePreferenceStore::new(
        config.data_dir.join("preferences.toml"),
    ));

    let probe: Arc<dyn EnvironmentProbe> = match &cli.env {
        Some(path) => {
            let snapshot = EnvironmentSnapshot::from_file(path)
                .with_context(|| format!("Failed to load environment from {:?}", path))?;
            Arc::new(StaticEnvironment(snapshot))
        }
        None => Arc::new(NativeEnvironment),
    };

    match cli.command {
        Commands::Events => {
            for event in FeedbackEvent::ALL {
                let message = event.visual_message();
                println!("{:<16} {:<18} {}", event.name(), event.display_name(), message.title);
            }
        }

        Commands::Enable => set_feedback(preferences.as_ref(), true)?,

        Commands::Disable => set_feedback(preferences.as_ref(), false)?,

        Commands::Probe => {
            let hub = FeedbackHub::new(&config, preferences, PlatformBackends::native(probe));
            let profile = hub.capabilities();
            println!("{}", serde_json::to_string_pretty(&profile)?);
            println!("channels: {:?}", hub.engine().channels());
            println!("feedback enabled: {}", hub.feedback_enabled());
        }

        Commands::NotifySupport => {
            let hub = FeedbackHub::new(&config, preferences, PlatformBackends::native(probe));
            let (_, support) = hub.refresh().await;
            println!("{}", serde_json::to_string_pretty(&support)?);
            if let Some(guidance) = support.guidance() {
                println!("\n{}", guidance);
            }
        }

        Commands::Play {
            event,
            notify,
            wait_ms,
        } => {
            let hub = FeedbackHub::new(&config, preferences, PlatformBackends::native(probe));
            hub.start().await;
            // The command itself is the user's gesture.
            hub.emit(LifecycleEvent::Gesture(GestureKind::Key));
            hub.resources().initialize().await;

            if notify {
                let outcome = hub.trigger(event).await;
                println!(
                    "{}: delivered via {:?}, notified: {}",
                    event, outcome.channel, outcome.notified
                );
            } else {
                match hub.play(event).await {
                    Some(channel) => println!("{}: delivered via {:?}", event, channel),
                    None => println!("{}: no feedback delivered", event),
                }
            }

            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            hub.shutdown().await;
        }
    }

    Ok(())
}

fn set_feedback(preferences: &dyn PreferenceStore, enabled: bool) -> Result<()> {
    preferences
        .set_feedback_enabled(enabled)
        .context("Failed to save preference")?;
    println!("Feedback {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}
