use clap::Subcommand;
use tabtimer_core::storage::{restore_engine, Database, SnapshotStore};
use tabtimer_core::timer::validate_minutes;
use tabtimer_core::Config;
use tracing::info;

/// Each action edits the saved snapshot. A running timer only counts down
/// while `tabtimer run` hosts it.
#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the countdown
    Start,
    /// Pause a running countdown
    Pause,
    /// Stop and refill to the current duration
    Reset,
    /// Start, pause or resume depending on the current phase
    Toggle,
    /// Switch to a preset duration and stop
    Preset {
        /// Minutes (1-999)
        #[arg(allow_hyphen_values = true)]
        minutes: i64,
    },
    /// Switch to a custom duration and stop
    Custom {
        /// Minutes (1-999)
        #[arg(allow_hyphen_values = true)]
        minutes: i64,
    },
    /// Print current timer state as JSON
    Status,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = Database::open()?;
    let mut engine = restore_engine(&db, config.timer.default_minutes);

    let transition = match action {
        TimerAction::Start => engine.start(),
        TimerAction::Pause => engine.pause(),
        TimerAction::Reset => engine.reset(),
        TimerAction::Toggle => engine.toggle(),
        TimerAction::Preset { minutes } | TimerAction::Custom { minutes } => {
            validate_minutes(minutes)?;
            engine.set_duration(minutes)
        }
        TimerAction::Status => None,
    };

    if let Some(transition) = transition {
        info!(?transition, "Timer updated");
        db.save(&engine.snapshot())?;
    }
    println!("{}", serde_json::to_string_pretty(&engine.view())?);
    Ok(())
}
