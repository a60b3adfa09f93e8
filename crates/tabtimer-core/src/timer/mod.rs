mod engine;

pub use engine::{
    format_time, parse_minutes, validate_minutes, Phase, TimerEngine, Transition,
    DEFAULT_MINUTES, MAX_MINUTES, MIN_MINUTES,
};
