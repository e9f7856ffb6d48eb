//! Space Invaders Extreme - game-state engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, collisions, spawning, game state)
//! - `tuning`: Data-driven game balance
//! - `replay`: Input trace recording and playback
//!
//! Rendering, audio playback, input polling and frame pacing live outside
//! this crate. The engine consumes intents and ticks, and hands back a
//! scene snapshot plus cue events.

pub mod replay;
pub mod sim;
pub mod tuning;

pub use replay::{InputTrace, Recorder, ReplayError, replay};
pub use tuning::{BreachPolicy, InvaderStats, Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Rate the host is expected to call `tick` at
    pub const TICKS_PER_SECOND: u32 = 60;

    /// Play-field dimensions
    pub const FIELD_WIDTH: f32 = 800.0;
    pub const FIELD_HEIGHT: f32 = 600.0;

    /// Player defaults
    pub const PLAYER_WIDTH: f32 = 50.0;
    pub const PLAYER_HEIGHT: f32 = 50.0;
    pub const PLAYER_SPEED: f32 = 8.0;
    /// Gap between the player's spawn position and the bottom of the field
    pub const PLAYER_BOTTOM_MARGIN: f32 = 20.0;
    pub const PLAYER_START_LIVES: u8 = 3;
    pub const PLAYER_MAX_HEALTH: u32 = 100;

    /// Player bullet
    pub const BULLET_WIDTH: f32 = 10.0;
    pub const BULLET_HEIGHT: f32 = 20.0;
    pub const BULLET_SPEED: f32 = 10.0;
    /// Horizontal spread of the outer WideShot bullets
    pub const WIDE_SHOT_SPREAD: f32 = 20.0;

    /// Invader bullet (circle, collides as its bounding square)
    pub const INVADER_BULLET_RADIUS: f32 = 8.0;
    pub const INVADER_BULLET_SPEED: f32 = 5.0;

    /// Falling power-up item
    pub const POWER_UP_SIZE: f32 = 20.0;
    pub const POWER_UP_FALL_SPEED: f32 = 2.0;

    /// Vertical band new regular invaders spawn in
    pub const WAVE_SPAWN_Y_MIN: i32 = 50;
    pub const WAVE_SPAWN_Y_MAX: i32 = 150;
    /// Boss spawn height
    pub const BOSS_SPAWN_Y: f32 = 50.0;

    /// Kill reward before the multiplier is applied
    pub const KILL_SCORE: f64 = 10.0;
}
