//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One tick per call, timers counted in ticks
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod combat;
pub mod scene;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{Rect, overlaps};
pub use scene::{GameEvent, Hud, Scene};
pub use spawn::{WaveKind, respawn_if_cleared, spawn_boss, spawn_wave};
pub use state::{
    BulletKind, GamePhase, GameState, Invader, InvaderBullet, InvaderKind, Player, PlayerBullet,
    PlayerPowerUp, PowerUpItem, PowerUpKind, SessionState,
};
pub use tick::{Intent, TickInput, TickOutput, tick};
