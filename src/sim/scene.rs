//! Output side of the simulation: render snapshot and cue events
//!
//! A `Scene` is an owned copy taken after a tick completes, so a renderer on
//! another thread never sees collections mid-update.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{BulletKind, GamePhase, GameState, InvaderKind, PlayerPowerUp, PowerUpKind};

/// Discrete cues raised during a tick (for audio and one-shot visuals)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PlayerShot,
    InvaderShot,
    /// Something blew up at this point (centre of the destroyed invader)
    Explosion { pos: Vec2 },
    PlayerHit,
    PowerUpCollected { kind: PowerUpKind },
}

impl GameEvent {
    /// Explosion position, if this cue carries one
    pub fn explosion_pos(&self) -> Option<Vec2> {
        match self {
            GameEvent::Explosion { pos } => Some(*pos),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub pos: Vec2,
    pub health: u32,
    pub max_health: u32,
    pub lives: u8,
    pub shielded: bool,
    pub power_up: PlayerPowerUp,
    pub power_up_ticks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvaderView {
    pub kind: InvaderKind,
    pub pos: Vec2,
    /// Current health over the type's starting health, in [0, 1]
    pub health_fraction: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletView {
    pub kind: BulletKind,
    pub pos: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpView {
    pub kind: PowerUpKind,
    pub pos: Vec2,
}

/// Heads-up display fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    /// Score truncated for display
    pub score: u64,
    pub chain: u32,
    pub multiplier: f64,
    /// Ticks of fever left (0 when off)
    pub fever_ticks: u32,
}

/// Everything a renderer needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub tick: u64,
    pub phase: GamePhase,
    pub player: PlayerView,
    pub invaders: Vec<InvaderView>,
    pub bullets: Vec<BulletView>,
    /// Invader bullet centres
    pub invader_bullets: Vec<Vec2>,
    pub power_ups: Vec<PowerUpView>,
    /// Explosions started this tick
    pub explosions: Vec<Vec2>,
    pub hud: Hud,
}

impl Scene {
    pub fn capture(state: &GameState) -> Self {
        let player = &state.player;
        let session = &state.session;
        Self {
            tick: state.time_ticks,
            phase: state.phase,
            player: PlayerView {
                pos: player.pos,
                health: player.health,
                max_health: player.max_health,
                lives: player.lives,
                shielded: player.is_shielded(),
                power_up: player.power_up,
                power_up_ticks: player.power_up_timer,
            },
            invaders: state
                .invaders
                .iter()
                .filter(|i| i.alive)
                .map(|i| {
                    let max = state.tuning.stats(i.kind).health.max(1) as f32;
                    InvaderView {
                        kind: i.kind,
                        pos: i.pos,
                        health_fraction: (i.health as f32 / max).clamp(0.0, 1.0),
                    }
                })
                .collect(),
            bullets: state
                .bullets
                .iter()
                .filter(|b| b.active)
                .map(|b| BulletView {
                    kind: b.kind,
                    pos: b.pos,
                })
                .collect(),
            invader_bullets: state
                .invader_bullets
                .iter()
                .filter(|b| b.active)
                .map(|b| b.pos)
                .collect(),
            power_ups: state
                .power_ups
                .iter()
                .filter(|p| p.active)
                .map(|p| PowerUpView {
                    kind: p.kind,
                    pos: p.pos,
                })
                .collect(),
            explosions: state.events.iter().filter_map(GameEvent::explosion_pos).collect(),
            hud: Hud {
                score: session.score.max(0.0) as u64,
                chain: session.chain_count,
                multiplier: session.score_multiplier,
                fever_ticks: if session.fever_active { session.fever_timer } else { 0 },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::spawn::spawn_boss;
    use crate::tuning::Tuning;

    #[test]
    fn test_capture_reports_boss_health_fraction() {
        let mut state = GameState::empty(1, Tuning::default());
        spawn_boss(&mut state);
        state.invaders[0].health = 4;
        let scene = Scene::capture(&state);
        assert_eq!(scene.invaders.len(), 1);
        assert_eq!(scene.invaders[0].kind, InvaderKind::Boss);
        assert!((scene.invaders[0].health_fraction - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_capture_truncates_score_and_hides_idle_fever() {
        let mut state = GameState::empty(1, Tuning::default());
        state.session.score = 42.5;
        state.session.fever_timer = 30;
        let scene = Scene::capture(&state);
        assert_eq!(scene.hud.score, 42);
        assert_eq!(scene.hud.fever_ticks, 0);
        assert_eq!(scene.player.lives, 3);
    }

    #[test]
    fn test_scene_serializes_to_json() {
        let state = GameState::new(5);
        let json = serde_json::to_string(&Scene::capture(&state)).unwrap();
        let back: Scene = serde_json::from_str(&json).unwrap();
        assert_eq!(back.invaders.len(), 6);
    }
}
