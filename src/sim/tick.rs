//! Fixed-rate simulation tick
//!
//! Core game loop that advances the session deterministically: intents are
//! applied first, then the combat steps run in a fixed order.

use serde::{Deserialize, Serialize};

use super::combat;
use super::scene::{GameEvent, Scene};
use super::spawn;
use super::state::{BulletKind, GamePhase, GameState, PlayerBullet, PlayerPowerUp};
use crate::consts::WIDE_SHOT_SPREAD;

/// Discrete input intents (key-down/key-up edges, menu choices)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    MoveLeftStart,
    MoveLeftEnd,
    MoveRightStart,
    MoveRightEnd,
    MoveUpStart,
    MoveUpEnd,
    MoveDownStart,
    MoveDownEnd,
    FireStart,
    MenuContinue,
    MenuGiveUp,
    Quit,
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    pub intents: Vec<Intent>,
}

impl TickInput {
    pub fn new(intents: impl Into<Vec<Intent>>) -> Self {
        Self {
            intents: intents.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}

/// What a tick hands back to the renderer and audio layer
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub scene: Scene,
    pub events: Vec<GameEvent>,
}

/// Advance the game state by one tick
pub fn tick(state: &mut GameState, input: &TickInput) -> TickOutput {
    state.events.clear();

    let was_playing = state.phase == GamePhase::Playing;
    if was_playing {
        state.time_ticks += 1;
    }

    for &intent in &input.intents {
        apply_intent(state, intent);
    }

    // A Continue this tick only rebuilds the session; simulation resumes next tick
    if was_playing && state.phase == GamePhase::Playing {
        advance_playing(state);
    }

    let scene = Scene::capture(state);
    TickOutput {
        scene,
        events: std::mem::take(&mut state.events),
    }
}

/// Route one intent according to the current phase. Intents that mean
/// nothing in the current phase are ignored.
fn apply_intent(state: &mut GameState, intent: Intent) {
    if intent == Intent::Quit {
        log::info!("Quit at tick {}", state.time_ticks);
        state.phase = GamePhase::Halted;
        return;
    }

    match state.phase {
        GamePhase::Playing => {
            if intent == Intent::FireStart {
                fire(state);
            } else {
                state.player.apply_move(intent);
            }
        }
        GamePhase::GameOverMenu => match intent {
            Intent::MenuContinue => {
                log::info!("Continue: new session");
                state.reset_session();
            }
            Intent::MenuGiveUp => {
                log::info!("Gave up with score {}", state.session.score as u64);
                state.phase = GamePhase::Halted;
            }
            _ => {}
        },
        GamePhase::Halted => {}
    }
}

/// Fire the player's weapon if the cooldown allows it.
///
/// Fever forces the single normal shot whatever is equipped.
fn fire(state: &mut GameState) {
    let now = state.time_ticks;
    if !state.player.can_fire(now) {
        return;
    }

    let pattern: &[(f32, BulletKind)] = if state.session.fever_active {
        &[(0.0, BulletKind::Normal)]
    } else {
        match state.player.power_up {
            PlayerPowerUp::Normal | PlayerPowerUp::Shield => &[(0.0, BulletKind::Normal)],
            PlayerPowerUp::WideShot => &[
                (-WIDE_SHOT_SPREAD, BulletKind::Normal),
                (0.0, BulletKind::Normal),
                (WIDE_SHOT_SPREAD, BulletKind::Normal),
            ],
            PlayerPowerUp::Laser => &[(0.0, BulletKind::Laser)],
        }
    };

    for &(offset, kind) in pattern {
        let pos = state.player.muzzle(offset);
        let id = state.next_entity_id();
        state.bullets.push(PlayerBullet::new(id, pos, kind));
    }
    state.player.last_shot_tick = Some(now);
    state.emit(GameEvent::PlayerShot);
}

/// One Playing tick: player and timers, then combat in fixed order.
/// Stops early if a step ends the game.
fn advance_playing(state: &mut GameState) {
    state.player.advance();
    state.player.tick_power_up();
    state.session.tick_fever();

    combat::step_invaders(state);

    combat::resolve_breach(state);
    if state.phase != GamePhase::Playing {
        return;
    }

    combat::resolve_player_bullets(state);

    if combat::resolve_invader_bullets(state) {
        return;
    }

    combat::resolve_power_ups(state);
    combat::check_chain_timeout(state);
    spawn::respawn_if_cleared(state);

    // Ensure deterministic ordering
    state.normalize_order();
}
