//! Wave generation
//!
//! Invaders are only ever created here. Every roll goes through the session
//! RNG so a seed fully determines wave composition.

use glam::Vec2;
use rand::Rng;

use super::state::{GameState, Invader, InvaderKind};
use crate::consts::*;

/// Which kind of wave the respawn check produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveKind {
    Boss,
    Regular(usize),
}

/// Spawn `count` regular invaders of random type at random positions near the top
pub fn spawn_wave(state: &mut GameState, count: usize) {
    for _ in 0..count {
        let kind = InvaderKind::REGULAR[state.rng.random_range(0..InvaderKind::REGULAR.len())];
        let stats = *state.tuning.stats(kind);
        let max_x = (FIELD_WIDTH - stats.width).max(0.0) as i32;
        let x = state.rng.random_range(0..=max_x) as f32;
        let y = state.rng.random_range(WAVE_SPAWN_Y_MIN..=WAVE_SPAWN_Y_MAX) as f32;
        spawn_invader(state, kind, Vec2::new(x, y));
    }
}

/// Spawn a single boss, horizontally centred
pub fn spawn_boss(state: &mut GameState) {
    let width = state.tuning.boss.width;
    let x = ((FIELD_WIDTH - width) / 2.0).floor();
    spawn_invader(state, InvaderKind::Boss, Vec2::new(x, BOSS_SPAWN_Y));
}

/// Opening wave, also used after a breach and on Continue
pub fn spawn_base_wave(state: &mut GameState) {
    let count = state.tuning.base_wave_size;
    spawn_wave(state, count);
}

/// Refill an empty field: a boss with `boss_chance`, otherwise a regular
/// wave sized by score. Does nothing while invaders remain.
pub fn respawn_if_cleared(state: &mut GameState) -> Option<WaveKind> {
    if !state.invaders.is_empty() {
        return None;
    }
    let boss_chance = state.tuning.boss_chance;
    if state.rng.random::<f64>() < boss_chance {
        spawn_boss(state);
        log::info!("Boss wave (score {})", state.session.score as u64);
        Some(WaveKind::Boss)
    } else {
        let count = state.tuning.wave_size(state.session.score);
        spawn_wave(state, count);
        log::info!("Wave of {} invaders (score {})", count, state.session.score as u64);
        Some(WaveKind::Regular(count))
    }
}

fn spawn_invader(state: &mut GameState, kind: InvaderKind, pos: Vec2) {
    let stats = *state.tuning.stats(kind);
    let fire_rate = state
        .rng
        .random_range(stats.fire_rate_min..=stats.fire_rate_max.max(stats.fire_rate_min));
    let id = state.next_entity_id();
    let now = state.time_ticks;
    state
        .invaders
        .push(Invader::new(id, kind, pos, &stats, fire_rate, now));
}
