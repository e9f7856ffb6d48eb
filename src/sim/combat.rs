//! Per-tick combat resolution
//!
//! Each step marks entities dead/inactive while walking the collections and
//! sweeps them afterwards, so removals never skip or double-process a
//! neighbour in the same pass. Spawns discovered mid-pass are deferred too.

use glam::Vec2;
use rand::Rng;

use super::collision::{Rect, overlaps};
use super::scene::GameEvent;
use super::state::{
    BulletKind, DamageOutcome, GamePhase, GameState, InvaderBullet, PowerUpItem, PowerUpKind,
};
use crate::consts::*;
use crate::tuning::BreachPolicy;

/// Move every invader and let the ones whose fire-rate elapsed shoot
pub fn step_invaders(state: &mut GameState) {
    let now = state.time_ticks;
    let mut muzzles: Vec<Vec2> = Vec::new();

    for invader in state.invaders.iter_mut().filter(|i| i.alive) {
        invader.advance();
        if invader.alive && invader.ready_to_fire(now) {
            muzzles.push(invader.muzzle());
            invader.last_shot_tick = now;
        }
    }
    state.invaders.retain(|i| i.alive);

    for pos in muzzles {
        let id = state.next_entity_id();
        state.invader_bullets.push(InvaderBullet::new(id, pos));
        state.emit(GameEvent::InvaderShot);
    }
}

/// Y coordinate an invader's bottom edge must not reach
pub fn defensive_line() -> f32 {
    FIELD_HEIGHT - PLAYER_HEIGHT - PLAYER_BOTTOM_MARGIN
}

/// Invaders reaching the defensive line or ramming the player.
///
/// An unshielded player loses a whole health bar (one life). The breaching
/// invader explodes and the field is soft reset. Under
/// `BreachPolicy::ShieldAbsorbs` a shielded player instead just destroys the
/// invader and play continues. Returns true if a soft reset happened.
pub fn resolve_breach(state: &mut GameState) -> bool {
    let player_rect = state.player.rect();
    let line = defensive_line();
    let breaching = |rect: Rect| rect.bottom() >= line || overlaps(player_rect, rect);

    let shielded = state.player.is_shielded();
    if shielded && state.tuning.breach_policy == BreachPolicy::ShieldAbsorbs {
        let mut blasts = Vec::new();
        for invader in state.invaders.iter_mut().filter(|i| i.alive) {
            if breaching(invader.rect()) {
                invader.alive = false;
                blasts.push(invader.rect().center());
            }
        }
        state.invaders.retain(|i| i.alive);
        for pos in blasts {
            state.emit(GameEvent::Explosion { pos });
        }
        return false;
    }

    let Some(blast) = state
        .invaders
        .iter()
        .filter(|i| i.alive)
        .find(|i| breaching(i.rect()))
        .map(|i| i.rect().center())
    else {
        return false;
    };

    if !shielded {
        state.emit(GameEvent::PlayerHit);
        let damage = state.player.max_health;
        apply_player_damage(state, damage);
    }
    state.emit(GameEvent::Explosion { pos: blast });
    log::debug!("Invader breached the line, soft reset");
    state.soft_reset();
    true
}

/// Player bullets against invaders.
///
/// A normal bullet stops at the first invader it overlaps. A laser keeps
/// going and damages every invader it overlaps this tick.
pub fn resolve_player_bullets(state: &mut GameState) {
    let now = state.time_ticks;
    let one_hit = state.tuning.one_hit_regulars;
    // (top-left, centre) of each destroyed invader
    let mut kills: Vec<(Vec2, Vec2)> = Vec::new();

    for bullet in state.bullets.iter_mut().filter(|b| b.active) {
        bullet.advance();
        if !bullet.active {
            continue;
        }
        let bullet_rect = bullet.rect();
        for invader in state.invaders.iter_mut().filter(|i| i.alive) {
            if !overlaps(bullet_rect, invader.rect()) {
                continue;
            }
            if invader.hit(one_hit) {
                kills.push((invader.pos, invader.rect().center()));
            }
            if bullet.kind != BulletKind::Laser {
                bullet.active = false;
                break;
            }
        }
    }
    state.bullets.retain(|b| b.active);
    state.invaders.retain(|i| i.alive);

    for (pos, centre) in kills {
        on_invader_destroyed(state, pos, centre, now);
    }
}

/// Scoring, chain and loot for one destroyed invader; loot lands at its top-left
fn on_invader_destroyed(state: &mut GameState, pos: Vec2, centre: Vec2, now: u64) {
    state.emit(GameEvent::Explosion { pos: centre });
    state.session.register_kill(now, &state.tuning);

    if state.rng.random::<f64>() < state.tuning.drop_chance {
        let kind = roll_drop(state);
        let id = state.next_entity_id();
        state.power_ups.push(PowerUpItem::new(id, kind, pos));
    }
}

/// Pick a pickup type uniformly from the currently enabled table
fn roll_drop(state: &mut GameState) -> PowerUpKind {
    const BASE: [PowerUpKind; 4] = [
        PowerUpKind::WideShot,
        PowerUpKind::Laser,
        PowerUpKind::Shield,
        PowerUpKind::Fever,
    ];
    let slots = if state.tuning.health_unlocked(state.session.score) {
        BASE.len() + 1
    } else {
        BASE.len()
    };
    let roll = state.rng.random_range(0..slots);
    BASE.get(roll).copied().unwrap_or(PowerUpKind::Health)
}

/// Invader bullets against the player. Returns true if this ended the game.
pub fn resolve_invader_bullets(state: &mut GameState) -> bool {
    let player_rect = state.player.rect();
    let shielded = state.player.is_shielded();
    let damage = state.tuning.invader_bullet_damage;
    let mut hits = 0usize;

    for shot in state.invader_bullets.iter_mut().filter(|b| b.active) {
        shot.advance();
        if !shot.active {
            continue;
        }
        if overlaps(player_rect, shot.rect()) {
            shot.active = false;
            if !shielded {
                hits += 1;
            }
        }
    }
    state.invader_bullets.retain(|b| b.active);

    for _ in 0..hits {
        state.emit(GameEvent::PlayerHit);
        if apply_player_damage(state, damage) == DamageOutcome::OutOfLives {
            return true;
        }
    }
    false
}

/// Falling pickups against the player
pub fn resolve_power_ups(state: &mut GameState) {
    let player_rect = state.player.rect();
    let mut collected: Vec<PowerUpKind> = Vec::new();

    for item in state.power_ups.iter_mut().filter(|p| p.active) {
        item.advance();
        if item.active && overlaps(player_rect, item.rect()) {
            item.active = false;
            collected.push(item.kind);
        }
    }
    state.power_ups.retain(|p| p.active);

    for kind in collected {
        let tuning = &state.tuning;
        state
            .player
            .apply_power_up(kind, tuning.power_up_duration, tuning.health_restore);
        if kind == PowerUpKind::Fever {
            let duration = state.tuning.fever_duration;
            state.session.activate_fever(duration);
        }
        state.emit(GameEvent::PowerUpCollected { kind });
    }
}

/// Drop the chain once no kill has landed for `chain_reset_time` ticks
pub fn check_chain_timeout(state: &mut GameState) {
    let session = &mut state.session;
    if session.chain_count > 0
        && state.time_ticks.saturating_sub(session.last_hit_tick) > state.tuning.chain_reset_time
    {
        log::debug!("Chain of {} reset", session.chain_count);
        session.reset_chain();
    }
}

/// Damage the player, moving to the game-over menu when the last life goes
fn apply_player_damage(state: &mut GameState, amount: u32) -> DamageOutcome {
    let outcome = state.player.take_damage(amount);
    match outcome {
        DamageOutcome::Hurt => {}
        DamageOutcome::LifeLost => {
            log::debug!("Life lost, {} remaining", state.player.lives);
        }
        DamageOutcome::OutOfLives => {
            log::info!(
                "Game over at tick {} with score {}",
                state.time_ticks,
                state.session.score as u64
            );
            state.phase = GamePhase::GameOverMenu;
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::spawn::spawn_boss;
    use crate::sim::state::{Invader, InvaderKind, PlayerBullet, PlayerPowerUp};
    use crate::tuning::Tuning;

    fn quiet_tuning() -> Tuning {
        Tuning {
            drop_chance: 0.0,
            boss_chance: 0.0,
            ..Tuning::default()
        }
    }

    fn place_invader(state: &mut GameState, kind: InvaderKind, pos: Vec2) -> u32 {
        let stats = *state.tuning.stats(kind);
        let id = state.next_entity_id();
        state.invaders.push(Invader::new(id, kind, pos, &stats, 10_000, 0));
        id
    }

    fn place_bullet(state: &mut GameState, pos: Vec2, kind: BulletKind) {
        let id = state.next_entity_id();
        state.bullets.push(PlayerBullet::new(id, pos, kind));
    }

    #[test]
    fn test_normal_bullet_hits_first_invader_only() {
        let mut state = GameState::empty(1, quiet_tuning());
        place_invader(&mut state, InvaderKind::Basic, Vec2::new(100.0, 100.0));
        place_invader(&mut state, InvaderKind::Basic, Vec2::new(105.0, 100.0));
        // After advancing 10px the bullet sits over both invaders
        place_bullet(&mut state, Vec2::new(110.0, 120.0), BulletKind::Normal);

        resolve_player_bullets(&mut state);
        assert!(state.bullets.is_empty());
        assert_eq!(state.invaders.len(), 1);
        assert_eq!(state.session.score, 10.0);
        assert_eq!(state.session.chain_count, 1);
    }

    #[test]
    fn test_laser_pierces_both_invaders() {
        let mut state = GameState::empty(1, quiet_tuning());
        place_invader(&mut state, InvaderKind::Basic, Vec2::new(100.0, 100.0));
        place_invader(&mut state, InvaderKind::Tough, Vec2::new(105.0, 100.0));
        place_bullet(&mut state, Vec2::new(110.0, 120.0), BulletKind::Laser);

        resolve_player_bullets(&mut state);
        assert_eq!(state.bullets.len(), 1);
        assert!(state.invaders.is_empty());
        assert_eq!(state.session.chain_count, 2);
        assert_eq!(state.session.score, 20.0);
    }

    #[test]
    fn test_boss_loses_one_health_per_hit() {
        let mut state = GameState::empty(1, quiet_tuning());
        spawn_boss(&mut state);
        let boss_pos = state.invaders[0].pos;
        place_bullet(&mut state, boss_pos + Vec2::new(30.0, 60.0), BulletKind::Normal);

        resolve_player_bullets(&mut state);
        assert_eq!(state.invaders[0].health, 9);
        assert_eq!(state.session.score, 0.0);
        assert!(state.bullets.is_empty());
    }

    #[test]
    fn test_classic_tough_needs_three_hits() {
        let tuning = Tuning {
            drop_chance: 0.0,
            ..Tuning::classic()
        };
        let mut state = GameState::empty(1, tuning);
        place_invader(&mut state, InvaderKind::Tough, Vec2::new(100.0, 100.0));
        for expected in [2, 1] {
            place_bullet(&mut state, Vec2::new(110.0, 120.0), BulletKind::Normal);
            resolve_player_bullets(&mut state);
            assert_eq!(state.invaders[0].health, expected);
        }
        place_bullet(&mut state, Vec2::new(110.0, 120.0), BulletKind::Normal);
        resolve_player_bullets(&mut state);
        assert!(state.invaders.is_empty());
    }

    #[test]
    fn test_guaranteed_drop_lands_at_invader() {
        let tuning = Tuning {
            drop_chance: 1.0,
            ..Tuning::default()
        };
        let mut state = GameState::empty(9, tuning);
        place_invader(&mut state, InvaderKind::Fast, Vec2::new(200.0, 100.0));
        place_bullet(&mut state, Vec2::new(210.0, 120.0), BulletKind::Normal);
        resolve_player_bullets(&mut state);
        assert_eq!(state.power_ups.len(), 1);
        assert_eq!(state.power_ups[0].pos, Vec2::new(200.0, 100.0));
    }

    #[test]
    fn test_locked_health_never_drops() {
        let tuning = Tuning {
            health_unlock_score: None,
            ..Tuning::default()
        };
        let mut state = GameState::empty(11, tuning);
        for _ in 0..200 {
            assert_ne!(roll_drop(&mut state), PowerUpKind::Health);
        }
    }

    #[test]
    fn test_breach_costs_life_and_soft_resets() {
        let mut state = GameState::empty(1, quiet_tuning());
        state.session.chain_count = 3;
        state.session.score_multiplier = 1.5;
        state.session.activate_fever(100);
        place_invader(&mut state, InvaderKind::Basic, Vec2::new(10.0, 495.0));
        place_bullet(&mut state, Vec2::new(300.0, 300.0), BulletKind::Normal);

        assert!(resolve_breach(&mut state));
        assert_eq!(state.player.lives, 2);
        assert_eq!(state.player.health, state.player.max_health);
        assert!(state.bullets.is_empty());
        assert_eq!(state.invaders.len(), 6);
        assert_eq!(state.session.chain_count, 0);
        assert_eq!(state.session.score_multiplier, 1.0);
        assert!(!state.session.fever_active);
        assert!(state.events.contains(&GameEvent::PlayerHit));
    }

    #[test]
    fn test_shielded_breach_still_resets_by_default() {
        let mut state = GameState::empty(1, quiet_tuning());
        state.player.apply_power_up(PowerUpKind::Shield, 300, 50);
        place_invader(&mut state, InvaderKind::Basic, Vec2::new(10.0, 495.0));

        assert!(resolve_breach(&mut state));
        assert_eq!(state.player.lives, 3);
        assert_eq!(state.invaders.len(), 6);
        assert!(!state.events.contains(&GameEvent::PlayerHit));
    }

    #[test]
    fn test_shield_absorbs_breach_under_policy() {
        let tuning = Tuning {
            breach_policy: BreachPolicy::ShieldAbsorbs,
            ..quiet_tuning()
        };
        let mut state = GameState::empty(1, tuning);
        state.player.apply_power_up(PowerUpKind::Shield, 300, 50);
        place_invader(&mut state, InvaderKind::Basic, Vec2::new(10.0, 495.0));
        place_invader(&mut state, InvaderKind::Basic, Vec2::new(300.0, 100.0));
        state.session.chain_count = 2;

        assert!(!resolve_breach(&mut state));
        assert_eq!(state.invaders.len(), 1);
        assert_eq!(state.session.chain_count, 2);
        assert_eq!(state.player.lives, 3);
    }

    #[test]
    fn test_last_life_breach_opens_menu() {
        let mut state = GameState::empty(1, quiet_tuning());
        state.player.lives = 1;
        place_invader(&mut state, InvaderKind::Basic, Vec2::new(10.0, 495.0));
        resolve_breach(&mut state);
        assert_eq!(state.player.lives, 0);
        assert_eq!(state.phase, GamePhase::GameOverMenu);
    }

    #[test]
    fn test_invader_bullet_damage_and_shield() {
        let mut state = GameState::empty(1, quiet_tuning());
        let target = state.player.rect().center() - Vec2::new(0.0, INVADER_BULLET_SPEED);
        let id = state.next_entity_id();
        state.invader_bullets.push(InvaderBullet::new(id, target));
        assert!(!resolve_invader_bullets(&mut state));
        assert_eq!(state.player.health, 90);
        assert!(state.invader_bullets.is_empty());

        state.player.apply_power_up(PowerUpKind::Shield, 300, 50);
        let id = state.next_entity_id();
        state.invader_bullets.push(InvaderBullet::new(id, target));
        resolve_invader_bullets(&mut state);
        assert_eq!(state.player.health, 90);
        assert!(state.invader_bullets.is_empty());
    }

    #[test]
    fn test_invader_fires_when_rate_elapses() {
        let mut state = GameState::empty(1, quiet_tuning());
        place_invader(&mut state, InvaderKind::Basic, Vec2::new(100.0, 100.0));
        state.invaders[0].fire_rate = 5;
        state.time_ticks = 5;
        step_invaders(&mut state);
        assert!(state.invader_bullets.is_empty());
        state.time_ticks = 6;
        step_invaders(&mut state);
        assert_eq!(state.invader_bullets.len(), 1);
        assert_eq!(state.invaders[0].last_shot_tick, 6);
        let muzzle = state.invaders[0].muzzle();
        assert_eq!(state.invader_bullets[0].pos, muzzle);
        assert_eq!(state.events, vec![GameEvent::InvaderShot]);
    }

    #[test]
    fn test_fever_pickup_activates_session_fever() {
        let mut state = GameState::empty(1, quiet_tuning());
        let pos = state.player.pos + Vec2::new(10.0, 10.0);
        let id = state.next_entity_id();
        state.power_ups.push(PowerUpItem::new(id, PowerUpKind::Fever, pos));
        resolve_power_ups(&mut state);
        assert!(state.power_ups.is_empty());
        assert!(state.session.fever_active);
        assert_eq!(state.session.fever_timer, 600);
        assert_eq!(state.player.power_up, PlayerPowerUp::Normal);
    }

    #[test]
    fn test_chain_times_out() {
        let mut state = GameState::empty(1, quiet_tuning());
        state.session.chain_count = 4;
        state.session.score_multiplier = 1.5;
        state.session.last_hit_tick = 10;
        state.time_ticks = 130;
        check_chain_timeout(&mut state);
        assert_eq!(state.session.chain_count, 4);
        state.time_ticks = 131;
        check_chain_timeout(&mut state);
        assert_eq!(state.session.chain_count, 0);
        assert_eq!(state.session.score_multiplier, 1.0);
    }
}
