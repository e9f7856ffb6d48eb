//! Game state and core simulation types
//!
//! All state a session needs to be reproduced from its seed lives here.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::scene::GameEvent;
use super::tick::Intent;
use crate::consts::*;
use crate::tuning::{InvaderStats, Tuning};

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Out of lives, waiting for Continue or GiveUp
    GameOverMenu,
    /// Player gave up or quit; the loop should stop
    Halted,
}

/// Invader types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvaderKind {
    Basic,
    Fast,
    Tough,
    Boss,
}

impl InvaderKind {
    pub const ALL: [InvaderKind; 4] = [
        InvaderKind::Basic,
        InvaderKind::Fast,
        InvaderKind::Tough,
        InvaderKind::Boss,
    ];

    /// Kinds a regular wave is drawn from
    pub const REGULAR: [InvaderKind; 3] = [InvaderKind::Basic, InvaderKind::Fast, InvaderKind::Tough];

    pub fn is_boss(&self) -> bool {
        *self == InvaderKind::Boss
    }
}

/// Falling pickup types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    WideShot,
    Laser,
    Shield,
    Fever,
    Health,
}

/// Effect currently equipped by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerPowerUp {
    #[default]
    Normal,
    WideShot,
    Laser,
    Shield,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BulletKind {
    #[default]
    Normal,
    /// Pierces: survives every invader it hits
    Laser,
}

/// Result of the player absorbing damage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Hurt,
    LifeLost,
    OutOfLives,
}

/// The player's ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    /// Velocity intent, each component in {-speed, 0, +speed}
    pub x_change: f32,
    pub y_change: f32,
    pub speed: f32,
    pub lives: u8,
    pub health: u32,
    pub max_health: u32,
    pub power_up: PlayerPowerUp,
    /// Ticks until the equipped power-up expires
    pub power_up_timer: u32,
    /// Tick of the last accepted shot (`None` until the first one)
    pub last_shot_tick: Option<u64>,
    pub fire_cooldown: u64,
}

impl Player {
    pub fn new(fire_cooldown: u64) -> Self {
        Self {
            pos: Self::spawn_position(),
            size: Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT),
            x_change: 0.0,
            y_change: 0.0,
            speed: PLAYER_SPEED,
            lives: PLAYER_START_LIVES,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            power_up: PlayerPowerUp::Normal,
            power_up_timer: 0,
            last_shot_tick: None,
            fire_cooldown,
        }
    }

    /// Horizontally centred, just above the bottom margin
    pub fn spawn_position() -> Vec2 {
        Vec2::new(
            ((FIELD_WIDTH - PLAYER_WIDTH) / 2.0).floor(),
            FIELD_HEIGHT - PLAYER_HEIGHT - PLAYER_BOTTOM_MARGIN,
        )
    }

    pub fn rect(&self) -> Rect {
        Rect::at(self.pos, self.size)
    }

    pub fn is_shielded(&self) -> bool {
        self.power_up == PlayerPowerUp::Shield
    }

    /// Set velocity from a movement intent. Returns false for non-movement intents.
    ///
    /// An End intent only clears the axis if it is still moving that way, so
    /// releasing Left while Right is held keeps the ship moving right.
    pub fn apply_move(&mut self, intent: Intent) -> bool {
        match intent {
            Intent::MoveLeftStart => self.x_change = -self.speed,
            Intent::MoveRightStart => self.x_change = self.speed,
            Intent::MoveUpStart => self.y_change = -self.speed,
            Intent::MoveDownStart => self.y_change = self.speed,
            Intent::MoveLeftEnd if self.x_change < 0.0 => self.x_change = 0.0,
            Intent::MoveRightEnd if self.x_change > 0.0 => self.x_change = 0.0,
            Intent::MoveUpEnd if self.y_change < 0.0 => self.y_change = 0.0,
            Intent::MoveDownEnd if self.y_change > 0.0 => self.y_change = 0.0,
            Intent::MoveLeftEnd | Intent::MoveRightEnd | Intent::MoveUpEnd | Intent::MoveDownEnd => {}
            _ => return false,
        }
        true
    }

    /// Apply velocity and clamp to the play-field
    pub fn advance(&mut self) {
        self.pos.x += self.x_change;
        self.pos.y += self.y_change;
        self.clamp_to_bounds();
    }

    /// Keep the ship on screen and inside the bottom half of the field
    pub fn clamp_to_bounds(&mut self) {
        self.pos.x = self.pos.x.clamp(0.0, FIELD_WIDTH - self.size.x);
        self.pos.y = self.pos.y.clamp(FIELD_HEIGHT / 2.0, FIELD_HEIGHT - self.size.y);
    }

    /// Count down the equipped power-up, reverting to Normal when it runs out
    pub fn tick_power_up(&mut self) {
        if self.power_up_timer > 0 {
            self.power_up_timer -= 1;
        }
        if self.power_up_timer == 0 {
            self.power_up = PlayerPowerUp::Normal;
        }
    }

    /// Equip a collected power-up, replacing whatever was equipped.
    ///
    /// Health is consumed on the spot and Fever is session-wide (the caller
    /// starts the fever timer), so both leave the player on Normal.
    pub fn apply_power_up(&mut self, kind: PowerUpKind, duration: u32, health_restore: u32) {
        let (equipped, timer) = match kind {
            PowerUpKind::WideShot => (PlayerPowerUp::WideShot, duration),
            PowerUpKind::Laser => (PlayerPowerUp::Laser, duration),
            PowerUpKind::Shield => (PlayerPowerUp::Shield, duration),
            PowerUpKind::Health => {
                self.health = self.health.saturating_add(health_restore).min(self.max_health);
                (PlayerPowerUp::Normal, 0)
            }
            PowerUpKind::Fever => (PlayerPowerUp::Normal, 0),
        };
        self.power_up = equipped;
        self.power_up_timer = timer;
    }

    /// Subtract health; an emptied bar costs a life and refills
    pub fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        self.health = self.health.saturating_sub(amount);
        if self.health > 0 {
            return DamageOutcome::Hurt;
        }
        self.lives = self.lives.saturating_sub(1);
        self.health = self.max_health;
        if self.lives == 0 {
            DamageOutcome::OutOfLives
        } else {
            DamageOutcome::LifeLost
        }
    }

    pub fn can_fire(&self, now: u64) -> bool {
        match self.last_shot_tick {
            None => true,
            Some(last) => now.saturating_sub(last) > self.fire_cooldown,
        }
    }

    /// Top-left spawn point for a bullet centred on the ship's nose, offset horizontally
    pub fn muzzle(&self, offset: f32) -> Vec2 {
        Vec2::new(
            self.pos.x + (self.size.x / 2.0).floor() - (BULLET_WIDTH / 2.0).floor() + offset,
            self.pos.y,
        )
    }
}

/// An invader entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invader {
    pub id: u32,
    pub kind: InvaderKind,
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    pub x_change: f32,
    pub y_change: f32,
    pub health: u32,
    /// Ticks between shots
    pub fire_rate: u64,
    pub last_shot_tick: u64,
    pub alive: bool,
}

impl Invader {
    pub fn new(id: u32, kind: InvaderKind, pos: Vec2, stats: &InvaderStats, fire_rate: u64, now: u64) -> Self {
        Self {
            id,
            kind,
            pos,
            size: Vec2::new(stats.width, stats.height),
            x_change: stats.x_change,
            y_change: stats.y_change,
            health: stats.health,
            fire_rate,
            last_shot_tick: now,
            alive: true,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::at(self.pos, self.size)
    }

    /// Slide sideways; bounce off a wall by reversing and stepping down
    pub fn advance(&mut self) {
        self.pos.x += self.x_change;
        if self.pos.x <= 0.0 || self.pos.x >= FIELD_WIDTH - self.size.x {
            self.x_change = -self.x_change;
            self.pos.y += self.y_change;
        }
        if self.health == 0 || self.pos.y > FIELD_HEIGHT {
            self.alive = false;
        }
    }

    pub fn ready_to_fire(&self, now: u64) -> bool {
        now.saturating_sub(self.last_shot_tick) > self.fire_rate
    }

    /// Bottom-centre, where invader bullets appear
    pub fn muzzle(&self) -> Vec2 {
        Vec2::new(
            self.pos.x + (self.size.x / 2.0).floor(),
            self.pos.y + self.size.y,
        )
    }

    /// Take one hit. Returns true if this hit destroyed the invader.
    pub fn hit(&mut self, one_hit_regulars: bool) -> bool {
        if one_hit_regulars && !self.kind.is_boss() {
            self.health = 0;
        } else {
            self.health = self.health.saturating_sub(1);
        }
        if self.health == 0 {
            self.alive = false;
        }
        !self.alive
    }
}

/// A player bullet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerBullet {
    pub id: u32,
    /// Top-left corner
    pub pos: Vec2,
    pub kind: BulletKind,
    pub active: bool,
}

impl PlayerBullet {
    pub fn new(id: u32, pos: Vec2, kind: BulletKind) -> Self {
        Self {
            id,
            pos,
            kind,
            active: true,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, BULLET_WIDTH, BULLET_HEIGHT)
    }

    pub fn advance(&mut self) {
        self.pos.y -= BULLET_SPEED;
        if self.pos.y < 0.0 {
            self.active = false;
        }
    }
}

/// A round invader bullet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvaderBullet {
    pub id: u32,
    /// Centre of the circle
    pub pos: Vec2,
    pub radius: f32,
    pub active: bool,
}

impl InvaderBullet {
    pub fn new(id: u32, pos: Vec2) -> Self {
        Self {
            id,
            pos,
            radius: INVADER_BULLET_RADIUS,
            active: true,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::around_circle(self.pos, self.radius)
    }

    pub fn advance(&mut self) {
        self.pos.y += INVADER_BULLET_SPEED;
        if self.pos.y > FIELD_HEIGHT {
            self.active = false;
        }
    }
}

/// A pickup falling toward the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUpItem {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub active: bool,
}

impl PowerUpItem {
    pub fn new(id: u32, kind: PowerUpKind, pos: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            active: true,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, POWER_UP_SIZE, POWER_UP_SIZE)
    }

    pub fn advance(&mut self) {
        self.pos.y += POWER_UP_FALL_SPEED;
        if self.pos.y > FIELD_HEIGHT {
            self.active = false;
        }
    }
}

/// Scoring, chain and fever state for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Fractional multipliers make this non-integer; truncate for display
    pub score: f64,
    pub chain_count: u32,
    pub score_multiplier: f64,
    pub last_hit_tick: u64,
    pub fever_active: bool,
    pub fever_timer: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            score: 0.0,
            chain_count: 0,
            score_multiplier: 1.0,
            last_hit_tick: 0,
            fever_active: false,
            fever_timer: 0,
        }
    }
}

impl SessionState {
    /// Count a kill: bump the chain, award points at the current multiplier,
    /// then grow the multiplier on every `chain_step`th kill. Returns the award.
    pub fn register_kill(&mut self, now: u64, tuning: &Tuning) -> f64 {
        self.chain_count += 1;
        let award = KILL_SCORE * self.score_multiplier;
        self.score += award;
        self.last_hit_tick = now;
        if tuning.chain_step > 0 && self.chain_count % tuning.chain_step == 0 {
            self.score_multiplier += tuning.multiplier_step;
            log::debug!("Multiplier increased to {:.1}x", self.score_multiplier);
        }
        award
    }

    pub fn reset_chain(&mut self) {
        self.chain_count = 0;
        self.score_multiplier = 1.0;
    }

    /// Chain, multiplier and fever back to defaults; score is kept
    pub fn reset_modifiers(&mut self) {
        self.reset_chain();
        self.fever_active = false;
        self.fever_timer = 0;
    }

    pub fn activate_fever(&mut self, duration: u32) {
        self.fever_active = duration > 0;
        self.fever_timer = duration;
        log::debug!("Fever started ({} ticks)", duration);
    }

    pub fn tick_fever(&mut self) {
        if !self.fever_active {
            return;
        }
        self.fever_timer = self.fever_timer.saturating_sub(1);
        if self.fever_timer == 0 {
            self.fever_active = false;
            log::debug!("Fever over");
        }
    }
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Session RNG; every random roll goes through it
    pub rng: Pcg32,
    pub tuning: Tuning,
    /// Simulation tick counter (the "now" every timer compares against)
    pub time_ticks: u64,
    pub phase: GamePhase,
    pub player: Player,
    pub session: SessionState,
    /// Alive invaders (sorted by id for determinism)
    pub invaders: Vec<Invader>,
    pub bullets: Vec<PlayerBullet>,
    pub invader_bullets: Vec<InvaderBullet>,
    pub power_ups: Vec<PowerUpItem>,
    /// Cues raised during the current tick
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Create a new session with default balance
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        let mut state = Self::empty(seed, tuning);
        super::spawn::spawn_base_wave(&mut state);
        state
    }

    /// A session with no invaders, for setting up exact scenarios
    pub fn empty(seed: u64, tuning: Tuning) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            player: Player::new(tuning.player_fire_cooldown),
            tuning,
            time_ticks: 0,
            phase: GamePhase::Playing,
            session: SessionState::default(),
            invaders: Vec::new(),
            bullets: Vec::new(),
            invader_bullets: Vec::new(),
            power_ups: Vec::new(),
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Drop every bullet, item and invader
    pub fn clear_transients(&mut self) {
        self.bullets.clear();
        self.invader_bullets.clear();
        self.power_ups.clear();
        self.invaders.clear();
    }

    /// Breach punishment: wipe the field, restart the chain, fresh base wave
    pub fn soft_reset(&mut self) {
        self.clear_transients();
        self.session.reset_modifiers();
        super::spawn::spawn_base_wave(self);
    }

    /// Continue from the game-over menu: brand-new player and session
    pub fn reset_session(&mut self) {
        self.player = Player::new(self.tuning.player_fire_cooldown);
        self.session = SessionState::default();
        self.clear_transients();
        super::spawn::spawn_base_wave(self);
        self.phase = GamePhase::Playing;
    }

    /// Ensure collections are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.invaders.sort_by_key(|i| i.id);
        self.bullets.sort_by_key(|b| b.id);
        self.invader_bullets.sort_by_key(|b| b.id);
        self.power_ups.sort_by_key(|p| p.id);
    }
}
