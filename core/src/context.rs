use crate::pool::BulletId;
use crate::rng::{mix64, DetRng};
use crate::signals::TickId;

const SPAWN_SALT: u64 = 0x5350_4157_4e00_0001;
const UPDATE_SALT: u64 = 0x5550_4441_5445_0002;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerPosition {
    pub x: f64,
    pub y: f64,
    pub valid: bool,
}

impl PlayerPosition {
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, valid: true }
    }
}

/// No position set yet reads as `(0, 0)`.
impl Default for PlayerPosition {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            valid: false,
        }
    }
}

/// Read-only snapshot handed to every evaluation of one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickContext {
    pub tick: TickId,
    pub dt: f64,
    pub player: PlayerPosition,
    pub seed: u64,
}

impl TickContext {
    pub fn new(tick: TickId, dt: f64) -> Self {
        Self {
            tick,
            dt,
            player: PlayerPosition::default(),
            seed: 0,
        }
    }

    pub fn with_player(mut self, player: PlayerPosition) -> Self {
        self.player = player;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Stream for the instance's regular update on this tick.
    pub fn update_stream(&self, id: BulletId) -> DetRng {
        self.stream(id, UPDATE_SALT)
    }

    /// Stream for the one-off spawn hook when the instance is realized.
    pub fn spawn_stream(&self, id: BulletId) -> DetRng {
        self.stream(id, SPAWN_SALT)
    }

    fn stream(&self, id: BulletId, salt: u64) -> DetRng {
        let tick_seed = mix64(self.seed ^ salt, self.tick);
        DetRng::new(mix64(tick_seed, id.raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_defaults_to_origin_and_invalid() {
        let ctx = TickContext::new(1, 0.5);
        assert_eq!(ctx.player.x, 0.0);
        assert_eq!(ctx.player.y, 0.0);
        assert!(!ctx.player.valid);
        assert!(ctx.with_player(PlayerPosition::at(3.0, 4.0)).player.valid);
    }

    #[test]
    fn streams_depend_on_seed_tick_and_id() {
        let ctx = TickContext::new(5, 1.0 / 60.0).with_seed(11);
        let a = ctx.update_stream(BulletId(1)).next_u64();
        assert_eq!(a, ctx.update_stream(BulletId(1)).next_u64());
        assert_ne!(a, ctx.update_stream(BulletId(2)).next_u64());
        assert_ne!(a, ctx.spawn_stream(BulletId(1)).next_u64());
        let next_tick = TickContext::new(6, 1.0 / 60.0).with_seed(11);
        assert_ne!(a, next_tick.update_stream(BulletId(1)).next_u64());
    }
}
