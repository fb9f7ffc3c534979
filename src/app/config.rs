use crate::game::constants::{
    BOARD_HEIGHT, BOARD_WIDTH, FOOD_COUNT, INITIAL_LENGTH, MAX_BOARD_SIDE, MAX_INITIAL_LENGTH,
    MAX_PLAYERS, OBSTACLE_COUNT, SPAWN_MARGIN_X, TICK_MS,
};
use anyhow::ensure;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub board_width: i32,
    pub board_height: i32,
    pub tick_ms: u64,
    pub initial_length: usize,
    pub food_count: usize,
    pub obstacle_count: usize,
    pub max_players: usize,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_width: BOARD_WIDTH,
            board_height: BOARD_HEIGHT,
            tick_ms: TICK_MS,
            initial_length: INITIAL_LENGTH,
            food_count: FOOD_COUNT,
            obstacle_count: OBSTACLE_COUNT,
            max_players: MAX_PLAYERS,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Defaults overridden by `SNAKE_*` environment variables. Unparsable
    /// values fall back to the default; the result is validated.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            board_width: env_parse("SNAKE_BOARD_WIDTH").unwrap_or(defaults.board_width),
            board_height: env_parse("SNAKE_BOARD_HEIGHT").unwrap_or(defaults.board_height),
            tick_ms: env_parse("SNAKE_TICK_MS").unwrap_or(defaults.tick_ms),
            initial_length: env_parse("SNAKE_INITIAL_LENGTH").unwrap_or(defaults.initial_length),
            food_count: env_parse("SNAKE_FOOD_COUNT").unwrap_or(defaults.food_count),
            obstacle_count: env_parse("SNAKE_OBSTACLE_COUNT").unwrap_or(defaults.obstacle_count),
            max_players: env_parse("SNAKE_MAX_PLAYERS").unwrap_or(defaults.max_players),
            seed: env_parse("SNAKE_SEED"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.tick_ms > 0, "tick interval must be positive");
        ensure!(self.initial_length >= 1, "snakes need at least one cell");
        ensure!(
            self.initial_length <= MAX_INITIAL_LENGTH,
            "initial length {} exceeds {}",
            self.initial_length,
            MAX_INITIAL_LENGTH
        );
        ensure!(self.board_height >= 2, "board needs at least two rows");
        ensure!(
            self.board_width <= MAX_BOARD_SIDE && self.board_height <= MAX_BOARD_SIDE,
            "board {}x{} exceeds {} cells per side",
            self.board_width,
            self.board_height,
            MAX_BOARD_SIDE
        );
        ensure!(
            self.board_width > SPAWN_MARGIN_X + self.initial_length as i32,
            "board width {} leaves no room for snakes of length {}",
            self.board_width,
            self.initial_length
        );
        ensure!(self.max_players >= 1, "at least one player must fit");
        ensure!(
            self.max_players < self.board_height as usize,
            "{} players do not fit in {} rows",
            self.max_players,
            self.board_height
        );
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
}
