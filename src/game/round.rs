use super::board::Board;
use super::collision::{resolve, DeathCause};
use super::constants::SPAWN_MARGIN_X;
use super::snake::Snake;
use super::spawner::{spawn_food, spawn_obstacles, SpawnError};
use super::types::{Direction, Position};
use crate::app::config::GameConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoundError {
    #[error("a round needs at least one participant")]
    NoParticipants,
    #[error("{requested} participants do not fit in {rows} rows")]
    TooManyParticipants { requested: usize, rows: usize },
    #[error("board width {width} is too narrow for snakes of length {length}")]
    BoardTooNarrow { width: i32, length: usize },
}

/// Immutable copy of a round at the end of a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub snakes: BTreeMap<String, Vec<Position>>,
    #[serde(default)]
    pub scores: BTreeMap<String, u32>,
    pub food: Vec<Position>,
    #[serde(default)]
    pub obstacles: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elimination {
    pub id: String,
    /// Ticks the actor completed alive.
    pub survived_ticks: u64,
    pub score: u32,
    pub cause: DeathCause,
}

#[derive(Debug, Clone)]
pub struct TickReport {
    pub snapshot: Snapshot,
    pub eliminated: Vec<Elimination>,
    pub finished: bool,
}

/// The live round: actors keyed by participant id (ascending order is the
/// resolution order), food, obstacles and the elimination record.
#[derive(Debug)]
pub struct Round {
    board: Board,
    actors: BTreeMap<String, Snake>,
    food: Vec<Position>,
    obstacles: Vec<Position>,
    food_target: usize,
    tick: u64,
    eliminations: Vec<Elimination>,
    rng: StdRng,
}

impl Round {
    pub fn new(config: &GameConfig, participants: &[String]) -> Result<Self, RoundError> {
        if participants.is_empty() {
            return Err(RoundError::NoParticipants);
        }
        let rows = config.board_height.max(1) as usize;
        if participants.len() >= rows {
            return Err(RoundError::TooManyParticipants {
                requested: participants.len(),
                rows,
            });
        }
        let length = config.initial_length.max(1);
        let head_x = i32::try_from(length)
            .ok()
            .and_then(|length| SPAWN_MARGIN_X.checked_add(length - 1))
            .filter(|head_x| i64::from(*head_x) + 1 < i64::from(config.board_width))
            .ok_or(RoundError::BoardTooNarrow {
                width: config.board_width,
                length,
            })?;

        let board = Board::new(config.board_width, config.board_height);
        let lane_count = participants.len() as i64 + 1;
        let mut actors = BTreeMap::new();
        let mut lanes = Vec::with_capacity(participants.len());
        for (index, id) in participants.iter().enumerate() {
            // Always below board_height, so it fits back into an i32.
            let row = ((index as i64 + 1) * i64::from(config.board_height) / lane_count) as i32;
            lanes.push(row);
            actors
                .entry(id.clone())
                .or_insert_with(|| Snake::create(Position::new(head_x, row), length, id.clone()));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut round = Self {
            board,
            actors,
            food: Vec::new(),
            obstacles: Vec::new(),
            food_target: config.food_count,
            tick: 0,
            eliminations: Vec::new(),
            rng,
        };

        let result = spawn_obstacles(
            &mut round.rng,
            &round.board,
            &mut round.obstacles,
            config.obstacle_count,
            |cell| lanes.contains(&cell.y),
        );
        if let Err(error) = result {
            tracing::error!(%error, placed = round.obstacles.len(), "obstacle placement stopped early");
        }
        round.replenish_food();

        tracing::info!(
            participants = round.actors.len(),
            obstacles = round.obstacles.len(),
            food = round.food.len(),
            "round created"
        );
        Ok(round)
    }

    #[cfg(test)]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    #[cfg(test)]
    pub fn actor(&self, id: &str) -> Option<&Snake> {
        self.actors.get(id)
    }

    pub fn is_finished(&self) -> bool {
        self.actors.is_empty()
    }

    /// Queues a direction for `id`. Unknown ids and rejected directions are
    /// ignored.
    pub fn set_direction(&mut self, id: &str, direction: Direction) -> bool {
        match self.actors.get_mut(id) {
            Some(snake) => snake.set_direction(direction),
            None => false,
        }
    }

    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;

        for snake in self.actors.values_mut() {
            snake.apply_pending_direction();
            snake.advance();
        }

        let resolution = resolve(&self.board, &self.actors, &self.food, &self.obstacles);

        for (id, cause) in &resolution.deaths {
            if let Some(snake) = self.actors.get_mut(id) {
                snake.kill();
                tracing::debug!(player_id = %id, %cause, tick = self.tick, "snake died");
            }
        }

        for (id, cell) in &resolution.consumed {
            if let Some(snake) = self.actors.get_mut(id) {
                snake.grow();
            }
            self.food.retain(|food| food != cell);
        }
        self.replenish_food();

        let mut eliminated = Vec::with_capacity(resolution.deaths.len());
        for (id, cause) in resolution.deaths {
            if let Some(snake) = self.actors.remove(&id) {
                eliminated.push(Elimination {
                    id,
                    survived_ticks: self.tick - 1,
                    score: snake.score(),
                    cause,
                });
            }
        }
        self.eliminations.extend(eliminated.iter().cloned());

        TickReport {
            snapshot: self.snapshot(),
            eliminated,
            finished: self.is_finished(),
        }
    }

    pub fn remove(&mut self, id: &str, cause: DeathCause) -> Option<Elimination> {
        let snake = self.actors.remove(id)?;
        let elimination = Elimination {
            id: id.to_string(),
            survived_ticks: self.tick,
            score: snake.score(),
            cause,
        };
        self.eliminations.push(elimination.clone());
        Some(elimination)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            snakes: self
                .actors
                .iter()
                .map(|(id, snake)| (id.clone(), snake.body().iter().copied().collect()))
                .collect(),
            scores: self
                .actors
                .iter()
                .map(|(id, snake)| (id.clone(), snake.score()))
                .collect(),
            food: self.food.clone(),
            obstacles: self.obstacles.clone(),
        }
    }

    /// Ranking, best first: survivors by score, then the eliminated by how
    /// long they lasted. Disconnected participants are left out.
    pub fn scoreboard(&self) -> Vec<String> {
        let mut survivors: Vec<&Snake> = self.actors.values().collect();
        survivors.sort_by(|a, b| b.score().cmp(&a.score()).then_with(|| a.id().cmp(b.id())));

        let mut eliminated: Vec<&Elimination> = self
            .eliminations
            .iter()
            .filter(|entry| entry.cause != DeathCause::Disconnected)
            .collect();
        eliminated.sort_by(|a, b| {
            b.survived_ticks
                .cmp(&a.survived_ticks)
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| a.id.cmp(&b.id))
        });

        survivors
            .into_iter()
            .map(|snake| snake.id().to_string())
            .chain(eliminated.into_iter().map(|entry| entry.id.clone()))
            .collect()
    }

    fn replenish_food(&mut self) {
        let missing = self.food_target.saturating_sub(self.food.len());
        if missing == 0 {
            return;
        }
        let actors = &self.actors;
        let obstacles = &self.obstacles;
        let result = spawn_food(&mut self.rng, &self.board, &mut self.food, missing, |cell| {
            obstacles.contains(&cell) || actors.values().any(|snake| snake.occupies(cell))
        });
        if let Err(error) = result {
            log_saturation(error, self.tick);
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        board: Board,
        snakes: Vec<Snake>,
        food: Vec<Position>,
        obstacles: Vec<Position>,
        seed: u64,
    ) -> Self {
        let food_target = food.len();
        Self {
            board,
            actors: snakes
                .into_iter()
                .map(|snake| (snake.id().to_string(), snake))
                .collect(),
            food,
            obstacles,
            food_target,
            tick: 0,
            eliminations: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

fn log_saturation(error: SpawnError, tick: u64) {
    tracing::error!(%error, tick, "food spawn failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::snake::snake_from_cells;
    use rand::Rng;
    use std::collections::HashSet;

    fn names(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn seeded_config() -> GameConfig {
        GameConfig {
            seed: Some(42),
            ..GameConfig::default()
        }
    }

    #[test]
    fn new_round_places_each_participant_on_its_own_lane() {
        let round = Round::new(&seeded_config(), &names(&["ana", "bob", "cy"])).expect("round");
        let snapshot = round.snapshot();
        assert_eq!(snapshot.snakes.len(), 3);

        let heads: HashSet<i32> = snapshot.snakes.values().map(|body| body[0].y).collect();
        assert_eq!(heads.len(), 3);
        for body in snapshot.snakes.values() {
            assert_eq!(body.len(), GameConfig::default().initial_length);
            assert!(body.iter().all(|cell| round.board().in_bounds(*cell)));
        }
        assert_eq!(snapshot.food.len(), GameConfig::default().food_count);
        assert_eq!(snapshot.obstacles.len(), GameConfig::default().obstacle_count);
        for cell in &snapshot.obstacles {
            assert!(!heads.contains(&cell.y));
        }
    }

    #[test]
    fn empty_roster_is_rejected() {
        assert!(matches!(
            Round::new(&seeded_config(), &[]),
            Err(RoundError::NoParticipants)
        ));
    }

    #[test]
    fn oversized_roster_is_rejected() {
        let config = GameConfig {
            board_height: 3,
            ..seeded_config()
        };
        assert!(matches!(
            Round::new(&config, &names(&["a", "b", "c"])),
            Err(RoundError::TooManyParticipants { .. })
        ));
    }

    #[test]
    fn lanes_on_a_very_tall_board_stay_in_bounds() {
        let config = GameConfig {
            board_height: i32::MAX,
            obstacle_count: 0,
            ..seeded_config()
        };
        let round = Round::new(&config, &names(&["ana", "bob"])).expect("round");
        let snapshot = round.snapshot();
        let mut rows: Vec<i32> = snapshot.snakes.values().map(|body| body[0].y).collect();
        rows.sort_unstable();
        assert_eq!(rows, vec![i32::MAX / 3, (2 * (i32::MAX as i64) / 3) as i32]);
        assert!(snapshot.snakes.values().flatten().all(|cell| round.board().in_bounds(*cell)));
    }

    #[test]
    fn absurd_initial_length_is_too_narrow() {
        let config = GameConfig {
            initial_length: usize::MAX,
            ..seeded_config()
        };
        assert!(matches!(
            Round::new(&config, &names(&["ana"])),
            Err(RoundError::BoardTooNarrow { .. })
        ));
    }

    #[test]
    fn eating_scores_now_and_grows_on_next_tick() {
        let ana = snake_from_cells("ana", &[(2, 3), (1, 3), (0, 3)], Direction::Right);
        let mut round = Round::from_parts(
            Board::new(10, 10),
            vec![ana],
            vec![Position::new(3, 3)],
            Vec::new(),
            1,
        );

        let report = round.tick();
        let ana = round.actor("ana").expect("ana alive");
        assert_eq!(ana.head(), Position::new(3, 3));
        assert_eq!(ana.score(), 1);
        assert_eq!(ana.len(), 3);
        assert_eq!(report.snapshot.food.len(), 1);
        assert!(!report.snapshot.food.contains(&Position::new(3, 3)));
        assert!(!ana.occupies(report.snapshot.food[0]));

        round.tick();
        assert_eq!(round.actor("ana").expect("ana alive").len(), 4);
    }

    #[test]
    fn head_to_head_removes_both_after_tick() {
        let mut round = Round::from_parts(
            Board::new(10, 10),
            vec![
                snake_from_cells("ana", &[(6, 7), (5, 7)], Direction::Right),
                snake_from_cells("bob", &[(8, 7), (9, 7)], Direction::Left),
                snake_from_cells("cy", &[(1, 1), (0, 1)], Direction::Right),
            ],
            Vec::new(),
            Vec::new(),
            1,
        );

        let report = round.tick();
        let dead: Vec<&str> = report.eliminated.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(dead, vec!["ana", "bob"]);
        assert!(!report.snapshot.snakes.contains_key("ana"));
        assert!(!report.snapshot.snakes.contains_key("bob"));
        assert!(report.snapshot.snakes.contains_key("cy"));
        assert!(!report.finished);
    }

    #[test]
    fn last_death_finishes_round() {
        let mut round = Round::from_parts(
            Board::new(10, 10),
            vec![snake_from_cells("ana", &[(0, 5), (1, 5)], Direction::Left)],
            Vec::new(),
            Vec::new(),
            1,
        );
        let report = round.tick();
        assert!(report.finished);
        assert_eq!(report.eliminated[0].cause, DeathCause::Border);
    }

    #[test]
    fn queued_direction_applies_on_tick() {
        let mut round = Round::from_parts(
            Board::new(10, 10),
            vec![snake_from_cells("ana", &[(5, 5), (4, 5)], Direction::Right)],
            Vec::new(),
            Vec::new(),
            1,
        );
        assert!(round.set_direction("ana", Direction::Up));
        assert!(round.set_direction("ana", Direction::Down));
        assert!(!round.set_direction("ana", Direction::Left));
        assert!(!round.set_direction("ghost", Direction::Up));

        round.tick();
        assert_eq!(round.actor("ana").expect("ana").head(), Position::new(5, 6));
    }

    #[test]
    fn scoreboard_ranks_latest_survivor_first() {
        let mut round = Round::from_parts(
            Board::new(10, 10),
            vec![
                snake_from_cells("ana", &[(0, 1), (1, 1)], Direction::Left),
                snake_from_cells("bob", &[(5, 5), (4, 5)], Direction::Right),
                snake_from_cells("cy", &[(5, 8), (4, 8)], Direction::Right),
            ],
            Vec::new(),
            Vec::new(),
            1,
        );
        round.tick();
        round.remove("cy", DeathCause::Forfeit);
        round.tick();
        round.remove("bob", DeathCause::Disconnected);

        assert_eq!(round.scoreboard(), vec!["cy".to_string(), "ana".to_string()]);
    }

    #[test]
    fn random_play_keeps_bodies_and_food_consistent() {
        let config = GameConfig {
            board_width: 16,
            board_height: 12,
            food_count: 3,
            obstacle_count: 5,
            seed: Some(7),
            ..GameConfig::default()
        };
        let ids = names(&["ana", "bob", "cy", "dee"]);
        let mut round = Round::new(&config, &ids).expect("round");
        let mut rng = StdRng::seed_from_u64(99);
        let choices = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

        for _ in 0..300 {
            if round.is_finished() {
                break;
            }
            for id in &ids {
                let direction = choices[rng.gen_range(0..choices.len())];
                round.set_direction(id, direction);
            }
            let report = round.tick();
            let snapshot = report.snapshot;

            for body in snapshot.snakes.values() {
                let unique: HashSet<&Position> = body.iter().collect();
                assert_eq!(unique.len(), body.len());
                assert!(body.iter().all(|cell| round.board().in_bounds(*cell)));
            }
            for cell in &snapshot.food {
                assert!(!snapshot.obstacles.contains(cell));
                assert!(snapshot.snakes.values().all(|body| !body.contains(cell)));
            }
        }
    }
}
