use super::board::Board;
use super::constants::MAX_SPAWN_ATTEMPTS;
use super::types::Position;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("no free cell left on a {width}x{height} board")]
    BoardSaturated { width: i32, height: i32 },
}

/// Picks a uniformly random cell for which `is_blocked` is false.
///
/// Random sampling is capped at `MAX_SPAWN_ATTEMPTS`; after that the board is
/// scanned so a nearly full board still finds its last free cells.
pub fn find_free_cell<R, F>(rng: &mut R, board: &Board, is_blocked: F) -> Result<Position, SpawnError>
where
    R: Rng + ?Sized,
    F: Fn(Position) -> bool,
{
    let (width, height) = board.dimensions();
    for _ in 0..MAX_SPAWN_ATTEMPTS {
        let candidate = Position::new(rng.gen_range(0..width), rng.gen_range(0..height));
        if !is_blocked(candidate) {
            return Ok(candidate);
        }
    }

    let free: Vec<Position> = board.cells().filter(|cell| !is_blocked(*cell)).collect();
    free.choose(rng)
        .copied()
        .ok_or(SpawnError::BoardSaturated { width, height })
}

/// Places `count` food cells, each disjoint from `is_blocked` and from the
/// ones placed before it. Stops at the first saturation error.
pub fn spawn_food<R, F>(
    rng: &mut R,
    board: &Board,
    food: &mut Vec<Position>,
    count: usize,
    is_blocked: F,
) -> Result<(), SpawnError>
where
    R: Rng + ?Sized,
    F: Fn(Position) -> bool,
{
    for _ in 0..count {
        let cell = find_free_cell(rng, board, |cell| is_blocked(cell) || food.contains(&cell))?;
        food.push(cell);
    }
    Ok(())
}

/// Adds `count` obstacles. Cells placed before a saturation error are kept.
pub fn spawn_obstacles<R, F>(
    rng: &mut R,
    board: &Board,
    obstacles: &mut Vec<Position>,
    count: usize,
    is_blocked: F,
) -> Result<(), SpawnError>
where
    R: Rng + ?Sized,
    F: Fn(Position) -> bool,
{
    for _ in 0..count {
        let cell = find_free_cell(rng, board, |cell| is_blocked(cell) || obstacles.contains(&cell))?;
        obstacles.push(cell);
    }
    Ok(())
}
