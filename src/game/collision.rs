use super::board::Board;
use super::snake::Snake;
use super::types::Position;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeathCause {
    Border,
    SelfCollision,
    Actor { other: String },
    Obstacle,
    Forfeit,
    Disconnected,
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeathCause::Border => f.write_str("border"),
            DeathCause::SelfCollision => f.write_str("self"),
            DeathCause::Actor { other } => write!(f, "actor:{other}"),
            DeathCause::Obstacle => f.write_str("obstacle"),
            DeathCause::Forfeit => f.write_str("forfeit"),
            DeathCause::Disconnected => f.write_str("disconnected"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub deaths: Vec<(String, DeathCause)>,
    pub consumed: Vec<(String, Position)>,
}

impl Resolution {
    #[cfg(test)]
    pub fn is_dead(&self, id: &str) -> bool {
        self.deaths.iter().any(|(dead, _)| dead == id)
    }
}

/// Judges one tick over already-advanced bodies. Every check reads the same
/// state, so the outcome does not depend on iteration order and
/// head-to-head collisions kill both actors.
pub fn resolve(
    board: &Board,
    actors: &BTreeMap<String, Snake>,
    food: &[Position],
    obstacles: &[Position],
) -> Resolution {
    let mut resolution = Resolution::default();

    for (id, snake) in actors {
        if !snake.is_alive() {
            continue;
        }
        if let Some(cause) = fatal_cause(board, actors, obstacles, id, snake) {
            resolution.deaths.push((id.clone(), cause));
            continue;
        }
        let head = snake.head();
        if food.contains(&head) {
            resolution.consumed.push((id.clone(), head));
        }
    }

    resolution
}

fn fatal_cause(
    board: &Board,
    actors: &BTreeMap<String, Snake>,
    obstacles: &[Position],
    id: &str,
    snake: &Snake,
) -> Option<DeathCause> {
    let head = snake.head();
    if !board.in_bounds(head) {
        return Some(DeathCause::Border);
    }
    if snake.is_self_colliding() {
        return Some(DeathCause::SelfCollision);
    }
    let hit = actors
        .iter()
        .filter(|(other_id, other)| other_id.as_str() != id && other.is_alive())
        .find(|(_, other)| other.occupies(head));
    if let Some((other_id, _)) = hit {
        return Some(DeathCause::Actor {
            other: other_id.clone(),
        });
    }
    if obstacles.contains(&head) {
        return Some(DeathCause::Obstacle);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::snake::snake_from_cells;
    use crate::game::types::Direction;

    fn actors(snakes: Vec<Snake>) -> BTreeMap<String, Snake> {
        snakes
            .into_iter()
            .map(|snake| (snake.id().to_string(), snake))
            .collect()
    }

    fn advance_all(actors: &mut BTreeMap<String, Snake>) {
        for snake in actors.values_mut() {
            snake.advance();
        }
    }

    #[test]
    fn border_kills_without_wraparound() {
        let board = Board::new(10, 10);
        let mut actors = actors(vec![snake_from_cells(
            "ana",
            &[(0, 5), (1, 5), (2, 5)],
            Direction::Left,
        )]);
        advance_all(&mut actors);
        assert_eq!(actors["ana"].head(), Position::new(-1, 5));

        let resolution = resolve(&board, &actors, &[], &[]);
        assert_eq!(resolution.deaths, vec![("ana".to_string(), DeathCause::Border)]);
    }

    #[test]
    fn head_to_head_kills_both() {
        let board = Board::new(10, 10);
        let mut actors = actors(vec![
            snake_from_cells("ana", &[(6, 7), (5, 7)], Direction::Right),
            snake_from_cells("bob", &[(8, 7), (9, 7)], Direction::Left),
        ]);
        advance_all(&mut actors);

        let resolution = resolve(&board, &actors, &[], &[]);
        assert!(resolution.is_dead("ana"));
        assert!(resolution.is_dead("bob"));
        assert_eq!(resolution.deaths.len(), 2);
    }

    #[test]
    fn running_into_a_body_kills_only_the_runner() {
        let board = Board::new(10, 10);
        let mut actors = actors(vec![
            snake_from_cells("ana", &[(4, 4), (4, 5)], Direction::Right),
            snake_from_cells("bob", &[(5, 3), (5, 4), (5, 5), (5, 6)], Direction::Up),
        ]);
        advance_all(&mut actors);

        let resolution = resolve(&board, &actors, &[], &[]);
        assert_eq!(
            resolution.deaths,
            vec![(
                "ana".to_string(),
                DeathCause::Actor {
                    other: "bob".to_string()
                }
            )]
        );
    }

    #[test]
    fn obstacle_kills() {
        let board = Board::new(10, 10);
        let mut actors = actors(vec![snake_from_cells("ana", &[(2, 2)], Direction::Down)]);
        advance_all(&mut actors);
        let resolution = resolve(&board, &actors, &[], &[Position::new(2, 3)]);
        assert_eq!(resolution.deaths, vec![("ana".to_string(), DeathCause::Obstacle)]);
    }

    #[test]
    fn survivor_on_food_consumes_it() {
        let board = Board::new(10, 10);
        let mut actors = actors(vec![snake_from_cells("ana", &[(2, 3), (1, 3)], Direction::Right)]);
        advance_all(&mut actors);
        let resolution = resolve(&board, &actors, &[Position::new(3, 3)], &[]);
        assert!(resolution.deaths.is_empty());
        assert_eq!(resolution.consumed, vec![("ana".to_string(), Position::new(3, 3))]);
    }

    #[test]
    fn dying_actor_does_not_eat() {
        let board = Board::new(10, 10);
        let mut actors = actors(vec![snake_from_cells("ana", &[(2, 2)], Direction::Down)]);
        advance_all(&mut actors);
        let cell = Position::new(2, 3);
        let resolution = resolve(&board, &actors, &[cell], &[cell]);
        assert!(resolution.is_dead("ana"));
        assert!(resolution.consumed.is_empty());
    }
}
