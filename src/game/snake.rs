use super::types::{Direction, Position};
use std::collections::VecDeque;

const SPAWN_DIRECTION: Direction = Direction::Right;

#[derive(Debug, Clone)]
pub struct Snake {
    id: String,
    body: VecDeque<Position>,
    direction: Direction,
    pending_direction: Option<Direction>,
    alive: bool,
    score: u32,
    growth: u32,
}

impl Snake {
    /// Builds a snake whose head sits at `start` and whose body trails away
    /// from the spawn direction.
    pub fn create(start: Position, initial_length: usize, id: impl Into<String>) -> Self {
        let trail = SPAWN_DIRECTION.opposite();
        let mut body = VecDeque::with_capacity(initial_length.max(1));
        let mut cell = start;
        for _ in 0..initial_length.max(1) {
            body.push_back(cell);
            cell = cell.step(trail);
        }
        Self {
            id: id.into(),
            body,
            direction: SPAWN_DIRECTION,
            pending_direction: None,
            alive: true,
            score: 0,
            growth: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn body(&self) -> &VecDeque<Position> {
        &self.body
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[cfg(test)]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[cfg(test)]
    pub fn pending_direction(&self) -> Option<Direction> {
        self.pending_direction
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// Queues `requested` for the next tick. Reversals and `none` are dropped
    /// and leave both the current and the pending direction untouched.
    pub fn set_direction(&mut self, requested: Direction) -> bool {
        if !requested.is_cardinal() || requested == self.direction.opposite() {
            return false;
        }
        self.pending_direction = Some(requested);
        true
    }

    pub fn apply_pending_direction(&mut self) {
        if let Some(direction) = self.pending_direction.take() {
            self.direction = direction;
        }
    }

    pub fn advance(&mut self) {
        if !self.direction.is_cardinal() {
            return;
        }
        let head = self.head().step(self.direction);
        self.body.push_front(head);
        if self.growth > 0 {
            self.growth -= 1;
        } else {
            self.body.pop_back();
        }
    }

    pub fn grow(&mut self) {
        self.growth += 1;
        self.score += 1;
    }

    pub fn is_self_colliding(&self) -> bool {
        let head = self.head();
        self.body.iter().skip(1).any(|cell| *cell == head)
    }

    pub fn occupies(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }
}

#[cfg(test)]
pub(crate) fn snake_from_cells(id: &str, cells: &[(i32, i32)], direction: Direction) -> Snake {
    Snake {
        id: id.to_string(),
        body: cells.iter().map(|(x, y)| Position::new(*x, *y)).collect(),
        direction,
        pending_direction: None,
        alive: true,
        score: 0,
        growth: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(snake: &Snake) -> Vec<(i32, i32)> {
        snake.body().iter().map(|cell| (cell.x, cell.y)).collect()
    }

    #[test]
    fn create_trails_body_behind_head() {
        let snake = Snake::create(Position::new(5, 3), 4, "ana");
        assert_eq!(cells(&snake), vec![(5, 3), (4, 3), (3, 3), (2, 3)]);
        assert_eq!(snake.direction(), Direction::Right);
        assert!(snake.is_alive());
        assert_eq!(snake.score(), 0);
    }

    #[test]
    fn create_never_builds_an_empty_body() {
        let snake = Snake::create(Position::new(1, 1), 0, "ana");
        assert_eq!(snake.len(), 1);
    }

    #[test]
    fn advance_keeps_length_and_moves_head() {
        let mut snake = snake_from_cells("ana", &[(5, 5), (4, 5), (3, 5)], Direction::Right);
        snake.advance();
        assert_eq!(cells(&snake), vec![(6, 5), (5, 5), (4, 5)]);
    }

    #[test]
    fn reversal_is_a_no_op() {
        let mut snake = snake_from_cells("ana", &[(5, 5), (4, 5)], Direction::Right);
        assert!(snake.set_direction(Direction::Up));
        assert!(!snake.set_direction(Direction::Left));
        assert_eq!(snake.direction(), Direction::Right);
        assert_eq!(snake.pending_direction(), Some(Direction::Up));
    }

    #[test]
    fn none_is_rejected() {
        let mut snake = snake_from_cells("ana", &[(5, 5)], Direction::Right);
        assert!(!snake.set_direction(Direction::None));
        assert_eq!(snake.pending_direction(), None);
    }

    #[test]
    fn last_request_before_tick_wins() {
        let mut snake = snake_from_cells("ana", &[(5, 5), (4, 5)], Direction::Right);
        snake.set_direction(Direction::Up);
        snake.set_direction(Direction::Down);
        assert_eq!(snake.direction(), Direction::Right);
        snake.apply_pending_direction();
        assert_eq!(snake.direction(), Direction::Down);
        assert_eq!(snake.pending_direction(), None);
    }

    #[test]
    fn growth_credit_is_spent_on_next_advance() {
        let mut snake = snake_from_cells("ana", &[(3, 3), (2, 3)], Direction::Right);
        snake.grow();
        assert_eq!(snake.score(), 1);
        assert_eq!(snake.len(), 2);
        snake.advance();
        assert_eq!(cells(&snake), vec![(4, 3), (3, 3), (2, 3)]);
        snake.advance();
        assert_eq!(snake.len(), 3);
    }

    #[test]
    fn self_collision_detects_head_on_body() {
        let mut snake = snake_from_cells(
            "ana",
            &[(5, 5), (5, 6), (4, 6), (4, 5), (3, 5)],
            Direction::Left,
        );
        assert!(!snake.is_self_colliding());
        snake.advance();
        assert!(snake.is_self_colliding());
    }

    #[test]
    fn following_own_tail_is_safe() {
        let mut snake = snake_from_cells("ana", &[(5, 5), (5, 6), (4, 6), (4, 5)], Direction::Left);
        snake.advance();
        assert_eq!(snake.head(), Position::new(4, 5));
        assert!(!snake.is_self_colliding());
    }
}
