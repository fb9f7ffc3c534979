use super::types::Position;

/// Pure board geometry. Actor, food and obstacle state live in the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    width: i32,
    height: i32,
}

impl Board {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    pub fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Every cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = Position> {
        let (width, height) = (self.width, self.height);
        (0..height).flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_bounds_rejects_every_edge_overflow() {
        let board = Board::new(10, 10);
        assert!(board.in_bounds(Position::new(0, 0)));
        assert!(board.in_bounds(Position::new(9, 9)));
        assert!(!board.in_bounds(Position::new(-1, 5)));
        assert!(!board.in_bounds(Position::new(5, -1)));
        assert!(!board.in_bounds(Position::new(10, 5)));
        assert!(!board.in_bounds(Position::new(5, 10)));
    }

    #[test]
    fn cells_cover_the_board_once() {
        let board = Board::new(4, 3);
        let cells: Vec<Position> = board.cells().collect();
        assert_eq!(cells.len(), 12);
        assert_eq!(cells.first(), Some(&Position::new(0, 0)));
        assert_eq!(cells.last(), Some(&Position::new(3, 2)));
        assert!(cells.iter().all(|cell| board.in_bounds(*cell)));
    }
}
