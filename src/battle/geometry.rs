//! Square-grid coordinates for the battlefield
//!
//! Sectors are addressed by (x, y). Units move in the 8-neighbourhood, so
//! distance is measured in king moves (Chebyshev distance).

use serde::{Deserialize, Serialize};

/// Grid position of a sector
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// King-move distance
    pub fn distance(&self, other: &Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    /// Squared euclidean distance, used to break distance ties
    pub fn distance_sq(&self, other: &Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    pub fn is_adjacent(&self, other: &Self) -> bool {
        self != other && self.distance(other) == 1
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }

    /// All 8 neighbouring positions (may lie off the map)
    pub fn neighbors(&self) -> [Position; 8] {
        Direction::all().map(|d| self.step(d))
    }

    /// Sectors on the straight line from self to other (inclusive), Bresenham
    pub fn line_to(&self, other: &Self) -> Vec<Position> {
        let dx = (other.x - self.x).abs();
        let dy = -(other.y - self.y).abs();
        let sx = if self.x < other.x { 1 } else { -1 };
        let sy = if self.y < other.y { 1 } else { -1 };

        let mut results = Vec::with_capacity(self.distance(other) as usize + 1);
        let mut x = self.x;
        let mut y = self.y;
        let mut err = dx + dy;
        loop {
            results.push(Position::new(x, y));
            if x == other.x && y == other.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        results
    }

    /// All positions within range (inclusive), including self
    pub fn positions_in_range(&self, range: u32) -> Vec<Position> {
        let range = range as i32;
        let mut results = Vec::with_capacity(((2 * range + 1) * (2 * range + 1)) as usize);
        for dy in -range..=range {
            for dx in -range..=range {
                results.push(self.offset(dx, dy));
            }
        }
        results
    }

    /// Direction of the single step that best closes on `target`
    pub fn direction_to(&self, target: &Self) -> Option<Direction> {
        let dx = (target.x - self.x).signum();
        let dy = (target.y - self.y).signum();
        Direction::from_delta(dx, dy)
    }
}

/// The eight compass directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// Offset for this direction; north is towards y = 0
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        Direction::all()
            .into_iter()
            .find(|d| d.delta() == (dx.signum(), dy.signum()) && (dx, dy) != (0, 0))
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::NorthEast => Direction::SouthWest,
            Direction::East => Direction::West,
            Direction::SouthEast => Direction::NorthWest,
            Direction::South => Direction::North,
            Direction::SouthWest => Direction::NorthEast,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
        }
    }

    /// Is this one of the four orthogonal directions?
    pub fn is_orthogonal(&self) -> bool {
        let (dx, dy) = self.delta();
        dx == 0 || dy == 0
    }

    /// All directions
    pub fn all() -> [Direction; 8] {
        [
            Direction::North,
            Direction::NorthEast,
            Direction::East,
            Direction::SouthEast,
            Direction::South,
            Direction::SouthWest,
            Direction::West,
            Direction::NorthWest,
        ]
    }

    /// The four orthogonal directions
    pub fn orthogonal() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }
}

/// Axis-aligned rectangle of sectors (inclusive bounds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Rect {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.min_x && pos.x <= self.max_x && pos.y >= self.min_y && pos.y <= self.max_y
    }

    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x + 1).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y + 1).max(0) as u32
    }

    pub fn area(&self) -> u32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Position {
        Position::new((self.min_x + self.max_x) / 2, (self.min_y + self.max_y) / 2)
    }

    /// Positions row by row
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (self.min_y..=self.max_y)
            .flat_map(move |y| (self.min_x..=self.max_x).map(move |x| Position::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_king_moves() {
        let a = Position::new(0, 0);
        assert_eq!(a.distance(&a), 0);
        assert_eq!(a.distance(&Position::new(3, 1)), 3);
        assert_eq!(a.distance(&Position::new(-2, 5)), 5);
        assert_eq!(a.distance(&Position::new(4, 4)), 4);
    }

    #[test]
    fn test_neighbors_are_adjacent() {
        let center = Position::new(5, 5);
        let neighbors = center.neighbors();
        assert_eq!(neighbors.len(), 8);
        assert!(neighbors.iter().all(|n| center.is_adjacent(n)));
    }

    #[test]
    fn test_line_includes_endpoints() {
        let a = Position::new(0, 0);
        let b = Position::new(5, 2);
        let line = a.line_to(&b);
        assert_eq!(line.first(), Some(&a));
        assert_eq!(line.last(), Some(&b));
        assert_eq!(line.len(), 6);
    }

    #[test]
    fn test_line_steps_are_adjacent() {
        let line = Position::new(2, 9).line_to(&Position::new(11, 3));
        for pair in line.windows(2) {
            assert!(pair[0].is_adjacent(&pair[1]));
        }
    }

    #[test]
    fn test_diagonal_line() {
        let line = Position::new(1, 1).line_to(&Position::new(4, 4));
        assert_eq!(
            line,
            vec![
                Position::new(1, 1),
                Position::new(2, 2),
                Position::new(3, 3),
                Position::new(4, 4)
            ]
        );
    }

    #[test]
    fn test_positions_in_range() {
        let center = Position::new(0, 0);
        assert_eq!(center.positions_in_range(1).len(), 9);
        assert_eq!(center.positions_in_range(2).len(), 25);
    }

    #[test]
    fn test_direction_opposite() {
        for dir in Direction::all() {
            let (dx, dy) = dir.delta();
            let (ox, oy) = dir.opposite().delta();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn test_direction_to() {
        let a = Position::new(5, 5);
        assert_eq!(a.direction_to(&Position::new(9, 5)), Some(Direction::East));
        assert_eq!(a.direction_to(&Position::new(1, 9)), Some(Direction::SouthWest));
        assert_eq!(a.direction_to(&a), None);
    }

    #[test]
    fn test_rect_positions() {
        let rect = Rect::new(2, 3, 4, 4);
        assert_eq!(rect.width(), 3);
        assert_eq!(rect.height(), 2);
        assert_eq!(rect.positions().count(), 6);
        assert!(rect.contains(Position::new(4, 3)));
        assert!(!rect.contains(Position::new(5, 3)));
    }
}
