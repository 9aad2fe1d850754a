//! Common components used across multiple device types.

use serde::{Deserialize, Serialize};

/// Integer grid cell on the map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub z: i32,
}

impl Cell {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Widened before subtracting, so any two cells compare safely
    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dx = (i64::from(self.x) - i64::from(other.x)) as f32;
        let dz = (i64::from(self.z) - i64::from(other.z)) as f32;
        dx * dx + dz * dz
    }

    /// True if `other` is within `radius` of this cell (inclusive)
    pub fn within_radius(&self, other: &Self, radius: f32) -> bool {
        radius > 0.0 && self.distance_squared(other) <= radius * radius
    }

    pub fn step(&self, dir: Direction) -> Self {
        let (dx, dz) = dir.offset();
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// The four cardinal neighbours, in `Direction::CARDINAL` order
    pub fn cardinal_neighbors(&self) -> [Cell; 4] {
        Direction::CARDINAL.map(|d| self.step(d))
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Cardinal direction on the grid. Diagonals never carry a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::East | Direction::West => Axis::Horizontal,
            Direction::North | Direction::South => Axis::Vertical,
        }
    }
}

/// Wire axis, used by crossings to keep perpendicular runs apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn directions(self) -> [Direction; 2] {
        match self {
            Axis::Horizontal => [Direction::East, Direction::West],
            Axis::Vertical => [Direction::North, Direction::South],
        }
    }
}

/// Spatial position component - the cell a device occupies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub cell: Cell,
}

impl Position {
    pub fn new(x: i32, z: i32) -> Self {
        Self {
            cell: Cell::new(x, z),
        }
    }
}

impl From<Cell> for Position {
    fn from(cell: Cell) -> Self {
        Self { cell }
    }
}

/// Display label for gizmos and tooltips
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_distance() {
        let a = Cell::new(0, 0);
        let b = Cell::new(3, 4);
        assert_eq!(a.distance_squared(&b), 25.0);
        assert!(a.within_radius(&b, 5.0));
        assert!(!a.within_radius(&b, 4.9));
    }

    #[test]
    fn test_distance_between_extreme_cells() {
        let far = Cell::new(i32::MIN, i32::MAX);
        let origin = Cell::new(i32::MAX, 0);
        assert!(far.distance_squared(&origin).is_finite());
        assert!(!origin.within_radius(&far, 1000.0));
    }

    #[test]
    fn test_zero_radius_reaches_nothing() {
        let a = Cell::new(2, 2);
        assert!(!a.within_radius(&a, 0.0));
    }

    #[test]
    fn test_cardinal_neighbors() {
        let n = Cell::new(5, 5).cardinal_neighbors();
        assert_eq!(n[0], Cell::new(5, 6));
        assert_eq!(n[1], Cell::new(6, 5));
        assert_eq!(n[2], Cell::new(5, 4));
        assert_eq!(n[3], Cell::new(4, 5));
    }

    #[test]
    fn test_axis_directions() {
        assert_eq!(Direction::East.axis(), Axis::Horizontal);
        assert_eq!(Direction::South.axis(), Axis::Vertical);
        assert_eq!(
            Axis::Vertical.directions(),
            [Direction::North, Direction::South]
        );
    }
}
