//! Grid query surface - which devices occupy which cell.
//!
//! The network only reads through [`GridQuery`]; placement and removal go
//! through the engine, which keeps [`MapGrid`] in step with the world.

use std::collections::HashMap;

use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::components::Cell;

/// Read-only view of the map used by propagation
pub trait GridQuery {
    /// Devices in `cell`, in placement order
    fn things_at(&self, cell: Cell) -> &[Entity];
    fn in_bounds(&self, cell: Cell) -> bool;
}

/// Sparse cell index over a rectangular map
#[derive(Debug, Clone, Default)]
pub struct MapGrid {
    size: MapSize,
    cells: HashMap<Cell, Vec<Entity>>,
}

/// Map dimensions in cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: i32,
    pub height: i32,
}

impl MapGrid {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            size: MapSize {
                width: width.max(0),
                height: height.max(0),
            },
            cells: HashMap::new(),
        }
    }

    pub fn size(&self) -> MapSize {
        self.size
    }

    pub fn insert(&mut self, cell: Cell, entity: Entity) {
        let occupants = self.cells.entry(cell).or_default();
        if !occupants.contains(&entity) {
            occupants.push(entity);
        }
    }

    /// Remove `entity` from `cell`. Returns false if it wasn't there.
    pub fn remove(&mut self, cell: Cell, entity: Entity) -> bool {
        let Some(occupants) = self.cells.get_mut(&cell) else {
            return false;
        };
        let before = occupants.len();
        occupants.retain(|e| *e != entity);
        let removed = occupants.len() != before;
        if occupants.is_empty() {
            self.cells.remove(&cell);
        }
        removed
    }

    /// Number of occupied cells
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }
}

impl GridQuery for MapGrid {
    fn things_at(&self, cell: Cell) -> &[Entity] {
        self.cells.get(&cell).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.z >= 0 && cell.x < self.size.width && cell.z < self.size.height
    }
}
