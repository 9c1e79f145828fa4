//! Spatial hash grid over live enemies
//!
//! Rebuilt once per authoritative detection re-scan. Radius queries only
//! touch the cells overlapping the query circle.

use crate::game::pool::{EnemyHandle, EnemyPool};
use crate::util::vec2::Vec2;
use hashbrown::HashMap;

/// Default cell size (world units). Matches the default detection radius so a
/// re-scan touches at most a 3x3 block.
pub const ENEMY_GRID_CELL_SIZE: f32 = 5.0;

/// Initial capacity for grid cells (number of expected non-empty cells)
const ENEMY_GRID_INITIAL_CAPACITY: usize = 64;

/// Initial capacity for entries within a cell
const ENEMY_CELL_INITIAL_CAPACITY: usize = 4;

/// Grid cell key - (x, y) cell coordinates
pub type CellKey = (i32, i32);

/// Entry stored in the grid
#[derive(Debug, Clone, Copy)]
pub struct SpatialEnemy {
    pub handle: EnemyHandle,
    pub position: Vec2,
}

/// Spatial hash grid for enemy range queries
#[derive(Debug, Clone)]
pub struct EnemyGrid {
    cell_size: f32,
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f32,
    cells: HashMap<CellKey, Vec<SpatialEnemy>>,
}

impl EnemyGrid {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 {
            cell_size
        } else {
            ENEMY_GRID_CELL_SIZE
        };
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_capacity(ENEMY_GRID_INITIAL_CAPACITY),
        }
    }

    /// Clear all entries, keeping cell allocations
    #[inline]
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    #[inline]
    fn position_to_cell(&self, position: Vec2) -> CellKey {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.y * self.inv_cell_size).floor() as i32,
        )
    }

    #[inline]
    pub fn insert(&mut self, handle: EnemyHandle, position: Vec2) {
        let cell_key = self.position_to_cell(position);
        self.cells
            .entry(cell_key)
            .or_insert_with(|| Vec::with_capacity(ENEMY_CELL_INITIAL_CAPACITY))
            .push(SpatialEnemy { handle, position });
    }

    /// Rebuild from the pool's live (active, not dead) enemies. Cells left
    /// empty are dropped so the map tracks only where enemies are now.
    pub fn rebuild(&mut self, pool: &EnemyPool) {
        self.clear();
        for (handle, enemy) in pool.iter_active() {
            if enemy.is_alive() {
                self.insert(handle, enemy.position);
            }
        }
        self.cells.retain(|_, cell| !cell.is_empty());
    }

    /// Allocated cells, empty ones included
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Entries whose stored position lies within `radius` of `center`
    pub fn query_radius(
        &self,
        center: Vec2,
        radius: f32,
    ) -> impl Iterator<Item = &SpatialEnemy> + '_ {
        let (cx, cy) = self.position_to_cell(center);
        let cell_radius = (radius * self.inv_cell_size).ceil() as i32;
        let radius_sq = radius * radius;

        (-cell_radius..=cell_radius).flat_map(move |dx| {
            (-cell_radius..=cell_radius).flat_map(move |dy| {
                self.cells
                    .get(&(cx + dx, cy + dy))
                    .into_iter()
                    .flat_map(|cell| cell.iter())
                    .filter(move |e| e.position.distance_sq_to(center) <= radius_sq)
            })
        })
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Get statistics about the grid
    pub fn stats(&self) -> SpatialGridStats {
        let non_empty_cells = self.cells.values().filter(|c| !c.is_empty()).count();
        let total_entities: usize = self.cells.values().map(|c| c.len()).sum();
        let max_per_cell = self.cells.values().map(|c| c.len()).max().unwrap_or(0);

        SpatialGridStats {
            non_empty_cells,
            total_entities,
            max_per_cell,
        }
    }
}

impl Default for EnemyGrid {
    fn default() -> Self {
        Self::new(ENEMY_GRID_CELL_SIZE)
    }
}

/// Statistics about the spatial grid
#[derive(Debug, Clone)]
pub struct SpatialGridStats {
    pub non_empty_cells: usize,
    pub total_entities: usize,
    pub max_per_cell: usize,
}
