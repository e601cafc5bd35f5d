//! Placement planner: turns "put a structure here / somewhere" into a
//! concrete cell, and keeps chains of linear structures (walls) contiguous.
//!
//! Chain resolution order, fixed:
//!   1. continue the direction of the last two chain cells,
//!      turning perpendicular if blocked;
//!   2. mirror off any existing linear structure adjacent to the anchor;
//!   3. fall back to one cell right of the last chain cell (unchecked).

use crate::{
    error::{CoreResult, PlacementError},
    grid::{GridStore, StructureInstance},
    rules::StructureType,
    types::{Cell, Footprint},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "cell", rename_all = "snake_case")]
pub enum PlacementTarget {
    At(Cell),
    Auto,
}

/// Continue from `origin` by `step`; if blocked, turn perpendicular
/// (positive side first). `None` unless `step` is a unit axis step.
fn step_candidates(origin: Cell, step: Cell) -> Option<[Cell; 3]> {
    if step.is_unit_horizontal() {
        Some([
            origin + step,
            Cell::new(origin.x, origin.y + 1),
            Cell::new(origin.x, origin.y - 1),
        ])
    } else if step.is_unit_vertical() {
        Some([
            origin + step,
            Cell::new(origin.x + 1, origin.y),
            Cell::new(origin.x - 1, origin.y),
        ])
    } else {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlacementPlanner {
    /// Cells placed so far in the current chain session, per linear type.
    chains: HashMap<StructureType, Vec<Cell>>,
}

impl PlacementPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(&self, structure_type: StructureType) -> &[Cell] {
        self.chains.get(&structure_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// End the current chain session for `structure_type`.
    pub fn reset_chain(&mut self, structure_type: StructureType) {
        self.chains.remove(&structure_type);
    }

    /// Forget chain cells whose structure is gone or has moved, so the next
    /// auto placement continues from a wall that still stands.
    pub fn prune(&mut self, grid: &GridStore) {
        for (structure_type, cells) in self.chains.iter_mut() {
            cells.retain(|c| {
                grid.occupant(*c)
                    .is_some_and(|s| s.structure_type == *structure_type && s.cell == *c)
            });
        }
        self.chains.retain(|_, cells| !cells.is_empty());
    }

    /// First free cell in row-major order from the origin.
    pub fn find_default_placement(grid: &GridStore, footprint: Footprint) -> Option<Cell> {
        let (width, height) = (grid.width() as i32, grid.height() as i32);
        (0..height)
            .flat_map(|y| (0..width).map(move |x| Cell::new(x, y)))
            .find(|cell| grid.can_place(*cell, footprint))
    }

    /// Best-effort next cell for a chain. The result of the final fallback
    /// is not validated; callers must check it before placing.
    pub fn find_next_chain_cell(
        grid: &GridStore,
        history: &[Cell],
        anchor: Cell,
        footprint: Footprint,
        linear_type: StructureType,
    ) -> Cell {
        if let [.., second_to_last, last] = history {
            let found = step_candidates(*last, *last - *second_to_last)
                .and_then(|cands| cands.into_iter().find(|c| grid.can_place(*c, footprint)));
            if let Some(cell) = found {
                return cell;
            }
        }

        // Mirror: a neighbour at anchor+offset suggests anchor-offset.
        // Neighbours are visited by cell so the choice never depends on ids.
        let mut neighbours: Vec<Cell> = grid.instances_of(linear_type).map(|s| s.cell).collect();
        neighbours.sort();
        for existing in neighbours {
            let found = step_candidates(anchor, anchor - existing)
                .and_then(|cands| cands.into_iter().find(|c| grid.can_place(*c, footprint)));
            if let Some(cell) = found {
                return cell;
            }
        }

        let last = history.last().copied().unwrap_or(anchor);
        Cell::new(last.x + 1, last.y)
    }

    /// Resolve `target` to a cell that is valid right now.
    pub fn resolve(
        &self,
        grid: &GridStore,
        structure_type: StructureType,
        target: PlacementTarget,
    ) -> Result<Cell, PlacementError> {
        let footprint = structure_type.footprint();
        match target {
            PlacementTarget::At(cell) => grid.check_place(cell, footprint, None).map(|_| cell),
            PlacementTarget::Auto => {
                let chain = self.chain(structure_type);
                if let (true, Some(anchor)) = (structure_type.is_linear(), chain.last()) {
                    let hint = Self::find_next_chain_cell(grid, chain, *anchor, footprint, structure_type);
                    if grid.can_place(hint, footprint) {
                        return Ok(hint);
                    }
                    log::debug!("chain hint {hint} for {} is blocked, scanning", structure_type.name());
                }
                Self::find_default_placement(grid, footprint).ok_or(PlacementError::NoFreeCell)
            }
        }
    }

    /// Place a new structure at the minimum level, construction pending.
    pub fn place(
        &mut self,
        grid: &mut GridStore,
        structure_type: StructureType,
        target: PlacementTarget,
    ) -> CoreResult<StructureInstance> {
        let cell = self.resolve(grid, structure_type, target)?;
        let instance = StructureInstance::planned(Uuid::new_v4().to_string(), structure_type, cell);
        grid.add(instance.clone())?;

        if structure_type.is_linear() {
            self.chains.entry(structure_type).or_default().push(cell);
        }
        log::debug!("placed {} at {cell} as {}", structure_type.name(), instance.id);
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_axis_steps_have_no_candidates() {
        assert!(step_candidates(Cell::new(3, 3), Cell::new(1, 1)).is_none());
        assert!(step_candidates(Cell::new(3, 3), Cell::new(2, 0)).is_none());
        assert!(step_candidates(Cell::new(3, 3), Cell::new(0, 0)).is_none());
    }

    #[test]
    fn vertical_step_turns_along_x() {
        let cands = step_candidates(Cell::new(3, 3), Cell::new(0, -1)).unwrap();
        assert_eq!(cands, [Cell::new(3, 2), Cell::new(4, 3), Cell::new(2, 3)]);
    }
}
