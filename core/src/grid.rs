//! Grid store: placed structures and the cell → structure occupancy index.
//!
//! RULE: the instance map and the occupancy index change together or not
//! at all. Every mutating method validates first and only then writes both,
//! so a failed call leaves the store untouched.

use crate::{
    error::{CoreError, CoreResult, PlacementError},
    rules::{StructureType, MIN_LEVEL},
    types::{Cell, Footprint, StructureId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StructureState {
    /// Placed on the grid, construction not yet started.
    Planned,
    UnderConstruction {
        target_level: u32,
        started_at:   Timestamp,
        finishes_at:  Timestamp,
    },
    Idle,
}

impl StructureState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Planned                  => "planned",
            Self::UnderConstruction { .. } => "under_construction",
            Self::Idle                     => "idle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureInstance {
    pub id:             StructureId,
    pub structure_type: StructureType,
    pub level:          u32,
    pub cell:           Cell,
    pub footprint:      Footprint,
    pub state:          StructureState,
    /// Set while a local mutation awaits confirmation from the authority.
    pub pending_since:  Option<Timestamp>,
}

impl StructureInstance {
    /// A freshly planned structure at the minimum level.
    pub fn planned(id: StructureId, structure_type: StructureType, cell: Cell) -> Self {
        Self {
            id,
            structure_type,
            level: MIN_LEVEL,
            cell,
            footprint: structure_type.footprint(),
            state: StructureState::Planned,
            pending_since: None,
        }
    }

    pub fn construction_in_progress(&self) -> bool {
        !matches!(self.state, StructureState::Idle)
    }

    /// True once the first construction has finished, upgrades included.
    pub fn is_built(&self) -> bool {
        match self.state {
            StructureState::Planned => false,
            StructureState::UnderConstruction { target_level, .. } => target_level > self.level,
            StructureState::Idle => true,
        }
    }

    pub fn is_building(&self) -> bool {
        matches!(self.state, StructureState::UnderConstruction { .. })
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.footprint.cells(self.cell)
    }
}

/// Serialized form. The occupancy index is derived, so it is never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GridRecord {
    width:     u32,
    height:    u32,
    instances: Vec<StructureInstance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GridRecord", into = "GridRecord")]
pub struct GridStore {
    width:     u32,
    height:    u32,
    instances: BTreeMap<StructureId, StructureInstance>,
    occupancy: HashMap<Cell, StructureId>,
}

impl GridStore {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            instances: BTreeMap::new(),
            occupancy: HashMap::new(),
        }
    }

    pub fn width(&self) -> u32  { self.width }
    pub fn height(&self) -> u32 { self.height }

    // ── Queries ───────────────────────────────────────────────────

    pub fn in_bounds(&self, cell: Cell, footprint: Footprint) -> bool {
        cell.x >= 0
            && cell.y >= 0
            && footprint.rows > 0
            && footprint.cols > 0
            && i64::from(cell.x) + i64::from(footprint.cols) <= i64::from(self.width)
            && i64::from(cell.y) + i64::from(footprint.rows) <= i64::from(self.height)
    }

    pub fn can_place(&self, cell: Cell, footprint: Footprint) -> bool {
        self.check_place(cell, footprint, None).is_ok()
    }

    /// As `can_place`, ignoring the cells of structure `id` (used for moves).
    pub fn can_place_excluding(&self, id: &str, cell: Cell, footprint: Footprint) -> bool {
        self.check_place(cell, footprint, Some(id)).is_ok()
    }

    pub fn check_place(
        &self,
        cell: Cell,
        footprint: Footprint,
        excluding: Option<&str>,
    ) -> Result<(), PlacementError> {
        if !self.in_bounds(cell, footprint) {
            return Err(PlacementError::OutOfBounds { cell });
        }
        for c in footprint.cells(cell) {
            if let Some(owner) = self.occupancy.get(&c) {
                if excluding != Some(owner.as_str()) {
                    return Err(PlacementError::Occupied { cell: c, by: owner.clone() });
                }
            }
        }
        Ok(())
    }

    pub fn occupant(&self, cell: Cell) -> Option<&StructureInstance> {
        self.occupancy.get(&cell).and_then(|id| self.instances.get(id))
    }

    pub fn get(&self, id: &str) -> Option<&StructureInstance> {
        self.instances.get(id)
    }

    pub fn instances(&self) -> impl Iterator<Item = &StructureInstance> {
        self.instances.values()
    }

    pub fn instances_of(&self, structure_type: StructureType) -> impl Iterator<Item = &StructureInstance> {
        self.instances.values().filter(move |s| s.structure_type == structure_type)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn occupied_cell_count(&self) -> usize {
        self.occupancy.len()
    }

    // ── Mutations ─────────────────────────────────────────────────

    pub fn add(&mut self, instance: StructureInstance) -> CoreResult<()> {
        if self.instances.contains_key(&instance.id) {
            return Err(CoreError::InvalidTransition {
                id:     instance.id,
                action: "be added",
                state:  "already placed",
            });
        }
        self.check_place(instance.cell, instance.footprint, None)?;
        self.index(&instance);
        self.instances.insert(instance.id.clone(), instance);
        Ok(())
    }

    /// Put `instance` in place of whatever copy of it is on the grid, or add
    /// it if there is none. Checked against every other structure first.
    pub fn upsert(&mut self, instance: StructureInstance) -> CoreResult<()> {
        self.check_place(instance.cell, instance.footprint, Some(&instance.id))?;
        if let Some(old) = self.instances.remove(&instance.id) {
            self.unindex(&old);
        }
        self.index(&instance);
        self.instances.insert(instance.id.clone(), instance);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<StructureInstance> {
        let instance = self.instances.remove(id)?;
        self.unindex(&instance);
        Some(instance)
    }

    pub fn move_structure(&mut self, id: &str, to: Cell) -> CoreResult<()> {
        let footprint = self
            .instances
            .get(id)
            .map(|s| s.footprint)
            .ok_or_else(|| CoreError::StructureNotFound { id: id.to_string() })?;
        self.check_place(to, footprint, Some(id))?;

        if let Some(mut instance) = self.instances.remove(id) {
            self.unindex(&instance);
            instance.cell = to;
            self.index(&instance);
            self.instances.insert(instance.id.clone(), instance);
        }
        Ok(())
    }

    /// Mutate the non-spatial fields of a structure. `cell`, `footprint`
    /// and `id` are restored afterwards; moves go through `move_structure`.
    pub fn modify<R>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut StructureInstance) -> R,
    ) -> CoreResult<R> {
        let instance = self
            .instances
            .get_mut(id)
            .ok_or_else(|| CoreError::StructureNotFound { id: id.to_string() })?;
        let (cell, footprint, key) = (instance.cell, instance.footprint, instance.id.clone());
        let out = f(instance);
        instance.cell = cell;
        instance.footprint = footprint;
        instance.id = key;
        Ok(out)
    }

    /// Swap in a whole new instance set. Nothing changes unless the new set
    /// is overlap-free and inside the bounds.
    pub fn replace_all(&mut self, instances: Vec<StructureInstance>) -> CoreResult<()> {
        let mut next = GridStore::new(self.width, self.height);
        for instance in instances {
            next.add(instance)?;
        }
        *self = next;
        Ok(())
    }

    /// Check the occupancy index against the instance set.
    pub fn verify(&self) -> bool {
        let mut expected: HashMap<Cell, &str> = HashMap::new();
        for instance in self.instances.values() {
            if !self.in_bounds(instance.cell, instance.footprint) {
                return false;
            }
            for c in instance.cells() {
                if expected.insert(c, instance.id.as_str()).is_some() {
                    return false;
                }
            }
        }
        expected.len() == self.occupancy.len()
            && expected
                .iter()
                .all(|(c, id)| self.occupancy.get(c).map(String::as_str) == Some(*id))
    }

    fn index(&mut self, instance: &StructureInstance) {
        for c in instance.cells() {
            self.occupancy.insert(c, instance.id.clone());
        }
    }

    fn unindex(&mut self, instance: &StructureInstance) {
        for c in instance.cells() {
            self.occupancy.remove(&c);
        }
    }
}

impl TryFrom<GridRecord> for GridStore {
    type Error = String;

    fn try_from(record: GridRecord) -> Result<Self, Self::Error> {
        let mut grid = GridStore::new(record.width, record.height);
        grid.replace_all(record.instances).map_err(|e| e.to_string())?;
        Ok(grid)
    }
}

impl From<GridStore> for GridRecord {
    fn from(grid: GridStore) -> Self {
        GridRecord {
            width:     grid.width,
            height:    grid.height,
            instances: grid.instances.into_values().collect(),
        }
    }
}
