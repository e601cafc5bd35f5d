//! Grid store and placement planner tests, including the wall-chain
//! heuristic and a randomized occupancy fuzz.

use bioclash_core::{
    error::{CoreError, PlacementError},
    grid::{GridStore, StructureInstance},
    planner::{PlacementPlanner, PlacementTarget},
    rng::ScenarioRng,
    rules::StructureType,
    types::{Cell, Footprint},
};

const WALL: Footprint = Footprint::new(1, 1);

fn wall(id: &str, x: i32, y: i32) -> StructureInstance {
    StructureInstance::planned(id.to_string(), StructureType::Wall, Cell::new(x, y))
}

fn grid_with(instances: Vec<StructureInstance>) -> GridStore {
    let mut grid = GridStore::new(12, 12);
    for instance in instances {
        grid.add(instance).expect("fixture placement");
    }
    grid
}

// ── Wall chains ──────────────────────────────────────────────────────

#[test]
fn chain_continues_in_its_direction() {
    let grid = grid_with(vec![wall("a", 0, 0), wall("b", 1, 0)]);
    let history = [Cell::new(0, 0), Cell::new(1, 0)];
    let next = PlacementPlanner::find_next_chain_cell(&grid, &history, Cell::new(1, 0), WALL, StructureType::Wall);
    assert_eq!(next, Cell::new(2, 0));
}

#[test]
fn blocked_chain_turns_perpendicular() {
    let grid = grid_with(vec![wall("a", 0, 0), wall("b", 1, 0), wall("blocker", 2, 0)]);
    let history = [Cell::new(0, 0), Cell::new(1, 0)];
    let next = PlacementPlanner::find_next_chain_cell(&grid, &history, Cell::new(1, 0), WALL, StructureType::Wall);
    assert_eq!(next, Cell::new(1, 1));
}

#[test]
fn vertical_chain_turns_along_x() {
    let grid = grid_with(vec![wall("a", 5, 5), wall("b", 5, 6), wall("blocker", 5, 7)]);
    let history = [Cell::new(5, 5), Cell::new(5, 6)];
    let next = PlacementPlanner::find_next_chain_cell(&grid, &history, Cell::new(5, 6), WALL, StructureType::Wall);
    assert_eq!(next, Cell::new(6, 6));
}

#[test]
fn short_chain_mirrors_off_a_neighbouring_wall() {
    let grid = grid_with(vec![wall("a", 5, 5), wall("b", 6, 5)]);
    let next = PlacementPlanner::find_next_chain_cell(&grid, &[Cell::new(5, 5)], Cell::new(5, 5), WALL, StructureType::Wall);
    assert_eq!(next, Cell::new(4, 5), "neighbour on the right suggests the left");
}

#[test]
fn mirror_ignores_other_structure_types() {
    let mut grid = grid_with(vec![wall("a", 5, 5)]);
    grid.add(StructureInstance::planned("hut".into(), StructureType::BuilderHut, Cell::new(6, 4)))
        .unwrap();
    let next = PlacementPlanner::find_next_chain_cell(&grid, &[Cell::new(5, 5)], Cell::new(5, 5), WALL, StructureType::Wall);
    assert_eq!(next, Cell::new(6, 5), "falls through to the unchecked default");
}

#[test]
fn exhausted_chain_falls_back_unchecked() {
    let grid = grid_with(vec![wall("edge", 11, 0)]);
    let next = PlacementPlanner::find_next_chain_cell(&grid, &[Cell::new(11, 0)], Cell::new(11, 0), WALL, StructureType::Wall);
    assert_eq!(next, Cell::new(12, 0));
    assert!(!grid.can_place(next, WALL), "fallback is only a hint");
}

#[test]
fn auto_walls_form_a_contiguous_line() {
    let mut grid = GridStore::new(12, 12);
    let mut planner = PlacementPlanner::new();

    let cells: Vec<Cell> = (0..4)
        .map(|_| planner.place(&mut grid, StructureType::Wall, PlacementTarget::Auto).unwrap().cell)
        .collect();
    assert_eq!(cells, vec![Cell::new(0, 0), Cell::new(1, 0), Cell::new(2, 0), Cell::new(3, 0)]);
    assert_eq!(planner.chain(StructureType::Wall), cells.as_slice());

    planner.reset_chain(StructureType::Wall);
    assert!(planner.chain(StructureType::Wall).is_empty());
}

#[test]
fn invalid_chain_hint_falls_back_to_the_scan() {
    let mut grid = GridStore::new(3, 3);
    let mut planner = PlacementPlanner::new();
    for _ in 0..3 {
        planner.place(&mut grid, StructureType::Wall, PlacementTarget::Auto).unwrap();
    }
    // Row 0 is full and the chain has hit the edge; the next wall must still land.
    let next = planner.place(&mut grid, StructureType::Wall, PlacementTarget::Auto).unwrap();
    assert!(grid.get(&next.id).is_some());
    assert!(grid.verify());
}

// ── Placement ────────────────────────────────────────────────────────

#[test]
fn auto_placement_scans_row_major() {
    let mut grid = GridStore::new(12, 12);
    let mut planner = PlacementPlanner::new();
    let hall = planner.place(&mut grid, StructureType::TownHall, PlacementTarget::Auto).unwrap();
    let tower = planner.place(&mut grid, StructureType::ArcherTower, PlacementTarget::Auto).unwrap();
    assert_eq!(hall.cell, Cell::new(0, 0));
    assert_eq!(tower.cell, Cell::new(4, 0));
    assert_eq!(tower.level, 1);
    assert!(tower.construction_in_progress());
}

#[test]
fn explicit_placement_reports_why_it_failed() {
    let mut grid = GridStore::new(12, 12);
    let mut planner = PlacementPlanner::new();
    let tower = planner
        .place(&mut grid, StructureType::ArcherTower, PlacementTarget::At(Cell::new(0, 0)))
        .unwrap();

    let err = planner
        .place(&mut grid, StructureType::Cannon, PlacementTarget::At(Cell::new(2, 2)))
        .unwrap_err();
    match err {
        CoreError::Placement(PlacementError::Occupied { cell, by }) => {
            assert_eq!(cell, Cell::new(2, 2));
            assert_eq!(by, tower.id);
        }
        other => panic!("expected Occupied, got {other:?}"),
    }

    let err = planner
        .place(&mut grid, StructureType::Cannon, PlacementTarget::At(Cell::new(10, 10)))
        .unwrap_err();
    assert_eq!(err.reason_code(), "out_of_bounds");
    let err = planner
        .place(&mut grid, StructureType::Wall, PlacementTarget::At(Cell::new(-1, 3)))
        .unwrap_err();
    assert_eq!(err.reason_code(), "out_of_bounds");

    assert_eq!(grid.len(), 1, "failed placements must not register anything");
    assert_eq!(grid.occupied_cell_count(), 9);
}

#[test]
fn full_grid_reports_no_free_cell() {
    let mut grid = GridStore::new(4, 4);
    let mut planner = PlacementPlanner::new();
    planner.place(&mut grid, StructureType::TownHall, PlacementTarget::Auto).unwrap();
    let err = planner.place(&mut grid, StructureType::Wall, PlacementTarget::Auto).unwrap_err();
    assert!(matches!(err, CoreError::Placement(PlacementError::NoFreeCell)));
    assert_eq!(err.reason_code(), "grid_full");
}

// ── Grid store ───────────────────────────────────────────────────────

#[test]
fn moves_may_overlap_their_own_cells_only() {
    let mut grid = grid_with(vec![
        StructureInstance::planned("cannon".into(), StructureType::Cannon, Cell::new(0, 0)),
        StructureInstance::planned("mortar".into(), StructureType::Mortar, Cell::new(6, 0)),
    ]);

    grid.move_structure("cannon", Cell::new(1, 0)).expect("shift by one overlaps itself");
    assert_eq!(grid.occupant(Cell::new(3, 2)).map(|s| s.id.as_str()), Some("cannon"));
    assert!(grid.occupant(Cell::new(0, 0)).is_none());

    let err = grid.move_structure("cannon", Cell::new(4, 0)).unwrap_err();
    assert_eq!(err.reason_code(), "occupied");
    assert_eq!(grid.get("cannon").unwrap().cell, Cell::new(1, 0), "failed move left it in place");
    assert!(grid.verify());

    assert_eq!(grid.move_structure("ghost", Cell::new(0, 0)).unwrap_err().reason_code(), "structure_not_found");
}

#[test]
fn remove_frees_every_cell() {
    let mut grid = grid_with(vec![StructureInstance::planned("hall".into(), StructureType::TownHall, Cell::new(2, 2))]);
    assert_eq!(grid.occupied_cell_count(), 16);
    let removed = grid.remove("hall").expect("present");
    assert_eq!(removed.structure_type, StructureType::TownHall);
    assert_eq!(grid.occupied_cell_count(), 0);
    assert!(grid.can_place(Cell::new(2, 2), Footprint::new(4, 4)));
    assert!(grid.remove("hall").is_none());
}

#[test]
fn duplicate_ids_are_refused() {
    let mut grid = grid_with(vec![wall("w", 0, 0)]);
    let err = grid.add(wall("w", 5, 5)).unwrap_err();
    assert_eq!(err.reason_code(), "invalid_transition");
    assert_eq!(grid.len(), 1);
}

#[test]
fn deserializing_rebuilds_and_checks_the_index() {
    let grid = grid_with(vec![wall("a", 0, 0), wall("b", 1, 0)]);
    let json = serde_json::to_string(&grid).unwrap();
    let restored: GridStore = serde_json::from_str(&json).unwrap();
    assert!(restored.verify());
    assert_eq!(restored.occupant(Cell::new(1, 0)).map(|s| s.id.as_str()), Some("b"));

    let overlapping = json.replace("\"x\":1", "\"x\":0");
    assert!(serde_json::from_str::<GridStore>(&overlapping).is_err(), "overlapping record accepted");
}

// ── Fuzz ─────────────────────────────────────────────────────────────

#[test]
fn random_placements_and_removals_never_overlap() {
    let mut rng = ScenarioRng::new(0x5EED_0F_F00D);
    let mut grid = GridStore::new(20, 20);
    let mut planner = PlacementPlanner::new();

    for step in 0..3_000 {
        let roll = rng.next_f64();
        if roll < 0.65 {
            let structure_type = *rng.pick(&StructureType::ALL).unwrap();
            let target = if rng.chance(0.5) {
                PlacementTarget::Auto
            } else {
                PlacementTarget::At(Cell::new(rng.between(0, 21) as i32 - 1, rng.between(0, 21) as i32 - 1))
            };
            let _ = planner.place(&mut grid, structure_type, target);
        } else if roll < 0.9 {
            let mut ids: Vec<(Cell, String)> = grid.instances().map(|s| (s.cell, s.id.clone())).collect();
            ids.sort();
            if let Some((_, id)) = rng.pick(&ids) {
                grid.remove(id);
            }
        } else {
            let ids: Vec<String> = grid.instances().map(|s| s.id.clone()).collect();
            if let Some(id) = ids.first() {
                let _ = grid.move_structure(id, Cell::new(rng.between(0, 19) as i32, rng.between(0, 19) as i32));
            }
        }

        assert!(grid.verify(), "index inconsistent after step {step}");
        let covered: usize = grid.instances().map(|s| (s.footprint.rows * s.footprint.cols) as usize).sum();
        assert_eq!(covered, grid.occupied_cell_count(), "footprints overlap after step {step}");
    }
}
