//! Bounded grid and the spatial occupancy index.
//!
//! Every entity covers the `size × size` block of cells anchored at its
//! origin (top-left). The [`Board`] owns the entities and keeps, for each
//! cell, the identities of everything covering it. The two views are kept
//! in lockstep on every place, remove and relocate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind, Unit};
use crate::error::{GameError, Result};
use crate::ids::EntityId;

/// Integer grid coordinate.
///
/// Also used for relative offsets (locomotor targets).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Coord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Coord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Coordinate shifted by `(dx, dy)`.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Component-wise sum, for applying a relative offset.
    #[must_use]
    pub const fn plus(self, other: Self) -> Self {
        self.offset(other.x, other.y)
    }

    /// Component-wise difference.
    #[must_use]
    pub const fn minus(self, other: Self) -> Self {
        self.offset(-other.x, -other.y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// All cells of the `size × size` footprint anchored at `origin`, row by row.
pub fn footprint(origin: Coord, size: i32) -> impl Iterator<Item = Coord> {
    (0..size).flat_map(move |dy| (0..size).map(move |dx| origin.offset(dx, dy)))
}

/// Whether two square footprints share at least one cell.
#[must_use]
pub fn footprints_overlap(a: Coord, a_size: i32, b: Coord, b_size: i32) -> bool {
    a.x < b.x + b_size && b.x < a.x + a_size && a.y < b.y + b_size && b.y < a.y + a_size
}

/// Board dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    /// Width in cells.
    pub width: i32,
    /// Height in cells.
    pub height: i32,
}

impl Bounds {
    /// Create new bounds.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Check if a single cell lies inside the board.
    #[must_use]
    pub const fn contains(&self, coord: Coord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.height
    }

    /// Check if a whole footprint lies inside the board.
    #[must_use]
    pub const fn contains_footprint(&self, origin: Coord, size: i32) -> bool {
        size > 0
            && origin.x >= 0
            && origin.y >= 0
            && origin.x + size <= self.width
            && origin.y + size <= self.height
    }
}

/// The spatial model: entity storage plus a cell → occupants index.
///
/// Uses ordered maps so iteration is deterministic on every client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    bounds: Bounds,
    entities: BTreeMap<EntityId, Entity>,
    cells: BTreeMap<Coord, Vec<EntityId>>,
}

impl Board {
    /// Create an empty board.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is not positive.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0, "Board width must be positive");
        assert!(height > 0, "Board height must be positive");
        Self {
            bounds: Bounds::new(width, height),
            entities: BTreeMap::new(),
            cells: BTreeMap::new(),
        }
    }

    /// Board dimensions.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Add an entity to every cell of its footprint.
    ///
    /// Overlap is allowed here; resource piles share cells with units and
    /// movement resolves unit overlaps itself. Use
    /// [`place_exclusive`](Self::place_exclusive) to refuse overlaps.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::OutOfBounds`] if the footprint leaves the board
    /// and [`GameError::DuplicateEntity`] if the identity is already placed.
    pub fn place(&mut self, entity: Entity) -> Result<EntityId> {
        if !self.bounds.contains_footprint(entity.origin, entity.size) {
            return Err(GameError::OutOfBounds {
                origin: entity.origin,
                size: entity.size,
            });
        }
        if self.entities.contains_key(&entity.id) {
            return Err(GameError::DuplicateEntity(entity.id));
        }
        let id = entity.id;
        self.index(id, entity.origin, entity.size);
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Place an entity, refusing to cover any cell held by a unit or wall.
    ///
    /// Resource piles only ever conflict with other resource piles being
    /// placed on top of them; units may stand on piles.
    ///
    /// # Errors
    ///
    /// Same as [`place`](Self::place), plus [`GameError::Overlap`].
    pub fn place_exclusive(&mut self, entity: Entity) -> Result<EntityId> {
        if let Some(occupant) = self.blocker_in(entity.origin, entity.size, None) {
            return Err(GameError::Overlap {
                origin: entity.origin,
                size: entity.size,
                occupant,
            });
        }
        self.place(entity)
    }

    /// Remove an entity from the board and every cell it covers.
    ///
    /// Returns `None` if no entity has this identity.
    ///
    /// # Panics
    ///
    /// Panics if a cell of the entity's footprint does not list it. That
    /// means the index has drifted from the entities, which is a bug.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.unindex(id, entity.origin, entity.size);
        Some(entity)
    }

    /// Move an entity to a new origin, keeping the index consistent.
    ///
    /// No collision or bounds checks: callers validate destinations.
    ///
    /// # Panics
    ///
    /// Panics if the index has lost track of the entity, as in
    /// [`remove`](Self::remove).
    pub fn relocate(&mut self, id: EntityId, origin: Coord) -> Result<()> {
        let (old_origin, size) = {
            let entity = self
                .entities
                .get(&id)
                .ok_or(GameError::EntityNotFound(id))?;
            (entity.origin, entity.size)
        };
        self.unindex(id, old_origin, size);
        self.index(id, origin, size);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.origin = origin;
        }
        Ok(())
    }

    fn index(&mut self, id: EntityId, origin: Coord, size: i32) {
        for cell in footprint(origin, size) {
            self.cells.entry(cell).or_default().push(id);
        }
    }

    fn unindex(&mut self, id: EntityId, origin: Coord, size: i32) {
        for cell in footprint(origin, size) {
            let occupants = self.cells.get_mut(&cell);
            let position = occupants
                .as_ref()
                .and_then(|list| list.iter().position(|&other| other == id));
            match (occupants, position) {
                (Some(list), Some(index)) => {
                    list.remove(index);
                    if list.is_empty() {
                        self.cells.remove(&cell);
                    }
                }
                _ => panic!("spatial index lost {id}: expected it at {cell}"),
            }
        }
    }

    /// Every identity covering a cell, in placement order.
    #[must_use]
    pub fn occupants(&self, cell: Coord) -> &[EntityId] {
        self.cells.get(&cell).map_or(&[], Vec::as_slice)
    }

    /// Occupants of a cell that are not resource piles.
    pub fn solid_occupants(&self, cell: Coord) -> impl Iterator<Item = EntityId> + '_ {
        self.occupants(cell)
            .iter()
            .copied()
            .filter(|id| self.entities.get(id).is_some_and(|e| !e.is_resource_pile()))
    }

    /// The single unit or wall on a cell, if any.
    ///
    /// # Panics
    ///
    /// Panics if two units or walls share the cell. Movement resolution
    /// guarantees this never happens between turns.
    #[must_use]
    pub fn occupant_at(&self, cell: Coord) -> Option<EntityId> {
        let mut solid = self.solid_occupants(cell);
        let first = solid.next();
        if let (Some(first), Some(second)) = (first, solid.next()) {
            panic!("cell {cell} holds more than one solid occupant: {first} and {second}");
        }
        first
    }

    /// First unit or wall covering any cell of a footprint, ignoring `except`.
    #[must_use]
    pub fn blocker_in(&self, origin: Coord, size: i32, except: Option<EntityId>) -> Option<EntityId> {
        footprint(origin, size).find_map(|cell| {
            self.solid_occupants(cell)
                .find(|&occupant| Some(occupant) != except)
        })
    }

    /// Cells currently held by more than one unit or wall, in order.
    #[must_use]
    pub fn contested_cells(&self) -> Vec<Coord> {
        self.cells
            .keys()
            .copied()
            .filter(|&cell| self.solid_occupants(cell).nth(1).is_some())
            .collect()
    }

    /// Panic unless every cell holds at most one unit or wall.
    ///
    /// # Panics
    ///
    /// See [`occupant_at`](Self::occupant_at).
    pub fn assert_exclusive(&self) {
        for cell in self.cells.keys() {
            let _ = self.occupant_at(*cell);
        }
    }

    /// Cells whose occupant list contains `id`, in order.
    #[must_use]
    pub fn cells_of(&self, id: EntityId) -> Vec<Coord> {
        self.cells
            .iter()
            .filter(|(_, occupants)| occupants.contains(&id))
            .map(|(cell, _)| *cell)
            .collect()
    }

    /// Get an entity by identity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity.
    ///
    /// Position must be changed through [`relocate`](Self::relocate), never
    /// by writing `origin` directly.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Get a unit by identity.
    #[must_use]
    pub fn unit(&self, id: EntityId) -> Option<&Unit> {
        self.entities.get(&id).and_then(Entity::as_unit)
    }

    /// Get a mutable unit by identity.
    pub fn unit_mut(&mut self, id: EntityId) -> Option<&mut Unit> {
        self.entities.get_mut(&id).and_then(Entity::as_unit_mut)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the board is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in identity order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Identities of every unit, sorted.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|entity| matches!(entity.kind, EntityKind::Unit(_)))
            .map(|entity| entity.id)
            .collect()
    }

    /// Mutable iteration over all units in identity order.
    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.entities.values_mut().filter_map(Entity::as_unit_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ResourcePile;
    use crate::math::fixed;

    fn wall(id: u64, x: i32, y: i32, size: i32) -> Entity {
        Entity::wall(EntityId(id), Coord::new(x, y), size)
    }

    fn pile(id: u64, x: i32, y: i32) -> Entity {
        Entity::resource_pile(EntityId(id), Coord::new(x, y), ResourcePile::new(fixed(10)))
    }

    #[test]
    fn test_footprint_cells() {
        let cells: Vec<_> = footprint(Coord::new(2, 3), 2).collect();
        assert_eq!(
            cells,
            vec![
                Coord::new(2, 3),
                Coord::new(3, 3),
                Coord::new(2, 4),
                Coord::new(3, 4)
            ]
        );
    }

    #[test]
    fn test_place_indexes_whole_footprint() {
        let mut board = Board::new(10, 10);
        board.place(wall(1, 4, 4, 3)).unwrap();

        let cells = board.cells_of(EntityId(1));
        let expected: Vec<_> = footprint(Coord::new(4, 4), 3).collect();
        assert_eq!(cells.len(), 9);
        for cell in expected {
            assert!(cells.contains(&cell));
            assert_eq!(board.occupant_at(cell), Some(EntityId(1)));
        }
        assert_eq!(board.occupant_at(Coord::new(7, 4)), None);
    }

    #[test]
    fn test_remove_clears_every_cell() {
        let mut board = Board::new(10, 10);
        board.place(wall(1, 0, 0, 2)).unwrap();
        let removed = board.remove(EntityId(1)).unwrap();
        assert_eq!(removed.id, EntityId(1));
        assert!(board.cells_of(EntityId(1)).is_empty());
        assert!(board.remove(EntityId(1)).is_none());
    }

    #[test]
    fn test_place_rejects_out_of_bounds() {
        let mut board = Board::new(5, 5);
        assert!(matches!(
            board.place(wall(1, 4, 4, 2)),
            Err(GameError::OutOfBounds { .. })
        ));
        assert!(matches!(
            board.place(wall(2, -1, 0, 1)),
            Err(GameError::OutOfBounds { .. })
        ));
        assert!(board.is_empty());
    }

    #[test]
    fn test_place_rejects_duplicate_identity() {
        let mut board = Board::new(5, 5);
        board.place(wall(1, 0, 0, 1)).unwrap();
        assert!(matches!(
            board.place(wall(1, 3, 3, 1)),
            Err(GameError::DuplicateEntity(_))
        ));
    }

    #[test]
    fn test_place_exclusive_ignores_piles() {
        let mut board = Board::new(5, 5);
        board.place(pile(1, 1, 1)).unwrap();
        assert!(board.place_exclusive(wall(2, 1, 1, 1)).is_ok());
        assert_eq!(board.occupant_at(Coord::new(1, 1)), Some(EntityId(2)));
        assert!(matches!(
            board.place_exclusive(wall(3, 0, 0, 2)),
            Err(GameError::Overlap { .. })
        ));
    }

    #[test]
    fn test_relocate_moves_index() {
        let mut board = Board::new(10, 10);
        board.place(wall(1, 0, 0, 2)).unwrap();
        board.relocate(EntityId(1), Coord::new(5, 5)).unwrap();
        assert_eq!(board.occupant_at(Coord::new(0, 0)), None);
        assert_eq!(board.occupant_at(Coord::new(6, 6)), Some(EntityId(1)));
        assert_eq!(board.get(EntityId(1)).unwrap().origin, Coord::new(5, 5));
    }

    #[test]
    fn test_contested_cells_reports_overlaps() {
        let mut board = Board::new(10, 10);
        board.place(wall(1, 0, 0, 2)).unwrap();
        board.place(wall(2, 1, 1, 2)).unwrap();
        board.place(pile(3, 5, 5)).unwrap();
        board.place(wall(4, 5, 5, 1)).unwrap();
        assert_eq!(board.contested_cells(), vec![Coord::new(1, 1)]);
    }

    #[test]
    #[should_panic(expected = "more than one solid occupant")]
    fn test_occupant_at_panics_on_shared_cell() {
        let mut board = Board::new(10, 10);
        board.place(wall(1, 0, 0, 1)).unwrap();
        board.place(wall(2, 0, 0, 1)).unwrap();
        let _ = board.occupant_at(Coord::new(0, 0));
    }

    #[test]
    fn test_bounds_footprint() {
        let bounds = Bounds::new(10, 8);
        assert!(bounds.contains_footprint(Coord::new(8, 6), 2));
        assert!(!bounds.contains_footprint(Coord::new(9, 6), 2));
        assert!(!bounds.contains_footprint(Coord::new(0, 0), 0));
        assert!(footprints_overlap(Coord::new(0, 0), 2, Coord::new(1, 1), 2));
        assert!(!footprints_overlap(Coord::new(0, 0), 2, Coord::new(2, 0), 2));
    }
}
