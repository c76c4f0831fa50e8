//! Movement and targeting patterns.
//!
//! A shape turns an origin, a part size and the acting unit's footprint
//! size into directional paths of reachable coordinates. A coordinate is
//! reachable after `n` steps only if the unit's whole footprint would fit
//! on the board there; a path stops at the first step that does not fit.

use serde::{Deserialize, Serialize};

use crate::grid::{footprint, Bounds, Coord};

/// Path steps granted per point of part size.
pub const REACH_PER_SIZE: i32 = 2;

const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const EIGHT_WAY: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];
const KNIGHT: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// Ordered list of directional paths.
///
/// Path `i` always corresponds to direction `i` of the shape, even when it
/// is empty, so an index chosen by a player stays meaningful.
pub type Paths = Vec<Vec<Coord>>;

/// Movement/targeting pattern of a locomotor or armament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Diagonal lines.
    Bishop,
    /// Orthogonal lines.
    Rook,
    /// Repeated L-shaped jumps.
    Knight,
    /// All eight directions; blasts flood the surrounding ring.
    King,
    /// Orthogonal and diagonal lines.
    Queen,
}

impl ShapeKind {
    /// Step vectors for this shape.
    #[must_use]
    pub fn directions(self) -> &'static [(i32, i32)] {
        match self {
            Self::Bishop => &DIAGONAL,
            Self::Rook => &ORTHOGONAL,
            Self::Knight => &KNIGHT,
            Self::King | Self::Queen => &EIGHT_WAY,
        }
    }

    /// Maximum number of steps along one path for a part of `part_size`.
    #[must_use]
    pub const fn reach(self, part_size: i32) -> i32 {
        part_size * REACH_PER_SIZE
    }

    /// Whether blasts use a single flood set instead of directional paths.
    #[must_use]
    pub const fn has_flood_blast(self) -> bool {
        matches!(self, Self::King)
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Knight => "knight",
            Self::King => "king",
            Self::Queen => "queen",
        }
    }

    /// Directional paths a unit at `origin` can move along.
    #[must_use]
    pub fn move_paths(self, bounds: Bounds, origin: Coord, part_size: i32, unit_size: i32) -> Paths {
        let reach = self.reach(part_size);
        self.directions()
            .iter()
            .map(|&(dx, dy)| {
                (1..=reach)
                    .map(|step| origin.offset(dx * step, dy * step))
                    .take_while(|&coord| bounds.contains_footprint(coord, unit_size))
                    .collect()
            })
            .collect()
    }

    /// Paths an armament blast can travel along.
    ///
    /// Equal to [`move_paths`](Self::move_paths) except for King. Each
    /// directional step is where the unit's footprint would sit, and the
    /// blast covers that whole block. King returns one flood set: every cell within `part_size` of the unit's
    /// footprint, excluding the footprint itself and clipped to the board.
    #[must_use]
    pub fn blast_paths(self, bounds: Bounds, origin: Coord, part_size: i32, unit_size: i32) -> Paths {
        if !self.has_flood_blast() {
            return self.move_paths(bounds, origin, part_size, unit_size);
        }
        let ring = footprint(
            origin.offset(-part_size, -part_size),
            unit_size + 2 * part_size,
        )
        .filter(|&cell| bounds.contains(cell))
        .filter(|&cell| {
            let inside_x = cell.x >= origin.x && cell.x < origin.x + unit_size;
            let inside_y = cell.y >= origin.y && cell.y < origin.y + unit_size;
            !(inside_x && inside_y)
        })
        .collect();
        vec![ring]
    }

    /// Number of steps needed to reach `origin + offset`, if any path does.
    #[must_use]
    pub fn steps_to(
        self,
        bounds: Bounds,
        origin: Coord,
        part_size: i32,
        unit_size: i32,
        offset: Coord,
    ) -> Option<i32> {
        let target = origin.plus(offset);
        self.move_paths(bounds, origin, part_size, unit_size)
            .iter()
            .find_map(|path| path.iter().position(|&coord| coord == target))
            .map(|index| index as i32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Bounds = Bounds::new(30, 30);

    #[test]
    fn test_rook_paths_have_full_reach_in_open_board() {
        let paths = ShapeKind::Rook.move_paths(BOUNDS, Coord::new(10, 10), 1, 1);
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0], vec![Coord::new(11, 10), Coord::new(12, 10)]);
        assert_eq!(paths[1], vec![Coord::new(9, 10), Coord::new(8, 10)]);
    }

    #[test]
    fn test_paths_clip_at_board_edge_for_whole_footprint() {
        // A 3x3 unit at x=25 can move right only while x + 3 <= 30.
        let paths = ShapeKind::Rook.move_paths(BOUNDS, Coord::new(25, 10), 3, 3);
        assert_eq!(paths[0], vec![Coord::new(26, 10), Coord::new(27, 10)]);
        // Left has the full reach of 6.
        assert_eq!(paths[1].len(), 6);
    }

    #[test]
    fn test_empty_paths_keep_their_index() {
        let paths = ShapeKind::Bishop.move_paths(BOUNDS, Coord::new(0, 0), 1, 1);
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0], vec![Coord::new(1, 1), Coord::new(2, 2)]);
        assert!(paths[1].is_empty());
        assert!(paths[2].is_empty());
        assert!(paths[3].is_empty());
    }

    #[test]
    fn test_knight_jumps() {
        let paths = ShapeKind::Knight.move_paths(BOUNDS, Coord::new(10, 10), 1, 1);
        assert_eq!(paths.len(), 8);
        assert_eq!(paths[0], vec![Coord::new(11, 12), Coord::new(12, 14)]);
    }

    #[test]
    fn test_every_shape_reaches_twice_part_size() {
        let paths = ShapeKind::King.move_paths(BOUNDS, Coord::new(10, 10), 2, 1);
        assert!(paths.iter().all(|path| path.len() == 4));
        let queen = ShapeKind::Queen.move_paths(BOUNDS, Coord::new(10, 10), 2, 1);
        assert!(queen.iter().all(|path| path.len() == 4));
    }

    #[test]
    fn test_king_blast_is_ring_around_footprint() {
        let paths = ShapeKind::King.blast_paths(BOUNDS, Coord::new(10, 10), 1, 2);
        assert_eq!(paths.len(), 1);
        let ring = &paths[0];
        // 4x4 block minus the 2x2 footprint
        assert_eq!(ring.len(), 12);
        assert!(!ring.contains(&Coord::new(10, 10)));
        assert!(!ring.contains(&Coord::new(11, 11)));
        assert!(ring.contains(&Coord::new(9, 9)));
        assert!(ring.contains(&Coord::new(12, 12)));
    }

    #[test]
    fn test_king_blast_clips_to_board() {
        let paths = ShapeKind::King.blast_paths(BOUNDS, Coord::new(0, 0), 1, 1);
        assert_eq!(paths[0].len(), 3);
    }

    #[test]
    fn test_directional_blast_matches_move_paths() {
        let origin = Coord::new(5, 5);
        assert_eq!(
            ShapeKind::Queen.blast_paths(BOUNDS, origin, 1, 1),
            ShapeKind::Queen.move_paths(BOUNDS, origin, 1, 1)
        );
    }

    #[test]
    fn test_steps_to() {
        let origin = Coord::new(5, 5);
        assert_eq!(
            ShapeKind::Rook.steps_to(BOUNDS, origin, 1, 1, Coord::new(2, 0)),
            Some(2)
        );
        assert_eq!(
            ShapeKind::Rook.steps_to(BOUNDS, origin, 1, 1, Coord::new(3, 0)),
            None
        );
        assert_eq!(
            ShapeKind::Rook.steps_to(BOUNDS, origin, 1, 1, Coord::new(1, 1)),
            None
        );
    }
}
