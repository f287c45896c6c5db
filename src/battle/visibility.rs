//! Line of sight between sectors
//!
//! Sight is traced along a straight line between two sectors. It is blocked
//! by two or more consecutive forest or settlement sectors, by a chateau or
//! a wall in between, or by ground in between that rises above both ends.
//! Results are cached per sector pair until the terrain changes.

use ahash::AHashMap;

use crate::battle::battle_map::BattleMap;
use crate::battle::geometry::Position;

/// Opaque sectors in a row that hide what lies beyond
pub const OPAQUE_RUN_LIMIT: usize = 2;

/// Can a unit in `a` see a unit in `b`?
///
/// Symmetric: the line is always traced from the smaller position.
pub fn line_of_sight(map: &BattleMap, a: Position, b: Position) -> bool {
    if a == b || a.is_adjacent(&b) {
        return true;
    }

    let (from, to) = if a <= b { (a, b) } else { (b, a) };
    let path = from.line_to(&to);
    let eye_level = map.altitude(from).max(map.altitude(to));
    let last = path.len() - 1;

    let mut opaque_run = 0;
    for (i, pos) in path.iter().enumerate() {
        let Some(sector) = map.get(*pos) else {
            return false;
        };

        if sector.is_opaque() {
            opaque_run += 1;
            if opaque_run >= OPAQUE_RUN_LIMIT {
                return false;
            }
        } else {
            opaque_run = 0;
        }

        let intermediate = i != 0 && i != last;
        if intermediate && (sector.blocks_sight() || sector.altitude > eye_level) {
            return false;
        }
    }
    true
}

/// Lazily filled line-of-sight cache
///
/// Brigade positions do not affect sight, so the cache only has to be
/// cleared when terrain changes (walls battered down, for instance).
#[derive(Debug, Clone, Default)]
pub struct VisibilityProcessor {
    cache: AHashMap<(Position, Position), bool>,
}

impl VisibilityProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible(&mut self, map: &BattleMap, a: Position, b: Position) -> bool {
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(&seen) = self.cache.get(&key) {
            return seen;
        }
        let seen = line_of_sight(map, a, b);
        self.cache.insert(key, seen);
        seen
    }

    /// Forget cached results after a terrain change
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    pub fn cached_pairs(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::terrain::Settlement;

    #[test]
    fn test_open_ground_visible() {
        let map = BattleMap::new(20, 20);
        assert!(line_of_sight(&map, Position::new(2, 2), Position::new(15, 9)));
    }

    #[test]
    fn test_single_forest_does_not_block() {
        let mut map = BattleMap::new(20, 20);
        map.set_forest(Position::new(5, 5));
        assert!(line_of_sight(&map, Position::new(3, 5), Position::new(7, 5)));
    }

    #[test]
    fn test_two_forest_sectors_block() {
        let mut map = BattleMap::new(20, 20);
        map.set_forest(Position::new(5, 5));
        map.set_forest(Position::new(6, 5));
        assert!(!line_of_sight(&map, Position::new(3, 5), Position::new(8, 5)));
    }

    #[test]
    fn test_village_counts_as_opaque() {
        let mut map = BattleMap::new(20, 20);
        map.set_settlement(Position::new(5, 5), Settlement::Village(1));
        map.set_forest(Position::new(6, 5));
        assert!(!line_of_sight(&map, Position::new(3, 5), Position::new(8, 5)));
    }

    #[test]
    fn test_unit_deep_in_forest_is_hidden() {
        let mut map = BattleMap::new(20, 20);
        map.set_forest(Position::new(5, 5));
        map.set_forest(Position::new(6, 5));
        // Standing in the forest edge with forest behind: hidden from the far side
        assert!(!line_of_sight(&map, Position::new(5, 5), Position::new(9, 5)));
        // A unit at the edge still sees out into the open
        assert!(line_of_sight(&map, Position::new(6, 5), Position::new(9, 5)));
    }

    #[test]
    fn test_chateau_blocks() {
        let mut map = BattleMap::new(20, 20);
        map.get_mut(Position::new(5, 5)).unwrap().chateau = true;
        assert!(!line_of_sight(&map, Position::new(3, 5), Position::new(7, 5)));
    }

    #[test]
    fn test_wall_blocks() {
        let mut map = BattleMap::new(20, 20);
        map.set_wall(Position::new(5, 5), 100);
        assert!(!line_of_sight(&map, Position::new(3, 3), Position::new(7, 7)));
    }

    #[test]
    fn test_higher_ground_between_blocks() {
        let mut map = BattleMap::new(20, 20);
        // One tier above both ends is enough
        map.set_altitude(Position::new(5, 5), 1);
        assert!(!line_of_sight(&map, Position::new(3, 5), Position::new(7, 5)));

        // Level with the higher end it no longer hides anything
        map.set_altitude(Position::new(3, 5), 1);
        assert!(line_of_sight(&map, Position::new(3, 5), Position::new(7, 5)));
    }

    #[test]
    fn test_hill_visible_from_hill() {
        let mut map = BattleMap::new(20, 20);
        map.set_altitude(Position::new(3, 5), 2);
        map.set_altitude(Position::new(5, 5), 2);
        assert!(line_of_sight(&map, Position::new(3, 5), Position::new(7, 5)));
    }

    #[test]
    fn test_adjacent_always_visible() {
        let mut map = BattleMap::new(20, 20);
        map.set_forest(Position::new(5, 5));
        map.set_forest(Position::new(6, 6));
        assert!(line_of_sight(&map, Position::new(5, 5), Position::new(6, 6)));
    }

    #[test]
    fn test_visibility_symmetric() {
        let mut map = BattleMap::new(20, 20);
        map.set_forest(Position::new(6, 4));
        map.set_forest(Position::new(7, 4));
        map.set_altitude(Position::new(9, 6), 3);
        let points = [
            Position::new(2, 1),
            Position::new(11, 7),
            Position::new(8, 2),
            Position::new(4, 9),
            Position::new(13, 3),
        ];
        for a in points {
            for b in points {
                assert_eq!(line_of_sight(&map, a, b), line_of_sight(&map, b, a));
            }
        }
    }

    #[test]
    fn test_cache_invalidation() {
        let mut map = BattleMap::new(20, 20);
        map.set_wall(Position::new(5, 5), 100);
        let mut processor = VisibilityProcessor::new();
        assert!(!processor.visible(&map, Position::new(3, 5), Position::new(7, 5)));
        assert_eq!(processor.cached_pairs(), 1);

        map.get_mut(Position::new(5, 5)).unwrap().wall = None;
        // Stale until invalidated
        assert!(!processor.visible(&map, Position::new(7, 5), Position::new(3, 5)));
        processor.invalidate();
        assert!(processor.visible(&map, Position::new(7, 5), Position::new(3, 5)));
    }
}
