//! A* pathfinding for battle maps
//!
//! Respects terrain costs, altitude and sectors blocked by other brigades.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashMap;

use crate::battle::battle_map::BattleMap;
use crate::battle::geometry::Position;
use crate::core::config::MovementConfig;

/// Node in the A* open set
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathNode {
    pos: Position,
    f_cost: u32,
    g_cost: u32,
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; position breaks ties so the search is deterministic
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| self.g_cost.cmp(&other.g_cost))
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What to search for
pub struct PathRequest<'a> {
    pub start: Position,
    pub goal: Position,
    /// Stop on any sector next to the goal instead of on the goal itself
    pub adjacent_to_goal: bool,
    pub mounted: bool,
    pub config: &'a MovementConfig,
    /// Sectors the brigade may not enter (occupied, for instance)
    pub blocked: &'a dyn Fn(Position) -> bool,
}

impl PathRequest<'_> {
    fn arrived(&self, pos: Position) -> bool {
        if self.adjacent_to_goal {
            pos.distance(&self.goal) <= 1
        } else {
            pos == self.goal
        }
    }

    fn heuristic(&self, pos: Position) -> u32 {
        let distance = pos.distance(&self.goal);
        let distance = if self.adjacent_to_goal {
            distance.saturating_sub(1)
        } else {
            distance
        };
        distance * self.config.road_cost.min(self.config.bridge_cost)
    }
}

/// Find path using A* algorithm
///
/// The path starts with `start` and ends on the goal (or next to it).
/// Returns None if no path exists.
pub fn find_path(map: &BattleMap, request: &PathRequest) -> Option<Vec<Position>> {
    let start = request.start;
    if request.arrived(start) {
        return Some(vec![start]);
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<Position, Position> = AHashMap::new();
    let mut g_scores: AHashMap<Position, u32> = AHashMap::new();

    g_scores.insert(start, 0);
    open_set.push(PathNode {
        pos: start,
        f_cost: request.heuristic(start),
        g_cost: 0,
    });

    while let Some(current) = open_set.pop() {
        if request.arrived(current.pos) {
            return Some(reconstruct_path(&came_from, current.pos));
        }

        let current_g = g_scores.get(&current.pos).copied().unwrap_or(u32::MAX);
        if current.g_cost > current_g {
            continue;
        }
        let from_altitude = map.altitude(current.pos);

        for neighbor in map.neighbors(current.pos) {
            if (request.blocked)(neighbor) {
                continue;
            }
            let Some(sector) = map.get(neighbor) else {
                continue;
            };
            let Some(move_cost) = sector.movement_cost(from_altitude, request.mounted, request.config)
            else {
                continue;
            };

            let tentative_g = current_g.saturating_add(move_cost);
            let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.pos);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(PathNode {
                    pos: neighbor,
                    f_cost: tentative_g + request.heuristic(neighbor),
                    g_cost: tentative_g,
                });
            }
        }
    }

    None // No path found
}

/// Reconstruct path from came_from map
fn reconstruct_path(came_from: &AHashMap<Position, Position>, mut current: Position) -> Vec<Position> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Movement points needed to walk a path (the first sector is where the walk starts)
pub fn path_cost(map: &BattleMap, path: &[Position], mounted: bool, config: &MovementConfig) -> Option<u32> {
    path.windows(2).try_fold(0u32, |total, step| {
        let cost = map
            .get(step[1])?
            .movement_cost(map.altitude(step[0]), mounted, config)?;
        Some(total + cost)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::terrain::River;

    fn request<'a>(
        start: Position,
        goal: Position,
        config: &'a MovementConfig,
        blocked: &'a dyn Fn(Position) -> bool,
    ) -> PathRequest<'a> {
        PathRequest {
            start,
            goal,
            adjacent_to_goal: false,
            mounted: false,
            config,
            blocked,
        }
    }

    #[test]
    fn test_pathfind_straight_line() {
        let map = BattleMap::new(10, 10);
        let config = MovementConfig::default();
        let free = |_: Position| false;
        let path = find_path(&map, &request(Position::new(0, 0), Position::new(5, 0), &config, &free));

        let path = path.unwrap();
        assert_eq!(path.first(), Some(&Position::new(0, 0)));
        assert_eq!(path.last(), Some(&Position::new(5, 0)));
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_pathfind_diagonal_is_short() {
        let map = BattleMap::new(10, 10);
        let config = MovementConfig::default();
        let free = |_: Position| false;
        let path = find_path(&map, &request(Position::new(0, 0), Position::new(4, 4), &config, &free)).unwrap();
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_pathfind_around_blocked() {
        let map = BattleMap::new(10, 10);
        let config = MovementConfig::default();
        let blocked = |p: Position| p == Position::new(2, 0) || p == Position::new(2, 1);
        let path = find_path(&map, &request(Position::new(0, 0), Position::new(4, 0), &config, &blocked)).unwrap();
        assert!(!path.contains(&Position::new(2, 0)));
        assert!(!path.contains(&Position::new(2, 1)));
        assert_eq!(path.last(), Some(&Position::new(4, 0)));
    }

    #[test]
    fn test_pathfind_no_path_over_major_river() {
        let mut map = BattleMap::new(10, 10);
        for x in 0..10 {
            map.get_mut(Position::new(x, 5)).unwrap().river = Some(River::Major);
        }
        let config = MovementConfig::default();
        let free = |_: Position| false;
        assert!(find_path(&map, &request(Position::new(3, 0), Position::new(3, 9), &config, &free)).is_none());

        map.get_mut(Position::new(7, 5)).unwrap().bridge = Some(1);
        let path = find_path(&map, &request(Position::new(3, 0), Position::new(3, 9), &config, &free)).unwrap();
        assert!(path.contains(&Position::new(7, 5)));
    }

    #[test]
    fn test_pathfind_finds_cheapest_crossing() {
        let mut map = BattleMap::new(10, 10);
        for x in 0..10 {
            map.set_forest(Position::new(x, 1));
        }
        map.get_mut(Position::new(5, 1)).unwrap().road = true;
        let config = MovementConfig::default();
        let free = |_: Position| false;
        let path = find_path(&map, &request(Position::new(1, 0), Position::new(1, 2), &config, &free)).unwrap();
        // The road is too far away to beat pushing straight through the wood
        let cost = path_cost(&map, &path, false, &config).unwrap();
        assert_eq!(cost, config.forest_cost + config.open_cost);
    }

    #[test]
    fn test_adjacent_goal() {
        let map = BattleMap::new(10, 10);
        let config = MovementConfig::default();
        let free = |_: Position| false;
        let mut req = request(Position::new(0, 0), Position::new(5, 5), &config, &free);
        req.adjacent_to_goal = true;
        let path = find_path(&map, &req).unwrap();
        assert_eq!(path.last().map(|p| p.distance(&Position::new(5, 5))), Some(1));
    }

    #[test]
    fn test_path_cost_sums_steps() {
        let map = BattleMap::new(10, 10);
        let config = MovementConfig::default();
        let path = vec![Position::new(0, 0), Position::new(1, 0), Position::new(2, 0)];
        assert_eq!(path_cost(&map, &path, false, &config), Some(2 * config.open_cost));
    }
}
