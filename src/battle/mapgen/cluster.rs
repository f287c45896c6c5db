//! Connected-cluster growth, the primitive behind every terrain feature
//!
//! A cluster starts from a random eligible seed sector and grows by picking
//! a random sector off its frontier until it reaches the requested size or
//! runs out of eligible ground. Growth can be confined to a rectangle.

use ahash::AHashSet;

use crate::battle::battle_map::{BattleMap, Sector};
use crate::battle::geometry::{Direction, Position, Rect};
use crate::core::random::RandomSource;

/// How many random seeds to try for placements that may not fit
pub const PLACEMENT_ATTEMPTS: u32 = 40;

/// Grows connected clusters of sectors on a map
#[derive(Debug, Clone, Copy)]
pub struct ClusterCalculator<'a> {
    map: &'a BattleMap,
}

impl<'a> ClusterCalculator<'a> {
    pub fn new(map: &'a BattleMap) -> Self {
        Self { map }
    }

    /// Eligible positions inside the region (or the whole map)
    pub fn candidates<F>(&self, region: Option<Rect>, eligible: &F) -> Vec<Position>
    where
        F: Fn(&Sector) -> bool,
    {
        let region = region.unwrap_or_else(|| self.map.bounds());
        region
            .positions()
            .filter(|p| self.map.get(*p).is_some_and(|s| eligible(s)))
            .collect()
    }

    /// Grow a cluster of up to `size` sectors from a random eligible seed
    ///
    /// Returns an empty vector when no eligible seed exists.
    pub fn grow<F>(
        &self,
        rng: &mut impl RandomSource,
        size: usize,
        region: Option<Rect>,
        eligible: F,
    ) -> Vec<Position>
    where
        F: Fn(&Sector) -> bool,
    {
        let candidates = self.candidates(region, &eligible);
        if candidates.is_empty() || size == 0 {
            return Vec::new();
        }
        let seed = candidates[rng.pick_index(candidates.len())];
        self.grow_from(rng, seed, size, region, eligible)
    }

    /// Grow a cluster of up to `size` sectors from a given seed
    pub fn grow_from<F>(
        &self,
        rng: &mut impl RandomSource,
        seed: Position,
        size: usize,
        region: Option<Rect>,
        eligible: F,
    ) -> Vec<Position>
    where
        F: Fn(&Sector) -> bool,
    {
        let region = region.unwrap_or_else(|| self.map.bounds());
        let allowed = |p: Position| {
            region.contains(p) && self.map.get(p).is_some_and(|s| eligible(s))
        };

        if !allowed(seed) || size == 0 {
            return Vec::new();
        }

        let mut cluster = vec![seed];
        let mut members: AHashSet<Position> = AHashSet::new();
        members.insert(seed);
        let mut frontier: Vec<Position> = Vec::new();
        push_frontier(&mut frontier, seed);

        while cluster.len() < size && !frontier.is_empty() {
            let pick = rng.pick_index(frontier.len());
            let candidate = frontier.swap_remove(pick);
            if members.contains(&candidate) || !allowed(candidate) {
                continue;
            }
            members.insert(candidate);
            cluster.push(candidate);
            push_frontier(&mut frontier, candidate);
        }

        cluster
    }

    /// An exact `side`×`side` block with its top-left corner at `origin`
    ///
    /// Returns `None` unless every sector of the block is eligible.
    pub fn square_at<F>(&self, origin: Position, side: u32, eligible: F) -> Option<Vec<Position>>
    where
        F: Fn(&Sector) -> bool,
    {
        if side == 0 {
            return None;
        }
        let block = Rect::new(
            origin.x,
            origin.y,
            origin.x + side as i32 - 1,
            origin.y + side as i32 - 1,
        );
        let positions: Vec<Position> = block.positions().collect();
        if positions
            .iter()
            .all(|p| self.map.get(*p).is_some_and(|s| eligible(s)))
        {
            Some(positions)
        } else {
            None
        }
    }

    /// An exact square block at a random origin inside the region
    pub fn random_square<F>(
        &self,
        rng: &mut impl RandomSource,
        side: u32,
        region: Option<Rect>,
        eligible: F,
    ) -> Option<Vec<Position>>
    where
        F: Fn(&Sector) -> bool,
    {
        let region = region.unwrap_or_else(|| self.map.bounds());
        if region.width() < side || region.height() < side {
            return None;
        }
        let max_x = region.max_x - side as i32 + 1;
        let max_y = region.max_y - side as i32 + 1;

        for _ in 0..PLACEMENT_ATTEMPTS {
            let x = rng.range_u32(region.min_x as u32, max_x as u32) as i32;
            let y = rng.range_u32(region.min_y as u32, max_y as u32) as i32;
            if let Some(block) = self.square_at(Position::new(x, y), side, &eligible) {
                return Some(block);
            }
        }
        None
    }
}

fn push_frontier(frontier: &mut Vec<Position>, pos: Position) {
    for direction in Direction::orthogonal() {
        frontier.push(pos.step(direction));
    }
}

/// The four quadrants of the map, used to spread settlements
pub fn quadrants(map: &BattleMap) -> [Rect; 4] {
    let mid_x = map.size_x as i32 / 2;
    let mid_y = map.size_y as i32 / 2;
    let max_x = map.size_x as i32 - 1;
    let max_y = map.size_y as i32 - 1;
    [
        Rect::new(0, 0, mid_x - 1, mid_y - 1),
        Rect::new(mid_x, 0, max_x, mid_y - 1),
        Rect::new(0, mid_y, mid_x - 1, max_y),
        Rect::new(mid_x, mid_y, max_x, max_y),
    ]
}

/// Is the cluster 4-connected?
pub fn is_connected(cluster: &[Position]) -> bool {
    let Some(&start) = cluster.first() else {
        return true;
    };
    let members: AHashSet<Position> = cluster.iter().copied().collect();
    let mut seen: AHashSet<Position> = AHashSet::new();
    let mut stack = vec![start];
    seen.insert(start);
    while let Some(pos) = stack.pop() {
        for direction in Direction::orthogonal() {
            let next = pos.step(direction);
            if members.contains(&next) && seen.insert(next) {
                stack.push(next);
            }
        }
    }
    seen.len() == members.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::SeededRandom;

    #[test]
    fn test_cluster_has_requested_size() {
        let map = BattleMap::new(30, 30);
        let mut rng = SeededRandom::new(11);
        let cluster = ClusterCalculator::new(&map).grow(&mut rng, 12, None, |_| true);
        assert_eq!(cluster.len(), 12);
        assert!(is_connected(&cluster));
    }

    #[test]
    fn test_cluster_positions_unique() {
        let map = BattleMap::new(30, 30);
        let mut rng = SeededRandom::new(5);
        let cluster = ClusterCalculator::new(&map).grow(&mut rng, 40, None, |_| true);
        let unique: AHashSet<Position> = cluster.iter().copied().collect();
        assert_eq!(unique.len(), cluster.len());
    }

    #[test]
    fn test_cluster_confined_to_region() {
        let map = BattleMap::new(30, 30);
        let mut rng = SeededRandom::new(3);
        let region = Rect::new(10, 10, 13, 13);
        let cluster = ClusterCalculator::new(&map).grow(&mut rng, 50, Some(region), |_| true);
        assert_eq!(cluster.len(), 16);
        assert!(cluster.iter().all(|p| region.contains(*p)));
    }

    #[test]
    fn test_cluster_skips_ineligible() {
        let mut map = BattleMap::new(10, 10);
        for y in 0..10 {
            map.set_forest(Position::new(5, y));
        }
        let mut rng = SeededRandom::new(8);
        let cluster = ClusterCalculator::new(&map).grow_from(
            &mut rng,
            Position::new(0, 0),
            100,
            None,
            |s| !s.forest,
        );
        // The forest column splits the map; growth stays on the west side
        assert_eq!(cluster.len(), 50);
        assert!(cluster.iter().all(|p| p.x < 5));
    }

    #[test]
    fn test_no_seed_no_cluster() {
        let map = BattleMap::new(10, 10);
        let mut rng = SeededRandom::new(1);
        let cluster = ClusterCalculator::new(&map).grow(&mut rng, 5, None, |_| false);
        assert!(cluster.is_empty());
    }

    #[test]
    fn test_square_block_exact() {
        let map = BattleMap::new(10, 10);
        let calc = ClusterCalculator::new(&map);
        let block = calc.square_at(Position::new(2, 3), 3, |_| true).unwrap();
        assert_eq!(block.len(), 9);
        assert!(block.contains(&Position::new(4, 5)));
        assert!(calc.square_at(Position::new(8, 8), 3, |_| true).is_none());
    }

    #[test]
    fn test_same_seed_same_cluster() {
        let map = BattleMap::new(30, 30);
        let a = ClusterCalculator::new(&map).grow(&mut SeededRandom::new(99), 20, None, |_| true);
        let b = ClusterCalculator::new(&map).grow(&mut SeededRandom::new(99), 20, None, |_| true);
        assert_eq!(a, b);
    }

    #[test]
    fn test_quadrants_cover_map() {
        let map = BattleMap::new(45, 40);
        let total: u32 = quadrants(&map).iter().map(|q| q.area()).sum();
        assert_eq!(total, 45 * 40);
    }
}
