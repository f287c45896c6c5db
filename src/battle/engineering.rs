//! Engineering work: bridges, pontoons, walls and entrenchments
//!
//! A brigade under an engineering order stands on or next to its work site
//! for a number of rounds before the terrain changes. Walls are battered down
//! a little every round instead. Pontoons and walls need engineer battalions.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::battle::battle_map::Sector;
use crate::battle::geometry::Position;
use crate::battle::orders::OrderType;
use crate::battle::state::BattleState;
use crate::battle::units::{EngineeringKind, EngineeringTask};
use crate::core::config::EngineeringConfig;
use crate::core::types::BrigadeId;

/// Where a brigade has to stand to work on a site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkSite {
    pub kind: EngineeringKind,
    pub target: Position,
    /// Largest distance from the target the work can be done at
    pub reach: u32,
}

/// Progress made on a work site this round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineeringEvent {
    pub brigade: BrigadeId,
    pub kind: EngineeringKind,
    pub target: Position,
    pub completed: bool,
}

/// Nearest sector matching `wanted`, measured from `origin`
fn nearest_sector(state: &BattleState, origin: Position, wanted: impl Fn(&Sector) -> bool) -> Option<Position> {
    state
        .map
        .sectors()
        .iter()
        .filter(|s| wanted(s))
        .map(|s| s.position)
        .min_by_key(|p| (p.distance(&origin), *p))
}

/// Work site of brigade `i`'s active order, if it has one left
pub fn work_site(state: &BattleState, i: usize) -> Option<WorkSite> {
    let brigade = &state.brigades[i];
    let pos = brigade.position?;
    let order = brigade.active_order();
    let origin = order.final_checkpoint().unwrap_or(pos);

    match order.order_type {
        OrderType::DestroyBridges => nearest_sector(state, origin, |s| s.has_crossing()).map(|target| WorkSite {
            kind: EngineeringKind::DestroyBridge,
            target,
            reach: 1,
        }),
        OrderType::DestroyFortifications => nearest_sector(state, origin, |s| s.wall.is_some()).map(|target| WorkSite {
            kind: EngineeringKind::BatterWall,
            target,
            reach: 1,
        }),
        OrderType::BuildPontoonBridge => {
            let target = order.final_checkpoint()?;
            let sector = state.map.get(target)?;
            (sector.river.is_some() && !sector.has_crossing()).then_some(WorkSite {
                kind: EngineeringKind::BuildPontoon,
                target,
                reach: 1,
            })
        }
        OrderType::DigEntrenchment => {
            let sector = state.map.get(origin)?;
            (!sector.entrenchment).then_some(WorkSite {
                kind: EngineeringKind::DigEntrenchment,
                target: origin,
                reach: 0,
            })
        }
        _ => None,
    }
}

fn rounds_needed(kind: EngineeringKind, config: &EngineeringConfig) -> u32 {
    match kind {
        EngineeringKind::DestroyBridge => config.destroy_bridge_rounds,
        EngineeringKind::BuildPontoon => config.build_pontoon_rounds,
        EngineeringKind::DigEntrenchment => config.dig_entrenchment_rounds,
        // Walls crumble by strength, not by a fixed number of rounds
        EngineeringKind::BatterWall => 1,
    }
}

/// One round of work by brigade `i` on `site`
///
/// Returns the event and whether sight lines may have changed.
pub fn work(
    state: &mut BattleState,
    i: usize,
    site: WorkSite,
    config: &EngineeringConfig,
) -> Option<(EngineeringEvent, bool)> {
    let brigade = &state.brigades[i];
    let engineers = brigade.engineer_battalions();
    let needs_engineers = matches!(site.kind, EngineeringKind::BuildPontoon | EngineeringKind::BatterWall);
    if needs_engineers && engineers == 0 {
        debug!(brigade = brigade.id.0, kind = ?site.kind, "No engineers for the work");
        return None;
    }
    // Nobody demolishes the bridge they or another brigade are standing on
    if site.kind == EngineeringKind::DestroyBridge && !state.occupancy.is_free(site.target) {
        return None;
    }
    let id = brigade.id;

    let task = match brigade.engineering {
        Some(task) if task.kind == site.kind && task.target == site.target => task,
        _ => EngineeringTask {
            kind: site.kind,
            target: site.target,
            rounds_left: rounds_needed(site.kind, config),
        },
    };

    let mut sight_changed = false;
    let completed = match site.kind {
        EngineeringKind::BatterWall => {
            let damage = config.wall_damage_per_engineer * engineers;
            let sector = state.map.get_mut(site.target)?;
            let strength = sector.wall?.saturating_sub(damage);
            if strength == 0 {
                sector.wall = None;
                sight_changed = true;
                true
            } else {
                sector.wall = Some(strength);
                false
            }
        }
        _ => {
            let rounds_left = task.rounds_left.saturating_sub(1);
            if rounds_left == 0 {
                let sector = state.map.get_mut(site.target)?;
                match site.kind {
                    EngineeringKind::DestroyBridge => {
                        sector.bridge = None;
                        sector.pontoon = false;
                    }
                    EngineeringKind::BuildPontoon => sector.pontoon = true,
                    EngineeringKind::DigEntrenchment => sector.entrenchment = true,
                    EngineeringKind::BatterWall => {}
                }
                true
            } else {
                state.brigades[i].engineering = Some(EngineeringTask { rounds_left, ..task });
                false
            }
        }
    };

    if completed {
        state.brigades[i].engineering = None;
        info!(brigade = id.0, kind = ?site.kind, x = site.target.x, y = site.target.y, "Engineering work done");
    } else if site.kind == EngineeringKind::BatterWall {
        state.brigades[i].engineering = Some(task);
    }

    Some((
        EngineeringEvent {
            brigade: id,
            kind: site.kind,
            target: site.target,
            completed,
        },
        sight_changed,
    ))
}
