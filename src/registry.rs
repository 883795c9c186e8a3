/*
 * Flock Registry Module
 *
 * The registry owns every flock of a scene and hands out `FlockId` handles.
 * Flocks refer to each other only through these handles, so removing a flock
 * never leaves a dangling reference: a stale handle simply stops resolving.
 *
 * A registry tick runs in three phases with a barrier between each:
 * 1. Snapshot every flock
 * 2. Solve forces for every flock against its own and its linked snapshots
 * 3. Center, avoid the boundary, integrate and cull every flock
 */

use std::time::Instant;

use nannou::prelude::*;
use slotmap::{new_key_type, SecondaryMap, SlotMap};
use tracing::debug;

use crate::boundary::BoundaryFrame;
use crate::config::SimulationConfig;
use crate::debug::TickStats;
use crate::error::{FlockError, Result};
use crate::flock::FlockManager;
use crate::physics::FlockSnapshot;

new_key_type! {
    /// Handle of a flock inside a `FlockRegistry`.
    pub struct FlockId;
}

#[derive(Debug, Default)]
pub struct FlockRegistry {
    flocks: SlotMap<FlockId, FlockManager>,
    /// Point every flock with central gravity is pulled toward.
    pub center: Vec3,
}

impl FlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every configured flock and couples them as configured. Flock
    /// handles come back in config order from `ids()`.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;

        let mut registry = Self::new();
        registry.center = Vec3::from(config.center);

        let mut ids = Vec::with_capacity(config.flocks.len());
        for (index, spec) in config.flocks.iter().enumerate() {
            let flock = spec.build(config.seed.map(|seed| seed.wrapping_add(index as u64)));
            let id = registry.insert(flock);
            debug!(flock = ?id, name = %spec.name, agents = spec.agents, "flock created");
            ids.push(id);
        }

        for &(a, b) in &config.couplings {
            registry.couple(ids[a], ids[b])?;
        }

        Ok(registry)
    }

    pub fn insert(&mut self, flock: FlockManager) -> FlockId {
        self.flocks.insert(flock)
    }

    /// Removes a flock. Links other flocks hold to it are left in place and
    /// skipped from then on.
    pub fn remove(&mut self, id: FlockId) -> Option<FlockManager> {
        self.flocks.remove(id)
    }

    pub fn get(&self, id: FlockId) -> Option<&FlockManager> {
        self.flocks.get(id)
    }

    pub fn get_mut(&mut self, id: FlockId) -> Option<&mut FlockManager> {
        self.flocks.get_mut(id)
    }

    pub fn contains(&self, id: FlockId) -> bool {
        self.flocks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.flocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flocks.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = FlockId> + '_ {
        self.flocks.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlockId, &FlockManager)> {
        self.flocks.iter()
    }

    pub fn total_agents(&self) -> usize {
        self.flocks.values().map(FlockManager::len).sum()
    }

    /// Lets the agents of `from` feel the agents of `to`. The coupling is
    /// one-directional; see `couple`.
    pub fn link(&mut self, from: FlockId, to: FlockId) -> Result<()> {
        if from == to {
            return Err(FlockError::SelfLink(from));
        }
        if !self.flocks.contains_key(to) {
            return Err(FlockError::UnknownFlock(to));
        }
        let flock = self.flocks.get_mut(from).ok_or(FlockError::UnknownFlock(from))?;
        flock.link(to);
        Ok(())
    }

    /// Links both flocks to each other.
    pub fn couple(&mut self, a: FlockId, b: FlockId) -> Result<()> {
        self.link(a, b)?;
        self.link(b, a)
    }

    pub fn unlink(&mut self, from: FlockId, to: FlockId) -> Result<bool> {
        let flock = self.flocks.get_mut(from).ok_or(FlockError::UnknownFlock(from))?;
        Ok(flock.unlink(to))
    }

    /// Advances every flock by one tick.
    pub fn step(&mut self, boundary: Option<&BoundaryFrame>) -> Vec<(FlockId, TickStats)> {
        let snapshots: SecondaryMap<FlockId, FlockSnapshot> =
            self.flocks.iter().map(|(id, flock)| (id, flock.snapshot())).collect();

        let mut solved = Vec::with_capacity(self.flocks.len());

        for (id, flock) in self.flocks.iter_mut() {
            let Some(own) = snapshots.get(id) else {
                continue;
            };

            let mut linked = Vec::with_capacity(flock.links().len());
            for &link in flock.links() {
                match snapshots.get(link) {
                    Some(snapshot) => linked.push(snapshot),
                    None => debug!(flock = ?id, link = ?link, "skipping link to removed flock"),
                }
            }

            let started = Instant::now();
            let neighbor_links = flock.compute_forces_with(own, &linked);
            solved.push((id, neighbor_links, started.elapsed()));
        }

        let center = self.center;
        let mut results = Vec::with_capacity(solved.len());

        for (id, neighbor_links, solve_time) in solved {
            let Some(flock) = self.flocks.get_mut(id) else {
                continue;
            };
            let mut stats = flock.finish_tick(center, boundary);
            stats.neighbor_links = neighbor_links;
            stats.solve_time = solve_time;
            results.push((id, stats));
        }

        results
    }
}
