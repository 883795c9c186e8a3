/*
 * Debug Information Module
 *
 * This module defines the TickStats struct returned by every flock step.
 * It carries the counters a frame driver or a debug overlay wants to show
 * and that the flock emits through `tracing`:
 * - Population size after culling
 * - Neighbor registrations made by the force solve
 * - Agents pushed by the silhouette
 * - Agents removed because they died
 * - Time spent in the force solve
 */

use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub agents: usize,
    pub neighbor_links: usize,
    pub centered: bool,
    pub boundary_repelled: usize,
    pub culled: usize,
    pub solve_time: Duration,
}

impl TickStats {
    /// Average number of neighbors per agent this tick.
    pub fn mean_neighbors(&self) -> f32 {
        let population = self.agents + self.culled;
        if population == 0 {
            0.0
        } else {
            self.neighbor_links as f32 / population as f32
        }
    }
}
