/*
 * Flock Module
 *
 * This module defines the FlockManager: one population of agents sharing a
 * set of tunables, a wander field and a color policy. A tick runs a fixed
 * pipeline:
 * 1. ComputeForces: pair, cohesion and wander forces (physics module)
 * 2. ApplyCentering: optional pull toward a center point
 * 3. AvoidBoundary: optional silhouette repulsion (boundary module)
 * 4. Integrate: color, then move every agent and decay its filters
 * 5. Cull: drop dead agents
 *
 * Other flocks are referenced only through registry handles. The flock
 * never reaches into another flock's agents; it reads their snapshots.
 */

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use nannou::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::agent::Agent;
use crate::boundary::BoundaryFrame;
use crate::color::{ColorPolicy, FixedColor};
use crate::debug::TickStats;
use crate::params::FlockParams;
use crate::physics::{self, FlockSnapshot};
use crate::registry::FlockId;
use crate::wander::WanderField;

pub const SPAWN_RADIUS_MIN: f32 = 100.0;
pub const SPAWN_RADIUS_MAX: f32 = 200.0;

/// What a renderer gets to see of one agent.
#[derive(Debug, Clone, Copy)]
pub struct AgentView<'a> {
    pub position: Vec3,
    pub heading: Vec3,
    pub tail_tip: Vec3,
    pub color: Rgb,
    pub is_primary: bool,
    pub tail: &'a VecDeque<Vec3>,
}

pub struct FlockManager {
    agents: Vec<Agent>,
    params: FlockParams,
    // Tunables seen by the previous force solve
    last_params: Option<FlockParams>,
    links: Vec<FlockId>,
    color_policy: Box<dyn ColorPolicy>,
    wander: WanderField,
    rng: StdRng,
}

impl FlockManager {
    pub fn new<C: ColorPolicy + 'static>(params: FlockParams, color_policy: C) -> Self {
        Self::with_rng(params, color_policy, StdRng::from_entropy())
    }

    /// Reproducible flock: spawning and the wander field follow `seed`.
    pub fn with_seed<C: ColorPolicy + 'static>(params: FlockParams, color_policy: C, seed: u64) -> Self {
        Self::with_rng(params, color_policy, StdRng::seed_from_u64(seed))
    }

    fn with_rng<C: ColorPolicy + 'static>(params: FlockParams, color_policy: C, mut rng: StdRng) -> Self {
        let wander = WanderField::new(rng.gen());
        Self {
            agents: Vec::new(),
            params,
            last_params: None,
            links: Vec::new(),
            color_policy: Box::new(color_policy),
            wander,
            rng,
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn params(&self) -> &FlockParams {
        &self.params
    }

    /// Tunables for a parameter surface. Any value is tolerated between
    /// ticks.
    pub fn params_mut(&mut self) -> &mut FlockParams {
        &mut self.params
    }

    /// Whether the tunables differ from those of the previous force solve.
    /// A flock that has not solved yet reports no change.
    pub fn params_changed(&self) -> bool {
        match &self.last_params {
            Some(last) => *last != self.params,
            None => false,
        }
    }

    pub fn set_color_policy<C: ColorPolicy + 'static>(&mut self, color_policy: C) {
        self.color_policy = Box::new(color_policy);
    }

    // Spawn agents on a shell around the origin, heading in random directions
    pub fn add_agents(&mut self, amount: usize) {
        self.agents.reserve(amount);

        for _ in 0..amount {
            let radius = self.rng.gen_range(SPAWN_RADIUS_MIN..SPAWN_RADIUS_MAX);
            let position = random_unit_vector(&mut self.rng) * radius;
            let velocity = random_unit_vector(&mut self.rng);
            let is_primary = self.agents.is_empty();

            let agent = Agent::new(position, velocity, is_primary, &mut self.rng);
            self.agents.push(agent);
        }
    }

    /// Removes up to `amount` agents from the end of the population and
    /// returns how many were removed.
    pub fn remove_agents(&mut self, amount: usize) -> usize {
        let removed = amount.min(self.agents.len());
        self.agents.truncate(self.agents.len() - removed);
        removed
    }

    /// Couples this flock to `other`. Forces only flow into this flock;
    /// the other side needs its own link for a symmetric coupling.
    pub fn link(&mut self, other: FlockId) {
        if !self.links.contains(&other) {
            self.links.push(other);
        }
    }

    pub fn unlink(&mut self, other: FlockId) -> bool {
        let before = self.links.len();
        self.links.retain(|id| *id != other);
        self.links.len() != before
    }

    pub fn links(&self) -> &[FlockId] {
        &self.links
    }

    /// Read-phase view of the population for this tick.
    pub fn snapshot(&self) -> FlockSnapshot {
        FlockSnapshot::of(&self.agents)
    }

    /// Clears every agent's accumulators ahead of a force solve.
    pub fn begin_tick(&mut self) {
        for agent in &mut self.agents {
            agent.begin_tick();
        }
    }

    /// Force solve against this flock and the given linked snapshots.
    pub fn compute_forces(&mut self, linked: &[&FlockSnapshot]) -> usize {
        let own = self.snapshot();
        self.compute_forces_with(&own, linked)
    }

    /// Force solve with an already taken snapshot of this flock, so that
    /// every flock of a multi-flock tick reads the same state.
    pub fn compute_forces_with(&mut self, own: &FlockSnapshot, linked: &[&FlockSnapshot]) -> usize {
        self.params.enforce_thresholds();
        if self.params_changed() {
            debug!(params = ?self.params, "flock parameters changed");
        }
        self.last_params = Some(self.params.clone());

        self.begin_tick();
        physics::solve_forces(&mut self.agents, own, linked, &self.params, &self.wander)
    }

    pub fn pull_to_center(&mut self, center: Vec3) {
        for agent in &mut self.agents {
            agent.pull_to_center(center);
        }
    }

    pub fn avoid_boundary(&mut self, boundary: &BoundaryFrame) -> usize {
        boundary.repel(
            &mut self.agents,
            self.params.boundary_threshold_sq,
            self.params.boundary_repel_strength,
        )
    }

    /// Colors and moves every agent, then removes the dead. Returns the
    /// number of agents culled.
    pub fn integrate(&mut self) -> usize {
        let flatten = self.params.flatten;
        let track_tails = self.params.track_tails;

        for agent in &mut self.agents {
            agent.color = self.color_policy.color(agent);
            agent.integrate(flatten, track_tails);
        }

        let before = self.agents.len();
        self.agents.retain(|agent| !agent.is_dead);
        before - self.agents.len()
    }

    /// One full tick of this flock. `linked` holds the snapshots of the
    /// flocks this one is coupled to.
    pub fn step(&mut self, linked: &[&FlockSnapshot], center: Vec3, boundary: Option<&BoundaryFrame>) -> TickStats {
        let own = self.snapshot();
        let started = Instant::now();
        let neighbor_links = self.compute_forces_with(&own, linked);
        let solve_time = started.elapsed();

        let mut stats = self.finish_tick(center, boundary);
        stats.neighbor_links = neighbor_links;
        stats.solve_time = solve_time;
        stats
    }

    // Everything after the force solve: centering, boundary, integrate, cull
    pub(crate) fn finish_tick(&mut self, center: Vec3, boundary: Option<&BoundaryFrame>) -> TickStats {
        let centered = self.params.central_gravity;
        if centered {
            self.pull_to_center(center);
        }

        let boundary_repelled = match boundary {
            Some(frame) => self.avoid_boundary(frame),
            None => 0,
        };

        let culled = self.integrate();

        let stats = TickStats {
            agents: self.agents.len(),
            centered,
            boundary_repelled,
            culled,
            ..TickStats::default()
        };

        debug!(
            agents = stats.agents,
            repelled = stats.boundary_repelled,
            culled = stats.culled,
            "flock integrated"
        );

        stats
    }

    /// Mean position of the population.
    pub fn centroid(&self) -> Option<Vec3> {
        if self.agents.is_empty() {
            return None;
        }
        let sum = self.agents.iter().fold(Vec3::ZERO, |acc, agent| acc + agent.position);
        Some(sum / self.agents.len() as f32)
    }

    /// The followed agent, if it is still alive.
    pub fn primary(&self) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.is_primary)
    }

    pub fn render_states(&self) -> impl Iterator<Item = AgentView<'_>> + '_ {
        self.agents.iter().map(|agent| AgentView {
            position: agent.position,
            heading: agent.heading,
            tail_tip: agent.tail_tip(),
            color: agent.color,
            is_primary: agent.is_primary,
            tail: &agent.tail,
        })
    }
}

impl Default for FlockManager {
    fn default() -> Self {
        Self::new(FlockParams::default(), FixedColor::default())
    }
}

impl fmt::Debug for FlockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlockManager")
            .field("agents", &self.agents.len())
            .field("params", &self.params)
            .field("links", &self.links)
            .field("wander", &self.wander)
            .finish()
    }
}

// Uniform direction on the unit sphere
fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let theta: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    vec3(r * theta.cos(), r * theta.sin(), z)
}
