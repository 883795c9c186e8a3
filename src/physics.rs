/*
 * Physics Module
 *
 * This module computes the flocking forces for one flock. Every agent in
 * the interaction zone of another falls in one of three regimes, selected
 * by the normalized squared distance `per`:
 * 1. Separation: push apart, diverging as the pair closes in
 * 2. Alignment: steer along the other agent's heading
 * 3. Cohesion: pull together near the edge of the zone
 * followed by a pull toward the centroid of all neighbors and a wander
 * force sampled from a noise field.
 *
 * The solve reads immutable snapshots and writes only the accumulators of
 * the flock being solved. A pair's share for the other agent is produced
 * when that agent's own flock evaluates the pair from its side; every
 * regime is symmetric in `per`, so the force set is the same as scattering
 * each pair to both agents. Agents are processed in parallel chunks with
 * rayon when enabled, giving identical results to the sequential path.
 */

use std::f32::consts::TAU;

use nannou::prelude::*;
use rayon::prelude::*;

use crate::agent::{unit_or, Agent, EPSILON_SQ};
use crate::params::FlockParams;
use crate::wander::WanderField;

/// The state of one agent that other agents are allowed to read during a
/// force solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshot {
    pub position: Vec3,
    pub heading: Vec3,
    pub crowd_factor: f32,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        Self {
            position: agent.position,
            heading: agent.heading,
            crowd_factor: agent.crowd_factor,
        }
    }
}

/// Read-phase view of a whole flock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlockSnapshot {
    pub agents: Vec<AgentSnapshot>,
}

impl FlockSnapshot {
    pub fn of(agents: &[Agent]) -> Self {
        Self {
            agents: agents.iter().map(AgentSnapshot::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Separation,
    Alignment,
    Cohesion,
}

/// Picks the regime for a normalized squared distance `per` in `[0, 1)`.
pub fn classify(per: f32, lower_thresh: f32, higher_thresh: f32) -> Regime {
    if per < lower_thresh {
        Regime::Separation
    } else if per < higher_thresh {
        Regime::Alignment
    } else {
        Regime::Cohesion
    }
}

/// Raised-cosine shaping across a band: 1 at both edges, 0 in the middle.
#[inline]
pub fn band_ease(adj_per: f32) -> f32 {
    1.0 - ((adj_per * TAU).cos() * -0.5 + 0.5)
}

/// Force tunables of one solve, read once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneParams {
    pub zone_radius: f32,
    pub lower_thresh: f32,
    pub higher_thresh: f32,
    pub attract_strength: f32,
    pub repel_strength: f32,
    pub orient_strength: f32,
}

impl From<&FlockParams> for ZoneParams {
    fn from(params: &FlockParams) -> Self {
        Self {
            zone_radius: params.zone_radius,
            lower_thresh: params.lower_thresh,
            higher_thresh: params.higher_thresh.max(params.lower_thresh),
            attract_strength: params.attract_strength,
            repel_strength: params.repel_strength,
            orient_strength: params.orient_strength,
        }
    }
}

/// The share of a pair interaction that lands on one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairForce {
    pub regime: Regime,
    pub per: f32,
    pub force: Vec3,
}

/// Force exerted on `me` by `other`, or `None` when they are out of zone.
pub fn pair_force(me: &AgentSnapshot, other: &AgentSnapshot, zone: &ZoneParams) -> Option<PairForce> {
    if !(zone.zone_radius > 0.0) {
        return None;
    }

    let dir = me.position - other.position;
    let dist_sq = dir.length_squared();
    let zone_radius_sq = zone.zone_radius * zone.zone_radius * me.crowd_factor * other.crowd_factor;

    if !zone_radius_sq.is_finite() || !(dist_sq < zone_radius_sq) {
        return None;
    }

    let per = dist_sq / zone_radius_sq;
    let regime = classify(per, zone.lower_thresh, zone.higher_thresh);

    let force = match regime {
        Regime::Separation => {
            let f = (zone.lower_thresh / per - 1.0) * zone.repel_strength;
            // Exact overlap has no direction to push along
            if dist_sq <= EPSILON_SQ || !(per > 0.0) || !f.is_finite() {
                Vec3::ZERO
            } else {
                unit_or(dir, Vec3::ZERO) * f
            }
        }
        Regime::Alignment => {
            let adj_per = (per - zone.lower_thresh) / (zone.higher_thresh - zone.lower_thresh);
            other.heading * (band_ease(adj_per) * zone.orient_strength)
        }
        Regime::Cohesion => {
            let adj_per = (per - zone.higher_thresh) / (1.0 - zone.higher_thresh);
            -unit_or(dir, Vec3::ZERO) * (band_ease(adj_per) * zone.attract_strength)
        }
    };

    Some(PairForce { regime, per, force })
}

// Gather every pair involving one agent into its own accumulators
fn gather_agent(
    agent: &mut Agent,
    index: usize,
    own: &FlockSnapshot,
    linked: &[&FlockSnapshot],
    zone: &ZoneParams,
    wander: &WanderField,
) {
    let me = own.agents[index];

    for (j, other) in own.agents.iter().enumerate() {
        if j == index {
            continue;
        }
        if let Some(pair) = pair_force(&me, other, zone) {
            agent.add_neighbor_contribution(other.position);
            agent.apply_force(pair.force);
        }
    }

    for flock in linked {
        for other in &flock.agents {
            if let Some(pair) = pair_force(&me, other, zone) {
                agent.add_neighbor_contribution(other.position);
                agent.apply_force(pair.force);
            }
        }
    }

    // Cohesion toward the neighbor centroid
    if let Some(centroid) = agent.neighbor_centroid() {
        agent.apply_force((centroid - me.position) * zone.attract_strength);
    }

    agent.apply_force(wander.sample(me.position));
}

/// Accumulates pair, cohesion and wander forces into `agents`.
///
/// `own` must be the snapshot of `agents` taken at the start of the tick.
/// Returns the number of neighbor registrations made, summed over agents.
pub fn solve_forces(
    agents: &mut [Agent],
    own: &FlockSnapshot,
    linked: &[&FlockSnapshot],
    params: &FlockParams,
    wander: &WanderField,
) -> usize {
    debug_assert_eq!(agents.len(), own.len(), "snapshot does not match population");

    let zone = ZoneParams::from(params);

    if agents.is_empty() {
        return 0;
    }

    if params.parallel {
        let chunk_size = std::cmp::max(agents.len() / rayon::current_num_threads(), 1);

        agents
            .par_chunks_mut(chunk_size)
            .enumerate()
            .map(|(chunk_idx, agent_chunk)| {
                let mut neighbors = 0;
                for (i_in_chunk, agent) in agent_chunk.iter_mut().enumerate() {
                    let i = chunk_idx * chunk_size + i_in_chunk;
                    gather_agent(agent, i, own, linked, &zone, wander);
                    neighbors += agent.neighbor_count as usize;
                }
                neighbors
            })
            .sum()
    } else {
        let mut neighbors = 0;
        for (i, agent) in agents.iter_mut().enumerate() {
            gather_agent(agent, i, own, linked, &zone, wander);
            neighbors += agent.neighbor_count as usize;
        }
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(x: f32, heading: Vec3) -> AgentSnapshot {
        AgentSnapshot {
            position: Vec3::new(x, 0.0, 0.0),
            heading,
            crowd_factor: 1.0,
        }
    }

    fn zone() -> ZoneParams {
        ZoneParams::from(&FlockParams::default())
    }

    #[test]
    fn two_agents_ten_apart_separate() {
        let zone = ZoneParams {
            repel_strength: 1.0,
            ..zone()
        };
        let left = snapshot(0.0, Vec3::X);
        let right = snapshot(10.0, Vec3::X);

        let pair = pair_force(&left, &right, &zone).expect("in zone");
        assert_eq!(pair.regime, Regime::Separation);
        assert!((pair.per - 100.0 / 6400.0).abs() < 1e-7);
        // (0.5 / 0.015625 - 1) = 31
        assert!((pair.force.x + 31.0).abs() < 1e-3);
        assert_eq!(pair.force.y, 0.0);
        assert_eq!(pair.force.z, 0.0);
    }

    #[test]
    fn out_of_zone_pairs_do_not_interact() {
        let a = snapshot(0.0, Vec3::X);
        let b = snapshot(80.0, Vec3::X);
        assert_eq!(pair_force(&a, &b, &zone()), None);

        // Crowding shrinks the sensing radius of both agents
        let mut c = snapshot(70.0, Vec3::X);
        assert!(pair_force(&a, &c, &zone()).is_some());
        c.crowd_factor = 0.5;
        assert_eq!(pair_force(&a, &c, &zone()), None);
    }

    #[test]
    fn regimes_switch_exactly_at_thresholds() {
        assert_eq!(classify(0.0, 0.5, 0.8), Regime::Separation);
        assert_eq!(classify(0.4999, 0.5, 0.8), Regime::Separation);
        assert_eq!(classify(0.5, 0.5, 0.8), Regime::Alignment);
        assert_eq!(classify(0.7999, 0.5, 0.8), Regime::Alignment);
        assert_eq!(classify(0.8, 0.5, 0.8), Regime::Cohesion);
        assert_eq!(classify(0.9999, 0.5, 0.8), Regime::Cohesion);
    }

    #[test]
    fn regime_sequence_is_monotonic_over_distance() {
        let zone = zone();
        let origin = snapshot(0.0, Vec3::Y);
        let mut last = Regime::Separation;
        let order = |r: Regime| match r {
            Regime::Separation => 0,
            Regime::Alignment => 1,
            Regime::Cohesion => 2,
        };
        for step in 1..800 {
            let x = step as f32 * 0.1;
            if let Some(pair) = pair_force(&origin, &snapshot(x, Vec3::Y), &zone) {
                assert!(order(pair.regime) >= order(last));
                assert_eq!(pair.regime, classify(pair.per, 0.5, 0.8));
                last = pair.regime;
            }
        }
        assert_eq!(last, Regime::Cohesion);
    }

    #[test]
    fn band_ease_peaks_at_edges() {
        assert!((band_ease(0.0) - 1.0).abs() < 1e-6);
        assert!(band_ease(0.5).abs() < 1e-6);
        assert!((band_ease(1.0) - 1.0).abs() < 1e-5);
        assert!((band_ease(0.25) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn separation_and_cohesion_are_antisymmetric() {
        let zone = zone();
        for x in [5.0, 20.0, 75.0, 78.0] {
            let a = AgentSnapshot {
                position: Vec3::new(1.0, 2.0, 3.0),
                heading: Vec3::X,
                crowd_factor: 1.0,
            };
            let b = AgentSnapshot {
                position: Vec3::new(1.0 + x, 2.0, 3.0),
                heading: Vec3::Y,
                crowd_factor: 1.0,
            };
            let ab = pair_force(&a, &b, &zone).unwrap();
            let ba = pair_force(&b, &a, &zone).unwrap();
            assert_eq!(ab.regime, ba.regime);
            assert_ne!(ab.regime, Regime::Alignment);
            assert!((ab.force + ba.force).length() < 1e-6);
        }
    }

    #[test]
    fn alignment_steers_along_the_other_heading() {
        let zone = zone();
        // per = 60^2 / 80^2 = 0.5625
        let a = snapshot(0.0, Vec3::X);
        let b = snapshot(60.0, Vec3::Y);
        let ab = pair_force(&a, &b, &zone).unwrap();
        let ba = pair_force(&b, &a, &zone).unwrap();
        assert_eq!(ab.regime, Regime::Alignment);
        let f = band_ease((0.5625 - 0.5) / 0.3) * zone.orient_strength;
        assert!((ab.force - Vec3::Y * f).length() < 1e-6);
        assert!((ba.force - Vec3::X * f).length() < 1e-6);
    }

    #[test]
    fn cohesion_pulls_together() {
        let zone = zone();
        let a = snapshot(0.0, Vec3::X);
        let b = snapshot(75.0, Vec3::X);
        let pair = pair_force(&a, &b, &zone).unwrap();
        assert_eq!(pair.regime, Regime::Cohesion);
        assert!(pair.force.x > 0.0);
    }

    #[test]
    fn overlapping_agents_produce_no_force() {
        let a = snapshot(3.0, Vec3::X);
        let pair = pair_force(&a, &a, &zone()).unwrap();
        assert_eq!(pair.regime, Regime::Separation);
        assert_eq!(pair.force, Vec3::ZERO);
        assert!(pair.force.is_finite());
    }

    #[test]
    fn equal_thresholds_skip_alignment() {
        let zone = ZoneParams {
            lower_thresh: 0.6,
            higher_thresh: 0.6,
            ..zone()
        };
        for x in [10.0, 61.0, 62.0, 79.0] {
            let pair = pair_force(&snapshot(0.0, Vec3::X), &snapshot(x, Vec3::X), &zone).unwrap();
            assert_ne!(pair.regime, Regime::Alignment);
            assert!(pair.force.is_finite());
        }
    }

    #[test]
    fn non_positive_zone_radius_disables_interactions() {
        for zone_radius in [0.0, -80.0, f32::NAN] {
            let zone = ZoneParams { zone_radius, ..zone() };
            assert_eq!(pair_force(&snapshot(0.0, Vec3::X), &snapshot(10.0, Vec3::X), &zone), None);
        }
    }

    #[test]
    fn overflowing_zone_is_ignored() {
        let zone = ZoneParams {
            zone_radius: 2.0e19,
            ..zone()
        };
        assert_eq!(pair_force(&snapshot(0.0, Vec3::X), &snapshot(1.0, Vec3::X), &zone), None);
    }

    #[test]
    fn tiny_per_never_yields_non_finite_force() {
        for zone_radius in [1.0e19, 1.8e19] {
            let zone = ZoneParams { zone_radius, ..zone() };
            let pair = pair_force(&snapshot(0.0, Vec3::X), &snapshot(1.0e-3, Vec3::X), &zone).unwrap();
            assert_eq!(pair.regime, Regime::Separation);
            assert!(pair.force.is_finite(), "force {:?}", pair.force);
        }
    }

    #[test]
    fn zone_params_reorder_thresholds() {
        let params = FlockParams {
            lower_thresh: 0.7,
            higher_thresh: 0.2,
            ..FlockParams::default()
        };
        let zone = ZoneParams::from(&params);
        assert_eq!(zone.higher_thresh, 0.7);
    }
}
