/*
 * Agent Module
 *
 * This module defines the Agent struct: the kinematic and physiological
 * state of one boid. Forces are accumulated into `acceleration` by the
 * solver and the boundary pass, then consumed by `integrate`, which also
 * runs the agent's low-pass filters:
 * 1. Crowd factor: smoothed local density, widens the speed ceiling
 * 2. Fear: flight response, decays toward zero every tick
 */

use std::collections::VecDeque;

use nannou::prelude::*;
use rand::Rng;

pub const TAIL_LENGTH: usize = 15;
pub const BODY_LENGTH: f32 = 5.0;
pub const VELOCITY_DECAY: f32 = 0.99;
pub const CENTER_PULL_RADIUS: f32 = 200.0;
pub const CENTER_PULL_STRENGTH: f32 = 0.00025;

const CROWD_SMOOTHING: f32 = 0.1;
const CROWD_PER_NEIGHBOR: f32 = 0.02;
const MIN_CROWD_FACTOR: f32 = 0.5;
const MAX_CROWD_FACTOR: f32 = 1.0;
const FEAR_DECAY: f32 = 0.2;

// Squared lengths below this are treated as zero vectors
pub(crate) const EPSILON_SQ: f32 = 1.0e-12;

/// Unit vector along `v`, or `fallback` when `v` has no usable direction.
#[inline]
pub(crate) fn unit_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let len_sq = v.length_squared();
    if len_sq > EPSILON_SQ && len_sq.is_finite() {
        v / len_sq.sqrt()
    } else {
        fallback
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    /// Normalized velocity, cached once per tick.
    pub heading: Vec3,
    pub max_speed: f32,
    pub min_speed: f32,
    pub crowd_factor: f32,
    /// Reserved for threat response. Nothing raises it besides spawning.
    pub fear: f32,
    pub neighbor_position_sum: Vec3,
    pub neighbor_count: u32,
    pub is_dead: bool,
    pub is_primary: bool,
    pub color: Rgb,
    /// Recent positions, newest first.
    pub tail: VecDeque<Vec3>,
}

impl Agent {
    pub fn new<R: Rng + ?Sized>(position: Vec3, velocity: Vec3, is_primary: bool, rng: &mut R) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vec3::ZERO,
            heading: Vec3::Y,
            max_speed: rng.gen_range(2.5..4.0),
            min_speed: rng.gen_range(1.0..1.5),
            crowd_factor: MAX_CROWD_FACTOR,
            fear: 1.0,
            neighbor_position_sum: Vec3::ZERO,
            neighbor_count: 0,
            is_dead: false,
            is_primary,
            color: rgb(1.0, 1.0, 1.0),
            tail: std::iter::repeat(position).take(TAIL_LENGTH).collect(),
        }
    }

    // Apply a force to the agent
    #[inline]
    pub fn apply_force(&mut self, force: Vec3) {
        self.acceleration += force;
    }

    #[inline]
    pub fn add_neighbor_contribution(&mut self, other_position: Vec3) {
        self.neighbor_position_sum += other_position;
        self.neighbor_count += 1;
    }

    /// Clears the per-tick accumulators before a force solve.
    pub fn begin_tick(&mut self) {
        self.acceleration = Vec3::ZERO;
        self.neighbor_position_sum = Vec3::ZERO;
        self.neighbor_count = 0;
    }

    /// Centroid of the neighbors registered this tick.
    pub fn neighbor_centroid(&self) -> Option<Vec3> {
        if self.neighbor_count > 0 {
            Some(self.neighbor_position_sum / self.neighbor_count as f32)
        } else {
            None
        }
    }

    // Nudge the velocity back toward `center` once the agent strays too far
    pub fn pull_to_center(&mut self, center: Vec3) {
        let offset = self.position - center;
        let distance = offset.length();

        if distance > CENTER_PULL_RADIUS {
            let direction = offset / distance;
            self.velocity -= direction * ((distance - CENTER_PULL_RADIUS) * CENTER_PULL_STRENGTH);
        }
    }

    /// Advances the agent by one tick and consumes its accumulators.
    pub fn integrate(&mut self, flatten: bool, track_tail: bool) {
        let target_crowd = 1.0 - self.neighbor_count as f32 * CROWD_PER_NEIGHBOR;
        self.crowd_factor -= (self.crowd_factor - target_crowd) * CROWD_SMOOTHING;
        self.crowd_factor = self.crowd_factor.clamp(MIN_CROWD_FACTOR, MAX_CROWD_FACTOR);

        self.fear -= self.fear * FEAR_DECAY;

        if flatten {
            self.acceleration.z = 0.0;
        }

        self.velocity += self.acceleration;
        if !self.velocity.is_finite() {
            self.velocity = self.heading * self.min_speed;
        }
        self.heading = unit_or(self.velocity, self.heading);

        self.limit_speed();

        self.position += self.velocity;
        if flatten {
            self.position.z = 0.0;
        }

        self.velocity *= VELOCITY_DECAY;

        self.begin_tick();

        if track_tail {
            self.tail.pop_back();
            self.tail.push_front(self.position);
        }

        debug_assert!(
            self.position.is_finite(),
            "agent position became non-finite: {:?}",
            self.position
        );
    }

    /// Clamps speed into `[min_speed, max_speed + crowd_factor]` along the
    /// cached heading, then scales by `1 + fear`.
    pub fn limit_speed(&mut self) {
        let max_speed = self.max_speed + self.crowd_factor;
        let speed_sq = self.velocity.length_squared();

        if speed_sq > max_speed * max_speed {
            self.velocity = self.heading * max_speed;
        } else if speed_sq < self.min_speed * self.min_speed {
            self.velocity = self.heading * self.min_speed;
        }

        self.velocity *= 1.0 + self.fear;
    }

    /// Rear end of the body, for renderers drawing the agent as an arrow.
    pub fn tail_tip(&self) -> Vec3 {
        self.position - self.heading * BODY_LENGTH
    }
}
