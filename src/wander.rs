//! Ambient wandering: a coherent 3-D noise field sampled at each agent's
//! position. Neighbouring agents receive similar nudges, so the flock drifts
//! organically instead of jittering.

use std::fmt;

use nannou::prelude::*;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

pub const WANDER_OCTAVES: usize = 4;
pub const WANDER_SCALE: f32 = 0.005;
pub const WANDER_STRENGTH: f32 = 0.01;

// Central difference step, in noise space
const GRADIENT_EPS: f64 = 1.0e-3;

/// Gradient of a fractal Perlin field.
pub struct WanderField {
    fbm: Fbm<Perlin>,
    scale: f32,
    strength: f32,
}

impl WanderField {
    pub fn new(seed: u32) -> Self {
        Self {
            fbm: Fbm::<Perlin>::new(seed).set_octaves(WANDER_OCTAVES),
            scale: WANDER_SCALE,
            strength: WANDER_STRENGTH,
        }
    }

    /// Wander force for an agent at `position`.
    pub fn sample(&self, position: Vec3) -> Vec3 {
        let p = position * self.scale;
        self.gradient([p.x as f64, p.y as f64, p.z as f64]) * self.strength
    }

    fn gradient(&self, [x, y, z]: [f64; 3]) -> Vec3 {
        let inv = 1.0 / (2.0 * GRADIENT_EPS);
        let dx = self.fbm.get([x + GRADIENT_EPS, y, z]) - self.fbm.get([x - GRADIENT_EPS, y, z]);
        let dy = self.fbm.get([x, y + GRADIENT_EPS, z]) - self.fbm.get([x, y - GRADIENT_EPS, z]);
        let dz = self.fbm.get([x, y, z + GRADIENT_EPS]) - self.fbm.get([x, y, z - GRADIENT_EPS]);
        let g = Vec3::new((dx * inv) as f32, (dy * inv) as f32, (dz * inv) as f32);
        // Never hand out NaN
        if g.is_finite() {
            g
        } else {
            Vec3::ZERO
        }
    }
}

impl fmt::Debug for WanderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WanderField")
            .field("octaves", &WANDER_OCTAVES)
            .field("scale", &self.scale)
            .field("strength", &self.strength)
            .finish()
    }
}
