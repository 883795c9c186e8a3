/*
 * Color Module
 *
 * A flock is handed a color policy when it is built and asks it for every
 * agent's color once per tick, after forces are resolved and before the
 * agent integrates, so this tick's neighbor count is still visible.
 * Policies may look at anything on the agent, so per-agent coloring needs
 * no change on the flock side.
 */

use nannou::prelude::*;

use crate::agent::Agent;

pub trait ColorPolicy: Send + Sync {
    fn color(&self, agent: &Agent) -> Rgb;
}

/// Every agent takes the flock's base color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedColor(pub Rgb);

impl Default for FixedColor {
    fn default() -> Self {
        Self(rgb(1.0, 1.0, 1.0))
    }
}

impl ColorPolicy for FixedColor {
    fn color(&self, _agent: &Agent) -> Rgb {
        self.0
    }
}

/// Shifts from red toward saturated cyan as neighbors pile up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrowdColor {
    /// Neighbor count at which the color saturates.
    pub saturation_count: f32,
}

impl Default for CrowdColor {
    fn default() -> Self {
        Self {
            saturation_count: 50.0,
        }
    }
}

impl ColorPolicy for CrowdColor {
    fn color(&self, agent: &Agent) -> Rgb {
        let c = (agent.neighbor_count as f32 / self.saturation_count.max(1.0)).min(1.0);
        Rgb::from(hsv(1.0 - c, c, c * 0.5 + 0.5))
    }
}

impl<F> ColorPolicy for F
where
    F: Fn(&Agent) -> Rgb + Send + Sync,
{
    fn color(&self, agent: &Agent) -> Rgb {
        self(agent)
    }
}
