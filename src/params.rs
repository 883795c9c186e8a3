/*
 * Flock Parameters Module
 *
 * This module defines the FlockParams struct that contains all the
 * tunable parameters shared by every agent of one flock. An external
 * parameter surface may rewrite them between any two ticks, so the engine
 * only relies on them through `enforce_thresholds` and never caches
 * derived values across ticks.
 */

use serde::{Deserialize, Serialize};

use crate::error::{FlockError, Result};

// Parameters shared by the whole population of a flock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockParams {
    pub zone_radius: f32,
    pub lower_thresh: f32,
    pub higher_thresh: f32,
    pub attract_strength: f32,
    pub repel_strength: f32,
    pub orient_strength: f32,
    pub central_gravity: bool,
    pub flatten: bool,
    // Silhouette avoidance
    pub boundary_threshold_sq: f32,
    pub boundary_repel_strength: f32,
    // Trail history for renderers
    pub track_tails: bool,
    // Performance settings
    pub parallel: bool,
}

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            zone_radius: 80.0,
            lower_thresh: 0.5,
            higher_thresh: 0.8,
            attract_strength: 0.004,
            repel_strength: 0.01,
            orient_strength: 0.01,
            central_gravity: true,
            flatten: true,
            boundary_threshold_sq: 1000.0,
            boundary_repel_strength: 5.0,
            track_tails: true,
            parallel: true,
        }
    }
}

impl FlockParams {
    /// Restores `lower_thresh <= higher_thresh` by raising the upper band
    /// edge. Called at the start of every force solve.
    pub fn enforce_thresholds(&mut self) {
        if self.lower_thresh > self.higher_thresh {
            self.higher_thresh = self.lower_thresh;
        }
    }

    /// Rejects values that can never describe a working flock. Only used
    /// when building flocks from configuration; values written by a live
    /// parameter surface are tolerated instead.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.zone_radius,
            self.lower_thresh,
            self.higher_thresh,
            self.attract_strength,
            self.repel_strength,
            self.orient_strength,
            self.boundary_threshold_sq,
            self.boundary_repel_strength,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(FlockError::InvalidParams("parameters must be finite"));
        }
        if self.zone_radius < 0.0 {
            return Err(FlockError::InvalidParams("zone_radius must not be negative"));
        }
        if !(self.lower_thresh > 0.0 && self.lower_thresh <= 1.0) {
            return Err(FlockError::InvalidParams("lower_thresh must lie in (0, 1]"));
        }
        if !(self.higher_thresh > 0.0 && self.higher_thresh <= 1.0) {
            return Err(FlockError::InvalidParams("higher_thresh must lie in (0, 1]"));
        }
        if self.boundary_threshold_sq < 0.0 {
            return Err(FlockError::InvalidParams("boundary_threshold_sq must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(FlockParams::default().validate(), Ok(()));
    }

    #[test]
    fn thresholds_are_reordered() {
        let mut params = FlockParams {
            lower_thresh: 0.9,
            higher_thresh: 0.3,
            ..FlockParams::default()
        };
        params.enforce_thresholds();
        assert_eq!(params.higher_thresh, 0.9);
        assert_eq!(params.lower_thresh, 0.9);
    }

    #[test]
    fn validate_rejects_out_of_range_thresholds() {
        let params = FlockParams {
            lower_thresh: 0.0,
            ..FlockParams::default()
        };
        assert!(matches!(params.validate(), Err(FlockError::InvalidParams(_))));

        let params = FlockParams {
            zone_radius: f32::NAN,
            ..FlockParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let params: FlockParams = serde_json::from_str(r#"{ "zone_radius": 40.0 }"#).unwrap();
        assert_eq!(params.zone_radius, 40.0);
        assert_eq!(params.lower_thresh, 0.5);
        assert!(params.flatten);
    }
}
