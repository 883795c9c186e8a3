/*
 * Simulation Config Module
 *
 * Describes a whole scene for the headless driver: the flocks to build,
 * their tunables and colors, and which of them are coupled. Every field has
 * a default, so a config file only needs to name what it changes. An
 * empty config describes an empty scene; `demo` is the scene the driver
 * runs when no config is given.
 */

use nannou::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::boundary::BoundaryFrame;
use crate::color::{CrowdColor, FixedColor};
use crate::error::{FlockError, Result};
use crate::flock::FlockManager;
use crate::params::FlockParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Base seed; flock `i` is seeded with `seed + i`. Entropy when absent.
    pub seed: Option<u64>,
    pub ticks: u64,
    pub center: [f32; 3],
    pub flocks: Vec<FlockSpec>,
    /// Pairs of indices into `flocks` that feel each other.
    pub couplings: Vec<(usize, usize)>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            ticks: 600,
            center: [0.0, 0.0, 0.0],
            flocks: Vec::new(),
            couplings: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Two coupled flocks of 250 agents each.
    pub fn demo() -> Self {
        Self {
            flocks: vec![
                FlockSpec {
                    name: "warm".to_string(),
                    color: ColorSpec::Fixed { rgb: [1.0, 0.55, 0.2] },
                    ..FlockSpec::default()
                },
                FlockSpec {
                    name: "cool".to_string(),
                    color: ColorSpec::Fixed { rgb: [0.2, 0.6, 1.0] },
                    ..FlockSpec::default()
                },
            ],
            couplings: vec![(0, 1)],
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| FlockError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| FlockError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        for spec in &self.flocks {
            spec.params.validate()?;
            if spec.agents == 0 {
                warn!(flock = %spec.name, "flock starts without agents");
            }
        }

        for &(a, b) in &self.couplings {
            if a >= self.flocks.len() || b >= self.flocks.len() {
                return Err(FlockError::InvalidConfig(format!(
                    "coupling ({a}, {b}) refers to a missing flock"
                )));
            }
            if a == b {
                return Err(FlockError::InvalidConfig(format!("flock {a} is coupled to itself")));
            }
        }

        if !self.center.iter().all(|c| c.is_finite()) {
            return Err(FlockError::InvalidConfig("center must be finite".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockSpec {
    pub name: String,
    pub agents: usize,
    pub params: FlockParams,
    pub color: ColorSpec,
}

impl Default for FlockSpec {
    fn default() -> Self {
        Self {
            name: "flock".to_string(),
            agents: 250,
            params: FlockParams::default(),
            color: ColorSpec::default(),
        }
    }
}

impl FlockSpec {
    /// Builds the flock with its agents already spawned.
    pub fn build(&self, seed: Option<u64>) -> FlockManager {
        let params = self.params.clone();
        let mut flock = match seed {
            Some(seed) => FlockManager::with_seed(params, FixedColor::default(), seed),
            None => FlockManager::new(params, FixedColor::default()),
        };

        match self.color {
            ColorSpec::Fixed { rgb: [r, g, b] } => flock.set_color_policy(FixedColor(rgb(r, g, b))),
            ColorSpec::Crowd { saturation_count } => flock.set_color_policy(CrowdColor { saturation_count }),
        }

        flock.add_agents(self.agents);
        flock
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ColorSpec {
    Fixed { rgb: [f32; 3] },
    Crowd { saturation_count: f32 },
}

impl Default for ColorSpec {
    fn default() -> Self {
        ColorSpec::Fixed { rgb: [1.0, 1.0, 1.0] }
    }
}

/// Silhouette input for the driver: image-space polygons and the matrix
/// that maps image coordinates into the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySpec {
    pub polygons: Vec<Vec<[i32; 2]>>,
    /// Column-major 4x4 matrix; polygons are already in world space when
    /// absent.
    #[serde(default)]
    pub image_to_world: Option<[[f32; 4]; 4]>,
}

impl BoundarySpec {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FlockError::InvalidConfig(e.to_string()))
    }

    pub fn build(&self) -> Result<BoundaryFrame> {
        match &self.image_to_world {
            Some(cols) => BoundaryFrame::new(self.polygons.clone(), Mat4::from_cols_array_2d(cols)),
            None => Ok(BoundaryFrame::untransformed(self.polygons.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scene_is_empty() {
        let config = SimulationConfig::default();
        assert!(config.flocks.is_empty());
        assert!(config.couplings.is_empty());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn single_flock_config_is_not_coupled() {
        let config = SimulationConfig::from_json(r#"{ "flocks": [{ "name": "solo", "agents": 10 }] }"#).unwrap();
        assert_eq!(config.flocks.len(), 1);
        assert!(config.couplings.is_empty());
    }

    #[test]
    fn demo_scene_is_two_coupled_flocks() {
        let config = SimulationConfig::demo();
        assert_eq!(config.flocks.len(), 2);
        assert!(config.flocks.iter().all(|f| f.agents == 250));
        assert_eq!(config.couplings, vec![(0, 1)]);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config = SimulationConfig::from_json(
            r#"{
                "seed": 7,
                "flocks": [
                    { "name": "a", "agents": 10, "color": { "policy": "crowd", "saturation_count": 20.0 } },
                    { "name": "b", "params": { "zone_radius": 40.0 } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.seed, Some(7));
        assert_eq!(config.ticks, 600);
        assert!(config.couplings.is_empty());
        assert_eq!(config.flocks[0].color, ColorSpec::Crowd { saturation_count: 20.0 });
        assert_eq!(config.flocks[1].agents, 250);
        assert_eq!(config.flocks[1].params.zone_radius, 40.0);
        assert_eq!(config.flocks[1].params.lower_thresh, 0.5);
    }

    #[test]
    fn bad_couplings_are_rejected() {
        let config = SimulationConfig {
            couplings: vec![(0, 2)],
            ..SimulationConfig::demo()
        };
        assert!(matches!(config.validate(), Err(FlockError::InvalidConfig(_))));

        let config = SimulationConfig {
            couplings: vec![(1, 1)],
            ..SimulationConfig::demo()
        };
        assert!(matches!(config.validate(), Err(FlockError::InvalidConfig(_))));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            SimulationConfig::from_json("{ \"ticks\": -1 }"),
            Err(FlockError::InvalidConfig(_))
        ));
    }

    #[test]
    fn boundary_spec_without_transform_is_world_space() {
        let spec = BoundarySpec::from_json(r#"{ "polygons": [[[0, 0], [10, 0]]] }"#).unwrap();
        let frame = spec.build().unwrap();
        assert_eq!(frame.edge_count(), 1);
        assert_eq!(frame.to_image(vec3(4.0, 5.0, 0.0)), vec3(4.0, 5.0, 0.0));
    }

    #[test]
    fn boundary_spec_applies_the_transform() {
        // Half a world unit per pixel, shifted by (-50, -50)
        let spec = BoundarySpec::from_json(
            r#"{
                "polygons": [[[0, 100], [200, 100]]],
                "image_to_world": [
                    [0.5, 0.0, 0.0, 0.0],
                    [0.0, 0.5, 0.0, 0.0],
                    [0.0, 0.0, 1.0, 0.0],
                    [-50.0, -50.0, 0.0, 1.0]
                ]
            }"#,
        )
        .unwrap();
        let frame = spec.build().unwrap();
        let image = frame.to_image(vec3(0.0, 5.0, 0.0));
        assert!((image - vec3(100.0, 110.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn boundary_spec_rejects_singular_transforms() {
        let spec = BoundarySpec {
            polygons: vec![vec![[0, 0], [1, 0]]],
            image_to_world: Some([[0.0; 4]; 4]),
        };
        assert_eq!(spec.build(), Err(FlockError::SingularTransform));
    }

    #[test]
    fn build_spawns_agents() {
        let spec = FlockSpec {
            agents: 12,
            ..FlockSpec::default()
        };
        let flock = spec.build(Some(3));
        assert_eq!(flock.len(), 12);
        assert!(flock.primary().is_some());
    }
}
