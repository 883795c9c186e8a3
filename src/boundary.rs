/*
 * Boundary Module
 *
 * Repulsion from an externally supplied silhouette. The vision pipeline
 * hands over polygons in image space together with the image-to-world
 * transform; agents are mapped into image space, the closest point on any
 * polygon edge is found with a clamped segment projection, and agents that
 * come within the threshold are pushed away from it.
 *
 * Polygons are not closed implicitly: only consecutive point pairs form
 * edges, so a closed outline must repeat its first point.
 */

use nannou::prelude::*;
use tracing::trace;

use crate::agent::{unit_or, Agent};
use crate::error::{FlockError, Result};

// Determinants below this make the transform unusable
const MIN_DETERMINANT: f32 = 1.0e-12;

/// Polygon set for one tick, with the transforms between image and world.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFrame {
    polygons: Vec<Vec<[i32; 2]>>,
    image_to_world: Mat4,
    world_to_image: Mat4,
}

impl BoundaryFrame {
    pub fn new(polygons: Vec<Vec<[i32; 2]>>, image_to_world: Mat4) -> Result<Self> {
        let det = image_to_world.determinant();
        if !det.is_finite() || det.abs() < MIN_DETERMINANT {
            return Err(FlockError::SingularTransform);
        }
        Ok(Self {
            polygons,
            world_to_image: image_to_world.inverse(),
            image_to_world,
        })
    }

    /// Polygons already expressed in world coordinates.
    pub fn untransformed(polygons: Vec<Vec<[i32; 2]>>) -> Self {
        Self {
            polygons,
            image_to_world: Mat4::IDENTITY,
            world_to_image: Mat4::IDENTITY,
        }
    }

    pub fn polygons(&self) -> &[Vec<[i32; 2]>] {
        &self.polygons
    }

    pub fn edge_count(&self) -> usize {
        self.polygons.iter().map(|p| p.len().saturating_sub(1)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count() == 0
    }

    /// Maps a world position onto the image plane.
    pub fn to_image(&self, world: Vec3) -> Vec3 {
        let mut p = self.world_to_image.transform_point3(world);
        p.z = 0.0;
        p
    }

    /// Closest point on any edge to `point` (image space), with its squared
    /// distance.
    pub fn closest_point(&self, point: Vec3) -> Option<(Vec3, f32)> {
        let mut closest: Option<(Vec3, f32)> = None;

        for polygon in &self.polygons {
            for edge in polygon.windows(2) {
                let a = vec3(edge[0][0] as f32, edge[0][1] as f32, 0.0);
                let b = vec3(edge[1][0] as f32, edge[1][1] as f32, 0.0);
                let candidate = closest_point_on_segment(a, b, point);
                let dist_sq = candidate.distance_squared(point);

                match closest {
                    Some((_, best)) if best <= dist_sq => {}
                    _ => closest = Some((candidate, dist_sq)),
                }
            }
        }

        closest
    }

    /// Pushes agents away from the nearest edge. `threshold_sq` is the
    /// squared image-space distance at which repulsion starts; the push
    /// grows linearly to `repel_strength` at contact. Returns the number of
    /// agents repelled.
    pub fn repel(&self, agents: &mut [Agent], threshold_sq: f32, repel_strength: f32) -> usize {
        if self.is_empty() || threshold_sq <= 0.0 {
            return 0;
        }

        let mut repelled = 0;

        for agent in agents.iter_mut() {
            let image_pos = self.to_image(agent.position);
            let Some((closest, dist_sq)) = self.closest_point(image_pos) else {
                continue;
            };

            if dist_sq < threshold_sq {
                let per = dist_sq / threshold_sq;
                let f = (1.0 - per) * repel_strength;
                let away = self.image_to_world.transform_vector3(image_pos - closest);
                let force = unit_or(away, Vec3::ZERO) * f;

                trace!(dist_sq, force = ?force, "silhouette repulsion");

                agent.apply_force(force);
                repelled += 1;
            }
        }

        repelled
    }
}

/// Closest point to `p` on the segment `a..b`. Degenerate segments return
/// `a`.
pub fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= 0.0 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}
