//! Parent-before-child composition of world transforms.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

use crate::body::{CelestialBody, SystemDescription};
use crate::error::SceneError;
use crate::kinematics::{self, LocalPose};

/// Index of a body in its [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub usize);

/// World-space state of one body for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneNode {
    pub id: BodyId,
    pub local: LocalPose,
    /// Frame of the parent body (identity for roots).
    pub parent_frame: Mat4,
    /// Frame this body passes on to its children: translated to the body and
    /// rotated into its orbital plane, without axial tilt or spin.
    /// The body's orbit angle is not part of it, so a moon's orbit keeps a
    /// fixed line of nodes instead of turning with its planet's revolution.
    pub frame: Mat4,
    pub world_position: Vec3,
    /// Full body orientation: inherited frame rotations, tilt and spin.
    pub world_orientation: Quat,
}

impl SceneNode {
    /// Model matrix of a sphere of `radius` turned by `orientation` within the frame.
    pub fn model(&self, orientation: Quat, radius: f32) -> Mat4 {
        self.frame * Mat4::from_scale_rotation_translation(Vec3::splat(radius), orientation, Vec3::ZERO)
    }

    /// Model matrix of the body itself.
    pub fn body_model(&self, radius: f32) -> Mat4 {
        self.model(self.local.orientation, radius)
    }

    /// Model matrix mapping the unit orbit loop onto this body's orbit.
    pub fn trail_model(&self, distance: f32) -> Mat4 {
        self.parent_frame
            * Mat4::from_scale_rotation_translation(
                Vec3::splat(distance),
                self.local.frame_rotation,
                Vec3::ZERO,
            )
    }
}

/// Validated body table with parents resolved and a topological evaluation order.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    description: SystemDescription,
    parents: Vec<Option<BodyId>>,
    order: Vec<BodyId>,
}

impl SceneGraph {
    /// Validate `description` and resolve its parent relation.
    pub fn build(description: SystemDescription) -> Result<Self, SceneError> {
        let bodies = &description.bodies;
        let mut index = HashMap::with_capacity(bodies.len());
        for (i, body) in bodies.iter().enumerate() {
            body.validate()?;
            if index.insert(body.name.as_str(), i).is_some() {
                return Err(SceneError::DuplicateBody(body.name.clone()));
            }
        }

        let mut parents = Vec::with_capacity(bodies.len());
        for body in bodies {
            let parent = match &body.parent {
                None => None,
                Some(name) => Some(BodyId(*index.get(name.as_str()).ok_or_else(|| {
                    SceneError::UnknownParent {
                        body: body.name.clone(),
                        parent: name.clone(),
                    }
                })?)),
            };
            parents.push(parent);
        }

        let order = topological_order(&parents, bodies)?;
        tracing::info!(
            "Scene built: {} bodies, {} roots, max depth {}",
            bodies.len(),
            parents.iter().filter(|p| p.is_none()).count(),
            max_depth(&parents)
        );

        Ok(Self {
            description,
            parents,
            order,
        })
    }

    pub fn description(&self) -> &SystemDescription {
        &self.description
    }

    pub fn bodies(&self) -> &[CelestialBody] {
        &self.description.bodies
    }

    pub fn body(&self, id: BodyId) -> &CelestialBody {
        &self.description.bodies[id.0]
    }

    pub fn parent(&self, id: BodyId) -> Option<BodyId> {
        self.parents[id.0]
    }

    pub fn find(&self, name: &str) -> Option<BodyId> {
        self.description
            .bodies
            .iter()
            .position(|b| b.name == name)
            .map(BodyId)
    }

    /// Evaluation order: every parent precedes its children.
    pub fn order(&self) -> &[BodyId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.description.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.description.bodies.is_empty()
    }

    /// World transforms of every body at `sim_time`, indexed by [`BodyId`].
    pub fn compose(&self, sim_time: f64) -> Vec<SceneNode> {
        let mut slots: Vec<Option<SceneNode>> = vec![None; self.len()];
        for &id in &self.order {
            let local = kinematics::evaluate(self.body(id), sim_time);
            let (parent_frame, parent_rotation) = self
                .parent(id)
                .and_then(|p| slots[p.0].as_ref())
                .map(|p| (p.frame, frame_rotation(&p.frame)))
                .unwrap_or((Mat4::IDENTITY, Quat::IDENTITY));

            let frame = parent_frame
                * Mat4::from_rotation_translation(local.frame_rotation, local.position);
            let world_position = frame.transform_point3(Vec3::ZERO);
            let world_orientation = parent_rotation * local.frame_rotation * local.orientation;

            slots[id.0] = Some(SceneNode {
                id,
                local,
                parent_frame,
                frame,
                world_position,
                world_orientation,
            });
        }
        slots.into_iter().flatten().collect()
    }
}

/// Rotation part of a frame built only from rotations and translations.
fn frame_rotation(frame: &Mat4) -> Quat {
    let (_, rotation, _) = frame.to_scale_rotation_translation();
    rotation
}

fn topological_order(
    parents: &[Option<BodyId>],
    bodies: &[CelestialBody],
) -> Result<Vec<BodyId>, SceneError> {
    let mut depth: Vec<Option<usize>> = vec![None; parents.len()];
    for start in 0..parents.len() {
        let mut path: Vec<usize> = Vec::new();
        let mut current = Some(start);
        // Depth of the last body on `path`.
        let mut d = loop {
            let Some(i) = current else { break 0 };
            if let Some(known) = depth[i] {
                break known + 1;
            }
            if let Some(pos) = path.iter().position(|&p| p == i) {
                let cycle = path[pos..]
                    .iter()
                    .map(|&j| bodies[j].name.clone())
                    .collect();
                return Err(SceneError::ParentCycle(cycle));
            }
            path.push(i);
            current = parents[i].map(|p| p.0);
        };
        for &i in path.iter().rev() {
            depth[i] = Some(d);
            d += 1;
        }
    }

    let mut order: Vec<BodyId> = (0..parents.len()).map(BodyId).collect();
    order.sort_by_key(|id| (depth[id.0], id.0));
    Ok(order)
}

fn max_depth(parents: &[Option<BodyId>]) -> usize {
    (0..parents.len())
        .map(|mut i| {
            let mut d = 0;
            while let Some(p) = parents[i] {
                i = p.0;
                d += 1;
            }
            d
        })
        .max()
        .unwrap_or(0)
}
