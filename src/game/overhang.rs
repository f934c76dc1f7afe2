// Falling debris cut off the tower

use glam::{Quat, Vec3};

use crate::engine::physics::{BodyHandle, PhysicsBackend};

use super::config::{GameConfig, OverhangPolicy};
use super::error::GameError;
use super::stack::Layer;

/// A detached fragment.
///
/// Its pose is owned by the physics body and copied back every tick; the
/// record is only written by the core at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Overhang {
    pub position: Vec3,
    pub orientation: Quat,
    pub width: f32,
    pub depth: f32,
    /// `None` once frozen into decoration
    body: Option<BodyHandle>,
    /// Seconds spent simulated
    age: f32,
}

impl Overhang {
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    /// Whether the fragment has left the simulation for good
    pub fn is_frozen(&self) -> bool {
        self.body.is_none()
    }

    pub fn age(&self) -> f32 {
        self.age
    }
}

/// Outcome of one [`OverhangSet::prune`] pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneReport {
    pub despawned: usize,
    pub frozen: usize,
}

/// Unordered collection of falling overhangs
#[derive(Debug)]
pub struct OverhangSet {
    members: Vec<Overhang>,
    policy: OverhangPolicy,
    despawn_y: f32,
    rest_y: f32,
    max_age: f32,
    base_mass: f32,
    box_size: f32,
    box_height: f32,
}

impl OverhangSet {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            members: Vec::new(),
            policy: config.overhang_policy,
            despawn_y: config.despawn_y(),
            rest_y: config.rest_y(),
            max_age: config.overhang_max_age,
            base_mass: config.overhang_mass,
            box_size: config.box_size,
            box_height: config.box_height,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overhang> {
        self.members.iter()
    }

    /// Members still driven by the physics engine
    pub fn simulated_count(&self) -> usize {
        self.members.iter().filter(|m| !m.is_frozen()).count()
    }

    /// Mass scaled by footprint, so a full-size fragment weighs `base_mass`
    pub fn mass_for(&self, width: f32, depth: f32) -> f32 {
        self.base_mass * (width / self.box_size) * (depth / self.box_size)
    }

    /// Spawn a new falling fragment centered at `(x, y, z)`
    pub fn add<P: PhysicsBackend>(
        &mut self,
        physics: &mut P,
        x: f32,
        z: f32,
        width: f32,
        depth: f32,
        y: f32,
    ) -> Result<&Overhang, GameError> {
        let position = Vec3::new(x, y, z);
        let half_extents = Vec3::new(width / 2.0, self.box_height / 2.0, depth / 2.0);
        let body = physics.create_body(position, half_extents, self.mass_for(width, depth))?;

        log::debug!(
            "Overhang {:.2}x{:.2} spawned at ({:.2}, {:.2}, {:.2})",
            width,
            depth,
            x,
            y,
            z
        );
        Ok(self.push(position, width, depth, body))
    }

    /// Take over a layer that slid off the tower; its body becomes dynamic
    /// instead of being recreated
    pub fn adopt<P: PhysicsBackend>(
        &mut self,
        physics: &mut P,
        layer: Layer,
    ) -> Result<&Overhang, GameError> {
        let mass = self.mass_for(layer.width, layer.depth);
        physics.make_dynamic(layer.body(), mass)?;
        Ok(self.push(layer.position, layer.width, layer.depth, layer.body()))
    }

    fn push(&mut self, position: Vec3, width: f32, depth: f32, body: BodyHandle) -> &Overhang {
        self.members.push(Overhang {
            position,
            orientation: Quat::IDENTITY,
            width,
            depth,
            body: Some(body),
            age: 0.0,
        });
        &self.members[self.members.len() - 1]
    }

    /// Copy every simulated member's pose from its physics body
    pub fn sync_from_physics<P: PhysicsBackend>(&mut self, physics: &P) -> Result<(), GameError> {
        for member in &mut self.members {
            if let Some(body) = member.body {
                let pose = physics.read_body(body)?;
                member.position = pose.position;
                member.orientation = pose.orientation;
            }
        }
        Ok(())
    }

    /// Age members by `dt` and retire the ones that fell far enough or lived
    /// too long.
    ///
    /// Records are partitioned before any body is released, so no index is
    /// reused after a removal.
    pub fn prune<P: PhysicsBackend>(
        &mut self,
        physics: &mut P,
        dt: f32,
    ) -> Result<PruneReport, GameError> {
        let mut report = PruneReport::default();
        let mut released = Vec::new();
        let mut kept = Vec::with_capacity(self.members.len());

        for mut member in self.members.drain(..) {
            let Some(body) = member.body else {
                kept.push(member);
                continue;
            };

            member.age += dt;
            let expired = member.age > self.max_age;

            match self.policy {
                OverhangPolicy::Despawn => {
                    if expired || member.position.y < self.despawn_y {
                        released.push(body);
                        report.despawned += 1;
                    } else {
                        kept.push(member);
                    }
                }
                OverhangPolicy::Freeze => {
                    if expired || member.position.y < self.rest_y {
                        released.push(body);
                        member.body = None;
                        report.frozen += 1;
                    }
                    kept.push(member);
                }
            }
        }
        self.members = kept;

        release_all(physics, released)?;
        Ok(report)
    }

    /// Release every body and drop all records
    pub fn clear<P: PhysicsBackend>(&mut self, physics: &mut P) -> Result<(), GameError> {
        let bodies = self.members.drain(..).filter_map(|m| m.body).collect();
        release_all(physics, bodies)
    }
}

fn release_all<P: PhysicsBackend>(
    physics: &mut P,
    bodies: Vec<BodyHandle>,
) -> Result<(), GameError> {
    let mut first_error = None;
    for body in bodies {
        if let Err(err) = physics.remove_body(body) {
            log::warn!("Failed to release overhang body {}: {}", body, err);
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
