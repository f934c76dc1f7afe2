use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use std::collections::HashMap;

use super::backend::{check_half_extents, BodyHandle, BodyPose, PhysicsBackend, PhysicsError};
use super::body::presets;

/// Default downward acceleration (units/s²)
pub const DEFAULT_GRAVITY: Real = 10.0;

/// Rapier bookkeeping behind one [`BodyHandle`]
#[derive(Debug, Clone, Copy)]
struct BodyEntry {
    rigid_body: RigidBodyHandle,
    collider: ColliderHandle,
    /// Explicit collider mass, `None` for kinematic bodies
    mass: Option<Real>,
}

/// Physics world that manages all physics simulation
pub struct PhysicsWorld {
    /// Gravity vector (default: -10 units/s² along y)
    gravity: Vector<Real>,

    /// Integration parameters for the physics simulation
    integration_parameters: IntegrationParameters,

    /// Physics pipeline handles collision detection and solving
    physics_pipeline: PhysicsPipeline,

    /// Island manager for sleeping bodies
    island_manager: IslandManager,

    /// Broad phase collision detection
    broad_phase: DefaultBroadPhase,

    /// Narrow phase collision detection
    narrow_phase: NarrowPhase,

    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,

    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,

    /// CCD solver for fast-moving objects
    ccd_solver: CCDSolver,

    /// Rigid body set
    rigid_body_set: RigidBodySet,

    /// Collider set
    collider_set: ColliderSet,

    /// Mapping from game-facing handles to rapier handles
    bodies: HashMap<BodyHandle, BodyEntry>,

    /// Next handle id to hand out
    next_handle: u64,
}

impl PhysicsWorld {
    /// Create a new physics world with default settings
    pub fn new() -> Self {
        Self::with_gravity(DEFAULT_GRAVITY)
    }

    /// Create a new physics world pulling bodies down with `gravity`
    pub fn with_gravity(gravity: Real) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = 1.0 / 60.0;

        Self {
            gravity: vector![0.0, -gravity, 0.0],
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            bodies: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Get current gravity
    pub fn gravity(&self) -> Vec3 {
        Vec3::new(self.gravity.x, self.gravity.y, self.gravity.z)
    }

    /// Get the last timestep used
    pub fn timestep(&self) -> Real {
        self.integration_parameters.dt
    }

    fn entry(&self, handle: BodyHandle) -> Result<BodyEntry, PhysicsError> {
        self.bodies
            .get(&handle)
            .copied()
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        let entry = self.entry(handle)?;
        self.rigid_body_set
            .get_mut(entry.rigid_body)
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    /// Swap the collider of `handle` for a new box, keeping or overriding the mass
    fn attach_box(
        &mut self,
        handle: BodyHandle,
        half_extents: Vec3,
        mass: Option<Real>,
    ) -> Result<(), PhysicsError> {
        let mut entry = self.entry(handle)?;

        self.collider_set.remove(
            entry.collider,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            true, // wake up attached body
        );

        let collider = match mass {
            Some(mass) => {
                presets::debris_collider(half_extents.x, half_extents.y, half_extents.z, mass)
            }
            None => presets::layer_collider(half_extents.x, half_extents.y, half_extents.z),
        };
        entry.collider = self.collider_set.insert_with_parent(
            collider,
            entry.rigid_body,
            &mut self.rigid_body_set,
        );
        entry.mass = mass;
        self.bodies.insert(handle, entry);
        Ok(())
    }

    /// Current half extents of a body's box collider
    pub fn half_extents(&self, handle: BodyHandle) -> Result<Vec3, PhysicsError> {
        let entry = self.entry(handle)?;
        let cuboid = self
            .collider_set
            .get(entry.collider)
            .and_then(|collider| collider.shape().as_cuboid())
            .ok_or(PhysicsError::UnknownBody(handle))?;
        let half = cuboid.half_extents;
        Ok(Vec3::new(half.x, half.y, half.z))
    }

    /// Whether a body is currently simulated as dynamic
    pub fn is_dynamic(&self, handle: BodyHandle) -> Result<bool, PhysicsError> {
        let entry = self.entry(handle)?;
        self.rigid_body_set
            .get(entry.rigid_body)
            .map(|body| body.is_dynamic())
            .ok_or(PhysicsError::UnknownBody(handle))
    }
}

impl PhysicsBackend for PhysicsWorld {
    fn create_body(
        &mut self,
        position: Vec3,
        half_extents: Vec3,
        mass: f32,
    ) -> Result<BodyHandle, PhysicsError> {
        check_half_extents(half_extents)?;
        if !mass.is_finite() {
            return Err(PhysicsError::InvalidMass(mass));
        }

        let (body, collider, mass) = if mass > 0.0 {
            (
                presets::debris_body(position.x, position.y, position.z),
                presets::debris_collider(half_extents.x, half_extents.y, half_extents.z, mass),
                Some(mass),
            )
        } else {
            (
                presets::layer_body(position.x, position.y, position.z),
                presets::layer_collider(half_extents.x, half_extents.y, half_extents.z),
                None,
            )
        };

        let rigid_body = self.rigid_body_set.insert(body);
        let collider =
            self.collider_set
                .insert_with_parent(collider, rigid_body, &mut self.rigid_body_set);

        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(
            handle,
            BodyEntry {
                rigid_body,
                collider,
                mass,
            },
        );
        Ok(handle)
    }

    fn set_gravity(&mut self, gravity: f32) {
        self.gravity = vector![0.0, -gravity, 0.0];
    }

    fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        if dt == 0.0 {
            return Ok(());
        }

        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        Ok(())
    }

    fn read_body(&self, handle: BodyHandle) -> Result<BodyPose, PhysicsError> {
        let entry = self.entry(handle)?;
        let body = self
            .rigid_body_set
            .get(entry.rigid_body)
            .ok_or(PhysicsError::UnknownBody(handle))?;

        let translation = body.translation();
        let rotation = body.rotation();
        let pose = BodyPose {
            position: Vec3::new(translation.x, translation.y, translation.z),
            orientation: Quat::from_xyzw(rotation.i, rotation.j, rotation.k, rotation.w),
        };

        if pose.position.is_finite() && pose.orientation.is_finite() {
            Ok(pose)
        } else {
            Err(PhysicsError::NonFinitePose(handle))
        }
    }

    fn set_body_translation(
        &mut self,
        handle: BodyHandle,
        position: Vec3,
    ) -> Result<(), PhysicsError> {
        let body = self.body_mut(handle)?;
        let target = vector![position.x, position.y, position.z];
        if body.is_kinematic() {
            body.set_next_kinematic_translation(target);
        } else {
            body.set_translation(target, true);
        }
        Ok(())
    }

    fn replace_shape(
        &mut self,
        handle: BodyHandle,
        half_extents: Vec3,
    ) -> Result<(), PhysicsError> {
        check_half_extents(half_extents)?;
        let mass = self.entry(handle)?.mass;
        self.attach_box(handle, half_extents, mass)
    }

    fn make_dynamic(&mut self, handle: BodyHandle, mass: f32) -> Result<(), PhysicsError> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }
        let half_extents = self.half_extents(handle)?;
        let mut entry = self.entry(handle)?;

        // Retyping a moving kinematic body in place leaves it in the island
        // manager's kinematic set, so swap in a fresh dynamic body instead.
        let old = self
            .rigid_body_set
            .remove(
                entry.rigid_body,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true, // remove attached colliders
            )
            .ok_or(PhysicsError::UnknownBody(handle))?;

        let mut body = presets::debris_body(0.0, 0.0, 0.0);
        body.set_position(*old.position(), false);
        body.set_linvel(*old.linvel(), true);

        entry.rigid_body = self.rigid_body_set.insert(body);
        entry.collider = self.collider_set.insert_with_parent(
            presets::debris_collider(half_extents.x, half_extents.y, half_extents.z, mass),
            entry.rigid_body,
            &mut self.rigid_body_set,
        );
        entry.mass = Some(mass);
        self.bodies.insert(handle, entry);
        Ok(())
    }

    fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        let entry = self
            .bodies
            .remove(&handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;

        self.rigid_body_set.remove(
            entry.rigid_body,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true, // remove attached colliders
        );
        Ok(())
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
