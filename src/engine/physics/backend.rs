use glam::{Quat, Vec3};
use std::fmt;

/// Opaque handle to a body owned by a physics backend.
///
/// Handles are never reused within one backend, so a stale handle is always
/// reported as [`PhysicsError::UnknownBody`] instead of aliasing a newer body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub(crate) u64);

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Position and orientation read back from the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    pub position: Vec3,
    pub orientation: Quat,
}

/// Physics backend failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("Unknown body: {0}")]
    UnknownBody(BodyHandle),

    #[error("Invalid box half extents: {0}")]
    InvalidShape(Vec3),

    #[error("Invalid body mass: {0}")]
    InvalidMass(f32),

    #[error("Invalid timestep: {0}")]
    InvalidTimestep(f32),

    #[error("Body {0} has a non-finite pose")]
    NonFinitePose(BodyHandle),

    #[error("Physics backend failure: {0}")]
    Backend(String),
}

/// The whole surface the game core needs from a rigid-body engine.
///
/// Every body is a single box. Collision shapes are immutable once attached,
/// so resizing is always a full replacement through [`replace_shape`].
///
/// [`replace_shape`]: PhysicsBackend::replace_shape
pub trait PhysicsBackend {
    /// Create a box body. `mass <= 0` gives a kinematic body the core moves
    /// by hand, `mass > 0` a dynamic body driven by gravity and contacts.
    fn create_body(
        &mut self,
        position: Vec3,
        half_extents: Vec3,
        mass: f32,
    ) -> Result<BodyHandle, PhysicsError>;

    /// Set the downward acceleration applied to dynamic bodies
    fn set_gravity(&mut self, gravity: f32);

    /// Advance the whole simulation by `dt` seconds
    fn step(&mut self, dt: f32) -> Result<(), PhysicsError>;

    /// Read the simulated pose of a body
    fn read_body(&self, handle: BodyHandle) -> Result<BodyPose, PhysicsError>;

    /// Force the position of a kinematic body
    fn set_body_translation(
        &mut self,
        handle: BodyHandle,
        position: Vec3,
    ) -> Result<(), PhysicsError>;

    /// Drop the body's collider and attach a fresh box of the given size
    fn replace_shape(&mut self, handle: BodyHandle, half_extents: Vec3)
        -> Result<(), PhysicsError>;

    /// Turn a kinematic body into a falling one with the given mass
    fn make_dynamic(&mut self, handle: BodyHandle, mass: f32) -> Result<(), PhysicsError>;

    /// Remove a body and its collider
    fn remove_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError>;

    /// Number of live bodies
    fn body_count(&self) -> usize;
}

/// Validate box half extents before they reach the engine
pub fn check_half_extents(half_extents: Vec3) -> Result<(), PhysicsError> {
    let valid = half_extents.is_finite() && half_extents.cmpgt(Vec3::ZERO).all();
    if valid {
        Ok(())
    } else {
        Err(PhysicsError::InvalidShape(half_extents))
    }
}
