// Physics system using rapier3d

mod backend;
pub mod body;
mod collision;
mod world;

pub use backend::{BodyHandle, BodyPose, PhysicsBackend, PhysicsError};
pub use world::{PhysicsWorld, DEFAULT_GRAVITY};
