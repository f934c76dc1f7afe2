use super::collision::CollisionGroups;
use rapier3d::prelude::*;

/// Linear damping applied to falling debris (light air resistance)
pub const DEBRIS_LINEAR_DAMPING: Real = 0.1;

/// Angular damping applied to falling debris
pub const DEBRIS_ANGULAR_DAMPING: Real = 0.5;

/// Builder for creating rigid bodies with common configurations
pub struct BodyBuilder {
    body_type: RigidBodyType,
    position: Isometry<Real>,
    gravity_scale: Real,
    can_sleep: bool,
}

impl BodyBuilder {
    /// Create a new dynamic body (affected by forces and collisions)
    pub fn new_dynamic() -> Self {
        Self {
            body_type: RigidBodyType::Dynamic,
            position: Isometry::identity(),
            gravity_scale: 1.0,
            can_sleep: true,
        }
    }

    /// Create a new kinematic position-based body (not affected by forces)
    pub fn new_kinematic_position_based() -> Self {
        Self {
            body_type: RigidBodyType::KinematicPositionBased,
            position: Isometry::identity(),
            gravity_scale: 0.0,
            can_sleep: false,
        }
    }

    /// Set the initial position of the body
    pub fn position(mut self, x: Real, y: Real, z: Real) -> Self {
        self.position = Isometry::translation(x, y, z);
        self
    }

    /// Build the rigid body
    pub fn build(self) -> RigidBody {
        let mut body = RigidBodyBuilder::new(self.body_type)
            .position(self.position)
            .gravity_scale(self.gravity_scale)
            .can_sleep(self.can_sleep)
            .build();

        if self.body_type == RigidBodyType::Dynamic {
            body.set_linear_damping(DEBRIS_LINEAR_DAMPING);
            body.set_angular_damping(DEBRIS_ANGULAR_DAMPING);
        }

        body
    }
}

/// Builder for box colliders
pub struct BoxColliderBuilder {
    half_extents: Vector<Real>,
    collision_groups: CollisionGroups,
    friction: Real,
    restitution: Real,
    mass: Option<Real>,
}

impl BoxColliderBuilder {
    /// Create a box-shaped collider
    pub fn new(half_x: Real, half_y: Real, half_z: Real) -> Self {
        Self {
            half_extents: vector![half_x, half_y, half_z],
            collision_groups: CollisionGroups::Stack,
            friction: 0.5,
            restitution: 0.0,
            mass: None,
        }
    }

    /// Set the collision groups for filtering
    pub fn collision_groups(mut self, groups: CollisionGroups) -> Self {
        self.collision_groups = groups;
        self
    }

    /// Set friction coefficient (0.0 = no friction, 1.0 = high friction)
    pub fn friction(mut self, friction: Real) -> Self {
        self.friction = friction;
        self
    }

    /// Set restitution/bounciness (0.0 = no bounce, 1.0 = perfect bounce)
    pub fn restitution(mut self, restitution: Real) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set mass directly instead of deriving it from volume
    pub fn mass(mut self, mass: Option<Real>) -> Self {
        self.mass = mass;
        self
    }

    /// Build the collider
    pub fn build(self) -> Collider {
        let shape = SharedShape::cuboid(
            self.half_extents.x,
            self.half_extents.y,
            self.half_extents.z,
        );
        let builder = ColliderBuilder::new(shape)
            .collision_groups(self.collision_groups.to_interaction_groups())
            .friction(self.friction)
            .restitution(self.restitution);

        match self.mass {
            Some(mass) => builder.mass(mass).build(),
            None => builder.build(),
        }
    }
}

/// Body and collider configurations for the tower
pub mod presets {
    use super::*;

    /// A layer body: kinematic, moved by the game core
    pub fn layer_body(x: Real, y: Real, z: Real) -> RigidBody {
        BodyBuilder::new_kinematic_position_based()
            .position(x, y, z)
            .build()
    }

    /// A layer collider
    pub fn layer_collider(half_x: Real, half_y: Real, half_z: Real) -> Collider {
        BoxColliderBuilder::new(half_x, half_y, half_z)
            .collision_groups(CollisionGroups::Stack)
            .friction(0.6)
            .build()
    }

    /// A falling fragment body
    pub fn debris_body(x: Real, y: Real, z: Real) -> RigidBody {
        BodyBuilder::new_dynamic().position(x, y, z).build()
    }

    /// A falling fragment collider with an explicit mass
    pub fn debris_collider(half_x: Real, half_y: Real, half_z: Real, mass: Real) -> Collider {
        BoxColliderBuilder::new(half_x, half_y, half_z)
            .collision_groups(CollisionGroups::Debris)
            .friction(0.4)
            .restitution(0.1)
            .mass(Some(mass))
            .build()
    }
}
