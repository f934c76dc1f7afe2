use rapier3d::prelude::*;

/// Collision groups for filtering what objects can collide with each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroups {
    /// Layers of the tower, including the foundation
    Stack = 0b0000_0001,

    /// Falling overhang fragments
    Debris = 0b0000_0010,
}

impl CollisionGroups {
    /// Convert to rapier3d's InteractionGroups
    pub fn to_interaction_groups(self) -> InteractionGroups {
        let memberships = Group::from_bits_truncate(self as u32);

        let filter = match self {
            // Kinematic layers never push each other, they only catch debris
            CollisionGroups::Stack => Group::from_bits_truncate(CollisionGroups::Debris as u32),

            // Debris lands on the tower and piles onto other debris
            CollisionGroups::Debris => Group::from_bits_truncate(
                CollisionGroups::Stack as u32 | CollisionGroups::Debris as u32,
            ),
        };

        InteractionGroups::new(memberships, filter)
    }
}
