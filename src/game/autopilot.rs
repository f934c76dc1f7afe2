// Robot driver for attract mode and assisted play

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::config::AutopilotAnchor;
use super::error::GameError;
use super::stack::Layer;

/// What the autopilot wants to do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutopilotDecision {
    /// Keep sliding; `false` means fire the drop trigger now
    pub should_advance: bool,
}

/// Decide whether the sliding `top` layer has reached its drop point.
///
/// The drop point is `precision` measured from the anchor, so a precision of
/// zero with an origin anchor drops exactly at world zero.
pub fn decide(
    top: &Layer,
    previous: &Layer,
    precision: f32,
    anchor: AutopilotAnchor,
) -> Result<AutopilotDecision, GameError> {
    let axis = top
        .direction()
        .ok_or_else(|| GameError::invariant("autopilot asked to drive a placed layer"))?;

    let base = match anchor {
        AutopilotAnchor::Origin => 0.0,
        AutopilotAnchor::PreviousLayer => axis.component(previous.position),
    };

    Ok(AutopilotDecision {
        should_advance: axis.component(top.position) < base + precision,
    })
}

/// Seeded autopilot holding the current precision roll
#[derive(Debug)]
pub struct Autopilot {
    rng: Pcg32,
    max_error: f32,
    anchor: AutopilotAnchor,
    precision: f32,
}

impl Autopilot {
    pub fn new(seed: u64, max_error: f32, anchor: AutopilotAnchor) -> Self {
        let mut autopilot = Self {
            rng: Pcg32::seed_from_u64(seed),
            max_error,
            anchor,
            precision: 0.0,
        };
        autopilot.reroll();
        autopilot
    }

    /// Current signed placement error
    pub fn precision(&self) -> f32 {
        self.precision
    }

    /// Roll a fresh placement error; called after every placement
    pub fn reroll(&mut self) {
        self.precision = if self.max_error > 0.0 {
            self.rng.random_range(-self.max_error..=self.max_error)
        } else {
            0.0
        };
    }

    pub fn decide(&self, top: &Layer, previous: &Layer) -> Result<AutopilotDecision, GameError> {
        decide(top, previous, self.precision, self.anchor)
    }
}
