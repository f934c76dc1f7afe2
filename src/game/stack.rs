// Layer entity and the ordered tower of layers

use glam::Vec3;

use crate::engine::physics::{BodyHandle, PhysicsBackend};

use super::error::GameError;
use super::geometry::{compute_cut, Axis, Cut, CutResult};

/// Number of layers seeded at the start of every session (foundation + first mover)
pub const SEEDED_LAYERS: usize = 2;

/// A box in the tower
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Center of the box; `y` is fixed at creation
    pub position: Vec3,
    pub width: f32,
    pub depth: f32,
    /// Axis the layer was spawned sliding along (`None` for the foundation)
    axis: Option<Axis>,
    /// Whether the layer has been dropped and stopped sliding
    placed: bool,
    /// Body in the physics backend; the layer refers to it, the backend owns it
    body: BodyHandle,
}

impl Layer {
    /// Axis the layer is still sliding along, `None` once placed
    pub fn direction(&self) -> Option<Axis> {
        if self.placed {
            None
        } else {
            self.axis
        }
    }

    /// Axis the layer originally slid along
    pub fn travel_axis(&self) -> Option<Axis> {
        self.axis
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Footprint extent along `axis`
    pub fn extent(&self, axis: Axis) -> f32 {
        axis.extent(self.width, self.depth)
    }

    fn half_extents(&self, box_height: f32) -> Vec3 {
        Vec3::new(self.width / 2.0, box_height / 2.0, self.depth / 2.0)
    }
}

/// Ordered tower of layers, foundation first.
///
/// Append-only apart from [`pop_top`](LayerStack::pop_top) on a miss and the
/// full drain on restart. Layer positions are authoritative here and pushed to
/// the physics backend, never read back.
#[derive(Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    box_height: f32,
}

impl LayerStack {
    pub fn new(box_height: f32) -> Self {
        Self {
            layers: Vec::new(),
            box_height,
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Height of the top face of the tower
    pub fn height(&self) -> f32 {
        self.layers.len() as f32 * self.box_height
    }

    /// Append a layer one level above the current top
    pub fn push<P: PhysicsBackend>(
        &mut self,
        physics: &mut P,
        x: f32,
        z: f32,
        width: f32,
        depth: f32,
        direction: Option<Axis>,
    ) -> Result<&Layer, GameError> {
        if let (Some(axis), Some(top)) = (direction, self.layers.last()) {
            if top.axis == Some(axis) {
                return Err(GameError::invariant(format!(
                    "layer {} would slide along {:?} like the one below",
                    self.layers.len(),
                    axis
                )));
            }
        }

        let y = self.box_height * self.layers.len() as f32;
        let position = Vec3::new(x, y, z);
        let half_extents = Vec3::new(width / 2.0, self.box_height / 2.0, depth / 2.0);
        let body = physics.create_body(position, half_extents, 0.0)?;

        self.layers.push(Layer {
            position,
            width,
            depth,
            axis: direction,
            placed: direction.is_none(),
            body,
        });
        log::debug!(
            "Pushed layer {} at ({:.2}, {:.2}, {:.2}) size {:.2}x{:.2} sliding {:?}",
            self.layers.len() - 1,
            x,
            y,
            z,
            width,
            depth,
            direction
        );

        Ok(&self.layers[self.layers.len() - 1])
    }

    pub fn top(&self) -> Result<&Layer, GameError> {
        self.require_pair()?;
        Ok(&self.layers[self.layers.len() - 1])
    }

    pub fn second_from_top(&self) -> Result<&Layer, GameError> {
        self.require_pair()?;
        Ok(&self.layers[self.layers.len() - 2])
    }

    fn require_pair(&self) -> Result<(), GameError> {
        if self.layers.len() < 2 {
            return Err(GameError::invariant(format!(
                "stack has {} layer(s), need at least 2",
                self.layers.len()
            )));
        }
        Ok(())
    }

    fn sliding_top_mut(&mut self) -> Result<(&mut Layer, Axis), GameError> {
        self.require_pair()?;
        let top = self
            .layers
            .last_mut()
            .ok_or_else(|| GameError::invariant("empty stack"))?;
        let axis = top
            .direction()
            .ok_or_else(|| GameError::invariant("top layer is not sliding"))?;
        Ok((top, axis))
    }

    /// Cut the sliding top layer against the layer below it
    pub fn compute_top_cut(&self) -> Result<CutResult, GameError> {
        let top = self.top()?;
        let previous = self.second_from_top()?;
        let axis = top
            .direction()
            .ok_or_else(|| GameError::invariant("top layer is not sliding"))?;

        Ok(compute_cut(
            axis.component(top.position),
            axis.component(previous.position),
            top.extent(axis),
        ))
    }

    /// Slide the top layer by `distance` along its axis, returns its new coordinate
    pub fn advance_top<P: PhysicsBackend>(
        &mut self,
        physics: &mut P,
        distance: f32,
    ) -> Result<f32, GameError> {
        let (top, axis) = self.sliding_top_mut()?;
        *axis.component_mut(&mut top.position) += distance;
        physics.set_body_translation(top.body, top.position)?;
        Ok(axis.component(top.position))
    }

    /// Shrink the top layer to the overlap and settle it.
    ///
    /// The collision shape is replaced, never rescaled.
    pub fn apply_cut<P: PhysicsBackend>(
        &mut self,
        physics: &mut P,
        cut: &Cut,
    ) -> Result<&Layer, GameError> {
        if !(cut.new_size > 0.0) {
            return Err(GameError::invariant(format!(
                "cut would leave a layer of size {}",
                cut.new_size
            )));
        }

        let box_height = self.box_height;
        let (top, axis) = self.sliding_top_mut()?;
        match axis {
            Axis::X => top.width = cut.new_size,
            Axis::Z => top.depth = cut.new_size,
        }
        *axis.component_mut(&mut top.position) += cut.survivor_shift;
        top.placed = true;

        physics.set_body_translation(top.body, top.position)?;
        physics.replace_shape(top.body, top.half_extents(box_height))?;

        Ok(&*top)
    }

    /// Remove the top layer; its body handle moves to the caller
    pub fn pop_top(&mut self) -> Result<Layer, GameError> {
        self.require_pair()?;
        self.layers
            .pop()
            .ok_or_else(|| GameError::invariant("empty stack"))
    }

    /// Release every layer's body and empty the stack.
    ///
    /// Keeps going past failures so one bad handle can't leak the rest; the
    /// first error is returned.
    pub fn clear<P: PhysicsBackend>(&mut self, physics: &mut P) -> Result<(), GameError> {
        let mut first_error = None;
        for layer in self.layers.drain(..) {
            if let Err(err) = physics.remove_body(layer.body) {
                log::warn!("Failed to release layer body {}: {}", layer.body, err);
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
