// Overlap/cut geometry between the moving layer and the one below it

use glam::Vec3;

use crate::util::math::{approx_equal, sign_or_zero};

/// Overhangs thinner than this are not worth a physics body
pub const MIN_OVERHANG_SIZE: f32 = 1e-4;

/// Horizontal axis a layer slides along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Z,
}

impl Axis {
    /// The other horizontal axis
    pub fn flipped(self) -> Self {
        match self {
            Axis::X => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    /// Component of `v` along this axis
    pub fn component(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Z => v.z,
        }
    }

    /// Mutable component of `v` along this axis
    pub fn component_mut(self, v: &mut Vec3) -> &mut f32 {
        match self {
            Axis::X => &mut v.x,
            Axis::Z => &mut v.z,
        }
    }

    /// Pick the footprint extent measured along this axis
    pub fn extent(self, width: f32, depth: f32) -> f32 {
        match self {
            Axis::X => width,
            Axis::Z => depth,
        }
    }
}

/// The detached part of a cut layer, relative to the layer's pre-cut center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverhangCut {
    /// Offset from the moving layer's center before the cut
    pub shift: f32,
    /// Extent along the cut axis
    pub size: f32,
}

impl OverhangCut {
    /// Zero-volume fragment from a (near) perfect placement
    pub fn is_degenerate(&self) -> bool {
        self.size < MIN_OVERHANG_SIZE
    }
}

/// A successful cut
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cut {
    /// Surviving extent along the axis (the overlap)
    pub new_size: f32,
    /// Offset that re-centers the survivor over the overlap
    pub survivor_shift: f32,
    pub overhang: OverhangCut,
}

impl Cut {
    /// Whether the placement left nothing to cut off
    pub fn is_perfect(&self) -> bool {
        self.overhang.is_degenerate()
    }
}

/// Outcome of dropping the moving layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutResult {
    /// No overlap at all
    Miss,
    Cut(Cut),
}

/// Cut a layer of extent `size` centered at `top` against one centered at `previous`.
///
/// Pure: only the coordinates on the sliding axis and the moving layer's extent
/// along it matter.
pub fn compute_cut(top: f32, previous: f32, size: f32) -> CutResult {
    let delta = top - previous;
    let overhang_size = delta.abs();
    let overlap = size - overhang_size;

    if overlap <= 0.0 || approx_equal(overlap, 0.0, f32::EPSILON) {
        return CutResult::Miss;
    }

    let direction = sign_or_zero(delta);
    let survivor_shift = -delta / 2.0;
    // Centered between the overlap edge and the original edge, measured from the
    // survivor; rebased onto the pre-cut center
    let overhang_shift = survivor_shift + (overlap / 2.0 + overhang_size / 2.0) * direction;

    CutResult::Cut(Cut {
        new_size: overlap,
        survivor_shift,
        overhang: OverhangCut {
            shift: overhang_shift,
            size: overhang_size,
        },
    })
}
