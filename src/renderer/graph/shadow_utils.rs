//! Shadow Utilities
//!
//! Pure math for the directional shadow pass, kept apart from the mapper so
//! it can be tested without a context.
//!
//! # Provided Functions
//!
//! - Orthographic light volumes, symmetric or explicit
//! - Light view / light-space matrix construction
//! - Tight fitting of the light volume to world-space bounds
//! - Scene framing (center + extent) from drawable bounds

use glam::{Mat4, Vec3, Vec4};

use crate::resources::geometry::BoundingBox;

/// Extent used when there is nothing to frame.
pub const DEFAULT_SCENE_EXTENT: f32 = 10.0;

/// Below this squared length a direction is treated as zero.
const DIRECTION_EPSILON: f32 = 1e-6;

// ============================================================================
// Orthographic Light Volume
// ============================================================================

/// Six planes of an orthographic light volume, in light view space.
///
/// `near` and `far` are distances along the view direction and may be
/// negative (planes behind the light).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl OrthoBounds {
    #[must_use]
    pub fn new(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
            near,
            far,
        }
    }

    /// `[-e, e]` on every axis.
    #[must_use]
    pub fn symmetric(extent: f32) -> Self {
        Self::new(-extent, extent, -extent, extent, -extent, extent)
    }

    /// True when any axis has zero (or inverted) span; such a volume has no
    /// finite projection.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.right <= self.left || self.top <= self.bottom || self.far <= self.near
    }

    /// GL clip-space orthographic projection (depth mapped to `[-1, 1]`).
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh_gl(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }
}

impl From<[f32; 6]> for OrthoBounds {
    fn from(v: [f32; 6]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }
}

/// How much of the scene the light volume covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneExtent {
    /// Symmetric volume, see [`OrthoBounds::symmetric`].
    Uniform(f32),
    /// Explicit six-plane volume, used verbatim.
    Bounds(OrthoBounds),
}

impl SceneExtent {
    #[must_use]
    pub fn ortho_bounds(self) -> OrthoBounds {
        match self {
            Self::Uniform(extent) => OrthoBounds::symmetric(extent),
            Self::Bounds(bounds) => bounds,
        }
    }
}

impl From<f32> for SceneExtent {
    fn from(extent: f32) -> Self {
        Self::Uniform(extent)
    }
}

impl From<OrthoBounds> for SceneExtent {
    fn from(bounds: OrthoBounds) -> Self {
        Self::Bounds(bounds)
    }
}

impl From<[f32; 6]> for SceneExtent {
    fn from(v: [f32; 6]) -> Self {
        Self::Bounds(v.into())
    }
}

// ============================================================================
// Light View
// ============================================================================

/// Normalized direction the light shines in, from `light_position` towards
/// `scene_center`. Zero when the two coincide.
#[must_use]
pub fn light_direction(light_position: Vec3, scene_center: Vec3) -> Vec3 {
    (scene_center - light_position).normalize_or_zero()
}

/// View matrix looking from the light at the scene center, with +Y as up.
///
/// When the view direction is parallel to +Y the side and up rows are zero
/// rather than NaN, leaving only depth along the view direction. Keeping the
/// light off the vertical is the caller's concern. A light that coincides
/// with the scene center yields the identity.
#[must_use]
pub fn light_view(light_position: Vec3, scene_center: Vec3) -> Mat4 {
    let back = light_position - scene_center;
    if back.length_squared() < DIRECTION_EPSILON {
        return Mat4::IDENTITY;
    }

    let z = back.normalize();
    let x = Vec3::Y.cross(z).normalize_or_zero();
    let y = z.cross(x).normalize_or_zero();

    Mat4::from_cols(
        Vec4::new(x.x, y.x, z.x, 0.0),
        Vec4::new(x.y, y.y, z.y, 0.0),
        Vec4::new(x.z, y.z, z.z, 0.0),
        Vec4::new(
            -x.dot(light_position),
            -y.dot(light_position),
            -z.dot(light_position),
            1.0,
        ),
    )
}

/// Whether the direction from the light to the scene center is parallel to
/// the +Y up vector, which collapses the light view onto its depth axis.
#[must_use]
pub fn is_view_degenerate(light_position: Vec3, scene_center: Vec3) -> bool {
    let dir = light_direction(light_position, scene_center);
    dir != Vec3::ZERO && Vec3::Y.cross(dir).try_normalize().is_none()
}

/// `projection * view` for the given light volume.
#[must_use]
pub fn light_space_matrix(
    light_position: Vec3,
    scene_center: Vec3,
    extent: impl Into<SceneExtent>,
) -> Mat4 {
    extent.into().ortho_bounds().projection() * light_view(light_position, scene_center)
}

/// Tightest light volume around `bounds` as seen from `light_position`
/// looking at `scene_center`.
///
/// `None` for an empty box, or when the fitted volume has no width, height
/// or depth (a flat box seen edge-on, or a vertical light).
#[must_use]
pub fn fit_ortho_bounds(
    light_position: Vec3,
    scene_center: Vec3,
    bounds: &BoundingBox,
) -> Option<OrthoBounds> {
    if bounds.is_empty() {
        return None;
    }

    let view = light_view(light_position, scene_center);
    let ls = bounds.transform(&view);

    // RH view space looks down -Z: ls.max.z is nearest to the light.
    let fitted = OrthoBounds::new(
        ls.min.x, ls.max.x, ls.min.y, ls.max.y, -ls.max.z, -ls.min.z,
    );
    (!fitted.is_degenerate()).then_some(fitted)
}

// ============================================================================
// Scene Framing
// ============================================================================

/// Center and extent of the region the shadow map must cover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneFraming {
    pub center: Vec3,
    /// Distance from `center` to the farthest bounds corner.
    pub extent: f32,
    pub bounds: BoundingBox,
}

impl SceneFraming {
    /// Frames the union of `bounds`; falls back to [`Default`] when every box is empty.
    pub fn from_bounds<'a>(bounds: impl IntoIterator<Item = &'a BoundingBox>) -> Self {
        let union = bounds
            .into_iter()
            .filter(|bb| !bb.is_empty())
            .fold(BoundingBox::EMPTY, |acc, bb| acc.union(bb));

        if union.is_empty() {
            log::debug!("SceneFraming: nothing to frame, using default extent");
            return Self::default();
        }

        Self {
            center: union.center(),
            extent: union.radius(),
            bounds: union,
        }
    }

    /// Symmetric volume around the framing.
    #[must_use]
    pub fn uniform_extent(&self) -> SceneExtent {
        SceneExtent::Uniform(self.extent)
    }

    /// Volume fitted tightly to the framed bounds for a light at `light_position`.
    ///
    /// Without bounds this is the uniform extent.
    #[must_use]
    pub fn fit_for_light(&self, light_position: Vec3) -> SceneExtent {
        fit_ortho_bounds(light_position, self.center, &self.bounds)
            .map_or_else(|| self.uniform_extent(), SceneExtent::Bounds)
    }
}

impl Default for SceneFraming {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            extent: DEFAULT_SCENE_EXTENT,
            bounds: BoundingBox::EMPTY,
        }
    }
}
