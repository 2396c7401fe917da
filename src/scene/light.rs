//! Scene Lights
//!
//! The light description the shadow pass consumes from the scene. Shading
//! parameters such as color and intensity belong to the shaders and are not
//! carried here.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Directional,
    Point,
}

/// A light as handed over by the scene. Only shadow-casting directional
/// lights drive the shadow pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// World-space position; the shadow volume looks from here at the scene center.
    pub position: Vec3,
    pub kind: LightKind,

    pub cast_shadows: bool,
}

impl Light {
    /// A directional light; casts shadows unless turned off.
    #[must_use]
    pub fn new_directional(position: Vec3) -> Self {
        Self {
            position,
            kind: LightKind::Directional,
            cast_shadows: true,
        }
    }

    #[must_use]
    pub fn new_point(position: Vec3) -> Self {
        Self {
            position,
            kind: LightKind::Point,
            cast_shadows: false,
        }
    }

    #[must_use]
    pub fn with_cast_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_directional(&self) -> bool {
        self.kind == LightKind::Directional
    }
}

/// The first directional light that casts shadows.
#[must_use]
pub fn main_shadow_light(lights: &[Light]) -> Option<&Light> {
    lights
        .iter()
        .find(|light| light.is_directional() && light.cast_shadows)
}
