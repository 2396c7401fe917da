//! Phong Material
//!
//! Shading coefficients plus up to three texture maps. Each map samples from a
//! fixed texture unit; the unit table is a protocol shared with the shaders
//! and is never negotiated at runtime:
//!
//! | Slot                  | Unit | Sampler uniform        |
//! |-----------------------|------|------------------------|
//! | Diffuse map           | 0    | `u_material.map_kD`    |
//! | Specular / roughness  | 1    | `u_material.map_nS`    |
//! | Normal map            | 2    | `u_material.map_norm`  |
//! | Shadow map            | 3    | `u_shadow_map`         |

use bitflags::bitflags;
use glam::Vec3;

use crate::renderer::core::context::{RenderContext, TextureId};
use crate::resources::uniforms::names;

/// Texture unit the shadow map is bound to during the main pass.
pub const SHADOW_MAP_UNIT: u32 = 3;

bitflags! {
    /// Which texture maps a material samples.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFeatures: u32 {
        const USE_MAP          = 1 << 0;
        const USE_SPECULAR_MAP = 1 << 1;
        const USE_NORMAL_MAP   = 1 << 2;
    }
}

/// A material texture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Diffuse,
    Specular,
    Normal,
}

impl TextureSlot {
    pub const ALL: [Self; 3] = [Self::Diffuse, Self::Specular, Self::Normal];

    /// Fixed texture unit of this slot.
    #[inline]
    #[must_use]
    pub fn unit(self) -> u32 {
        match self {
            Self::Diffuse => 0,
            Self::Specular => 1,
            Self::Normal => 2,
        }
    }

    /// Sampler uniform that receives [`unit`](Self::unit).
    #[inline]
    #[must_use]
    pub fn sampler_name(self) -> &'static str {
        match self {
            Self::Diffuse => names::MATERIAL_MAP_DIFFUSE,
            Self::Specular => names::MATERIAL_MAP_SPECULAR,
            Self::Normal => names::MATERIAL_MAP_NORMAL,
        }
    }

    #[inline]
    #[must_use]
    pub fn feature(self) -> MaterialFeatures {
        match self {
            Self::Diffuse => MaterialFeatures::USE_MAP,
            Self::Specular => MaterialFeatures::USE_SPECULAR_MAP,
            Self::Normal => MaterialFeatures::USE_NORMAL_MAP,
        }
    }
}

/// Blinn-Phong style material.
///
/// Owns its texture maps, so it is not `Clone`; drawables share one through
/// an `Arc`.
#[derive(Debug, PartialEq)]
pub struct Material {
    /// Ambient coefficient (`kA`).
    pub ambient: Vec3,
    /// Diffuse coefficient (`kD`).
    pub diffuse: Vec3,
    /// Specular coefficient (`kS`).
    pub specular: Vec3,
    pub shininess: f32,

    map: Option<TextureId>,
    specular_map: Option<TextureId>,
    normal_map: Option<TextureId>,
}

impl Material {
    #[must_use]
    pub fn new(ambient: Vec3, diffuse: Vec3, specular: Vec3, shininess: f32) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            shininess,
            map: None,
            specular_map: None,
            normal_map: None,
        }
    }

    /// Takes ownership of a diffuse map.
    #[must_use]
    pub fn with_map(mut self, texture: TextureId) -> Self {
        self.map = Some(texture);
        self
    }

    /// Takes ownership of a specular / roughness map.
    #[must_use]
    pub fn with_specular_map(mut self, texture: TextureId) -> Self {
        self.specular_map = Some(texture);
        self
    }

    /// Takes ownership of a normal map.
    #[must_use]
    pub fn with_normal_map(mut self, texture: TextureId) -> Self {
        self.normal_map = Some(texture);
        self
    }

    #[inline]
    #[must_use]
    pub fn has_map(&self) -> bool {
        self.map.is_some()
    }

    #[inline]
    #[must_use]
    pub fn has_specular_map(&self) -> bool {
        self.specular_map.is_some()
    }

    #[inline]
    #[must_use]
    pub fn has_normal_map(&self) -> bool {
        self.normal_map.is_some()
    }

    /// Whether any map is present. Decides the vertex stride of drawables using this material.
    #[inline]
    #[must_use]
    pub fn has_texture(&self) -> bool {
        self.has_map() || self.has_specular_map() || self.has_normal_map()
    }

    #[must_use]
    pub fn map(&self) -> Option<TextureId> {
        self.map
    }

    #[must_use]
    pub fn specular_map(&self) -> Option<TextureId> {
        self.specular_map
    }

    #[must_use]
    pub fn normal_map(&self) -> Option<TextureId> {
        self.normal_map
    }

    #[must_use]
    pub fn texture(&self, slot: TextureSlot) -> Option<TextureId> {
        match slot {
            TextureSlot::Diffuse => self.map,
            TextureSlot::Specular => self.specular_map,
            TextureSlot::Normal => self.normal_map,
        }
    }

    #[must_use]
    pub fn features(&self) -> MaterialFeatures {
        TextureSlot::ALL
            .into_iter()
            .filter(|slot| self.texture(*slot).is_some())
            .fold(MaterialFeatures::empty(), |acc, slot| acc | slot.feature())
    }

    /// Present maps in unit order.
    pub fn textures(&self) -> impl Iterator<Item = (TextureSlot, TextureId)> + '_ {
        TextureSlot::ALL
            .into_iter()
            .filter_map(|slot| self.texture(slot).map(|texture| (slot, texture)))
    }

    /// Deletes the owned texture maps.
    pub fn destroy(self, ctx: &mut dyn RenderContext) {
        for (_, texture) in self.textures() {
            ctx.delete_texture(texture);
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(Vec3::splat(0.1), Vec3::splat(0.8), Vec3::splat(0.5), 32.0)
    }
}
