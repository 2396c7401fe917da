//! Shadow Frame
//!
//! Runs one two-pass frame against a [`ShadowMapper`]:
//!
//! 1. `prepare` the shadow target from the light and the scene framing
//! 2. depth-only draw of every caster
//! 3. `finalize`, also when a caster failed
//! 4. restore the main viewport and draw every receiver with the shadow params
//!
//! Without a shadow-casting directional light, steps 1 to 3 are skipped and
//! receivers are drawn unshadowed.

use glam::Vec3;

use crate::errors::Result;
use crate::renderer::core::context::{RenderContext, Viewport};
use crate::renderer::drawable::Renderable;
use crate::renderer::graph::shadow::{ShadowMapper, ShadowParams};
use crate::renderer::graph::shadow_utils::{SceneExtent, SceneFraming};
use crate::resources::shader::Shader;
use crate::scene::light::Light;

/// What a frame drew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub casters_drawn: usize,
    pub receivers_drawn: usize,
    /// Receivers got shadow params.
    pub shadowed: bool,
}

/// Inputs of one frame. Built per frame, nothing is retained.
pub struct ShadowFrame<'a> {
    pub light: Option<&'a Light>,
    pub scene_center: Vec3,
    pub extent: SceneExtent,
    /// Viewport of the default target, restored before the main pass.
    pub main_viewport: Viewport,
    pub casters: &'a [&'a dyn Renderable],
    pub receivers: &'a [&'a dyn Renderable],
}

impl<'a> ShadowFrame<'a> {
    /// A frame without a light; add one with [`with_light`](Self::with_light).
    #[must_use]
    pub fn new(
        main_viewport: Viewport,
        casters: &'a [&'a dyn Renderable],
        receivers: &'a [&'a dyn Renderable],
    ) -> Self {
        let framing = SceneFraming::default();
        Self {
            light: None,
            scene_center: framing.center,
            extent: framing.uniform_extent(),
            main_viewport,
            casters,
            receivers,
        }
    }

    #[must_use]
    pub fn with_light(
        mut self,
        light: Option<&'a Light>,
        scene_center: Vec3,
        extent: impl Into<SceneExtent>,
    ) -> Self {
        self.light = light;
        self.scene_center = scene_center;
        self.extent = extent.into();
        self
    }

    /// Uses `framing`'s center and a light volume fitted to its bounds.
    #[must_use]
    pub fn with_framing(mut self, light: Option<&'a Light>, framing: &SceneFraming) -> Self {
        self.light = light;
        self.scene_center = framing.center;
        self.extent = match light {
            Some(light) => framing.fit_for_light(light.position),
            None => framing.uniform_extent(),
        };
        self
    }

    pub fn execute(
        &self,
        ctx: &mut dyn RenderContext,
        mapper: &mut ShadowMapper,
        depth_shader: &Shader,
    ) -> Result<FrameStats> {
        let mut stats = FrameStats::default();

        let params = match self.light {
            Some(light) if light.is_directional() && light.cast_shadows => {
                let params = mapper.prepare(ctx, light.position, self.scene_center, self.extent)?;
                let drawn = self.draw_casters(ctx, depth_shader, &params);
                mapper.finalize(ctx);
                stats.casters_drawn = drawn?;
                Some(params)
            }
            Some(_) => {
                log::debug!("ShadowFrame: light casts no directional shadow, skipping depth pass");
                None
            }
            None => None,
        };

        ctx.set_viewport(self.main_viewport);
        for receiver in self.receivers {
            receiver.issue_draw(ctx, params.as_ref())?;
            stats.receivers_drawn += 1;
        }

        stats.shadowed = params.is_some();
        log::trace!("ShadowFrame: {stats:?}");
        Ok(stats)
    }

    fn draw_casters(
        &self,
        ctx: &mut dyn RenderContext,
        depth_shader: &Shader,
        params: &ShadowParams,
    ) -> Result<usize> {
        for caster in self.casters {
            caster.render_shadow(ctx, depth_shader, params.light_space_matrix)?;
        }
        Ok(self.casters.len())
    }
}
