//! Shader Interface
//!
//! A [`Shader`] wraps a program linked elsewhere together with its reflected
//! interface: the attribute locations and the typed uniform table. Both tables
//! are built once when the shader is constructed and shared by every drawable
//! that renders with it.
//!
//! Activation is scoped: [`Shader::activate`] returns an [`ActiveShader`]
//! guard that deactivates the program, and unbinds every texture unit it bound,
//! when dropped.
//!
//! ```rust,ignore
//! let mut active = shader.activate(ctx);
//! active.set_uniform(names::MODEL, model_matrix)?;
//! active.draw_elements(topology, count, wgpu::IndexFormat::Uint32, 0);
//! // program deactivated here
//! ```

use std::ops::{Deref, DerefMut};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::{PenumbraError, Result};
use crate::renderer::core::context::{ProgramId, RenderContext, TextureId};
use crate::resources::uniforms::{
    ResolvedUniform, UniformDescriptor, UniformLocation, UniformType, UniformValue,
};

/// Reflected inputs of a linked program.
#[derive(Debug, Clone, Default)]
pub struct ShaderInterface {
    pub attributes: Vec<(String, u32)>,
    pub uniforms: Vec<UniformDescriptor>,
}

impl ShaderInterface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, location: u32) -> Self {
        self.attributes.push((name.into(), location));
        self
    }

    #[must_use]
    pub fn with_uniform(mut self, name: impl Into<String>, location: u32, ty: UniformType) -> Self {
        self.uniforms.push(UniformDescriptor {
            name: name.into(),
            location: UniformLocation(location),
            ty,
        });
        self
    }
}

/// A linked program and its cached interface tables.
#[derive(Debug, Clone)]
pub struct Shader {
    label: String,
    program: ProgramId,
    attributes: FxHashMap<String, u32>,
    uniforms: FxHashMap<String, UniformDescriptor>,
}

impl Shader {
    #[must_use]
    pub fn new(label: impl Into<String>, program: ProgramId, interface: ShaderInterface) -> Self {
        let label = label.into();
        let attributes: FxHashMap<String, u32> = interface.attributes.into_iter().collect();

        let mut uniforms = FxHashMap::default();
        for descriptor in interface.uniforms {
            if let Some(previous) = uniforms.insert(descriptor.name.clone(), descriptor) {
                log::warn!(
                    "Shader '{label}' declares uniform '{}' twice; keeping the last declaration",
                    previous.name
                );
            }
        }

        log::debug!(
            "Shader '{label}' interface: {} attributes, {} uniforms",
            attributes.len(),
            uniforms.len()
        );

        Self {
            label,
            program,
            attributes,
            uniforms,
        }
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// Location of a vertex input, or `None` when the shader does not declare it.
    #[inline]
    #[must_use]
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    #[inline]
    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&UniformDescriptor> {
        self.uniforms.get(name)
    }

    #[inline]
    #[must_use]
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Resolves a uniform the caller is going to write with values of type `ty`.
    pub fn resolve_uniform(&self, name: &str, ty: UniformType) -> Result<ResolvedUniform> {
        let descriptor = self
            .uniforms
            .get(name)
            .ok_or_else(|| PenumbraError::MissingUniform {
                shader: self.label.clone(),
                name: name.to_owned(),
            })?;

        if !descriptor.ty.accepts(ty) {
            return Err(PenumbraError::UniformTypeMismatch {
                shader: self.label.clone(),
                name: name.to_owned(),
                expected: descriptor.ty,
                found: ty,
            });
        }

        Ok(ResolvedUniform {
            location: descriptor.location,
            ty: descriptor.ty,
        })
    }

    /// Like [`resolve_uniform`](Self::resolve_uniform), but an undeclared uniform is `Ok(None)`.
    pub fn resolve_optional_uniform(
        &self,
        name: &str,
        ty: UniformType,
    ) -> Result<Option<ResolvedUniform>> {
        if self.has_uniform(name) {
            self.resolve_uniform(name, ty).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Activates the program for the lifetime of the returned guard.
    pub fn activate<'a, C>(&'a self, ctx: &'a mut C) -> ActiveShader<'a, C>
    where
        C: RenderContext + ?Sized,
    {
        ctx.use_program(Some(self.program));
        ActiveShader {
            ctx,
            shader: self,
            bound_units: SmallVec::new(),
        }
    }
}

/// A shader bound to a context for the guard's lifetime.
///
/// Dereferences to the context so draws can be issued while the program is
/// active. Texture units bound through [`bind_texture`](Self::bind_texture)
/// are unbound on drop, before the program is deactivated.
pub struct ActiveShader<'a, C: RenderContext + ?Sized> {
    ctx: &'a mut C,
    shader: &'a Shader,
    bound_units: SmallVec<[u32; 4]>,
}

impl<C: RenderContext + ?Sized> ActiveShader<'_, C> {
    #[inline]
    #[must_use]
    pub fn shader(&self) -> &Shader {
        self.shader
    }

    /// Sets a uniform by name, checking it against the shader's table.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        let value = value.into();
        let resolved = self.shader.resolve_uniform(name, value.ty())?;
        self.ctx.set_uniform(resolved.location, value);
        Ok(())
    }

    /// Sets a uniform that was resolved beforehand.
    #[inline]
    pub fn set_resolved(&mut self, uniform: ResolvedUniform, value: impl Into<UniformValue>) {
        let value = value.into();
        debug_assert!(uniform.ty.accepts(value.ty()));
        self.ctx.set_uniform(uniform.location, value);
    }

    /// Binds `texture` to `unit`; the unit is released when the guard drops.
    pub fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.ctx.bind_texture(unit, Some(texture));
        if !self.bound_units.contains(&unit) {
            self.bound_units.push(unit);
        }
    }

    /// Units bound through this guard so far.
    #[must_use]
    pub fn bound_units(&self) -> &[u32] {
        &self.bound_units
    }
}

impl<C: RenderContext + ?Sized> Deref for ActiveShader<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<C: RenderContext + ?Sized> DerefMut for ActiveShader<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl<C: RenderContext + ?Sized> Drop for ActiveShader<'_, C> {
    fn drop(&mut self) {
        for unit in self.bound_units.drain(..) {
            self.ctx.bind_texture(unit, None);
        }
        self.ctx.use_program(None);
    }
}
