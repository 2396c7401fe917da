//! Binding Scopes
//!
//! RAII guards that pair every bind with its unbind. A guard borrows the
//! context mutably and dereferences to it, so nested scopes are opened from
//! the outer guard and closed in reverse order.

use std::ops::{Deref, DerefMut};

use crate::renderer::core::context::{BufferId, BufferTarget, RenderContext, VertexLayoutId};

/// Keeps a vertex layout and its element buffer bound.
///
/// On drop the layout is unbound first, then both buffer targets are cleared,
/// so the element binding recorded inside the layout is left untouched.
pub struct GeometryScope<'a, C: RenderContext + ?Sized> {
    ctx: &'a mut C,
}

impl<'a, C: RenderContext + ?Sized> GeometryScope<'a, C> {
    pub fn bind(ctx: &'a mut C, layout: VertexLayoutId, index_buffer: BufferId) -> Self {
        ctx.bind_vertex_layout(Some(layout));
        ctx.bind_buffer(BufferTarget::ElementArray, Some(index_buffer));
        Self { ctx }
    }
}

impl<C: RenderContext + ?Sized> Deref for GeometryScope<'_, C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<C: RenderContext + ?Sized> DerefMut for GeometryScope<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl<C: RenderContext + ?Sized> Drop for GeometryScope<'_, C> {
    fn drop(&mut self) {
        self.ctx.bind_vertex_layout(None);
        self.ctx.bind_buffer(BufferTarget::Array, None);
        self.ctx.bind_buffer(BufferTarget::ElementArray, None);
    }
}
