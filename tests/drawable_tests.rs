//! Drawable Tests
//!
//! Tests for:
//! - Construction validation (stride, index range, allocation failure)
//! - Planar vertex layout of basic drawables
//! - Draw issuance and binding discipline
//! - Shader swapping and attribute skipping
//! - Transform, draw mode and bounds
//! - Teardown

use std::sync::Arc;

use glam::{Mat4, Vec3};

use penumbra::errors::PenumbraError;
use penumbra::renderer::core::context::{BufferTarget, GpuObjectKind};
use penumbra::renderer::core::recording::{Command, RecordingContext};
use penumbra::renderer::drawable::{Drawable, DrawableDescriptor};
use penumbra::resources::geometry::DrawMode;
use penumbra::resources::shader::{Shader, ShaderInterface};
use penumbra::resources::uniforms::{UniformLocation, UniformType, UniformValue, names};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn basic_shader(ctx: &mut RecordingContext) -> Arc<Shader> {
    let program = ctx.register_program("basic");
    Arc::new(Shader::new(
        "basic",
        program,
        ShaderInterface::new()
            .with_attribute(names::POSITION, 0)
            .with_attribute(names::NORMAL, 1)
            .with_uniform(names::MODEL, 0, UniformType::Mat4),
    ))
}

/// Three triangles side by side: 9 vertices, planar positions then normals.
fn three_triangles() -> DrawableDescriptor {
    let mut positions = Vec::new();
    for t in 0..3 {
        let x = t as f32 * 2.0;
        positions.extend_from_slice(&[x, 0.0, 0.0, x + 1.0, 0.0, 0.0, x, 1.0, 0.0]);
    }
    let normals: Vec<f32> = std::iter::repeat_n([0.0, 0.0, 1.0], 9).flatten().collect();

    let mut vertices = positions;
    vertices.extend(normals);
    DrawableDescriptor::new("tris", vertices, (0..9).collect())
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn new_uploads_vertices_and_indices() -> anyhow::Result<()> {
    init_logger();
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    let drawable = Drawable::new(&mut ctx, three_triangles(), Some(shader))?;

    assert_eq!(drawable.vertex_count(), 9);
    assert_eq!(drawable.index_count(), 9);
    assert_eq!(ctx.buffer_data(drawable.vertex_buffer()).map(<[u8]>::len), Some(54 * 4));
    assert_eq!(ctx.buffer_data(drawable.index_buffer()).map(<[u8]>::len), Some(9 * 4));
    assert_eq!(ctx.buffer_target(drawable.vertex_buffer()), Some(BufferTarget::Array));
    assert_eq!(
        ctx.buffer_target(drawable.index_buffer()),
        Some(BufferTarget::ElementArray)
    );
    let layout = drawable.vertex_layout().expect("layout built");
    assert_eq!(ctx.layout_label(layout.id()), Some("tris Layout"));
    assert!(
        ctx.state().is_clean(),
        "Construction should leave nothing bound, got {:?}",
        ctx.state()
    );
    assert!(ctx.violations().is_empty(), "{:?}", ctx.violations());
    Ok(())
}

#[test]
fn new_rejects_vertex_data_of_wrong_stride() {
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    let desc = DrawableDescriptor::new("odd", vec![0.0; 55], vec![0]);

    let err = Drawable::new(&mut ctx, desc, Some(shader)).unwrap_err();
    assert_eq!(
        err,
        PenumbraError::VertexStrideMismatch {
            object: "odd".to_owned(),
            float_count: 55,
            stride_floats: 6,
        }
    );
    assert!(err.is_contract_violation());
    assert_eq!(ctx.live_objects(GpuObjectKind::Buffer), 0);
}

#[test]
fn new_rejects_index_past_vertex_count() {
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    let mut desc = three_triangles();
    desc.indices[4] = 9;

    let err = Drawable::new(&mut ctx, desc, Some(shader)).unwrap_err();
    assert_eq!(
        err,
        PenumbraError::IndexOutOfRange {
            object: "tris".to_owned(),
            index: 9,
            vertex_count: 9,
        }
    );
    assert_eq!(
        ctx.live_objects(GpuObjectKind::Buffer),
        0,
        "No buffer should be allocated for invalid indices"
    );
}

#[test]
fn new_releases_buffers_when_layout_allocation_fails() {
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    ctx.fail_next_allocation(GpuObjectKind::VertexLayout);

    let err = Drawable::new(&mut ctx, three_triangles(), Some(shader)).unwrap_err();
    assert!(err.is_resource_error(), "Expected a resource error, got {err:?}");
    assert_eq!(ctx.live_objects(GpuObjectKind::Buffer), 0);
    assert_eq!(ctx.live_objects(GpuObjectKind::VertexLayout), 0);
}

#[test]
fn new_fails_when_buffer_allocation_fails() {
    let mut ctx = RecordingContext::new();
    ctx.fail_next_allocation(GpuObjectKind::Buffer);

    let err = Drawable::new(&mut ctx, three_triangles(), None).unwrap_err();
    assert!(matches!(
        err,
        PenumbraError::ResourceCreationFailed {
            kind: GpuObjectKind::Buffer,
            ..
        }
    ));
    assert_eq!(ctx.live_objects(GpuObjectKind::Buffer), 0);
}

#[test]
fn new_requires_model_uniform() {
    let mut ctx = RecordingContext::new();
    let program = ctx.register_program("no-model");
    let shader = Arc::new(Shader::new(
        "no-model",
        program,
        ShaderInterface::new().with_attribute(names::POSITION, 0),
    ));

    let err = Drawable::new(&mut ctx, three_triangles(), Some(shader)).unwrap_err();
    assert_eq!(
        err,
        PenumbraError::MissingUniform {
            shader: "no-model".to_owned(),
            name: names::MODEL.to_owned(),
        }
    );
}

// ============================================================================
// Planar Layout
// ============================================================================

#[test]
fn planar_layout_places_normals_after_positions() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    let drawable = Drawable::new(&mut ctx, three_triangles(), Some(shader))?;

    let layout = drawable.vertex_layout().expect("layout built");
    let attributes = ctx.layout_attributes(layout.id()).expect("layout is live");
    assert_eq!(attributes.len(), 2);

    let position = attributes
        .iter()
        .find(|a| a.attribute.shader_location == 0)
        .expect("position enabled");
    let normal = attributes
        .iter()
        .find(|a| a.attribute.shader_location == 1)
        .expect("normal enabled");

    assert_eq!(position.attribute.offset, 0);
    assert_eq!(
        normal.attribute.offset,
        9 * 3 * 4,
        "Normals start after 9 positions of 12 bytes"
    );
    assert_eq!(position.stride, 12);
    assert_eq!(normal.stride, 12);
    assert_eq!(position.buffer, Some(drawable.vertex_buffer()));
    Ok(())
}

#[test]
fn layout_skips_attributes_the_shader_does_not_declare() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let program = ctx.register_program("position-only");
    let shader = Arc::new(Shader::new(
        "position-only",
        program,
        ShaderInterface::new()
            .with_attribute(names::POSITION, 2)
            .with_uniform(names::MODEL, 0, UniformType::Mat4),
    ));
    let drawable = Drawable::new(&mut ctx, three_triangles(), Some(shader))?;

    let layout = drawable.vertex_layout().expect("layout built");
    assert_eq!(layout.bound_attributes().len(), 1);
    assert!(layout.bound_attribute(names::NORMAL).is_none());

    let attributes = ctx.layout_attributes(layout.id()).expect("layout is live");
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].attribute.shader_location, 2);
    assert!(ctx.violations().is_empty(), "{:?}", ctx.violations());
    Ok(())
}

// ============================================================================
// Draws
// ============================================================================

#[test]
fn render_issues_one_draw_of_all_indices() -> anyhow::Result<()> {
    init_logger();
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    let drawable = Drawable::new(&mut ctx, three_triangles(), Some(shader.clone()))?;
    ctx.clear_commands();

    drawable.render(&mut ctx)?;

    let draws: Vec<_> = ctx.draw_calls().collect();
    assert_eq!(draws.len(), 1, "Exactly one indexed draw expected");
    let draw = draws[0];
    assert_eq!(draw.index_count, 9);
    assert_eq!(draw.topology, wgpu::PrimitiveTopology::TriangleList);
    assert_eq!(draw.index_format, wgpu::IndexFormat::Uint32);
    assert_eq!(draw.first_index_offset, 0);
    assert_eq!(
        draw.vertex_layout,
        drawable.vertex_layout().map(|layout| layout.id())
    );
    assert_eq!(draw.element_buffer, Some(drawable.index_buffer()));
    assert_eq!(draw.program, Some(shader.program()));
    assert!(
        draw.max_index.is_some_and(|max| (max as usize) < drawable.vertex_count()),
        "Draw must only read indices below the vertex count, got {:?}",
        draw.max_index
    );

    assert!(ctx.state().is_clean(), "Render left bindings: {:?}", ctx.state());
    assert!(ctx.violations().is_empty(), "{:?}", ctx.violations());
    Ok(())
}

#[test]
fn render_binds_then_unbinds_in_reverse_order() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    let drawable = Drawable::new(&mut ctx, three_triangles(), Some(shader.clone()))?;
    let layout = drawable.vertex_layout().expect("layout built").id();
    ctx.clear_commands();

    drawable.render(&mut ctx)?;

    let commands = ctx.commands();
    assert_eq!(commands[0], Command::BindVertexLayout(Some(layout)));
    assert_eq!(
        commands[1],
        Command::BindBuffer {
            target: penumbra::renderer::core::context::BufferTarget::ElementArray,
            buffer: Some(drawable.index_buffer()),
        }
    );
    assert_eq!(commands[2], Command::UseProgram(Some(shader.program())));

    let draw_at = commands
        .iter()
        .position(|c| matches!(c, Command::DrawElements(_)))
        .expect("draw recorded");
    let tail = &commands[draw_at + 1..];
    assert_eq!(tail[0], Command::UseProgram(None), "Shader is deactivated first");
    assert_eq!(tail[1], Command::BindVertexLayout(None));
    Ok(())
}

#[test]
fn render_pushes_model_matrix() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    let mut drawable = Drawable::new(&mut ctx, three_triangles(), Some(shader.clone()))?;
    let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    drawable.set_transformation(model);

    drawable.render(&mut ctx)?;

    assert_eq!(
        ctx.uniform(shader.program(), UniformLocation(0)),
        Some(UniformValue::Mat4(model))
    );
    Ok(())
}

#[test]
fn render_without_shader_is_a_contract_violation() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let drawable = Drawable::new(&mut ctx, three_triangles(), None)?;
    ctx.clear_commands();

    let err = drawable.render(&mut ctx).unwrap_err();
    assert_eq!(
        err,
        PenumbraError::MissingShader {
            object: "tris".to_owned()
        }
    );
    assert!(
        ctx.commands().is_empty(),
        "Nothing may be bound before the prerequisite check"
    );
    Ok(())
}

#[test]
fn render_uses_current_draw_mode() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    let mut drawable = Drawable::new(&mut ctx, three_triangles(), Some(shader))?;
    drawable.set_draw_mode(DrawMode::Points);

    drawable.render(&mut ctx)?;

    let draw = ctx.draw_calls().last().expect("draw recorded");
    assert_eq!(draw.topology, wgpu::PrimitiveTopology::PointList);
    assert_eq!(draw.index_count, 9);
    Ok(())
}

#[test]
fn render_shadow_uses_depth_shader_and_restores_state() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    let depth_program = ctx.register_program("depth");
    let depth = Shader::new(
        "depth",
        depth_program,
        ShaderInterface::new()
            .with_attribute(names::POSITION, 0)
            .with_uniform(names::LIGHT_SPACE_MATRIX, 0, UniformType::Mat4)
            .with_uniform(names::MODEL, 1, UniformType::Mat4),
    );
    let mut drawable = Drawable::new(&mut ctx, three_triangles(), Some(shader))?;
    let model = Mat4::from_scale(Vec3::splat(2.0));
    drawable.set_transformation(model);
    let lsm = Mat4::orthographic_rh_gl(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);

    drawable.render_shadow(&mut ctx, &depth, lsm)?;

    let draw = ctx.draw_calls().last().expect("draw recorded");
    assert_eq!(draw.program, Some(depth_program));
    assert_eq!(draw.index_count, 9);
    assert_eq!(
        ctx.uniform(depth_program, UniformLocation(0)),
        Some(UniformValue::Mat4(lsm))
    );
    assert_eq!(
        ctx.uniform(depth_program, UniformLocation(1)),
        Some(UniformValue::Mat4(model))
    );
    assert!(ctx.state().is_clean());
    Ok(())
}

#[test]
fn render_shadow_requires_light_space_matrix_uniform() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    let drawable = Drawable::new(&mut ctx, three_triangles(), Some(shader.clone()))?;
    ctx.clear_commands();

    // The main shader has no light-space matrix.
    let err = drawable
        .render_shadow(&mut ctx, &shader, Mat4::IDENTITY)
        .unwrap_err();
    assert!(matches!(err, PenumbraError::MissingUniform { .. }));
    assert!(ctx.commands().is_empty());
    Ok(())
}

// ============================================================================
// Shader Swap
// ============================================================================

#[test]
fn set_shader_rebuilds_only_the_layout() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let first = basic_shader(&mut ctx);
    let program = ctx.register_program("relocated");
    let second = Arc::new(Shader::new(
        "relocated",
        program,
        ShaderInterface::new()
            .with_attribute(names::POSITION, 4)
            .with_attribute(names::NORMAL, 5)
            .with_uniform(names::MODEL, 3, UniformType::Mat4),
    ));

    let mut drawable = Drawable::new(&mut ctx, three_triangles(), Some(first))?;
    let old_layout = drawable.vertex_layout().expect("layout built").id();
    let vertex_buffer = drawable.vertex_buffer();

    drawable.set_shader(&mut ctx, second.clone())?;

    let new_layout = drawable.vertex_layout().expect("layout rebuilt").id();
    assert_ne!(old_layout, new_layout);
    assert!(!ctx.is_layout_live(old_layout), "Old layout must be released");
    assert_eq!(drawable.vertex_buffer(), vertex_buffer, "Buffers persist");
    assert_eq!(ctx.live_objects(GpuObjectKind::VertexLayout), 1);

    let mut locations: Vec<u32> = ctx
        .layout_attributes(new_layout)
        .expect("layout is live")
        .iter()
        .map(|a| a.attribute.shader_location)
        .collect();
    locations.sort_unstable();
    assert_eq!(locations, vec![4, 5]);

    drawable.render(&mut ctx)?;
    assert_eq!(
        ctx.draw_calls().last().and_then(|d| d.program),
        Some(second.program())
    );
    Ok(())
}

#[test]
fn failed_set_shader_keeps_previous_shader() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let first = basic_shader(&mut ctx);
    let program = ctx.register_program("broken");
    let broken = Arc::new(Shader::new("broken", program, ShaderInterface::new()));

    let mut drawable = Drawable::new(&mut ctx, three_triangles(), Some(first.clone()))?;
    let layout = drawable.vertex_layout().expect("layout built").id();

    assert!(drawable.set_shader(&mut ctx, broken).is_err());
    assert_eq!(drawable.vertex_layout().map(|l| l.id()), Some(layout));
    assert!(ctx.is_layout_live(layout));
    assert_eq!(
        drawable.shader().map(|s| s.program()),
        Some(first.program())
    );
    Ok(())
}

// ============================================================================
// Transform & Bounds
// ============================================================================

#[test]
fn set_transformation_replaces_matrix_exactly() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let mut drawable = Drawable::new(&mut ctx, three_triangles(), None)?;
    assert_eq!(drawable.transformation(), Mat4::IDENTITY);

    let a = Mat4::from_translation(Vec3::X);
    let b = Mat4::from_rotation_y(0.5) * Mat4::from_scale(Vec3::new(1.0, 2.0, 3.0));
    drawable.set_transformation(a);
    drawable.set_transformation(b);

    assert_eq!(
        drawable.transformation(),
        b,
        "The matrix is replaced, never composed"
    );
    Ok(())
}

#[test]
fn local_bounds_read_planar_positions_only() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let drawable = Drawable::new(&mut ctx, three_triangles(), None)?;

    let bounds = drawable.local_bounds();
    assert!(vec3_approx(bounds.min, Vec3::new(0.0, 0.0, 0.0)));
    assert!(
        vec3_approx(bounds.max, Vec3::new(5.0, 1.0, 0.0)),
        "Normals must not contribute to bounds, got {:?}",
        bounds.max
    );
    Ok(())
}

#[test]
fn world_bounds_follow_transformation() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let mut drawable = Drawable::new(&mut ctx, three_triangles(), None)?;
    drawable.set_transformation(Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0)));

    let bounds = drawable.world_bounds();
    assert!(vec3_approx(bounds.min, Vec3::new(0.0, 10.0, 0.0)));
    assert!(vec3_approx(bounds.max, Vec3::new(5.0, 11.0, 0.0)));
    Ok(())
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn destroy_releases_every_gpu_object() -> anyhow::Result<()> {
    let mut ctx = RecordingContext::new();
    let shader = basic_shader(&mut ctx);
    let mut drawable = Drawable::new(&mut ctx, three_triangles(), Some(shader))?;
    drawable.update();

    drawable.destroy(&mut ctx);

    assert_eq!(ctx.live_objects(GpuObjectKind::Buffer), 0);
    assert_eq!(ctx.live_objects(GpuObjectKind::VertexLayout), 0);
    assert!(ctx.violations().is_empty(), "{:?}", ctx.violations());
    Ok(())
}
