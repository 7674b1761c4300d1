mod common;

use common::{device, vertices, FS, VS};
use tessera_device::backend::HeadlessCall;
use tessera_device::state::{Blend, CullMode, DirtyFlags, StateCategory};
use tessera_device::{
    DeviceError, PixelColor, PrimitiveType, ShaderSlot, UniformKind, UniformSlot, VertexBuffer,
};

fn ready_device() -> (common::Device, VertexBuffer) {
    let mut dev = device();
    let vb = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&vb, &vertices(6, 1)).unwrap();
    dev.set_vertex_buffer(Some(&vb)).unwrap();
    dev.begin_frame(None, Some(PixelColor::BLACK), false).unwrap();
    (dev, vb)
}

// ── commits ───────────────────────────────────────────────────────────────

#[test]
fn identical_second_draw_skips_state_application() {
    let (mut dev, _vb) = ready_device();

    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    assert_eq!(dev.stats().total_applies(), 8);
    assert_eq!(dev.stats().commits, 1);
    let calls_after_first = dev.backend().counters().total();

    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    assert_eq!(dev.stats().total_applies(), 8);
    assert_eq!(dev.stats().commits, 1);
    assert_eq!(dev.stats().draws, 2);
    assert_eq!(dev.backend().draws().len(), 2);
    // Only the draw itself reached the backend.
    assert_eq!(dev.backend().counters().total(), calls_after_first + 1);
}

#[test]
fn one_changed_category_is_the_only_one_applied() {
    let (mut dev, _vb) = ready_device();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    dev.set_cull_mode(CullMode::Clockwise);
    assert_eq!(dev.dirty(), DirtyFlags::RASTERIZER);
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    assert_eq!(dev.stats().applies_of(StateCategory::Rasterizer), 2);
    assert_eq!(dev.stats().total_applies(), 9);
    assert_eq!(dev.backend().rasterizer().0, CullMode::Clockwise);
}

#[test]
fn setting_current_values_keeps_state_clean() {
    let (mut dev, vb) = ready_device();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    dev.set_cull_mode(CullMode::None);
    dev.set_alpha_blend_enable(false);
    dev.set_z_enable(false);
    dev.set_vertex_buffer(Some(&vb)).unwrap();
    dev.set_texture(None).unwrap();
    dev.set_multisample_antialias(true);
    assert!(dev.dirty().is_empty());

    dev.set_z_enable(true);
    dev.set_z_enable(false);
    // Back at the committed value, but the tracker only compares to pending.
    assert_eq!(dev.dirty(), DirtyFlags::DEPTH);
}

#[test]
fn begin_frame_forces_every_category() {
    let (mut dev, _vb) = ready_device();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    dev.end_frame();

    dev.begin_frame(None, None, false).unwrap();
    assert_eq!(dev.dirty(), DirtyFlags::all());
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    assert_eq!(dev.stats().total_applies(), 16);
    assert_eq!(dev.backend().count(HeadlessCall::SetRasterizer), 2);
}

#[test]
fn blend_and_depth_follow_pending_state() {
    let (mut dev, _vb) = ready_device();
    dev.set_alpha_blend_enable(true);
    dev.set_source_blend(Blend::One);
    dev.set_z_enable(true);
    dev.set_z_write_enable(true);
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    let blend = dev.backend().blend().expect("blending enabled");
    assert_eq!(blend.source, Blend::One);
    assert_eq!(blend.destination, Blend::InverseSourceAlpha);
    assert!(dev.backend().depth().is_some_and(|d| d.write));

    dev.set_alpha_blend_enable(false);
    dev.set_z_enable(false);
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    assert_eq!(dev.backend().blend(), None);
    assert_eq!(dev.backend().depth(), None);
}

// ── uniforms ──────────────────────────────────────────────────────────────

fn shaded_device() -> (common::Device, VertexBuffer) {
    let (mut dev, vb) = ready_device();
    dev.declare_shader(ShaderSlot(0), "basic", VS, FS);
    dev.declare_uniform(UniformSlot(0), "u_alpha", UniformKind::Float);
    dev.declare_uniform(UniformSlot(1), "u_offset", UniformKind::Vec2);
    dev.declare_uniform(UniformSlot(2), "u_tint", UniformKind::Vec4);
    dev.set_shader(ShaderSlot(0));
    (dev, vb)
}

fn pushed_names(dev: &mut common::Device) -> Vec<String> {
    dev.backend_mut()
        .take_uniform_pushes()
        .into_iter()
        .map(|p| p.name)
        .collect()
}

#[test]
fn only_changed_uniforms_are_pushed() {
    let (mut dev, _vb) = shaded_device();
    dev.set_uniform(UniformSlot(0), &[0.5]).unwrap();
    dev.set_uniform(UniformSlot(1), &[2.0, 3.0]).unwrap();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    // u_tint was never set.
    assert_eq!(pushed_names(&mut dev), ["u_alpha", "u_offset"]);

    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    assert!(pushed_names(&mut dev).is_empty());

    dev.set_uniform(UniformSlot(0), &[0.5]).unwrap();
    assert!(dev.dirty().is_empty());

    dev.set_uniform(UniformSlot(1), &[4.0, 5.0]).unwrap();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    let pushes = dev.backend_mut().take_uniform_pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].name, "u_offset");
    assert_eq!(pushes[0].values, [4.0, 5.0]);
}

#[test]
fn uniform_errors_are_reported() {
    let (mut dev, _vb) = shaded_device();
    assert!(matches!(
        dev.set_uniform(UniformSlot(9), &[1.0]),
        Err(DeviceError::UnknownUniform(9))
    ));
    assert!(matches!(
        dev.set_uniform(UniformSlot(1), &[1.0; 5]),
        Err(DeviceError::UniformOverflow { slot: 1, len: 5, capacity: 4 })
    ));
    assert!(dev.take_last_error().is_some());
}

#[test]
fn redeclared_uniform_still_reaches_the_program() {
    let (mut dev, _vb) = shaded_device();
    for value in [1.0, 2.0, 3.0] {
        dev.set_uniform(UniformSlot(0), &[value]).unwrap();
        dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    }
    dev.backend_mut().take_uniform_pushes();

    dev.declare_uniform(UniformSlot(0), "u_alpha", UniformKind::Float);
    for value in [7.0, 8.0, 9.0] {
        dev.set_uniform(UniformSlot(0), &[value]).unwrap();
    }
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    let pushes = dev.backend_mut().take_uniform_pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].name, "u_alpha");
    assert_eq!(pushes[0].values, [9.0]);
}

#[test]
fn alpha_test_variant_receives_current_values() {
    let (mut dev, _vb) = shaded_device();
    dev.set_uniform(UniformSlot(0), &[0.25]).unwrap();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    let normal = dev.backend().bound_program();
    dev.backend_mut().take_uniform_pushes();

    dev.set_alpha_test_enable(true);
    assert!(dev.dirty().contains(DirtyFlags::SHADER | DirtyFlags::UNIFORMS));
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    assert_ne!(dev.backend().bound_program(), normal);
    assert_eq!(dev.backend().live_programs(), 2);
    assert_eq!(pushed_names(&mut dev), ["u_alpha"]);
}

// ── shaders ───────────────────────────────────────────────────────────────

#[test]
fn compile_failure_aborts_commit_and_is_kept() {
    let (mut dev, _vb) = ready_device();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    dev.backend_mut().reject_program("broken", "0:3: syntax error");
    dev.declare_shader(ShaderSlot(1), "broken", VS, FS);
    dev.set_shader(ShaderSlot(1));
    dev.set_cull_mode(CullMode::Clockwise);

    let err = dev.draw(PrimitiveType::Triangles, 0, 1).unwrap_err();
    assert!(matches!(err, DeviceError::ShaderCompile { .. }));
    assert_eq!(
        dev.dirty(),
        DirtyFlags::SHADER | DirtyFlags::UNIFORMS | DirtyFlags::RASTERIZER
    );
    assert_eq!(dev.backend().draws().len(), 1);

    let message = dev.take_last_error().unwrap();
    assert!(message.starts_with("Failed to bind shader broken"), "{message}");
    assert!(message.contains("syntax error"));

    // The failure is cached; the backend is not asked again.
    let attempts = dev.backend().count(HeadlessCall::CreateProgram);
    assert!(dev.draw(PrimitiveType::Triangles, 0, 1).is_err());
    assert_eq!(dev.backend().count(HeadlessCall::CreateProgram), attempts);
}

#[test]
fn undeclared_shader_slot_fails_the_draw() {
    let (mut dev, _vb) = ready_device();
    dev.set_shader(ShaderSlot(7));
    assert!(matches!(
        dev.draw(PrimitiveType::Triangles, 0, 1),
        Err(DeviceError::UnknownShader(7))
    ));
}

#[test]
fn redeclaring_bound_shader_rebinds_it() {
    let (mut dev, _vb) = shaded_device();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    let first = dev.backend().bound_program();

    dev.declare_shader(ShaderSlot(0), "basic-v2", VS, FS);
    assert!(dev.dirty().contains(DirtyFlags::SHADER));
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    assert_ne!(dev.backend().bound_program(), first);
    assert_eq!(dev.backend().live_programs(), 1);
}
