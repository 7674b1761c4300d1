mod common;

use std::thread;

use common::{config, device, device_on, vertices, HEIGHT, WIDTH};
use tessera_device::backend::{HeadlessCall, HeadlessContext, RenderContext};
use tessera_device::state::{CullMode, DirtyFlags};
use tessera_device::{DeviceError, PixelColor, PrimitiveType};

const RED: PixelColor = PixelColor::new(255, 0, 0, 255);
const GREEN: PixelColor = PixelColor::new(0, 255, 0, 255);

#[test]
fn cleared_backbuffer_is_presented() {
    let context = HeadlessContext::new(WIDTH, HEIGHT);
    let mut dev = device_on(context.clone(), config(1024));

    dev.begin_frame(None, Some(RED), false).unwrap();
    assert!(dev.is_frame_active());
    assert_eq!(dev.backend().viewport(), (WIDTH, HEIGHT));
    dev.end_frame();
    assert!(!dev.is_frame_active());
    dev.present().unwrap();

    assert!(dev.backend().backbuffer().iter().all(|p| *p == RED));
    assert_eq!(context.swap_count(), 1);
    assert_eq!(dev.stats().frames_presented, 1);
}

#[test]
fn cleared_render_target_holds_the_color() {
    let mut dev = device();
    let target = dev.create_texture(4, 3);

    dev.begin_frame(Some(&target), Some(GREEN), true).unwrap();
    assert_eq!(dev.backend().viewport(), (4, 3));
    assert!(dev.backend().bound_framebuffer().is_some());
    assert!(dev.backend().depth().is_some_and(|d| d.write));
    dev.end_frame();
    dev.present().unwrap();

    let texture = dev.texture_object(&target).unwrap();
    let pixels = dev.backend().texture_pixels(texture, 0).unwrap();
    assert_eq!(pixels.len(), 12);
    assert!(pixels.iter().all(|p| *p == GREEN));
    // The backbuffer was never touched.
    assert!(dev.backend().backbuffer().iter().all(|p| *p == PixelColor::TRANSPARENT));
}

#[test]
fn render_target_framebuffer_is_reused_until_depth_changes() {
    let mut dev = device();
    let target = dev.create_texture(2, 2);

    dev.clear_texture(&target, RED).unwrap();
    dev.clear_texture(&target, GREEN).unwrap();
    assert_eq!(dev.backend().count(HeadlessCall::CreateFramebuffer), 1);

    dev.begin_frame(Some(&target), None, true).unwrap();
    dev.end_frame();
    assert_eq!(dev.backend().count(HeadlessCall::CreateFramebuffer), 2);
    assert_eq!(dev.backend().live_framebuffers(), 1);
}

#[test]
fn framebuffer_failure_is_a_render_target_error() {
    let mut dev = device();
    let target = dev.create_texture(2, 2);
    dev.backend_mut().fail_on(HeadlessCall::CreateFramebuffer);

    let err = dev.begin_frame(Some(&target), Some(RED), false).unwrap_err();
    assert!(matches!(err, DeviceError::RenderTarget(_)));
    let message = dev.take_last_error().unwrap();
    assert!(message.starts_with("Error setting render target: "), "{message}");
}

#[test]
fn failed_begin_frame_leaves_no_frame_active() {
    let mut dev = device();
    let target = dev.create_texture(2, 2);
    dev.begin_frame(None, Some(RED), false).unwrap();
    assert!(dev.is_frame_active());

    dev.backend_mut().fail_on(HeadlessCall::CreateFramebuffer);
    assert!(dev.begin_frame(Some(&target), None, false).is_err());
    assert!(!dev.is_frame_active());

    dev.begin_frame(Some(&target), None, false).unwrap();
    assert!(dev.is_frame_active());
}

#[test]
fn cube_textures_are_not_render_targets() {
    let mut dev = device();
    let cube = dev.create_cube_texture(2);
    assert!(matches!(
        dev.begin_frame(Some(&cube), None, false),
        Err(DeviceError::WrongTextureKind { expected: "flat" })
    ));
}

#[test]
fn back_to_backbuffer_after_a_target() {
    let mut dev = device();
    let target = dev.create_texture(2, 2);
    dev.clear_texture(&target, RED).unwrap();

    dev.begin_frame(None, Some(GREEN), false).unwrap();
    assert_eq!(dev.backend().bound_framebuffer(), None);
    assert_eq!(dev.backend().viewport(), (WIDTH, HEIGHT));
    assert!(dev.backend().backbuffer().iter().all(|p| *p == GREEN));
}

#[test]
fn rasterizer_is_reapplied_every_frame() {
    let mut dev = device();
    let vb = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&vb, &vertices(3, 1)).unwrap();
    dev.set_vertex_buffer(Some(&vb)).unwrap();
    dev.set_cull_mode(CullMode::Clockwise);

    for _ in 0..2 {
        dev.begin_frame(None, Some(PixelColor::BLACK), false).unwrap();
        assert!(dev.dirty().contains(DirtyFlags::RASTERIZER));
        dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
        dev.end_frame();
        dev.present().unwrap();
    }
    assert_eq!(dev.backend().count(HeadlessCall::SetRasterizer), 2);
}

// ── context misuse ────────────────────────────────────────────────────────

/// Makes `context` current on a thread that exits without releasing it.
fn steal(context: &HeadlessContext) {
    let mut other = context.clone();
    assert!(thread::spawn(move || other.make_current()).join().unwrap());
}

#[test]
fn frame_fails_when_another_thread_holds_the_context() {
    let mut context = HeadlessContext::new(WIDTH, HEIGHT);
    let mut dev = device_on(context.clone(), config(1024));
    context.clear_current();
    steal(&context);

    assert!(matches!(
        dev.begin_frame(None, Some(RED), false),
        Err(DeviceError::ContextNotCurrent)
    ));
    assert_eq!(
        dev.take_last_error().as_deref(),
        Some("Unexpected current rendering context")
    );
    assert!(matches!(dev.present(), Err(DeviceError::ContextNotCurrent)));
    assert_eq!(context.swap_count(), 0);
}

#[test]
fn draw_outside_a_frame_checks_the_context() {
    let mut context = HeadlessContext::new(WIDTH, HEIGHT);
    let mut dev = device_on(context.clone(), config(1024));
    let vb = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&vb, &vertices(3, 1)).unwrap();
    dev.set_vertex_buffer(Some(&vb)).unwrap();

    context.clear_current();
    steal(&context);

    assert!(matches!(
        dev.draw(PrimitiveType::Triangles, 0, 1),
        Err(DeviceError::ContextNotCurrent)
    ));
    // The first category failed, so everything is still pending.
    assert_eq!(dev.dirty(), DirtyFlags::all());
}
