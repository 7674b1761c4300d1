mod common;

use common::{config, device, device_with, vertices};
use tessera_device::backend::{HeadlessCall, INVALID_OPERATION};
use tessera_device::state::{Blend, CullMode, DirtyFlags};
use tessera_device::{DeviceError, PixelColor, PrimitiveType, VertexBuffer, VertexFormat};

fn clean_device() -> (common::Device, VertexBuffer) {
    let mut dev = device();
    let vb = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&vb, &vertices(3, 1)).unwrap();
    dev.set_vertex_buffer(Some(&vb)).unwrap();
    dev.begin_frame(None, Some(PixelColor::BLACK), false).unwrap();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    assert!(dev.dirty().is_empty());
    (dev, vb)
}

#[test]
fn failed_category_and_later_ones_stay_dirty() {
    let (mut dev, _vb) = clean_device();
    dev.set_cull_mode(CullMode::Clockwise);
    dev.set_alpha_blend_enable(true);
    dev.set_z_enable(true);
    dev.backend_mut().fail_on(HeadlessCall::SetRasterizer);

    let err = dev.draw(PrimitiveType::Triangles, 0, 1).unwrap_err();
    assert!(matches!(err, DeviceError::Backend { code } if code == INVALID_OPERATION));
    assert_eq!(
        dev.dirty(),
        DirtyFlags::RASTERIZER | DirtyFlags::BLEND | DirtyFlags::DEPTH
    );
    assert_eq!(dev.backend().draws().len(), 1);

    // No retry happens on its own; the next draw commits again.
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    assert!(dev.dirty().is_empty());
    assert_eq!(dev.backend().rasterizer().0, CullMode::Clockwise);
    assert!(dev.backend().blend().is_some());
}

#[test]
fn earlier_categories_are_kept_when_a_later_one_fails() {
    let (mut dev, _vb) = clean_device();
    dev.set_cull_mode(CullMode::Clockwise);
    dev.set_source_blend(Blend::One);
    dev.set_alpha_blend_enable(true);
    dev.backend_mut().fail_on(HeadlessCall::SetBlend);

    assert!(dev.draw(PrimitiveType::Triangles, 0, 1).is_err());
    assert_eq!(dev.dirty(), DirtyFlags::BLEND);
}

#[test]
fn last_error_slot_keeps_only_the_latest() {
    let (mut dev, _vb) = clean_device();
    assert_eq!(dev.take_last_error(), None);

    dev.backend_mut().fail_on(HeadlessCall::DrawArrays);
    assert!(dev.draw(PrimitiveType::Triangles, 0, 1).is_err());
    let stranger = device().create_texture(1, 1);
    assert!(dev.set_texture(Some(&stranger)).is_err());

    assert_eq!(dev.take_last_error().as_deref(), Some("stale texture handle"));
    assert_eq!(dev.take_last_error(), None);
}

#[test]
fn failed_draw_is_not_counted() {
    let (mut dev, _vb) = clean_device();
    dev.backend_mut().fail_on(HeadlessCall::DrawArrays);
    let err = dev.draw(PrimitiveType::Triangles, 0, 1).unwrap_err();
    assert_eq!(err.to_string(), "backend error 0x0502");
    assert_eq!(dev.backend().draws().len(), 1);
}

#[test]
fn arena_rebuild_failure_leaves_the_arena_untouched() {
    let mut dev = device_with(config(3 * 24));
    let a = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&a, &vertices(3, 1)).unwrap();
    let before = dev.arena_buffer(VertexFormat::Flat);
    let buffers = dev.backend().live_buffers();

    // The copy into the new buffer raises an error.
    dev.backend_mut().fail_on(HeadlessCall::CopyBuffer);
    let b = dev.create_vertex_buffer();
    assert!(dev.set_vertex_buffer_data(&b, &vertices(4, 2)).is_err());

    assert_eq!(dev.arena_buffer(VertexFormat::Flat), before);
    assert_eq!(dev.backend().live_buffers(), buffers);
    assert_eq!(dev.arena(VertexFormat::Flat).capacity(), 6 * 24);
    assert_eq!(dev.vertex_buffer_range(&a).unwrap().offset, 0);
    assert!(dev.vertex_buffer_range(&b).is_none());
    assert_eq!(dev.stats().compactions, 0);
}

#[test]
fn failed_replacement_keeps_the_old_vertices() {
    let mut dev = device_with(config(3 * 24));
    let a = dev.create_vertex_buffer();
    let old = vertices(3, 1);
    dev.set_vertex_buffer_data(&a, &old).unwrap();
    dev.set_vertex_buffer(Some(&a)).unwrap();

    dev.backend_mut().fail_on(HeadlessCall::CreateBuffer);
    let err = dev.set_vertex_buffer_data(&a, &vertices(5, 2)).unwrap_err();
    assert!(matches!(err, DeviceError::Construction { what: "vertex arena", .. }));

    let range = dev.vertex_buffer_range(&a).unwrap();
    assert_eq!((range.offset, range.size), (0, 3 * 24));
    let buffer = dev.arena_buffer(VertexFormat::Flat).unwrap();
    let data = dev.backend().buffer_data(buffer).unwrap();
    assert_eq!(&data[..3 * 24], bytemuck::cast_slice::<_, u8>(&old));

    dev.begin_frame(None, None, false).unwrap();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
}

#[test]
fn construction_failures_name_the_object() {
    let mut dev = device();
    let ib = dev.create_index_buffer();
    dev.backend_mut().fail_on(HeadlessCall::CreateBuffer);

    let err = dev.set_index_buffer_data(&ib, &[0, 1, 2]).unwrap_err();
    assert!(matches!(err, DeviceError::Construction { what: "index buffer", .. }));
    assert!(dev.index_buffer_object(&ib).is_none());

    dev.set_index_buffer_data(&ib, &[0, 1, 2]).unwrap();
    assert!(dev.index_buffer_object(&ib).is_some());
}

#[test]
fn sticky_backend_error_surfaces_at_the_next_check() {
    let (mut dev, _vb) = clean_device();
    dev.backend_mut().raise_error(0x0505);
    let err = dev.draw(PrimitiveType::Triangles, 0, 1).unwrap_err();
    assert!(matches!(err, DeviceError::Backend { code: 0x0505 }));
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
}
