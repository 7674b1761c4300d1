mod common;

use common::{config, device_with, vertices};
use tessera_device::backend::DrawKind;
use tessera_device::state::{DirtyFlags, StateCategory};
use tessera_device::{DeviceError, PixelColor, PrimitiveType, VertexFormat};

const STRIDE: usize = 24;

fn framed_device() -> common::Device {
    let mut dev = device_with(config(64 * STRIDE));
    dev.begin_frame(None, Some(PixelColor::BLACK), false).unwrap();
    dev
}

#[test]
fn vertex_counts_follow_primitive_type() {
    assert_eq!(PrimitiveType::TriangleStrip.vertex_count(5), Some(7));
    assert_eq!(PrimitiveType::Triangles.vertex_count(3), Some(9));
    assert_eq!(PrimitiveType::Lines.vertex_count(4), Some(8));
}

#[test]
fn draw_offsets_by_the_buffer_start_index() {
    let mut dev = framed_device();
    let pad = dev.create_vertex_buffer();
    let vb = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&pad, &vertices(5, 0)).unwrap();
    dev.set_vertex_buffer_data(&vb, &vertices(12, 1)).unwrap();
    dev.set_vertex_buffer(Some(&vb)).unwrap();

    dev.draw(PrimitiveType::TriangleStrip, 2, 5).unwrap();

    let draw = dev.backend().draws().last().unwrap();
    assert_eq!(draw.primitive, PrimitiveType::TriangleStrip);
    assert_eq!(draw.kind, DrawKind::Arrays { first: 7, count: 7 });
    assert_eq!(Some(draw.vertex_buffer), dev.arena_buffer(VertexFormat::Flat));
}

#[test]
fn switching_buffers_of_one_format_needs_no_rebind() {
    let mut dev = framed_device();
    let a = dev.create_vertex_buffer();
    let b = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&a, &vertices(3, 1)).unwrap();
    dev.set_vertex_buffer_data(&b, &vertices(3, 2)).unwrap();

    dev.set_vertex_buffer(Some(&a)).unwrap();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    dev.set_vertex_buffer(Some(&b)).unwrap();
    assert!(dev.dirty().is_empty());
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    assert_eq!(dev.stats().applies_of(StateCategory::VertexBuffer), 1);
    let firsts: Vec<_> = dev.backend().draws().iter().map(|d| d.kind).collect();
    assert_eq!(
        firsts,
        [
            DrawKind::Arrays { first: 0, count: 3 },
            DrawKind::Arrays { first: 3, count: 3 },
        ]
    );
}

#[test]
fn start_index_is_read_after_compaction() {
    let mut dev = device_with(config(6 * STRIDE));
    let a = dev.create_vertex_buffer();
    let b = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&a, &vertices(3, 1)).unwrap();
    dev.set_vertex_buffer_data(&b, &vertices(3, 2)).unwrap();
    dev.set_vertex_buffer(Some(&b)).unwrap();
    dev.begin_frame(None, None, false).unwrap();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    // Moves `b` to the front of a new buffer.
    drop(a);
    dev.present().unwrap();
    let c = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&c, &vertices(6, 3)).unwrap();
    assert!(dev.dirty().contains(DirtyFlags::VERTEX_BUFFER));

    dev.begin_frame(None, None, false).unwrap();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    let draws = dev.backend().draws();
    assert_eq!(draws[0].kind, DrawKind::Arrays { first: 3, count: 3 });
    assert_eq!(draws[1].kind, DrawKind::Arrays { first: 0, count: 3 });
    assert_ne!(draws[0].vertex_array, draws[1].vertex_array);
}

#[test]
fn indexed_draw_uses_base_vertex_and_byte_offset() {
    let mut dev = framed_device();
    let pad = dev.create_vertex_buffer();
    let vb = dev.create_vertex_buffer();
    let ib = dev.create_index_buffer();
    dev.set_vertex_buffer_data(&pad, &vertices(4, 0)).unwrap();
    dev.set_vertex_buffer_data(&vb, &vertices(4, 1)).unwrap();
    dev.set_index_buffer_data(&ib, &[0, 1, 2, 2, 1, 3]).unwrap();
    dev.set_vertex_buffer(Some(&vb)).unwrap();
    dev.set_index_buffer(Some(&ib)).unwrap();

    dev.draw_indexed(PrimitiveType::Triangles, 3, 1).unwrap();

    let draw = dev.backend().draws().last().unwrap();
    assert_eq!(
        draw.kind,
        DrawKind::Indexed {
            count: 3,
            index_offset: 12,
            base_vertex: 4,
        }
    );
    assert_eq!(draw.index_buffer, dev.index_buffer_object(&ib));
    let indices = dev.backend().buffer_data(draw.index_buffer.unwrap()).unwrap();
    assert_eq!(indices, bytemuck::cast_slice::<u32, u8>(&[0, 1, 2, 2, 1, 3]));
}

#[test]
fn index_buffer_filled_after_binding_is_picked_up() {
    let mut dev = framed_device();
    let vb = dev.create_vertex_buffer();
    let ib = dev.create_index_buffer();
    dev.set_vertex_buffer_data(&vb, &vertices(3, 1)).unwrap();
    dev.set_vertex_buffer(Some(&vb)).unwrap();
    dev.set_index_buffer(Some(&ib)).unwrap();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    dev.set_index_buffer_data(&ib, &[2, 1, 0]).unwrap();
    assert!(dev.dirty().contains(DirtyFlags::INDEX_BUFFER));
    dev.draw_indexed(PrimitiveType::Triangles, 0, 1).unwrap();
    assert_eq!(
        dev.backend().draws().last().unwrap().index_buffer,
        dev.index_buffer_object(&ib)
    );
}

#[test]
fn draw_without_vertex_data_fails() {
    let mut dev = framed_device();
    assert!(matches!(
        dev.draw(PrimitiveType::Triangles, 0, 1),
        Err(DeviceError::NoVertexBuffer)
    ));

    let empty = dev.create_vertex_buffer();
    dev.set_vertex_buffer(Some(&empty)).unwrap();
    assert!(matches!(
        dev.draw(PrimitiveType::Lines, 0, 1),
        Err(DeviceError::NoVertexBuffer)
    ));
    assert!(dev.backend().draws().is_empty());
}

// ── immediate draws ───────────────────────────────────────────────────────

#[test]
fn draw_data_streams_and_restores_the_arena_binding() {
    let mut dev = framed_device();
    let vb = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&vb, &vertices(3, 1)).unwrap();
    dev.set_vertex_buffer(Some(&vb)).unwrap();
    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();

    let streamed = vertices(6, 5);
    dev.draw_data(PrimitiveType::TriangleStrip, 1, 2, &streamed).unwrap();
    assert_eq!(dev.dirty(), DirtyFlags::VERTEX_BUFFER);
    assert_eq!(dev.stats().immediate_draws, 1);

    let immediate = dev.backend().draws().last().unwrap().clone();
    assert_eq!(immediate.kind, DrawKind::Arrays { first: 0, count: 4 });
    assert_ne!(Some(immediate.vertex_buffer), dev.arena_buffer(VertexFormat::Flat));
    assert_eq!(
        dev.backend().buffer_data(immediate.vertex_buffer).unwrap(),
        bytemuck::cast_slice::<_, u8>(&streamed[1..5])
    );

    dev.draw(PrimitiveType::Triangles, 0, 1).unwrap();
    let restored = dev.backend().draws().last().unwrap();
    assert_eq!(Some(restored.vertex_buffer), dev.arena_buffer(VertexFormat::Flat));
    assert_eq!(dev.stats().applies_of(StateCategory::VertexBuffer), 2);
}

#[test]
fn draw_data_reuses_one_stream_buffer() {
    let mut dev = framed_device();
    let streamed = vertices(3, 1);
    dev.draw_data(PrimitiveType::Triangles, 0, 1, &streamed).unwrap();
    dev.draw_data(PrimitiveType::Lines, 0, 1, &streamed).unwrap();

    let draws = dev.backend().draws();
    assert_eq!(draws[0].vertex_buffer, draws[1].vertex_buffer);
    assert_eq!(dev.backend().live_buffers(), 1);
}

#[test]
fn draw_data_checks_the_range() {
    let mut dev = framed_device();
    let err = dev
        .draw_data(PrimitiveType::Triangles, 1, 1, &vertices(3, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        DeviceError::OutOfRange { offset: 24, end: 96, size: 72 }
    ));
    assert!(dev.backend().draws().is_empty());
}

#[test]
fn oversized_counts_are_rejected_without_drawing() {
    let mut dev = framed_device();
    let streamed = vertices(3, 1);
    let err = dev
        .draw_data(PrimitiveType::Triangles, 0, u32::MAX, &streamed)
        .unwrap_err();
    assert!(matches!(err, DeviceError::OutOfRange { end: usize::MAX, .. }));

    let err = dev
        .draw_data(PrimitiveType::TriangleStrip, u32::MAX, 1, &streamed)
        .unwrap_err();
    assert!(matches!(err, DeviceError::OutOfRange { size: 72, .. }));

    let pad = dev.create_vertex_buffer();
    let vb = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&pad, &vertices(2, 0)).unwrap();
    dev.set_vertex_buffer_data(&vb, &vertices(3, 1)).unwrap();
    dev.set_vertex_buffer(Some(&vb)).unwrap();
    assert!(matches!(
        dev.draw(PrimitiveType::Lines, u32::MAX - 1, 1),
        Err(DeviceError::OutOfRange { .. })
    ));
    assert!(matches!(
        dev.draw_indexed(PrimitiveType::Triangles, u32::MAX, 1),
        Err(DeviceError::OutOfRange { .. })
    ));

    assert!(dev.backend().draws().is_empty());
    assert!(dev.take_last_error().is_some());
}
