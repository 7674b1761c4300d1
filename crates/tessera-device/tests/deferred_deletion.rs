mod common;

use std::sync::mpsc;
use std::thread;

use common::{config, device, device_on, vertices};
use tessera_device::backend::HeadlessContext;
use tessera_device::{DeviceError, PixelColor, PrimitiveType, Release, VertexFormat};

#[test]
fn release_on_worker_waits_for_present() {
    let mut dev = device();
    let vb = dev.create_vertex_buffer();
    let ib = dev.create_index_buffer();
    let tex = dev.create_texture(2, 2);
    dev.set_vertex_buffer_data(&vb, &vertices(3, 1)).unwrap();
    dev.set_index_buffer_data(&ib, &[0, 1, 2]).unwrap();
    dev.clear_texture(&tex, PixelColor::WHITE).unwrap();
    let buffers = dev.backend().live_buffers();

    let worker = thread::spawn(move || (vb.release(), ib.release(), tex.release()));
    let released = worker.join().unwrap();
    assert_eq!(released, (Release::Queued, Release::Queued, Release::Queued));

    // Nothing is destroyed until the device drains on its own thread.
    assert_eq!(dev.pending_deletions(), 3);
    assert_eq!(dev.backend().live_textures(), 1);
    assert_eq!(dev.backend().live_framebuffers(), 1);
    assert_eq!(dev.arena(VertexFormat::Flat).live_count(), 1);

    dev.present().unwrap();
    assert_eq!(dev.pending_deletions(), 0);
    assert_eq!(dev.stats().deletions_drained, 3);
    assert_eq!(dev.backend().live_textures(), 0);
    assert_eq!(dev.backend().live_framebuffers(), 0);
    assert_eq!(dev.backend().live_buffers(), buffers - 1);
    assert_eq!(dev.arena(VertexFormat::Flat).live_count(), 0);
}

#[test]
fn release_after_device_drop_frees_immediately() {
    let (vb, tex) = {
        let mut dev = device();
        (dev.create_vertex_buffer(), dev.create_texture(1, 1))
    };
    assert!(vb.is_detached());
    assert!(tex.is_detached());

    let worker = thread::spawn(move || (vb.release(), tex.release()));
    assert_eq!(worker.join().unwrap(), (Release::Freed, Release::Freed));
}

#[test]
fn dropping_the_device_releases_the_context() {
    let context = HeadlessContext::new(4, 4);
    let dev = device_on(context.clone(), config(1024));
    assert_eq!(context.current_thread(), Some(thread::current().id()));
    drop(dev);
    assert_eq!(context.current_thread(), None);
}

#[test]
fn concurrent_releases_are_all_drained() {
    const WORKERS: usize = 4;
    const PER_WORKER: usize = 16;

    let mut dev = device();
    let mut batches = Vec::new();
    for _ in 0..WORKERS {
        let batch: Vec<_> = (0..PER_WORKER)
            .map(|i| {
                let vb = dev.create_vertex_buffer();
                dev.set_vertex_buffer_data(&vb, &vertices(3, i as u32)).unwrap();
                vb
            })
            .collect();
        batches.push(batch);
    }

    let (done_tx, done_rx) = mpsc::channel();
    let workers: Vec<_> = batches
        .into_iter()
        .map(|batch| {
            let done = done_tx.clone();
            thread::spawn(move || {
                for vb in batch {
                    drop(vb);
                }
                let _ = done.send(());
            })
        })
        .collect();
    drop(done_tx);

    // Present while the workers are still releasing.
    let mut finished = 0;
    while finished < WORKERS {
        dev.present().unwrap();
        finished += done_rx.try_iter().count();
    }
    for worker in workers {
        worker.join().unwrap();
    }
    dev.present().unwrap();

    assert_eq!(dev.stats().deletions_drained, (WORKERS * PER_WORKER) as u64);
    assert_eq!(dev.arena(VertexFormat::Flat).live_count(), 0);
}

#[test]
fn releasing_a_bound_buffer_unbinds_it() {
    let mut dev = device();
    let vb = dev.create_vertex_buffer();
    dev.set_vertex_buffer_data(&vb, &vertices(3, 1)).unwrap();
    dev.set_vertex_buffer(Some(&vb)).unwrap();
    let tex = dev.create_texture(1, 1);
    dev.set_texture(Some(&tex)).unwrap();

    drop(vb);
    drop(tex);
    dev.present().unwrap();
    assert_eq!(dev.state().vertex_buffer, None);
    assert_eq!(dev.state().texture, None);

    dev.begin_frame(None, None, false).unwrap();
    assert!(matches!(
        dev.draw(PrimitiveType::Triangles, 0, 1),
        Err(DeviceError::NoVertexBuffer)
    ));
}

#[test]
fn handles_from_another_device_are_rejected() {
    let mut first = device();
    let mut second = device();
    let foreign = second.create_vertex_buffer();
    let texture = second.create_texture(1, 1);

    assert!(matches!(
        first.set_vertex_buffer(Some(&foreign)),
        Err(DeviceError::StaleHandle("vertex buffer"))
    ));
    assert!(matches!(
        first.set_pixels(&texture, &[PixelColor::BLACK]),
        Err(DeviceError::StaleHandle("texture"))
    ));
    assert_eq!(first.take_last_error().as_deref(), Some("stale texture handle"));
    assert_eq!(first.take_last_error(), None);
}
