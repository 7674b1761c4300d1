#![allow(dead_code)]

use tessera_device::backend::{HeadlessBackend, HeadlessContext};
use tessera_device::{DeviceConfig, FlatVertex, RenderDevice};

pub const WIDTH: u32 = 8;
pub const HEIGHT: u32 = 6;

pub type Device = RenderDevice<HeadlessBackend>;

pub fn config(arena_capacity: usize) -> DeviceConfig {
    DeviceConfig {
        initial_arena_capacity: arena_capacity,
        debug_output: false,
        ..DeviceConfig::default()
    }
}

pub fn device() -> Device {
    device_with(config(16 * 1024))
}

pub fn device_with(config: DeviceConfig) -> Device {
    device_on(HeadlessContext::new(WIDTH, HEIGHT), config)
}

/// A device over a context the test keeps a clone of.
pub fn device_on(context: HeadlessContext, config: DeviceConfig) -> Device {
    RenderDevice::new(HeadlessBackend::new(WIDTH, HEIGHT), context, config)
        .expect("headless device")
}

/// `count` flat vertices tagged with `tag` in their color so copies can be traced.
pub fn vertices(count: usize, tag: u32) -> Vec<FlatVertex> {
    (0..count)
        .map(|i| FlatVertex::new(i as f32, tag as f32, 0.0, tag, 0.0, 1.0))
        .collect()
}

pub const VS: &str = "#version 330 core\nvoid main() { gl_Position = vec4(0.0); }\n";
pub const FS: &str = "#version 330 core\nout vec4 color;\nvoid main() { color = vec4(1.0); }\n";
