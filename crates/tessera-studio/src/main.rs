//! Headless walkthrough of the render device: a few frames of sprites, a render
//! target, a cross-thread release and the compaction it leads to.

use std::thread;

use anyhow::{anyhow, Context, Result};
use tessera_device::backend::{HeadlessBackend, HeadlessContext};
use tessera_device::logging::{init_logging, LoggingConfig};
use tessera_device::{
    DeviceConfig, FlatVertex, PixelColor, PrimitiveType, Release, RenderDevice, ShaderSlot,
    UniformKind, UniformSlot, VertexBuffer,
};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const FRAMES: u32 = 4;
const SPRITES: usize = 8;

const SPRITE_VS: &str = r#"#version 330 core
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec4 a_color;
layout(location = 2) in vec2 a_uv;
uniform float u_time;
out vec4 v_color;
out vec2 v_uv;
void main() {
    v_color = a_color.bgra;
    v_uv = a_uv;
    gl_Position = vec4(a_position.xy + vec2(sin(u_time) * 0.01, 0.0), a_position.z, 1.0);
}
"#;

const SPRITE_FS: &str = r#"#version 330 core
in vec4 v_color;
in vec2 v_uv;
uniform sampler2D u_texture;
out vec4 frag_color;
void main() {
    frag_color = texture(u_texture, v_uv) * v_color;
#ifdef ALPHA_TEST
    if (frag_color.a < 0.5) discard;
#endif
}
"#;

/// Two-triangle strip covering `size` pixels at (`x`, `y`) in clip space.
fn quad(x: f32, y: f32, size: f32, color: PixelColor) -> [FlatVertex; 4] {
    let argb = color.to_argb();
    [
        FlatVertex::new(x, y, 0.0, argb, 0.0, 0.0),
        FlatVertex::new(x + size, y, 0.0, argb, 1.0, 0.0),
        FlatVertex::new(x, y + size, 0.0, argb, 0.0, 1.0),
        FlatVertex::new(x + size, y + size, 0.0, argb, 1.0, 1.0),
    ]
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let context = HeadlessContext::new(WIDTH, HEIGHT);
    let config = DeviceConfig {
        // Small on purpose so the release below ends in a compaction.
        initial_arena_capacity: SPRITES * 4 * 24,
        debug_output: false,
        ..DeviceConfig::default()
    };
    let mut device = RenderDevice::new(HeadlessBackend::new(WIDTH, HEIGHT), context.clone(), config)
        .context("creating headless render device")?;

    device.declare_shader(ShaderSlot(0), "sprite", SPRITE_VS, SPRITE_FS);
    device.declare_uniform(UniformSlot(0), "u_time", UniformKind::Float);
    device.set_shader(ShaderSlot(0));
    device.set_alpha_blend_enable(true);

    let mut sprites = Vec::with_capacity(SPRITES);
    for i in 0..SPRITES {
        let sprite = device.create_vertex_buffer();
        let x = -1.0 + i as f32 * 0.25;
        let color = PixelColor::new(32 * i as u8, 255 - 32 * i as u8, 128, 255);
        device
            .set_vertex_buffer_data(&sprite, &quad(x, 0.0, 0.2, color))
            .with_context(|| format!("uploading sprite {i}"))?;
        sprites.push(sprite);
    }

    let atlas = device.create_texture(64, 64);
    device.clear_texture(&atlas, PixelColor::from_argb(0xFF20_4060))?;

    let outline = [
        FlatVertex::new(-1.0, -1.0, 0.0, PixelColor::WHITE.to_argb(), 0.0, 0.0),
        FlatVertex::new(1.0, 1.0, 0.0, PixelColor::WHITE.to_argb(), 1.0, 1.0),
    ];

    for frame in 0..FRAMES {
        device.begin_frame(None, Some(PixelColor::BLACK), false)?;
        device.set_uniform(UniformSlot(0), &[frame as f32])?;
        device.set_texture(Some(&atlas))?;
        for sprite in &sprites {
            device.set_vertex_buffer(Some(sprite))?;
            device.draw(PrimitiveType::TriangleStrip, 0, 2)?;
        }
        device.draw_data(PrimitiveType::Lines, 0, 1, &outline)?;
        device.end_frame();

        if frame == 1 {
            let released: Vec<VertexBuffer> = sprites.drain(SPRITES / 2..).collect();
            let worker = thread::spawn(move || {
                released
                    .into_iter()
                    .map(VertexBuffer::release)
                    .filter(|r| *r == Release::Queued)
                    .count()
            });
            let queued = worker
                .join()
                .map_err(|_| anyhow!("release worker panicked"))?;
            log::info!("worker released {queued} sprites");
        }

        device.present()?;

        if frame == 1 {
            // The freed ranges are holes until this upload forces a compaction.
            let banner = device.create_vertex_buffer();
            let wide: Vec<FlatVertex> = (0..SPRITES / 2)
                .flat_map(|i| quad(-1.0 + i as f32 * 0.5, -0.5, 0.4, PixelColor::WHITE))
                .collect();
            device.set_vertex_buffer_data(&banner, &wide)?;
            sprites.push(banner);
        }
    }

    let stats = device.stats();
    log::info!(
        "{} frames, {} draws ({} immediate), {} commits, {} applies",
        stats.frames_presented,
        stats.draws,
        stats.immediate_draws,
        stats.commits,
        stats.total_applies()
    );
    log::info!(
        "{} compactions moved {} bytes; {} resources drained; {} swaps",
        stats.compactions,
        stats.bytes_relocated,
        stats.deletions_drained,
        context.swap_count()
    );
    Ok(())
}
