//! OpenGL backend over `glow`.
//!
//! Expects a 3.3 core context (4.3 or `KHR_debug` for diagnostics) that the caller
//! created and made current.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use glow::{HasContext, PixelUnpackData};

use super::{Backend, BlendState, BufferTarget, BufferUsage, DepthState, SamplerDesc};
use crate::arena::VertexFormat;
use crate::draw::PrimitiveType;
use crate::logging::DebugLog;
use crate::paint::PixelColor;
use crate::resources::{CubeMapFace, TextureDesc, TextureKind};
use crate::state::{
    Blend, BlendOperation, CullMode, FillMode, MagFilter, MinFilter, TextureAddress, UniformKind,
};

type GlBuffer = <glow::Context as HasContext>::Buffer;
type GlVertexArray = <glow::Context as HasContext>::VertexArray;
type GlProgram = <glow::Context as HasContext>::Program;
type GlUniform = <glow::Context as HasContext>::UniformLocation;
type GlTexture = <glow::Context as HasContext>::Texture;
type GlFramebuffer = <glow::Context as HasContext>::Framebuffer;
type GlRenderbuffer = <glow::Context as HasContext>::Renderbuffer;
type GlSampler = <glow::Context as HasContext>::Sampler;
type GlShader = <glow::Context as HasContext>::Shader;

const TEXTURE_MAX_ANISOTROPY: u32 = 0x84FE;

// ── enum translation ──────────────────────────────────────────────────────

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
        BufferTarget::PixelUnpack => glow::PIXEL_UNPACK_BUFFER,
    }
}

fn buffer_usage(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => glow::STATIC_DRAW,
        BufferUsage::Stream => glow::STREAM_DRAW,
    }
}

fn primitive_mode(primitive: PrimitiveType) -> u32 {
    match primitive {
        PrimitiveType::Lines => glow::LINES,
        PrimitiveType::Triangles => glow::TRIANGLES,
        PrimitiveType::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

fn blend_factor(blend: Blend) -> u32 {
    match blend {
        Blend::InverseSourceAlpha => glow::ONE_MINUS_SRC_ALPHA,
        Blend::SourceAlpha => glow::SRC_ALPHA,
        Blend::One => glow::ONE,
    }
}

fn blend_equation(op: BlendOperation) -> u32 {
    match op {
        BlendOperation::Add => glow::FUNC_ADD,
        BlendOperation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
    }
}

fn min_filter(filter: MinFilter) -> i32 {
    (match filter {
        MinFilter::Nearest => glow::NEAREST,
        MinFilter::Linear => glow::LINEAR,
        MinFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
        MinFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
        MinFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
        MinFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn mag_filter(filter: MagFilter) -> i32 {
    (match filter {
        MagFilter::Nearest => glow::NEAREST,
        MagFilter::Linear => glow::LINEAR,
    }) as i32
}

fn wrap_mode(address: TextureAddress) -> i32 {
    (match address {
        TextureAddress::Wrap => glow::REPEAT,
        TextureAddress::Clamp => glow::CLAMP_TO_EDGE,
    }) as i32
}

fn texture_target(kind: TextureKind) -> u32 {
    match kind {
        TextureKind::Flat => glow::TEXTURE_2D,
        TextureKind::Cube => glow::TEXTURE_CUBE_MAP,
    }
}

fn cube_face_target(face: CubeMapFace) -> u32 {
    match face {
        CubeMapFace::PositiveX => glow::TEXTURE_CUBE_MAP_POSITIVE_X,
        CubeMapFace::PositiveY => glow::TEXTURE_CUBE_MAP_POSITIVE_Y,
        CubeMapFace::PositiveZ => glow::TEXTURE_CUBE_MAP_POSITIVE_Z,
        CubeMapFace::NegativeX => glow::TEXTURE_CUBE_MAP_NEGATIVE_X,
        CubeMapFace::NegativeY => glow::TEXTURE_CUBE_MAP_NEGATIVE_Y,
        CubeMapFace::NegativeZ => glow::TEXTURE_CUBE_MAP_NEGATIVE_Z,
    }
}

// ── attribute layout ──────────────────────────────────────────────────────

const ATTRIBUTES: [&str; 4] = ["a_position", "a_color", "a_uv", "a_normal"];

/// Attribute pointers for `format`. The buffer must be bound to `ARRAY_BUFFER`.
unsafe fn setup_attributes(gl: &glow::Context, format: VertexFormat) {
    let stride = format.stride() as i32;
    unsafe {
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 4, glow::UNSIGNED_BYTE, true, stride, 12);
        gl.enable_vertex_attrib_array(2);
        gl.vertex_attrib_pointer_f32(2, 2, glow::FLOAT, false, stride, 16);
        if format == VertexFormat::World {
            gl.enable_vertex_attrib_array(3);
            gl.vertex_attrib_pointer_f32(3, 3, glow::FLOAT, false, stride, 24);
        }
    }
}

/// [`Backend`] over a `glow` context.
pub struct GlBackend {
    gl: glow::Context,
    bound_vertex_array: Option<GlVertexArray>,
    depth_buffers: HashMap<GlFramebuffer, GlRenderbuffer>,
    mapped: HashMap<GlBuffer, (*mut u8, usize)>,
}

impl GlBackend {
    pub fn new(gl: glow::Context) -> Self {
        unsafe {
            log::info!(
                "OpenGL {} on {}",
                gl.get_parameter_string(glow::VERSION),
                gl.get_parameter_string(glow::RENDERER)
            );
        }
        Self {
            gl,
            bound_vertex_array: None,
            depth_buffers: HashMap::new(),
            mapped: HashMap::new(),
        }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    /// Runs `f` with `buffer` bound to `target`, leaving the vertex array's element
    /// binding untouched.
    fn with_buffer(
        &mut self,
        target: BufferTarget,
        buffer: Option<GlBuffer>,
        f: impl FnOnce(&glow::Context, u32),
    ) {
        let gl_target = buffer_target(target);
        unsafe {
            if target == BufferTarget::Index {
                self.gl.bind_vertex_array(None);
            }
            self.gl.bind_buffer(gl_target, buffer);
            f(&self.gl, gl_target);
            self.gl.bind_buffer(gl_target, None);
            if target == BufferTarget::Index {
                self.gl.bind_vertex_array(self.bound_vertex_array);
            }
        }
    }

    fn compile_shader(&self, kind: u32, source: &str) -> std::result::Result<GlShader, String> {
        unsafe {
            let shader = self.gl.create_shader(kind)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if self.gl.get_shader_compile_status(shader) {
                Ok(shader)
            } else {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                Err(log)
            }
        }
    }
}

impl Backend for GlBackend {
    type Buffer = GlBuffer;
    type VertexArray = GlVertexArray;
    type Program = GlProgram;
    type Uniform = GlUniform;
    type Texture = GlTexture;
    type Framebuffer = GlFramebuffer;
    type Sampler = GlSampler;

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        size: usize,
        usage: BufferUsage,
    ) -> Result<GlBuffer> {
        let buffer = unsafe { self.gl.create_buffer() }.map_err(|e| anyhow!("glGenBuffers: {e}"))?;
        if size > 0 {
            self.with_buffer(target, Some(buffer), |gl, t| unsafe {
                gl.buffer_data_size(t, size as i32, buffer_usage(usage));
            });
        }
        Ok(buffer)
    }

    fn upload_buffer(
        &mut self,
        target: BufferTarget,
        buffer: GlBuffer,
        data: &[u8],
        usage: BufferUsage,
    ) {
        self.with_buffer(target, Some(buffer), |gl, t| unsafe {
            gl.buffer_data_u8_slice(t, data, buffer_usage(usage));
        });
    }

    fn write_buffer(&mut self, target: BufferTarget, buffer: GlBuffer, offset: usize, data: &[u8]) {
        self.with_buffer(target, Some(buffer), |gl, t| unsafe {
            gl.buffer_sub_data_u8_slice(t, offset as i32, data);
        });
    }

    fn copy_buffer(
        &mut self,
        src: GlBuffer,
        dst: GlBuffer,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
    ) {
        unsafe {
            self.gl.bind_buffer(glow::COPY_READ_BUFFER, Some(src));
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(dst));
            self.gl.copy_buffer_sub_data(
                glow::COPY_READ_BUFFER,
                glow::COPY_WRITE_BUFFER,
                src_offset as i32,
                dst_offset as i32,
                len as i32,
            );
            self.gl.bind_buffer(glow::COPY_READ_BUFFER, None);
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
        }
    }

    fn delete_buffer(&mut self, buffer: GlBuffer) {
        self.mapped.remove(&buffer);
        unsafe { self.gl.delete_buffer(buffer) };
    }

    fn map_buffer(&mut self, buffer: GlBuffer, len: usize) -> Result<()> {
        let ptr = unsafe {
            self.gl.bind_buffer(glow::PIXEL_UNPACK_BUFFER, Some(buffer));
            let ptr = self.gl.map_buffer_range(
                glow::PIXEL_UNPACK_BUFFER,
                0,
                len as i32,
                glow::MAP_WRITE_BIT | glow::MAP_INVALIDATE_BUFFER_BIT,
            );
            self.gl.bind_buffer(glow::PIXEL_UNPACK_BUFFER, None);
            ptr
        };
        if ptr.is_null() {
            bail!("glMapBufferRange returned null");
        }
        self.mapped.insert(buffer, (ptr, len));
        Ok(())
    }

    fn mapped_buffer(&mut self, buffer: GlBuffer) -> Option<&mut [u8]> {
        let &(ptr, len) = self.mapped.get(&buffer)?;
        // The mapping stays valid until `unmap_buffer`, which needs `&mut self`.
        Some(unsafe { std::slice::from_raw_parts_mut(ptr, len) })
    }

    fn unmap_buffer(&mut self, buffer: GlBuffer) {
        self.mapped.remove(&buffer);
        unsafe {
            self.gl.bind_buffer(glow::PIXEL_UNPACK_BUFFER, Some(buffer));
            self.gl.unmap_buffer(glow::PIXEL_UNPACK_BUFFER);
            self.gl.bind_buffer(glow::PIXEL_UNPACK_BUFFER, None);
        }
    }

    fn create_vertex_array(
        &mut self,
        format: VertexFormat,
        buffer: GlBuffer,
    ) -> Result<GlVertexArray> {
        unsafe {
            let array = self
                .gl
                .create_vertex_array()
                .map_err(|e| anyhow!("glGenVertexArrays: {e}"))?;
            self.gl.bind_vertex_array(Some(array));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            setup_attributes(&self.gl, format);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            self.gl.bind_vertex_array(self.bound_vertex_array);
            Ok(array)
        }
    }

    fn bind_vertex_array(&mut self, array: Option<GlVertexArray>) {
        self.bound_vertex_array = array;
        unsafe { self.gl.bind_vertex_array(array) };
    }

    fn delete_vertex_array(&mut self, array: GlVertexArray) {
        if self.bound_vertex_array == Some(array) {
            self.bound_vertex_array = None;
        }
        unsafe { self.gl.delete_vertex_array(array) };
    }

    fn bind_index_buffer(&mut self, buffer: Option<GlBuffer>) {
        unsafe { self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, buffer) };
    }

    fn create_program(
        &mut self,
        name: &str,
        vertex: &str,
        fragment: &str,
    ) -> std::result::Result<GlProgram, String> {
        let vs = self
            .compile_shader(glow::VERTEX_SHADER, vertex)
            .map_err(|log| format!("{name} vertex shader:\n{log}"))?;
        let fs = match self.compile_shader(glow::FRAGMENT_SHADER, fragment) {
            Ok(fs) => fs,
            Err(log) => {
                unsafe { self.gl.delete_shader(vs) };
                return Err(format!("{name} fragment shader:\n{log}"));
            }
        };

        unsafe {
            let program = self.gl.create_program()?;
            self.gl.attach_shader(program, vs);
            self.gl.attach_shader(program, fs);
            for (index, attribute) in ATTRIBUTES.iter().enumerate() {
                self.gl.bind_attrib_location(program, index as u32, attribute);
            }
            self.gl.link_program(program);

            self.gl.detach_shader(program, vs);
            self.gl.detach_shader(program, fs);
            self.gl.delete_shader(vs);
            self.gl.delete_shader(fs);

            if self.gl.get_program_link_status(program) {
                Ok(program)
            } else {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                Err(format!("{name} link:\n{log}"))
            }
        }
    }

    fn uniform_location(&mut self, program: GlProgram, name: &str) -> Option<GlUniform> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn use_program(&mut self, program: Option<GlProgram>) {
        unsafe { self.gl.use_program(program) };
    }

    fn set_uniform(&mut self, location: &GlUniform, kind: UniformKind, values: &[f32]) {
        let location = Some(location);
        unsafe {
            match kind {
                UniformKind::Float => self.gl.uniform_1_f32_slice(location, values),
                UniformKind::Vec2 => self.gl.uniform_2_f32_slice(location, values),
                UniformKind::Vec3 => self.gl.uniform_3_f32_slice(location, values),
                UniformKind::Vec4 => self.gl.uniform_4_f32_slice(location, values),
                UniformKind::Mat4 => self.gl.uniform_matrix_4_f32_slice(location, false, values),
            }
        }
    }

    fn delete_program(&mut self, program: GlProgram) {
        unsafe { self.gl.delete_program(program) };
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<GlTexture> {
        let target = texture_target(desc.kind);
        unsafe {
            let texture = self
                .gl
                .create_texture()
                .map_err(|e| anyhow!("glGenTextures: {e}"))?;
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(target, Some(texture));
            let faces: Vec<u32> = match desc.kind {
                TextureKind::Flat => vec![glow::TEXTURE_2D],
                TextureKind::Cube => CubeMapFace::ALL.into_iter().map(cube_face_target).collect(),
            };
            for face in faces {
                self.gl.tex_image_2d(
                    face,
                    0,
                    glow::RGBA8 as i32,
                    desc.width as i32,
                    desc.height as i32,
                    0,
                    glow::BGRA,
                    glow::UNSIGNED_BYTE,
                    PixelUnpackData::Slice(None),
                );
            }
            self.gl.bind_texture(target, None);
            Ok(texture)
        }
    }

    fn upload_texture(
        &mut self,
        texture: GlTexture,
        desc: &TextureDesc,
        face: Option<CubeMapFace>,
        pixels: &[PixelColor],
    ) {
        let target = texture_target(desc.kind);
        let image_target = face.map_or(glow::TEXTURE_2D, cube_face_target);
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(target, Some(texture));
            self.gl.tex_image_2d(
                image_target,
                0,
                glow::RGBA8 as i32,
                desc.width as i32,
                desc.height as i32,
                0,
                glow::BGRA,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(Some(bytemuck::cast_slice(pixels))),
            );
            if face.is_none_or(CubeMapFace::is_last) {
                self.gl.generate_mipmap(target);
            }
            self.gl.bind_texture(target, None);
        }
    }

    fn upload_texture_from_buffer(
        &mut self,
        texture: GlTexture,
        desc: &TextureDesc,
        buffer: GlBuffer,
    ) {
        unsafe {
            self.gl.bind_buffer(glow::PIXEL_UNPACK_BUFFER, Some(buffer));
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                desc.width as i32,
                desc.height as i32,
                0,
                glow::BGRA,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::BufferOffset(0),
            );
            self.gl.generate_mipmap(glow::TEXTURE_2D);
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            self.gl.bind_buffer(glow::PIXEL_UNPACK_BUFFER, None);
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<(GlTexture, TextureKind)>) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            match texture {
                Some((texture, kind)) => self.gl.bind_texture(texture_target(kind), Some(texture)),
                None => self.gl.bind_texture(glow::TEXTURE_2D, None),
            }
        }
    }

    fn delete_texture(&mut self, texture: GlTexture) {
        unsafe { self.gl.delete_texture(texture) };
    }

    fn create_framebuffer(
        &mut self,
        texture: GlTexture,
        desc: &TextureDesc,
        depth: bool,
    ) -> Result<GlFramebuffer> {
        unsafe {
            let framebuffer = self
                .gl
                .create_framebuffer()
                .map_err(|e| anyhow!("glGenFramebuffers: {e}"))?;
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );

            let mut renderbuffer = None;
            if depth {
                let rb = self
                    .gl
                    .create_renderbuffer()
                    .map_err(|e| anyhow!("glGenRenderbuffers: {e}"))?;
                self.gl.bind_renderbuffer(glow::RENDERBUFFER, Some(rb));
                self.gl.renderbuffer_storage(
                    glow::RENDERBUFFER,
                    glow::DEPTH_COMPONENT24,
                    desc.width as i32,
                    desc.height as i32,
                );
                self.gl.bind_renderbuffer(glow::RENDERBUFFER, None);
                self.gl.framebuffer_renderbuffer(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_ATTACHMENT,
                    glow::RENDERBUFFER,
                    Some(rb),
                );
                renderbuffer = Some(rb);
            }

            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if status != glow::FRAMEBUFFER_COMPLETE {
                self.gl.delete_framebuffer(framebuffer);
                if let Some(rb) = renderbuffer {
                    self.gl.delete_renderbuffer(rb);
                }
                bail!("framebuffer incomplete (status 0x{status:04X})");
            }

            if let Some(rb) = renderbuffer {
                self.depth_buffers.insert(framebuffer, rb);
            }
            Ok(framebuffer)
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<GlFramebuffer>) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) };
    }

    fn delete_framebuffer(&mut self, framebuffer: GlFramebuffer) {
        unsafe {
            self.gl.delete_framebuffer(framebuffer);
            if let Some(rb) = self.depth_buffers.remove(&framebuffer) {
                self.gl.delete_renderbuffer(rb);
            }
        }
    }

    fn copy_framebuffer_to_cube_face(
        &mut self,
        texture: GlTexture,
        face: CubeMapFace,
        size: u32,
        generate_mipmaps: bool,
    ) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_CUBE_MAP, Some(texture));
            self.gl.copy_tex_sub_image_2d(
                cube_face_target(face),
                0,
                0,
                0,
                0,
                0,
                size as i32,
                size as i32,
            );
            if generate_mipmaps {
                self.gl.generate_mipmap(glow::TEXTURE_CUBE_MAP);
            }
            self.gl.bind_texture(glow::TEXTURE_CUBE_MAP, None);
        }
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<GlSampler> {
        unsafe {
            let sampler = self
                .gl
                .create_sampler()
                .map_err(|e| anyhow!("glGenSamplers: {e}"))?;
            let wrap = wrap_mode(desc.wrap);
            self.gl
                .sampler_parameter_i32(sampler, glow::TEXTURE_MIN_FILTER, min_filter(desc.key.min));
            self.gl
                .sampler_parameter_i32(sampler, glow::TEXTURE_MAG_FILTER, mag_filter(desc.key.mag));
            self.gl.sampler_parameter_i32(sampler, glow::TEXTURE_WRAP_S, wrap);
            self.gl.sampler_parameter_i32(sampler, glow::TEXTURE_WRAP_T, wrap);
            self.gl.sampler_parameter_i32(sampler, glow::TEXTURE_WRAP_R, wrap);
            if desc.key.max_anisotropy > 1.0 {
                self.gl.sampler_parameter_f32(
                    sampler,
                    TEXTURE_MAX_ANISOTROPY,
                    desc.key.max_anisotropy,
                );
            }
            Ok(sampler)
        }
    }

    fn bind_sampler(&mut self, unit: u32, sampler: Option<GlSampler>) {
        unsafe { self.gl.bind_sampler(unit, sampler) };
    }

    fn delete_sampler(&mut self, sampler: GlSampler) {
        unsafe { self.gl.delete_sampler(sampler) };
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        unsafe { self.gl.viewport(0, 0, width as i32, height as i32) };
    }

    fn clear(&mut self, color: Option<PixelColor>, depth: Option<f32>) {
        let mut mask = 0;
        unsafe {
            if let Some(color) = color {
                let [r, g, b, a] = color.to_f32();
                self.gl.clear_color(r, g, b, a);
                mask |= glow::COLOR_BUFFER_BIT;
            }
            if let Some(depth) = depth {
                self.gl.enable(glow::DEPTH_TEST);
                self.gl.depth_mask(true);
                self.gl.clear_depth_f32(depth);
                mask |= glow::DEPTH_BUFFER_BIT;
            }
            if mask != 0 {
                self.gl.clear(mask);
            }
        }
    }

    fn set_rasterizer(&mut self, cull: CullMode, fill: FillMode) {
        unsafe {
            match cull {
                CullMode::None => self.gl.disable(glow::CULL_FACE),
                CullMode::Clockwise => {
                    self.gl.enable(glow::CULL_FACE);
                    self.gl.front_face(glow::CW);
                }
            }
            let mode = match fill {
                FillMode::Solid => glow::FILL,
                FillMode::Wireframe => glow::LINE,
            };
            self.gl.polygon_mode(glow::FRONT_AND_BACK, mode);
        }
    }

    fn set_blend(&mut self, blend: Option<BlendState>) {
        unsafe {
            match blend {
                None => self.gl.disable(glow::BLEND),
                Some(state) => {
                    self.gl.enable(glow::BLEND);
                    self.gl.blend_equation(blend_equation(state.operation));
                    self.gl
                        .blend_func(blend_factor(state.source), blend_factor(state.destination));
                }
            }
        }
    }

    fn set_depth(&mut self, depth: Option<DepthState>) {
        unsafe {
            match depth {
                None => self.gl.disable(glow::DEPTH_TEST),
                Some(state) => {
                    self.gl.enable(glow::DEPTH_TEST);
                    self.gl.depth_func(glow::LEQUAL);
                    self.gl.depth_mask(state.write);
                }
            }
        }
    }

    fn draw_arrays(&mut self, primitive: PrimitiveType, first: u32, count: u32) {
        unsafe {
            self.gl
                .draw_arrays(primitive_mode(primitive), first as i32, count as i32)
        };
    }

    fn draw_indexed(
        &mut self,
        primitive: PrimitiveType,
        count: u32,
        index_offset: usize,
        base_vertex: i32,
    ) {
        unsafe {
            self.gl.draw_elements_base_vertex(
                primitive_mode(primitive),
                count as i32,
                glow::UNSIGNED_INT,
                index_offset as i32,
                base_vertex,
            );
        }
    }

    fn poll_error(&mut self) -> Option<u32> {
        let error = unsafe { self.gl.get_error() };
        (error != glow::NO_ERROR).then_some(error)
    }

    fn enable_debug_output(&mut self, log: DebugLog) {
        if !self.gl.supports_debug() {
            log::warn!("GL debug output unavailable on this context");
            return;
        }
        unsafe {
            self.gl.enable(glow::DEBUG_OUTPUT);
            self.gl
                .debug_message_callback(move |_source, _kind, _id, _severity, message| {
                    log.write_line(message);
                });
        }
    }
}
