//! In-memory backend.
//!
//! Keeps buffer bytes and texture pixels on the CPU, records draws and uniform
//! pushes, and counts every call. Errors behave like a GL error flag: invalid calls
//! set a sticky code that [`Backend::poll_error`] returns and clears.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use anyhow::{anyhow, bail, Result};
use parking_lot::Mutex;

use super::{
    Backend, BlendState, BufferTarget, BufferUsage, DepthState, RenderContext, SamplerDesc,
    INVALID_OPERATION,
};
use crate::arena::VertexFormat;
use crate::draw::PrimitiveType;
use crate::logging::DebugLog;
use crate::paint::PixelColor;
use crate::resources::{CubeMapFace, TextureDesc, TextureKind};
use crate::state::{CullMode, FillMode, UniformKind};

const INVALID_VALUE: u32 = 0x0501;

/// Object name handed out by [`HeadlessBackend`]. Never zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HeadlessCall {
    CreateBuffer,
    UploadBuffer,
    WriteBuffer,
    CopyBuffer,
    DeleteBuffer,
    MapBuffer,
    UnmapBuffer,
    CreateVertexArray,
    BindVertexArray,
    DeleteVertexArray,
    BindIndexBuffer,
    CreateProgram,
    UseProgram,
    SetUniform,
    DeleteProgram,
    CreateTexture,
    UploadTexture,
    BindTexture,
    DeleteTexture,
    CreateFramebuffer,
    BindFramebuffer,
    DeleteFramebuffer,
    CopyFramebuffer,
    CreateSampler,
    BindSampler,
    DeleteSampler,
    SetViewport,
    Clear,
    SetRasterizer,
    SetBlend,
    SetDepth,
    DrawArrays,
    DrawIndexed,
}

/// Per-call counters.
#[derive(Debug, Default, Clone)]
pub struct HeadlessCounters {
    counts: HashMap<HeadlessCall, u64>,
}

impl HeadlessCounters {
    pub fn get(&self, call: HeadlessCall) -> u64 {
        self.counts.get(&call).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    fn bump(&mut self, call: HeadlessCall) {
        *self.counts.entry(call).or_insert(0) += 1;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawKind {
    Arrays { first: u32, count: u32 },
    Indexed { count: u32, index_offset: usize, base_vertex: i32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub primitive: PrimitiveType,
    pub kind: DrawKind,
    pub vertex_array: ObjectId,
    /// Format of the bound vertex array.
    pub format: VertexFormat,
    /// Buffer the vertex array sources from.
    pub vertex_buffer: ObjectId,
    pub index_buffer: Option<ObjectId>,
    pub program: Option<ObjectId>,
    pub texture: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformPush {
    pub program: ObjectId,
    pub name: String,
    pub values: Vec<f32>,
}

/// Uniform location: the program plus the uniform's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessUniform {
    program: ObjectId,
    name: String,
}

#[derive(Debug)]
struct BufferObject {
    data: Vec<u8>,
    mapped: Option<usize>,
}

#[derive(Debug)]
struct VertexArrayObject {
    format: VertexFormat,
    buffer: ObjectId,
    index_buffer: Option<ObjectId>,
}

#[derive(Debug)]
struct TextureObject {
    desc: TextureDesc,
    faces: Vec<Vec<PixelColor>>,
    mip_generations: u32,
}

#[derive(Debug)]
struct FramebufferObject {
    texture: ObjectId,
}

/// Software [`Backend`] for tests and headless runs.
#[derive(Debug)]
pub struct HeadlessBackend {
    next_id: u32,
    buffers: HashMap<ObjectId, BufferObject>,
    vertex_arrays: HashMap<ObjectId, VertexArrayObject>,
    programs: HashMap<ObjectId, String>,
    rejected_programs: HashMap<String, String>,
    textures: HashMap<ObjectId, TextureObject>,
    framebuffers: HashMap<ObjectId, FramebufferObject>,
    samplers: HashMap<ObjectId, SamplerDesc>,

    backbuffer: Vec<PixelColor>,
    backbuffer_size: (u32, u32),

    bound_vertex_array: Option<ObjectId>,
    bound_program: Option<ObjectId>,
    bound_framebuffer: Option<ObjectId>,
    bound_texture: Option<ObjectId>,
    bound_sampler: Option<ObjectId>,
    viewport: (u32, u32),
    rasterizer: (CullMode, FillMode),
    blend: Option<BlendState>,
    depth: Option<DepthState>,

    draws: Vec<RecordedDraw>,
    uniform_pushes: Vec<UniformPush>,
    counters: HeadlessCounters,
    fail_on: Vec<HeadlessCall>,
    error: Option<u32>,
    debug_log: Option<DebugLog>,
}

impl HeadlessBackend {
    /// A backend whose backbuffer is `width x height` transparent pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            next_id: 1,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            programs: HashMap::new(),
            rejected_programs: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            samplers: HashMap::new(),
            backbuffer: vec![PixelColor::TRANSPARENT; width as usize * height as usize],
            backbuffer_size: (width, height),
            bound_vertex_array: None,
            bound_program: None,
            bound_framebuffer: None,
            bound_texture: None,
            bound_sampler: None,
            viewport: (width, height),
            rasterizer: (CullMode::None, FillMode::Solid),
            blend: None,
            depth: None,
            draws: Vec::new(),
            uniform_pushes: Vec::new(),
            counters: HeadlessCounters::default(),
            fail_on: Vec::new(),
            error: None,
            debug_log: None,
        }
    }

    // ── test hooks ────────────────────────────────────────────────────────

    /// The next `call` fails: creation calls return an error, others raise
    /// `INVALID_OPERATION`.
    pub fn fail_on(&mut self, call: HeadlessCall) {
        self.fail_on.push(call);
    }

    /// Programs named `name` fail to compile with `log`.
    pub fn reject_program(&mut self, name: &str, log: &str) {
        self.rejected_programs.insert(name.to_owned(), log.to_owned());
    }

    /// Raises an error as if the last call had been invalid.
    pub fn raise_error(&mut self, code: u32) {
        self.set_error(code);
    }

    // ── inspection ────────────────────────────────────────────────────────

    pub fn counters(&self) -> &HeadlessCounters {
        &self.counters
    }

    pub fn count(&self, call: HeadlessCall) -> u64 {
        self.counters.get(call)
    }

    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    pub fn uniform_pushes(&self) -> &[UniformPush] {
        &self.uniform_pushes
    }

    pub fn take_uniform_pushes(&mut self) -> Vec<UniformPush> {
        std::mem::take(&mut self.uniform_pushes)
    }

    pub fn buffer_data(&self, buffer: ObjectId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn texture_pixels(&self, texture: ObjectId, face: usize) -> Option<&[PixelColor]> {
        self.textures
            .get(&texture)
            .and_then(|t| t.faces.get(face))
            .map(Vec::as_slice)
    }

    pub fn mip_generations(&self, texture: ObjectId) -> u32 {
        self.textures.get(&texture).map_or(0, |t| t.mip_generations)
    }

    pub fn backbuffer(&self) -> &[PixelColor] {
        &self.backbuffer
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn rasterizer(&self) -> (CullMode, FillMode) {
        self.rasterizer
    }

    pub fn blend(&self) -> Option<BlendState> {
        self.blend
    }

    pub fn depth(&self) -> Option<DepthState> {
        self.depth
    }

    pub fn bound_program(&self) -> Option<ObjectId> {
        self.bound_program
    }

    pub fn bound_framebuffer(&self) -> Option<ObjectId> {
        self.bound_framebuffer
    }

    pub fn bound_sampler(&self) -> Option<ObjectId> {
        self.bound_sampler
    }

    pub fn sampler_desc(&self, sampler: ObjectId) -> Option<&SamplerDesc> {
        self.samplers.get(&sampler)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_samplers(&self) -> usize {
        self.samplers.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn alloc_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Counts the call and consumes a pending injected failure for it.
    fn enter(&mut self, call: HeadlessCall) -> bool {
        self.counters.bump(call);
        match self.fail_on.iter().position(|c| *c == call) {
            Some(i) => {
                self.fail_on.remove(i);
                true
            }
            None => false,
        }
    }

    /// Like [`enter`](Self::enter) for calls that report through the error flag.
    fn enter_checked(&mut self, call: HeadlessCall) -> bool {
        if self.enter(call) {
            self.set_error(INVALID_OPERATION);
            return false;
        }
        true
    }

    fn set_error(&mut self, code: u32) {
        if let Some(log) = &self.debug_log {
            log.write_line(&format!("headless: error 0x{code:04X}"));
        }
        // The first error sticks until polled.
        self.error.get_or_insert(code);
    }

    fn target_pixels_mut(&mut self) -> Option<&mut Vec<PixelColor>> {
        match self.bound_framebuffer {
            None => Some(&mut self.backbuffer),
            Some(fb) => {
                let texture = self.framebuffers.get(&fb)?.texture;
                self.textures.get_mut(&texture)?.faces.get_mut(0)
            }
        }
    }

    fn target_size(&self) -> (u32, u32) {
        self.bound_framebuffer
            .and_then(|fb| self.framebuffers.get(&fb))
            .and_then(|fb| self.textures.get(&fb.texture))
            .map_or(self.backbuffer_size, |t| (t.desc.width, t.desc.height))
    }

    fn record_draw(&mut self, primitive: PrimitiveType, kind: DrawKind) {
        let Some((vertex_array, vao)) = self
            .bound_vertex_array
            .and_then(|id| self.vertex_arrays.get(&id).map(|vao| (id, vao)))
        else {
            self.set_error(INVALID_OPERATION);
            return;
        };

        if matches!(kind, DrawKind::Indexed { .. }) && vao.index_buffer.is_none() {
            self.set_error(INVALID_OPERATION);
            return;
        }

        let draw = RecordedDraw {
            primitive,
            kind,
            vertex_array,
            format: vao.format,
            vertex_buffer: vao.buffer,
            index_buffer: vao.index_buffer,
            program: self.bound_program,
            texture: self.bound_texture,
        };
        self.draws.push(draw);
    }
}

impl Backend for HeadlessBackend {
    type Buffer = ObjectId;
    type VertexArray = ObjectId;
    type Program = ObjectId;
    type Uniform = HeadlessUniform;
    type Texture = ObjectId;
    type Framebuffer = ObjectId;
    type Sampler = ObjectId;

    fn create_buffer(
        &mut self,
        _target: BufferTarget,
        size: usize,
        _usage: BufferUsage,
    ) -> Result<ObjectId> {
        if self.enter(HeadlessCall::CreateBuffer) {
            bail!("buffer allocation of {size} bytes failed");
        }
        let id = self.alloc_id();
        self.buffers.insert(
            id,
            BufferObject {
                data: vec![0; size],
                mapped: None,
            },
        );
        Ok(id)
    }

    fn upload_buffer(
        &mut self,
        _target: BufferTarget,
        buffer: ObjectId,
        data: &[u8],
        _usage: BufferUsage,
    ) {
        if !self.enter_checked(HeadlessCall::UploadBuffer) {
            return;
        }
        match self.buffers.get_mut(&buffer) {
            Some(b) => b.data = data.to_vec(),
            None => self.set_error(INVALID_OPERATION),
        }
    }

    fn write_buffer(
        &mut self,
        _target: BufferTarget,
        buffer: ObjectId,
        offset: usize,
        data: &[u8],
    ) {
        if !self.enter_checked(HeadlessCall::WriteBuffer) {
            return;
        }
        let Some(b) = self.buffers.get_mut(&buffer) else {
            self.set_error(INVALID_OPERATION);
            return;
        };
        match b.data.get_mut(offset..offset + data.len()) {
            Some(dst) => dst.copy_from_slice(data),
            None => self.set_error(INVALID_VALUE),
        }
    }

    fn copy_buffer(
        &mut self,
        src: ObjectId,
        dst: ObjectId,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
    ) {
        if !self.enter_checked(HeadlessCall::CopyBuffer) {
            return;
        }
        let bytes = match self
            .buffers
            .get(&src)
            .and_then(|b| b.data.get(src_offset..src_offset + len))
        {
            Some(bytes) => bytes.to_vec(),
            None => {
                self.set_error(INVALID_VALUE);
                return;
            }
        };
        match self
            .buffers
            .get_mut(&dst)
            .and_then(|b| b.data.get_mut(dst_offset..dst_offset + len))
        {
            Some(target) => target.copy_from_slice(&bytes),
            None => self.set_error(INVALID_VALUE),
        }
    }

    fn delete_buffer(&mut self, buffer: ObjectId) {
        self.enter(HeadlessCall::DeleteBuffer);
        self.buffers.remove(&buffer);
    }

    fn map_buffer(&mut self, buffer: ObjectId, len: usize) -> Result<()> {
        if self.enter(HeadlessCall::MapBuffer) {
            bail!("mapping buffer {buffer:?} failed");
        }
        let b = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| anyhow!("unknown buffer {buffer:?}"))?;
        if b.data.len() < len {
            b.data.resize(len, 0);
        }
        b.mapped = Some(len);
        Ok(())
    }

    fn mapped_buffer(&mut self, buffer: ObjectId) -> Option<&mut [u8]> {
        let b = self.buffers.get_mut(&buffer)?;
        let len = b.mapped?;
        Some(&mut b.data[..len])
    }

    fn unmap_buffer(&mut self, buffer: ObjectId) {
        self.enter(HeadlessCall::UnmapBuffer);
        match self.buffers.get_mut(&buffer) {
            Some(b) if b.mapped.is_some() => b.mapped = None,
            _ => self.set_error(INVALID_OPERATION),
        }
    }

    fn create_vertex_array(&mut self, format: VertexFormat, buffer: ObjectId) -> Result<ObjectId> {
        if self.enter(HeadlessCall::CreateVertexArray) {
            bail!("vertex array creation failed");
        }
        if !self.buffers.contains_key(&buffer) {
            bail!("vertex array over unknown buffer {buffer:?}");
        }
        let id = self.alloc_id();
        self.vertex_arrays.insert(
            id,
            VertexArrayObject {
                format,
                buffer,
                index_buffer: None,
            },
        );
        Ok(id)
    }

    fn bind_vertex_array(&mut self, array: Option<ObjectId>) {
        if !self.enter_checked(HeadlessCall::BindVertexArray) {
            return;
        }
        if array.is_some_and(|a| !self.vertex_arrays.contains_key(&a)) {
            self.set_error(INVALID_OPERATION);
            return;
        }
        self.bound_vertex_array = array;
    }

    fn delete_vertex_array(&mut self, array: ObjectId) {
        self.enter(HeadlessCall::DeleteVertexArray);
        self.vertex_arrays.remove(&array);
        if self.bound_vertex_array == Some(array) {
            self.bound_vertex_array = None;
        }
    }

    fn bind_index_buffer(&mut self, buffer: Option<ObjectId>) {
        if !self.enter_checked(HeadlessCall::BindIndexBuffer) {
            return;
        }
        let Some(vao) = self
            .bound_vertex_array
            .and_then(|id| self.vertex_arrays.get_mut(&id))
        else {
            // Nothing to attach to; matches a core-profile context with no array bound.
            if buffer.is_some() {
                self.set_error(INVALID_OPERATION);
            }
            return;
        };
        vao.index_buffer = buffer;
    }

    fn create_program(
        &mut self,
        name: &str,
        _vertex: &str,
        _fragment: &str,
    ) -> std::result::Result<ObjectId, String> {
        if self.enter(HeadlessCall::CreateProgram) {
            return Err(format!("{name}: link failed"));
        }
        if let Some(log) = self.rejected_programs.get(name) {
            return Err(log.clone());
        }
        let id = self.alloc_id();
        self.programs.insert(id, name.to_owned());
        Ok(id)
    }

    fn uniform_location(&mut self, program: ObjectId, name: &str) -> Option<HeadlessUniform> {
        self.programs.contains_key(&program).then(|| HeadlessUniform {
            program,
            name: name.to_owned(),
        })
    }

    fn use_program(&mut self, program: Option<ObjectId>) {
        if !self.enter_checked(HeadlessCall::UseProgram) {
            return;
        }
        if program.is_some_and(|p| !self.programs.contains_key(&p)) {
            self.set_error(INVALID_OPERATION);
            return;
        }
        self.bound_program = program;
    }

    fn set_uniform(&mut self, location: &HeadlessUniform, kind: UniformKind, values: &[f32]) {
        if !self.enter_checked(HeadlessCall::SetUniform) {
            return;
        }
        if self.bound_program != Some(location.program) || values.len() != kind.components() {
            self.set_error(INVALID_OPERATION);
            return;
        }
        self.uniform_pushes.push(UniformPush {
            program: location.program,
            name: location.name.clone(),
            values: values.to_vec(),
        });
    }

    fn delete_program(&mut self, program: ObjectId) {
        self.enter(HeadlessCall::DeleteProgram);
        self.programs.remove(&program);
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<ObjectId> {
        if self.enter(HeadlessCall::CreateTexture) {
            bail!("texture creation failed");
        }
        if desc.width == 0 || desc.height == 0 {
            bail!("zero-sized texture {}x{}", desc.width, desc.height);
        }
        let id = self.alloc_id();
        self.textures.insert(
            id,
            TextureObject {
                desc: *desc,
                faces: vec![vec![PixelColor::TRANSPARENT; desc.texel_count()]; desc.face_count()],
                mip_generations: 0,
            },
        );
        Ok(id)
    }

    fn upload_texture(
        &mut self,
        texture: ObjectId,
        desc: &TextureDesc,
        face: Option<CubeMapFace>,
        pixels: &[PixelColor],
    ) {
        if !self.enter_checked(HeadlessCall::UploadTexture) {
            return;
        }
        let index = face.map_or(0, CubeMapFace::index);
        match self.textures.get_mut(&texture).and_then(|t| t.faces.get_mut(index)) {
            Some(dst) if pixels.len() == desc.texel_count() => dst.copy_from_slice(pixels),
            _ => self.set_error(INVALID_VALUE),
        }
    }

    fn upload_texture_from_buffer(
        &mut self,
        texture: ObjectId,
        desc: &TextureDesc,
        buffer: ObjectId,
    ) {
        if !self.enter_checked(HeadlessCall::UploadTexture) {
            return;
        }
        let Some(b) = self.buffers.get(&buffer) else {
            self.set_error(INVALID_OPERATION);
            return;
        };
        if b.mapped.is_some() || b.data.len() < desc.byte_len() {
            self.set_error(INVALID_OPERATION);
            return;
        }
        let pixels: Vec<PixelColor> = bytemuck::cast_slice(&b.data[..desc.byte_len()]).to_vec();
        match self.textures.get_mut(&texture).and_then(|t| t.faces.get_mut(0)) {
            Some(dst) if dst.len() == pixels.len() => *dst = pixels,
            _ => self.set_error(INVALID_VALUE),
        }
    }

    fn bind_texture(&mut self, _unit: u32, texture: Option<(ObjectId, TextureKind)>) {
        if !self.enter_checked(HeadlessCall::BindTexture) {
            return;
        }
        if let Some((id, kind)) = texture {
            if self.textures.get(&id).is_none_or(|t| t.desc.kind != kind) {
                self.set_error(INVALID_OPERATION);
                return;
            }
        }
        self.bound_texture = texture.map(|(id, _)| id);
    }

    fn delete_texture(&mut self, texture: ObjectId) {
        self.enter(HeadlessCall::DeleteTexture);
        self.textures.remove(&texture);
        if self.bound_texture == Some(texture) {
            self.bound_texture = None;
        }
    }

    fn create_framebuffer(
        &mut self,
        texture: ObjectId,
        _desc: &TextureDesc,
        _depth: bool,
    ) -> Result<ObjectId> {
        if self.enter(HeadlessCall::CreateFramebuffer) {
            bail!("framebuffer incomplete");
        }
        match self.textures.get(&texture) {
            Some(t) if t.desc.kind == TextureKind::Flat => {}
            Some(_) => bail!("cube textures cannot be framebuffer color attachments"),
            None => bail!("framebuffer over unknown texture {texture:?}"),
        }
        let id = self.alloc_id();
        self.framebuffers.insert(id, FramebufferObject { texture });
        Ok(id)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<ObjectId>) {
        if !self.enter_checked(HeadlessCall::BindFramebuffer) {
            return;
        }
        if framebuffer.is_some_and(|fb| !self.framebuffers.contains_key(&fb)) {
            self.set_error(INVALID_OPERATION);
            return;
        }
        self.bound_framebuffer = framebuffer;
    }

    fn delete_framebuffer(&mut self, framebuffer: ObjectId) {
        self.enter(HeadlessCall::DeleteFramebuffer);
        self.framebuffers.remove(&framebuffer);
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
    }

    fn copy_framebuffer_to_cube_face(
        &mut self,
        texture: ObjectId,
        face: CubeMapFace,
        size: u32,
        generate_mipmaps: bool,
    ) {
        if !self.enter_checked(HeadlessCall::CopyFramebuffer) {
            return;
        }
        let (src_width, src_height) = self.target_size();
        if size > src_width || size > src_height {
            self.set_error(INVALID_VALUE);
            return;
        }
        let Some(source) = self.target_pixels_mut().cloned() else {
            self.set_error(INVALID_OPERATION);
            return;
        };

        let Some(cube) = self.textures.get_mut(&texture) else {
            self.set_error(INVALID_OPERATION);
            return;
        };
        if cube.desc.kind != TextureKind::Cube || cube.desc.width != size {
            self.set_error(INVALID_OPERATION);
            return;
        }

        let size = size as usize;
        let dst = &mut cube.faces[face.index()];
        for row in 0..size {
            let src_row = row * src_width as usize;
            dst[row * size..(row + 1) * size].copy_from_slice(&source[src_row..src_row + size]);
        }
        if generate_mipmaps {
            cube.mip_generations += 1;
        }
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<ObjectId> {
        if self.enter(HeadlessCall::CreateSampler) {
            bail!("sampler creation failed");
        }
        let id = self.alloc_id();
        self.samplers.insert(id, *desc);
        Ok(id)
    }

    fn bind_sampler(&mut self, _unit: u32, sampler: Option<ObjectId>) {
        if !self.enter_checked(HeadlessCall::BindSampler) {
            return;
        }
        if sampler.is_some_and(|s| !self.samplers.contains_key(&s)) {
            self.set_error(INVALID_OPERATION);
            return;
        }
        self.bound_sampler = sampler;
    }

    fn delete_sampler(&mut self, sampler: ObjectId) {
        self.enter(HeadlessCall::DeleteSampler);
        self.samplers.remove(&sampler);
        if self.bound_sampler == Some(sampler) {
            self.bound_sampler = None;
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if self.enter_checked(HeadlessCall::SetViewport) {
            self.viewport = (width, height);
        }
    }

    fn clear(&mut self, color: Option<PixelColor>, depth: Option<f32>) {
        if !self.enter_checked(HeadlessCall::Clear) {
            return;
        }
        if depth.is_some() {
            self.depth = Some(DepthState { write: true });
        }
        if let Some(color) = color {
            match self.target_pixels_mut() {
                Some(pixels) => pixels.fill(color),
                None => self.set_error(INVALID_OPERATION),
            }
        }
    }

    fn set_rasterizer(&mut self, cull: CullMode, fill: FillMode) {
        if self.enter_checked(HeadlessCall::SetRasterizer) {
            self.rasterizer = (cull, fill);
        }
    }

    fn set_blend(&mut self, blend: Option<BlendState>) {
        if self.enter_checked(HeadlessCall::SetBlend) {
            self.blend = blend;
        }
    }

    fn set_depth(&mut self, depth: Option<DepthState>) {
        if self.enter_checked(HeadlessCall::SetDepth) {
            self.depth = depth;
        }
    }

    fn draw_arrays(&mut self, primitive: PrimitiveType, first: u32, count: u32) {
        if self.enter_checked(HeadlessCall::DrawArrays) {
            self.record_draw(primitive, DrawKind::Arrays { first, count });
        }
    }

    fn draw_indexed(
        &mut self,
        primitive: PrimitiveType,
        count: u32,
        index_offset: usize,
        base_vertex: i32,
    ) {
        if self.enter_checked(HeadlessCall::DrawIndexed) {
            self.record_draw(
                primitive,
                DrawKind::Indexed {
                    count,
                    index_offset,
                    base_vertex,
                },
            );
        }
    }

    fn poll_error(&mut self) -> Option<u32> {
        self.error.take()
    }

    fn enable_debug_output(&mut self, log: DebugLog) {
        log.write_line("headless: debug output enabled");
        self.debug_log = Some(log);
    }
}

// ── context ───────────────────────────────────────────────────────────────

#[derive(Debug)]
struct ContextInner {
    current: Mutex<Option<ThreadId>>,
    swaps: AtomicU64,
    size: Mutex<(u32, u32)>,
}

/// [`RenderContext`] that tracks which thread holds it. Clones share state.
#[derive(Debug, Clone)]
pub struct HeadlessContext {
    inner: Arc<ContextInner>,
}

impl HeadlessContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                current: Mutex::new(None),
                swaps: AtomicU64::new(0),
                size: Mutex::new((width, height)),
            }),
        }
    }

    pub fn swap_count(&self) -> u64 {
        self.inner.swaps.load(Ordering::Relaxed)
    }

    /// Thread the context is current on, if any.
    pub fn current_thread(&self) -> Option<ThreadId> {
        *self.inner.current.lock()
    }

    pub fn resize(&self, width: u32, height: u32) {
        *self.inner.size.lock() = (width, height);
    }
}

impl RenderContext for HeadlessContext {
    fn make_current(&mut self) -> bool {
        let me = thread::current().id();
        let mut current = self.inner.current.lock();
        match *current {
            Some(owner) if owner != me => false,
            _ => {
                *current = Some(me);
                true
            }
        }
    }

    fn clear_current(&mut self) {
        let me = thread::current().id();
        let mut current = self.inner.current.lock();
        if *current == Some(me) {
            *current = None;
        }
    }

    fn swap_buffers(&mut self) {
        self.inner.swaps.fetch_add(1, Ordering::Relaxed);
    }

    fn is_current(&self) -> bool {
        *self.inner.current.lock() == Some(thread::current().id())
    }

    fn width(&self) -> u32 {
        self.inner.size.lock().0
    }

    fn height(&self) -> u32 {
        self.inner.size.lock().1
    }
}
