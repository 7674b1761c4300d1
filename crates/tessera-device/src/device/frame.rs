use super::{DeviceError, RenderDevice};
use crate::backend::Backend;
use crate::paint::PixelColor;
use crate::resources::{CubeMapFace, Texture, TextureId, TextureKind};
use crate::state::DirtyFlags;

impl<B: Backend> RenderDevice<B> {
    /// Starts rendering into `target` (or the backbuffer), optionally clearing it.
    ///
    /// Depth is cleared to 1.0 only when both `clear` and `use_depth` are set.
    /// Every state category is reapplied on the next draw.
    pub fn begin_frame(
        &mut self,
        target: Option<&Texture>,
        clear: Option<PixelColor>,
        use_depth: bool,
    ) -> Result<(), DeviceError> {
        let target = target.map(|t| self.texture_id(t)).transpose();
        let result = match target {
            Ok(target) => self.start_rendering(target, clear, use_depth),
            Err(err) => Err(err),
        };
        self.record(result)
    }

    fn start_rendering(
        &mut self,
        target: Option<TextureId>,
        clear: Option<PixelColor>,
        use_depth: bool,
    ) -> Result<(), DeviceError> {
        if !self.core.context.make_current() {
            return Err(DeviceError::ContextNotCurrent);
        }

        let resolved = match target {
            Some(id) => self.render_target(id, use_depth).map(|framebuffer| {
                let desc = self.core.textures[id].desc;
                (Some(framebuffer), desc.width, desc.height)
            }),
            None => Ok((None, self.core.context.width(), self.core.context.height())),
        };
        // No frame is active until a target is bound.
        self.core.context_is_current = resolved.is_ok();
        let (framebuffer, width, height) = resolved?;

        let backend = &mut self.core.backend;
        backend.bind_framebuffer(framebuffer);
        backend.set_viewport(width, height);
        if let Some(color) = clear {
            backend.clear(Some(color), use_depth.then_some(1.0));
        }

        self.tracker.force_all_dirty();
        self.core.bound_sampler = None;
        self.core.check_error()
    }

    /// Framebuffer for a flat texture, created on first use and rebuilt when the
    /// depth requirement changes.
    fn render_target(&mut self, id: TextureId, depth: bool) -> Result<B::Framebuffer, DeviceError> {
        let record = &self.core.textures[id];
        if record.desc.kind != TextureKind::Flat {
            return Err(DeviceError::WrongTextureKind { expected: "flat" });
        }
        match record.target {
            Some((framebuffer, has_depth)) if has_depth == depth => return Ok(framebuffer),
            Some((framebuffer, _)) => {
                self.core.backend.delete_framebuffer(framebuffer);
                self.core.textures[id].target = None;
            }
            None => {}
        }

        let texture = self.core.gpu_texture(id)?;
        let desc = self.core.textures[id].desc;
        let framebuffer = self
            .core
            .backend
            .create_framebuffer(texture, &desc, depth)
            .map_err(|e| DeviceError::RenderTarget(format!("{e:#}")))?;
        self.core.textures[id].target = Some((framebuffer, depth));
        Ok(framebuffer)
    }

    /// Marks the frame finished. The next resource operation re-acquires the context.
    pub fn end_frame(&mut self) {
        self.core.context_is_current = false;
    }

    /// Swaps buffers and destroys resources released since the last present.
    pub fn present(&mut self) -> Result<(), DeviceError> {
        let result = self.swap_and_drain();
        self.record(result)
    }

    fn swap_and_drain(&mut self) -> Result<(), DeviceError> {
        if !self.core.context.make_current() {
            return Err(DeviceError::ContextNotCurrent);
        }
        self.core.context.swap_buffers();
        self.drain_deletions();
        self.core.stats.frames_presented += 1;
        self.core.check_error()
    }

    /// Fills a texture with `color` by rendering into it.
    pub fn clear_texture(
        &mut self,
        texture: &Texture,
        color: PixelColor,
    ) -> Result<(), DeviceError> {
        self.begin_frame(Some(texture), Some(color), false)?;
        self.end_frame();
        Ok(())
    }

    /// Copies the bound framebuffer into one face of a cube texture. Mipmaps are
    /// regenerated after the last face.
    pub fn copy_texture(
        &mut self,
        texture: &Texture,
        face: CubeMapFace,
    ) -> Result<(), DeviceError> {
        let id = self.texture_id(texture);
        let result = match id {
            Ok(id) => self.copy_to_cube_face(id, face),
            Err(err) => Err(err),
        };
        self.record(result)
    }

    fn copy_to_cube_face(&mut self, id: TextureId, face: CubeMapFace) -> Result<(), DeviceError> {
        let desc = self.core.textures[id].desc;
        if desc.kind != TextureKind::Cube {
            return Err(DeviceError::WrongTextureKind { expected: "cube" });
        }

        self.core.ensure_current();
        let texture = self.core.gpu_texture(id)?;
        self.core
            .backend
            .copy_framebuffer_to_cube_face(texture, face, desc.width, face.is_last());
        self.tracker.invalidate(DirtyFlags::TEXTURES);
        self.core.check_error()
    }
}
