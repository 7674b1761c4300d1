/// Texture dimensionality.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Flat,
    Cube,
}

/// Cube map faces in upload order. Mipmaps are regenerated after the last one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CubeMapFace {
    PositiveX,
    PositiveY,
    PositiveZ,
    NegativeX,
    NegativeY,
    NegativeZ,
}

impl CubeMapFace {
    pub const ALL: [CubeMapFace; 6] = [
        CubeMapFace::PositiveX,
        CubeMapFace::PositiveY,
        CubeMapFace::PositiveZ,
        CubeMapFace::NegativeX,
        CubeMapFace::NegativeY,
        CubeMapFace::NegativeZ,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn is_last(self) -> bool {
        matches!(self, CubeMapFace::NegativeZ)
    }
}

/// Size and kind of a texture. Cube textures are square with `width == height`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub kind: TextureKind,
}

impl TextureDesc {
    pub const fn flat(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            kind: TextureKind::Flat,
        }
    }

    pub const fn cube(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            kind: TextureKind::Cube,
        }
    }

    /// Texels per face.
    #[inline]
    pub const fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub const fn face_count(&self) -> usize {
        match self.kind {
            TextureKind::Flat => 1,
            TextureKind::Cube => 6,
        }
    }

    /// Bytes in a pixel-unpack buffer holding one face.
    #[inline]
    pub const fn byte_len(&self) -> usize {
        self.texel_count() * 4
    }
}
