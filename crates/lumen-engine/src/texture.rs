//! 2D textures decoded from raster images.

use std::cell::Cell;
use std::path::Path;

use image::DynamicImage;

use crate::error::{EngineError, Result};
use crate::gl::{BindGuard, GlContext, TextureTarget};

/// Pixel dimensions of a loaded texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureDimensions {
    pub width: u32,
    pub height: u32,
    /// Always 4: images are expanded to RGBA8 on load.
    pub channels: u32,
}

/// One texture object, released when dropped.
///
/// Dimensions are `None` until a load succeeds; a failed load leaves the
/// previous state untouched.
pub struct Texture {
    ctx: GlContext,
    handle: u32,
    target: TextureTarget,
    dimensions: Option<TextureDimensions>,
    last_unit: Cell<u32>,
}

impl Texture {
    pub fn new(ctx: &GlContext, target: TextureTarget) -> Self {
        let handle = ctx.api().create_texture();
        if handle == 0 {
            log::warn!("device refused to allocate a texture");
        }
        Self {
            ctx: ctx.clone(),
            handle,
            target,
            dimensions: None,
            last_unit: Cell::new(0),
        }
    }

    /// Decodes the image at `path` and uploads it.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|e| Self::decode_error(path.display(), e))?;
        self.upload(image);
        log::debug!("loaded texture {} ({:?})", path.display(), self.dimensions);
        Ok(())
    }

    /// Decodes an encoded image held in memory (PNG, JPEG, ...).
    pub fn load_from_memory(&mut self, bytes: &[u8]) -> Result<()> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| Self::decode_error(format_args!("<{} bytes in memory>", bytes.len()), e))?;
        self.upload(image);
        Ok(())
    }

    fn decode_error(origin: impl std::fmt::Display, err: image::ImageError) -> EngineError {
        let err = EngineError::DecodeFailed {
            origin: origin.to_string(),
            reason: err.to_string(),
        };
        log::error!("{err}");
        err
    }

    fn upload(&mut self, image: DynamicImage) {
        // Image rows run top-down; texture rows run bottom-up.
        let rgba = image.flipv().into_rgba8();
        let (width, height) = rgba.dimensions();

        let api = self.ctx.api();
        let target = self.target.gl_enum();
        let _bound = BindGuard::texture(api, target, self.handle);
        api.tex_image_2d_rgba8(target, width, height, rgba.as_raw());
        api.generate_mipmap(target);
        api.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, glow::LINEAR_MIPMAP_LINEAR as i32);
        api.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        api.tex_parameter_i32(target, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
        api.tex_parameter_i32(target, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);

        self.dimensions = Some(TextureDimensions {
            width,
            height,
            channels: 4,
        });
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    pub fn dimensions(&self) -> Option<TextureDimensions> {
        self.dimensions
    }

    /// Activates texture unit `unit` and binds this texture to it.
    ///
    /// The unit stays active afterwards.
    pub fn bind(&self, unit: u32) {
        let api = self.ctx.api();
        api.active_texture(unit);
        api.bind_texture(self.target.gl_enum(), self.handle);
        self.last_unit.set(unit);
    }

    /// Clears the binding on the unit this texture was last bound to.
    pub fn unbind(&self) {
        let api = self.ctx.api();
        api.active_texture(self.last_unit.get());
        api.bind_texture(self.target.gl_enum(), 0);
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if self.handle != 0 {
            self.ctx.api().delete_texture(self.handle);
        }
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("handle", &self.handle)
            .field("target", &self.target)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}
