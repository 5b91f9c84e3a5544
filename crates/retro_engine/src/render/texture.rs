//! Texture management
//!
//! Uploads decoded pixel buffers to the device and tracks one device-side
//! texture per source image. Source data arrives in the retro pixel
//! layouts asset files actually use; everything is converted to 8-bit RGBA
//! on the CPU before upload. An unrecognized format is logged and skipped
//! rather than aborting the batch.

use crate::render::api::{TextureFlags, TextureFormat, TextureHandle, TextureUpload};
use crate::render::primitives::{MeshLibrary, PixelFormat, Pixmap, PixmapData, TexturingMode};
use crate::render::{RenderResult, Renderer};

impl Renderer {
    /// Upload a complete RGBA or RGB image and return its device handle
    ///
    /// The new texture becomes the bound texture (tracked by the state
    /// cache). Filtering follows the configured preference.
    pub fn load_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        flags: TextureFlags,
        pixels: &[u8],
    ) -> RenderResult<TextureHandle> {
        let upload = TextureUpload {
            width,
            height,
            format,
            filtered: self.config.texture_filtering,
            flags,
            pixels,
        };
        let texture = self.device.create_texture(&upload)?;
        self.state
            .bind_texture(self.device.as_mut(), &mut self.stats, texture)?;
        Ok(texture)
    }

    /// Upload an externally decoded image
    pub fn load_image_texture(
        &mut self,
        image: &image::RgbaImage,
        flags: TextureFlags,
    ) -> RenderResult<TextureHandle> {
        self.load_texture(
            image.width(),
            image.height(),
            TextureFormat::Rgba8,
            flags,
            image.as_raw(),
        )
    }

    /// Delete a device texture
    pub fn unload_texture(&mut self, texture: TextureHandle) -> RenderResult<()> {
        self.device.delete_texture(texture)?;
        self.state.invalidate_texture(texture);
        Ok(())
    }

    /// Upload every texture of a decoded mesh library and stamp the device
    /// handle plus texturing mode onto the meshes that reference it
    ///
    /// Images with an unsupported pixel format (or an inconsistent buffer
    /// size) are logged and skipped; the remaining textures still upload.
    ///
    /// # Panics
    /// Panics if a library texture was already uploaded.
    pub fn upload_library_textures(&mut self, library: &mut MeshLibrary) -> RenderResult<()> {
        for index in 0..library.textures.len() {
            let pixmap = &library.textures[index];
            assert!(
                pixmap.texture.is_none(),
                "library texture {index} already uploaded"
            );

            let expected = pixmap.width as usize * pixmap.height as usize;
            if pixmap.data.pixel_count() != expected {
                log::error!(
                    "library texture {index}: buffer holds {} pixels, dimensions say {}; skipping",
                    pixmap.data.pixel_count(),
                    expected
                );
                continue;
            }

            let Some((texturing_mode, rgba)) = convert_pixels(pixmap) else {
                log::warn!(
                    "library texture {index}: unsupported pixel format {:?}; skipping",
                    pixmap.format
                );
                continue;
            };

            let texture = self.load_texture(
                pixmap.width,
                pixmap.height,
                TextureFormat::Rgba8,
                TextureFlags::empty(),
                &rgba,
            )?;

            library.textures[index].texture = Some(texture);
            for mesh in &mut library.meshes {
                if mesh.source_texture == Some(index) {
                    mesh.texture = Some(texture);
                    mesh.texturing_mode = texturing_mode;
                }
            }
        }
        Ok(())
    }

    /// Delete every uploaded texture of a mesh library
    pub fn dispose_library_textures(&mut self, library: &mut MeshLibrary) -> RenderResult<()> {
        for pixmap in &mut library.textures {
            if let Some(texture) = pixmap.texture.take() {
                self.device.delete_texture(texture)?;
                self.state.invalidate_texture(texture);
            }
        }
        for mesh in &mut library.meshes {
            mesh.texture = None;
        }
        Ok(())
    }
}

/// Unpack one ARGB pixel into RGBA byte order
pub(crate) const fn argb_to_rgba(pixel: u32) -> [u8; 4] {
    [
        (pixel >> 16) as u8,
        (pixel >> 8) as u8,
        pixel as u8,
        (pixel >> 24) as u8,
    ]
}

/// Widen a 5-bit channel to 8 bits
const fn expand5(channel: u16) -> u8 {
    ((channel << 3) | (channel >> 2)) as u8
}

/// Convert a pixmap to RGBA bytes and pick the texturing mode its format
/// implies
///
/// Returns `None` when the format is unsupported or the storage width does
/// not match the declared format.
fn convert_pixels(pixmap: &Pixmap) -> Option<(TexturingMode, Vec<u8>)> {
    match (pixmap.format, &pixmap.data) {
        (PixelFormat::Argb8888, PixmapData::Packed32(pixels)) => {
            let mut rgba = Vec::with_capacity(pixels.len() * 4);
            for &pixel in pixels {
                rgba.extend_from_slice(&argb_to_rgba(pixel));
            }
            Some((TexturingMode::AlphaBlend, rgba))
        }
        (PixelFormat::Rgb555, PixmapData::Packed16(pixels)) => {
            let mut rgba = Vec::with_capacity(pixels.len() * 4);
            for &pixel in pixels {
                rgba.extend_from_slice(&[
                    expand5((pixel >> 10) & 0x1f),
                    expand5((pixel >> 5) & 0x1f),
                    expand5(pixel & 0x1f),
                    0xff,
                ]);
            }
            Some((TexturingMode::Opaque, rgba))
        }
        (PixelFormat::Argb1555, PixmapData::Packed16(pixels)) => {
            let mut rgba = Vec::with_capacity(pixels.len() * 4);
            for &pixel in pixels {
                let alpha = if pixel & 0x8000 != 0 { 0xff } else { 0x00 };
                rgba.extend_from_slice(&[
                    expand5((pixel >> 10) & 0x1f),
                    expand5((pixel >> 5) & 0x1f),
                    expand5(pixel & 0x1f),
                    alpha,
                ]);
            }
            Some((TexturingMode::AlphaTest, rgba))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::render::api::{DeviceCall, TraceDevice};
    use crate::render::primitives::TriMesh;

    fn renderer() -> Renderer {
        Renderer::new(Box::new(TraceDevice::new()), RendererConfig::default()).unwrap()
    }

    fn trace(renderer: &Renderer) -> &TraceDevice {
        renderer.device().as_any().downcast_ref().unwrap()
    }

    fn triangle() -> TriMesh {
        TriMesh::new(
            vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0.0, 0.0, 1.0]; 3],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_expand5_covers_full_range() {
        assert_eq!(expand5(0), 0);
        assert_eq!(expand5(0x1f), 0xff);
    }

    #[test]
    fn test_argb_byte_order() {
        assert_eq!(argb_to_rgba(0x80ff_4020), [0xff, 0x40, 0x20, 0x80]);
    }

    #[test]
    fn test_library_upload_stamps_meshes() {
        let mut renderer = renderer();
        let mut library = MeshLibrary {
            textures: vec![Pixmap::new(
                1,
                1,
                PixelFormat::Rgb555,
                PixmapData::Packed16(vec![0x7fff]),
            )],
            meshes: vec![triangle().with_source_texture(0), triangle()],
        };

        renderer.upload_library_textures(&mut library).unwrap();

        let handle = library.textures[0].texture.unwrap();
        assert_eq!(library.meshes[0].texture, Some(handle));
        assert_eq!(library.meshes[0].texturing_mode, TexturingMode::Opaque);
        // The second mesh references no texture and is untouched
        assert_eq!(library.meshes[1].texture, None);
        assert_eq!(library.meshes[1].texturing_mode, TexturingMode::Off);
    }

    #[test]
    fn test_unsupported_format_is_skipped_not_fatal() {
        let mut renderer = renderer();
        let mut library = MeshLibrary {
            textures: vec![
                Pixmap::new(1, 1, PixelFormat::Indexed8, PixmapData::Packed8(vec![3])),
                Pixmap::new(
                    1,
                    1,
                    PixelFormat::Argb1555,
                    PixmapData::Packed16(vec![0x8000]),
                ),
            ],
            meshes: vec![
                triangle().with_source_texture(0),
                triangle().with_source_texture(1),
            ],
        };

        renderer.upload_library_textures(&mut library).unwrap();

        // The indexed image was skipped, the second image still uploaded
        assert_eq!(library.textures[0].texture, None);
        assert_eq!(library.meshes[0].texture, None);
        assert!(library.textures[1].texture.is_some());
        assert_eq!(library.meshes[1].texturing_mode, TexturingMode::AlphaTest);
    }

    #[test]
    fn test_size_mismatch_is_skipped() {
        let mut renderer = renderer();
        let mut library = MeshLibrary {
            textures: vec![Pixmap::new(
                4,
                4,
                PixelFormat::Rgb555,
                PixmapData::Packed16(vec![0; 3]),
            )],
            meshes: vec![],
        };

        renderer.upload_library_textures(&mut library).unwrap();
        assert_eq!(library.textures[0].texture, None);
    }

    #[test]
    fn test_dispose_releases_every_texture() {
        let mut renderer = renderer();
        let mut library = MeshLibrary {
            textures: vec![Pixmap::new(
                1,
                1,
                PixelFormat::Argb8888,
                PixmapData::Packed32(vec![0xffff_ffff]),
            )],
            meshes: vec![triangle().with_source_texture(0)],
        };

        renderer.upload_library_textures(&mut library).unwrap();
        renderer.dispose_library_textures(&mut library).unwrap();

        assert_eq!(trace(&renderer).live_texture_count(), 0);
        assert_eq!(library.meshes[0].texture, None);
    }

    #[test]
    fn test_load_image_texture_uploads_raw_rgba() {
        let mut renderer = renderer();
        let decoded = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));

        let texture = renderer
            .load_image_texture(&decoded, TextureFlags::empty())
            .unwrap();

        assert_eq!(renderer.state().bound_texture(), texture);
        let created = trace(&renderer).count_calls(|c| {
            matches!(
                c,
                DeviceCall::CreateTexture {
                    width: 2,
                    height: 2,
                    ..
                }
            )
        });
        assert_eq!(created, 1);
    }

    #[test]
    fn test_load_texture_binds_new_texture() {
        let mut renderer = renderer();
        let texture = renderer
            .load_texture(
                1,
                1,
                TextureFormat::Rgba8,
                TextureFlags::CLAMP_BOTH,
                &[0, 0, 0, 0],
            )
            .unwrap();

        assert_eq!(renderer.state().bound_texture(), texture);
        let binds = trace(&renderer)
            .count_calls(|c| matches!(c, DeviceCall::BindTexture(t) if *t == texture));
        assert_eq!(binds, 1);
    }
}
