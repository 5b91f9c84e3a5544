//! 2D overlay subsystem
//!
//! Orthographic screen-space drawing layered over (or instead of) the 3D
//! scene: a full-screen cover image with aspect-ratio fitting and partial
//! re-upload of dirty pixels, a flat fade overlay driven by the window
//! gamma setting, and a blocking freeze-frame fade-out that captures the
//! framebuffer and dims it to black.
//!
//! Entering 2D mode snapshots the cached 3D state and disables the toggles
//! that would interfere with screen-space quads; exiting replays the
//! snapshot through the state cache so only real deltas cost device calls.

use std::thread;
use std::time::Duration;

use crate::foundation::time::Stopwatch;
use crate::render::api::{
    BlendMode, Capability, ClearMask, ClientArray, GraphicsDevice, TextureFlags, TextureFormat,
    TextureHandle, TriangleDraw,
};
use crate::render::texture::argb_to_rgba;
use crate::render::{RenderResult, Renderer};

//		2----3
//		| \  |
//		|  \ |
//		0----1
const FULLSCREEN_QUAD_POSITIONS: [[f32; 3]; 4] = [
    [-1.0, -1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
];

const FULLSCREEN_QUAD_INDICES: [u16; 6] = [0, 1, 2, 1, 3, 2];

const FULLSCREEN_QUAD_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]];

const FULLSCREEN_QUAD_UVS_FLIPPED: [[f32; 2]; 4] =
    [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

/// Aspect ratios closer than this are drawn unfitted
const ASPECT_FIT_TOLERANCE: f32 = 0.1;

/// Pause between animated fade steps
const FADE_STEP: Duration = Duration::from_millis(15);

/// How the cover image is fitted to the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverFit {
    /// Fill the window, ignoring the source aspect ratio
    Stretch,
    /// Bar the top and bottom when the source is wider than the window
    Letterbox,
    /// Bar the left and right when the source is narrower than the window
    Pillarbox,
    /// Letterbox or pillarbox, whichever the aspect ratios call for
    Both,
}

impl CoverFit {
    const fn allows_letterbox(self) -> bool {
        matches!(self, Self::Letterbox | Self::Both)
    }

    const fn allows_pillarbox(self) -> bool {
        matches!(self, Self::Pillarbox | Self::Both)
    }
}

/// A pixel-space rectangle with exclusive right/bottom edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge, inclusive
    pub left: u32,
    /// Top edge, inclusive
    pub top: u32,
    /// Right edge, exclusive
    pub right: u32,
    /// Bottom edge, exclusive
    pub bottom: u32,
}

impl PixelRect {
    /// Create a rectangle from its edges
    #[must_use]
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle width
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    /// Rectangle height
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Smallest rectangle covering both inputs
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Pane insets subtracted from the window edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaneInsets {
    /// Pixels clipped from the left edge
    pub left: i32,
    /// Pixels clipped from the top edge
    pub top: i32,
    /// Pixels clipped from the right edge
    pub right: i32,
    /// Pixels clipped from the bottom edge
    pub bottom: i32,
}

/// A viewport rectangle in window pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRect {
    /// Left edge
    pub left: f32,
    /// Top edge
    pub top: f32,
    /// Right edge
    pub right: f32,
    /// Bottom edge
    pub bottom: f32,
}

/// A rectangle in normalized device coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NdcRect {
    pub(crate) left: f32,
    pub(crate) right: f32,
    pub(crate) top: f32,
    pub(crate) bottom: f32,
}

/// The full-screen cover image and its CPU-side pixel buffer
#[derive(Debug)]
pub(crate) struct CoverOverlay {
    pub(crate) texture: TextureHandle,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) pixels: Vec<u32>,
    pub(crate) damage: Option<PixelRect>,
}

impl Renderer {
    /// Enter orthographic 2D drawing mode
    ///
    /// Snapshots the cached 3D state, disables lighting, fog, depth test,
    /// alpha test, and the color/normal arrays, and installs a
    /// screen-space projection.
    ///
    /// # Panics
    /// Panics if 2D mode is already active; the mode is not reentrant.
    pub fn enter_2d(&mut self) -> RenderResult<()> {
        assert!(
            self.snapshot_2d.is_none(),
            "2D overlay mode is not reentrant"
        );
        let snapshot = self.state.snapshot();

        for capability in [
            Capability::Lighting,
            Capability::Fog,
            Capability::DepthTest,
            Capability::AlphaTest,
        ] {
            self.state
                .set_capability(self.device.as_mut(), &mut self.stats, capability, false)?;
        }
        for array in [ClientArray::Color, ClientArray::Normal] {
            self.state
                .set_client_array(self.device.as_mut(), &mut self.stats, array, false)?;
        }
        self.device.push_ortho_2d()?;

        self.snapshot_2d = Some(snapshot);
        Ok(())
    }

    /// Leave 2D drawing mode, restoring the saved 3D state
    ///
    /// The snapshot is replayed through the state cache, so only toggles
    /// that actually changed while in 2D mode cost a device call.
    ///
    /// # Panics
    /// Panics if 2D mode is not active.
    pub fn exit_2d(&mut self) -> RenderResult<()> {
        let snapshot = self
            .snapshot_2d
            .take()
            .expect("exit_2d without a matching enter_2d");
        self.device.pop_ortho_2d()?;
        self.state
            .restore(self.device.as_mut(), &mut self.stats, &snapshot)?;
        Ok(())
    }

    /// Set the viewport, optionally scissoring to the same rectangle
    ///
    /// With scissoring the rectangle is also cleared, so stale pixels
    /// outside a shrunken pane never show.
    pub fn set_viewport(
        &mut self,
        scissor: bool,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        if scissor {
            self.state.set_capability(
                self.device.as_mut(),
                &mut self.stats,
                Capability::ScissorTest,
                true,
            )?;
            self.device.set_scissor(x, y, width, height)?;
            self.device.set_viewport(x, y, width, height)?;
            self.device.clear(ClearMask::COLOR)?;
        } else {
            self.device.set_viewport(x, y, width, height)?;
        }
        Ok(())
    }

    /// Aspect ratio of the window after subtracting pane insets
    #[must_use]
    pub fn viewport_aspect_ratio(&self, pane: PaneInsets) -> f32 {
        let width = self.window_size.0 as i32 - pane.left - pane.right;
        let height = self.window_size.1 as i32 - pane.top - pane.bottom;
        if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        }
    }

    /// Scale a logical-resolution pane clip to window pixels
    ///
    /// Mins are floored and maxes are ceiled so a dirty scale ratio never
    /// opens a seam at the pane edges.
    #[must_use]
    pub fn adjusted_viewport_rect(
        &self,
        pane: PaneInsets,
        logical_width: u32,
        logical_height: u32,
    ) -> ViewportRect {
        let scale_x = self.window_size.0 as f32 / logical_width as f32;
        let scale_y = self.window_size.1 as f32 / logical_height as f32;

        ViewportRect {
            left: (scale_x * pane.left as f32).floor(),
            top: (scale_y * pane.top as f32).floor(),
            right: (scale_x * (logical_width as i32 - pane.right) as f32).ceil(),
            bottom: (scale_y * (logical_height as i32 - pane.bottom) as f32).ceil(),
        }
    }

    /// Allocate the cover overlay at the given pixel size, cleared to black
    ///
    /// # Panics
    /// Panics if a cover is already allocated.
    pub fn alloc_cover(&mut self, width: u32, height: u32) -> RenderResult<()> {
        assert!(self.cover.is_none(), "cover overlay already allocated");

        let pixels = vec![0u32; width as usize * height as usize];
        let rgba: Vec<u8> = pixels.iter().flat_map(|&p| argb_to_rgba(p)).collect();
        let texture = self.load_texture(
            width,
            height,
            TextureFormat::Rgba8,
            TextureFlags::CLAMP_BOTH,
            &rgba,
        )?;

        self.cover = Some(CoverOverlay {
            texture,
            width,
            height,
            pixels,
            damage: None,
        });
        Ok(())
    }

    /// Release the cover overlay, if allocated
    pub fn dispose_cover(&mut self) -> RenderResult<()> {
        if let Some(cover) = self.cover.take() {
            self.device.delete_texture(cover.texture)?;
            self.state.invalidate_texture(cover.texture);
        }
        Ok(())
    }

    /// Fill the cover with one packed ARGB color and damage the whole
    /// surface
    pub fn clear_cover(&mut self, argb: u32) {
        if let Some(cover) = self.cover.as_mut() {
            cover.pixels.fill(argb);
            cover.damage = Some(PixelRect::new(0, 0, cover.width, cover.height));
        }
    }

    /// Mutable access to the cover's packed ARGB pixels
    ///
    /// Writers must report what they touched through
    /// [`Renderer::mark_cover_damage`] or the edit will not reach the
    /// device texture.
    pub fn cover_pixels_mut(&mut self) -> Option<&mut [u32]> {
        self.cover.as_mut().map(|c| c.pixels.as_mut_slice())
    }

    /// Extend the cover's dirty region by a rectangle
    pub fn mark_cover_damage(&mut self, rect: PixelRect) {
        if let Some(cover) = self.cover.as_mut() {
            let clamped = PixelRect {
                left: rect.left.min(cover.width),
                top: rect.top.min(cover.height),
                right: rect.right.min(cover.width),
                bottom: rect.bottom.min(cover.height),
            };
            cover.damage = Some(match cover.damage {
                Some(damage) => damage.union(&clamped),
                None => clamped,
            });
        }
    }

    /// Draw the cover image over the whole window
    ///
    /// Re-uploads the damaged sub-region first, if any. Does nothing when
    /// no cover is allocated.
    pub fn draw_cover(&mut self, fit: CoverFit) -> RenderResult<()> {
        let Some(cover) = self.cover.as_mut() else {
            return Ok(());
        };

        let texture = cover.texture;
        let source_size = (cover.width, cover.height);

        // Push dirty pixels to the device texture before sampling it
        if let Some(damage) = cover.damage.take() {
            if damage.width() > 0 && damage.height() > 0 {
                let sub = subregion_rgba(&cover.pixels, cover.width, &damage);
                self.device.update_texture(
                    texture,
                    damage.left,
                    damage.top,
                    damage.width(),
                    damage.height(),
                    &sub,
                )?;
            }
        }

        let window_size = self.window_size;
        self.device
            .set_viewport(0, 0, window_size.0, window_size.1)?;
        self.enter_2d()?;

        let (rect, need_clear) = fitted_ndc_rect(window_size, source_size, fit);
        if need_clear {
            // Bars outside the fitted image must not show stale pixels
            self.device.clear(ClearMask::COLOR)?;
        }

        self.device.set_draw_color([1.0, 1.0, 1.0, 1.0])?;
        self.state.set_capability(
            self.device.as_mut(),
            &mut self.stats,
            Capability::Texture2d,
            true,
        )?;
        self.state.set_client_array(
            self.device.as_mut(),
            &mut self.stats,
            ClientArray::TexCoord,
            true,
        )?;
        self.state
            .bind_texture(self.device.as_mut(), &mut self.stats, texture)?;

        let positions = [
            [rect.left, rect.bottom, 0.0],
            [rect.right, rect.bottom, 0.0],
            [rect.left, rect.top, 0.0],
            [rect.right, rect.top, 0.0],
        ];
        draw_quad(self.device.as_mut(), &positions, Some(&FULLSCREEN_QUAD_UVS))?;

        self.exit_2d()
    }

    /// Map a window gamma percentage to the fade overlay opacity
    ///
    /// 100 percent is fully bright (no overlay); 0 percent is black.
    pub fn set_window_gamma(&mut self, percent: f32) {
        self.fade_opacity = (100.0 - percent) / 100.0;
    }

    /// Current fade overlay opacity
    #[must_use]
    pub fn fade_opacity(&self) -> f32 {
        self.fade_opacity
    }

    /// Draw the flat fade overlay at the given opacity
    pub(crate) fn draw_fade_overlay(&mut self, opacity: f32) -> RenderResult<()> {
        let (width, height) = self.window_size;
        self.device.set_viewport(0, 0, width, height)?;
        self.enter_2d()?;

        self.state.set_capability(
            self.device.as_mut(),
            &mut self.stats,
            Capability::Blend,
            true,
        )?;
        self.state
            .set_blend_mode(self.device.as_mut(), &mut self.stats, BlendMode::Alpha)?;
        self.state.set_capability(
            self.device.as_mut(),
            &mut self.stats,
            Capability::Texture2d,
            false,
        )?;
        self.state.set_client_array(
            self.device.as_mut(),
            &mut self.stats,
            ClientArray::TexCoord,
            false,
        )?;

        self.device.set_draw_color([0.0, 0.0, 0.0, opacity])?;
        draw_quad(self.device.as_mut(), &FULLSCREEN_QUAD_POSITIONS, None)?;

        self.exit_2d()
    }

    /// Capture the framebuffer and animate a blocking fade to black
    ///
    /// Reads the current frame into a texture, redraws it at decreasing
    /// brightness over the configured duration (presenting each step),
    /// holds full blackness briefly, then leaves the fade overlay opacity
    /// saturated so subsequent frames stay dark until the gamma is raised.
    pub fn freeze_frame_fade_out(&mut self) -> RenderResult<()> {
        let (window_width, window_height) = self.window_size;

        // Pad the capture width up to a multiple of four pixels so row
        // alignment never splits a pixel
        let remainder = window_width % 4;
        let capture_width = if remainder == 0 {
            window_width
        } else {
            window_width - remainder + 4
        };

        let captured = self
            .device
            .read_framebuffer_rgb(capture_width, window_height)?;
        let texture = self.load_texture(
            capture_width,
            window_height,
            TextureFormat::Rgb8,
            TextureFlags::CLAMP_BOTH,
            &captured,
        )?;

        self.device
            .set_viewport(0, 0, window_width, window_height)?;
        self.enter_2d()?;
        self.state.set_capability(
            self.device.as_mut(),
            &mut self.stats,
            Capability::Blend,
            false,
        )?;
        self.state.set_capability(
            self.device.as_mut(),
            &mut self.stats,
            Capability::Texture2d,
            true,
        )?;
        self.state.set_client_array(
            self.device.as_mut(),
            &mut self.stats,
            ClientArray::TexCoord,
            true,
        )?;
        self.state
            .bind_texture(self.device.as_mut(), &mut self.stats, texture)?;

        // Dim the captured frame multiplicatively down to black
        let duration = self.config.freeze_fade_duration.max(0.0);
        let watch = Stopwatch::start_new();
        loop {
            let elapsed = watch.elapsed_secs();
            let brightness = if duration <= f32::EPSILON {
                0.0
            } else {
                (1.0 - elapsed / duration).max(0.0)
            };

            self.device
                .set_draw_color([brightness, brightness, brightness, 1.0])?;
            draw_quad(
                self.device.as_mut(),
                &FULLSCREEN_QUAD_POSITIONS,
                Some(&FULLSCREEN_QUAD_UVS_FLIPPED),
            )?;
            self.device.present()?;

            if elapsed >= duration {
                break;
            }
            thread::sleep(FADE_STEP);
        }

        // Hold full blackness for a little bit
        self.device.set_clear_color([0.0, 0.0, 0.0, 1.0])?;
        let hold = self.config.freeze_fade_hold.max(0.0);
        let watch = Stopwatch::start_new();
        loop {
            self.device.clear(ClearMask::COLOR)?;
            self.device.present()?;
            if watch.elapsed_secs() >= hold {
                break;
            }
            thread::sleep(FADE_STEP);
        }
        self.device.set_clear_color(self.config.clear_color)?;

        self.exit_2d()?;
        self.unload_texture(texture)?;

        self.fade_opacity = 1.0;
        Ok(())
    }
}

/// Issue one screen-space quad draw
fn draw_quad(
    device: &mut dyn GraphicsDevice,
    positions: &[[f32; 3]],
    uvs: Option<&[[f32; 2]]>,
) -> RenderResult<()> {
    device.draw_triangles(&TriangleDraw {
        positions,
        normals: None,
        colors: None,
        uvs,
        indices: &FULLSCREEN_QUAD_INDICES,
    })?;
    Ok(())
}

/// Extract a damaged sub-region of the cover as tightly packed RGBA rows
fn subregion_rgba(pixels: &[u32], stride: u32, rect: &PixelRect) -> Vec<u8> {
    let mut out = Vec::with_capacity(rect.width() as usize * rect.height() as usize * 4);
    for row in rect.top..rect.bottom {
        for col in rect.left..rect.right {
            let pixel = pixels[(row * stride + col) as usize];
            out.extend_from_slice(&argb_to_rgba(pixel));
        }
    }
    out
}

/// Compute the NDC rectangle a cover image occupies under a fit mode
///
/// Returns the rectangle plus whether the window needs a clear because the
/// image no longer fills it (letterbox/pillarbox bars).
pub(crate) fn fitted_ndc_rect(
    window: (u32, u32),
    source: (u32, u32),
    fit: CoverFit,
) -> (NdcRect, bool) {
    let window_width = window.0 as f32;
    let window_height = window.1 as f32;

    let mut screen_left = 0.0f32;
    let mut screen_right = window_width;
    let mut screen_top = 0.0f32;
    let mut screen_bottom = window_height;
    let mut need_clear = false;

    if fit.allows_letterbox() || fit.allows_pillarbox() {
        let target_aspect = window_width / window_height;
        let source_aspect = source.0 as f32 / source.1 as f32;

        if (source_aspect - target_aspect).abs() < ASPECT_FIT_TOLERANCE {
            // Close enough; draw unfitted
        } else if fit.allows_letterbox() && source_aspect > target_aspect {
            // Source is wider than the window
            need_clear = true;
            let letterboxed_height = window_width / source_aspect;
            screen_top = (window_height - letterboxed_height) / 2.0;
            screen_bottom = screen_top + letterboxed_height;
        } else if fit.allows_pillarbox() && source_aspect < target_aspect {
            // Source is narrower than the window
            need_clear = true;
            let pillarboxed_width = source_aspect * window_width / target_aspect;
            screen_left = window_width / 2.0 - pillarboxed_width / 2.0;
            screen_right = screen_left + pillarboxed_width;
        }
    }

    let rect = NdcRect {
        left: 2.0 * screen_left / window_width - 1.0,
        right: 2.0 * screen_right / window_width - 1.0,
        top: 1.0 - 2.0 * screen_top / window_height,
        bottom: 1.0 - 2.0 * screen_bottom / window_height,
    };
    (rect, need_clear)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::render::api::{DeviceCall, TraceDevice};
    use approx::assert_relative_eq;

    fn renderer() -> Renderer {
        let mut renderer =
            Renderer::new(Box::new(TraceDevice::new()), RendererConfig::default()).unwrap();
        renderer.set_window_size(640, 480);
        renderer
    }

    fn renderer_with(config: RendererConfig) -> Renderer {
        let mut renderer = Renderer::new(Box::new(TraceDevice::new()), config).unwrap();
        renderer.set_window_size(640, 480);
        renderer
    }

    fn trace(renderer: &Renderer) -> &TraceDevice {
        renderer.device().as_any().downcast_ref().unwrap()
    }

    #[test]
    fn test_enter_exit_2d_round_trip_restores_state() {
        let mut renderer = renderer();

        let before: Vec<bool> = Capability::ALL
            .iter()
            .map(|&c| renderer.state().is_enabled(c))
            .collect();
        let arrays_before: Vec<bool> = ClientArray::ALL
            .iter()
            .map(|&a| renderer.state().client_array_enabled(a))
            .collect();

        renderer.enter_2d().unwrap();
        renderer.exit_2d().unwrap();

        let after: Vec<bool> = Capability::ALL
            .iter()
            .map(|&c| renderer.state().is_enabled(c))
            .collect();
        let arrays_after: Vec<bool> = ClientArray::ALL
            .iter()
            .map(|&a| renderer.state().client_array_enabled(a))
            .collect();

        assert_eq!(before, after);
        assert_eq!(arrays_before, arrays_after);
    }

    #[test]
    #[should_panic(expected = "not reentrant")]
    fn test_enter_2d_twice_is_fatal() {
        let mut renderer = renderer();
        renderer.enter_2d().unwrap();
        let _ = renderer.enter_2d();
    }

    #[test]
    fn test_stretch_fills_the_window() {
        let (rect, need_clear) = fitted_ndc_rect((640, 480), (64, 64), CoverFit::Stretch);
        assert_relative_eq!(rect.left, -1.0);
        assert_relative_eq!(rect.right, 1.0);
        assert_relative_eq!(rect.top, 1.0);
        assert_relative_eq!(rect.bottom, -1.0);
        assert!(!need_clear);
    }

    #[test]
    fn test_pillarbox_centers_a_narrow_source() {
        // Window aspect 2.0, source aspect 1.0: image occupies the middle
        // half of the width
        let (rect, need_clear) = fitted_ndc_rect((400, 200), (100, 100), CoverFit::Both);
        assert!(need_clear);
        assert_relative_eq!(rect.left, -0.5, epsilon = 1e-6);
        assert_relative_eq!(rect.right, 0.5, epsilon = 1e-6);
        assert_relative_eq!(rect.top, 1.0, epsilon = 1e-6);
        assert_relative_eq!(rect.bottom, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_letterbox_centers_a_wide_source() {
        // Window aspect 0.5, source aspect 1.0: image occupies the middle
        // half of the height
        let (rect, need_clear) = fitted_ndc_rect((200, 400), (100, 100), CoverFit::Both);
        assert!(need_clear);
        assert_relative_eq!(rect.top, 0.5, epsilon = 1e-6);
        assert_relative_eq!(rect.bottom, -0.5, epsilon = 1e-6);
        assert_relative_eq!(rect.left, -1.0, epsilon = 1e-6);
        assert_relative_eq!(rect.right, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_near_equal_aspect_is_left_unfitted() {
        let (rect, need_clear) = fitted_ndc_rect((640, 480), (641, 480), CoverFit::Both);
        assert!(!need_clear);
        assert_relative_eq!(rect.left, -1.0);
        assert_relative_eq!(rect.right, 1.0);
    }

    #[test]
    fn test_fit_mode_gates_each_bar_direction() {
        // A narrow source with letterbox-only fitting stays unfitted
        let (_, need_clear) = fitted_ndc_rect((400, 200), (100, 100), CoverFit::Letterbox);
        assert!(!need_clear);
    }

    #[test]
    fn test_damage_union_uploads_one_rect() {
        let mut renderer = renderer();
        renderer.alloc_cover(64, 64).unwrap();

        renderer.mark_cover_damage(PixelRect::new(2, 2, 4, 4));
        renderer.mark_cover_damage(PixelRect::new(10, 8, 20, 12));
        renderer.draw_cover(CoverFit::Stretch).unwrap();

        let updates: Vec<_> = trace(&renderer)
            .calls()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::UpdateTexture {
                    x, y, width, height, ..
                } => Some((*x, *y, *width, *height)),
                _ => None,
            })
            .collect();
        assert_eq!(updates, vec![(2, 2, 18, 10)]);

        // A second draw with no new damage uploads nothing
        renderer.draw_cover(CoverFit::Stretch).unwrap();
        let updates = trace(&renderer)
            .count_calls(|c| matches!(c, DeviceCall::UpdateTexture { .. }));
        assert_eq!(updates, 1);
    }

    #[test]
    fn test_clear_cover_damages_everything() {
        let mut renderer = renderer();
        renderer.alloc_cover(8, 4).unwrap();
        renderer.clear_cover(0xff20_4060);

        assert!(renderer.cover_pixels_mut().unwrap().iter().all(|&p| p == 0xff20_4060));

        renderer.draw_cover(CoverFit::Stretch).unwrap();
        let full_upload = trace(&renderer).count_calls(|c| {
            matches!(
                c,
                DeviceCall::UpdateTexture {
                    x: 0,
                    y: 0,
                    width: 8,
                    height: 4,
                    ..
                }
            )
        });
        assert_eq!(full_upload, 1);
    }

    #[test]
    fn test_draw_cover_without_alloc_is_a_no_op() {
        let mut renderer = renderer();
        let calls_before = trace(&renderer).calls().len();
        renderer.draw_cover(CoverFit::Both).unwrap();
        assert_eq!(trace(&renderer).calls().len(), calls_before);
    }

    #[test]
    fn test_viewport_aspect_ratio_with_insets() {
        let renderer = renderer();
        let full = renderer.viewport_aspect_ratio(PaneInsets::default());
        assert_relative_eq!(full, 640.0 / 480.0);

        let clipped = renderer.viewport_aspect_ratio(PaneInsets {
            left: 20,
            right: 20,
            ..PaneInsets::default()
        });
        assert_relative_eq!(clipped, 600.0 / 480.0);
    }

    #[test]
    fn test_adjusted_viewport_rect_scales_and_rounds() {
        // 640x480 window over a 320x240 logical resolution: scale 2
        let renderer = renderer();
        let rect = renderer.adjusted_viewport_rect(
            PaneInsets {
                left: 10,
                top: 5,
                right: 10,
                bottom: 5,
            },
            320,
            240,
        );
        assert_relative_eq!(rect.left, 20.0);
        assert_relative_eq!(rect.top, 10.0);
        assert_relative_eq!(rect.right, 620.0);
        assert_relative_eq!(rect.bottom, 470.0);
    }

    #[test]
    fn test_scissored_viewport_clears_the_pane() {
        let mut renderer = renderer();
        renderer.set_viewport(true, 10, 10, 100, 80).unwrap();

        assert!(renderer.state().is_enabled(Capability::ScissorTest));
        let device = trace(&renderer);
        assert_eq!(
            device.count_calls(|c| matches!(c, DeviceCall::SetScissor(10, 10, 100, 80))),
            1
        );
        assert_eq!(
            device.count_calls(|c| matches!(c, DeviceCall::Clear(m) if *m == ClearMask::COLOR)),
            1
        );
    }

    #[test]
    fn test_window_gamma_maps_to_fade_opacity() {
        let mut renderer = renderer();
        renderer.set_window_gamma(100.0);
        assert_relative_eq!(renderer.fade_opacity(), 0.0);
        renderer.set_window_gamma(25.0);
        assert_relative_eq!(renderer.fade_opacity(), 0.75);
    }

    #[test]
    fn test_freeze_frame_fade_saturates_opacity() {
        let config = RendererConfig {
            freeze_fade_duration: 0.0,
            freeze_fade_hold: 0.0,
            ..RendererConfig::default()
        };
        let mut renderer = renderer_with(config);

        renderer.freeze_frame_fade_out().unwrap();

        assert_relative_eq!(renderer.fade_opacity(), 1.0);
        let device = trace(&renderer);
        assert!(device.count_calls(|c| matches!(c, DeviceCall::ReadFramebuffer)) == 1);
        // The capture texture is cleaned up afterwards
        assert_eq!(device.live_texture_count(), 0);
        assert!(device.count_calls(|c| matches!(c, DeviceCall::Present)) >= 2);
    }

    #[test]
    fn test_freeze_frame_capture_width_is_padded() {
        let config = RendererConfig {
            freeze_fade_duration: 0.0,
            freeze_fade_hold: 0.0,
            ..RendererConfig::default()
        };
        let mut renderer = renderer_with(config);
        renderer.set_window_size(638, 480);

        renderer.freeze_frame_fade_out().unwrap();

        let padded = trace(&renderer).count_calls(|c| {
            matches!(
                c,
                DeviceCall::CreateTexture {
                    width: 640,
                    height: 480,
                    ..
                }
            )
        });
        assert_eq!(padded, 1);
    }
}
