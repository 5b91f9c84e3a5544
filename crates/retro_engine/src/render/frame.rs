//! Frame building and the two-pass draw dispatcher
//!
//! A [`Frame`] is the open submission window between
//! [`Renderer::begin_frame`] and [`Frame::finish`]. Submissions are
//! deferred: each one computes its depth-sort key immediately and is
//! appended to the queue, and the flush sorts the whole frame globally
//! before drawing. Deferral is what lets independent callers submit in any
//! order and still get correct opaque/transparent ordering.
//!
//! ## Pass structure
//!
//! The sorted queue is walked twice: the opaque pass front-to-back (early
//! depth rejection), then the transparent pass over the same ordering in
//! reverse (back-to-front blending). A mesh is drawn in exactly one of the
//! two passes, decided by its classification.
//!
//! Because a `Frame` mutably borrows the renderer, submitting without an
//! open frame or opening two frames at once is a compile error rather than
//! a runtime assertion. Queue capacity is still checked at runtime and
//! overflowing it is fatal.

use crate::foundation::math::{Mat4, Point3};
use crate::render::api::{
    BlendMode, Capability, ClientArray, CullWinding, GraphicsDevice, TriangleDraw,
};
use crate::render::env_map::compute_env_map_uvs;
use crate::render::queue::{self, MeshRef, ModifierFlags, QueueEntry, RenderModifiers};
use crate::render::primitives::{TexturingMode, TriMesh};
use crate::render::state::StateCache;
use crate::render::stats::RenderStats;
use crate::render::{RenderResult, Renderer};

/// Alpha at or above this is treated as fully opaque
const ALPHA_OPAQUE_THRESHOLD: f32 = 0.999;

/// Fade overlay opacities at or below this are not drawn
const FADE_VISIBLE_THRESHOLD: f32 = 0.01;

/// Which of the two passes is being dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderPass {
    Opaque,
    Transparent,
}

/// An open frame accepting mesh submissions
///
/// Holds the submission queue for the frame and a mutable borrow of the
/// renderer; dropped (or consumed by [`Frame::finish`]) when the frame
/// closes.
pub struct Frame<'a> {
    renderer: &'a mut Renderer,
    entries: Vec<QueueEntry<'a>>,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(renderer: &'a mut Renderer) -> Self {
        let capacity = renderer.config.max_queue_size;
        Self {
            renderer,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Submit a single mesh for deferred drawing
    ///
    /// The depth-sort key is computed now, from the mesh's current bounds
    /// (or `center_hint` when given); mutating the mesh between submission
    /// and flush is a caller error.
    ///
    /// # Panics
    /// Panics if the queue is full.
    pub fn submit_mesh(
        &mut self,
        mesh: &'a TriMesh,
        transform: Option<&'a Mat4>,
        mods: Option<&'a RenderModifiers>,
        center_hint: Option<Point3>,
    ) {
        self.push_entry(MeshRef::Single(mesh), transform, mods, center_hint);
    }

    /// Submit an ordered group of meshes drawn under one transform
    ///
    /// The group shares a single queue entry and a single depth-sort key
    /// (averaged over the group's bounds unless `center_hint` is given).
    ///
    /// # Panics
    /// Panics if the queue is full.
    pub fn submit_mesh_list(
        &mut self,
        meshes: &'a [TriMesh],
        transform: Option<&'a Mat4>,
        mods: Option<&'a RenderModifiers>,
        center_hint: Option<Point3>,
    ) {
        if meshes.is_empty() {
            log::warn!("empty mesh list submitted; nothing will be drawn for this entry");
        }
        self.push_entry(MeshRef::List(meshes), transform, mods, center_hint);
    }

    fn push_entry(
        &mut self,
        meshes: MeshRef<'a>,
        transform: Option<&'a Mat4>,
        mods: Option<&'a RenderModifiers>,
        center_hint: Option<Point3>,
    ) {
        assert!(
            self.entries.len() < self.renderer.config.max_queue_size,
            "mesh queue overflow (capacity {})",
            self.renderer.config.max_queue_size
        );

        let depth_sort_z =
            queue::depth_sort_z(&meshes, center_hint, &self.renderer.world_to_frustum);
        self.entries.push(QueueEntry {
            meshes,
            transform,
            mods,
            depth_sort_z,
        });
    }

    /// Number of entries currently queued
    #[must_use]
    pub fn queued(&self) -> usize {
        self.entries.len()
    }

    /// Flush the queue: sort, draw both passes, clear
    ///
    /// Normally called once by [`Frame::finish`], but callable mid-frame
    /// when a caller needs everything queued so far on screen before
    /// submitting more.
    pub fn flush(&mut self) -> RenderResult<()> {
        let renderer = &mut *self.renderer;
        renderer.stats.mesh_queue_size += self.entries.len() as u32;

        if self.entries.is_empty() {
            return Ok(());
        }

        // Stable sort: entries with equal priority and depth keep their
        // submission order.
        self.entries.sort_by(QueueEntry::compare);

        // PASS 1: opaque meshes, front to back
        for entry in &self.entries {
            draw_mesh_list(
                renderer.device.as_mut(),
                &mut renderer.state,
                &mut renderer.stats,
                &mut renderer.env_map_uvs,
                renderer.viewer_position,
                renderer.config.max_env_map_vertices,
                RenderPass::Opaque,
                entry,
            )?;
        }

        // PASS 2: transparent meshes, back to front
        for entry in self.entries.iter().rev() {
            draw_mesh_list(
                renderer.device.as_mut(),
                &mut renderer.state,
                &mut renderer.stats,
                &mut renderer.env_map_uvs,
                renderer.viewer_position,
                renderer.config.max_env_map_vertices,
                RenderPass::Transparent,
                entry,
            )?;
        }

        self.entries.clear();
        Ok(())
    }

    /// Close the frame: flush the queue and draw the fade overlay if one
    /// is active
    pub fn finish(mut self) -> RenderResult<()> {
        self.flush()?;

        let renderer = self.renderer;

        // Don't leak scissoring into overlay drawing or the next frame
        if renderer.state.is_enabled(Capability::ScissorTest) {
            renderer.state.set_capability(
                renderer.device.as_mut(),
                &mut renderer.stats,
                Capability::ScissorTest,
                false,
            )?;
        }

        let opacity = renderer.fade_opacity;
        if opacity > FADE_VISIBLE_THRESHOLD {
            renderer.draw_fade_overlay(opacity)?;
        }

        Ok(())
    }
}

/// Draw one queue entry's meshes for the given pass
///
/// Identical state logic in both passes; every toggle goes through the
/// state cache, so consecutive meshes with the same requirements cost no
/// device calls.
fn draw_mesh_list(
    device: &mut dyn GraphicsDevice,
    state: &mut StateCache,
    stats: &mut RenderStats,
    env_map_uvs: &mut Vec<[f32; 2]>,
    viewer: Point3,
    max_env_map_vertices: usize,
    pass: RenderPass,
    entry: &QueueEntry<'_>,
) -> RenderResult<()> {
    let mods = entry.mods();
    let apply_env_map = mods.flags.contains(ModifierFlags::REFLECTION_MAP);
    let glow = mods.flags.contains(ModifierFlags::GLOW);
    let keep_backfaces = mods.flags.contains(ModifierFlags::KEEP_BACKFACES);

    let mut transform_pushed = false;

    for mesh in entry.meshes.iter() {
        let transparent = mesh.texturing_mode == TexturingMode::AlphaBlend
            || mesh.diffuse_color.a < ALPHA_OPAQUE_THRESHOLD
            || mods.diffuse_color.a < ALPHA_OPAQUE_THRESHOLD
            || glow;

        // Each mesh belongs to exactly one pass
        let wanted = match pass {
            RenderPass::Opaque => !transparent,
            RenderPass::Transparent => transparent,
        };
        if !wanted {
            continue;
        }

        state.set_capability(device, stats, Capability::Blend, transparent)?;
        if transparent {
            let mode = if glow {
                BlendMode::Additive
            } else {
                BlendMode::Alpha
            };
            state.set_blend_mode(device, stats, mode)?;
        }

        // Alpha testing only applies to opaque meshes whose texture asks
        // for it
        state.set_capability(
            device,
            stats,
            Capability::AlphaTest,
            !transparent && mesh.texturing_mode == TexturingMode::AlphaTest,
        )?;

        let textured = mesh.texturing_mode != TexturingMode::Off;
        let env_mapped = apply_env_map && textured;
        if env_mapped {
            let identity = Mat4::identity();
            let transform = entry.transform.unwrap_or(&identity);
            compute_env_map_uvs(mesh, transform, viewer, max_env_map_vertices, env_map_uvs);
        }

        if keep_backfaces {
            if transparent {
                // Keep culling enabled and draw the backfaces first; the
                // second draw below renders the frontfaces. Avoids sorting
                // individual faces for small convex transparent shells.
                state.set_capability(device, stats, Capability::CullFace, true)?;
                device.set_cull_winding(CullWinding::Front)?;
            } else {
                state.set_capability(device, stats, Capability::CullFace, false)?;
            }
        } else {
            state.set_capability(device, stats, Capability::CullFace, true)?;
        }

        state.set_capability(
            device,
            stats,
            Capability::Lighting,
            !mods.flags.contains(ModifierFlags::NULL_SHADER),
        )?;

        // Transparent geometry must not occlude what's drawn behind it
        state.set_depth_write(
            device,
            stats,
            !(transparent || mods.flags.contains(ModifierFlags::NO_Z_WRITE)),
        )?;

        if textured {
            state.set_capability(device, stats, Capability::Texture2d, true)?;
            state.set_client_array(device, stats, ClientArray::TexCoord, true)?;
            let texture = mesh
                .texture
                .expect("textured mesh submitted without an uploaded texture");
            state.bind_texture(device, stats, texture)?;
        } else {
            state.set_capability(device, stats, Capability::Texture2d, false)?;
            state.set_client_array(device, stats, ClientArray::TexCoord, false)?;
        }

        state.set_client_array(
            device,
            stats,
            ClientArray::Color,
            mesh.vertex_colors.is_some(),
        )?;

        device.set_draw_color(mesh.diffuse_color.modulate(&mods.diffuse_color).to_array())?;

        // The transform applies to the whole entry; push it once
        if !transform_pushed {
            if let Some(transform) = entry.transform {
                device.push_model_transform(transform)?;
                transform_pushed = true;
            }
        }

        let uvs = if env_mapped {
            Some(env_map_uvs.as_slice())
        } else {
            mesh.uvs.as_deref()
        };

        let draw = TriangleDraw {
            positions: &mesh.positions,
            normals: Some(&mesh.normals),
            colors: mesh.vertex_colors.as_deref(),
            uvs,
            indices: &mesh.indices,
        };
        device.draw_triangles(&draw)?;
        stats.draw_calls += 1;

        if transparent && keep_backfaces {
            // Second draw: frontfaces, restoring the default winding for
            // every other mesh
            device.set_cull_winding(CullWinding::Back)?;
            device.draw_triangles(&draw)?;
            stats.draw_calls += 1;
        }

        stats.triangles_drawn += mesh.triangle_count();
        match pass {
            RenderPass::Opaque => stats.meshes_drawn_opaque += 1,
            RenderPass::Transparent => stats.meshes_drawn_transparent += 1,
        }
    }

    if transform_pushed {
        device.pop_model_transform()?;
    }

    Ok(())
}
