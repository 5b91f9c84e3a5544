//! Gemstone demo application
//!
//! Drives the renderer headlessly through the trace device: a spinning
//! reflective gem, a glowing halo, a transparent shield shell, and a
//! textured ground plane, submitted in deliberately scrambled order every
//! frame to show the depth sort putting them right. Frame statistics are
//! logged so the state-cache batching is visible.

use rand::prelude::*;
use retro_engine::prelude::*;
use retro_engine::render::{PixelFormat, Pixmap, PixmapData};

// Scene dimensions
const FRAME_COUNT: u32 = 60;
const ORBIT_RADIUS: f32 = 14.0;

/// Build an octahedron gem: eight faces around six vertices
fn gem_mesh() -> TriMesh {
    let positions: Vec<[f32; 3]> = vec![
        [0.0, 1.5, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0],
        [-1.0, 0.0, 0.0],
        [0.0, 0.0, -1.0],
        [0.0, -1.5, 0.0],
    ];
    // Point normals outward from the centroid; good enough for a demo gem
    let normals: Vec<[f32; 3]> = positions
        .iter()
        .map(|p| {
            let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            [p[0] / len, p[1] / len, p[2] / len]
        })
        .collect();
    let indices = vec![
        0, 2, 1, 0, 3, 2, 0, 4, 3, 0, 1, 4, // upper pyramid
        5, 1, 2, 5, 2, 3, 5, 3, 4, 5, 4, 1, // lower pyramid
    ];
    TriMesh::new(positions, normals, indices)
        .with_uvs(vec![[0.0, 0.0]; 6])
        .with_diffuse_color(ColorRgba::new(0.6, 0.9, 1.0, 1.0))
}

/// A flat ground quad textured by the library checkerboard
fn ground_mesh() -> TriMesh {
    TriMesh::new(
        vec![
            [-20.0, -2.0, -20.0],
            [20.0, -2.0, -20.0],
            [-20.0, -2.0, 20.0],
            [20.0, -2.0, 20.0],
        ],
        vec![[0.0, 1.0, 0.0]; 4],
        vec![0, 1, 2, 1, 3, 2],
    )
    .with_uvs(vec![[0.0, 0.0], [8.0, 0.0], [0.0, 8.0], [8.0, 8.0]])
    .with_source_texture(0)
}

/// A slightly inflated copy of the gem acting as its shield shell
fn shell_mesh() -> TriMesh {
    let mut mesh = gem_mesh();
    for p in &mut mesh.positions {
        p[0] *= 1.4;
        p[1] *= 1.4;
        p[2] *= 1.4;
    }
    mesh.bounds = retro_engine::render::BoundingBox::from_points(&mesh.positions);
    mesh.uvs = None;
    mesh.diffuse_color = ColorRgba::new(0.4, 0.6, 1.0, 0.35);
    mesh
}

/// 16x16 checkerboard in the retro 5-bit RGB layout
fn checkerboard_pixmap() -> Pixmap {
    let mut pixels = Vec::with_capacity(16 * 16);
    for y in 0..16u16 {
        for x in 0..16u16 {
            let light = (x / 4 + y / 4) % 2 == 0;
            pixels.push(if light { 0x7fff } else { 0x318c });
        }
    }
    Pixmap::new(16, 16, PixelFormat::Rgb555, PixmapData::Packed16(pixels))
}

/// Orbiting look-at view; the demo needs a plausible depth ordering, not a
/// real projection
fn orbit_view(angle: f32) -> Mat4 {
    let eye = Vec3::new(angle.cos() * ORBIT_RADIUS, 6.0, angle.sin() * ORBIT_RADIUS);
    Mat4::look_at_rh(&Point3::new(eye.x, eye.y, eye.z), &Point3::origin(), &Vec3::y())
}

fn main() -> Result<(), RenderError> {
    logging::try_init();

    let mut renderer = Renderer::new(Box::new(TraceDevice::new()), RendererConfig::default())?;
    renderer.set_window_size(800, 600);

    // Upload the ground texture through the library path
    let mut library = MeshLibrary {
        textures: vec![checkerboard_pixmap()],
        meshes: vec![ground_mesh()],
    };
    renderer.upload_library_textures(&mut library)?;

    let checkerboard = library.textures[0]
        .texture
        .expect("library upload assigns the checkerboard a handle");
    let gem = gem_mesh().with_texture(TexturingMode::Opaque, checkerboard);
    let shell = shell_mesh();
    let halo = gem_mesh().with_diffuse_color(ColorRgba::new(1.0, 0.9, 0.3, 1.0));

    let mirror = RenderModifiers {
        flags: ModifierFlags::REFLECTION_MAP,
        ..RenderModifiers::DEFAULT
    };
    let shield = RenderModifiers {
        flags: ModifierFlags::KEEP_BACKFACES,
        ..RenderModifiers::DEFAULT
    };
    let glow = RenderModifiers {
        flags: ModifierFlags::GLOW | ModifierFlags::NO_Z_WRITE,
        diffuse_color: ColorRgba::new(1.0, 1.0, 1.0, 0.6),
        ..RenderModifiers::DEFAULT
    };

    let mut rng = rand::thread_rng();

    for frame_index in 0..FRAME_COUNT {
        let angle = frame_index as f32 * 0.05;
        renderer.set_world_to_frustum(orbit_view(angle));
        renderer.set_viewer_position(Point3::new(
            angle.cos() * ORBIT_RADIUS,
            6.0,
            angle.sin() * ORBIT_RADIUS,
        ));

        let spin = Mat4::new_rotation(Vec3::new(0.0, angle * 2.0, 0.0));
        let bob = Mat4::new_translation(&Vec3::new(
            0.0,
            (angle * 3.0).sin() * 0.5 + rng.gen_range(-0.02..0.02),
            0.0,
        ));
        let halo_transform = bob * Mat4::new_scaling(1.8);

        let mut frame = renderer.begin_frame()?;

        // Scrambled submission order; the flush sorts it out
        frame.submit_mesh(&halo, Some(&halo_transform), Some(&glow), None);
        frame.submit_mesh_list(&library.meshes, None, None, None);
        frame.submit_mesh(&shell, Some(&spin), Some(&shield), None);
        frame.submit_mesh(&gem, Some(&spin), Some(&mirror), None);

        frame.finish()?;
        renderer.present()?;

        if frame_index % 20 == 0 {
            let stats = renderer.stats();
            log::info!(
                "frame {frame_index}: {} queued, {} opaque + {} transparent, {} triangles, {} batched state changes",
                stats.mesh_queue_size,
                stats.meshes_drawn_opaque,
                stats.meshes_drawn_transparent,
                stats.triangles_drawn,
                stats.batched_state_changes,
            );
        }
    }

    // Wind down the way the game would: freeze the last frame and fade out
    renderer.freeze_frame_fade_out()?;
    renderer.dispose_library_textures(&mut library)?;

    let stats = *renderer.stats();
    log::info!(
        "done: last frame drew {} triangles across {} draw calls",
        stats.triangles_drawn,
        stats.draw_calls
    );

    Ok(())
}
