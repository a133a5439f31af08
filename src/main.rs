//! Interactive demo: an orbiting camera over a small test scene.
//!
//! ```bash
//! cargo run --release
//! ```
//!
//! Drag nothing, press nothing: the camera orbits by itself. Hovering the
//! pointer over the cube prints picked faces on left click. Escape quits.

use std::error::Error;
use std::f32::consts::TAU;

use glam::IVec3;
use minifb::{Key, MouseButton, MouseMode, Window, WindowOptions};

use softscene::defs::gradient_fill;
use softscene::renderer::SceneRenderer;
use softscene::surface::PixelSurface;
use softscene::world::{Camera, Model, Scene, Sprite, SpriteBank, SpriteEntity, TextureBank};

const WIDTH: usize = 800;
const HEIGHT: usize = 600;

fn main() -> Result<(), Box<dyn Error>> {
    let mut scene = Scene::new(Camera::default());
    scene.add_model(cube(200));
    scene.add_model(floor(900, 300));

    let mut sprites = SpriteBank::new();
    let tree = sprites.insert(tree_sprite());
    for (x, z) in [(-350, 150), (320, -80), (150, 400)] {
        scene.add_sprite(
            SpriteEntity {
                sprite: tree,
                width: 120,
                height: 180,
            },
            IVec3::new(x, 0, z),
        );
    }

    let mut textures = TextureBank::with_checker();
    let mut renderer = SceneRenderer::new(WIDTH, HEIGHT);
    let mut surface = PixelSurface::new(WIDTH, HEIGHT);

    let mut window = Window::new(
        "softscene",
        WIDTH,
        HEIGHT,
        WindowOptions::default(),
    )?;
    window.set_target_fps(50);

    let mut angle = 0i32;
    let mut was_down = false;
    while window.is_open() && !window.is_key_down(Key::Escape) {
        angle = (angle + 3) & 2047;
        let rad = angle as f32 * TAU / 2048.0;
        scene.camera.pos = IVec3::new(
            (700.0 * rad.sin()) as i32,
            -260,
            (-700.0 * rad.cos()) as i32,
        );
        scene.camera.yaw = angle;
        scene.camera.pitch = 70;

        if let Some((mx, my)) = window.get_mouse_pos(MouseMode::Clamp) {
            renderer
                .mouse_picker_mut()
                .set_pointer(mx as i32, my as i32);
        }

        surface.fill(0x00_10_18_28);
        renderer.render(&mut scene, &mut surface, &mut textures, &sprites);

        let down = window.get_mouse_down(MouseButton::Left);
        if down && !was_down {
            for &(model, face) in renderer.mouse_picker().picked() {
                println!("picked model {model} face {face}");
            }
        }
        was_down = down;

        window.update_with_buffer(&surface.pixels, WIDTH, HEIGHT)?;
    }
    Ok(())
}

/// Axis-aligned cube sitting on the ground plane, one gradient per side.
fn cube(size: i32) -> Model {
    let mut m = Model::new();
    let h = size / 2;
    // y points down: the cube occupies [-size, 0]
    let corners = [
        IVec3::new(-h, 0, -h),
        IVec3::new(h, 0, -h),
        IVec3::new(h, 0, h),
        IVec3::new(-h, 0, h),
        IVec3::new(-h, -size, -h),
        IVec3::new(h, -size, -h),
        IVec3::new(h, -size, h),
        IVec3::new(-h, -size, h),
    ];
    let v: Vec<_> = corners.iter().map(|&c| m.vertex_at(c)).collect();
    let sides = [
        ([0, 1, 5, 4], gradient_fill(28, 8, 8)),
        ([1, 2, 6, 5], gradient_fill(8, 28, 8)),
        ([2, 3, 7, 6], gradient_fill(8, 8, 28)),
        ([3, 0, 4, 7], gradient_fill(28, 28, 8)),
        ([4, 5, 6, 7], gradient_fill(24, 24, 24)),
        ([3, 2, 1, 0], gradient_fill(12, 12, 12)),
    ];
    for (quad, fill) in sides {
        let ids = [v[quad[0]], v[quad[1]], v[quad[2]], v[quad[3]]];
        let face = m.create_face(&ids, fill, fill);
        m.set_face_intensity(face, 40);
    }
    m.light_ambience = 60;
    m
}

/// Checkerboard ground plane split into tiles so the depth sort has
/// something to chew on.
fn floor(extent: i32, tile: i32) -> Model {
    let mut m = Model::new();
    let mut x = -extent;
    while x < extent {
        let mut z = -extent;
        while z < extent {
            let a = m.vertex_at(IVec3::new(x, 0, z));
            let b = m.vertex_at(IVec3::new(x + tile, 0, z));
            let c = m.vertex_at(IVec3::new(x + tile, 0, z + tile));
            let d = m.vertex_at(IVec3::new(x, 0, z + tile));
            // texture id 0: the bank's checkerboard
            let face = m.create_face(&[a, b, c, d], 0, 0);
            m.set_face_intensity(face, 20);
            z += tile;
        }
        x += tile;
    }
    m.light_ambience = 40;
    m.depth_bias = 100; // push the floor behind anything standing on it
    m
}

/// Procedural billboard: a blobby canopy over a trunk, colour 0 outside.
fn tree_sprite() -> Sprite {
    const W: usize = 24;
    const H: usize = 40;
    let mut pixels = vec![0u32; W * H];
    for y in 0..H {
        for x in 0..W {
            let dx = x as i32 - W as i32 / 2;
            let dy = y as i32 - 13;
            if dx * dx + dy * dy < 121 {
                pixels[y * W + x] = 0x00_2A_7A_2A;
            } else if y > 24 && dx.abs() < 3 {
                pixels[y * W + x] = 0x00_5A_3A_1A;
            }
        }
    }
    Sprite::new(W, H, pixels).expect("sprite dimensions are static")
}
