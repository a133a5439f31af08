//! Software 3D scene renderer.
//!
//! A CPU-only rasterizer in the lineage of late-90s isometric engines:
//! polygons are depth-sorted (painter's algorithm with cyclic-overlap
//! resolution) rather than z-buffered, spans are shaded in integer fixed
//! point, and perspective is re-divided every four pixels.
//!
//! The crate splits into three layers:
//!
//! * [`world`] — scene data: camera, models, textures, sprites.
//! * [`renderer`] — the per-frame pass: cull, sort, scanline, dispatch.
//! * [`surface`] — the destination pixel buffer and its span kernels.
//!
//! ```no_run
//! use softscene::renderer::SceneRenderer;
//! use softscene::surface::PixelSurface;
//! use softscene::world::{Camera, Scene, SpriteBank, TextureBank};
//!
//! let mut scene = Scene::new(Camera::default());
//! let mut surface = PixelSurface::new(512, 384);
//! let mut textures = TextureBank::with_checker();
//! let sprites = SpriteBank::new();
//! let mut renderer = SceneRenderer::new(512, 384);
//! renderer.render(&mut scene, &mut surface, &mut textures, &sprites);
//! ```

pub mod defs;
pub mod renderer;
pub mod surface;
pub mod util;
pub mod world;
