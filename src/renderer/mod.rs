//! The per-frame render pass.
//!
//! One call to [`SceneRenderer::render`] runs the whole pipeline in
//! sequence: camera frustum setup, per-model projection, per-face
//! visibility cull, polygon list build, depth sort, intersection resolve,
//! and per-polygon scanline generation plus rasterization into the
//! destination surface. No step suspends and nothing escapes a frame; the
//! polygon pool, scanline buffer and scratch arrays are reused so the
//! steady-state allocation per frame is zero.

mod picker;
mod polygon;
mod raster;
mod scanline;
mod sort;

pub use self::picker::MousePicker;

use crate::defs::{
    COLOUR_TRANSPARENT, MAX_FACE_VERTICES, MAX_POLYGONS, ModelFlags, SORT_STEP, VIEW_DISTANCE,
};
use crate::renderer::polygon::{Polygon, init_polygon_2d, init_polygon_3d};
use crate::renderer::raster::GradientCache;
use crate::renderer::scanline::Scanline;
use crate::surface::PixelSurface;
use crate::world::model::Model;
use crate::world::scene::Scene;
use crate::world::sprite::SpriteBank;
use crate::world::texture::TextureBank;

pub struct SceneRenderer {
    width: i32,
    base_x: i32,
    base_y: i32,
    clip_x: i32,
    clip_y: i32,
    view_distance: i32,
    clip_near: i32,
    clip_far_3d: i32,
    clip_far_2d: i32,

    visible: Vec<Polygon>,
    scanlines: Vec<Scanline>,
    min_y: i32,
    max_y: i32,

    /* per-polygon scratch */
    plane_x: [i32; MAX_FACE_VERTICES],
    plane_y: [i32; MAX_FACE_VERTICES],
    vertex_shade: [i32; MAX_FACE_VERTICES],
    vertex_x: [i32; MAX_FACE_VERTICES],
    vertex_y: [i32; MAX_FACE_VERTICES],
    vertex_z: [i32; MAX_FACE_VERTICES],

    gradients: GradientCache,
    picker: MousePicker,
}

impl SceneRenderer {
    /// Renderer projecting onto a `width` x `height` surface with the
    /// optical axis at the centre.
    pub fn new(width: usize, height: usize) -> Self {
        let w = width as i32;
        let h = height as i32;
        let mut renderer = Self {
            width: w,
            base_x: 0,
            base_y: 0,
            clip_x: 0,
            clip_y: 0,
            view_distance: VIEW_DISTANCE,
            clip_near: crate::defs::CLIP_NEAR,
            clip_far_3d: crate::defs::CLIP_FAR_3D,
            clip_far_2d: crate::defs::CLIP_FAR_2D,
            visible: Vec::with_capacity(MAX_POLYGONS),
            scanlines: Vec::new(),
            min_y: 0,
            max_y: 0,
            plane_x: [0; MAX_FACE_VERTICES],
            plane_y: [0; MAX_FACE_VERTICES],
            vertex_shade: [0; MAX_FACE_VERTICES],
            vertex_x: [0; MAX_FACE_VERTICES],
            vertex_y: [0; MAX_FACE_VERTICES],
            vertex_z: [0; MAX_FACE_VERTICES],
            gradients: GradientCache::new(),
            picker: MousePicker::new(0),
        };
        renderer.set_bounds(w / 2, h / 2, w / 2, h / 2, w, VIEW_DISTANCE);
        renderer
    }

    /// Reposition the projection centre and clip half-extents. Reallocates
    /// the scanline buffer and resets the mouse picker.
    pub fn set_bounds(
        &mut self,
        base_x: i32,
        base_y: i32,
        clip_x: i32,
        clip_y: i32,
        width: i32,
        view_distance: i32,
    ) {
        debug_assert!((5..=16).contains(&view_distance));
        debug_assert!(base_x + clip_x <= width && clip_x <= base_x);
        debug_assert!(clip_y <= base_y);
        self.base_x = base_x;
        self.base_y = base_y;
        self.clip_x = clip_x;
        self.clip_y = clip_y;
        self.width = width;
        self.view_distance = view_distance;
        self.scanlines = vec![Scanline::default(); (clip_y + base_y) as usize];
        self.picker = MousePicker::new(base_x);
    }

    pub fn mouse_picker(&self) -> &MousePicker {
        &self.picker
    }

    pub fn mouse_picker_mut(&mut self) -> &mut MousePicker {
        &mut self.picker
    }

    /// Polygons that survived the cull in the last frame.
    pub fn visible_polygon_count(&self) -> usize {
        self.visible.len()
    }

    /// Render one frame of `scene` into `surface`.
    pub fn render(
        &mut self,
        scene: &mut Scene,
        surface: &mut PixelSurface,
        textures: &mut TextureBank,
        sprites: &SpriteBank,
    ) {
        debug_assert_eq!(surface.width() as i32, self.width);
        debug_assert!(surface.pixels.len() >= ((self.base_y + self.clip_y) * self.width) as usize);

        let clip_x_wide = self.clip_x * self.clip_far_3d >> self.view_distance;
        let clip_y_wide = self.clip_y * self.clip_far_3d >> self.view_distance;
        scene.camera.prepare_for_rendering(
            self.clip_x,
            self.clip_y,
            self.clip_far_3d,
            clip_x_wide,
            clip_y_wide,
        );

        {
            let Scene {
                camera,
                models,
                sprite_faces,
                ..
            } = scene;
            for model in models.iter_mut() {
                model.project(camera, self.view_distance, self.clip_near);
            }
            sprite_faces.project(camera, self.view_distance, self.clip_near);
        }

        self.picker.begin_frame();
        self.visible.clear();
        self.build_polygons(scene);
        if self.visible.is_empty() {
            return;
        }

        let scene: &Scene = scene;
        sort::depth_sort(&mut self.visible);
        sort::intersect_sort(&mut self.visible, scene, SORT_STEP);

        for pi in 0..self.visible.len() {
            let poly = self.visible[pi].clone();
            if poly.model == scene.sprite_model_index() {
                self.render_sprite(scene, surface, sprites, poly.face);
                continue;
            }
            let model = scene.polygon_model(poly.model);
            self.stage_and_draw(scene, surface, textures, &poly, model);
        }
    }

    /// Cull faces against the frustum and fill the polygon list.
    fn build_polygons(&mut self, scene: &mut Scene) {
        let sprite_model_idx = scene.models.len();

        for mi in 0..scene.models.len() {
            let model = &mut scene.models[mi];
            if !model.flags.contains(ModelFlags::VISIBLE) {
                continue;
            }
            for face_id in 0..model.faces.len() {
                let in_band = model.faces[face_id].vertices.iter().any(|&v| {
                    let z = model.project_z[v as usize];
                    z > self.clip_near && z < self.clip_far_3d
                });
                if !in_band {
                    continue;
                }

                let mut mask = 0u8;
                for &v in &model.faces[face_id].vertices {
                    let x = model.view_x[v as usize];
                    if x > -self.clip_x {
                        mask |= 1;
                    }
                    if x < self.clip_x {
                        mask |= 2;
                    }
                    if mask == 3 {
                        break;
                    }
                }
                if mask != 3 {
                    continue;
                }
                mask = 0;
                for &v in &model.faces[face_id].vertices {
                    let y = model.view_y[v as usize];
                    if y > -self.clip_y {
                        mask |= 1;
                    }
                    if y < self.clip_y {
                        mask |= 2;
                    }
                    if mask == 3 {
                        break;
                    }
                }
                if mask != 3 {
                    continue;
                }

                if self.visible.len() >= MAX_POLYGONS {
                    continue;
                }
                let mut poly = Polygon::new(mi, face_id);
                init_polygon_3d(&mut poly, model);
                let face = &model.faces[face_id];
                let fill = if poly.visibility < 0 {
                    face.fill_front
                } else {
                    face.fill_back
                };
                if fill == COLOUR_TRANSPARENT {
                    continue;
                }
                let mut depth_sum = 0i32;
                for &v in &face.vertices {
                    depth_sum += model.project_z[v as usize];
                }
                poly.depth = depth_sum / face.vertices.len() as i32 + model.depth_bias;
                poly.face_fill = fill;
                self.visible.push(poly);
            }
        }

        if scene.sprite_faces.flags.contains(ModelFlags::VISIBLE) {
            for face_id in 0..scene.sprite_faces.faces.len() {
                let sm = &scene.sprite_faces;
                let v0 = sm.faces[face_id].vertices[0] as usize;
                let v1 = sm.faces[face_id].vertices[1] as usize;
                let vx = sm.view_x[v0];
                let vy = sm.view_y[v0];
                let vz = sm.project_z[v0];
                if vz <= self.clip_near || vz >= self.clip_far_2d {
                    continue;
                }
                let ent = scene.sprite_entities[face_id];
                let w = (ent.width << self.view_distance) / vz;
                let h = (ent.height << self.view_distance) / vz;
                let on_screen = vx - w / 2 <= self.clip_x
                    && vx + w / 2 >= -self.clip_x
                    && vy - h <= self.clip_y
                    && vy >= -self.clip_y;
                if !on_screen || self.visible.len() >= MAX_POLYGONS {
                    continue;
                }
                let depth = (vz + sm.project_z[v1]) / 2;
                let mut poly = Polygon::new(sprite_model_idx, face_id);
                init_polygon_2d(&mut poly, &mut scene.sprite_faces);
                poly.depth = depth;
                self.visible.push(poly);
            }
        }
    }

    /// Light the face, clip it against the near plane into the `plane_*`
    /// scratch arrays, then hand the spans to the rasterizer.
    fn stage_and_draw(
        &mut self,
        scene: &Scene,
        surface: &mut PixelSurface,
        textures: &mut TextureBank,
        poly: &Polygon,
        model: &Model,
    ) {
        let face = &model.faces[poly.face];
        let n = face.vertices.len();

        let mut light = 0i32;
        if face.intensity != COLOUR_TRANSPARENT {
            light = if poly.visibility < 0 {
                model.light_ambience - face.intensity
            } else {
                model.light_ambience + face.intensity
            };
        }

        let mut plane = 0usize;
        for (vi, &vid) in face.vertices.iter().enumerate() {
            let v = vid as usize;
            self.vertex_x[vi] = model.project_x[v];
            self.vertex_y[vi] = model.project_y[v];
            self.vertex_z[vi] = model.project_z[v];

            if face.intensity == COLOUR_TRANSPARENT {
                light = if poly.visibility < 0 {
                    (model.light_ambience - model.vertex_intensity[v]) + model.vertex_ambience[v]
                } else {
                    model.light_ambience + model.vertex_intensity[v] + model.vertex_ambience[v]
                };
            }

            if model.project_z[v] >= self.clip_near {
                if plane < MAX_FACE_VERTICES {
                    self.plane_x[plane] = model.view_x[v];
                    self.plane_y[plane] = model.view_y[v];
                    self.vertex_shade[plane] = light;
                    if model.project_z[v] > scene.fog_z_distance {
                        self.vertex_shade[plane] +=
                            (model.project_z[v] - scene.fog_z_distance) / scene.fog_z_falloff;
                    }
                    plane += 1;
                }
            } else {
                // vertex is behind the near plane: synthesize a clip vertex
                // against each neighbour that is in front of it
                let prev = face.vertices[if vi == 0 { n - 1 } else { vi - 1 }] as usize;
                if model.project_z[prev] >= self.clip_near && plane < MAX_FACE_VERTICES {
                    let dz = model.project_z[v] - model.project_z[prev];
                    let ix = model.project_x[v]
                        - ((model.project_x[v] - model.project_x[prev])
                            * (model.project_z[v] - self.clip_near))
                            / dz;
                    let iy = model.project_y[v]
                        - ((model.project_y[v] - model.project_y[prev])
                            * (model.project_z[v] - self.clip_near))
                            / dz;
                    self.plane_x[plane] = (ix << self.view_distance) / self.clip_near;
                    self.plane_y[plane] = (iy << self.view_distance) / self.clip_near;
                    self.vertex_shade[plane] = light;
                    plane += 1;
                }
                let next = face.vertices[if vi == n - 1 { 0 } else { vi + 1 }] as usize;
                if model.project_z[next] >= self.clip_near && plane < MAX_FACE_VERTICES {
                    let dz = model.project_z[v] - model.project_z[next];
                    let ix = model.project_x[v]
                        - ((model.project_x[v] - model.project_x[next])
                            * (model.project_z[v] - self.clip_near))
                            / dz;
                    let iy = model.project_y[v]
                        - ((model.project_y[v] - model.project_y[next])
                            * (model.project_z[v] - self.clip_near))
                            / dz;
                    self.plane_x[plane] = (ix << self.view_distance) / self.clip_near;
                    self.plane_y[plane] = (iy << self.view_distance) / self.clip_near;
                    self.vertex_shade[plane] = light;
                    plane += 1;
                }
            }
        }

        let shade_shift = if poly.face_fill >= 0 {
            let id = poly.face_fill as usize;
            let id = if id < textures.len() { id } else { 0 };
            let large = textures.texture(id).map(|t| t.is_large()).unwrap_or(false);
            if large { 9 } else { 6 }
        } else {
            0
        };
        for shade in self.vertex_shade.iter_mut().take(n) {
            *shade = (*shade).clamp(0, 255) << shade_shift;
        }

        self.generate_scanlines(plane, model, poly.model, poly.face);
        if self.max_y > self.min_y {
            self.rasterize(surface, textures, n, poly.face_fill, model);
        }
    }

    /// Billboards bypass the span pipeline entirely: one scaled blit.
    fn render_sprite(
        &mut self,
        scene: &Scene,
        surface: &mut PixelSurface,
        sprites: &SpriteBank,
        face_id: usize,
    ) {
        let model = &scene.sprite_faces;
        let ent = scene.sprite_entities[face_id];
        let v0 = model.faces[face_id].vertices[0] as usize;
        let vx = model.view_x[v0];
        let vy = model.view_y[v0];
        let vz = model.project_z[v0];
        let w = (ent.width << self.view_distance) / vz;
        let h = (ent.height << self.view_distance) / vz;
        let x = vx - w / 2;
        let y = self.base_y + vy - h;
        if let Some(sprite) = sprites.get(ent.sprite) {
            surface.sprite_clip(x + self.base_x, y, w, h, sprite);
        }
    }
}

/*======================================================================*/
/*                          End-to-end tests                            */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{self, CLIP_FAR_3D, gradient_fill};
    use crate::world::camera::Camera;
    use crate::world::sprite::{Sprite, SpriteBank};
    use crate::world::texture::{SMALL_SIDE, Texture};
    use glam::IVec3;

    const W: usize = 512;
    const H: usize = 384;

    fn setup() -> (SceneRenderer, PixelSurface, TextureBank, SpriteBank) {
        (
            SceneRenderer::new(W, H),
            PixelSurface::new(W, H),
            TextureBank::with_checker(),
            SpriteBank::new(),
        )
    }

    fn quad_model(cx: i32, cy: i32, z: i32, half: i32, fill: i32) -> Model {
        let mut m = Model::new();
        let a = m.vertex_at(IVec3::new(cx - half, cy - half, z));
        let b = m.vertex_at(IVec3::new(cx + half, cy - half, z));
        let c = m.vertex_at(IVec3::new(cx + half, cy + half, z));
        let d = m.vertex_at(IVec3::new(cx - half, cy + half, z));
        m.create_face(&[a, b, c, d], fill, fill);
        m
    }

    #[test]
    fn blank_scene_writes_nothing() {
        let (mut r, mut surf, mut tex, sprites) = setup();
        let mut scene = Scene::new(Camera::default());
        r.render(&mut scene, &mut surf, &mut tex, &sprites);
        assert_eq!(r.visible_polygon_count(), 0);
        assert!(surf.pixels.iter().all(|&p| p == 0));
    }

    #[test]
    fn single_opaque_quad_hits_centre_pixel() {
        let (mut r, mut surf, mut tex, sprites) = setup();
        let green = tex.insert(Texture::solid(SMALL_SIDE, 0x00FF00).unwrap()) as i32;
        let mut scene = Scene::new(Camera::default());
        scene.add_model(quad_model(0, 0, 1000, 100, green));
        r.render(&mut scene, &mut surf, &mut tex, &sprites);
        assert_eq!(r.visible_polygon_count(), 1);
        // shade is zero: no darkening shift, identity shade bank
        assert_eq!(surf.pixels[W / 2 + H / 2 * W], 0x00FF00);
    }

    #[test]
    fn near_plane_straddle_clips_and_stays_in_band() {
        let (mut r, mut surf, mut tex, sprites) = setup();
        r.set_bounds(256, 192, 256, 100, W as i32, defs::VIEW_DISTANCE);
        let mut scene = Scene::new(Camera::default());
        let mut m = Model::new();
        let a = m.vertex_at(IVec3::new(0, -20, 100));
        let b = m.vertex_at(IVec3::new(10, 10, 2));
        let c = m.vertex_at(IVec3::new(-10, 10, 2));
        let fill = gradient_fill(31, 31, 31);
        m.create_face(&[a, b, c], fill, fill);
        scene.add_model(m);
        r.render(&mut scene, &mut surf, &mut tex, &sprites);
        assert_eq!(r.visible_polygon_count(), 1);
        let band = (192 - 100) as usize..(192 + 100) as usize;
        let mut wrote_inside = false;
        for row in 0..H {
            let touched = surf.pixels[row * W..(row + 1) * W].iter().any(|&p| p != 0);
            if band.contains(&row) {
                wrote_inside |= touched;
            } else {
                assert!(!touched, "pixel written outside the clip band, row {row}");
            }
        }
        assert!(wrote_inside);
    }

    #[test]
    fn overlap_cycle_resolves_and_renders() {
        let (mut r, mut surf, mut tex, sprites) = setup();
        let mut scene = Scene::new(Camera::default());
        for (cx, cy) in [(0, 0), (60, 40), (-50, 60)] {
            scene.add_model(quad_model(cx, cy, 1000, 120, gradient_fill(20, 8, 8)));
        }
        r.render(&mut scene, &mut surf, &mut tex, &sprites);
        assert_eq!(r.visible_polygon_count(), 3);
        for p in &r.visible {
            assert!(p.min_view_x <= p.max_view_x);
            assert!(p.min_view_y <= p.max_view_y);
            assert!(p.min_z <= p.max_z);
        }
    }

    #[test]
    fn repeated_renders_are_deterministic() {
        let (mut r, mut surf_a, mut tex, sprites) = setup();
        let mut surf_b = PixelSurface::new(W, H);
        let mut scene = Scene::new(Camera::default());
        scene.add_model(quad_model(0, 0, 900, 150, gradient_fill(4, 30, 12)));
        scene.add_model(quad_model(80, 40, 1200, 150, gradient_fill(30, 2, 2)));
        r.render(&mut scene, &mut surf_a, &mut tex, &sprites);
        r.render(&mut scene, &mut surf_b, &mut tex, &sprites);
        assert_eq!(surf_a.pixels, surf_b.pixels);
    }

    #[test]
    fn polygon_list_saturates_silently() {
        let (mut r, mut surf, mut tex, sprites) = setup();
        let mut scene = Scene::new(Camera::default());
        let mut m = Model::new();
        let a = m.push_vertex(IVec3::new(-1, -1, 1000));
        let b = m.push_vertex(IVec3::new(1, -1, 1000));
        let c = m.push_vertex(IVec3::new(1, 1, 1000));
        let d = m.push_vertex(IVec3::new(-1, 1, 1000));
        let fill = gradient_fill(8, 8, 8);
        for _ in 0..MAX_POLYGONS + 1 {
            m.create_face(&[a, b, c, d], fill, fill);
        }
        scene.add_model(m);
        r.render(&mut scene, &mut surf, &mut tex, &sprites);
        assert_eq!(r.visible_polygon_count(), MAX_POLYGONS);
    }

    #[test]
    fn mouse_pick_reports_front_pickable_face_only() {
        let (mut r, mut surf, mut tex, sprites) = setup();
        let mut scene = Scene::new(Camera::default());
        // pickable triangle over the optical axis
        let mut tri = Model::new();
        let a = tri.vertex_at(IVec3::new(0, -50, 500));
        let b = tri.vertex_at(IVec3::new(60, 50, 500));
        let c = tri.vertex_at(IVec3::new(-60, 50, 500));
        let fill = gradient_fill(0, 31, 0);
        tri.create_face(&[a, b, c], fill, fill);
        scene.add_model(tri);
        // unpickable quad behind it, also covering the axis
        let back = scene.add_model(quad_model(0, 0, 700, 150, gradient_fill(31, 0, 0)));
        scene.set_unpickable(back);

        r.mouse_picker_mut().set_pointer(W as i32 / 2, H as i32 / 2);
        r.render(&mut scene, &mut surf, &mut tex, &sprites);

        assert_eq!(r.mouse_picker().picked(), &[(0, 0)]);
    }

    #[test]
    fn sprite_is_billboarded_through_the_polygon_list() {
        let (mut r, mut surf, mut tex, mut sprites) = setup();
        let id = sprites.insert(Sprite::new(8, 8, vec![0xFF00FF; 64]).unwrap());
        let mut scene = Scene::new(Camera::default());
        scene.add_sprite(
            crate::world::scene::SpriteEntity {
                sprite: id,
                width: 100,
                height: 100,
            },
            IVec3::new(0, 50, 800),
        );
        r.render(&mut scene, &mut surf, &mut tex, &sprites);
        assert_eq!(r.visible_polygon_count(), 1);
        assert!(surf.pixels.iter().any(|&p| p == 0xFF00FF));
    }

    #[test]
    fn far_plane_culls_beyond_distance() {
        // a quad just inside and a quad past the far plane
        let (mut r, mut surf, mut tex, sprites) = setup();
        let mut scene = Scene::new(Camera::default());
        scene.add_model(quad_model(0, 0, CLIP_FAR_3D - 10, 400, gradient_fill(9, 9, 9)));
        scene.add_model(quad_model(0, 0, CLIP_FAR_3D + 10, 400, gradient_fill(9, 9, 9)));
        r.render(&mut scene, &mut surf, &mut tex, &sprites);
        assert_eq!(r.visible_polygon_count(), 1);
    }
}
