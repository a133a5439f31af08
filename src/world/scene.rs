//! Scene: camera, 3D models, billboard sprites and fog.
//!
//! Sprites live in a pseudo-model whose faces are two-vertex edges (feet
//! and head of the billboard); the renderer projects it with the same
//! routine as the 3D models and tags its polygons as sprites by model
//! index, `models.len()` being the sprite sentinel.

use glam::IVec3;

use crate::defs::{CLIP_FAR_3D, ModelFlags};
use crate::world::camera::Camera;
use crate::world::model::Model;

/// One billboard instance, paired index-for-index with the faces of the
/// sprite pseudo-model.
#[derive(Clone, Copy, Debug)]
pub struct SpriteEntity {
    /// Blit source in the sprite bank.
    pub sprite: usize,
    /// World-space width, scaled by `<< view_distance / z` on screen.
    pub width: i32,
    pub height: i32,
}

pub struct Scene {
    pub camera: Camera,
    pub models: Vec<Model>,
    /// Two-vertex billboard faces; projected like any model.
    pub sprite_faces: Model,
    pub sprite_entities: Vec<SpriteEntity>,
    /// Depth beyond which shade fades toward black.
    pub fog_z_distance: i32,
    /// Divisor converting excess depth into shade; must stay non-zero.
    pub fog_z_falloff: i32,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            models: Vec::new(),
            sprite_faces: Model::new(),
            sprite_entities: Vec::new(),
            // fog starts at the far plane: invisible until tuned closer
            fog_z_distance: CLIP_FAR_3D,
            fog_z_falloff: 20,
        }
    }

    pub fn num_models(&self) -> usize {
        self.models.len()
    }

    pub fn add_model(&mut self, model: Model) -> usize {
        self.models.push(model);
        self.models.len() - 1
    }

    /// Place a billboard with its feet at `pos`. The head vertex sits
    /// `height` above (y points down, so at `pos.y - height`).
    pub fn add_sprite(&mut self, entity: SpriteEntity, pos: IVec3) -> usize {
        let feet = self.sprite_faces.vertex_at(pos);
        let head = self
            .sprite_faces
            .vertex_at(IVec3::new(pos.x, pos.y - entity.height, pos.z));
        self.sprite_faces.create_face(&[feet, head], 0, 0);
        self.sprite_entities.push(entity);
        self.sprite_entities.len() - 1
    }

    /// Model backing a polygon: `index == models.len()` is the sprite
    /// pseudo-model.
    #[inline]
    pub fn polygon_model(&self, index: usize) -> &Model {
        if index == self.models.len() {
            &self.sprite_faces
        } else {
            &self.models[index]
        }
    }

    /// Index value tagging sprite polygons.
    #[inline]
    pub fn sprite_model_index(&self) -> usize {
        self.models.len()
    }

    pub fn set_unpickable(&mut self, model: usize) {
        self.models[model].flags |= ModelFlags::UNPICKABLE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sprite_builds_vertical_edge() {
        let mut scene = Scene::new(Camera::default());
        scene.add_sprite(
            SpriteEntity {
                sprite: 0,
                width: 60,
                height: 100,
            },
            IVec3::new(10, 0, 500),
        );
        let faces = &scene.sprite_faces.faces;
        assert_eq!(faces.len(), 1);
        let head = faces[0].vertices[1] as usize;
        assert_eq!(scene.sprite_faces.vertex[head], IVec3::new(10, -100, 500));
    }

    #[test]
    fn sprite_sentinel_resolves_pseudo_model() {
        let mut scene = Scene::new(Camera::default());
        scene.add_model(Model::new());
        let sprites = scene.sprite_model_index();
        assert_eq!(sprites, 1);
        // must not panic, and must hand back the sprite container
        assert_eq!(
            scene.polygon_model(sprites).num_faces(),
            scene.sprite_faces.num_faces()
        );
    }
}
