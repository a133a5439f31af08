//! Scene-side data: everything the renderer reads but does not own.

pub mod camera;
pub mod model;
pub mod scene;
pub mod sprite;
pub mod texture;

pub use self::{
    camera::Camera,
    model::{FaceId, Model, VertexId},
    scene::{Scene, SpriteEntity},
    sprite::{Sprite, SpriteBank, SpriteError},
    texture::{Texture, TextureBank, TextureError},
};
