//! Model: a soup of world-space vertices and the faces spanning them.
//!
//! The renderer never walks this structure by itself; it reads the
//! per-vertex projection arrays that [`Model::project`] refreshes each
//! frame, plus the per-face fill/lighting tables.

use glam::IVec3;
use smallvec::SmallVec;

use crate::defs::{self, ModelFlags, COLOUR_TRANSPARENT};
use crate::world::camera::Camera;

pub type VertexId = u16;
pub type FaceId = usize;

/// One polygon face: an ordered vertex loop plus both side fills.
#[derive(Clone, Debug)]
pub struct Face {
    pub vertices: SmallVec<[VertexId; 8]>,
    /// Fill drawn when the camera sees the front side.
    pub fill_front: i32,
    /// Fill drawn when the camera sees the back side.
    pub fill_back: i32,
    /// Face-level light term, or [`COLOUR_TRANSPARENT`] to switch the face
    /// to per-vertex lighting.
    pub intensity: i32,
    /// Cached shift bringing the face normal into component range;
    /// -1 until the projector first sees the face.
    pub normal_scale: i32,
    /// Cached separating-plane tolerance derived from |normal|.
    pub normal_magnitude: i32,
}

/// Vertex/face container with cached per-frame projection results.
#[derive(Clone, Debug, Default)]
pub struct Model {
    /// World-space vertex positions.
    pub vertex: Vec<IVec3>,
    /// Per-vertex light terms, used when a face opts into vertex lighting.
    pub vertex_intensity: Vec<i32>,
    pub vertex_ambience: Vec<i32>,

    pub faces: Vec<Face>,

    /// Base light level added to every face/vertex term.
    pub light_ambience: i32,
    /// Depth-sort bias added to every face's average depth.
    pub depth_bias: i32,
    pub flags: ModelFlags,

    /* refreshed by `project` */
    pub project_x: Vec<i32>,
    pub project_y: Vec<i32>,
    pub project_z: Vec<i32>,
    pub view_x: Vec<i32>,
    pub view_y: Vec<i32>,
}

impl Model {
    pub fn new() -> Self {
        Self {
            flags: ModelFlags::VISIBLE,
            ..Self::default()
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertex.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Add (or reuse) a vertex at `pos` and return its id.
    pub fn vertex_at(&mut self, pos: IVec3) -> VertexId {
        if let Some(found) = self.vertex.iter().position(|v| *v == pos) {
            return found as VertexId;
        }
        self.push_vertex(pos)
    }

    /// Append a vertex without the dedup scan; bulk builders use this.
    pub fn push_vertex(&mut self, pos: IVec3) -> VertexId {
        self.vertex.push(pos);
        self.vertex_intensity.push(0);
        self.vertex_ambience.push(0);
        self.project_x.push(0);
        self.project_y.push(0);
        self.project_z.push(0);
        self.view_x.push(0);
        self.view_y.push(0);
        (self.vertex.len() - 1) as VertexId
    }

    /// Append a face over existing vertices. The loop must be convex and
    /// hold at most [`defs::MAX_FACE_VERTICES`] vertices (the renderer's
    /// scratch bound).
    pub fn create_face(&mut self, vertices: &[VertexId], fill_front: i32, fill_back: i32) -> FaceId {
        debug_assert!(vertices.len() >= 2);
        debug_assert!(vertices.len() <= defs::MAX_FACE_VERTICES);
        self.faces.push(Face {
            vertices: SmallVec::from_slice(vertices),
            fill_front,
            fill_back,
            intensity: 0,
            normal_scale: -1,
            normal_magnitude: 0,
        });
        self.faces.len() - 1
    }

    /// Switch a face to flat lighting with the given term.
    pub fn set_face_intensity(&mut self, face: FaceId, intensity: i32) {
        self.faces[face].intensity = intensity;
    }

    /// Switch a face to per-vertex lighting.
    pub fn set_vertex_lit(&mut self, face: FaceId) {
        self.faces[face].intensity = COLOUR_TRANSPARENT;
    }

    /// Refresh the camera-space and screen-space projection arrays.
    ///
    /// `view_x/y` are centered on the optical axis. Vertices nearer than
    /// `clip_near` are projected against the near distance instead of their
    /// own z so the half-plane cull masks stay meaningful; the scanline
    /// generator synthesizes proper clip vertices and never reads these.
    pub fn project(&mut self, camera: &Camera, view_distance: i32, clip_near: i32) {
        for (i, &world) in self.vertex.iter().enumerate() {
            let v = camera.to_view(world);
            self.project_x[i] = v.x;
            self.project_y[i] = v.y;
            self.project_z[i] = v.z;
            let div = v.z.max(clip_near);
            self.view_x[i] = (v.x << view_distance) / div;
            self.view_y[i] = (v.y << view_distance) / div;
        }
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{CLIP_NEAR, VIEW_DISTANCE};

    fn quad_at(z: i32, half: i32) -> Model {
        let mut m = Model::new();
        let a = m.vertex_at(IVec3::new(-half, -half, z));
        let b = m.vertex_at(IVec3::new(half, -half, z));
        let c = m.vertex_at(IVec3::new(half, half, z));
        let d = m.vertex_at(IVec3::new(-half, half, z));
        m.create_face(&[a, b, c, d], 0, 0);
        m
    }

    #[test]
    fn vertex_at_deduplicates() {
        let mut m = Model::new();
        let a = m.vertex_at(IVec3::new(1, 2, 3));
        let b = m.vertex_at(IVec3::new(1, 2, 3));
        assert_eq!(a, b);
        assert_eq!(m.num_vertices(), 1);
    }

    #[test]
    fn project_is_perspective_correct_at_axis() {
        let mut m = quad_at(1000, 128);
        m.project(&Camera::default(), VIEW_DISTANCE, CLIP_NEAR);
        // (128 << 9) / 1000 = 65
        assert_eq!(m.view_x[1], 65);
        assert_eq!(m.view_y[1], -65);
        assert_eq!(m.project_z[0], 1000);
    }

    #[test]
    fn near_vertices_divide_by_clip_near() {
        let mut m = Model::new();
        m.vertex_at(IVec3::new(10, 0, 2)); // closer than the near plane
        m.project(&Camera::default(), VIEW_DISTANCE, CLIP_NEAR);
        assert_eq!(m.view_x[0], (10 << VIEW_DISTANCE) / CLIP_NEAR);
    }
}
