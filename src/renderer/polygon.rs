//! Per-frame polygon records and their projectors.
//!
//! A `Polygon` is scratch data: it back-references its model and face by
//! index (the model list length is the sprite pseudo-model sentinel) and
//! caches everything the sorter needs — depth, camera-side visibility, a
//! range-limited face normal and the view-space bounding box.

use crate::defs::{NORMAL_COMPONENT_LIMIT, NORMAL_MAGNITUDE};
use crate::world::model::Model;

#[derive(Clone, Debug)]
pub struct Polygon {
    /// Index into the scene's model list; `models.len()` means the sprite
    /// pseudo-model.
    pub model: usize,
    pub face: usize,
    /// Average projected z plus the model's depth bias.
    pub depth: i32,
    /// Signed `v0 . normal`; the sign tells which side the camera is on.
    pub visibility: i32,
    pub normal_x: i32,
    pub normal_y: i32,
    pub normal_z: i32,
    pub min_z: i32,
    pub max_z: i32,
    pub min_view_x: i32,
    pub max_view_x: i32,
    pub min_view_y: i32,
    pub max_view_y: i32,
    pub face_fill: i32,
    /* intersection-resolve scratch */
    pub resolved: bool,
    pub index: i32,
    pub index2: i32,
}

impl Polygon {
    pub fn new(model: usize, face: usize) -> Self {
        Self {
            model,
            face,
            depth: 0,
            visibility: 0,
            normal_x: 0,
            normal_y: 0,
            normal_z: 0,
            min_z: 0,
            max_z: 0,
            min_view_x: 0,
            max_view_x: 0,
            min_view_y: 0,
            max_view_y: 0,
            face_fill: 0,
            resolved: false,
            index: 0,
            index2: -1,
        }
    }
}

/// Fill in a 3D face polygon: normal, visibility and bounds.
///
/// The un-normalised face normal is shifted until every component fits the
/// separation tests' working range; the shift and the derived tolerance
/// are memoized on the face the first time it is seen. Dot products wrap
/// on purpose; the magnitude bound comparison tolerates wrapped values.
pub(crate) fn init_polygon_3d(poly: &mut Polygon, model: &mut Model) {
    let face = &model.faces[poly.face];
    let v0 = face.vertices[0] as usize;
    let v1 = face.vertices[1] as usize;
    let v2 = face.vertices[2] as usize;

    let cx = model.project_x[v0];
    let cy = model.project_y[v0];
    let cz = model.project_z[v0];
    let dx1 = model.project_x[v1].wrapping_sub(cx);
    let dy1 = model.project_y[v1].wrapping_sub(cy);
    let dz1 = model.project_z[v1].wrapping_sub(cz);
    let dx2 = model.project_x[v2].wrapping_sub(cx);
    let dy2 = model.project_y[v2].wrapping_sub(cy);
    let dz2 = model.project_z[v2].wrapping_sub(cz);

    let mut nx = dy1.wrapping_mul(dz2).wrapping_sub(dy2.wrapping_mul(dz1));
    let mut ny = dz1.wrapping_mul(dx2).wrapping_sub(dz2.wrapping_mul(dx1));
    let mut nz = dx1.wrapping_mul(dy2).wrapping_sub(dx2.wrapping_mul(dy1));

    let cached_scale = face.normal_scale;
    if cached_scale == -1 {
        let mut scale = 0;
        while nx > NORMAL_COMPONENT_LIMIT
            || ny > NORMAL_COMPONENT_LIMIT
            || nz > NORMAL_COMPONENT_LIMIT
            || nx < -NORMAL_COMPONENT_LIMIT
            || ny < -NORMAL_COMPONENT_LIMIT
            || nz < -NORMAL_COMPONENT_LIMIT
        {
            scale += 1;
            nx >>= 1;
            ny >>= 1;
            nz >>= 1;
        }
        let mag_sq = (nx * nx + ny * ny + nz * nz) as f64;
        let face = &mut model.faces[poly.face];
        face.normal_scale = scale;
        face.normal_magnitude = (NORMAL_MAGNITUDE as f64 * mag_sq.sqrt()) as i32;
    } else {
        nx >>= cached_scale;
        ny >>= cached_scale;
        nz >>= cached_scale;
    }

    poly.visibility = cx
        .wrapping_mul(nx)
        .wrapping_add(cy.wrapping_mul(ny))
        .wrapping_add(cz.wrapping_mul(nz));
    poly.normal_x = nx;
    poly.normal_y = ny;
    poly.normal_z = nz;

    let face = &model.faces[poly.face];
    let mut min_z = model.project_z[v0];
    let mut max_z = min_z;
    let mut min_x = model.view_x[v0];
    let mut max_x = min_x;
    let mut min_y = model.view_y[v0];
    let mut max_y = min_y;
    for &vid in &face.vertices[1..] {
        let v = vid as usize;
        let z = model.project_z[v];
        if z > max_z {
            max_z = z;
        } else if z < min_z {
            min_z = z;
        }
        let x = model.view_x[v];
        if x > max_x {
            max_x = x;
        } else if x < min_x {
            min_x = x;
        }
        let y = model.view_y[v];
        if y > max_y {
            max_y = y;
        } else if y < min_y {
            min_y = y;
        }
    }
    poly.min_z = min_z;
    poly.max_z = max_z;
    poly.min_view_x = min_x;
    poly.max_view_x = max_x;
    poly.min_view_y = min_y;
    poly.max_view_y = max_y;
}

/// Fill in a billboard polygon from its two-vertex face.
///
/// The normal is the view axis, the x bounds are inflated by 20 units on
/// each side to bias the sort against flat sprites, and the head vertex is
/// taken as the upper y bound.
pub(crate) fn init_polygon_2d(poly: &mut Polygon, model: &mut Model) {
    let face = &model.faces[poly.face];
    let v0 = face.vertices[0] as usize;
    let v1 = face.vertices[1] as usize;

    {
        let face = &mut model.faces[poly.face];
        face.normal_magnitude = 1;
        face.normal_scale = 0;
    }
    poly.normal_x = 0;
    poly.normal_y = 0;
    poly.normal_z = 1;
    poly.visibility = model.project_z[v0];

    poly.min_z = model.project_z[v0].min(model.project_z[v1]);
    poly.max_z = model.project_z[v0].max(model.project_z[v1]);
    poly.min_view_x = model.view_x[v0].min(model.view_x[v1]) - 20;
    poly.max_view_x = model.view_x[v0].max(model.view_x[v1]) + 20;
    poly.min_view_y = model.view_y[v1];
    poly.max_view_y = model.view_y[v0].max(model.view_y[v1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{CLIP_NEAR, VIEW_DISTANCE};
    use crate::world::camera::Camera;
    use glam::IVec3;

    fn projected_quad() -> Model {
        let mut m = Model::new();
        let a = m.vertex_at(IVec3::new(-100, -100, 1000));
        let b = m.vertex_at(IVec3::new(100, -100, 1000));
        let c = m.vertex_at(IVec3::new(100, 100, 1000));
        let d = m.vertex_at(IVec3::new(-100, 100, 1000));
        m.create_face(&[a, b, c, d], 7, 8);
        m.project(&Camera::default(), VIEW_DISTANCE, CLIP_NEAR);
        m
    }

    #[test]
    fn bounds_are_ordered() {
        let mut m = projected_quad();
        let mut poly = Polygon::new(0, 0);
        init_polygon_3d(&mut poly, &mut m);
        assert!(poly.min_view_x <= poly.max_view_x);
        assert!(poly.min_view_y <= poly.max_view_y);
        assert!(poly.min_z <= poly.max_z);
        assert_eq!(poly.min_z, 1000);
    }

    #[test]
    fn normal_scale_is_memoized() {
        let mut m = projected_quad();
        let mut poly = Polygon::new(0, 0);
        init_polygon_3d(&mut poly, &mut m);
        let scale = m.faces[0].normal_scale;
        let mag = m.faces[0].normal_magnitude;
        assert!(scale >= 0);
        assert!(mag > 0);
        assert!(poly.normal_x.abs() <= 25000);
        assert!(poly.normal_y.abs() <= 25000);
        assert!(poly.normal_z.abs() <= 25000);
        // second sighting reuses the cache and produces the same normal
        let mut again = Polygon::new(0, 0);
        init_polygon_3d(&mut again, &mut m);
        assert_eq!(m.faces[0].normal_scale, scale);
        assert_eq!(m.faces[0].normal_magnitude, mag);
        assert_eq!(again.normal_z, poly.normal_z);
    }

    #[test]
    fn billboard_bounds_inflate_x() {
        let mut m = Model::new();
        let feet = m.vertex_at(IVec3::new(0, 0, 500));
        let head = m.vertex_at(IVec3::new(0, -80, 500));
        m.create_face(&[feet, head], 0, 0);
        m.project(&Camera::default(), VIEW_DISTANCE, CLIP_NEAR);
        let mut poly = Polygon::new(0, 0);
        init_polygon_2d(&mut poly, &mut m);
        assert_eq!(poly.max_view_x - poly.min_view_x, 40);
        assert_eq!(poly.normal_z, 1);
        assert!(poly.min_view_y < poly.max_view_y);
    }
}
