//! Draw-order resolution.
//!
//! Two phases. A quicksort puts polygons in descending average depth
//! (farthest first). Then a bounded-window resolve walks the list and,
//! wherever two nearby polygons overlap on screen without a provable
//! separation, bubbles the one that must be drawn later past the other.
//! The `index`/`index2` pair breaks ping-pong cycles: once polygon B has
//! been reordered on behalf of polygon A, the pair is never revisited.

use smallvec::SmallVec;

use crate::renderer::polygon::Polygon;
use crate::world::scene::Scene;

type Hull = SmallVec<[i32; 16]>;

/// Quicksort on `depth`, descending. Hoare partition with the middle
/// element swapped to the pivot slot.
pub(crate) fn depth_sort(polys: &mut [Polygon]) {
    if polys.len() > 1 {
        qsort(polys, 0, polys.len() as i32 - 1);
    }
}

fn qsort(polys: &mut [Polygon], low: i32, high: i32) {
    if low >= high {
        return;
    }
    let mid = (low + high) / 2;
    polys.swap(mid as usize, low as usize);
    let pivot = polys[low as usize].depth;
    let mut lo = low - 1;
    let mut hi = high + 1;
    while lo < hi {
        loop {
            hi -= 1;
            if polys[hi as usize].depth >= pivot {
                break;
            }
        }
        loop {
            lo += 1;
            if polys[lo as usize].depth <= pivot {
                break;
            }
        }
        if lo < hi {
            polys.swap(lo as usize, hi as usize);
        }
    }
    qsort(polys, low, hi);
    qsort(polys, hi + 1, high);
}

/// Intersection-resolve pass over a sliding window of `step` polygons.
pub(crate) fn intersect_sort(polys: &mut [Polygon], scene: &Scene, step: i32) {
    let count = polys.len() as i32;
    for (k, p) in polys.iter_mut().enumerate() {
        p.resolved = false;
        p.index = k as i32;
        p.index2 = -1;
    }

    let mut resolver = Resolver {
        new_start: 0,
        new_end: 0,
    };
    let mut l = 0i32;
    loop {
        while l < count && polys[l as usize].resolved {
            l += 1;
        }
        if l == count {
            return;
        }
        polys[l as usize].resolved = true;
        // Geometry is immutable during the pass, so a snapshot of the
        // marked polygon stays valid even as reordering moves it.
        let probe = polys[l as usize].clone();

        let mut start = l;
        let window_end = (l + step).min(count - 1);
        let mut k1 = window_end;
        while k1 >= start + 1 {
            let other = &polys[k1 as usize];
            if probe.min_view_x < other.max_view_x
                && other.min_view_x < probe.max_view_x
                && probe.min_view_y < other.max_view_y
                && other.min_view_y < probe.max_view_y
                && probe.index != other.index2
                && !polygons_separate(scene, &probe, other)
                && plausibly_in_front(scene, other, &probe)
            {
                let other_index = other.index;
                let lo = start;
                let hi = k1;
                resolver.order(polys, scene, start, k1);
                if polys[k1 as usize].index != other_index {
                    k1 += 1;
                }
                start = resolver.new_start;
                // The reordered polygon moved somewhere inside the window;
                // tag it so this pair is not resolved again.
                for idx in lo..=hi {
                    let p = &mut polys[idx as usize];
                    if p.index == other_index {
                        p.index2 = probe.index;
                        break;
                    }
                }
            }
            k1 -= 1;
        }
    }
}

struct Resolver {
    new_start: i32,
    new_end: i32,
}

impl Resolver {
    /// Topological reorder by adjacent swaps inside `[start, end]`.
    ///
    /// Bubbles provably-separate polygons off both ends, then recurses on
    /// the strictly smaller interior, so the depth is bounded by the
    /// window size and termination is structural.
    fn order(&mut self, polys: &mut [Polygon], scene: &Scene, start: i32, end: i32) -> bool {
        let mut start = start;
        let mut end = end;
        loop {
            let mut k = start + 1;
            while k <= end {
                if !polygons_separate(scene, &polys[k as usize], &polys[start as usize]) {
                    break;
                }
                polys.swap(start as usize, k as usize);
                start = k;
                if start == end {
                    self.new_start = start;
                    self.new_end = start - 1;
                    return true;
                }
                k += 1;
            }

            let mut m = end - 1;
            while m >= start {
                if !polygons_separate(scene, &polys[end as usize], &polys[m as usize]) {
                    break;
                }
                polys.swap(end as usize, m as usize);
                end = m;
                if start == end {
                    self.new_start = end + 1;
                    self.new_end = end;
                    return true;
                }
                m -= 1;
            }

            if start + 1 >= end {
                self.new_start = start;
                self.new_end = end;
                return false;
            }
            if !self.order(polys, scene, start + 1, end) {
                self.new_start = start;
                return false;
            }
            end = self.new_end;
        }
    }
}

/// Does any vertex of `subject` witness separation against `plane`'s
/// supporting plane? `flip` mirrors the camera-side convention for the
/// symmetric test.
fn plane_witness(scene: &Scene, subject: &Polygon, plane: &Polygon, flip: bool) -> bool {
    let sm = scene.polygon_model(subject.model);
    let pm = scene.polygon_model(plane.model);
    let p0 = pm.faces[plane.face].vertices[0] as usize;
    let px = pm.project_x[p0];
    let py = pm.project_y[p0];
    let pz = pm.project_z[p0];
    let (nx, ny, nz) = (plane.normal_x, plane.normal_y, plane.normal_z);
    let mag = pm.faces[plane.face].normal_magnitude;
    let vis = plane.visibility;

    for &vid in &sm.faces[subject.face].vertices {
        let v = vid as usize;
        let d = px
            .wrapping_sub(sm.project_x[v])
            .wrapping_mul(nx)
            .wrapping_add(py.wrapping_sub(sm.project_y[v]).wrapping_mul(ny))
            .wrapping_add(pz.wrapping_sub(sm.project_z[v]).wrapping_mul(nz));
        let outside = if flip {
            (d < -mag && vis > 0) || (d > mag && vis < 0)
        } else {
            (d < -mag && vis < 0) || (d > mag && vis > 0)
        };
        if outside {
            return true;
        }
    }
    false
}

/// True when `a` and `b` provably do not constrain each other's draw
/// order: bounding boxes apart, a clean separating plane either way, or
/// disjoint screen hulls.
///
/// The z test is asymmetric on purpose (`>=` against `>`): equal-depth
/// contacts fall through to the plane tests from one side only.
pub(crate) fn polygons_separate(scene: &Scene, a: &Polygon, b: &Polygon) -> bool {
    if a.min_view_x >= b.max_view_x {
        return true;
    }
    if b.min_view_x >= a.max_view_x {
        return true;
    }
    if a.min_view_y >= b.max_view_y {
        return true;
    }
    if b.min_view_y >= a.max_view_y {
        return true;
    }
    if a.min_z >= b.max_z {
        return true;
    }
    if b.min_z > a.max_z {
        return false;
    }
    if !plane_witness(scene, a, b, false) {
        return true;
    }
    if !plane_witness(scene, b, a, true) {
        return true;
    }
    let (ax, ay) = screen_hull(scene, a);
    let (bx, by) = screen_hull(scene, b);
    !hulls_intersect(&ax, &ay, &bx, &by)
}

/// One-sided plane heuristic: may `a` lie in front of `b`? Used to decide
/// whether a reorder is worth attempting at all.
pub(crate) fn plausibly_in_front(scene: &Scene, a: &Polygon, b: &Polygon) -> bool {
    if !plane_witness(scene, a, b, false) {
        return true;
    }
    !plane_witness(scene, b, a, true)
}

/// Screen-space hull of a polygon. Two-vertex billboard edges become a
/// rectangle inflated 20 units in x, mirroring the sort-bias inflation of
/// their bounding boxes.
fn screen_hull(scene: &Scene, poly: &Polygon) -> (Hull, Hull) {
    let model = scene.polygon_model(poly.model);
    let verts = &model.faces[poly.face].vertices;
    let mut xs = Hull::new();
    let mut ys = Hull::new();
    if verts.len() == 2 {
        let v0 = verts[0] as usize;
        let v1 = verts[1] as usize;
        xs.extend_from_slice(&[
            model.view_x[v0] - 20,
            model.view_x[v1] - 20,
            model.view_x[v1] + 20,
            model.view_x[v0] + 20,
        ]);
        ys.extend_from_slice(&[
            model.view_y[v0],
            model.view_y[v1],
            model.view_y[v1],
            model.view_y[v0],
        ]);
    } else {
        for &vid in verts {
            xs.push(model.view_x[vid as usize]);
            ys.push(model.view_y[vid as usize]);
        }
    }
    (xs, ys)
}

/// x on the segment (x0,y0)-(x1,y1) at height `y`; horizontal segments
/// answer their first endpoint.
#[inline]
fn chord_x(x0: i32, y0: i32, x1: i32, y1: i32, y: i32) -> i32 {
    if y1 == y0 {
        x0
    } else {
        x0 + ((x1 - x0) * (y - y0)) / (y1 - y0)
    }
}

/// Do the horizontal chords `[a0,a1]` of one hull and `[b0,b1]` of the
/// other overlap at the current sweep height? `open` carries the side
/// orientation fixed at the first comparison.
fn chords_overlap(a0: i32, a1: i32, b0: i32, b1: i32, open: bool) -> bool {
    if (open && a0 <= b0) || a0 < b0 {
        if a0 > b1 {
            return true;
        }
        if a1 > b0 {
            return true;
        }
        if a1 > b1 {
            return true;
        }
        return !open;
    }
    if a0 < b1 {
        return true;
    }
    if a1 < b0 {
        return true;
    }
    if a1 < b1 {
        return true;
    }
    open
}

/// Degenerate form of [`chords_overlap`] where one hull contributes a
/// single point.
fn chord_overlaps(a0: i32, a1: i32, b: i32, open: bool) -> bool {
    if (open && a0 <= b) || a0 < b {
        if a1 > b {
            return true;
        }
        return !open;
    }
    if a1 < b {
        return true;
    }
    open
}

/// Convex overlap test on two screen hulls.
///
/// Both hulls are swept top to bottom with a pair of walking indices
/// each (`*0` walks one way around the ring, `*1` the other). At every
/// event height the horizontal chords of both hulls are rebuilt by linear
/// interpolation and compared. Three sweep modes exist — both hulls open
/// (0), first exhausted (1), second exhausted (2) — plus a single closing
/// comparison; the ladder preserves that state machine exactly.
#[allow(clippy::too_many_lines)]
fn hulls_intersect(ax: &[i32], ay: &[i32], bx: &[i32], by: &[i32]) -> bool {
    let an = ax.len();
    let bn = bx.len();

    let mut a0 = 0usize;
    let mut a_top = ay[0];
    let mut a_bot = ay[0];
    for (t, &y) in ay.iter().enumerate().skip(1) {
        if y < a_top {
            a_top = y;
            a0 = t;
        } else if y > a_bot {
            a_bot = y;
        }
    }
    let mut b0 = 0usize;
    let mut b_top = by[0];
    let mut b_bot = by[0];
    for (t, &y) in by.iter().enumerate().skip(1) {
        if y < b_top {
            b_top = y;
            b0 = t;
        } else if y > b_bot {
            b_bot = y;
        }
    }
    if b_top >= a_bot {
        return false;
    }
    if a_top >= b_bot {
        return false;
    }

    // chord builders: edge arriving at the walker from either direction
    let a_down = |i: usize, y: i32| chord_x(ax[(i + 1) % an], ay[(i + 1) % an], ax[i], ay[i], y);
    let a_up = |i: usize, y: i32| chord_x(ax[(i + an - 1) % an], ay[(i + an - 1) % an], ax[i], ay[i], y);
    let b_down = |i: usize, y: i32| chord_x(bx[(i + 1) % bn], by[(i + 1) % bn], bx[i], by[i], y);
    let b_up = |i: usize, y: i32| chord_x(bx[(i + bn - 1) % bn], by[(i + bn - 1) % bn], bx[i], by[i], y);

    let mut a1;
    let mut b1;
    let mut mode = 0u8;
    let open;

    if ay[a0] < by[b0] {
        a1 = a0;
        while ay[a1] < by[b0] {
            a1 = (a1 + 1) % an;
        }
        while ay[a0] < by[b0] {
            a0 = (a0 + an - 1) % an;
        }
        let ca0 = a_down(a0, by[b0]);
        let ca1 = a_up(a1, by[b0]);
        let cb = bx[b0];
        open = (ca0 < cb) | (ca1 < cb);
        if chord_overlaps(ca0, ca1, cb, open) {
            return true;
        }
        b1 = (b0 + 1) % bn;
        b0 = (b0 + bn - 1) % bn;
        if a0 == a1 {
            mode = 1;
        }
    } else {
        b1 = b0;
        while by[b1] < ay[a0] {
            b1 = (b1 + 1) % bn;
        }
        while by[b0] < ay[a0] {
            b0 = (b0 + bn - 1) % bn;
        }
        let ca = ax[a0];
        let cb0 = b_down(b0, ay[a0]);
        let cb1 = b_up(b1, ay[a0]);
        open = (ca < cb0) | (ca < cb1);
        if chord_overlaps(cb0, cb1, ca, !open) {
            return true;
        }
        a1 = (a0 + 1) % an;
        a0 = (a0 + an - 1) % an;
        if b0 == b1 {
            mode = 2;
        }
    }

    while mode == 0 {
        if ay[a0] < ay[a1] {
            if ay[a0] < by[b0] {
                if ay[a0] < by[b1] {
                    let y = ay[a0];
                    if chords_overlap(ax[a0], a_up(a1, y), b_down(b0, y), b_up(b1, y), open) {
                        return true;
                    }
                    a0 = (a0 + an - 1) % an;
                    if a0 == a1 {
                        mode = 1;
                    }
                } else {
                    let y = by[b1];
                    if chords_overlap(a_down(a0, y), a_up(a1, y), b_down(b0, y), bx[b1], open) {
                        return true;
                    }
                    b1 = (b1 + 1) % bn;
                    if b0 == b1 {
                        mode = 2;
                    }
                }
            } else if by[b0] < by[b1] {
                let y = by[b0];
                if chords_overlap(a_down(a0, y), a_up(a1, y), bx[b0], b_up(b1, y), open) {
                    return true;
                }
                b0 = (b0 + bn - 1) % bn;
                if b0 == b1 {
                    mode = 2;
                }
            } else {
                let y = by[b1];
                if chords_overlap(a_down(a0, y), a_up(a1, y), b_down(b0, y), bx[b1], open) {
                    return true;
                }
                b1 = (b1 + 1) % bn;
                if b0 == b1 {
                    mode = 2;
                }
            }
        } else if ay[a1] < by[b0] {
            if ay[a1] < by[b1] {
                let y = ay[a1];
                if chords_overlap(a_down(a0, y), ax[a1], b_down(b0, y), b_up(b1, y), open) {
                    return true;
                }
                a1 = (a1 + 1) % an;
                if a0 == a1 {
                    mode = 1;
                }
            } else {
                let y = by[b1];
                if chords_overlap(a_down(a0, y), a_up(a1, y), b_down(b0, y), bx[b1], open) {
                    return true;
                }
                b1 = (b1 + 1) % bn;
                if b0 == b1 {
                    mode = 2;
                }
            }
        } else if by[b0] < by[b1] {
            let y = by[b0];
            if chords_overlap(a_down(a0, y), a_up(a1, y), bx[b0], b_up(b1, y), open) {
                return true;
            }
            b0 = (b0 + bn - 1) % bn;
            if b0 == b1 {
                mode = 2;
            }
        } else {
            let y = by[b1];
            if chords_overlap(a_down(a0, y), a_up(a1, y), b_down(b0, y), bx[b1], open) {
                return true;
            }
            b1 = (b1 + 1) % bn;
            if b0 == b1 {
                mode = 2;
            }
        }
    }

    while mode == 1 {
        if ay[a0] < by[b0] {
            if ay[a0] < by[b1] {
                let y = ay[a0];
                return chord_overlaps(b_down(b0, y), b_up(b1, y), ax[a0], !open);
            }
            let y = by[b1];
            if chords_overlap(a_down(a0, y), a_up(a1, y), b_down(b0, y), bx[b1], open) {
                return true;
            }
            b1 = (b1 + 1) % bn;
            if b0 == b1 {
                mode = 0;
            }
        } else if by[b0] < by[b1] {
            let y = by[b0];
            if chords_overlap(a_down(a0, y), a_up(a1, y), bx[b0], b_up(b1, y), open) {
                return true;
            }
            b0 = (b0 + bn - 1) % bn;
            if b0 == b1 {
                mode = 0;
            }
        } else {
            let y = by[b1];
            if chords_overlap(a_down(a0, y), a_up(a1, y), b_down(b0, y), bx[b1], open) {
                return true;
            }
            b1 = (b1 + 1) % bn;
            if b0 == b1 {
                mode = 0;
            }
        }
    }

    while mode == 2 {
        if by[b0] < ay[a0] {
            if by[b0] < ay[a1] {
                let y = by[b0];
                return chord_overlaps(a_down(a0, y), a_up(a1, y), bx[b0], open);
            }
            let y = ay[a1];
            if chords_overlap(a_down(a0, y), ax[a1], b_down(b0, y), b_up(b1, y), open) {
                return true;
            }
            a1 = (a1 + 1) % an;
            if a0 == a1 {
                mode = 0;
            }
        } else if ay[a0] < ay[a1] {
            let y = ay[a0];
            if chords_overlap(ax[a0], a_up(a1, y), b_down(b0, y), b_up(b1, y), open) {
                return true;
            }
            a0 = (a0 + an - 1) % an;
            if a0 == a1 {
                mode = 0;
            }
        } else {
            let y = ay[a1];
            if chords_overlap(a_down(a0, y), ax[a1], b_down(b0, y), b_up(b1, y), open) {
                return true;
            }
            a1 = (a1 + 1) % an;
            if a0 == a1 {
                mode = 0;
            }
        }
    }

    if ay[a0] < by[b0] {
        let y = ay[a0];
        return chord_overlaps(b_down(b0, y), b_up(b1, y), ax[a0], !open);
    }
    let y = by[b0];
    chord_overlaps(a_down(a0, y), a_up(a1, y), bx[b0], open)
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{CLIP_NEAR, VIEW_DISTANCE};
    use crate::renderer::polygon::{init_polygon_3d, Polygon};
    use crate::world::camera::Camera;
    use crate::world::model::Model;
    use glam::IVec3;

    fn poly_with_depth(depth: i32) -> Polygon {
        let mut p = Polygon::new(0, 0);
        p.depth = depth;
        p
    }

    #[test]
    fn depth_sort_is_descending() {
        let mut polys: Vec<Polygon> =
            [5, 900, 42, 42, 7, 3500, 0, 1].map(poly_with_depth).into();
        depth_sort(&mut polys);
        for pair in polys.windows(2) {
            assert!(pair[0].depth >= pair[1].depth);
        }
    }

    fn scene_with_quads(quads: &[(i32, i32, i32, i32)]) -> (Scene, Vec<Polygon>) {
        // (cx, cy, z, half) per quad, one face per model
        let mut scene = Scene::new(Camera::default());
        let mut polys = Vec::new();
        for &(cx, cy, z, half) in quads {
            let mut m = Model::new();
            let a = m.vertex_at(IVec3::new(cx - half, cy - half, z));
            let b = m.vertex_at(IVec3::new(cx + half, cy - half, z));
            let c = m.vertex_at(IVec3::new(cx + half, cy + half, z));
            let d = m.vertex_at(IVec3::new(cx - half, cy + half, z));
            m.create_face(&[a, b, c, d], 1, 1);
            m.project(&Camera::default(), VIEW_DISTANCE, CLIP_NEAR);
            let idx = scene.add_model(m);
            let mut p = Polygon::new(idx, 0);
            init_polygon_3d(&mut p, &mut scene.models[idx]);
            p.depth = z;
            polys.push(p);
        }
        (scene, polys)
    }

    #[test]
    fn separate_when_depth_bands_disjoint() {
        let (scene, polys) = scene_with_quads(&[(0, 0, 500, 100), (0, 0, 1500, 100)]);
        // nearer polygon first argument: its whole z band is in front
        assert!(polygons_separate(&scene, &polys[1], &polys[0]));
    }

    #[test]
    fn separate_when_screens_disjoint() {
        let (scene, polys) = scene_with_quads(&[(-400, 0, 1000, 100), (400, 0, 1000, 100)]);
        assert!(polygons_separate(&scene, &polys[0], &polys[1]));
        assert!(polygons_separate(&scene, &polys[1], &polys[0]));
    }

    #[test]
    fn coplanar_overlap_is_not_separate() {
        let (scene, polys) = scene_with_quads(&[(0, 0, 1000, 100), (40, 30, 1000, 100)]);
        assert!(!polygons_separate(&scene, &polys[0], &polys[1]));
    }

    #[test]
    fn hull_test_catches_aabb_false_positives() {
        // two diagonal triangles whose boxes overlap in both axes but
        // whose hulls sit on opposite sides of a diagonal
        let ax = [0, 100, 0];
        let ay = [0, 0, 100];
        let bx = [100, 100, 10];
        let by = [10, 110, 110];
        assert!(!hulls_intersect(&ax, &ay, &bx, &by));
        // and a genuinely overlapping pair
        let cx = [0, 100, 100, 0];
        let cy = [0, 0, 100, 100];
        let dx = [50, 150, 150, 50];
        let dy = [50, 50, 150, 150];
        assert!(hulls_intersect(&cx, &cy, &dx, &dy));
    }

    #[test]
    fn hull_test_rejects_vertically_disjoint() {
        let ax = [0, 10, 10, 0];
        let ay = [0, 0, 10, 10];
        let bx = [0, 10, 10, 0];
        let by = [20, 20, 30, 30];
        assert!(!hulls_intersect(&ax, &ay, &bx, &by));
    }

    #[test]
    fn intersect_sort_terminates_on_overlap_cycle() {
        // three mutually overlapping coplanar quads, equal depth: nothing
        // is provably separate, every pair trips the resolver once
        let (scene, mut polys) =
            scene_with_quads(&[(0, 0, 1000, 120), (60, 40, 1000, 120), (-50, 60, 1000, 120)]);
        depth_sort(&mut polys);
        intersect_sort(&mut polys, &scene, 100);
        assert_eq!(polys.len(), 3);
        // every polygon still present exactly once
        let mut seen: Vec<i32> = polys.iter().map(|p| p.index).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn intersect_sort_orders_front_behind_back() {
        // far quad listed after near quad: resolve must not reorder a
        // provably separate pair
        let (scene, mut polys) = scene_with_quads(&[(0, 0, 2000, 150), (0, 0, 800, 150)]);
        depth_sort(&mut polys);
        let far_first = polys[0].depth;
        intersect_sort(&mut polys, &scene, 100);
        assert_eq!(polys[0].depth, far_first);
    }
}
