//! Span generation: turns a projected polygon into per-row spans.
//!
//! Rows and x positions work in 24.8 fixed point. Triangles and quads go
//! through an edge-walker fast path; larger fans fall back to a general
//! min/max accumulation over all edges. Row `base_y` is the optical axis;
//! the buffer covers `[0, base_y + clip_y)` and the rasterizer is handed
//! the clipped `[min_y, max_y)` window.
//!
//! This is also where mouse picking happens: once the spans exist, one
//! compare against the pointer row is enough.

use crate::defs::{COLOUR_TRANSPARENT, ModelFlags};
use crate::renderer::SceneRenderer;
use crate::world::model::Model;

/// One row's span: x extent and shade at both ends, 24.8 fixed point.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Scanline {
    pub start_x: i32,
    pub end_x: i32,
    pub start_s: i32,
    pub end_s: i32,
}

/// Row value marking a span no edge has touched yet.
const SPAN_OPEN_LO: i32 = 0xa0000;
const SPAN_OPEN_HI: i32 = 0xfff60000u32 as i32;

/// y range of an edge that never becomes active.
const EDGE_IDLE_START: i32 = COLOUR_TRANSPARENT;
const EDGE_IDLE_END: i32 = 0xff439eb2u32 as i32;

/// One screen edge, stepped a row at a time.
#[derive(Clone, Copy)]
struct EdgeWalk {
    x: i32,
    dx: i32,
    s: i32,
    ds: i32,
    y0: i32,
    y1: i32,
}

impl EdgeWalk {
    /// Edge between two screen vertices, clipped to `[0, y_cap]`.
    /// Horizontal edges come out idle.
    fn between(x0: i32, y0: i32, s0: i32, x1: i32, y1: i32, s1: i32, y_cap: i32) -> Self {
        if y0 == y1 {
            return Self {
                x: 0,
                dx: 0,
                s: 0,
                ds: 0,
                y0: EDGE_IDLE_START,
                y1: EDGE_IDLE_END,
            };
        }
        let dx = ((x1 - x0) << 8) / (y1 - y0);
        let ds = ((s1 - s0) << 8) / (y1 - y0);
        let (mut x, mut s, mut ya, yb) = if y0 < y1 {
            (x0 << 8, s0 << 8, y0, y1)
        } else {
            (x1 << 8, s1 << 8, y1, y0)
        };
        if ya < 0 {
            x -= dx * ya;
            s -= ds * ya;
            ya = 0;
        }
        Self {
            x,
            dx,
            s,
            ds,
            y0: ya,
            y1: yb.min(y_cap),
        }
    }

    #[inline]
    fn covers(&self, row: i32) -> bool {
        row >= self.y0 && row < self.y1
    }

    #[inline]
    fn step(&mut self) {
        self.x += self.dx;
        self.s += self.ds;
    }
}

impl SceneRenderer {
    /// Populate the scanline buffer for the polygon currently staged in
    /// the `plane_*` scratch arrays, then feed the mouse picker.
    pub(crate) fn generate_scanlines(
        &mut self,
        plane: usize,
        model: &Model,
        model_idx: usize,
        face_id: usize,
    ) {
        let y_cap = self.base_y + self.clip_y - 1;
        match plane {
            3 => {
                let (y0, y1, y2) = (
                    self.plane_y[0] + self.base_y,
                    self.plane_y[1] + self.base_y,
                    self.plane_y[2] + self.base_y,
                );
                let (x0, x1, x2) = (self.plane_x[0], self.plane_x[1], self.plane_x[2]);
                let (s0, s1, s2) = (
                    self.vertex_shade[0],
                    self.vertex_shade[1],
                    self.vertex_shade[2],
                );
                let mut edges = [
                    EdgeWalk::between(x0, y0, s0, x2, y2, s2, y_cap),
                    EdgeWalk::between(x0, y0, s0, x1, y1, s1, y_cap),
                    EdgeWalk::between(x1, y1, s1, x2, y2, s2, y_cap),
                ];
                self.walk_edges(&mut edges);
            }
            4 => {
                let (y0, y1, y2, y3) = (
                    self.plane_y[0] + self.base_y,
                    self.plane_y[1] + self.base_y,
                    self.plane_y[2] + self.base_y,
                    self.plane_y[3] + self.base_y,
                );
                let (x0, x1, x2, x3) = (
                    self.plane_x[0],
                    self.plane_x[1],
                    self.plane_x[2],
                    self.plane_x[3],
                );
                let (s0, s1, s2, s3) = (
                    self.vertex_shade[0],
                    self.vertex_shade[1],
                    self.vertex_shade[2],
                    self.vertex_shade[3],
                );
                let mut edges = [
                    EdgeWalk::between(x0, y0, s0, x3, y3, s3, y_cap),
                    EdgeWalk::between(x0, y0, s0, x1, y1, s1, y_cap),
                    EdgeWalk::between(x1, y1, s1, x2, y2, s2, y_cap),
                    EdgeWalk::between(x2, y2, s2, x3, y3, s3, y_cap),
                ];
                self.walk_edges(&mut edges);
            }
            _ => {
                if !self.accumulate_fan(plane) {
                    return;
                }
            }
        }

        let mx = self.picker.mouse_x();
        let my = self.picker.mouse_y();
        if my >= self.min_y && my < self.max_y {
            let sl = &self.scanlines[my as usize];
            if mx >= sl.start_x >> 8
                && mx <= sl.end_x >> 8
                && sl.start_x <= sl.end_x
                && !model.flags.contains(ModelFlags::UNPICKABLE)
            {
                self.picker.add(model_idx, face_id);
            }
        }
    }

    /// Fast path: `edges[0]` seeds each row's span, the rest widen it.
    fn walk_edges(&mut self, edges: &mut [EdgeWalk]) {
        let (seed, rest) = edges.split_first_mut().expect("at least one edge");

        let mut min_y = seed.y0;
        let mut max_y = seed.y1;
        for e in rest.iter() {
            min_y = min_y.min(e.y0);
            max_y = max_y.max(e.y1);
        }
        self.min_y = min_y;
        self.max_y = max_y;

        let mut row = min_y;
        while row < max_y {
            let (mut lo, mut hi, mut s_lo, mut s_hi);
            if seed.covers(row) {
                lo = seed.x;
                hi = seed.x;
                s_lo = seed.s;
                s_hi = seed.s;
                seed.step();
            } else {
                lo = SPAN_OPEN_LO;
                hi = SPAN_OPEN_HI;
                s_lo = 0;
                s_hi = 0;
            }
            for e in rest.iter_mut() {
                if e.covers(row) {
                    if e.x < lo {
                        lo = e.x;
                        s_lo = e.s;
                    }
                    if e.x > hi {
                        hi = e.x;
                        s_hi = e.s;
                    }
                    e.step();
                }
            }
            let sl = &mut self.scanlines[row as usize];
            sl.start_x = lo;
            sl.end_x = hi;
            sl.start_s = s_lo;
            sl.end_s = s_hi;
            row += 1;
        }

        if self.min_y < self.base_y - self.clip_y {
            self.min_y = self.base_y - self.clip_y;
        }
    }

    /// General path for fans of five or more vertices: open every touched
    /// row, then min/max every edge into it. Returns false when the fan
    /// collapses to nothing after vertical clipping.
    fn accumulate_fan(&mut self, plane: usize) -> bool {
        self.plane_y[0] += self.base_y;
        let mut min_y = self.plane_y[0];
        let mut max_y = min_y;
        for k in 1..plane {
            self.plane_y[k] += self.base_y;
            let y = self.plane_y[k];
            if y < min_y {
                min_y = y;
            } else if y > max_y {
                max_y = y;
            }
        }
        if min_y < self.base_y - self.clip_y {
            min_y = self.base_y - self.clip_y;
        }
        if max_y >= self.base_y + self.clip_y {
            max_y = self.base_y + self.clip_y - 1;
        }
        self.min_y = min_y;
        self.max_y = max_y;
        if min_y >= max_y {
            return false;
        }
        for row in min_y..max_y {
            let sl = &mut self.scanlines[row as usize];
            sl.start_x = SPAN_OPEN_LO;
            sl.end_x = SPAN_OPEN_HI;
        }

        let last = plane - 1;

        // closing edge writes both ends of each row it crosses
        let y_a = self.plane_y[0];
        let y_b = self.plane_y[last];
        if y_a != y_b {
            let (from, to, mut ya, mut yb) = if y_a < y_b {
                (0, last, y_a, y_b)
            } else {
                (last, 0, y_b, y_a)
            };
            let mut x = self.plane_x[from] << 8;
            let dx = ((self.plane_x[to] - self.plane_x[from]) << 8) / (yb - ya);
            let mut s = self.vertex_shade[from] << 8;
            let ds = ((self.vertex_shade[to] - self.vertex_shade[from]) << 8) / (yb - ya);
            if ya < 0 {
                x -= dx * ya;
                s -= ds * ya;
                ya = 0;
            }
            if yb > max_y {
                yb = max_y;
            }
            for row in ya..=yb {
                let sl = &mut self.scanlines[row as usize];
                sl.start_x = x;
                sl.end_x = x;
                sl.start_s = s;
                sl.end_s = s;
                x += dx;
                s += ds;
            }
        }

        // chain edges widen the rows
        for k in 0..last {
            let k2 = k + 1;
            let y_a = self.plane_y[k];
            let y_b = self.plane_y[k2];
            if y_a == y_b {
                continue;
            }
            let (from, to, mut ya, mut yb) = if y_a < y_b {
                (k, k2, y_a, y_b)
            } else {
                (k2, k, y_b, y_a)
            };
            let mut x = self.plane_x[from] << 8;
            let dx = ((self.plane_x[to] - self.plane_x[from]) << 8) / (yb - ya);
            let mut s = self.vertex_shade[from] << 8;
            let ds = ((self.vertex_shade[to] - self.vertex_shade[from]) << 8) / (yb - ya);
            if ya < 0 {
                x -= dx * ya;
                s -= ds * ya;
                ya = 0;
            }
            if yb > max_y {
                yb = max_y;
            }
            for row in ya..=yb {
                let sl = &mut self.scanlines[row as usize];
                if x < sl.start_x {
                    sl.start_x = x;
                    sl.start_s = s;
                }
                if x > sl.end_x {
                    sl.end_x = x;
                    sl.end_s = s;
                }
                x += dx;
                s += ds;
            }
        }
        true
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use crate::renderer::SceneRenderer;
    use crate::world::model::Model;

    fn renderer() -> SceneRenderer {
        SceneRenderer::new(512, 384)
    }

    fn stage_triangle(r: &mut SceneRenderer, xs: [i32; 3], ys: [i32; 3], shades: [i32; 3]) {
        for i in 0..3 {
            r.plane_x[i] = xs[i];
            r.plane_y[i] = ys[i];
            r.vertex_shade[i] = shades[i];
        }
    }

    #[test]
    fn triangle_rows_stay_inside_clip_band() {
        let mut r = renderer();
        let model = Model::new();
        // taller than the clip band on both sides
        stage_triangle(&mut r, [0, 120, -120], [-4000, 4000, 4000], [0, 0, 0]);
        r.generate_scanlines(3, &model, 0, 0);
        assert!(r.min_y >= r.base_y - r.clip_y);
        assert!(r.max_y <= r.base_y + r.clip_y - 1);
        assert!(r.max_y > r.min_y);
    }

    #[test]
    fn triangle_spans_widen_toward_base() {
        let mut r = renderer();
        let model = Model::new();
        stage_triangle(&mut r, [0, 100, -100], [-50, 50, 50], [0, 0, 0]);
        r.generate_scanlines(3, &model, 0, 0);
        let near_apex = r.scanlines[(r.base_y - 45) as usize];
        let near_base = r.scanlines[(r.base_y + 45) as usize];
        let w_apex = (near_apex.end_x >> 8) - (near_apex.start_x >> 8);
        let w_base = (near_base.end_x >> 8) - (near_base.start_x >> 8);
        assert!(w_base > w_apex);
        assert!(w_apex >= 0);
    }

    #[test]
    fn degenerate_flat_triangle_emits_nothing() {
        let mut r = renderer();
        let model = Model::new();
        stage_triangle(&mut r, [0, 50, 100], [10, 10, 10], [0, 0, 0]);
        r.generate_scanlines(3, &model, 0, 0);
        assert!(r.max_y <= r.min_y);
    }

    #[test]
    fn hexagon_uses_general_path() {
        let mut r = renderer();
        let model = Model::new();
        let xs = [0, 40, 40, 0, -40, -40];
        let ys = [-50, -25, 25, 50, 25, -25];
        for i in 0..6 {
            r.plane_x[i] = xs[i];
            r.plane_y[i] = ys[i];
            r.vertex_shade[i] = 10;
        }
        r.generate_scanlines(6, &model, 0, 0);
        assert!(r.max_y > r.min_y);
        let mid = r.scanlines[r.base_y as usize];
        assert_eq!(mid.start_x >> 8, -40);
        assert_eq!(mid.end_x >> 8, 40);
    }
}
