//! Mouse picking.
//!
//! The scanline generator calls in whenever a polygon's span covers the
//! pointer row/column, so entries accumulate in painter order: the last
//! entry at a given pixel is the frontmost pickable face.

/// Cap on picks collected per frame.
pub const MAX_PICKED: usize = 100;

pub struct MousePicker {
    base_x: i32,
    mouse_x: i32,
    mouse_y: i32,
    picked: Vec<(usize, usize)>,
}

impl MousePicker {
    pub(crate) fn new(base_x: i32) -> Self {
        Self {
            base_x,
            mouse_x: -1,
            mouse_y: -1,
            picked: Vec::with_capacity(MAX_PICKED),
        }
    }

    /// Point at a surface pixel. `x` is rebased onto the optical axis to
    /// match span coordinates; `y` is the surface row as-is.
    pub fn set_pointer(&mut self, x: i32, y: i32) {
        self.mouse_x = x - self.base_x;
        self.mouse_y = y;
    }

    #[inline]
    pub(crate) fn mouse_x(&self) -> i32 {
        self.mouse_x
    }

    #[inline]
    pub(crate) fn mouse_y(&self) -> i32 {
        self.mouse_y
    }

    pub(crate) fn begin_frame(&mut self) {
        self.picked.clear();
    }

    pub(crate) fn add(&mut self, model: usize, face: usize) {
        if self.picked.len() < MAX_PICKED {
            self.picked.push((model, face));
        }
    }

    /// (model index, face index) pairs hit this frame, back to front.
    pub fn picked(&self) -> &[(usize, usize)] {
        &self.picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_is_rebased_on_centre() {
        let mut p = MousePicker::new(256);
        p.set_pointer(256, 192);
        assert_eq!(p.mouse_x(), 0);
        assert_eq!(p.mouse_y(), 192);
    }

    #[test]
    fn saturates_at_cap() {
        let mut p = MousePicker::new(0);
        for i in 0..MAX_PICKED + 10 {
            p.add(0, i);
        }
        assert_eq!(p.picked().len(), MAX_PICKED);
        p.begin_frame();
        assert!(p.picked().is_empty());
    }
}
