//! Sprite blit sources.
//!
//! Colour 0 is transparent everywhere. A sprite may be *trimmed*: stored
//! smaller than its logical canvas with a draw offset, which the scaled
//! blit honours when stretching.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpriteError {
    #[error("sprite pixel count {got} does not match {w}x{h}")]
    BadSize { w: usize, h: usize, got: usize },
}

#[derive(Clone, Debug)]
pub struct Sprite {
    pub w: i32,
    pub h: i32,
    pub pixels: Vec<u32>,
    /// Trim offset inside the logical canvas.
    pub offset_x: i32,
    pub offset_y: i32,
    /// Logical canvas the offsets are relative to.
    pub full_w: i32,
    pub full_h: i32,
}

impl Sprite {
    /// Untrimmed sprite: canvas equals the stored pixels.
    pub fn new(w: usize, h: usize, pixels: Vec<u32>) -> Result<Self, SpriteError> {
        if pixels.len() != w * h {
            return Err(SpriteError::BadSize {
                w,
                h,
                got: pixels.len(),
            });
        }
        Ok(Self {
            w: w as i32,
            h: h as i32,
            pixels,
            offset_x: 0,
            offset_y: 0,
            full_w: w as i32,
            full_h: h as i32,
        })
    }

    /// Trimmed sprite: `pixels` covers `w`x`h` placed at
    /// (`offset_x`, `offset_y`) inside a `full_w`x`full_h` canvas.
    pub fn trimmed(
        w: usize,
        h: usize,
        pixels: Vec<u32>,
        offset_x: i32,
        offset_y: i32,
        full_w: i32,
        full_h: i32,
    ) -> Result<Self, SpriteError> {
        let mut s = Self::new(w, h, pixels)?;
        s.offset_x = offset_x;
        s.offset_y = offset_y;
        s.full_w = full_w;
        s.full_h = full_h;
        Ok(s)
    }

    #[inline]
    pub fn has_draw_offset(&self) -> bool {
        self.offset_x != 0 || self.offset_y != 0 || self.full_w != self.w || self.full_h != self.h
    }
}

/// Id-indexed sprite store.
#[derive(Default)]
pub struct SpriteBank {
    data: Vec<Sprite>,
}

impl SpriteBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sprite: Sprite) -> usize {
        self.data.push(sprite);
        self.data.len() - 1
    }

    /// Missing ids resolve to `None`; callers skip the blit.
    pub fn get(&self, id: usize) -> Option<&Sprite> {
        self.data.get(id)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_rejected() {
        assert!(Sprite::new(4, 4, vec![0; 15]).is_err());
    }

    #[test]
    fn trim_detection() {
        let plain = Sprite::new(4, 4, vec![0; 16]).unwrap();
        assert!(!plain.has_draw_offset());
        let trimmed = Sprite::trimmed(4, 4, vec![0; 16], 2, 0, 8, 8).unwrap();
        assert!(trimmed.has_draw_offset());
    }
}
