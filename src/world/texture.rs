//! Texture storage for the span kernels.
//!
//! Kernels index a *baked* pixel array: four copies of the texture at
//! descending brightness, laid out bank after bank. Two bits of the shade
//! register select the bank and the remaining shade halves via an unsigned
//! shift, giving sixteen light levels without per-pixel multiplies.
//!
//! Two size classes exist and nothing in between: 64x64 ("small", masks
//! `0xfc0`/`>> 6`) and 128x128 ("large", masks `0x3f80`/`>> 7`).

use thiserror::Error;

/// Always-present fallback texture id (checkerboard).
pub const NO_TEXTURE: usize = 0;

/// Small textures are squares of this side.
pub const SMALL_SIDE: usize = 64;
/// Large textures are squares of this side.
pub const LARGE_SIDE: usize = 128;

/// Brightness of the four shade banks, 8.8 fixed point: 2^(-k/4).
const BANK_SCALE: [u32; 4] = [256, 215, 181, 152];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextureError {
    #[error("texture must be a {SMALL_SIDE} or {LARGE_SIDE} pixel square, got {0}x{1}")]
    BadSize(usize, usize),
    #[error("texture id {0} out of range")]
    BadId(usize),
}

/// One texture: source pixels plus the lazily baked shade banks.
#[derive(Clone, Debug)]
pub struct Texture {
    side: usize,
    transparent: bool,
    pixels: Vec<u32>,
    baked: Option<Vec<u32>>,
}

impl Texture {
    /// Wrap an RGB pixel square. `transparent` marks colour 0 as a cutout
    /// so the masked kernels skip it.
    pub fn new(side: usize, pixels: Vec<u32>, transparent: bool) -> Result<Self, TextureError> {
        if (side != SMALL_SIDE && side != LARGE_SIDE) || pixels.len() != side * side {
            return Err(TextureError::BadSize(side, pixels.len() / side.max(1)));
        }
        Ok(Self {
            side,
            transparent,
            pixels,
            baked: None,
        })
    }

    /// Flat one-colour texture.
    pub fn solid(side: usize, colour: u32) -> Result<Self, TextureError> {
        Self::new(side, vec![colour; side * side], false)
    }

    /// 64x64 checkerboard, the bank's id-0 fallback.
    pub fn checker() -> Self {
        const LIGHT: u32 = 0x00_60_60_60;
        const DARK: u32 = 0x00_30_30_30;
        let mut pixels = vec![0u32; SMALL_SIDE * SMALL_SIDE];
        for y in 0..SMALL_SIDE {
            for x in 0..SMALL_SIDE {
                pixels[y * SMALL_SIDE + x] = if (x ^ y) & 8 == 0 { LIGHT } else { DARK };
            }
        }
        Self::new(SMALL_SIDE, pixels, false).unwrap()
    }

    #[inline]
    pub fn is_large(&self) -> bool {
        self.side == LARGE_SIDE
    }

    #[inline]
    pub fn has_transparency(&self) -> bool {
        self.transparent
    }

    /// The baked bank array; only valid after [`TextureBank::prepare`].
    #[inline]
    pub fn baked(&self) -> &[u32] {
        self.baked
            .as_deref()
            .expect("texture sampled before prepare()")
    }

    fn bake(&mut self) {
        if self.baked.is_some() {
            return;
        }
        let per_bank = self.side * self.side;
        let mut out = vec![0u32; per_bank * BANK_SCALE.len()];
        for (bank, &scale) in BANK_SCALE.iter().enumerate() {
            let dst = &mut out[bank * per_bank..(bank + 1) * per_bank];
            for (d, &p) in dst.iter_mut().zip(&self.pixels) {
                let r = ((p >> 16 & 0xff) * scale) >> 8;
                let g = ((p >> 8 & 0xff) * scale) >> 8;
                let b = ((p & 0xff) * scale) >> 8;
                *d = r << 16 | g << 8 | b;
            }
        }
        self.baked = Some(out);
    }
}

/// Id-indexed texture store. Id 0 always exists and is the substitute for
/// any out-of-range request.
pub struct TextureBank {
    data: Vec<Texture>,
}

impl TextureBank {
    /// Bank seeded with the checkerboard fallback at id 0.
    pub fn with_checker() -> Self {
        Self {
            data: vec![Texture::checker()],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 1
    }

    pub fn insert(&mut self, tex: Texture) -> usize {
        self.data.push(tex);
        self.data.len() - 1
    }

    pub fn texture(&self, id: usize) -> Result<&Texture, TextureError> {
        self.data.get(id).ok_or(TextureError::BadId(id))
    }

    /// Fetch a texture for rasterization, baking its shade banks on first
    /// use. Out-of-range ids degrade to the fallback.
    pub fn prepare(&mut self, id: usize) -> &Texture {
        let id = if id < self.data.len() { id } else { NO_TEXTURE };
        let tex = &mut self.data[id];
        tex.bake();
        &self.data[id]
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
