//! Integer fixed-point camera.
//!
//! Angles are binary: a full turn is [`ANGLE_STEPS`] units, trig comes from
//! a shared 16.15 fixed-point table. The y axis points *down*, matching
//! screen rows, so "up" in world space is negative y.

use glam::IVec3;
use once_cell::sync::Lazy;

/// Units in a full turn.
pub const ANGLE_STEPS: i32 = 2048;

const ANGLE_MASK: i32 = ANGLE_STEPS - 1;

/// sin(angle) << 15 for every binary angle.
static SINE: Lazy<[i32; ANGLE_STEPS as usize]> = Lazy::new(|| {
    let mut table = [0i32; ANGLE_STEPS as usize];
    for (i, entry) in table.iter_mut().enumerate() {
        let rad = i as f64 * std::f64::consts::TAU / ANGLE_STEPS as f64;
        *entry = (rad.sin() * 32768.0).round() as i32;
    }
    table
});

#[inline]
fn sin(angle: i32) -> i32 {
    SINE[(angle & ANGLE_MASK) as usize]
}

#[inline]
fn cos(angle: i32) -> i32 {
    SINE[((angle + ANGLE_STEPS / 4) & ANGLE_MASK) as usize]
}

/// Frustum half-extents for one frame, recorded by
/// [`Camera::prepare_for_rendering`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Frustum {
    pub clip_x: i32,
    pub clip_y: i32,
    pub clip_far: i32,
    /// `clip_x` widened to the far plane; bound for off-axis view coords.
    pub clip_x_wide: i32,
    pub clip_y_wide: i32,
}

/// View point and orientation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Camera {
    pub pos: IVec3,
    /// Heading about the (vertical) y axis, binary angle.
    pub yaw: i32,
    /// Tilt about the x axis, binary angle.
    pub pitch: i32,
    /// Tilt about the view axis, binary angle.
    pub roll: i32,
    frustum: Frustum,
}

impl Camera {
    pub fn new(pos: IVec3, yaw: i32, pitch: i32, roll: i32) -> Self {
        Self {
            pos,
            yaw,
            pitch,
            roll,
            frustum: Frustum::default(),
        }
    }

    /// Record the frame's frustum extents. Called once per render pass
    /// before any model is projected.
    pub fn prepare_for_rendering(
        &mut self,
        clip_x: i32,
        clip_y: i32,
        clip_far: i32,
        clip_x_wide: i32,
        clip_y_wide: i32,
    ) {
        self.frustum = Frustum {
            clip_x,
            clip_y,
            clip_far,
            clip_x_wide,
            clip_y_wide,
        };
    }

    pub fn frustum(&self) -> Frustum {
        self.frustum
    }

    /// Transform a world-space point into camera space: translate by `-pos`,
    /// then rotate yaw, pitch, roll. z grows into the screen.
    #[inline]
    pub fn to_view(&self, p: IVec3) -> IVec3 {
        let x = p.x - self.pos.x;
        let y = p.y - self.pos.y;
        let z = p.z - self.pos.z;

        let (sy, cy) = (sin(self.yaw), cos(self.yaw));
        let x1 = (x * cy + z * sy) >> 15;
        let z1 = (z * cy - x * sy) >> 15;

        let (sp, cp) = (sin(self.pitch), cos(self.pitch));
        let y1 = (y * cp - z1 * sp) >> 15;
        let z2 = (z1 * cp + y * sp) >> 15;

        if self.roll == 0 {
            return IVec3::new(x1, y1, z2);
        }
        let (sr, cr) = (sin(self.roll), cos(self.roll));
        let x2 = (x1 * cr + y1 * sr) >> 15;
        let y2 = (y1 * cr - x1 * sr) >> 15;
        IVec3::new(x2, y2, z2)
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
