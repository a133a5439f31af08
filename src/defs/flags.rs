use bitflags::bitflags;

bitflags! {
    /// Per-model behaviour flags consulted by the render pass.
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ModelFlags: u8 {
        /// Model participates in the frame at all.
        const VISIBLE             = 0x01;
        /// Never reported by the mouse picker.
        const UNPICKABLE          = 0x02;
        /// Gradient fills blend 50/50 with the destination.
        const TRANSPARENT         = 0x04;
        /// Texture fills blend 50/50 with the destination.
        const TEXTURE_TRANSLUCENT = 0x08;
    }
}
