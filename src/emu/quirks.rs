/// Behavioural variations between CHIP-8 interpreters that ROMs may depend on.
///
/// `Default` matches modern interpreters; see [`Quirks::cosmac_vip`] for the original hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quirks {
    /// Fx1E sets VF to 1 when I + Vx overflows past 0x0FFF, and to 0 otherwise.
    pub index_overflow_sets_vf: bool,
    /// Dxyn wraps pixels past the right/bottom edge around to the opposite edge
    /// instead of clipping them.
    pub wrap_sprites: bool,
    /// 8xy6 / 8xyE shift Vy and store the result in Vx, instead of shifting Vx in place.
    pub shift_uses_vy: bool,
    /// 8xy1 / 8xy2 / 8xy3 reset VF to 0.
    pub logic_resets_vf: bool,
    /// Fx55 / Fx65 leave I pointing past the last register transferred.
    pub load_store_increments_index: bool,
    /// Bxnn jumps to xnn + Vx instead of nnn + V0 (CHIP-48 / SUPER-CHIP).
    pub jump_with_offset_uses_vx: bool,
}

impl Quirks {
    /// Behaviour of the COSMAC VIP interpreter.
    pub fn cosmac_vip() -> Self {
        Self {
            shift_uses_vy: true,
            logic_resets_vf: true,
            load_store_increments_index: true,
            ..Self::default()
        }
    }
}
