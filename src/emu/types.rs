/// Outcome of a single `Chip8::step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chip8Result {
    /// Continue executing instructions in the current frame.
    Continue,
    /// Wait for the next frame before continuing
    /// (after a draw instruction, or while suspended on a key wait).
    WaitForNextFrame,
    /// The program executed the exit instruction; no further instructions will run.
    Halted,
}

/// Error types that can occur during CHIP-8 emulation.
///
/// All of them are fatal to the current run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    InvalidRom { size: usize, max_size: usize },

    #[error("Unknown opcode {opcode:#06X} at address {pc:#05X}")]
    UnknownOpcode { opcode: u16, pc: u16 },

    #[error("Stack overflow: subroutine call at {pc:#05X} exceeds {depth} nested calls")]
    StackOverflow { pc: u16, depth: usize },

    #[error("Stack underflow: return at {pc:#05X} with empty call stack")]
    StackUnderflow { pc: u16 },
}

pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;
/// A type alias for the CHIP-8 display buffer representation, indexed `[y][x]`.
pub type Display<T> = [[T; DISPLAY_X]; DISPLAY_Y];
