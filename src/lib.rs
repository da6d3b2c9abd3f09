pub mod emu;
mod nibble;

pub use emu::*;
pub use nibble::*;
