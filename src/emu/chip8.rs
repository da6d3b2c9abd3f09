use log::{debug, trace, warn};
use rand::{SeedableRng, rngs::StdRng};

use super::{
    Chip8Error, Chip8Result, DISPLAY_X, DISPLAY_Y, Display, FONT, FONT_END_ADDRESS,
    FONT_START_ADDRESS, Opcode, Quirks,
};
use crate::u4;

// Memory layout of the CHIP-8 machine
pub const ROM_START_ADDRESS: usize = 0x200;
pub const MEMORY_SIZE: usize = 4096;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - ROM_START_ADDRESS;
pub const STACK_SIZE: usize = 16;
/// Every memory access is masked to the 12-bit address space.
pub(crate) const ADDRESS_MASK: u16 = (MEMORY_SIZE - 1) as u16;

/// CHIP-8 virtual machine state
pub struct Chip8 {
    /// 4KB memory array
    pub(crate) memory: [u8; MEMORY_SIZE],
    /// Display buffer: 64x32 monochrome pixels
    pub(crate) display: Display<bool>,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Call stack for subroutine returns, at most `STACK_SIZE` deep
    pub(crate) stack: Vec<u16>,

    /// Delay timer: decrements at 60Hz until it reaches 0
    pub(crate) delay_timer: u8,
    /// Sound timer: decrements at 60Hz, beeps while non-zero
    pub(crate) sound_timer: u8,

    /// Keypad state: 16 keys mapped as booleans (true = pressed)
    pub(crate) keypad: [bool; 16],
    /// Register that receives the key while suspended on Fx0A
    pub(crate) awaiting_key: Option<u4>,
    /// First key pressed since the current Fx0A suspension began
    pub(crate) key_press_latch: Option<u4>,
    /// Set by 00FD
    pub(crate) halted: bool,

    pub(crate) quirks: Quirks,
    pub(crate) rng: StdRng,
}

impl Chip8 {
    /// Creates a VM whose random number generator is seeded from the OS.
    pub fn new(quirks: Quirks) -> Self {
        Self::with_rng(quirks, StdRng::from_os_rng())
    }

    /// Creates a VM with a deterministic random number generator.
    pub fn with_seed(quirks: Quirks, seed: u64) -> Self {
        Self::with_rng(quirks, StdRng::seed_from_u64(seed))
    }

    fn with_rng(quirks: Quirks, rng: StdRng) -> Self {
        Chip8 {
            memory: [0; MEMORY_SIZE],
            display: [[false; DISPLAY_X]; DISPLAY_Y],
            pc: ROM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: Vec::with_capacity(STACK_SIZE),
            delay_timer: 0,
            sound_timer: 0,
            keypad: [false; 16],
            awaiting_key: None,
            key_press_latch: None,
            halted: false,
            quirks,
            rng,
        }
    }

    /// Resets all machine state, installs the font set and loads `rom` at 0x200.
    ///
    /// An oversized ROM is rejected before anything is modified.
    pub fn reset(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::InvalidRom {
                size: rom.len(),
                max_size: MAX_ROM_SIZE,
            });
        }

        self.memory = [0; MEMORY_SIZE];
        self.display = [[false; DISPLAY_X]; DISPLAY_Y];
        self.i = 0;
        self.v = [0; 16];
        self.stack.clear();
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.keypad = [false; 16];
        self.awaiting_key = None;
        self.key_press_latch = None;
        self.halted = false;

        self.memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);
        self.memory[ROM_START_ADDRESS..ROM_START_ADDRESS + rom.len()].copy_from_slice(rom);

        // Set program counter to start of ROM
        self.pc = ROM_START_ADDRESS as u16;

        debug!("Loaded ROM of {} bytes", rom.len());
        Ok(())
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    ///
    /// On error the program counter is left on the faulting instruction.
    pub fn step(&mut self) -> Result<Chip8Result, Chip8Error> {
        if self.halted {
            return Ok(Chip8Result::Halted);
        }

        if let Some(x) = self.awaiting_key {
            return Ok(self.resume_wait_for_key(x));
        }

        let pc = self.pc;
        let raw = self.fetch();
        let result = match Opcode::decode(raw) {
            Some(opcode) => {
                trace!("{pc:#05X}: {raw:04X} {opcode:?}");
                self.execute(opcode)
            }
            None => Err(Chip8Error::UnknownOpcode { opcode: raw, pc }),
        };

        if let Err(e) = &result {
            warn!("{e}");
            self.pc = pc;
        }

        result
    }

    /// Updates the delay and sound timers. Should be called at 60Hz.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.sound_timer > 0
    }

    /// Set the state of a key on the keypad.
    ///
    /// A press while suspended on Fx0A is latched for the next `step`.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        let was_pressed = std::mem::replace(&mut self.keypad[key], pressed);

        if pressed
            && !was_pressed
            && self.awaiting_key.is_some()
            && self.key_press_latch.is_none()
        {
            self.key_press_latch = Some(key);
        }
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn get_display_pixel(&self, y: usize, x: usize) -> bool {
        self.display[y][x]
    }

    pub fn display(&self) -> &Display<bool> {
        &self.display
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn keypad(&self) -> &[bool; 16] {
        &self.keypad
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    /// The register that will receive the next key press, if suspended on Fx0A.
    pub fn awaiting_key(&self) -> Option<u4> {
        self.awaiting_key
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    /// Fetches the 16-bit big-endian opcode at PC.
    fn fetch(&self) -> u16 {
        let high = self.mem(self.pc);
        let low = self.mem(self.pc.wrapping_add(1));

        u16::from_be_bytes([high, low])
    }

    pub(crate) fn mem(&self, addr: u16) -> u8 {
        self.memory[(addr & ADDRESS_MASK) as usize]
    }

    pub(crate) fn mem_mut(&mut self, addr: u16) -> &mut u8 {
        &mut self.memory[(addr & ADDRESS_MASK) as usize]
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new(Quirks::default())
    }
}
