use rand::Rng;

use super::chip8::{ADDRESS_MASK, STACK_SIZE};
use super::{
    Chip8, Chip8Error, Chip8Result, DISPLAY_X, DISPLAY_Y, Opcode, OpcodeALU, font_char_address,
};
use crate::u4;

impl Chip8 {
    pub(crate) fn execute(&mut self, opcode: Opcode) -> Result<Chip8Result, Chip8Error> {
        let instruction_pc = self.pc;
        self.pc = self.pc.wrapping_add(2);

        match opcode {
            Opcode::ClearDisplay => {
                self.display = [[false; DISPLAY_X]; DISPLAY_Y];
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn;
            }
            Opcode::JumpWithOffset { x, nnn } => {
                let offset = if self.quirks.jump_with_offset_uses_vx {
                    self.v[x]
                } else {
                    self.v[0]
                };
                self.pc = nnn.wrapping_add(offset.into());
            }
            Opcode::Call { nnn } => {
                if self.stack.len() >= STACK_SIZE {
                    return Err(Chip8Error::StackOverflow {
                        pc: instruction_pc,
                        depth: STACK_SIZE,
                    });
                }
                self.stack.push(self.pc);
                self.pc = nnn;
            }
            Opcode::Return => {
                self.pc = self
                    .stack
                    .pop()
                    .ok_or(Chip8Error::StackUnderflow { pc: instruction_pc })?;
            }
            Opcode::Exit => {
                self.halted = true;
                return Ok(Chip8Result::Halted);
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                self.skip_if(self.v[x] == nn);
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                self.skip_if(self.v[x] != nn);
            }
            Opcode::SkipRegEqualReg { x, y } => {
                self.skip_if(self.v[x] == self.v[y]);
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                self.skip_if(self.v[x] != self.v[y]);
            }
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Opcode::ALU { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = self.rng.random();
                self.v[x] = rand_byte & nn;
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn;
            }
            Opcode::AddIndexReg { x } => {
                let sum = self.i.wrapping_add(self.v[x].into());
                if self.quirks.index_overflow_sets_vf {
                    self.v[0xF] = u8::from(sum > ADDRESS_MASK);
                }
                self.i = sum;
            }
            Opcode::Draw { x, y, n } => {
                return Ok(self.execute_draw(x, y, n));
            }
            Opcode::SkipIfPressed { x } => {
                self.skip_if(self.keypad[u4::from_low_bits(self.v[x])]);
            }
            Opcode::SkipIfNotPressed { x } => {
                self.skip_if(!self.keypad[u4::from_low_bits(self.v[x])]);
            }
            Opcode::WaitForKey { x } => {
                return Ok(self.execute_wait_for_key(x));
            }
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer;
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer = self.v[x];
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer = self.v[x];
            }
            Opcode::FontChar { x } => {
                self.i = font_char_address(self.v[x]);
            }
            Opcode::BCD { x } => {
                let value = self.v[x];
                *self.mem_mut(self.i) = value / 100;
                *self.mem_mut(self.i.wrapping_add(1)) = (value / 10) % 10;
                *self.mem_mut(self.i.wrapping_add(2)) = value % 10;
            }
            Opcode::StoreRegs { x } => {
                for reg_index in 0..=u8::from(x) {
                    let addr = self.i.wrapping_add(reg_index.into());
                    *self.mem_mut(addr) = self.v[reg_index as usize];
                }
                self.advance_index_after_transfer(x);
            }
            Opcode::LoadRegs { x } => {
                for reg_index in 0..=u8::from(x) {
                    let addr = self.i.wrapping_add(reg_index.into());
                    self.v[reg_index as usize] = self.mem(addr);
                }
                self.advance_index_after_transfer(x);
            }
        };

        Ok(Chip8Result::Continue)
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    fn advance_index_after_transfer(&mut self, x: u4) {
        if self.quirks.load_store_increments_index {
            self.i = self.i.wrapping_add(u16::from(x) + 1);
        }
    }

    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeALU) {
        match op {
            OpcodeALU::Set => self.v[x] = self.v[y],
            OpcodeALU::Or => {
                self.v[x] |= self.v[y];
                self.reset_vf_after_logic();
            }
            OpcodeALU::And => {
                self.v[x] &= self.v[y];
                self.reset_vf_after_logic();
            }
            OpcodeALU::Xor => {
                self.v[x] ^= self.v[y];
                self.reset_vf_after_logic();
            }
            OpcodeALU::Add => {
                let (res, overflow) = self.v[x].overflowing_add(self.v[y]);
                self.v[x] = res;
                self.v[0xF] = u8::from(overflow);
            }
            OpcodeALU::Sub => {
                let (res, borrow) = self.v[x].overflowing_sub(self.v[y]);
                self.v[x] = res;
                self.v[0xF] = u8::from(!borrow); // 1 = no borrow
            }
            OpcodeALU::SubReverse => {
                let (res, borrow) = self.v[y].overflowing_sub(self.v[x]);
                self.v[x] = res;
                self.v[0xF] = u8::from(!borrow);
            }
            OpcodeALU::ShiftRight => {
                let source = self.shift_source(x, y);
                self.v[x] = source >> 1;
                self.v[0xF] = source & 1;
            }
            OpcodeALU::ShiftLeft => {
                let source = self.shift_source(x, y);
                self.v[x] = source << 1;
                self.v[0xF] = (source >> 7) & 1;
            }
        }
    }

    fn shift_source(&self, x: u4, y: u4) -> u8 {
        if self.quirks.shift_uses_vy {
            self.v[y]
        } else {
            self.v[x]
        }
    }

    fn reset_vf_after_logic(&mut self) {
        if self.quirks.logic_resets_vf {
            self.v[0xF] = 0;
        }
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4) -> Chip8Result {
        // The starting position always wraps, the sprite itself clips unless quirked
        let x_pos = self.v[x] as usize % DISPLAY_X;
        let y_pos = self.v[y] as usize % DISPLAY_Y;
        let wrap = self.quirks.wrap_sprites;

        let mut any_erased = false;
        for row in 0..usize::from(n) {
            let Some(py) = wrap_or_clip(y_pos + row, DISPLAY_Y, wrap) else {
                break;
            };
            let sprite_byte = self.mem(self.i.wrapping_add(row as u16));

            for col in 0..8 {
                let Some(px) = wrap_or_clip(x_pos + col, DISPLAY_X, wrap) else {
                    break;
                };

                // If current sprite bit is non-zero
                if (sprite_byte & (0x80 >> col)) != 0 {
                    let pixel = &mut self.display[py][px];

                    // Flip the pixel
                    *pixel ^= true;

                    if !*pixel {
                        any_erased = true;
                    }
                }
            }
        }

        self.v[0xF] = u8::from(any_erased);
        Chip8Result::WaitForNextFrame
    }

    fn execute_wait_for_key(&mut self, x: u4) -> Chip8Result {
        // Stay on this instruction until a key press arrives
        self.pc = self.pc.wrapping_sub(2);
        self.awaiting_key = Some(x);
        self.key_press_latch = None;
        Chip8Result::WaitForNextFrame
    }

    pub(crate) fn resume_wait_for_key(&mut self, x: u4) -> Chip8Result {
        match self.key_press_latch.take() {
            Some(key) => {
                self.v[x] = key.into();
                self.awaiting_key = None;
                self.pc = self.pc.wrapping_add(2);
                Chip8Result::Continue
            }
            None => Chip8Result::WaitForNextFrame,
        }
    }
}

fn wrap_or_clip(pos: usize, size: usize, wrap: bool) -> Option<usize> {
    if pos < size {
        Some(pos)
    } else if wrap {
        Some(pos % size)
    } else {
        None
    }
}
