use chip8_vm::{
    Chip8, Chip8Error, Chip8Result, DISPLAY_X, DISPLAY_Y, FONT, FONT_CHAR_SIZE, MAX_ROM_SIZE,
    Quirks, ROM_START_ADDRESS,
};
use proptest::prelude::*;

fn assemble(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

fn lit_pixels(chip8: &Chip8) -> usize {
    chip8.display().iter().flatten().filter(|&&p| p).count()
}

proptest! {
    #[test]
    fn first_step_executes_word_at_rom_start(
        x in 0u8..15,
        nn in any::<u8>(),
        tail in proptest::collection::vec(any::<u8>(), 0..=MAX_ROM_SIZE - 2),
    ) {
        let mut rom = vec![0x60 | x, nn];
        rom.extend(tail);

        let mut chip8 = Chip8::with_seed(Quirks::default(), 1);
        chip8.reset(&rom).unwrap();
        prop_assert_eq!(&chip8.memory()[ROM_START_ADDRESS..ROM_START_ADDRESS + rom.len()], &rom[..]);

        prop_assert_eq!(chip8.step().unwrap(), Chip8Result::Continue);
        prop_assert_eq!(chip8.registers()[x as usize], nn);
        prop_assert_eq!(chip8.pc(), 0x202);
    }

    #[test]
    fn oversized_rom_is_rejected_without_side_effects(extra in 1usize..1024) {
        let mut chip8 = Chip8::with_seed(Quirks::default(), 1);
        chip8.reset(&assemble(&[0x6A07, 0x1202])).unwrap();
        chip8.step().unwrap();
        let memory_before = *chip8.memory();

        let err = chip8.reset(&vec![0xFF; MAX_ROM_SIZE + extra]).unwrap_err();

        prop_assert_eq!(err, Chip8Error::InvalidRom { size: MAX_ROM_SIZE + extra, max_size: MAX_ROM_SIZE });
        prop_assert_eq!(chip8.memory(), &memory_before);
        prop_assert_eq!(chip8.pc(), 0x202);
        prop_assert_eq!(chip8.registers()[0xA], 0x07);
    }

    #[test]
    fn drawing_a_sprite_twice_restores_the_display(
        vx in any::<u8>(),
        vy in any::<u8>(),
        sprite in proptest::collection::vec(any::<u8>(), 1..=15),
        wrap_sprites in any::<bool>(),
    ) {
        let n = sprite.len() as u16;
        // Sprite data follows the five instructions at 0x20A
        let mut rom = assemble(&[0x6000 | vx as u16, 0x6100 | vy as u16, 0xA20A, 0xD010 | n, 0xD010 | n]);
        rom.extend(&sprite);

        let quirks = Quirks { wrap_sprites, ..Quirks::default() };
        let mut chip8 = Chip8::with_seed(quirks, 1);
        chip8.reset(&rom).unwrap();
        for _ in 0..3 {
            chip8.step().unwrap();
        }

        prop_assert_eq!(chip8.step().unwrap(), Chip8Result::WaitForNextFrame);
        prop_assert_eq!(chip8.registers()[0xF], 0);
        let lit = lit_pixels(&chip8);

        chip8.step().unwrap();
        prop_assert_eq!(lit_pixels(&chip8), 0);
        prop_assert_eq!(chip8.registers()[0xF], u8::from(lit > 0));
    }
}

#[test]
fn renders_font_glyphs() {
    // Draw digit 7 at (10, 4)
    let rom = assemble(&[0x6307, 0xF329, 0x610A, 0x6204, 0xD125]);
    let mut chip8 = Chip8::default();
    chip8.reset(&rom).unwrap();
    for _ in 0..5 {
        chip8.step().unwrap();
    }

    let glyph = &FONT[7 * FONT_CHAR_SIZE..8 * FONT_CHAR_SIZE];
    for (row, &bits) in glyph.iter().enumerate() {
        for col in 0..8 {
            let expected = bits & (0x80 >> col) != 0;
            assert_eq!(chip8.get_display_pixel(4 + row, 10 + col), expected);
        }
    }
    assert_eq!(lit_pixels(&chip8), glyph.iter().map(|b| b.count_ones() as usize).sum());
}

#[test]
fn counts_down_with_the_delay_timer() {
    // Set the delay timer to 3 and spin until it reaches zero, then exit.
    let rom = assemble(&[
        0x6003, // 200: LD V0, 3
        0xF015, // 202: LD DT, V0
        0xF107, // 204: LD V1, DT
        0x3100, // 206: SE V1, 0
        0x1204, // 208: JP 0x204
        0x00FD, // 20A: EXIT
    ]);
    let mut chip8 = Chip8::default();
    chip8.reset(&rom).unwrap();

    let mut ticks = 0;
    loop {
        match chip8.step().unwrap() {
            Chip8Result::Halted => break,
            _ => {
                if chip8.pc() == 0x204 && chip8.registers()[1] != 0 {
                    chip8.tick_timers();
                    ticks += 1;
                }
            }
        }
        assert!(ticks <= 3, "timer did not stop at zero");
    }

    assert_eq!(ticks, 3);
    assert_eq!(chip8.delay_timer(), 0);
}

#[test]
fn screen_is_blank_after_reset() {
    let mut chip8 = Chip8::default();
    chip8.reset(&[]).unwrap();
    assert_eq!(lit_pixels(&chip8), 0);
    assert_eq!(chip8.display().len(), DISPLAY_Y);
    assert_eq!(chip8.display()[0].len(), DISPLAY_X);
}
