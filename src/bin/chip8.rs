use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap_num::maybe_hex;
use log::info;

use chip8_vm::{
    Chip8, Chip8Runner, Chip8RunnerResult, DEFAULT_CPU_HZ, DISPLAY_X, DISPLAY_Y, Display, Quirks,
    TIMER_HZ, u4,
};

/// Headless CHIP-8 interpreter.
///
/// Runs a ROM for a fixed number of 60Hz frames, then prints the display to stdout.
/// Set RUST_LOG=info to see sound and exit events, RUST_LOG=trace for every instruction.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    #[arg(long)]
    rom: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = DEFAULT_CPU_HZ)]
    cpu_hz: f32,

    /// Number of 60Hz frames to run
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Seed for the random number generator used by Cxnn
    #[arg(long)]
    seed: Option<u64>,

    /// Key (0x0-0xF) held for the whole run, re-pressed whenever the program waits for a key
    #[arg(long = "hold-key", value_parser = parse_key)]
    hold_keys: Vec<u4>,

    #[command(flatten)]
    quirks: QuirkArgs,
}

#[derive(clap::Args, Debug)]
struct QuirkArgs {
    /// Start from the COSMAC VIP quirk preset
    #[arg(long)]
    cosmac_vip: bool,

    /// Fx1E sets VF when I overflows past 0xFFF
    #[arg(long)]
    index_overflow_sets_vf: bool,

    /// Sprites wrap around screen edges instead of clipping
    #[arg(long)]
    wrap_sprites: bool,

    /// 8xy6/8xyE shift Vy into Vx
    #[arg(long)]
    shift_uses_vy: bool,

    /// 8xy1/8xy2/8xy3 reset VF
    #[arg(long)]
    logic_resets_vf: bool,

    /// Fx55/Fx65 increment I
    #[arg(long)]
    load_store_increments_index: bool,

    /// Bxnn jumps to xnn + Vx
    #[arg(long)]
    jump_with_offset_uses_vx: bool,
}

impl QuirkArgs {
    fn to_quirks(&self) -> Quirks {
        let base = if self.cosmac_vip {
            Quirks::cosmac_vip()
        } else {
            Quirks::default()
        };

        Quirks {
            index_overflow_sets_vf: base.index_overflow_sets_vf || self.index_overflow_sets_vf,
            wrap_sprites: base.wrap_sprites || self.wrap_sprites,
            shift_uses_vy: base.shift_uses_vy || self.shift_uses_vy,
            logic_resets_vf: base.logic_resets_vf || self.logic_resets_vf,
            load_store_increments_index: base.load_store_increments_index
                || self.load_store_increments_index,
            jump_with_offset_uses_vx: base.jump_with_offset_uses_vx
                || self.jump_with_offset_uses_vx,
        }
    }
}

fn parse_key(s: &str) -> Result<u4, String> {
    let value = maybe_hex::<u8>(s)?;
    u4::try_from(value).map_err(|e| e.to_string())
}

fn render_display(display: &Display<bool>) -> String {
    let mut out = String::with_capacity((DISPLAY_X + 1) * DISPLAY_Y);
    for row in display {
        out.extend(row.iter().map(|&pixel| if pixel { '█' } else { ' ' }));
        out.push('\n');
    }
    out
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    anyhow::ensure!(
        args.cpu_hz.is_finite() && args.cpu_hz > 0.0,
        "--cpu-hz must be a finite positive rate, got {}",
        args.cpu_hz
    );

    let rom = std::fs::read(&args.rom)
        .with_context(|| format!("Failed to read ROM file {}", args.rom.display()))?;

    let quirks = args.quirks.to_quirks();
    let mut chip8 = match args.seed {
        Some(seed) => Chip8::with_seed(quirks, seed),
        None => Chip8::new(quirks),
    };
    chip8
        .reset(&rom)
        .context("Failed to load ROM into CHIP-8 memory")?;
    info!("Running {} with {quirks:?}", args.rom.display());

    let mut runner = Chip8Runner::with_cpu_hz(chip8, args.cpu_hz);
    for &key in &args.hold_keys {
        info!("Holding key {key:X}");
        runner.set_key(key, true);
    }

    let frame_dt = 1.0 / TIMER_HZ;
    let mut beeping = false;
    for frame in 0..args.frames {
        if runner.chip8_ref().awaiting_key().is_some() {
            for &key in &args.hold_keys {
                runner.set_key(key, false);
                runner.set_key(key, true);
            }
        }

        let result = runner
            .update(frame_dt)
            .with_context(|| format!("CHIP-8 execution error in frame {frame}"))?;

        if runner.should_beep() != beeping {
            beeping = !beeping;
            info!("Sound {} at frame {frame}", if beeping { "on" } else { "off" });
        }

        if result == Chip8RunnerResult::Halted {
            info!("Program exited at frame {frame}");
            break;
        }
    }

    print!("{}", render_display(runner.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let argv = ["chip8", "--rom", "game.ch8"].iter().chain(extra).copied();
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parses_keys_as_decimal_or_hex() {
        assert_eq!(parse_key("0xA"), Ok(u4::new(0xA)));
        assert_eq!(parse_key("10"), Ok(u4::new(0xA)));
        assert_eq!(parse_key("0"), Ok(u4::new(0)));
    }

    #[test]
    fn rejects_keys_above_f() {
        assert!(parse_key("0x10").is_err());
        assert!(parse_key("16").is_err());
        assert!(parse_key("key").is_err());
    }

    #[test]
    fn collects_repeated_hold_keys() {
        let args = parse(&["--hold-key", "0x5", "--hold-key", "12"]);
        assert_eq!(args.hold_keys, vec![u4::new(5), u4::new(0xC)]);
    }

    #[test]
    fn quirks_default_to_off() {
        assert_eq!(parse(&[]).quirks.to_quirks(), Quirks::default());
    }

    #[test]
    fn cosmac_preset_merges_with_individual_flags() {
        let quirks = parse(&["--cosmac-vip", "--wrap-sprites"]).quirks.to_quirks();
        assert!(quirks.shift_uses_vy);
        assert!(quirks.wrap_sprites);
        assert_eq!(
            quirks,
            Quirks {
                wrap_sprites: true,
                ..Quirks::cosmac_vip()
            }
        );
    }

    #[test]
    fn individual_flags_apply_without_preset() {
        let quirks = parse(&["--jump-with-offset-uses-vx"]).quirks.to_quirks();
        assert!(quirks.jump_with_offset_uses_vx);
        assert!(!quirks.shift_uses_vy);
    }
}
