//! Headless BBC Micro runner.
//!
//! Builds the machine from a JSON configuration or from ROM paths on the
//! command line, runs it until a cycle limit or a halt, and optionally
//! writes a snapshot. Set `RUST_LOG=info` for throughput reports.

use std::path::PathBuf;
use std::process;

use emu_bbc_micro::{BbcConfig, BbcMicro, MachineError, SidewaysRom};
use emu_core::ClockSpeed;

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    config_path: Option<PathBuf>,
    os_rom: Option<PathBuf>,
    sideways_roms: Vec<SidewaysRom>,
    speed: Option<ClockSpeed>,
    cycles: Option<u64>,
    snapshot_path: Option<PathBuf>,
}

fn usage() {
    eprintln!("Usage: emu-bbc-micro (--config <file> | --os <rom>) [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <file>       Machine configuration (JSON)");
    eprintln!("  --os <rom>            16K MOS image");
    eprintln!("  --rom <slot>:<file>   Sideways ROM in slot 0-15 (repeatable)");
    eprintln!("  --speed <mhz>         0.25, 0.5, 1, 2, 4 or max [default: 2]");
    eprintln!("  --cycles <n>          Stop after n machine cycles");
    eprintln!("  --snapshot <file>     Write a JSON snapshot when the run ends");
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    usage();
    process::exit(1);
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs {
        config_path: None,
        os_rom: None,
        sideways_roms: Vec::new(),
        speed: None,
        cycles: None,
        snapshot_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        if matches!(flag, "--help" | "-h") {
            usage();
            process::exit(0);
        }
        let Some(value) = args.get(i + 1) else {
            return Err(match flag {
                "--config" | "--os" | "--rom" | "--speed" | "--cycles" | "--snapshot" => {
                    format!("{flag} expects a value")
                }
                other => format!("Unknown argument: {other}"),
            });
        };
        match flag {
            "--config" => cli.config_path = Some(PathBuf::from(value)),
            "--os" => cli.os_rom = Some(PathBuf::from(value)),
            "--rom" => {
                let (slot, path) = value
                    .split_once(':')
                    .ok_or_else(|| "--rom expects <slot>:<file>".to_string())?;
                let slot = slot.parse::<u8>().map_err(|_| format!("bad ROM slot {slot:?}"))?;
                cli.sideways_roms.push(SidewaysRom {
                    slot,
                    path: PathBuf::from(path),
                });
            }
            "--speed" => cli.speed = Some(value.parse::<ClockSpeed>().map_err(|e| e.to_string())?),
            "--cycles" => {
                cli.cycles = Some(value.parse().map_err(|_| "--cycles expects a number".to_string())?);
            }
            "--snapshot" => cli.snapshot_path = Some(PathBuf::from(value)),
            other => return Err(format!("Unknown argument: {other}")),
        }
        i += 2;
    }

    Ok(cli)
}

fn config_from(cli: &CliArgs) -> Result<BbcConfig, MachineError> {
    let mut config = match &cli.config_path {
        Some(path) => BbcConfig::from_json_file(path)?,
        None => BbcConfig::default(),
    };
    if cli.os_rom.is_some() {
        config.os_rom.clone_from(&cli.os_rom);
    }
    config.sideways_roms.extend(cli.sideways_roms.iter().cloned());
    if let Some(speed) = cli.speed {
        config.speed = speed;
    }
    if cli.cycles.is_some() {
        config.max_cycles = cli.cycles;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &CliArgs) -> Result<(), MachineError> {
    let config = config_from(cli)?;
    let mut bbc = BbcMicro::from_config(&config)?;

    let outcome = bbc.run(|_| false)?;
    log::info!(
        "{outcome:?} after {} cycles at PC ${:04X}",
        bbc.cycles(),
        bbc.cpu().regs.pc
    );
    if let Some(stats) = bbc.last_stats() {
        log::info!("last window: {:.2} MHz", stats.mhz);
    }

    if let Some(path) = &cli.snapshot_path {
        bbc.snapshot_at_boundary()?.save(path)?;
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args).unwrap_or_else(|message| fail(&message));
    if cli.config_path.is_none() && cli.os_rom.is_none() {
        fail("either --config or --os is required");
    }

    if let Err(e) = run(&cli) {
        eprintln!("emu-bbc-micro: {e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("emu-bbc-micro")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn flags_fill_the_arguments() {
        let cli = parse_args(&args(&["--os", "os12.rom", "--rom", "15:basic2.rom", "--cycles", "1000"]))
            .unwrap();
        assert_eq!(cli.os_rom, Some(PathBuf::from("os12.rom")));
        assert_eq!(cli.sideways_roms[0].slot, 15);
        assert_eq!(cli.cycles, Some(1000));
    }

    #[test]
    fn trailing_flag_without_a_value_is_an_error() {
        for flag in ["--config", "--os", "--rom", "--snapshot"] {
            let err = parse_args(&args(&["--cycles", "5", flag])).map(|_| ()).unwrap_err();
            assert_eq!(err, format!("{flag} expects a value"));
        }
    }

    #[test]
    fn unknown_flags_are_errors() {
        assert!(parse_args(&args(&["--turbo"])).is_err());
        assert!(parse_args(&args(&["--turbo", "on"])).is_err());
        assert!(parse_args(&args(&["--rom", "16:x.rom"])).is_ok(), "slot range is checked by the config");
        assert!(parse_args(&args(&["--rom", "x.rom"])).is_err());
    }
}
