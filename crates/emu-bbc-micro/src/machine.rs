//! The BBC Micro Model B.
//!
//! # Tick loop
//!
//! One tick is one 2 MHz machine cycle:
//! 1. CPU: one bus access
//! 2. Every region in map order: CRTC, then the VIAs on alternate (1 MHz)
//!    cycles, then the ROM select latch
//! 3. Signals raised in step 2 are delivered: vsync to system VIA CA1,
//!    bank switches to the paged ROM
//! 4. The interrupt aggregate is refreshed from CRTC, system VIA, user VIA
//!    and Video ULA, for the CPU to sample on the next tick

use std::fs;
use std::path::Path;

use emu_core::{
    ClockSpeed, Cpu, InterruptAggregator, InterruptLines, InterruptSource, Observable, PagedRom,
    Rom, RunOutcome, RunStats, Runner, SourceId, Tickable, Value, subpath,
};
use mos_6502::Mos6502;
use mos_via_6522::{Via6522, ViaSnapshot};
use motorola_6845::{Crtc6845, CrtcSnapshot};

use crate::bus::{self, BbcBus, OS_ROM_START, PAGED_ROM_START, ROM_SIZE, Region, Signal};
use crate::config::{BbcConfig, SIDEWAYS_SLOTS};
use crate::devices::{SystemVia, VideoUla};
use crate::{MachineError, MachineSnapshot};

/// Longest run from any tick to the next instruction boundary: an
/// interrupt entry followed by the longest instruction.
const MAX_CYCLES_TO_BOUNDARY: u32 = 16;

/// Assembles a [`BbcMicro`] from a configuration and in-memory ROM images.
#[derive(Debug, Clone)]
pub struct BbcMicroBuilder {
    config: BbcConfig,
    os_rom: Option<Vec<u8>>,
    sideways: Vec<(u8, Vec<u8>)>,
}

impl BbcMicroBuilder {
    /// ROM paths in `config` are ignored; supply images with
    /// [`Self::os_rom`] and [`Self::sideways_rom`].
    #[must_use]
    pub fn new(config: BbcConfig) -> Self {
        Self {
            config,
            os_rom: None,
            sideways: Vec::new(),
        }
    }

    #[must_use]
    pub fn os_rom(mut self, image: Vec<u8>) -> Self {
        self.os_rom = Some(image);
        self
    }

    /// Plug `image` into `slot`. A later image for the same slot wins.
    #[must_use]
    pub fn sideways_rom(mut self, slot: u8, image: Vec<u8>) -> Self {
        self.sideways.push((slot, image));
        self
    }

    pub fn build(self) -> Result<BbcMicro, MachineError> {
        self.config.validate()?;

        let os = self
            .os_rom
            .ok_or_else(|| MachineError::Config("no OS ROM image".to_string()))?;
        if os.len() != ROM_SIZE {
            return Err(MachineError::RomSize {
                what: "OS".to_string(),
                len: os.len(),
            });
        }

        let mut paged = PagedRom::new(PAGED_ROM_START, ROM_SIZE);
        for (slot, image) in self.sideways {
            if slot >= SIDEWAYS_SLOTS {
                return Err(MachineError::Config(format!("sideways slot {slot} (slots are 0-15)")));
            }
            let len = image.len();
            let replaced = paged.insert(slot, image).map_err(|_| MachineError::RomSize {
                what: format!("sideways slot {slot}"),
                len,
            })?;
            if replaced.is_some() {
                log::warn!("sideways slot {slot} loaded twice; keeping the later image");
            }
        }

        let mut bus = bus::model_b(self.config.ram_size, paged, Rom::new(OS_ROM_START, os));

        let mut interrupts = InterruptAggregator::new();
        let sources = bus
            .regions()
            .enumerate()
            .filter(|(_, region)| region.interrupt_source().is_some())
            .map(|(index, region)| (interrupts.register(region.name()), index))
            .collect();

        let mut cpu = Mos6502::new().with_stack_policy(self.config.stack_policy);
        cpu.reset(&mut bus)?;

        log::info!(
            "BBC Micro: {} KiB RAM, {} sideways ROM(s), {}, reset to ${:04X}",
            self.config.ram_size / 1024,
            (0..SIDEWAYS_SLOTS).filter(|&slot| paged_occupied(&bus, slot)).count(),
            self.config.speed,
            cpu.pc()
        );

        Ok(BbcMicro {
            cpu,
            bus,
            interrupts,
            sources,
            signals: Vec::new(),
            speed: self.config.speed,
            max_cycles: self.config.max_cycles,
            cycles: 0,
            snapshot_requested: false,
            snapshot: None,
            last_stats: None,
        })
    }
}

fn paged_occupied(bus: &BbcBus, slot: u8) -> bool {
    bus.regions().any(|region| match region {
        Region::PagedRom(rom) => rom.is_occupied(slot),
        _ => false,
    })
}

fn read_rom(path: &Path) -> Result<Vec<u8>, MachineError> {
    let image = fs::read(path).map_err(|source| MachineError::Rom {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("loaded {} ({} bytes)", path.display(), image.len());
    Ok(image)
}

/// BBC Micro Model B.
#[derive(Debug)]
pub struct BbcMicro {
    cpu: Mos6502,
    bus: BbcBus,
    interrupts: InterruptAggregator,
    /// Aggregator slot and bus region of each interrupt source.
    sources: Vec<(SourceId, usize)>,
    signals: Vec<Signal>,
    speed: ClockSpeed,
    max_cycles: Option<u64>,
    /// Machine cycles (2 MHz) since power on.
    cycles: u64,
    snapshot_requested: bool,
    snapshot: Option<MachineSnapshot>,
    last_stats: Option<RunStats>,
}

impl BbcMicro {
    /// Build a machine, loading the ROM files `config` names.
    pub fn from_config(config: &BbcConfig) -> Result<Self, MachineError> {
        config.validate()?;
        let os_path = config
            .os_rom
            .as_deref()
            .ok_or_else(|| MachineError::Config("no OS ROM path".to_string()))?;

        let mut builder = BbcMicroBuilder::new(config.clone()).os_rom(read_rom(os_path)?);
        for rom in &config.sideways_roms {
            builder = builder.sideways_rom(rom.slot, read_rom(&rom.path)?);
        }
        builder.build()
    }

    #[must_use]
    pub fn cpu(&self) -> &Mos6502 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Mos6502 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &BbcBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut BbcBus {
        &mut self.bus
    }

    /// Machine cycles (2 MHz) since power on.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    #[must_use]
    pub fn speed(&self) -> ClockSpeed {
        self.speed
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Throughput of the last completed measurement window of [`Self::run`].
    #[must_use]
    pub fn last_stats(&self) -> Option<RunStats> {
        self.last_stats
    }

    #[must_use]
    pub fn interrupts(&self) -> &InterruptAggregator {
        &self.interrupts
    }

    // ------------------------------------------------------------------
    // Devices
    // ------------------------------------------------------------------

    #[must_use]
    pub fn crtc(&self) -> Option<&Crtc6845> {
        self.bus.regions().find_map(|region| match region {
            Region::Crtc(crtc) => Some(crtc.device()),
            _ => None,
        })
    }

    #[must_use]
    pub fn video_ula(&self) -> Option<&VideoUla> {
        self.bus.regions().find_map(|region| match region {
            Region::VideoUla(ula) => Some(ula.device()),
            _ => None,
        })
    }

    #[must_use]
    pub fn system_via(&self) -> Option<&SystemVia> {
        self.bus.regions().find_map(|region| match region {
            Region::SystemVia(via) => Some(via.device()),
            _ => None,
        })
    }

    pub fn system_via_mut(&mut self) -> Option<&mut SystemVia> {
        self.bus.regions_mut().find_map(|region| match region {
            Region::SystemVia(via) => Some(via.device_mut()),
            _ => None,
        })
    }

    #[must_use]
    pub fn user_via(&self) -> Option<&Via6522> {
        self.bus.regions().find_map(|region| match region {
            Region::UserVia(via) => Some(via.device()),
            _ => None,
        })
    }

    pub fn user_via_mut(&mut self) -> Option<&mut Via6522> {
        self.bus.regions_mut().find_map(|region| match region {
            Region::UserVia(via) => Some(via.device_mut()),
            _ => None,
        })
    }

    /// Sideways bank currently visible at &8000.
    #[must_use]
    pub fn rom_bank(&self) -> u8 {
        self.bus
            .regions()
            .find_map(|region| match region {
                Region::PagedRom(rom) => Some(rom.selected()),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// RAM contents from &0000.
    #[must_use]
    pub fn ram(&self) -> &[u8] {
        self.bus
            .regions()
            .find_map(|region| match region {
                Region::Ram(ram) => Some(ram.bytes()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Copy `bytes` into RAM at `address`.
    pub fn load_ram(&mut self, address: u16, bytes: &[u8]) -> Result<(), MachineError> {
        let ram = self
            .bus
            .regions_mut()
            .find_map(|region| match region {
                Region::Ram(ram) => Some(ram),
                _ => None,
            })
            .ok_or_else(|| MachineError::Config("no RAM region".to_string()))?;
        Ok(ram.load(address, bytes)?)
    }

    /// Press or release a key in the keyboard matrix.
    pub fn set_key(&mut self, column: u8, row: u8, down: bool) {
        if let Some(via) = self.system_via_mut() {
            via.set_key(column, row, down);
        }
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// The BREAK key: reset both VIAs and the CPU. RAM is preserved.
    pub fn reset(&mut self) -> Result<(), MachineError> {
        for region in self.bus.regions_mut() {
            match region {
                Region::SystemVia(via) => via.device_mut().via_mut().reset(),
                Region::UserVia(via) => via.device_mut().reset(),
                _ => {}
            }
        }
        self.cpu.reset(&mut self.bus)?;
        self.refresh_interrupts();
        Ok(())
    }

    /// Run at the configured speed, pacing against the host clock, until
    /// `stop` returns true, the CPU halts or the configured cycle limit is
    /// reached.
    pub fn run<F>(&mut self, mut stop: F) -> Result<RunOutcome, MachineError>
    where
        F: FnMut(&Self) -> bool,
    {
        let mut runner = Runner::busy_wait(self.speed);
        if let Some(max) = self.max_cycles {
            runner = runner.with_max_cycles(max.saturating_sub(self.cycles));
        }
        let outcome = runner.run(self, |machine| machine.is_halted() || stop(machine))?;
        if let Some(stats) = runner.last_stats() {
            self.last_stats = Some(stats);
        }
        Ok(outcome)
    }

    /// Run `cycles` machine cycles, or until the CPU halts, without
    /// waiting on the host clock.
    pub fn run_for(&mut self, cycles: u64) -> Result<RunOutcome, MachineError> {
        let mut runner = Runner::unthrottled(self.speed).with_max_cycles(cycles);
        runner.run(self, Self::is_halted)
    }

    fn refresh_interrupts(&mut self) {
        for &(id, index) in &self.sources {
            if let Some(source) = self.bus.get(index).and_then(Region::interrupt_source) {
                self.interrupts.update(id, InterruptLines::of(source));
            }
        }
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Capture a snapshot at the end of the next tick that leaves the CPU
    /// between instructions. Collect it with [`Self::take_snapshot`].
    pub fn request_snapshot(&mut self) {
        self.snapshot_requested = true;
    }

    pub fn take_snapshot(&mut self) -> Option<MachineSnapshot> {
        self.snapshot.take()
    }

    /// Snapshot now. Fails unless the CPU is between instructions.
    pub fn snapshot(&self) -> Result<MachineSnapshot, MachineError> {
        if !self.cpu.is_quiescent() {
            return Err(MachineError::NotQuiescent { pc: self.cpu.pc() });
        }
        Ok(self.capture())
    }

    /// Run to the next instruction boundary and snapshot there.
    pub fn snapshot_at_boundary(&mut self) -> Result<MachineSnapshot, MachineError> {
        if self.cpu.is_quiescent() {
            return Ok(self.capture());
        }
        self.request_snapshot();
        for _ in 0..MAX_CYCLES_TO_BOUNDARY {
            self.tick()?;
            if let Some(snapshot) = self.snapshot.take() {
                return Ok(snapshot);
            }
        }
        self.snapshot_requested = false;
        Err(MachineError::NotQuiescent { pc: self.cpu.pc() })
    }

    /// Load `snapshot`. Fails unless the CPU is between instructions.
    pub fn restore(&mut self, snapshot: &MachineSnapshot) -> Result<(), MachineError> {
        if !self.cpu.is_quiescent() {
            return Err(MachineError::NotQuiescent { pc: self.cpu.pc() });
        }
        if snapshot.ram.len() != self.ram().len() {
            return Err(MachineError::Config(format!(
                "snapshot has {} bytes of RAM, machine has {}",
                snapshot.ram.len(),
                self.ram().len()
            )));
        }
        for region in self.bus.regions_mut() {
            match region {
                Region::Crtc(crtc) => crtc.device_mut().restore(&snapshot.crtc),
                Region::VideoUla(ula) => ula.device_mut().restore(&snapshot.video_ula),
                Region::RomSelect(latch) => latch.device_mut().restore(snapshot.rom_bank),
                Region::SystemVia(via) => via.device_mut().restore(&snapshot.system_via),
                Region::UserVia(via) => via.device_mut().restore(&snapshot.user_via),
                Region::Ram(ram) => ram.restore(&snapshot.ram)?,
                Region::PagedRom(rom) => rom.select(snapshot.rom_bank),
                Region::Sheila(_) | Region::Rom(_) => {}
            }
        }
        self.cpu.restore(&snapshot.cpu);
        self.cycles = snapshot.cycles;
        self.refresh_interrupts();
        log::debug!("restored snapshot at cycle {}, PC ${:04X}", self.cycles, self.cpu.pc());
        Ok(())
    }

    fn capture(&self) -> MachineSnapshot {
        let mut snapshot = MachineSnapshot {
            cycles: self.cycles,
            cpu: self.cpu.snapshot(),
            ram: self.ram().to_vec(),
            crtc: CrtcSnapshot::default(),
            video_ula: VideoUla::new().snapshot(),
            system_via: SystemVia::new().snapshot(),
            user_via: ViaSnapshot::default(),
            rom_bank: self.rom_bank(),
        };
        for region in self.bus.regions() {
            match region {
                Region::Crtc(crtc) => snapshot.crtc = crtc.device().snapshot(),
                Region::VideoUla(ula) => snapshot.video_ula = ula.device().snapshot(),
                Region::SystemVia(via) => snapshot.system_via = via.device().snapshot(),
                Region::UserVia(via) => snapshot.user_via = via.device().snapshot(),
                _ => {}
            }
        }
        snapshot
    }

    fn peek(&self, address: u16) -> Option<u8> {
        self.ram().get(usize::from(address)).copied()
    }
}

impl Tickable for BbcMicro {
    type Error = MachineError;

    fn tick(&mut self) -> Result<(), MachineError> {
        self.cpu.tick(&mut self.bus, &self.interrupts)?;

        let one_mhz = self.cycles & 1 == 1;
        self.cycles += 1;

        for region in self.bus.regions_mut() {
            region.tick(one_mhz, &mut self.signals);
        }
        for signal in self.signals.drain(..) {
            for region in self.bus.regions_mut() {
                region.deliver(signal);
            }
        }

        self.refresh_interrupts();

        if self.snapshot_requested && self.cpu.is_quiescent() {
            self.snapshot = Some(self.capture());
            self.snapshot_requested = false;
        }
        Ok(())
    }
}

impl Observable for BbcMicro {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = subpath(path, "cpu") {
            self.cpu.query(rest)
        } else if let Some(rest) = subpath(path, "crtc") {
            self.crtc()?.query(rest)
        } else if let Some(rest) = subpath(path, "sysvia") {
            self.system_via()?.query(rest)
        } else if let Some(rest) = subpath(path, "uservia") {
            self.user_via()?.query(rest)
        } else if let Some(rest) = subpath(path, "ula") {
            self.video_ula()?.query(rest)
        } else if let Some(rest) = subpath(path, "memory") {
            let address = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix('$')) {
                u16::from_str_radix(hex, 16).ok()
            } else {
                rest.parse().ok()
            };
            address.and_then(|a| self.peek(a)).map(Value::from)
        } else {
            match path {
                "cycles" => Some(self.cycles.into()),
                "rom_bank" => Some(self.rom_bank().into()),
                "irq" => Some(self.interrupts.is_irq().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<6502_paths>",
            "crtc.<6845_paths>",
            "sysvia.<via_paths>",
            "sysvia.ic32",
            "sysvia.screen_size",
            "sysvia.caps_lock",
            "sysvia.shift_lock",
            "uservia.<via_paths>",
            "ula.<video_ula_paths>",
            "memory.<address>",
            "cycles",
            "rom_bank",
            "irq",
        ]
    }
}
