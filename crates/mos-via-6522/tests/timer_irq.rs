//! A 6502 programming the VIA over the bus and servicing its timer IRQ.

use emu_core::{Cpu, InterruptLines, Mapped, Memory, MemoryError, Ram, RegisterWindow};
use mos_6502::Mos6502;
use mos_via_6522::{Register, Via6522, irq};

const VIA_BASE: u16 = 0xFE40;

struct Board {
    ram: Ram,
    via: Mapped<Via6522>,
}

impl Memory for Board {
    fn has_address(&self, _address: u16) -> bool {
        true
    }

    fn read_byte(&mut self, address: u16) -> Result<u8, MemoryError> {
        if self.via.has_address(address) {
            self.via.read_byte(address)
        } else {
            self.ram.read_byte(address)
        }
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), MemoryError> {
        if self.via.has_address(address) {
            self.via.write_byte(address, value)
        } else {
            self.ram.write_byte(address, value)
        }
    }
}

fn board(program: &[u8], handler: &[u8]) -> Board {
    let mut ram = Ram::new(0x0000, 0x10000);
    ram.load(0x0200, program).unwrap();
    ram.load(0x0300, handler).unwrap();
    ram.load(0xFFFC, &[0x00, 0x02, 0x00, 0x03]).unwrap();
    Board {
        ram,
        via: Mapped::new(RegisterWindow::new(VIA_BASE, 32).mirrored(0x0F), Via6522::new()),
    }
}

fn run(cpu: &mut Mos6502, board: &mut Board, cycles: usize) {
    for _ in 0..cycles {
        let lines = InterruptLines::of(board.via.device());
        cpu.tick(board, &lines).unwrap();
        board.via.device_mut().tick();
    }
}

#[test]
fn free_running_timer_interrupts_repeatedly() {
    let program = [
        0xA9, 0xC0, 0x8D, 0x4E, 0xFE, // LDA #$C0; STA IER (enable T1)
        0xA9, 0x40, 0x8D, 0x4B, 0xFE, // LDA #$40; STA ACR (free-run)
        0xA9, 0x64, 0x8D, 0x44, 0xFE, // LDA #100; STA T1C-L
        0xA9, 0x00, 0x8D, 0x45, 0xFE, // LDA #0; STA T1C-H (start)
        0x58, // CLI
        0x4C, 0x15, 0x02, // JMP *
    ];
    let handler = [
        0xAD, 0x44, 0xFE, // LDA T1C-L (acknowledge)
        0xE6, 0x10, // INC $10
        0x40, // RTI
    ];
    let mut board = board(&program, &handler);
    let mut cpu = Mos6502::new();
    cpu.reset(&mut board).unwrap();

    run(&mut cpu, &mut board, 1000);

    let count = board.ram.read_byte(0x0010).unwrap();
    assert!((8..=10).contains(&count), "expected about 9 interrupts, got {count}");
    assert_eq!(board.via.device().ier(), irq::T1);
}

#[test]
fn mirrored_window_reaches_the_same_registers() {
    let mut board = board(&[], &[]);
    board.write_byte(VIA_BASE + 0x12, 0xF0).unwrap();
    assert_eq!(board.via.device_mut().read(Register::Ddrb), 0xF0);
    assert_eq!(board.read_byte(VIA_BASE + 0x0E).unwrap(), irq::ANY, "IER reads bit 7 set");
}

#[test]
fn masked_flag_does_not_interrupt() {
    // CLI; JMP *
    let mut board = board(&[0x58, 0x4C, 0x01, 0x02], &[0x02]);
    board.via.device_mut().write(Register::T1cl, 10);
    board.via.device_mut().write(Register::T1ch, 0);
    let mut cpu = Mos6502::new();
    cpu.reset(&mut board).unwrap();

    run(&mut cpu, &mut board, 100);
    assert_ne!(board.via.device().ifr() & irq::T1, 0, "flag raised");
    assert!(!cpu.in_isr(), "but IER masks it");
}
