use tracing::debug;

use crate::{
    bus::Bus,
    cartridge::Cartridge,
    cpu::Cpu,
    joypad::Joypad,
    ppu::{self, Ppu},
};

/// The assembled machine. Owns every subsystem through the CPU -> Bus
/// chain and is the only driver: one master tick advances the CPU one
/// cycle and the PPU three dots.
pub struct Console {
    pub cpu: Cpu<Bus>,
}

impl Console {
    pub fn new(cartridge: Cartridge) -> Self {
        let bus = Bus::new(cartridge);
        let mut cpu = Cpu::new(bus);
        cpu.power_up();
        debug!("console powered up, entry {:#06X}", cpu.pc);
        Console { cpu }
    }

    /// One master tick. An NMI the PPU posts during the tick is forwarded
    /// here, so the CPU consumes it at its next instruction boundary.
    pub fn tick(&mut self) {
        self.cpu.tick();
        for _ in 0..3 {
            self.cpu.bus.ppu.tick();
        }
        if self.cpu.bus.ppu.take_nmi().is_some() {
            self.cpu.request_nmi();
        }
    }

    /// Run until the PPU finishes its current frame; hosts typically call
    /// this once per display refresh and then read `frame_buffer`.
    pub fn step_frame(&mut self) {
        let frame = self.cpu.bus.ppu.frame_count();
        while self.cpu.bus.ppu.frame_count() == frame {
            self.tick();
        }
    }

    pub fn reset(&mut self) {
        debug!("console reset");
        self.cpu.reset();
    }

    pub fn ppu(&self) -> &Ppu {
        &self.cpu.bus.ppu
    }

    pub fn frame_buffer(&self) -> &[u8; ppu::WIDTH * ppu::HEIGHT] {
        self.cpu.bus.ppu.frame_buffer()
    }

    pub fn joypad1_mut(&mut self) -> &mut Joypad {
        &mut self.cpu.bus.joypad1
    }

    pub fn joypad2_mut(&mut self) -> &mut Joypad {
        &mut self.cpu.bus.joypad2
    }
}
