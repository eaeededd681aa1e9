mod palette;
pub mod registers;

use std::{cell::RefCell, rc::Rc};

use crate::cartridge::{Cartridge, Mirroring};
use crate::ppu::registers::{ControlRegister, MaskRegister, StatusRegister, VramAddr};

pub use self::palette::SYSTEM_PALETTE;

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 240;

// Status-read NMI suppression is not modelled; the post-write delay below
// is what defers the edge until the CPU has finished its current tick run.
const NMI_DELAY: u8 = 15;

/// Background fetch latches plus the 64-bit pixel pipeline. The high 32
/// bits hold the eight 4-bit pixels currently shifting out; the low half
/// receives the next tile.
struct TileFetch {
    nametable: u8,
    attribute: u8,
    pattern_low: u8,
    pattern_high: u8,
    pipeline: u64,
}

pub struct Ppu {
    cartridge: Rc<RefCell<Cartridge>>,
    pub ctrl: ControlRegister,
    pub mask: MaskRegister,
    pub status: StatusRegister,
    pub vram_addr: VramAddr,
    vram: [u8; 0x800],
    palette_table: [u8; 0x20],
    pub oam_addr: u8,
    pub oam_data: [u8; 256],
    read_buffer: u8,
    nmi_delay: u8,
    nmi_interrupt: Option<u8>,
    cycle: u16,
    scanline: u16,
    frame: u64,
    tile: TileFetch,
    frame_buffer: [u8; WIDTH * HEIGHT],
}

impl Ppu {
    pub fn new(cartridge: Rc<RefCell<Cartridge>>) -> Self {
        Ppu {
            cartridge,
            ctrl: ControlRegister::GENERATE_NMI,
            mask: MaskRegister::empty(),
            status: StatusRegister::empty(),
            vram_addr: VramAddr::new(),
            vram: [0; 0x800],
            palette_table: [0; 0x20],
            oam_addr: 0,
            oam_data: [0; 256],
            read_buffer: 0,
            nmi_delay: 0,
            nmi_interrupt: None,
            // Power-up position, one dot before the first vblank approach.
            cycle: 340,
            scanline: 240,
            frame: 0,
            tile: TileFetch {
                nametable: 0,
                attribute: 0,
                pattern_low: 0,
                pattern_high: 0,
                pipeline: 0,
            },
            frame_buffer: [0; WIDTH * HEIGHT],
        }
    }

    pub fn cycle(&self) -> u16 {
        self.cycle
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// 6-bit master palette indices, row-major 256x240.
    pub fn frame_buffer(&self) -> &[u8; WIDTH * HEIGHT] {
        &self.frame_buffer
    }

    /// A scheduled NMI whose delay has elapsed; the console forwards it to
    /// the CPU once per master tick.
    pub fn take_nmi(&mut self) -> Option<u8> {
        self.nmi_interrupt.take()
    }

    pub fn read_register(&mut self, addr: u16) -> u8 {
        match addr {
            0x2002 => {
                let value = self.status.bits();
                self.status.remove(StatusRegister::VBLANK_STARTED);
                self.vram_addr.reset_latch();
                value
            }
            0x2004 => self.oam_data[self.oam_addr as usize],
            0x2007 => self.read_data(),
            _ => Self::write_only_read(addr),
        }
    }

    // Reading a write-only port is a programming fault; release builds fall
    // back to open-bus zeroes.
    fn write_only_read(addr: u16) -> u8 {
        if cfg!(debug_assertions) {
            panic!("PPU register {:#06X} is write-only", addr);
        }
        0
    }

    pub fn write_register(&mut self, addr: u16, value: u8) {
        match addr {
            0x2000 => {
                let was_enabled = self.ctrl.generate_nmi();
                self.ctrl.update(value);
                self.vram_addr.write_ctrl(value);
                if !was_enabled
                    && self.ctrl.generate_nmi()
                    && self.status.contains(StatusRegister::VBLANK_STARTED)
                    && self.nmi_delay == 0
                {
                    self.nmi_delay = NMI_DELAY;
                }
            }
            0x2001 => self.mask.update(value),
            0x2002 => {
                if cfg!(debug_assertions) {
                    panic!("PPUSTATUS is read-only");
                }
            }
            0x2003 => self.oam_addr = value,
            0x2004 => {
                self.oam_data[self.oam_addr as usize] = value;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            0x2005 => self.vram_addr.write_scroll(value),
            0x2006 => self.vram_addr.write_addr(value),
            0x2007 => {
                let v = self.vram_addr.v();
                self.write_mem(v, value);
                self.vram_addr.increment(self.ctrl.vram_addr_increment());
            }
            _ => {}
        }
    }

    /// $4014 burst target; the bus gathers the page and hands it over whole.
    pub fn write_oam_dma(&mut self, data: &[u8; 256]) {
        self.oam_data.copy_from_slice(data);
    }

    /// Buffered PPUDATA read: returns the previous fetch except for palette
    /// addresses, which read through directly while the buffer refills from
    /// the nametable underneath.
    fn read_data(&mut self) -> u8 {
        let addr = self.vram_addr.v() & 0x3FFF;
        let result = if addr >= 0x3F00 {
            self.read_buffer = self.read_mem(addr - 0x1000);
            self.read_mem(addr)
        } else {
            let buffered = self.read_buffer;
            self.read_buffer = self.read_mem(addr);
            buffered
        };
        self.vram_addr.increment(self.ctrl.vram_addr_increment());
        result
    }

    fn read_mem(&self, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => self.cartridge.borrow().read_chr(addr),
            0x2000..=0x3EFF => self.vram[self.mirror_vram_addr(addr) as usize],
            _ => self.palette_table[Self::palette_index(addr)],
        }
    }

    fn write_mem(&mut self, addr: u16, val: u8) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => self.cartridge.borrow_mut().write_chr(addr, val),
            0x2000..=0x3EFF => {
                let index = self.mirror_vram_addr(addr);
                self.vram[index as usize] = val;
            }
            _ => self.palette_table[Self::palette_index(addr)] = val,
        }
    }

    // $3F10/$3F14/$3F18/$3F1C shadow the background colour entries.
    fn palette_index(addr: u16) -> usize {
        let mut index = (addr as usize - 0x3F00) % 0x20;
        if index >= 0x10 && index % 4 == 0 {
            index -= 0x10;
        }
        index
    }

    /// Fold the four nametable slots onto the 2KB of VRAM according to the
    /// cartridge solder pads.
    fn mirror_vram_addr(&self, addr: u16) -> u16 {
        let vram_index = (addr & 0x2FFF) - 0x2000;
        let nametable = vram_index / 0x0400;
        match self.cartridge.borrow().mirroring() {
            Mirroring::Horizontal => match nametable {
                0 | 1 => vram_index & 0x03FF,
                _ => (vram_index & 0x03FF) + 0x0400,
            },
            // Four-screen needs cartridge VRAM we do not model; fold it
            // onto the internal 2KB like vertical.
            Mirroring::Vertical | Mirroring::FourScreen => vram_index & 0x07FF,
        }
    }

    /// Advance one dot.
    pub fn tick(&mut self) {
        if self.nmi_delay > 0 {
            self.nmi_delay -= 1;
            if self.nmi_delay == 0
                && self.ctrl.generate_nmi()
                && self.status.contains(StatusRegister::VBLANK_STARTED)
            {
                self.nmi_interrupt = Some(1);
            }
        }

        self.cycle += 1;
        if self.cycle > 340 {
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline > 261 {
                self.scanline = 0;
                self.frame += 1;
            }
        }

        let rendering = self.mask.show_background() || self.mask.show_sprites();
        let pre_line = self.scanline == 261;
        let visible_line = self.scanline < 240;
        let render_line = pre_line || visible_line;
        let pre_fetch_cycle = (321..=336).contains(&self.cycle);
        let visible_cycle = (1..=256).contains(&self.cycle);
        let fetch_cycle = pre_fetch_cycle || visible_cycle;

        if rendering {
            if visible_line && visible_cycle {
                self.render_pixel();
            }

            if render_line && fetch_cycle {
                self.tile.pipeline <<= 4;
                match self.cycle & 0x07 {
                    0 => self.store_tile_data(),
                    1 => {
                        let v = self.vram_addr.v();
                        self.tile.nametable = self.read_mem(0x2000 | (v & 0x0FFF));
                    }
                    3 => self.fetch_attribute(),
                    5 => {
                        self.tile.pattern_low = self.read_mem(self.pattern_addr());
                    }
                    7 => {
                        self.tile.pattern_high = self.read_mem(self.pattern_addr() + 8);
                    }
                    _ => {}
                }
            }

            if pre_line && (280..=304).contains(&self.cycle) {
                self.vram_addr.copy_vertical();
            }

            if render_line {
                if fetch_cycle && self.cycle % 8 == 0 {
                    self.vram_addr.increment_x();
                }
                if self.cycle == 256 {
                    self.vram_addr.increment_y();
                }
                if self.cycle == 257 {
                    self.vram_addr.copy_horizontal();
                }
            }
        }

        if self.scanline == 241 && self.cycle == 1 {
            self.status.insert(StatusRegister::VBLANK_STARTED);
            if self.ctrl.generate_nmi() && self.nmi_delay == 0 {
                self.nmi_delay = NMI_DELAY;
            }
        }

        if self.scanline == 261 && self.cycle == 1 {
            self.status.remove(StatusRegister::VBLANK_STARTED);
            self.status.remove(StatusRegister::SPRITE_ZERO_HIT);
            // Sprite overflow survives here, matching the hardware bug.
        }
    }

    fn fetch_attribute(&mut self) {
        let v = self.vram_addr.v();
        let addr = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
        let shift = ((v >> 4) & 4) | (v & 2);
        // Two palette-group bits, pre-shifted into pixel bits 3:2.
        self.tile.attribute = ((self.read_mem(addr) >> shift) & 0x03) << 2;
    }

    fn pattern_addr(&self) -> u16 {
        self.ctrl.background_pattern_addr()
            + self.tile.nametable as u16 * 16
            + self.vram_addr.fine_y()
    }

    /// Compose the next eight 4-bit pixels and park them in the low half of
    /// the pipeline.
    fn store_tile_data(&mut self) {
        let mut data: u32 = 0;
        for _ in 0..8 {
            let a = self.tile.attribute;
            let p1 = (self.tile.pattern_low & 0x80) >> 7;
            let p2 = (self.tile.pattern_high & 0x80) >> 6;
            self.tile.pattern_low <<= 1;
            self.tile.pattern_high <<= 1;
            data = (data << 4) | (a | p1 | p2) as u32;
        }
        self.tile.pipeline |= data as u64;
    }

    fn background_pixel(&self) -> u8 {
        if !self.mask.show_background() {
            return 0;
        }
        let data = ((self.tile.pipeline >> 32) as u32) >> ((7 - self.vram_addr.fine_x()) * 4);
        (data & 0x0F) as u8
    }

    fn render_pixel(&mut self) {
        let x = (self.cycle - 1) as usize;
        let y = self.scanline as usize;

        let mut background = self.background_pixel();
        if x < 8 && !self.mask.show_left_background() {
            background = 0;
        }

        self.frame_buffer[y * WIDTH + x] = self.read_mem(0x3F00 + background as u16);
    }
}
