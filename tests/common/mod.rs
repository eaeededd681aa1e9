//! Shared helpers: in-memory iNES images for console-level tests.

use famicore::{Cartridge, Console};

pub const PRG_PAGE: usize = 0x4000;

/// A 16KB PRG bank with the program at $8000, an RTI as the default NMI
/// handler at $9000, and vectors pointing at both.
pub fn build_prg(program: &[u8]) -> Vec<u8> {
    let mut prg = vec![0u8; PRG_PAGE];
    prg[..program.len()].copy_from_slice(program);
    prg[0x1000] = 0x40; // RTI
    prg[0x3FFA] = 0x00; // NMI -> $9000
    prg[0x3FFB] = 0x90;
    prg[0x3FFC] = 0x00; // RESET -> $8000
    prg[0x3FFD] = 0x80;
    prg
}

pub fn build_ines(prg: Vec<u8>, chr_pages: u8) -> Vec<u8> {
    let prg_pages = (prg.len() / PRG_PAGE) as u8;
    let mut raw = vec![
        0x4E, 0x45, 0x53, 0x1A, prg_pages, chr_pages, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00,
    ];
    raw.extend(prg);
    raw.extend(vec![0u8; chr_pages as usize * 0x2000]);
    raw
}

pub fn console_from_prg(prg: Vec<u8>) -> Console {
    let raw = build_ines(prg, 1);
    Console::new(Cartridge::new(&raw).expect("test image is valid"))
}

/// Same, but with CHR-RAM so tests can compose pattern data through $2007.
pub fn console_from_prg_chr_ram(prg: Vec<u8>) -> Console {
    let raw = build_ines(prg, 0);
    Console::new(Cartridge::new(&raw).expect("test image is valid"))
}
