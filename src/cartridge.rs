use thiserror::Error;
use tracing::debug;

const NES_TAG: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];
const HEADER_LEN: usize = 16;
const TRAINER_LEN: usize = 512;
pub const PRG_ROM_PAGE_SIZE: usize = 0x4000; // 16KB
pub const CHR_PAGE_SIZE: usize = 0x2000; // 8KB
const WORK_RAM_SIZE: usize = 0x2000;

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("file is not in iNES file format")]
    BadMagic,
    #[error("mapper {0} is not supported, only NROM (mapper 0)")]
    UnsupportedMapper(u8),
    #[error("{section} section expected {expected} bytes, got {actual}")]
    Truncated {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Nametable arrangement from the header solder-pad bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

/// Decoded iNES header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NesHeader {
    pub prg_pages: u8,
    pub chr_pages: u8,
    pub prg_ram_pages: u8,
    pub mapper: u8,
    pub mirroring: Mirroring,
    pub has_persistent_ram: bool,
    pub has_trainer: bool,
    pub vs_unisystem: bool,
}

/// NROM cartridge: fixed PRG/CHR images plus 8KB of work RAM at $6000.
pub struct Cartridge {
    pub prg_rom: Box<[u8]>,
    pub chr: Box<[u8]>,
    work_ram: Box<[u8; WORK_RAM_SIZE]>,
    chr_is_ram: bool,
    header: NesHeader,
}

impl Cartridge {
    pub fn new(raw: &[u8]) -> Result<Cartridge, CartridgeError> {
        if raw.len() < HEADER_LEN {
            return Err(CartridgeError::Truncated {
                section: "header",
                expected: HEADER_LEN,
                actual: raw.len(),
            });
        }
        if raw[0..4] != NES_TAG {
            return Err(CartridgeError::BadMagic);
        }

        let mapper = (raw[7] & 0xF0) | (raw[6] >> 4);
        if mapper != 0 {
            return Err(CartridgeError::UnsupportedMapper(mapper));
        }

        let mirroring = if raw[6] & 0x08 != 0 {
            Mirroring::FourScreen
        } else if raw[6] & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let header = NesHeader {
            prg_pages: raw[4],
            chr_pages: raw[5],
            prg_ram_pages: raw[8],
            mapper,
            mirroring,
            has_persistent_ram: raw[6] & 0x02 != 0,
            has_trainer: raw[6] & 0x04 != 0,
            vs_unisystem: raw[7] & 0x01 != 0,
        };

        let prg_rom_size = PRG_ROM_PAGE_SIZE * header.prg_pages as usize;
        let prg_rom_start = if header.has_trainer {
            HEADER_LEN + TRAINER_LEN
        } else {
            HEADER_LEN
        };
        let prg_rom_end = prg_rom_start + prg_rom_size;
        if raw.len() < prg_rom_end {
            return Err(CartridgeError::Truncated {
                section: "PRG ROM",
                expected: prg_rom_size,
                actual: raw.len().saturating_sub(prg_rom_start),
            });
        }

        // chr_pages == 0 means the board carries 8KB of CHR-RAM instead.
        let chr_is_ram = header.chr_pages == 0;
        let chr = if chr_is_ram {
            vec![0u8; CHR_PAGE_SIZE].into_boxed_slice()
        } else {
            let chr_size = CHR_PAGE_SIZE * header.chr_pages as usize;
            let chr_end = prg_rom_end + chr_size;
            if raw.len() < chr_end {
                return Err(CartridgeError::Truncated {
                    section: "CHR ROM",
                    expected: chr_size,
                    actual: raw.len() - prg_rom_end,
                });
            }
            Box::from(&raw[prg_rom_end..chr_end])
        };

        debug!(
            prg_kb = prg_rom_size / 1024,
            chr_kb = chr.len() / 1024,
            chr_is_ram,
            ?mirroring,
            "cartridge loaded"
        );

        Ok(Cartridge {
            prg_rom: Box::from(&raw[prg_rom_start..prg_rom_end]),
            chr,
            work_ram: Box::new([0; WORK_RAM_SIZE]),
            chr_is_ram,
            header,
        })
    }

    pub fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.work_ram[(addr - 0x6000) as usize],
            // A 16KB image is mirrored into $C000-$FFFF.
            0x8000..=0xFFFF => self.prg_rom[(addr - 0x8000) as usize % self.prg_rom.len()],
            _ => 0,
        }
    }

    pub fn write_prg(&mut self, addr: u16, val: u8) {
        if let 0x6000..=0x7FFF = addr {
            self.work_ram[(addr - 0x6000) as usize] = val;
        }
        // NROM has no mapper registers; ROM writes fall through.
    }

    pub fn read_chr(&self, addr: u16) -> u8 {
        self.chr[addr as usize % self.chr.len()]
    }

    pub fn write_chr(&mut self, addr: u16, val: u8) {
        if self.chr_is_ram {
            self.chr[(addr as usize) & (CHR_PAGE_SIZE - 1)] = val;
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        self.header.mirroring
    }

    pub fn header(&self) -> &NesHeader {
        &self.header
    }
}
