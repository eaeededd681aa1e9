use crate::{
    Mem,
    bus::Bus,
    cpu::Cpu,
    opcodes::{AddressMode, OPS, Op, OpFamily, UNDEFINED_NOP},
};

/// Render the instruction at PC in the canonical nestest log format, for
/// diffing a run against a known-good execution log.
pub fn trace(cpu: &mut Cpu<Bus>) -> String {
    let begin = cpu.pc;
    let code = cpu.bus.read_u8(begin);
    let op = OPS[code as usize].unwrap_or(Op {
        code,
        ..UNDEFINED_NOP
    });

    let mut hex_dump = vec![code];

    let (mem_addr, stored_value) = match op.mode {
        AddressMode::IMM | AddressMode::IMP | AddressMode::ACC | AddressMode::REL => (0, 0),
        _ => {
            let (addr, _) = cpu.operand_addr(&op);
            (addr, cpu.bus.read_u8(addr))
        }
    };

    let operand = match op.size {
        1 => match op.mode {
            AddressMode::ACC => "A ".to_string(),
            _ => String::new(),
        },
        2 => {
            let arg = cpu.bus.read_u8(begin.wrapping_add(1));
            hex_dump.push(arg);

            match op.mode {
                AddressMode::IMM => format!("#${:02x}", arg),
                AddressMode::ZP => format!("${:02x} = {:02x}", arg, stored_value),
                AddressMode::ZPX => {
                    format!("${:02x},X @ {:02x} = {:02x}", arg, mem_addr, stored_value)
                }
                AddressMode::ZPY => {
                    format!("${:02x},Y @ {:02x} = {:02x}", arg, mem_addr, stored_value)
                }
                AddressMode::INDX => format!(
                    "(${:02x},X) @ {:02x} = {:04x} = {:02x}",
                    arg,
                    arg.wrapping_add(cpu.reg_x),
                    mem_addr,
                    stored_value
                ),
                AddressMode::INDY => format!(
                    "(${:02x}),Y = {:04x} @ {:04x} = {:02x}",
                    arg,
                    mem_addr.wrapping_sub(cpu.reg_y as u16),
                    mem_addr,
                    stored_value
                ),
                AddressMode::REL => {
                    let target = begin
                        .wrapping_add(2)
                        .wrapping_add(arg as i8 as i16 as u16);
                    format!("${:04x}", target)
                }
                _ => String::new(),
            }
        }
        3 => {
            let lo = cpu.bus.read_u8(begin.wrapping_add(1));
            let hi = cpu.bus.read_u8(begin.wrapping_add(2));
            hex_dump.push(lo);
            hex_dump.push(hi);
            let arg = u16::from_le_bytes([lo, hi]);

            match op.mode {
                AddressMode::IND => {
                    let target = cpu.bus.read_u16_pagewrap(arg);
                    format!("(${:04x}) = {:04x}", arg, target)
                }
                AddressMode::ABS => match op.family {
                    OpFamily::JMP | OpFamily::JSR => format!("${:04x}", arg),
                    _ => format!("${:04x} = {:02x}", arg, stored_value),
                },
                AddressMode::ABSX => {
                    format!("${:04x},X @ {:04x} = {:02x}", arg, mem_addr, stored_value)
                }
                AddressMode::ABSY => {
                    format!("${:04x},Y @ {:04x} = {:02x}", arg, mem_addr, stored_value)
                }
                _ => String::new(),
            }
        }
        _ => String::new(),
    };

    let hex_str = hex_dump
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<String>>()
        .join(" ");
    let asm_str = format!(
        "{:04x}  {:8} {: >4} {}",
        begin, hex_str, op.mnemonic, operand
    )
    .trim()
    .to_string();

    format!(
        "{:47} A:{:02x} X:{:02x} Y:{:02x} P:{:02x} SP:{:02x} PPU:{: >3},{: >3} CYC:{}",
        asm_str,
        cpu.reg_a,
        cpu.reg_x,
        cpu.reg_y,
        cpu.status.bits(),
        cpu.sp,
        cpu.bus.ppu.scanline(),
        cpu.bus.ppu.cycle(),
        cpu.cycles
    )
    .to_ascii_uppercase()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cartridge::test::test_cartridge;
    use crate::console::Console;

    fn console_with_program(program: Vec<u8>) -> Console {
        let mut prg = program;
        prg.resize(0x4000, 0);
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        Console::new(test_cartridge(prg))
    }

    #[test]
    fn formats_immediate_loads() {
        let mut console = console_with_program(vec![0xA2, 0x01]);
        let line = trace(&mut console.cpu);
        assert!(line.starts_with("8000  A2 01"), "{line}");
        assert!(line.contains("LDX #$01"), "{line}");
        assert!(line.contains("A:00 X:00 Y:00"), "{line}");
        assert!(line.contains("CYC:7"), "{line}");
    }

    #[test]
    fn formats_absolute_with_value() {
        let mut console = console_with_program(vec![0xAD, 0x05, 0x00]);
        console.cpu.bus.write_u8(0x0005, 0x42);
        let line = trace(&mut console.cpu);
        assert!(line.contains("LDA $0005 = 42"), "{line}");
    }

    #[test]
    fn formats_branch_targets() {
        let mut console = console_with_program(vec![0xD0, 0xFE]);
        let line = trace(&mut console.cpu);
        assert!(line.contains("BNE $8000"), "{line}");
    }

    #[test]
    fn formats_indirect_jmp_with_pagewrap() {
        let mut console = console_with_program(vec![0x6C, 0xFF, 0x02]);
        console.cpu.bus.write_u8(0x02FF, 0x34);
        console.cpu.bus.write_u8(0x0200, 0x12);
        let line = trace(&mut console.cpu);
        assert!(line.contains("JMP ($02FF) = 1234"), "{line}");
    }
}
