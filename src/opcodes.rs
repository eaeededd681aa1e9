use AddressMode::*;
use OpFamily::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Op {
    pub code: u8,
    pub family: OpFamily,
    pub mode: AddressMode,
    pub size: u8,
    pub cycles: u8,
    pub page_cycles: u8,
    pub mnemonic: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpFamily {
    ADC,
    AND,
    ASL,
    BCC,
    BCS,
    BEQ,
    BIT,
    BMI,
    BNE,
    BPL,
    BRK,
    BVC,
    BVS,
    CLC,
    CLD,
    CLI,
    CLV,
    CMP,
    CPX,
    CPY,
    DEC,
    DEX,
    DEY,
    EOR,
    INC,
    INX,
    INY,
    JMP,
    JSR,
    LDA,
    LDX,
    LDY,
    LSR,
    NOP,
    ORA,
    PHA,
    PHP,
    PLA,
    PLP,
    ROL,
    ROR,
    RTI,
    RTS,
    SBC,
    SEC,
    SED,
    SEI,
    STA,
    STX,
    STY,
    TAX,
    TAY,
    TSX,
    TXA,
    TXS,
    TYA,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    IMP,  // Implied
    IMM,  // Immediate
    ACC,  // Accumulator
    ZP,   // Zero Page
    ZPX,  // Zero Page, X
    ZPY,  // Zero Page, Y
    ABS,  // Absolute
    ABSX, // Absolute, X
    ABSY, // Absolute, Y
    IND,  // Indirect (JMP only)
    INDX, // (Indirect, X)
    INDY, // (Indirect), Y
    REL,  // Relative (branches)
}

/// Stand-in for holes in the table: undefined opcodes run as a two-cycle
/// implied NOP.
pub const UNDEFINED_NOP: Op = Op {
    code: 0x00,
    family: NOP,
    mode: IMP,
    size: 1,
    cycles: 2,
    page_cycles: 0,
    mnemonic: "NOP",
};

macro_rules! op {
    ($code:expr, $family:ident, $mode:ident, $size:expr, $cycles:expr, $page:expr, $mnemonic:expr) => {
        Some(Op {
            code: $code,
            family: $family,
            mode: $mode,
            size: $size,
            cycles: $cycles,
            page_cycles: $page,
            mnemonic: $mnemonic,
        })
    };
    ($code:expr, $family:ident, $size:expr, $cycles:expr, $mnemonic:expr) => {
        Some(Op {
            code: $code,
            family: $family,
            mode: IMP,
            size: $size,
            cycles: $cycles,
            page_cycles: 0,
            mnemonic: $mnemonic,
        })
    };
}

pub const OPS: [Option<Op>; 256] = {
    let mut ops: [Option<Op>; 256] = [None; 256];

    // ADC - Add with Carry
    ops[0x69] = op!(0x69, ADC, IMM, 2, 2, 0, "ADC");
    ops[0x65] = op!(0x65, ADC, ZP, 2, 3, 0, "ADC");
    ops[0x75] = op!(0x75, ADC, ZPX, 2, 4, 0, "ADC");
    ops[0x6D] = op!(0x6D, ADC, ABS, 3, 4, 0, "ADC");
    ops[0x7D] = op!(0x7D, ADC, ABSX, 3, 4, 1, "ADC");
    ops[0x79] = op!(0x79, ADC, ABSY, 3, 4, 1, "ADC");
    ops[0x61] = op!(0x61, ADC, INDX, 2, 6, 0, "ADC");
    ops[0x71] = op!(0x71, ADC, INDY, 2, 5, 1, "ADC");

    // AND - Bitwise AND
    ops[0x29] = op!(0x29, AND, IMM, 2, 2, 0, "AND");
    ops[0x25] = op!(0x25, AND, ZP, 2, 3, 0, "AND");
    ops[0x35] = op!(0x35, AND, ZPX, 2, 4, 0, "AND");
    ops[0x2D] = op!(0x2D, AND, ABS, 3, 4, 0, "AND");
    ops[0x3D] = op!(0x3D, AND, ABSX, 3, 4, 1, "AND");
    ops[0x39] = op!(0x39, AND, ABSY, 3, 4, 1, "AND");
    ops[0x21] = op!(0x21, AND, INDX, 2, 6, 0, "AND");
    ops[0x31] = op!(0x31, AND, INDY, 2, 5, 1, "AND");

    // ASL - Arithmetic Shift Left
    ops[0x0A] = op!(0x0A, ASL, ACC, 1, 2, 0, "ASL");
    ops[0x06] = op!(0x06, ASL, ZP, 2, 5, 0, "ASL");
    ops[0x16] = op!(0x16, ASL, ZPX, 2, 6, 0, "ASL");
    ops[0x0E] = op!(0x0E, ASL, ABS, 3, 6, 0, "ASL");
    ops[0x1E] = op!(0x1E, ASL, ABSX, 3, 7, 0, "ASL");

    // Branches: +1 cycle when taken, +1 more on page crossing, charged by
    // the branch action itself rather than the table penalty column.
    ops[0x90] = op!(0x90, BCC, REL, 2, 2, 0, "BCC");
    ops[0xB0] = op!(0xB0, BCS, REL, 2, 2, 0, "BCS");
    ops[0xF0] = op!(0xF0, BEQ, REL, 2, 2, 0, "BEQ");
    ops[0x30] = op!(0x30, BMI, REL, 2, 2, 0, "BMI");
    ops[0xD0] = op!(0xD0, BNE, REL, 2, 2, 0, "BNE");
    ops[0x10] = op!(0x10, BPL, REL, 2, 2, 0, "BPL");
    ops[0x50] = op!(0x50, BVC, REL, 2, 2, 0, "BVC");
    ops[0x70] = op!(0x70, BVS, REL, 2, 2, 0, "BVS");

    // BIT - Bit Test
    ops[0x24] = op!(0x24, BIT, ZP, 2, 3, 0, "BIT");
    ops[0x2C] = op!(0x2C, BIT, ABS, 3, 4, 0, "BIT");

    // BRK - Force Interrupt
    ops[0x00] = op!(0x00, BRK, 1, 7, "BRK");

    // Flag clears
    ops[0x18] = op!(0x18, CLC, 1, 2, "CLC");
    ops[0xD8] = op!(0xD8, CLD, 1, 2, "CLD");
    ops[0x58] = op!(0x58, CLI, 1, 2, "CLI");
    ops[0xB8] = op!(0xB8, CLV, 1, 2, "CLV");

    // CMP - Compare A
    ops[0xC9] = op!(0xC9, CMP, IMM, 2, 2, 0, "CMP");
    ops[0xC5] = op!(0xC5, CMP, ZP, 2, 3, 0, "CMP");
    ops[0xD5] = op!(0xD5, CMP, ZPX, 2, 4, 0, "CMP");
    ops[0xCD] = op!(0xCD, CMP, ABS, 3, 4, 0, "CMP");
    ops[0xDD] = op!(0xDD, CMP, ABSX, 3, 4, 1, "CMP");
    ops[0xD9] = op!(0xD9, CMP, ABSY, 3, 4, 1, "CMP");
    ops[0xC1] = op!(0xC1, CMP, INDX, 2, 6, 0, "CMP");
    ops[0xD1] = op!(0xD1, CMP, INDY, 2, 5, 1, "CMP");

    // CPX - Compare X
    ops[0xE0] = op!(0xE0, CPX, IMM, 2, 2, 0, "CPX");
    ops[0xE4] = op!(0xE4, CPX, ZP, 2, 3, 0, "CPX");
    ops[0xEC] = op!(0xEC, CPX, ABS, 3, 4, 0, "CPX");

    // CPY - Compare Y
    ops[0xC0] = op!(0xC0, CPY, IMM, 2, 2, 0, "CPY");
    ops[0xC4] = op!(0xC4, CPY, ZP, 2, 3, 0, "CPY");
    ops[0xCC] = op!(0xCC, CPY, ABS, 3, 4, 0, "CPY");

    // DEC - Decrement Memory
    ops[0xC6] = op!(0xC6, DEC, ZP, 2, 5, 0, "DEC");
    ops[0xD6] = op!(0xD6, DEC, ZPX, 2, 6, 0, "DEC");
    ops[0xCE] = op!(0xCE, DEC, ABS, 3, 6, 0, "DEC");
    ops[0xDE] = op!(0xDE, DEC, ABSX, 3, 7, 0, "DEC");

    ops[0xCA] = op!(0xCA, DEX, 1, 2, "DEX");
    ops[0x88] = op!(0x88, DEY, 1, 2, "DEY");

    // EOR - Bitwise Exclusive OR
    ops[0x49] = op!(0x49, EOR, IMM, 2, 2, 0, "EOR");
    ops[0x45] = op!(0x45, EOR, ZP, 2, 3, 0, "EOR");
    ops[0x55] = op!(0x55, EOR, ZPX, 2, 4, 0, "EOR");
    ops[0x4D] = op!(0x4D, EOR, ABS, 3, 4, 0, "EOR");
    ops[0x5D] = op!(0x5D, EOR, ABSX, 3, 4, 1, "EOR");
    ops[0x59] = op!(0x59, EOR, ABSY, 3, 4, 1, "EOR");
    ops[0x41] = op!(0x41, EOR, INDX, 2, 6, 0, "EOR");
    ops[0x51] = op!(0x51, EOR, INDY, 2, 5, 1, "EOR");

    // INC - Increment Memory
    ops[0xE6] = op!(0xE6, INC, ZP, 2, 5, 0, "INC");
    ops[0xF6] = op!(0xF6, INC, ZPX, 2, 6, 0, "INC");
    ops[0xEE] = op!(0xEE, INC, ABS, 3, 6, 0, "INC");
    ops[0xFE] = op!(0xFE, INC, ABSX, 3, 7, 0, "INC");

    ops[0xE8] = op!(0xE8, INX, 1, 2, "INX");
    ops[0xC8] = op!(0xC8, INY, 1, 2, "INY");

    // JMP - Jump
    ops[0x4C] = op!(0x4C, JMP, ABS, 3, 3, 0, "JMP");
    ops[0x6C] = op!(0x6C, JMP, IND, 3, 5, 0, "JMP");

    // JSR - Jump to Subroutine
    ops[0x20] = op!(0x20, JSR, ABS, 3, 6, 0, "JSR");

    // LDA - Load A
    ops[0xA9] = op!(0xA9, LDA, IMM, 2, 2, 0, "LDA");
    ops[0xA5] = op!(0xA5, LDA, ZP, 2, 3, 0, "LDA");
    ops[0xB5] = op!(0xB5, LDA, ZPX, 2, 4, 0, "LDA");
    ops[0xAD] = op!(0xAD, LDA, ABS, 3, 4, 0, "LDA");
    ops[0xBD] = op!(0xBD, LDA, ABSX, 3, 4, 1, "LDA");
    ops[0xB9] = op!(0xB9, LDA, ABSY, 3, 4, 1, "LDA");
    ops[0xA1] = op!(0xA1, LDA, INDX, 2, 6, 0, "LDA");
    ops[0xB1] = op!(0xB1, LDA, INDY, 2, 5, 1, "LDA");

    // LDX - Load X
    ops[0xA2] = op!(0xA2, LDX, IMM, 2, 2, 0, "LDX");
    ops[0xA6] = op!(0xA6, LDX, ZP, 2, 3, 0, "LDX");
    ops[0xB6] = op!(0xB6, LDX, ZPY, 2, 4, 0, "LDX");
    ops[0xAE] = op!(0xAE, LDX, ABS, 3, 4, 0, "LDX");
    ops[0xBE] = op!(0xBE, LDX, ABSY, 3, 4, 1, "LDX");

    // LDY - Load Y
    ops[0xA0] = op!(0xA0, LDY, IMM, 2, 2, 0, "LDY");
    ops[0xA4] = op!(0xA4, LDY, ZP, 2, 3, 0, "LDY");
    ops[0xB4] = op!(0xB4, LDY, ZPX, 2, 4, 0, "LDY");
    ops[0xAC] = op!(0xAC, LDY, ABS, 3, 4, 0, "LDY");
    ops[0xBC] = op!(0xBC, LDY, ABSX, 3, 4, 1, "LDY");

    // LSR - Logical Shift Right
    ops[0x4A] = op!(0x4A, LSR, ACC, 1, 2, 0, "LSR");
    ops[0x46] = op!(0x46, LSR, ZP, 2, 5, 0, "LSR");
    ops[0x56] = op!(0x56, LSR, ZPX, 2, 6, 0, "LSR");
    ops[0x4E] = op!(0x4E, LSR, ABS, 3, 6, 0, "LSR");
    ops[0x5E] = op!(0x5E, LSR, ABSX, 3, 7, 0, "LSR");

    // NOP - No Operation
    ops[0xEA] = op!(0xEA, NOP, 1, 2, "NOP");

    // ORA - Bitwise OR
    ops[0x09] = op!(0x09, ORA, IMM, 2, 2, 0, "ORA");
    ops[0x05] = op!(0x05, ORA, ZP, 2, 3, 0, "ORA");
    ops[0x15] = op!(0x15, ORA, ZPX, 2, 4, 0, "ORA");
    ops[0x0D] = op!(0x0D, ORA, ABS, 3, 4, 0, "ORA");
    ops[0x1D] = op!(0x1D, ORA, ABSX, 3, 4, 1, "ORA");
    ops[0x19] = op!(0x19, ORA, ABSY, 3, 4, 1, "ORA");
    ops[0x01] = op!(0x01, ORA, INDX, 2, 6, 0, "ORA");
    ops[0x11] = op!(0x11, ORA, INDY, 2, 5, 1, "ORA");

    // Stack pushes and pulls
    ops[0x48] = op!(0x48, PHA, 1, 3, "PHA");
    ops[0x08] = op!(0x08, PHP, 1, 3, "PHP");
    ops[0x68] = op!(0x68, PLA, 1, 4, "PLA");
    ops[0x28] = op!(0x28, PLP, 1, 4, "PLP");

    // ROL - Rotate Left
    ops[0x2A] = op!(0x2A, ROL, ACC, 1, 2, 0, "ROL");
    ops[0x26] = op!(0x26, ROL, ZP, 2, 5, 0, "ROL");
    ops[0x36] = op!(0x36, ROL, ZPX, 2, 6, 0, "ROL");
    ops[0x2E] = op!(0x2E, ROL, ABS, 3, 6, 0, "ROL");
    ops[0x3E] = op!(0x3E, ROL, ABSX, 3, 7, 0, "ROL");

    // ROR - Rotate Right
    ops[0x6A] = op!(0x6A, ROR, ACC, 1, 2, 0, "ROR");
    ops[0x66] = op!(0x66, ROR, ZP, 2, 5, 0, "ROR");
    ops[0x76] = op!(0x76, ROR, ZPX, 2, 6, 0, "ROR");
    ops[0x6E] = op!(0x6E, ROR, ABS, 3, 6, 0, "ROR");
    ops[0x7E] = op!(0x7E, ROR, ABSX, 3, 7, 0, "ROR");

    // Interrupt and subroutine returns
    ops[0x40] = op!(0x40, RTI, 1, 6, "RTI");
    ops[0x60] = op!(0x60, RTS, 1, 6, "RTS");

    // SBC - Subtract with Carry
    ops[0xE9] = op!(0xE9, SBC, IMM, 2, 2, 0, "SBC");
    ops[0xE5] = op!(0xE5, SBC, ZP, 2, 3, 0, "SBC");
    ops[0xF5] = op!(0xF5, SBC, ZPX, 2, 4, 0, "SBC");
    ops[0xED] = op!(0xED, SBC, ABS, 3, 4, 0, "SBC");
    ops[0xFD] = op!(0xFD, SBC, ABSX, 3, 4, 1, "SBC");
    ops[0xF9] = op!(0xF9, SBC, ABSY, 3, 4, 1, "SBC");
    ops[0xE1] = op!(0xE1, SBC, INDX, 2, 6, 0, "SBC");
    ops[0xF1] = op!(0xF1, SBC, INDY, 2, 5, 1, "SBC");

    // Flag sets
    ops[0x38] = op!(0x38, SEC, 1, 2, "SEC");
    ops[0xF8] = op!(0xF8, SED, 1, 2, "SED");
    ops[0x78] = op!(0x78, SEI, 1, 2, "SEI");

    // STA - Store A
    ops[0x85] = op!(0x85, STA, ZP, 2, 3, 0, "STA");
    ops[0x95] = op!(0x95, STA, ZPX, 2, 4, 0, "STA");
    ops[0x8D] = op!(0x8D, STA, ABS, 3, 4, 0, "STA");
    ops[0x9D] = op!(0x9D, STA, ABSX, 3, 5, 0, "STA");
    ops[0x99] = op!(0x99, STA, ABSY, 3, 5, 0, "STA");
    ops[0x81] = op!(0x81, STA, INDX, 2, 6, 0, "STA");
    ops[0x91] = op!(0x91, STA, INDY, 2, 6, 0, "STA");

    // STX - Store X
    ops[0x86] = op!(0x86, STX, ZP, 2, 3, 0, "STX");
    ops[0x96] = op!(0x96, STX, ZPY, 2, 4, 0, "STX");
    ops[0x8E] = op!(0x8E, STX, ABS, 3, 4, 0, "STX");

    // STY - Store Y
    ops[0x84] = op!(0x84, STY, ZP, 2, 3, 0, "STY");
    ops[0x94] = op!(0x94, STY, ZPX, 2, 4, 0, "STY");
    ops[0x8C] = op!(0x8C, STY, ABS, 3, 4, 0, "STY");

    // Register transfers
    ops[0xAA] = op!(0xAA, TAX, 1, 2, "TAX");
    ops[0xA8] = op!(0xA8, TAY, 1, 2, "TAY");
    ops[0xBA] = op!(0xBA, TSX, 1, 2, "TSX");
    ops[0x8A] = op!(0x8A, TXA, 1, 2, "TXA");
    ops[0x9A] = op!(0x9A, TXS, 1, 2, "TXS");
    ops[0x98] = op!(0x98, TYA, 1, 2, "TYA");

    // Documented illegal NOPs. They still consume their operand bytes, so
    // the declared size must advance PC past them.
    ops[0x04] = op!(0x04, NOP, ZP, 2, 3, 0, "NOP");
    ops[0x44] = op!(0x44, NOP, ZP, 2, 3, 0, "NOP");
    ops[0x64] = op!(0x64, NOP, ZP, 2, 3, 0, "NOP");
    ops[0x14] = op!(0x14, NOP, ZPX, 2, 4, 0, "NOP");
    ops[0x34] = op!(0x34, NOP, ZPX, 2, 4, 0, "NOP");
    ops[0x54] = op!(0x54, NOP, ZPX, 2, 4, 0, "NOP");
    ops[0x74] = op!(0x74, NOP, ZPX, 2, 4, 0, "NOP");
    ops[0xD4] = op!(0xD4, NOP, ZPX, 2, 4, 0, "NOP");
    ops[0xF4] = op!(0xF4, NOP, ZPX, 2, 4, 0, "NOP");
    ops[0x1A] = op!(0x1A, NOP, 1, 2, "NOP");
    ops[0x3A] = op!(0x3A, NOP, 1, 2, "NOP");
    ops[0x5A] = op!(0x5A, NOP, 1, 2, "NOP");
    ops[0x7A] = op!(0x7A, NOP, 1, 2, "NOP");
    ops[0xDA] = op!(0xDA, NOP, 1, 2, "NOP");
    ops[0xFA] = op!(0xFA, NOP, 1, 2, "NOP");
    ops[0x80] = op!(0x80, NOP, IMM, 2, 2, 0, "NOP");
    ops[0x82] = op!(0x82, NOP, IMM, 2, 2, 0, "NOP");
    ops[0x89] = op!(0x89, NOP, IMM, 2, 2, 0, "NOP");
    ops[0xC2] = op!(0xC2, NOP, IMM, 2, 2, 0, "NOP");
    ops[0xE2] = op!(0xE2, NOP, IMM, 2, 2, 0, "NOP");
    ops[0x0C] = op!(0x0C, NOP, 3, 4, "NOP");
    ops[0x1C] = op!(0x1C, NOP, 3, 5, "NOP");
    ops[0x3C] = op!(0x3C, NOP, 3, 5, "NOP");
    ops[0x5C] = op!(0x5C, NOP, 3, 5, "NOP");
    ops[0x7C] = op!(0x7C, NOP, 3, 5, "NOP");
    ops[0xDC] = op!(0xDC, NOP, 3, 5, "NOP");
    ops[0xFC] = op!(0xFC, NOP, 3, 5, "NOP");

    ops
};

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_match_their_slot() {
        for (idx, op) in OPS.iter().enumerate() {
            if let Some(op) = op {
                assert_eq!(op.code as usize, idx, "entry {:#04X} mislabelled", idx);
            }
        }
    }

    #[test]
    fn sizes_are_sane() {
        for op in OPS.iter().flatten() {
            assert!((1..=3).contains(&op.size), "{} has size {}", op.code, op.size);
            assert!(op.cycles >= 2, "{:#04X} has cycles {}", op.code, op.cycles);
        }
    }

    #[test]
    fn branches_are_relative_two_bytes() {
        for op in OPS.iter().flatten() {
            if matches!(
                op.family,
                OpFamily::BCC
                    | OpFamily::BCS
                    | OpFamily::BEQ
                    | OpFamily::BMI
                    | OpFamily::BNE
                    | OpFamily::BPL
                    | OpFamily::BVC
                    | OpFamily::BVS
            ) {
                assert_eq!(op.mode, AddressMode::REL);
                assert_eq!(op.size, 2);
                assert_eq!(op.cycles, 2);
            }
        }
    }

    #[test]
    fn page_penalties_only_on_indexed_reads() {
        for op in OPS.iter().flatten() {
            if op.page_cycles != 0 {
                assert!(matches!(
                    op.mode,
                    AddressMode::ABSX | AddressMode::ABSY | AddressMode::INDY
                ));
                // Stores always pay the fixed worst case instead.
                assert!(!matches!(op.family, OpFamily::STA));
            }
        }
    }
}
