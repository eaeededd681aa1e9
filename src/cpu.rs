use bitflags::bitflags;

use crate::{
    Mem,
    opcodes::{AddressMode::*, OPS, Op, OpFamily::*, UNDEFINED_NOP},
};

const STACK_BASE: u16 = 0x0100;
const STACK_RESET: u8 = 0xFD;
const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

bitflags! {
    // 7  bit  0
    // ---- ----
    // NV1B DIZC
    // |||| ||||
    // |||| |||+- Carry
    // |||| ||+-- Zero
    // |||| |+--- Interrupt Disable
    // |||| +---- Decimal
    // |||+------ (No CPU effect; see: the B flag)
    // ||+------- (No CPU effect; always pushed as 1)
    // |+-------- Overflow
    // +--------- Negative
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpuFlags: u8 {
        const CARRY        = 0b00000001;
        const ZERO         = 0b00000010;
        const INTR_DISABLE = 0b00000100;
        const DECIMAL      = 0b00001000;
        const BREAK        = 0b00010000;
        const BREAK2       = 0b00100000;
        const OVERFLOW     = 0b01000000;
        const NEGATIVE     = 0b10000000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    None,
    Nmi,
    Irq,
}

/// 6502 interpreter.
///
/// Instructions execute atomically; their cost is spread over master ticks
/// by counting down `remaining`, so sub-instruction bus timing is not
/// modelled.
pub struct Cpu<M: Mem> {
    pub pc: u16,
    pub reg_a: u8,
    pub reg_x: u8,
    pub reg_y: u8,
    pub sp: u8,
    pub status: CpuFlags,
    pub cycles: u64,
    remaining: u64,
    pending: Interrupt,
    pub bus: M,
}

impl<M: Mem> Cpu<M> {
    pub fn new(bus: M) -> Self {
        Cpu {
            pc: 0,
            reg_a: 0,
            reg_x: 0,
            reg_y: 0,
            sp: STACK_RESET,
            status: CpuFlags::from_bits_retain(0x34),
            cycles: 0,
            remaining: 0,
            pending: Interrupt::None,
            bus,
        }
    }

    /// https://wiki.nesdev.org/w/index.php?title=CPU_power_up_state
    pub fn power_up(&mut self) {
        self.status = CpuFlags::from_bits_retain(0x34);
        self.reg_a = 0;
        self.reg_x = 0;
        self.reg_y = 0;
        self.sp = STACK_RESET;
        self.pc = self.bus.read_u16(RESET_VECTOR);
        self.cycles = 7; // warm-up
        self.remaining = 0;
        self.pending = Interrupt::None;
    }

    pub fn reset(&mut self) {
        self.pc = self.bus.read_u16(RESET_VECTOR);
        self.sp = STACK_RESET;
        self.status.insert(CpuFlags::INTR_DISABLE);
        self.remaining = 0;
        self.pending = Interrupt::None;
    }

    pub fn request_nmi(&mut self) {
        self.pending = Interrupt::Nmi;
    }

    /// IRQs are level-checked at request time: a set I flag drops them.
    pub fn request_irq(&mut self) {
        if !self.status.contains(CpuFlags::INTR_DISABLE) {
            self.pending = Interrupt::Irq;
        }
    }

    /// Advance one master cycle. A new instruction (or pending interrupt)
    /// is only dispatched once the previous one has paid off its cost.
    pub fn tick(&mut self) {
        if self.remaining == 0 {
            match self.pending {
                Interrupt::None => {
                    self.remaining = self.step();
                }
                Interrupt::Nmi => {
                    self.service_interrupt(NMI_VECTOR);
                    self.pending = Interrupt::None;
                    self.remaining = 7;
                }
                Interrupt::Irq => {
                    self.service_interrupt(IRQ_VECTOR);
                    self.pending = Interrupt::None;
                    self.remaining = 7;
                }
            }
        }
        self.remaining -= 1;
    }

    /// Fetch, decode and execute one instruction; returns the cycles spent,
    /// including page-crossing penalties, branch adjustments and any OAM-DMA
    /// stall the instruction triggered.
    pub fn step(&mut self) -> u64 {
        let start = self.cycles;

        let code = self.bus.read_u8(self.pc);
        let op = OPS[code as usize].unwrap_or(Op {
            code,
            ..UNDEFINED_NOP
        });

        let (addr, page_crossed) = self.operand_addr(&op);

        self.pc = self.pc.wrapping_add(op.size as u16);
        self.cycles += op.cycles as u64;
        if page_crossed {
            self.cycles += op.page_cycles as u64;
        }

        self.run_op(&op, addr, page_crossed);

        if self.bus.take_dma_stall() {
            self.cycles += 513;
            // DMA completion aligns to an even CPU cycle.
            if self.cycles % 2 == 1 {
                self.cycles += 1;
            }
        }

        self.cycles - start
    }

    fn service_interrupt(&mut self, vector: u16) {
        self.push_stack_u16(self.pc);
        let mut flags = self.status;
        flags.remove(CpuFlags::BREAK);
        flags.insert(CpuFlags::BREAK2);
        self.push_stack(flags.bits());
        self.status.insert(CpuFlags::INTR_DISABLE);
        self.pc = self.bus.read_u16(vector);
        self.cycles += 7;
    }

    /// Resolve the operand address and whether indexing carried into the
    /// high address byte. PC still points at the opcode here.
    pub fn operand_addr(&mut self, op: &Op) -> (u16, bool) {
        match op.mode {
            IMP | ACC => (0, false),
            IMM => (self.pc.wrapping_add(1), false),
            ZP => (self.bus.read_u8(self.pc.wrapping_add(1)) as u16, false),
            ZPX => {
                let base = self.bus.read_u8(self.pc.wrapping_add(1));
                (base.wrapping_add(self.reg_x) as u16, false)
            }
            ZPY => {
                let base = self.bus.read_u8(self.pc.wrapping_add(1));
                (base.wrapping_add(self.reg_y) as u16, false)
            }
            ABS => (self.bus.read_u16(self.pc.wrapping_add(1)), false),
            ABSX => {
                let base = self.bus.read_u16(self.pc.wrapping_add(1));
                let addr = base.wrapping_add(self.reg_x as u16);
                (addr, Self::page_crossed(base, addr))
            }
            ABSY => {
                let base = self.bus.read_u16(self.pc.wrapping_add(1));
                let addr = base.wrapping_add(self.reg_y as u16);
                (addr, Self::page_crossed(base, addr))
            }
            IND => {
                let ptr = self.bus.read_u16(self.pc.wrapping_add(1));
                (self.bus.read_u16_pagewrap(ptr), false)
            }
            INDX => {
                let ptr = self.bus.read_u8(self.pc.wrapping_add(1)).wrapping_add(self.reg_x);
                (self.bus.read_u16_pagewrap(ptr as u16), false)
            }
            INDY => {
                let ptr = self.bus.read_u8(self.pc.wrapping_add(1));
                let base = self.bus.read_u16_pagewrap(ptr as u16);
                let addr = base.wrapping_add(self.reg_y as u16);
                (addr, Self::page_crossed(base, addr))
            }
            REL => {
                let displacement = self.bus.read_u8(self.pc.wrapping_add(1)) as i8;
                let base = self.pc.wrapping_add(2);
                let addr = base.wrapping_add(displacement as i16 as u16);
                (addr, Self::page_crossed(base, addr))
            }
        }
    }

    fn page_crossed(a: u16, b: u16) -> bool {
        (a & 0xFF00) != (b & 0xFF00)
    }

    fn push_stack(&mut self, val: u8) {
        self.bus.write_u8(STACK_BASE + self.sp as u16, val);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop_stack(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.bus.read_u8(STACK_BASE + self.sp as u16)
    }

    fn push_stack_u16(&mut self, val: u16) {
        let bytes = val.to_le_bytes();
        self.push_stack(bytes[1]);
        self.push_stack(bytes[0]);
    }

    fn pop_stack_u16(&mut self) -> u16 {
        let lo = self.pop_stack();
        let hi = self.pop_stack();
        u16::from_le_bytes([lo, hi])
    }

    fn update_nz(&mut self, val: u8) {
        self.status.set(CpuFlags::ZERO, val == 0);
        self.status.set(CpuFlags::NEGATIVE, val & 0x80 != 0);
    }

    fn add_to_a(&mut self, val: u8) {
        let carry = self.status.contains(CpuFlags::CARRY) as u16;
        let sum = self.reg_a as u16 + val as u16 + carry;

        self.status.set(CpuFlags::CARRY, sum > 0xFF);

        let result = sum as u8;
        self.status.set(
            CpuFlags::OVERFLOW,
            (self.reg_a ^ val) & 0x80 == 0 && (self.reg_a ^ result) & 0x80 != 0,
        );

        self.reg_a = result;
        self.update_nz(self.reg_a);
    }

    fn compare(&mut self, reg: u8, val: u8) {
        let (result, borrow) = reg.overflowing_sub(val);
        self.status.set(CpuFlags::CARRY, !borrow);
        self.update_nz(result);
    }

    fn branch_if(&mut self, condition: bool, addr: u16, page_crossed: bool) {
        if condition {
            self.pc = addr;
            self.cycles += 1;
            if page_crossed {
                self.cycles += 1;
            }
        }
    }

    fn pull_status(&mut self) {
        let mut status = CpuFlags::from_bits_retain(self.pop_stack());
        status.remove(CpuFlags::BREAK);
        status.insert(CpuFlags::BREAK2);
        self.status = status;
    }

    fn run_op(&mut self, op: &Op, addr: u16, page_crossed: bool) {
        match op.family {
            ADC => {
                let val = self.bus.read_u8(addr);
                self.add_to_a(val);
            }
            SBC => {
                // ADC with the one's complement of the operand.
                let val = self.bus.read_u8(addr);
                self.add_to_a(val ^ 0xFF);
            }
            AND => {
                self.reg_a &= self.bus.read_u8(addr);
                self.update_nz(self.reg_a);
            }
            ORA => {
                self.reg_a |= self.bus.read_u8(addr);
                self.update_nz(self.reg_a);
            }
            EOR => {
                self.reg_a ^= self.bus.read_u8(addr);
                self.update_nz(self.reg_a);
            }
            ASL => {
                let src = if op.mode == ACC {
                    self.reg_a
                } else {
                    self.bus.read_u8(addr)
                };
                self.status.set(CpuFlags::CARRY, src & 0x80 != 0);
                let result = src << 1;
                self.update_nz(result);
                if op.mode == ACC {
                    self.reg_a = result;
                } else {
                    self.bus.write_u8(addr, result);
                }
            }
            LSR => {
                let src = if op.mode == ACC {
                    self.reg_a
                } else {
                    self.bus.read_u8(addr)
                };
                self.status.set(CpuFlags::CARRY, src & 0x01 != 0);
                let result = src >> 1;
                self.update_nz(result);
                if op.mode == ACC {
                    self.reg_a = result;
                } else {
                    self.bus.write_u8(addr, result);
                }
            }
            ROL => {
                let src = if op.mode == ACC {
                    self.reg_a
                } else {
                    self.bus.read_u8(addr)
                };
                let result = (src << 1) | self.status.contains(CpuFlags::CARRY) as u8;
                self.status.set(CpuFlags::CARRY, src & 0x80 != 0);
                self.update_nz(result);
                if op.mode == ACC {
                    self.reg_a = result;
                } else {
                    self.bus.write_u8(addr, result);
                }
            }
            ROR => {
                let src = if op.mode == ACC {
                    self.reg_a
                } else {
                    self.bus.read_u8(addr)
                };
                let result = (src >> 1) | ((self.status.contains(CpuFlags::CARRY) as u8) << 7);
                self.status.set(CpuFlags::CARRY, src & 0x01 != 0);
                self.update_nz(result);
                if op.mode == ACC {
                    self.reg_a = result;
                } else {
                    self.bus.write_u8(addr, result);
                }
            }
            BCC => self.branch_if(!self.status.contains(CpuFlags::CARRY), addr, page_crossed),
            BCS => self.branch_if(self.status.contains(CpuFlags::CARRY), addr, page_crossed),
            BEQ => self.branch_if(self.status.contains(CpuFlags::ZERO), addr, page_crossed),
            BNE => self.branch_if(!self.status.contains(CpuFlags::ZERO), addr, page_crossed),
            BMI => self.branch_if(self.status.contains(CpuFlags::NEGATIVE), addr, page_crossed),
            BPL => self.branch_if(!self.status.contains(CpuFlags::NEGATIVE), addr, page_crossed),
            BVS => self.branch_if(self.status.contains(CpuFlags::OVERFLOW), addr, page_crossed),
            BVC => self.branch_if(!self.status.contains(CpuFlags::OVERFLOW), addr, page_crossed),
            BIT => {
                let val = self.bus.read_u8(addr);
                self.status.set(CpuFlags::ZERO, self.reg_a & val == 0);
                self.status.set(CpuFlags::OVERFLOW, val & 0x40 != 0);
                self.status.set(CpuFlags::NEGATIVE, val & 0x80 != 0);
            }
            BRK => {
                self.push_stack_u16(self.pc);
                self.push_stack((self.status | CpuFlags::BREAK | CpuFlags::BREAK2).bits());
                self.status.insert(CpuFlags::INTR_DISABLE);
                self.pc = self.bus.read_u16(IRQ_VECTOR);
            }
            RTI => {
                self.pull_status();
                self.pc = self.pop_stack_u16();
            }
            CLC => self.status.remove(CpuFlags::CARRY),
            CLD => self.status.remove(CpuFlags::DECIMAL),
            CLI => self.status.remove(CpuFlags::INTR_DISABLE),
            CLV => self.status.remove(CpuFlags::OVERFLOW),
            SEC => self.status.insert(CpuFlags::CARRY),
            SED => self.status.insert(CpuFlags::DECIMAL),
            SEI => self.status.insert(CpuFlags::INTR_DISABLE),
            CMP => {
                let val = self.bus.read_u8(addr);
                self.compare(self.reg_a, val);
            }
            CPX => {
                let val = self.bus.read_u8(addr);
                self.compare(self.reg_x, val);
            }
            CPY => {
                let val = self.bus.read_u8(addr);
                self.compare(self.reg_y, val);
            }
            DEC => {
                let val = self.bus.read_u8(addr).wrapping_sub(1);
                self.update_nz(val);
                self.bus.write_u8(addr, val);
            }
            INC => {
                let val = self.bus.read_u8(addr).wrapping_add(1);
                self.update_nz(val);
                self.bus.write_u8(addr, val);
            }
            DEX => {
                self.reg_x = self.reg_x.wrapping_sub(1);
                self.update_nz(self.reg_x);
            }
            DEY => {
                self.reg_y = self.reg_y.wrapping_sub(1);
                self.update_nz(self.reg_y);
            }
            INX => {
                self.reg_x = self.reg_x.wrapping_add(1);
                self.update_nz(self.reg_x);
            }
            INY => {
                self.reg_y = self.reg_y.wrapping_add(1);
                self.update_nz(self.reg_y);
            }
            JMP => {
                self.pc = addr;
            }
            JSR => {
                // PC already sits past the operand; the stack records the
                // address of the JSR's last byte.
                self.push_stack_u16(self.pc.wrapping_sub(1));
                self.pc = addr;
            }
            RTS => {
                self.pc = self.pop_stack_u16().wrapping_add(1);
            }
            LDA => {
                self.reg_a = self.bus.read_u8(addr);
                self.update_nz(self.reg_a);
            }
            LDX => {
                self.reg_x = self.bus.read_u8(addr);
                self.update_nz(self.reg_x);
            }
            LDY => {
                self.reg_y = self.bus.read_u8(addr);
                self.update_nz(self.reg_y);
            }
            STA => self.bus.write_u8(addr, self.reg_a),
            STX => self.bus.write_u8(addr, self.reg_x),
            STY => self.bus.write_u8(addr, self.reg_y),
            NOP => {}
            PHA => self.push_stack(self.reg_a),
            PHP => {
                self.push_stack((self.status | CpuFlags::BREAK | CpuFlags::BREAK2).bits());
            }
            PLA => {
                self.reg_a = self.pop_stack();
                self.update_nz(self.reg_a);
            }
            PLP => self.pull_status(),
            TAX => {
                self.reg_x = self.reg_a;
                self.update_nz(self.reg_x);
            }
            TAY => {
                self.reg_y = self.reg_a;
                self.update_nz(self.reg_y);
            }
            TSX => {
                self.reg_x = self.sp;
                self.update_nz(self.reg_x);
            }
            TXA => {
                self.reg_a = self.reg_x;
                self.update_nz(self.reg_a);
            }
            TXS => self.sp = self.reg_x,
            TYA => {
                self.reg_a = self.reg_y;
                self.update_nz(self.reg_a);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    struct FlatMem {
        ram: Vec<u8>,
    }

    impl FlatMem {
        fn new() -> Self {
            FlatMem {
                ram: vec![0; 0x10000],
            }
        }
    }

    impl Mem for FlatMem {
        fn read_u8(&mut self, addr: u16) -> u8 {
            self.ram[addr as usize]
        }
        fn write_u8(&mut self, addr: u16, val: u8) {
            self.ram[addr as usize] = val;
        }
    }

    const ORG: u16 = 0x8000;

    fn cpu_with_program(program: &[u8]) -> Cpu<FlatMem> {
        let mut mem = FlatMem::new();
        mem.ram[ORG as usize..ORG as usize + program.len()].copy_from_slice(program);
        mem.write_u16(RESET_VECTOR, ORG);
        let mut cpu = Cpu::new(mem);
        cpu.power_up();
        cpu
    }

    #[test]
    fn power_up_state() {
        let cpu = cpu_with_program(&[]);
        assert_eq!(cpu.status.bits(), 0x34);
        assert_eq!(cpu.sp, 0xFD);
        assert_eq!(cpu.cycles, 7);
        assert_eq!(cpu.pc, ORG);
    }

    #[test]
    fn lda_immediate_sets_flags() {
        let mut cpu = cpu_with_program(&[0xA9, 0x00, 0xA9, 0x80]);
        let spent = cpu.step();
        assert_eq!(spent, 2);
        assert!(cpu.status.contains(CpuFlags::ZERO));
        cpu.step();
        assert_eq!(cpu.reg_a, 0x80);
        assert!(cpu.status.contains(CpuFlags::NEGATIVE));
        assert!(!cpu.status.contains(CpuFlags::ZERO));
    }

    #[test]
    fn adc_carry_and_overflow() {
        let mut cpu = cpu_with_program(&[0x69, 0x50]);
        cpu.reg_a = 0x50;
        cpu.step();
        assert_eq!(cpu.reg_a, 0xA0);
        assert!(cpu.status.contains(CpuFlags::OVERFLOW));
        assert!(!cpu.status.contains(CpuFlags::CARRY));

        let mut cpu = cpu_with_program(&[0x69, 0x01]);
        cpu.reg_a = 0xFF;
        cpu.step();
        assert_eq!(cpu.reg_a, 0x00);
        assert!(cpu.status.contains(CpuFlags::CARRY));
        assert!(cpu.status.contains(CpuFlags::ZERO));
        assert!(!cpu.status.contains(CpuFlags::OVERFLOW));
    }

    #[test]
    fn sbc_borrow() {
        // SEC; SBC #$10
        let mut cpu = cpu_with_program(&[0x38, 0xE9, 0x10]);
        cpu.reg_a = 0x50;
        cpu.step();
        cpu.step();
        assert_eq!(cpu.reg_a, 0x40);
        assert!(cpu.status.contains(CpuFlags::CARRY));

        let mut cpu = cpu_with_program(&[0x38, 0xE9, 0x60]);
        cpu.reg_a = 0x50;
        cpu.step();
        cpu.step();
        assert_eq!(cpu.reg_a, 0xF0);
        assert!(!cpu.status.contains(CpuFlags::CARRY));
    }

    #[test]
    fn cmp_carry_when_register_not_less() {
        let mut cpu = cpu_with_program(&[0xC9, 0x30]);
        cpu.reg_a = 0x40;
        cpu.step();
        assert!(cpu.status.contains(CpuFlags::CARRY));
        assert!(!cpu.status.contains(CpuFlags::ZERO));

        let mut cpu = cpu_with_program(&[0xC9, 0x50]);
        cpu.reg_a = 0x40;
        cpu.step();
        assert!(!cpu.status.contains(CpuFlags::CARRY));
    }

    #[test]
    fn bit_loads_operand_high_bits() {
        let mut cpu = cpu_with_program(&[0x24, 0x10]);
        cpu.bus.ram[0x10] = 0xC0;
        cpu.reg_a = 0x00;
        cpu.step();
        assert!(cpu.status.contains(CpuFlags::ZERO));
        assert!(cpu.status.contains(CpuFlags::OVERFLOW));
        assert!(cpu.status.contains(CpuFlags::NEGATIVE));
    }

    #[test]
    fn branch_not_taken_costs_two() {
        let mut cpu = cpu_with_program(&[0xF0, 0x05]);
        cpu.status.remove(CpuFlags::ZERO);
        let spent = cpu.step();
        assert_eq!(spent, 2);
        assert_eq!(cpu.pc, ORG + 2);
    }

    #[test]
    fn branch_taken_same_page_costs_three() {
        let mut cpu = cpu_with_program(&[0xF0, 0x05]);
        cpu.status.insert(CpuFlags::ZERO);
        let spent = cpu.step();
        assert_eq!(spent, 3);
        assert_eq!(cpu.pc, ORG + 2 + 5);
    }

    #[test]
    fn branch_taken_page_cross_costs_four() {
        // Branch at $80FB: next instruction is at $80FD, target $8107.
        let mut cpu = cpu_with_program(&[]);
        cpu.bus.ram[0x80FB] = 0xF0;
        cpu.bus.ram[0x80FC] = 0x0A;
        cpu.pc = 0x80FB;
        cpu.status.insert(CpuFlags::ZERO);
        let spent = cpu.step();
        assert_eq!(spent, 4);
        assert_eq!(cpu.pc, 0x8107);
    }

    #[test]
    fn indirect_jmp_wraps_within_page() {
        let mut cpu = cpu_with_program(&[0x6C, 0xFF, 0x30]);
        cpu.bus.ram[0x30FF] = 0x40;
        cpu.bus.ram[0x3000] = 0x80;
        cpu.bus.ram[0x3100] = 0x50;
        cpu.step();
        assert_eq!(cpu.pc, 0x8040);
    }

    #[test]
    fn indirect_y_pointer_wraps_in_zero_page() {
        let mut cpu = cpu_with_program(&[0xB1, 0xFF]);
        cpu.bus.ram[0x00FF] = 0x34;
        cpu.bus.ram[0x0000] = 0x12;
        cpu.bus.ram[0x1236] = 0x99;
        cpu.reg_y = 2;
        cpu.step();
        assert_eq!(cpu.reg_a, 0x99);
    }

    #[test]
    fn zero_page_x_wraps() {
        let mut cpu = cpu_with_program(&[0xB5, 0xFF]);
        cpu.bus.ram[0x0001] = 0x77;
        cpu.reg_x = 2;
        cpu.step();
        assert_eq!(cpu.reg_a, 0x77);
    }

    #[test]
    fn absolute_x_page_penalty() {
        let mut cpu = cpu_with_program(&[0xBD, 0xFF, 0x20]);
        cpu.reg_x = 1;
        let spent = cpu.step();
        assert_eq!(spent, 5);

        let mut cpu = cpu_with_program(&[0xBD, 0x00, 0x20]);
        cpu.reg_x = 1;
        let spent = cpu.step();
        assert_eq!(spent, 4);
    }

    #[test]
    fn store_never_pays_page_penalty() {
        let mut cpu = cpu_with_program(&[0x9D, 0xFF, 0x20]);
        cpu.reg_x = 1;
        let spent = cpu.step();
        assert_eq!(spent, 5);
        assert_eq!(cpu.bus.ram[0x2100], 0);
    }

    #[test]
    fn jsr_rts_round_trip() {
        let mut cpu = cpu_with_program(&[0x20, 0x00, 0x90]);
        cpu.bus.ram[0x9000] = 0x60; // RTS
        let spent = cpu.step();
        assert_eq!(spent, 6);
        assert_eq!(cpu.pc, 0x9000);
        assert_eq!(cpu.sp, 0xFB);
        // The stacked address is the JSR's final byte.
        assert_eq!(cpu.bus.ram[0x01FD], 0x80);
        assert_eq!(cpu.bus.ram[0x01FC], 0x02);

        let spent = cpu.step();
        assert_eq!(spent, 6);
        assert_eq!(cpu.pc, ORG + 3);
        assert_eq!(cpu.sp, 0xFD);
    }

    #[test]
    fn brk_rti_round_trip() {
        let mut cpu = cpu_with_program(&[0x00]);
        cpu.bus.write_u16(IRQ_VECTOR, 0x9000);
        cpu.bus.ram[0x9000] = 0x40; // RTI
        let flags_before = cpu.status;

        cpu.step();
        assert_eq!(cpu.pc, 0x9000);
        assert!(cpu.status.contains(CpuFlags::INTR_DISABLE));
        // Stack image carries B and the always-set bit.
        let pushed = cpu.bus.ram[0x01FB];
        assert_eq!(pushed & 0x30, 0x30);

        cpu.step();
        assert_eq!(cpu.pc, ORG + 1);
        assert_eq!(cpu.sp, 0xFD);
        let expected = (flags_before | CpuFlags::BREAK2) - CpuFlags::BREAK;
        assert_eq!(cpu.status, expected);
    }

    #[test]
    fn undefined_opcode_runs_as_two_cycle_nop() {
        let mut cpu = cpu_with_program(&[0x02]);
        let spent = cpu.step();
        assert_eq!(spent, 2);
        assert_eq!(cpu.pc, ORG + 1);
    }

    #[test]
    fn illegal_nops_consume_operands() {
        let mut cpu = cpu_with_program(&[0x0C, 0x34, 0x12]);
        let spent = cpu.step();
        assert_eq!(spent, 4);
        assert_eq!(cpu.pc, ORG + 3);

        let mut cpu = cpu_with_program(&[0x80, 0x42]);
        let spent = cpu.step();
        assert_eq!(spent, 2);
        assert_eq!(cpu.pc, ORG + 2);
    }

    #[test]
    fn tick_spreads_instruction_cost() {
        let mut cpu = cpu_with_program(&[0xA9, 0x01, 0xA9, 0x02]);
        cpu.tick();
        assert_eq!(cpu.pc, ORG + 2); // executed on the first tick
        cpu.tick();
        assert_eq!(cpu.pc, ORG + 2); // still paying for it
        cpu.tick();
        assert_eq!(cpu.pc, ORG + 4);
    }

    #[test]
    fn nmi_service_pushes_and_vectors() {
        let mut cpu = cpu_with_program(&[0xA9, 0x01]);
        cpu.bus.write_u16(NMI_VECTOR, 0x9000);
        let cycles_before = cpu.cycles;
        cpu.request_nmi();
        cpu.tick();
        assert_eq!(cpu.pc, 0x9000);
        assert_eq!(cpu.cycles - cycles_before, 7);
        assert!(cpu.status.contains(CpuFlags::INTR_DISABLE));
        // Interrupt stack frames push B clear.
        assert_eq!(cpu.bus.ram[0x01FB] & 0x10, 0);
    }

    #[test]
    fn irq_dropped_while_masked() {
        let mut cpu = cpu_with_program(&[0x58, 0xA9, 0x01]); // CLI; LDA #1
        cpu.bus.write_u16(IRQ_VECTOR, 0x9000);
        cpu.request_irq();
        assert_eq!(cpu.pending, Interrupt::None);

        cpu.step(); // CLI
        cpu.request_irq();
        assert_eq!(cpu.pending, Interrupt::Irq);
        cpu.tick();
        assert_eq!(cpu.pc, 0x9000);
    }

    proptest! {
        #[test]
        fn stack_byte_round_trips(val: u8) {
            let mut cpu = cpu_with_program(&[]);
            let sp_before = cpu.sp;
            cpu.push_stack(val);
            prop_assert_eq!(cpu.pop_stack(), val);
            prop_assert_eq!(cpu.sp, sp_before);
        }

        #[test]
        fn stack_addr_round_trips(val: u16) {
            let mut cpu = cpu_with_program(&[]);
            let sp_before = cpu.sp;
            cpu.push_stack_u16(val);
            prop_assert_eq!(cpu.pop_stack_u16(), val);
            prop_assert_eq!(cpu.sp, sp_before);
        }

        #[test]
        fn php_plp_round_trips_modulo_b_bits(bits: u8) {
            // PHP; PLP
            let mut cpu = cpu_with_program(&[0x08, 0x28]);
            cpu.status = CpuFlags::from_bits_retain(bits);
            cpu.step();
            cpu.step();
            prop_assert_eq!(cpu.status.bits(), (bits | 0x20) & !0x10);
        }
    }
}
