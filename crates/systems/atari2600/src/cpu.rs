//! 6507 CPU core — a 6502 with only 13 address pins bonded out.
//!
//! Driven at sub-instruction granularity rather than instruction-at-a-time:
//! `step_cycle` advances
//! exactly one bus cycle, and a multi-cycle instruction is modeled as a small
//! state machine (`InstrState`) that resumes where it left off on the next
//! call. This is what lets a mid-instruction write land on the exact colour
//! clock the orchestrator expects.
//!
//! Flag arithmetic (ADC/SBC overflow, BIT, compares) follows the standard
//! 6502 rules; each opcode is a (address-mode, operation-kind) pair
//! interpreted one bus cycle at a time instead of a single big match arm
//! that does everything at once.

use emu_core::log;
use emu_core::logging::{LogCategory, LogLevel};

/// Bus interface the CPU drives. Implemented by `Atari2600Bus`.
pub trait Bus6507 {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, val: u8);
    /// True while WSYNC (or an equivalent stall) should hold the CPU off the bus.
    fn rdy(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    IndirectX,
    IndirectY,
    Indirect,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Op {
    Lda, Ldx, Ldy, Sta, Stx, Sty,
    Adc, Sbc, And, Ora, Eor, Cmp, Cpx, Cpy, Bit,
    Inc, Dec, Asl, Lsr, Rol, Ror,
    Jmp, Jsr, Rts, Rti, Brk,
    Pha, Php, Pla, Plp,
    Inx, Iny, Dex, Dey, Tax, Tay, Txa, Tya, Tsx, Txs,
    Clc, Sec, Cli, Sei, Clv, Cld, Sed, Nop,
    Bpl, Bmi, Bvc, Bvs, Bcc, Bcs, Bne, Beq,
    // Undocumented opcodes real cartridge software occasionally relies on.
    Lax, Sax, Dcp, Isc, Slo, Rla, Sre, Rra, Anc, Alr, Arr, Axs,
    /// Kill/jam: halts the CPU permanently.
    Jam,
    /// Illegal NOP family (*NOP) — various addressing modes, no effect beyond the fetch.
    NopIllegal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Read,
    Write,
    Rmw,
    Control,
}

fn kind_of(op: Op) -> OpKind {
    use Op::*;
    match op {
        Lda | Ldx | Ldy | Adc | Sbc | And | Ora | Eor | Cmp | Cpx | Cpy | Bit | Lax | Anc
        | Alr | Arr | Axs | NopIllegal => OpKind::Read,
        Sta | Stx | Sty | Sax => OpKind::Write,
        Inc | Dec | Asl | Lsr | Rol | Ror | Dcp | Isc | Slo | Rla | Sre | Rra => OpKind::Rmw,
        _ => OpKind::Control,
    }
}

/// Diagnostic record of the most recently completed instruction. Populated
/// only when `Cpu6507::diagnostics` is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastResult {
    pub opcode: u8,
    pub mode: AddrMode,
    pub operand_bytes: Vec<u8>,
    pub resolved_address: Option<u16>,
    pub cycles: u8,
    pub page_cross: bool,
    pub undocumented_opcode: bool,
    pub bug_fired: bool,
}

#[derive(Debug, Clone)]
struct InstrState {
    opcode: u8,
    op: Op,
    mode: AddrMode,
    phase: u8,
    addr_lo: u8,
    addr_hi: u8,
    ptr: u8,
    effective_addr: u16,
    operand_bytes: Vec<u8>,
    operand_value: u8,
    page_crossed: bool,
    branch_taken: bool,
    bug_fired: bool,
    is_undocumented: bool,
}

/// The 6507 CPU. Carries no bus of its own — `step_cycle` takes the bus by
/// reference, matching the orchestrator's ownership of the shared aggregate
/// rather than a CPU that owns everything underneath it.
#[derive(Debug)]
pub struct Cpu6507 {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub status: u8,
    pub pc: u16,
    pub halted: bool,
    pub total_cycles: u64,
    pub diagnostics: bool,
    pub last_result: Option<LastResult>,
    state: Option<InstrState>,
    pending_interrupt: Option<InterruptKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptKind {
    Irq,
}

pub const FLAG_C: u8 = 0x01;
pub const FLAG_Z: u8 = 0x02;
pub const FLAG_I: u8 = 0x04;
pub const FLAG_D: u8 = 0x08;
pub const FLAG_B: u8 = 0x10;
pub const FLAG_U: u8 = 0x20;
pub const FLAG_V: u8 = 0x40;
pub const FLAG_N: u8 = 0x80;

impl Default for Cpu6507 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu6507 {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            status: FLAG_U | FLAG_I,
            pc: 0,
            halted: false,
            total_cycles: 0,
            diagnostics: false,
            last_result: None,
            state: None,
            pending_interrupt: None,
        }
    }

    /// Load PC from the reset vector at 0x1FFC/0x1FFD.
    pub fn reset(&mut self, bus: &mut dyn Bus6507) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.status = FLAG_U | FLAG_I;
        self.halted = false;
        self.state = None;
        self.pending_interrupt = None;
        let lo = bus.read(0x1FFC) as u16;
        let hi = bus.read(0x1FFD) as u16;
        self.pc = (hi << 8) | lo;
    }

    /// Debugger aid: point PC at the address stored at `addr` (not on the hot path).
    pub fn load_pc_indirect(&mut self, bus: &mut dyn Bus6507, addr: u16) {
        let lo = bus.read(addr) as u16;
        let hi = bus.read(addr.wrapping_add(1)) as u16;
        self.pc = (hi << 8) | lo;
    }

    /// No real 2600 cartridge has a line wired to NMI (the 6507 package
    /// doesn't even bond out that pin), so only IRQ is exposed. Kept as a
    /// hook for Supercharger-style mappers that want to drive one from
    /// `Mapper::step`, though no in-tree mapper calls it yet.
    pub fn request_irq(&mut self) {
        if self.pending_interrupt.is_none() {
            self.pending_interrupt = Some(InterruptKind::Irq);
        }
    }

    /// Advance exactly one bus cycle. No-op (and no bus access) if `rdy()` is
    /// low or the CPU has halted.
    pub fn step_cycle(&mut self, bus: &mut dyn Bus6507) {
        if self.halted {
            return;
        }
        if !bus.rdy() {
            return;
        }
        self.total_cycles += 1;
        if self.state.is_none() {
            self.begin_instruction(bus);
        } else {
            self.continue_instruction(bus);
        }
    }

    /// Run until the current (or next) instruction's final microstep.
    pub fn step_instruction(&mut self, bus: &mut dyn Bus6507) {
        self.step_cycle(bus);
        while self.state.is_some() && !self.halted {
            self.step_cycle(bus);
            if !bus.rdy() {
                // Stalled mid-instruction (WSYNC asserted by a write this
                // same instruction made) — stop, caller resumes later.
                if self.state.is_some() {
                    break;
                }
            }
        }
    }

    pub fn is_mid_instruction(&self) -> bool {
        self.state.is_some()
    }

    fn begin_instruction(&mut self, bus: &mut dyn Bus6507) {
        if let Some(kind) = self.pending_interrupt.take() {
            self.enter_interrupt(bus, kind);
            return;
        }
        let opcode = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        let (op, mode) = decode(opcode);
        if matches!(op, Op::Jam) {
            self.halted = true;
            log!(
                LogCategory::Cpu,
                LogLevel::Warn,
                "cpu: JAM at pc={:04X} opcode={:02X}",
                self.pc.wrapping_sub(1),
                opcode
            );
            if self.diagnostics {
                self.last_result = Some(LastResult {
                    opcode,
                    mode,
                    operand_bytes: vec![],
                    resolved_address: None,
                    cycles: 1,
                    page_cross: false,
                    undocumented_opcode: true,
                    bug_fired: false,
                });
            }
            return;
        }
        let is_undocumented = is_undocumented_opcode(opcode);
        self.state = Some(InstrState {
            opcode,
            op,
            mode,
            phase: 0,
            addr_lo: 0,
            addr_hi: 0,
            ptr: 0,
            effective_addr: 0,
            operand_bytes: Vec::new(),
            operand_value: 0,
            page_crossed: false,
            branch_taken: false,
            bug_fired: false,
            is_undocumented,
        });
        // Implied single-cycle-remaining control ops with no operand bytes
        // still need one more bus cycle (the real 6502 always takes >= 2
        // cycles); `continue_instruction` handles that on the next call.
    }

    fn continue_instruction(&mut self, bus: &mut dyn Bus6507) {
        let mut st = self.state.take().expect("continue without state");
        st.phase += 1;
        let done = self.execute_phase(bus, &mut st);
        if done {
            self.finalize(&st);
        } else {
            self.state = Some(st);
        }
    }

    fn finalize(&mut self, st: &InstrState) {
        if self.diagnostics {
            self.last_result = Some(LastResult {
                opcode: st.opcode,
                mode: st.mode,
                operand_bytes: st.operand_bytes.clone(),
                resolved_address: if matches!(st.mode, AddrMode::Immediate | AddrMode::Implied | AddrMode::Accumulator) {
                    None
                } else {
                    Some(st.effective_addr)
                },
                cycles: st.phase + 1,
                page_cross: st.page_crossed,
                undocumented_opcode: st.is_undocumented,
                bug_fired: st.bug_fired,
            });
        }
    }

    fn enter_interrupt(&mut self, bus: &mut dyn Bus6507, kind: InterruptKind) {
        let vector = match kind {
            InterruptKind::Irq => 0x1FFE,
        };
        if kind == InterruptKind::Irq && (self.status & FLAG_I) != 0 {
            return;
        }
        self.push_u16(bus, self.pc);
        let s = (self.status & !FLAG_B) | FLAG_U;
        self.push_u8(bus, s);
        self.status |= FLAG_I;
        let lo = bus.read(vector) as u16;
        let hi = bus.read(vector.wrapping_add(1)) as u16;
        self.pc = (hi << 8) | lo;
    }

    fn push_u8(&mut self, bus: &mut dyn Bus6507, v: u8) {
        bus.write(0x0100 | self.sp as u16, v);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop_u8(&mut self, bus: &mut dyn Bus6507) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 | self.sp as u16)
    }

    fn push_u16(&mut self, bus: &mut dyn Bus6507, v: u16) {
        self.push_u8(bus, (v >> 8) as u8);
        self.push_u8(bus, v as u8);
    }

    fn pop_u16(&mut self, bus: &mut dyn Bus6507) -> u16 {
        let lo = self.pop_u8(bus) as u16;
        let hi = self.pop_u8(bus) as u16;
        (hi << 8) | lo
    }

    fn set_zn(&mut self, v: u8) {
        self.status = (self.status & !(FLAG_Z | FLAG_N))
            | if v == 0 { FLAG_Z } else { 0 }
            | (v & FLAG_N);
    }

    fn adc(&mut self, value: u8) {
        let carry_in = (self.status & FLAG_C) as u16;
        let sum = self.a as u16 + value as u16 + carry_in;
        let result = sum as u8;
        self.status = (self.status & !(FLAG_C | FLAG_V))
            | if sum > 0xFF { FLAG_C } else { 0 }
            | if ((!(self.a ^ value)) & (self.a ^ result) & 0x80) != 0 { FLAG_V } else { 0 };
        self.a = result;
        self.set_zn(self.a);
    }

    fn sbc(&mut self, value: u8) {
        self.adc(value ^ 0xFF);
    }

    fn compare(&mut self, reg: u8, value: u8) {
        let result = reg.wrapping_sub(value);
        self.status = (self.status & !FLAG_C) | if reg >= value { FLAG_C } else { 0 };
        self.set_zn(result);
    }

    /// Apply a completed read-category operation now that `operand_value` is known.
    fn apply_read(&mut self, op: Op, value: u8) {
        use Op::*;
        match op {
            Lda => { self.a = value; self.set_zn(self.a); }
            Ldx => { self.x = value; self.set_zn(self.x); }
            Ldy => { self.y = value; self.set_zn(self.y); }
            And => { self.a &= value; self.set_zn(self.a); }
            Ora => { self.a |= value; self.set_zn(self.a); }
            Eor => { self.a ^= value; self.set_zn(self.a); }
            Adc => self.adc(value),
            Sbc => self.sbc(value),
            Cmp => self.compare(self.a, value),
            Cpx => self.compare(self.x, value),
            Cpy => self.compare(self.y, value),
            Bit => {
                let res = self.a & value;
                self.status = (self.status & !(FLAG_Z | FLAG_V | FLAG_N))
                    | if res == 0 { FLAG_Z } else { 0 }
                    | (value & (FLAG_V | FLAG_N));
            }
            Lax => { self.a = value; self.x = value; self.set_zn(self.a); }
            Anc => {
                self.a &= value;
                self.set_zn(self.a);
                self.status = (self.status & !FLAG_C) | ((self.a >> 7) & FLAG_C);
            }
            Alr => {
                self.a &= value;
                let carry = self.a & 0x01;
                self.a >>= 1;
                self.status = (self.status & !FLAG_C) | carry;
                self.set_zn(self.a);
            }
            Arr => {
                self.a &= value;
                let carry_in = (self.status & FLAG_C) << 7;
                self.a = (self.a >> 1) | carry_in;
                self.set_zn(self.a);
                let bit6 = (self.a >> 6) & 1;
                let bit5 = (self.a >> 5) & 1;
                self.status = (self.status & !(FLAG_C | FLAG_V))
                    | bit6
                    | if bit6 ^ bit5 != 0 { FLAG_V } else { 0 };
            }
            Axs => {
                let t = (self.a & self.x) as i16 - value as i16;
                self.status = (self.status & !FLAG_C) | if t >= 0 { FLAG_C } else { 0 };
                self.x = t as u8;
                self.set_zn(self.x);
            }
            NopIllegal => {}
            _ => unreachable!("{op:?} is not a read op"),
        }
    }

    fn value_to_write(&mut self, op: Op) -> u8 {
        use Op::*;
        match op {
            Sta => self.a,
            Stx => self.x,
            Sty => self.y,
            Sax => self.a & self.x,
            _ => unreachable!("{op:?} is not a write op"),
        }
    }

    /// Compute the rmw result and update flags; returns the byte to write back.
    fn apply_rmw(&mut self, op: Op, old: u8) -> u8 {
        use Op::*;
        match op {
            Inc => { let v = old.wrapping_add(1); self.set_zn(v); v }
            Dec => { let v = old.wrapping_sub(1); self.set_zn(v); v }
            Asl => {
                let carry = (old & 0x80) != 0;
                let v = old << 1;
                self.status = (self.status & !FLAG_C) | carry as u8;
                self.set_zn(v);
                v
            }
            Lsr => {
                let carry = (old & 0x01) != 0;
                let v = old >> 1;
                self.status = (self.status & !FLAG_C) | carry as u8;
                self.set_zn(v);
                v
            }
            Rol => {
                let carry_in = self.status & FLAG_C;
                let carry_out = (old & 0x80) != 0;
                let v = (old << 1) | carry_in;
                self.status = (self.status & !FLAG_C) | carry_out as u8;
                self.set_zn(v);
                v
            }
            Ror => {
                let carry_in = (self.status & FLAG_C) << 7;
                let carry_out = (old & 0x01) != 0;
                let v = (old >> 1) | carry_in;
                self.status = (self.status & !FLAG_C) | carry_out as u8;
                self.set_zn(v);
                v
            }
            Slo => {
                let carry = (old & 0x80) != 0;
                let v = old << 1;
                self.status = (self.status & !FLAG_C) | carry as u8;
                self.a |= v;
                self.set_zn(self.a);
                v
            }
            Rla => {
                let carry_in = self.status & FLAG_C;
                let carry_out = (old & 0x80) != 0;
                let v = (old << 1) | carry_in;
                self.status = (self.status & !FLAG_C) | carry_out as u8;
                self.a &= v;
                self.set_zn(self.a);
                v
            }
            Sre => {
                let carry = (old & 0x01) != 0;
                let v = old >> 1;
                self.status = (self.status & !FLAG_C) | carry as u8;
                self.a ^= v;
                self.set_zn(self.a);
                v
            }
            Rra => {
                let carry_in = (self.status & FLAG_C) << 7;
                let carry_out = (old & 0x01) != 0;
                let v = (old >> 1) | carry_in;
                self.status = (self.status & !FLAG_C) | carry_out as u8;
                self.adc(v);
                v
            }
            Dcp => {
                let v = old.wrapping_sub(1);
                self.compare(self.a, v);
                v
            }
            Isc => {
                let v = old.wrapping_add(1);
                self.sbc(v);
                v
            }
            _ => unreachable!("{op:?} is not an rmw op"),
        }
    }

    /// Runs one cycle's worth of work for the instruction currently in
    /// flight; returns true once the instruction has fully retired.
    fn execute_phase(&mut self, bus: &mut dyn Bus6507, st: &mut InstrState) -> bool {
        use Op::*;
        // Control-flow and stack ops don't fit the generic read/write/rmw
        // addressing-mode pipeline; handle them directly.
        match st.op {
            Nop if st.mode == AddrMode::Implied => return true,
            Clc => { self.status &= !FLAG_C; return true; }
            Sec => { self.status |= FLAG_C; return true; }
            Cli => { self.status &= !FLAG_I; return true; }
            Sei => { self.status |= FLAG_I; return true; }
            Clv => { self.status &= !FLAG_V; return true; }
            Cld => { self.status &= !FLAG_D; return true; }
            Sed => { self.status |= FLAG_D; return true; }
            Inx => { self.x = self.x.wrapping_add(1); self.set_zn(self.x); return true; }
            Iny => { self.y = self.y.wrapping_add(1); self.set_zn(self.y); return true; }
            Dex => { self.x = self.x.wrapping_sub(1); self.set_zn(self.x); return true; }
            Dey => { self.y = self.y.wrapping_sub(1); self.set_zn(self.y); return true; }
            Tax => { self.x = self.a; self.set_zn(self.x); return true; }
            Tay => { self.y = self.a; self.set_zn(self.y); return true; }
            Txa => { self.a = self.x; self.set_zn(self.a); return true; }
            Tya => { self.a = self.y; self.set_zn(self.a); return true; }
            Txs => { self.sp = self.x; return true; }
            Tsx => { self.x = self.sp; self.set_zn(self.x); return true; }
            Asl if st.mode == AddrMode::Accumulator => {
                let v = self.apply_rmw(Asl, self.a);
                self.a = v;
                return true;
            }
            Lsr if st.mode == AddrMode::Accumulator => {
                let v = self.apply_rmw(Lsr, self.a);
                self.a = v;
                return true;
            }
            Rol if st.mode == AddrMode::Accumulator => {
                let v = self.apply_rmw(Rol, self.a);
                self.a = v;
                return true;
            }
            Ror if st.mode == AddrMode::Accumulator => {
                let v = self.apply_rmw(Ror, self.a);
                self.a = v;
                return true;
            }
            Pha => {
                if st.phase == 1 {
                    return false; // internal cycle before the push
                }
                self.push_u8(bus, self.a);
                return true;
            }
            Php => {
                if st.phase == 1 {
                    return false;
                }
                self.push_u8(bus, self.status | FLAG_B | FLAG_U);
                return true;
            }
            Pla => {
                if st.phase < 3 {
                    return false;
                }
                let v = self.pop_u8(bus);
                self.a = v;
                self.set_zn(self.a);
                return true;
            }
            Plp => {
                if st.phase < 3 {
                    return false;
                }
                let v = self.pop_u8(bus);
                self.status = (v | FLAG_U) & !FLAG_B;
                return true;
            }
            Jmp if st.mode == AddrMode::Absolute => {
                match st.phase {
                    1 => { st.addr_lo = bus.read(self.pc); self.pc = self.pc.wrapping_add(1); false }
                    2 => {
                        st.addr_hi = bus.read(self.pc);
                        self.pc = self.pc.wrapping_add(1);
                        self.pc = u16::from_le_bytes([st.addr_lo, st.addr_hi]);
                        true
                    }
                    _ => unreachable!(),
                }
            }
            Jmp if st.mode == AddrMode::Indirect => {
                match st.phase {
                    1 => { st.addr_lo = bus.read(self.pc); self.pc = self.pc.wrapping_add(1); false }
                    2 => { st.addr_hi = bus.read(self.pc); self.pc = self.pc.wrapping_add(1); false }
                    3 => {
                        let ptr = u16::from_le_bytes([st.addr_lo, st.addr_hi]);
                        st.ptr = bus.read(ptr);
                        false
                    }
                    4 => {
                        // The 6502 JMP (indirect) page-wrap bug: the high
                        // byte is fetched from (ptr & 0xFF00)|((ptr+1)&0xFF),
                        // never carrying into the page.
                        let ptr = u16::from_le_bytes([st.addr_lo, st.addr_hi]);
                        let hi_addr = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
                        let hi = bus.read(hi_addr);
                        if st.addr_lo == 0xFF {
                            st.bug_fired = true;
                        }
                        self.pc = u16::from_le_bytes([st.ptr, hi]);
                        true
                    }
                    _ => unreachable!(),
                }
            }
            Jsr => {
                match st.phase {
                    1 => { st.addr_lo = bus.read(self.pc); self.pc = self.pc.wrapping_add(1); false }
                    2 => false, // internal cycle (SP peek)
                    3 => { self.push_u8(bus, (self.pc >> 8) as u8); false }
                    4 => { self.push_u8(bus, self.pc as u8); false }
                    5 => {
                        st.addr_hi = bus.read(self.pc);
                        self.pc = u16::from_le_bytes([st.addr_lo, st.addr_hi]);
                        true
                    }
                    _ => unreachable!(),
                }
            }
            Rts => {
                match st.phase {
                    1 | 2 => false,
                    3 => { st.addr_lo = self.pop_u8(bus); false }
                    4 => { st.addr_hi = self.pop_u8(bus); false }
                    5 => {
                        self.pc = u16::from_le_bytes([st.addr_lo, st.addr_hi]).wrapping_add(1);
                        true
                    }
                    _ => unreachable!(),
                }
            }
            Rti => {
                match st.phase {
                    1 | 2 => false,
                    3 => { let v = self.pop_u8(bus); self.status = (v | FLAG_U) & !FLAG_B; false }
                    4 => { st.addr_lo = self.pop_u8(bus); false }
                    5 => {
                        st.addr_hi = self.pop_u8(bus);
                        self.pc = u16::from_le_bytes([st.addr_lo, st.addr_hi]);
                        true
                    }
                    _ => unreachable!(),
                }
            }
            Brk => {
                match st.phase {
                    1 => { let _ = bus.read(self.pc); self.pc = self.pc.wrapping_add(1); false }
                    2 => { self.push_u8(bus, (self.pc >> 8) as u8); false }
                    3 => { self.push_u8(bus, self.pc as u8); false }
                    4 => { self.push_u8(bus, self.status | FLAG_B | FLAG_U); false }
                    5 => { st.addr_lo = bus.read(0x1FFE); false }
                    6 => {
                        st.addr_hi = bus.read(0x1FFF);
                        self.status |= FLAG_I;
                        self.pc = u16::from_le_bytes([st.addr_lo, st.addr_hi]);
                        true
                    }
                    _ => unreachable!(),
                }
            }
            Bpl | Bmi | Bvc | Bvs | Bcc | Bcs | Bne | Beq => self.execute_branch(bus, st),
            _ => self.execute_generic(bus, st),
        }
    }

    fn branch_condition(&self, op: Op) -> bool {
        use Op::*;
        match op {
            Bpl => self.status & FLAG_N == 0,
            Bmi => self.status & FLAG_N != 0,
            Bvc => self.status & FLAG_V == 0,
            Bvs => self.status & FLAG_V != 0,
            Bcc => self.status & FLAG_C == 0,
            Bcs => self.status & FLAG_C != 0,
            Bne => self.status & FLAG_Z == 0,
            Beq => self.status & FLAG_Z != 0,
            _ => unreachable!(),
        }
    }

    fn execute_branch(&mut self, bus: &mut dyn Bus6507, st: &mut InstrState) -> bool {
        match st.phase {
            1 => {
                let offset = bus.read(self.pc) as i8;
                self.pc = self.pc.wrapping_add(1);
                st.operand_bytes.push(offset as u8);
                st.branch_taken = self.branch_condition(st.op);
                if !st.branch_taken {
                    return true;
                }
                let old_pc = self.pc;
                let new_pc = (old_pc as i32 + offset as i32) as u16;
                st.page_crossed = (old_pc & 0xFF00) != (new_pc & 0xFF00);
                st.effective_addr = new_pc;
                false
            }
            2 => {
                if !st.page_crossed {
                    self.pc = st.effective_addr;
                    true
                } else {
                    false
                }
            }
            3 => {
                self.pc = st.effective_addr;
                true
            }
            _ => unreachable!(),
        }
    }

    /// Shared addressing-mode pipeline for Read/Write/Rmw category ops.
    fn execute_generic(&mut self, bus: &mut dyn Bus6507, st: &mut InstrState) -> bool {
        let kind = kind_of(st.op);
        match st.mode {
            AddrMode::Immediate => {
                let v = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                st.operand_bytes.push(v);
                self.apply_read(st.op, v);
                true
            }
            AddrMode::ZeroPage => match st.phase {
                1 => { st.addr_lo = bus.read(self.pc); self.pc = self.pc.wrapping_add(1); st.operand_bytes.push(st.addr_lo); st.effective_addr = st.addr_lo as u16; false }
                2 => self.finish_simple(bus, st, kind, 2),
                3 => self.finish_rmw_write(bus, st, 3),
                _ => unreachable!(),
            },
            AddrMode::ZeroPageX | AddrMode::ZeroPageY => match st.phase {
                1 => { st.addr_lo = bus.read(self.pc); self.pc = self.pc.wrapping_add(1); st.operand_bytes.push(st.addr_lo); false }
                2 => {
                    let _ = bus.read(st.addr_lo as u16); // dummy read before indexing
                    let idx = if st.mode == AddrMode::ZeroPageX { self.x } else { self.y };
                    st.effective_addr = st.addr_lo.wrapping_add(idx) as u16;
                    false
                }
                3 => self.finish_simple(bus, st, kind, 3),
                4 => self.finish_rmw_write(bus, st, 4),
                _ => unreachable!(),
            },
            AddrMode::Absolute => match st.phase {
                1 => { st.addr_lo = bus.read(self.pc); self.pc = self.pc.wrapping_add(1); st.operand_bytes.push(st.addr_lo); false }
                2 => {
                    st.addr_hi = bus.read(self.pc);
                    self.pc = self.pc.wrapping_add(1);
                    st.operand_bytes.push(st.addr_hi);
                    st.effective_addr = u16::from_le_bytes([st.addr_lo, st.addr_hi]);
                    false
                }
                3 => self.finish_simple(bus, st, kind, 3),
                4 => self.finish_rmw_write(bus, st, 4),
                _ => unreachable!(),
            },
            AddrMode::AbsoluteX | AddrMode::AbsoluteY => match st.phase {
                1 => { st.addr_lo = bus.read(self.pc); self.pc = self.pc.wrapping_add(1); st.operand_bytes.push(st.addr_lo); false }
                2 => {
                    st.addr_hi = bus.read(self.pc);
                    self.pc = self.pc.wrapping_add(1);
                    st.operand_bytes.push(st.addr_hi);
                    let idx = if st.mode == AddrMode::AbsoluteX { self.x } else { self.y };
                    let base = u16::from_le_bytes([st.addr_lo, st.addr_hi]);
                    let eff = base.wrapping_add(idx as u16);
                    st.page_crossed = (eff & 0xFF00) != (base & 0xFF00);
                    st.effective_addr = eff;
                    false
                }
                3 => {
                    // Dummy read at the un-carried address; always present
                    // for write/rmw, only matters (and is only counted) for
                    // reads when the page actually crossed.
                    let wrong = (st.effective_addr & 0x00FF)
                        | ((st.effective_addr.wrapping_sub(0x100)) & 0xFF00);
                    let probe = if st.page_crossed { wrong } else { st.effective_addr };
                    let _ = bus.read(probe);
                    if kind == OpKind::Read && !st.page_crossed {
                        self.finish_read(bus, st)
                    } else {
                        false
                    }
                }
                4 => self.finish_simple(bus, st, kind, 4),
                5 => self.finish_rmw_write(bus, st, 5),
                _ => unreachable!(),
            },
            AddrMode::IndirectX => match st.phase {
                1 => { st.ptr = bus.read(self.pc); self.pc = self.pc.wrapping_add(1); st.operand_bytes.push(st.ptr); false }
                2 => { let _ = bus.read(st.ptr as u16); false }
                3 => { st.addr_lo = bus.read(st.ptr.wrapping_add(self.x) as u16); false }
                4 => { st.addr_hi = bus.read(st.ptr.wrapping_add(self.x).wrapping_add(1) as u16); st.effective_addr = u16::from_le_bytes([st.addr_lo, st.addr_hi]); false }
                5 => self.finish_simple(bus, st, kind, 5),
                6 => self.finish_rmw_write(bus, st, 6),
                _ => unreachable!(),
            },
            AddrMode::IndirectY => match st.phase {
                1 => { st.ptr = bus.read(self.pc); self.pc = self.pc.wrapping_add(1); st.operand_bytes.push(st.ptr); false }
                2 => { st.addr_lo = bus.read(st.ptr as u16); false }
                3 => {
                    st.addr_hi = bus.read(st.ptr.wrapping_add(1) as u16);
                    let base = u16::from_le_bytes([st.addr_lo, st.addr_hi]);
                    let eff = base.wrapping_add(self.y as u16);
                    st.page_crossed = (eff & 0xFF00) != (base & 0xFF00);
                    st.effective_addr = eff;
                    false
                }
                4 => {
                    let wrong = (st.effective_addr & 0x00FF)
                        | ((st.effective_addr.wrapping_sub(0x100)) & 0xFF00);
                    let probe = if st.page_crossed { wrong } else { st.effective_addr };
                    let _ = bus.read(probe);
                    if kind == OpKind::Read && !st.page_crossed {
                        self.finish_read(bus, st)
                    } else {
                        false
                    }
                }
                5 => self.finish_simple(bus, st, kind, 5),
                6 => self.finish_rmw_write(bus, st, 6),
                _ => unreachable!(),
            },
            _ => unreachable!("mode {:?} has no generic pipeline", st.mode),
        }
    }

    fn finish_read(&mut self, bus: &mut dyn Bus6507, st: &mut InstrState) -> bool {
        let v = bus.read(st.effective_addr);
        st.operand_value = v;
        self.apply_read(st.op, v);
        true
    }

    /// For Read ops, resolve now; for Write ops, write now; for Rmw, do the
    /// first (read) half and let `finish_rmw_write` do the rest.
    fn finish_simple(&mut self, bus: &mut dyn Bus6507, st: &mut InstrState, kind: OpKind, _phase: u8) -> bool {
        match kind {
            OpKind::Read => self.finish_read(bus, st),
            OpKind::Write => {
                let v = self.value_to_write(st.op);
                bus.write(st.effective_addr, v);
                true
            }
            OpKind::Rmw => {
                let v = bus.read(st.effective_addr);
                st.operand_value = v;
                false
            }
            OpKind::Control => unreachable!(),
        }
    }

    fn finish_rmw_write(&mut self, bus: &mut dyn Bus6507, st: &mut InstrState, phase: u8) -> bool {
        // `phase` is the dummy-write-old-value cycle; the next call performs
        // the real write. We fold both into this call's caller by tracking
        // via st.phase parity: first visit writes old value back unchanged,
        // second visit computes+writes the new value.
        if !st.branch_taken {
            // reuse branch_taken as a one-shot "dummy write done" flag for RMW
            bus.write(st.effective_addr, st.operand_value);
            st.branch_taken = true;
            let _ = phase;
            false
        } else {
            let new_val = self.apply_rmw(st.op, st.operand_value);
            bus.write(st.effective_addr, new_val);
            true
        }
    }
}

fn is_undocumented_opcode(opcode: u8) -> bool {
    !matches!(
        opcode,
        0x00 | 0x01 | 0x05 | 0x06 | 0x08 | 0x09 | 0x0A | 0x0D | 0x0E | 0x10 | 0x11 | 0x15
            | 0x16 | 0x18 | 0x19 | 0x1D | 0x1E | 0x20 | 0x21 | 0x24 | 0x25 | 0x26 | 0x28 | 0x29
            | 0x2A | 0x2C | 0x2D | 0x2E | 0x30 | 0x31 | 0x35 | 0x36 | 0x38 | 0x39 | 0x3D | 0x3E
            | 0x40 | 0x41 | 0x45 | 0x46 | 0x48 | 0x49 | 0x4A | 0x4C | 0x4D | 0x4E | 0x50 | 0x51
            | 0x55 | 0x56 | 0x58 | 0x59 | 0x5D | 0x5E | 0x60 | 0x61 | 0x65 | 0x66 | 0x68 | 0x69
            | 0x6A | 0x6C | 0x6D | 0x6E | 0x70 | 0x71 | 0x75 | 0x76 | 0x78 | 0x79 | 0x7D | 0x7E
            | 0x81 | 0x84 | 0x85 | 0x86 | 0x88 | 0x8A | 0x8C | 0x8D | 0x8E | 0x90 | 0x91 | 0x94
            | 0x95 | 0x96 | 0x98 | 0x99 | 0x9A | 0x9D | 0xA0 | 0xA1 | 0xA2 | 0xA4 | 0xA5 | 0xA6
            | 0xA8 | 0xA9 | 0xAA | 0xAC | 0xAD | 0xAE | 0xB0 | 0xB1 | 0xB4 | 0xB5 | 0xB6 | 0xB8
            | 0xB9 | 0xBA | 0xBC | 0xBD | 0xBE | 0xC0 | 0xC1 | 0xC4 | 0xC5 | 0xC6 | 0xC8 | 0xC9
            | 0xCA | 0xCC | 0xCD | 0xCE | 0xD0 | 0xD1 | 0xD5 | 0xD6 | 0xD8 | 0xD9 | 0xDD | 0xDE
            | 0xE0 | 0xE1 | 0xE4 | 0xE5 | 0xE6 | 0xE8 | 0xE9 | 0xEA | 0xEC | 0xED | 0xEE | 0xF0
            | 0xF1 | 0xF5 | 0xF6 | 0xF8 | 0xF9 | 0xFD | 0xFE
    )
}

/// Opcode → (operation, addressing mode). Official 151 opcodes plus the
/// undocumented families real cartridge software is known to use.
pub fn decode(opcode: u8) -> (Op, AddrMode) {
    use AddrMode::*;
    use Op::*;
    match opcode {
        0x00 => (Brk, Implied),
        0x01 => (Ora, IndirectX),
        0x03 => (Slo, IndirectX),
        0x04 | 0x44 | 0x64 => (NopIllegal, ZeroPage),
        0x05 => (Ora, ZeroPage),
        0x06 => (Asl, ZeroPage),
        0x07 => (Slo, ZeroPage),
        0x08 => (Php, Implied),
        0x09 => (Ora, Immediate),
        0x0A => (Asl, Accumulator),
        0x0B => (Anc, Immediate),
        0x0C => (NopIllegal, Absolute),
        0x0D => (Ora, Absolute),
        0x0E => (Asl, Absolute),
        0x0F => (Slo, Absolute),
        0x10 => (Bpl, Relative),
        0x11 => (Ora, IndirectY),
        0x13 => (Slo, IndirectY),
        0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => (NopIllegal, ZeroPageX),
        0x15 => (Ora, ZeroPageX),
        0x16 => (Asl, ZeroPageX),
        0x17 => (Slo, ZeroPageX),
        0x18 => (Clc, Implied),
        0x19 => (Ora, AbsoluteY),
        0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => (NopIllegal, Implied),
        0x1B => (Slo, AbsoluteY),
        0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => (NopIllegal, AbsoluteX),
        0x1D => (Ora, AbsoluteX),
        0x1E => (Asl, AbsoluteX),
        0x1F => (Slo, AbsoluteX),
        0x20 => (Jsr, Absolute),
        0x21 => (And, IndirectX),
        0x23 => (Rla, IndirectX),
        0x24 => (Bit, ZeroPage),
        0x25 => (And, ZeroPage),
        0x26 => (Rol, ZeroPage),
        0x27 => (Rla, ZeroPage),
        0x28 => (Plp, Implied),
        0x29 => (And, Immediate),
        0x2A => (Rol, Accumulator),
        0x2B => (Anc, Immediate),
        0x2C => (Bit, Absolute),
        0x2D => (And, Absolute),
        0x2E => (Rol, Absolute),
        0x2F => (Rla, Absolute),
        0x30 => (Bmi, Relative),
        0x31 => (And, IndirectY),
        0x33 => (Rla, IndirectY),
        0x35 => (And, ZeroPageX),
        0x36 => (Rol, ZeroPageX),
        0x37 => (Rla, ZeroPageX),
        0x38 => (Sec, Implied),
        0x39 => (And, AbsoluteY),
        0x3B => (Rla, AbsoluteY),
        0x3D => (And, AbsoluteX),
        0x3E => (Rol, AbsoluteX),
        0x3F => (Rla, AbsoluteX),
        0x40 => (Rti, Implied),
        0x41 => (Eor, IndirectX),
        0x43 => (Sre, IndirectX),
        0x45 => (Eor, ZeroPage),
        0x46 => (Lsr, ZeroPage),
        0x47 => (Sre, ZeroPage),
        0x48 => (Pha, Implied),
        0x49 => (Eor, Immediate),
        0x4A => (Lsr, Accumulator),
        0x4B => (Alr, Immediate),
        0x4C => (Jmp, Absolute),
        0x4D => (Eor, Absolute),
        0x4E => (Lsr, Absolute),
        0x4F => (Sre, Absolute),
        0x50 => (Bvc, Relative),
        0x51 => (Eor, IndirectY),
        0x53 => (Sre, IndirectY),
        0x55 => (Eor, ZeroPageX),
        0x56 => (Lsr, ZeroPageX),
        0x57 => (Sre, ZeroPageX),
        0x58 => (Cli, Implied),
        0x59 => (Eor, AbsoluteY),
        0x5B => (Sre, AbsoluteY),
        0x5D => (Eor, AbsoluteX),
        0x5E => (Lsr, AbsoluteX),
        0x5F => (Sre, AbsoluteX),
        0x60 => (Rts, Implied),
        0x61 => (Adc, IndirectX),
        0x63 => (Rra, IndirectX),
        0x65 => (Adc, ZeroPage),
        0x66 => (Ror, ZeroPage),
        0x67 => (Rra, ZeroPage),
        0x68 => (Pla, Implied),
        0x69 => (Adc, Immediate),
        0x6A => (Ror, Accumulator),
        0x6B => (Arr, Immediate),
        0x6C => (Jmp, Indirect),
        0x6D => (Adc, Absolute),
        0x6E => (Ror, Absolute),
        0x6F => (Rra, Absolute),
        0x70 => (Bvs, Relative),
        0x71 => (Adc, IndirectY),
        0x73 => (Rra, IndirectY),
        0x75 => (Adc, ZeroPageX),
        0x76 => (Ror, ZeroPageX),
        0x77 => (Rra, ZeroPageX),
        0x78 => (Sei, Implied),
        0x79 => (Adc, AbsoluteY),
        0x7B => (Rra, AbsoluteY),
        0x7D => (Adc, AbsoluteX),
        0x7E => (Ror, AbsoluteX),
        0x7F => (Rra, AbsoluteX),
        0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => (NopIllegal, Immediate),
        0x81 => (Sta, IndirectX),
        0x83 => (Sax, IndirectX),
        0x84 => (Sty, ZeroPage),
        0x85 => (Sta, ZeroPage),
        0x86 => (Stx, ZeroPage),
        0x87 => (Sax, ZeroPage),
        0x88 => (Dey, Implied),
        0x8A => (Txa, Implied),
        0x8C => (Sty, Absolute),
        0x8D => (Sta, Absolute),
        0x8E => (Stx, Absolute),
        0x8F => (Sax, Absolute),
        0x90 => (Bcc, Relative),
        0x91 => (Sta, IndirectY),
        0x94 => (Sty, ZeroPageX),
        0x95 => (Sta, ZeroPageX),
        0x96 => (Stx, ZeroPageY),
        0x97 => (Sax, ZeroPageY),
        0x98 => (Tya, Implied),
        0x99 => (Sta, AbsoluteY),
        0x9A => (Txs, Implied),
        0x9D => (Sta, AbsoluteX),
        0xA0 => (Ldy, Immediate),
        0xA1 => (Lda, IndirectX),
        0xA2 => (Ldx, Immediate),
        0xA3 => (Lax, IndirectX),
        0xA4 => (Ldy, ZeroPage),
        0xA5 => (Lda, ZeroPage),
        0xA6 => (Ldx, ZeroPage),
        0xA7 => (Lax, ZeroPage),
        0xA8 => (Tay, Implied),
        0xA9 => (Lda, Immediate),
        0xAA => (Tax, Implied),
        0xAC => (Ldy, Absolute),
        0xAD => (Lda, Absolute),
        0xAE => (Ldx, Absolute),
        0xAF => (Lax, Absolute),
        0xB0 => (Bcs, Relative),
        0xB1 => (Lda, IndirectY),
        0xB3 => (Lax, IndirectY),
        0xB4 => (Ldy, ZeroPageX),
        0xB5 => (Lda, ZeroPageX),
        0xB6 => (Ldx, ZeroPageY),
        0xB7 => (Lax, ZeroPageY),
        0xB8 => (Clv, Implied),
        0xB9 => (Lda, AbsoluteY),
        0xBA => (Tsx, Implied),
        0xBC => (Ldy, AbsoluteX),
        0xBD => (Lda, AbsoluteX),
        0xBE => (Ldx, AbsoluteY),
        0xBF => (Lax, AbsoluteY),
        0xC0 => (Cpy, Immediate),
        0xC1 => (Cmp, IndirectX),
        0xC3 => (Dcp, IndirectX),
        0xC4 => (Cpy, ZeroPage),
        0xC5 => (Cmp, ZeroPage),
        0xC6 => (Dec, ZeroPage),
        0xC7 => (Dcp, ZeroPage),
        0xC8 => (Iny, Implied),
        0xC9 => (Cmp, Immediate),
        0xCA => (Dex, Implied),
        0xCB => (Axs, Immediate),
        0xCC => (Cpy, Absolute),
        0xCD => (Cmp, Absolute),
        0xCE => (Dec, Absolute),
        0xCF => (Dcp, Absolute),
        0xD0 => (Bne, Relative),
        0xD1 => (Cmp, IndirectY),
        0xD3 => (Dcp, IndirectY),
        0xD5 => (Cmp, ZeroPageX),
        0xD6 => (Dec, ZeroPageX),
        0xD7 => (Dcp, ZeroPageX),
        0xD8 => (Cld, Implied),
        0xD9 => (Cmp, AbsoluteY),
        0xDB => (Dcp, AbsoluteY),
        0xDD => (Cmp, AbsoluteX),
        0xDE => (Dec, AbsoluteX),
        0xDF => (Dcp, AbsoluteX),
        0xE0 => (Cpx, Immediate),
        0xE1 => (Sbc, IndirectX),
        0xE3 => (Isc, IndirectX),
        0xE4 => (Cpx, ZeroPage),
        0xE5 => (Sbc, ZeroPage),
        0xE6 => (Inc, ZeroPage),
        0xE7 => (Isc, ZeroPage),
        0xE8 => (Inx, Implied),
        0xE9 | 0xEB => (Sbc, Immediate),
        0xEA => (Nop, Implied),
        0xEC => (Cpx, Absolute),
        0xED => (Sbc, Absolute),
        0xEE => (Inc, Absolute),
        0xEF => (Isc, Absolute),
        0xF0 => (Beq, Relative),
        0xF1 => (Sbc, IndirectY),
        0xF3 => (Isc, IndirectY),
        0xF5 => (Sbc, ZeroPageX),
        0xF6 => (Inc, ZeroPageX),
        0xF7 => (Isc, ZeroPageX),
        0xF8 => (Sed, Implied),
        0xF9 => (Sbc, AbsoluteY),
        0xFB => (Isc, AbsoluteY),
        0xFD => (Sbc, AbsoluteX),
        0xFE => (Inc, AbsoluteX),
        0xFF => (Isc, AbsoluteX),
        0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => {
            (Jam, Implied)
        }
        _ => (NopIllegal, Implied),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatBus {
        mem: [u8; 0x2000],
        rdy: bool,
        writes: Vec<(u16, u8)>,
    }

    impl FlatBus {
        fn new() -> Self {
            Self { mem: [0; 0x2000], rdy: true, writes: Vec::new() }
        }
    }

    impl Bus6507 for FlatBus {
        fn read(&mut self, addr: u16) -> u8 {
            self.mem[(addr & 0x1FFF) as usize]
        }
        fn write(&mut self, addr: u16, val: u8) {
            self.mem[(addr & 0x1FFF) as usize] = val;
            self.writes.push((addr & 0x1FFF, val));
        }
        fn rdy(&self) -> bool {
            self.rdy
        }
    }

    #[test]
    fn reset_vector_loads_pc_and_flags() {
        let mut bus = FlatBus::new();
        bus.mem[0x0FFC] = 0xAA;
        bus.mem[0x0FFD] = 0xF0;
        let mut cpu = Cpu6507::new();
        cpu.reset(&mut bus);
        assert_eq!(cpu.pc, 0xF0AA);
        assert_eq!(cpu.sp, 0xFD);
        assert_eq!(cpu.status, 0x24);
    }

    #[test]
    fn lda_immediate_two_cycles() {
        let mut bus = FlatBus::new();
        bus.mem[0x0FFC] = 0x00;
        bus.mem[0x0FFD] = 0x10;
        bus.mem[0x1000] = 0xA9; // LDA #$42
        bus.mem[0x1001] = 0x42;
        let mut cpu = Cpu6507::new();
        cpu.reset(&mut bus);
        cpu.step_cycle(&mut bus);
        assert!(cpu.is_mid_instruction());
        cpu.step_cycle(&mut bus);
        assert!(!cpu.is_mid_instruction());
        assert_eq!(cpu.a, 0x42);
        assert_eq!(cpu.pc, 0x1002);
    }

    #[test]
    fn sta_absolute_writes_on_final_cycle() {
        let mut bus = FlatBus::new();
        bus.mem[0x0FFC] = 0x00;
        bus.mem[0x0FFD] = 0x10;
        bus.mem[0x1000] = 0x8D; // STA $0006
        bus.mem[0x1001] = 0x06;
        bus.mem[0x1002] = 0x00;
        let mut cpu = Cpu6507::new();
        cpu.reset(&mut bus);
        cpu.a = 0x99;
        cpu.step_cycle(&mut bus); // fetch opcode
        cpu.step_cycle(&mut bus); // fetch lo
        cpu.step_cycle(&mut bus); // fetch hi
        assert!(bus.writes.is_empty());
        cpu.step_cycle(&mut bus); // write
        assert_eq!(bus.writes, vec![(0x0006, 0x99)]);
    }

    #[test]
    fn wsync_style_rdy_stall_freezes_cpu() {
        let mut bus = FlatBus::new();
        bus.mem[0x0FFC] = 0x00;
        bus.mem[0x0FFD] = 0x10;
        bus.mem[0x1000] = 0xEA; // NOP
        let mut cpu = Cpu6507::new();
        cpu.reset(&mut bus);
        bus.rdy = false;
        let pc_before = cpu.pc;
        cpu.step_cycle(&mut bus);
        assert_eq!(cpu.pc, pc_before);
        bus.rdy = true;
        cpu.step_cycle(&mut bus);
        assert_eq!(cpu.pc, pc_before + 1);
    }

    #[test]
    fn jmp_indirect_page_wrap_bug() {
        let mut bus = FlatBus::new();
        bus.mem[0x0FFC] = 0x00;
        bus.mem[0x0FFD] = 0x10;
        bus.mem[0x1000] = 0x6C; // JMP ($10FF)
        bus.mem[0x1001] = 0xFF;
        bus.mem[0x1002] = 0x10;
        bus.mem[0x10FF] = 0x34;
        bus.mem[0x1000 /* wrap: 0x1000 not 0x1100 */] = 0x6C; // keep opcode intact
        bus.mem[0x1000] = 0x6C;
        bus.mem[0x1100] = 0x12; // would be the "correct" high byte, must NOT be used
        let mut cpu = Cpu6507::new();
        cpu.reset(&mut bus);
        for _ in 0..5 {
            cpu.step_cycle(&mut bus);
        }
        // high byte must come from 0x1000 (wrapped), not 0x1100
        assert_eq!(cpu.pc, u16::from_le_bytes([0x34, bus.mem[0x1000]]));
    }

    #[test]
    fn jam_halts_cpu() {
        let mut bus = FlatBus::new();
        bus.mem[0x0FFC] = 0x00;
        bus.mem[0x0FFD] = 0x10;
        bus.mem[0x1000] = 0x02; // JAM
        let mut cpu = Cpu6507::new();
        cpu.reset(&mut bus);
        cpu.step_cycle(&mut bus);
        assert!(cpu.halted);
        let pc = cpu.pc;
        cpu.step_cycle(&mut bus);
        assert_eq!(cpu.pc, pc);
    }

    #[test]
    fn undocumented_lax_loads_a_and_x() {
        let mut bus = FlatBus::new();
        bus.mem[0x0FFC] = 0x00;
        bus.mem[0x0FFD] = 0x10;
        bus.mem[0x1000] = 0xA7; // LAX zp
        bus.mem[0x1001] = 0x10;
        bus.mem[0x0010] = 0x77;
        let mut cpu = Cpu6507::new();
        cpu.reset(&mut bus);
        cpu.step_instruction(&mut bus);
        assert_eq!(cpu.a, 0x77);
        assert_eq!(cpu.x, 0x77);
    }

    #[test]
    fn absolute_x_read_extra_cycle_only_on_page_cross() {
        let mut bus = FlatBus::new();
        bus.mem[0x0FFC] = 0x00;
        bus.mem[0x0FFD] = 0x10;
        bus.mem[0x1000] = 0xBD; // LDA abs,X no cross ($10F0 + 1 = $10F1)
        bus.mem[0x1001] = 0xF0;
        bus.mem[0x1002] = 0x10;
        bus.mem[0x10F1] = 0x5;
        let mut cpu = Cpu6507::new();
        cpu.reset(&mut bus);
        cpu.x = 1;
        cpu.step_instruction(&mut bus);
        assert_eq!(cpu.total_cycles, 4);
        assert_eq!(cpu.a, 5);
    }
}
