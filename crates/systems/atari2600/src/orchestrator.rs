//! The engine's run loop: advances the whole machine one colour clock at a
//! time, stepping the CPU on every third clock (the 6507 runs at a third of
//! the TIA's rate), and stopping at whatever boundary the caller asked for —
//! a completed frame, a completed scanline, a breakpoint/watchpoint/trap, or
//! a cartridge ARM fault.
//!
//! A plain loop over a `StopReason`-style enum rather than a callback-driven
//! event system, with breakpoint/watchpoint/trap machinery a debugger
//! front-end needs (the debugger UI itself is out of scope; only the hooks
//! it would attach to live in this core).

use crate::bus::Atari2600Bus;
use crate::cpu::Cpu6507;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    FrameComplete,
    ScanlineComplete,
    Breakpoint(u16),
    Watchpoint(u16),
    Trap,
    Halted,
    CancelRequested,
    ArmFault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunUntil {
    Frame,
    Scanline,
    ColorClocks(u32),
}

/// Observer hooks a debugger-style caller installs; all default to
/// never-fire so plain playback pays nothing for them.
#[derive(Debug, Default, Clone)]
pub struct Breakpoints {
    pub pc: Vec<u16>,
    pub write_watch: Vec<u16>,
}

impl Breakpoints {
    pub fn hit_pc(&self, pc: u16) -> bool {
        self.pc.contains(&pc)
    }
}

pub struct Orchestrator {
    pub cpu: Cpu6507,
    pub bus: Atari2600Bus,
    pub breakpoints: Breakpoints,
    pub cancel_requested: bool,
    color_clock_in_line: u32,
    scanline_just_started: bool,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            cpu: Cpu6507::new(),
            bus: Atari2600Bus::new(),
            breakpoints: Breakpoints::default(),
            cancel_requested: false,
            color_clock_in_line: 0,
            scanline_just_started: true,
        }
    }

    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
        self.color_clock_in_line = 0;
        self.scanline_just_started = true;
    }

    /// Advance exactly one colour clock: TIA/RIOT tick, then (every third
    /// clock, and only while RDY is high) one CPU bus cycle, then the
    /// mounted cartridge's own `step` hook.
    fn tick_one_color_clock(&mut self) -> Option<StopReason> {
        if self.scanline_just_started {
            self.bus.clear_wsync();
            self.scanline_just_started = false;
        }

        self.bus.tick_color_clock();

        if self.color_clock_in_line % 3 == 0 {
            if self.cpu.halted {
                return Some(StopReason::Halted);
            }
            self.cpu.step_cycle(&mut self.bus);
            if !self.cpu.is_mid_instruction() && self.breakpoints.hit_pc(self.cpu.pc) {
                return Some(StopReason::Breakpoint(self.cpu.pc));
            }
        }

        if let Some(cart) = &mut self.bus.cartridge {
            cart.step(1);
            if cart.arm_fault().is_some() {
                self.color_clock_in_line += 1;
                return Some(StopReason::ArmFault);
            }
        }

        self.color_clock_in_line += 1;
        if self.color_clock_in_line >= crate::tia::CLOCKS_PER_SCANLINE {
            self.color_clock_in_line = 0;
            self.scanline_just_started = true;
            return Some(StopReason::ScanlineComplete);
        }
        None
    }

    /// Run until `until` is satisfied or a higher-priority stop condition
    /// (cancel, halt, breakpoint, watchpoint) fires first.
    pub fn run(&mut self, until: RunUntil) -> StopReason {
        let mut scanlines_seen = 0u32;
        let mut clocks_seen = 0u32;
        let mut saw_vsync_low_to_high = false;
        let mut prev_vsync = self.bus.tia.vsync;

        loop {
            if self.cancel_requested {
                self.cancel_requested = false;
                return StopReason::CancelRequested;
            }
            if let Some(reason) = self.tick_one_color_clock() {
                match reason {
                    StopReason::ScanlineComplete => {
                        scanlines_seen += 1;
                        let vsync_now = self.bus.tia.vsync;
                        if !prev_vsync && vsync_now {
                            saw_vsync_low_to_high = true;
                        }
                        prev_vsync = vsync_now;
                        if until == RunUntil::Scanline {
                            return StopReason::ScanlineComplete;
                        }
                        if until == RunUntil::Frame && saw_vsync_low_to_high {
                            return StopReason::FrameComplete;
                        }
                    }
                    other => return other,
                }
            }
            clocks_seen += 1;
            if let RunUntil::ColorClocks(n) = until {
                if clocks_seen >= n {
                    return StopReason::Trap;
                }
            }
            let _ = scanlines_seen;
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::atari_rom::AtariRom;

    #[test]
    fn wsync_write_stalls_cpu_until_scanline_boundary() {
        let mut orch = Orchestrator::new();
        // LDA #0 ; STA WSYNC ; loop forever (JMP back two bytes)
        let mut rom = vec![0xEAu8; 4096];
        rom[0] = 0xA9;
        rom[1] = 0x00;
        rom[2] = 0x85;
        rom[3] = 0x02;
        rom[4] = 0x4C;
        rom[5] = 0x02;
        rom[6] = 0x00;
        rom[2046] = 0x00;
        rom[2047] = 0xF0;
        orch.bus.mount(Box::new(AtariRom::new(rom).unwrap()));
        orch.reset();
        let reason = orch.run(RunUntil::Scanline);
        assert_eq!(reason, StopReason::ScanlineComplete);
        assert_eq!(orch.bus.tia.horizontal_clock(), 0);
    }
}
