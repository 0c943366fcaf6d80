//! Atari 2600 core emulation engine: 6507 CPU, TIA, RIOT, the shared
//! address bus, cartridge mappers (including the ARM7TDMI-backed DPC+/CDF
//! scheme), and the colour-clock orchestrator that drives them together.
//!
//! Windowing, rendering/CRT post-processing, audio resampling/playback,
//! a debugger UI and config file loading all live outside this crate —
//! callers own the event loop and pixel/sample presentation; this crate
//! only produces the colour-index/sample stream and the hooks a debugger
//! front-end would attach to.

pub mod arm7tdmi;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod error;
pub mod input;
pub mod orchestrator;
pub mod riot;
pub mod snapshot;
pub mod tia;

pub use bus::Atari2600Bus;
pub use cartridge::Mapper;
pub use cpu::Cpu6507;
pub use error::EngineError;
pub use input::{InputEvent, InputState};
pub use orchestrator::{Orchestrator, RunUntil, StopReason};

/// The whole machine: CPU, bus (which owns TIA/RIOT/cartridge), and the
/// input state feeding RIOT/TIA ports. This is the type embedding
/// applications construct; `Orchestrator` alone is enough for headless
/// stepping, but most callers also want input plumbing and a single
/// `load_cartridge`/`reset`/`run_frame` surface.
pub struct Atari2600 {
    pub orchestrator: Orchestrator,
    pub input: InputState,
}

impl Atari2600 {
    pub fn new() -> Self {
        Self { orchestrator: Orchestrator::new(), input: InputState::new() }
    }

    /// Detect a bankswitch scheme from ROM size alone and mount it. Callers
    /// with header metadata identifying an ambiguous-size scheme (E0/3F/FE
    /// at 8K, for instance) should construct the `Mapper` directly and use
    /// `mount` instead.
    pub fn load_cartridge(&mut self, rom: &[u8]) -> Result<(), EngineError> {
        let cart = cartridge::detect(rom)?;
        self.orchestrator.bus.mount(cart);
        Ok(())
    }

    pub fn mount(&mut self, cart: Box<dyn Mapper>) {
        self.orchestrator.bus.mount(cart);
    }

    pub fn reset(&mut self) {
        self.orchestrator.reset();
    }

    pub fn apply_input(&mut self, event: InputEvent) {
        self.input.apply(event);
        self.input.drive_ports(&mut self.orchestrator.bus.riot, &mut self.orchestrator.bus.tia);
    }

    pub fn run_frame(&mut self) -> StopReason {
        self.orchestrator.run(RunUntil::Frame)
    }

    pub fn run_scanline(&mut self) -> StopReason {
        self.orchestrator.run(RunUntil::Scanline)
    }

    pub fn snapshot(&self) -> serde_json::Value {
        snapshot::capture(&self.orchestrator.cpu, &self.orchestrator.bus)
    }

    pub fn restore_snapshot(&mut self, value: &serde_json::Value) -> Result<(), EngineError> {
        snapshot::restore(value, &mut self.orchestrator.cpu, &mut self.orchestrator.bus)
    }
}

impl Default for Atari2600 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_engine_has_no_cartridge_and_reports_engine_error_on_reset_read() {
        let engine = Atari2600::new();
        assert!(engine.orchestrator.bus.cartridge.is_none());
    }

    #[test]
    fn loading_a_2k_rom_mounts_the_plain_atari_rom_mapper() {
        let mut engine = Atari2600::new();
        engine.load_cartridge(&vec![0u8; 2048]).unwrap();
        assert!(engine.orchestrator.bus.cartridge.is_some());
        engine.reset();
    }

    #[test]
    fn console_switches_reach_riot_port_b_through_apply_input() {
        let mut engine = Atari2600::new();
        engine.load_cartridge(&vec![0u8; 2048]).unwrap();
        engine.apply_input(InputEvent::Console { button: input::Panel::Reset, pressed: true });
        let v = engine.orchestrator.bus.riot.read_io(0x02).unwrap();
        assert_eq!(v & 0x01, 0x00);
    }
}
