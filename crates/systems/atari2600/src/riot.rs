//! RIOT (6532): 128 bytes of RAM, an interval timer, and two 8-bit I/O ports.
//!
//! RAM layout, interval timer post-underflow behaviour, the `Cell<bool>`
//! underflow-latch trick, and the port A/B "DDR-ORed-with-external-input"
//! read-back subtlety real RIOT hardware exhibits.

use serde::{Deserialize, Serialize};
use std::cell::Cell;

const RAM_SIZE: usize = 128;

fn serialize_ram<S: serde::Serializer>(ram: &[u8; RAM_SIZE], s: S) -> Result<S::Ok, S::Error> {
    ram.serialize(s)
}

fn deserialize_ram<'de, D: serde::Deserializer<'de>>(d: D) -> Result<[u8; RAM_SIZE], D::Error> {
    let v: Vec<u8> = Vec::deserialize(d)?;
    let mut out = [0u8; RAM_SIZE];
    let n = v.len().min(RAM_SIZE);
    out[..n].copy_from_slice(&v[..n]);
    Ok(out)
}

fn serialize_cell_bool<S: serde::Serializer>(c: &Cell<bool>, s: S) -> Result<S::Ok, S::Error> {
    c.get().serialize(s)
}

fn deserialize_cell_bool<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Cell<bool>, D::Error> {
    Ok(Cell::new(bool::deserialize(d)?))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Riot {
    #[serde(serialize_with = "serialize_ram", deserialize_with = "deserialize_ram")]
    ram: [u8; RAM_SIZE],

    /// Output latch for port A (joysticks); only bits marked as outputs by
    /// `swacnt` actually drive pins.
    swcha_latch: u8,
    swacnt: u8,
    /// External input presented on port A (controller switches). Bits the
    /// DDR marks as outputs override this when read back.
    swcha_external: u8,

    swchb_latch: u8,
    swbcnt: u8,
    swchb_external: u8,

    timer_interval: u16,
    /// Countdown to the next INTIM decrement; reloaded to `timer_interval`
    /// after each prescaled decrement, forced to 1 for the single tick that
    /// carries INTIM from 0 into the post-underflow phase.
    prescaler: u16,
    /// The architecturally visible INTIM byte.
    intim: u8,
    /// Once INTIM has underflowed past zero it decrements once per tick
    /// (prescaler forced to 1) until a new value is written.
    post_underflow: bool,
    #[serde(serialize_with = "serialize_cell_bool", deserialize_with = "deserialize_cell_bool")]
    timer_underflowed: Cell<bool>,
    timer_irq_enabled: bool,
}

impl Default for Riot {
    fn default() -> Self {
        Self::new()
    }
}

impl Riot {
    pub fn new() -> Self {
        Self {
            ram: [0; RAM_SIZE],
            swcha_latch: 0,
            swacnt: 0,
            swcha_external: 0xFF,
            swchb_latch: 0,
            swbcnt: 0,
            swchb_external: 0xFF,
            timer_interval: 1,
            prescaler: 1,
            intim: 0,
            post_underflow: false,
            timer_underflowed: Cell::new(false),
            timer_irq_enabled: false,
        }
    }

    pub fn read_ram(&self, addr: u16) -> u8 {
        self.ram[(addr as usize) & (RAM_SIZE - 1)]
    }

    pub fn write_ram(&mut self, addr: u16, val: u8) {
        self.ram[(addr as usize) & (RAM_SIZE - 1)] = val;
    }

    /// Joystick / console-switch input simulation hook.
    pub fn set_port_a_external(&mut self, bits: u8) {
        self.swcha_external = bits;
    }

    pub fn set_port_b_external(&mut self, bits: u8) {
        self.swchb_external = bits;
    }

    fn port_value(latch: u8, ddr: u8, external: u8) -> u8 {
        (latch & ddr) | (external & !ddr)
    }

    pub fn read_io(&self, addr: u16) -> Option<u8> {
        match addr & 0x07 {
            0x00 => Some(Self::port_value(self.swcha_latch, self.swacnt, self.swcha_external)),
            0x01 => Some(self.swacnt),
            0x02 => Some(Self::port_value(self.swchb_latch, self.swbcnt, self.swchb_external)),
            0x03 => Some(self.swbcnt),
            0x04 => Some(self.intim),
            0x05 => {
                let flag = if self.timer_underflowed.get() { 0x80 } else { 0x00 };
                self.timer_underflowed.set(false);
                Some(flag)
            }
            _ => None,
        }
    }

    pub fn write_io(&mut self, addr: u16, val: u8) {
        match addr & 0x17 {
            0x00 => self.swcha_latch = val,
            0x01 => self.swacnt = val,
            0x02 => self.swchb_latch = val,
            0x03 => self.swbcnt = val,
            0x14 => self.set_timer(val, 1, false),
            0x15 => self.set_timer(val, 8, false),
            0x16 => self.set_timer(val, 64, false),
            0x17 => self.set_timer(val, 1024, false),
            0x1C => self.set_timer(val, 1, true),
            0x1D => self.set_timer(val, 8, true),
            0x1E => self.set_timer(val, 64, true),
            0x1F => self.set_timer(val, 1024, true),
            _ => {}
        }
    }

    fn set_timer(&mut self, val: u8, interval: u16, irq_enabled: bool) {
        self.timer_interval = interval;
        self.intim = val;
        self.prescaler = interval;
        self.post_underflow = false;
        self.timer_irq_enabled = irq_enabled;
        self.timer_underflowed.set(false);
    }

    pub fn timer_irq_asserted(&self) -> bool {
        self.timer_irq_enabled && self.timer_underflowed.get()
    }

    /// One colour clock, i.e. one RIOT cycle (RIOT runs at the CPU's 1/3rd
    /// colour-clock rate; the orchestrator only calls this on CPU cycles,
    /// see `orchestrator.rs`). INTIM only decrements once per `timer_interval`
    /// ticks while counting down; once it reaches zero the next tick wraps
    /// it to 0xFF, sets the underflow flag, and switches to decrementing
    /// every tick until the timer is rewritten.
    pub fn tick(&mut self) {
        if self.post_underflow {
            self.intim = self.intim.wrapping_sub(1);
            return;
        }
        self.prescaler -= 1;
        if self.prescaler == 0 {
            if self.intim == 0 {
                self.intim = 0xFF;
                self.post_underflow = true;
                self.timer_underflowed.set(true);
            } else {
                self.intim -= 1;
                self.prescaler = if self.intim == 0 { 1 } else { self.timer_interval };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_underflow_after_n_times_interval() {
        let mut riot = Riot::new();
        riot.write_io(0x17, 5); // T1024T = 5 -> 5*1024 cycles to zero
        for _ in 0..5120 {
            riot.tick();
        }
        assert_eq!(riot.read_io(0x04), Some(0));
    }

    #[test]
    fn intim_reads_the_unscaled_value_mid_countdown() {
        let mut riot = Riot::new();
        riot.write_io(0x17, 5); // T1024T = 5
        assert_eq!(riot.read_io(0x04), Some(5)); // readable immediately, not *1024
        for _ in 0..2560 {
            riot.tick();
        }
        assert_eq!(riot.read_io(0x04), Some(3));
    }

    #[test]
    fn timer_wraps_to_ff_and_sets_flag_after_underflow() {
        let mut riot = Riot::new();
        riot.write_io(0x17, 5);
        for _ in 0..5121 {
            riot.tick();
        }
        assert_eq!(riot.read_io(0x04), Some(0xFF));
        assert_eq!(riot.read_io(0x05), Some(0x80));
    }

    #[test]
    fn underflow_flag_clears_on_read() {
        let mut riot = Riot::new();
        riot.write_io(0x17, 1);
        for _ in 0..1025 {
            riot.tick();
        }
        assert_eq!(riot.read_io(0x05), Some(0x80));
        assert_eq!(riot.read_io(0x05), Some(0x00));
    }

    #[test]
    fn port_a_output_bits_read_back_latch_input_bits_read_external() {
        let mut riot = Riot::new();
        riot.write_io(0x01, 0x0F); // DDRA: low nibble output, high nibble input
        riot.write_io(0x00, 0xFF); // latch all 1s
        riot.set_port_a_external(0x00); // external pulled low
        let v = riot.read_io(0x00).unwrap();
        assert_eq!(v & 0x0F, 0x0F); // output bits reflect latch
        assert_eq!(v & 0xF0, 0x00); // input bits reflect external pins
    }

    #[test]
    fn ram_mirrors_within_128_bytes() {
        let mut riot = Riot::new();
        riot.write_ram(0x00, 0x55);
        assert_eq!(riot.read_ram(0x80), 0x55);
    }
}
