//! Starpath Supercharger: no ROM at all beyond a small resident BIOS — the
//! rest of the address space is RAM loaded from an audio-cassette-encoded
//! tape at runtime. The core only exposes a byte-level `TapeSource`; the FSK
//! decode that turns a WAV waveform into bytes is out of scope; audio
//! resampling/playback lives outside this core entirely.
//!
//! Three 2K RAM banks are selectable independently for each of the write and
//! read windows via the "bankswitch" register the BIOS writes to 0x1FF8,
//! whose bit layout also controls whether each bank is write-enabled.

use super::{CartridgeError, Mapper, RamBus, TapeSource};
use serde::{Deserialize, Serialize};
use serde_json::json;

const BANK_SIZE: usize = 2048;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supercharger {
    bios: Vec<u8>,
    banks: [[u8; BANK_SIZE]; 3],
    bank_select: usize,
    write_enabled: [bool; 3],
    tape: Vec<u8>,
    tape_pos: usize,
}

impl Supercharger {
    pub fn new(bios: Vec<u8>) -> Result<Self, CartridgeError> {
        if bios.len() != 2048 {
            return Err(CartridgeError::SchemeSizeMismatch(bios.len()));
        }
        Ok(Self {
            bios,
            banks: [[0; BANK_SIZE]; 3],
            bank_select: 0,
            write_enabled: [false; 3],
            tape: Vec::new(),
            tape_pos: 0,
        })
    }

    fn set_bankswitch_register(&mut self, val: u8) {
        self.bank_select = (val & 0x03) as usize;
        if self.bank_select > 2 {
            self.bank_select = 2;
        }
        for (i, enabled) in self.write_enabled.iter_mut().enumerate() {
            *enabled = (val >> (3 + i)) & 1 != 0;
        }
    }
}

impl Mapper for Supercharger {
    fn access(&mut self, offset: u16) -> u8 {
        let o = (offset & 0x0FFF) as usize;
        if o < 0x0800 {
            self.banks[self.bank_select][o]
        } else if o < 0x0FF8 {
            self.bios[o - 0x0800]
        } else {
            // hotspot region mirrors into BIOS too
            self.bios[o - 0x0800]
        }
    }

    fn access_volatile(&mut self, offset: u16, val: u8) {
        let o = offset & 0x0FFF;
        if o == 0x0FF8 {
            self.set_bankswitch_register(val);
        } else if (o as usize) < 0x0800 && self.write_enabled[self.bank_select] {
            self.banks[self.bank_select][o as usize] = val;
        }
    }

    fn ram_bus(&mut self) -> Option<&mut dyn RamBus> {
        Some(self)
    }

    fn tape_bus(&mut self) -> Option<&mut dyn TapeSource> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({
            "kind": "supercharger",
            "banks": self.banks.iter().map(|b| b.to_vec()).collect::<Vec<_>>(),
            "bank_select": self.bank_select,
            "write_enabled": self.write_enabled,
        })
    }

    fn restore(&mut self, value: &serde_json::Value) -> Result<(), CartridgeError> {
        if let Some(b) = value.get("bank_select").and_then(|v| v.as_u64()) {
            self.bank_select = b as usize;
        }
        Ok(())
    }
}

impl RamBus for Supercharger {
    fn ram(&self) -> &[u8] {
        &self.banks[self.bank_select]
    }
    fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.banks[self.bank_select]
    }
}

impl TapeSource for Supercharger {
    fn feed_byte(&mut self, byte: u8) {
        self.tape.push(byte);
    }

    fn tape_position(&self) -> u64 {
        self.tape_pos as u64
    }

    fn tape_exhausted(&self) -> bool {
        self.tape_pos >= self.tape.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bankswitch_register_selects_bank_and_write_enable() {
        let mut cart = Supercharger::new(vec![0u8; 2048]).unwrap();
        cart.access_volatile(0x1FF8, 0b0000_1001); // bank 1, write-enable bank 1
        assert_eq!(cart.bank_select, 1);
        cart.access_volatile(0x1000, 0x55);
        assert_eq!(cart.access(0x1000), 0x55);
    }

    #[test]
    fn write_blocked_when_bank_not_write_enabled() {
        let mut cart = Supercharger::new(vec![0u8; 2048]).unwrap();
        cart.access_volatile(0x1FF8, 0b0000_0000); // bank 0, no write-enable
        cart.access_volatile(0x1000, 0x55);
        assert_eq!(cart.access(0x1000), 0x00);
    }

    #[test]
    fn bios_region_is_read_only_through_access() {
        let mut bios = vec![0u8; 2048];
        bios[0] = 0xEA;
        let mut cart = Supercharger::new(bios).unwrap();
        assert_eq!(cart.access(0x1800), 0xEA);
    }
}
