//! Atari F8: 8K ROM as two swappable 4K banks, hotspots at 0x1FF8/0x1FF9.

use super::{CartridgeError, Mapper};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct F8 {
    rom: Vec<u8>,
    bank: usize,
}

impl F8 {
    pub fn new(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        if rom.len() != 8192 {
            return Err(CartridgeError::SchemeSizeMismatch(rom.len()));
        }
        Ok(Self { rom, bank: 1 })
    }

    fn check_hotspot(&mut self, offset: u16) {
        match offset & 0x0FFF {
            0x0FF8 => self.bank = 0,
            0x0FF9 => self.bank = 1,
            _ => {}
        }
    }
}

impl Mapper for F8 {
    fn access(&mut self, offset: u16) -> u8 {
        self.check_hotspot(offset);
        let base = self.bank * 4096;
        self.rom[base + (offset as usize & 0x0FFF)]
    }

    fn access_volatile(&mut self, offset: u16, _val: u8) {
        self.check_hotspot(offset);
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "kind": "f8", "rom": self.rom, "bank": self.bank })
    }

    fn restore(&mut self, value: &serde_json::Value) -> Result<(), CartridgeError> {
        if let Some(bank) = value.get("bank").and_then(|v| v.as_u64()) {
            self.bank = bank as usize;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_bank_1_and_switches_on_hotspot_read() {
        let mut rom = vec![0u8; 8192];
        rom[0x0010] = 0xAA; // bank 0
        rom[0x1010] = 0xBB; // bank 1
        let mut cart = F8::new(rom).unwrap();
        assert_eq!(cart.access(0x0010), 0xBB);
        cart.access(0x0FF8);
        assert_eq!(cart.access(0x0010), 0xAA);
    }
}
