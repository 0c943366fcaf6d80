//! Atari F4: 32K ROM as eight swappable 4K banks, hotspots 0x1FF4-0x1FFB.

use super::{CartridgeError, Mapper};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct F4 {
    rom: Vec<u8>,
    bank: usize,
}

impl F4 {
    pub fn new(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        if rom.len() != 32768 {
            return Err(CartridgeError::SchemeSizeMismatch(rom.len()));
        }
        Ok(Self { rom, bank: 0 })
    }

    fn check_hotspot(&mut self, offset: u16) {
        if let 0x0FF4..=0x0FFB = offset & 0x0FFF {
            self.bank = (offset as usize & 0x0FFF) - 0x0FF4;
        }
    }
}

impl Mapper for F4 {
    fn access(&mut self, offset: u16) -> u8 {
        self.check_hotspot(offset);
        let base = self.bank * 4096;
        self.rom[base + (offset as usize & 0x0FFF)]
    }

    fn access_volatile(&mut self, offset: u16, _val: u8) {
        self.check_hotspot(offset);
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "kind": "f4", "rom": self.rom, "bank": self.bank })
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
    fn switches_among_eight_banks() {
        let mut rom = vec![0u8; 32768];
        for b in 0..8 {
            rom[b * 4096] = b as u8;
        }
        let mut cart = F4::new(rom).unwrap();
        for b in 0..8 {
            cart.access(0x0FF4 + b as u16);
            assert_eq!(cart.access(0x0000), b as u8);
        }
    }
}
