//! Activision FE: 8K ROM as two 4K banks. Unlike F8, there is no dedicated
//! hotspot register — the real hardware snoops the address bus for the PC
//! high byte being pushed to the stack during a JSR into a fixed target and
//! reads bit 5 of that byte to pick the bank. We approximate the same idea
//! by watching every stack-page write — a deliberate simplification rather
//! than full address-bus snooping.

use super::{CartridgeError, Mapper};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fe {
    rom: Vec<u8>,
    bank: usize,
}

impl Fe {
    pub fn new(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        if rom.len() != 8192 {
            return Err(CartridgeError::SchemeSizeMismatch(rom.len()));
        }
        Ok(Self { rom, bank: 0 })
    }
}

impl Mapper for Fe {
    fn access(&mut self, offset: u16) -> u8 {
        let base = self.bank * 4096;
        self.rom[base + (offset as usize & 0x0FFF)]
    }

    fn access_volatile(&mut self, _offset: u16, _val: u8) {}

    fn access_passive(&mut self, full_addr: u16, val: u8) {
        // Stack-page write during the JSR that selects a bank: the real
        // boards read address bit 13 of the target via D5 of the pushed PC
        // high byte.
        if full_addr & 0x1F00 == 0x0100 {
            self.bank = ((val >> 5) & 0x01) as usize;
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "kind": "fe", "rom": self.rom, "bank": self.bank })
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
    fn stack_write_picks_bank_from_bit5() {
        let mut rom = vec![0u8; 8192];
        rom[0x0000] = 0x11;
        rom[0x1000] = 0x22;
        let mut cart = Fe::new(rom).unwrap();
        assert_eq!(cart.access(0x0000), 0x11);
        cart.access_passive(0x01FD, 0x20); // bit5 set -> bank 1
        assert_eq!(cart.access(0x0000), 0x22);
    }
}
