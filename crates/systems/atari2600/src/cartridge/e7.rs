//! M-Network E7: 16K ROM + 2K RAM. The first 2K window selects one of eight
//! 2K ROM banks (hotspots 0x1FE0-0x1FE7, bank 7 reserved for RAM access);
//! the second 1K window selects one of four 256-byte RAM banks for
//! reading/writing (hotspots 0x1FE8-0x1FEB write-enable, 0x1FEC-0x1FEF
//! select which 256-byte bank is mapped for reading at 0x1900-0x19FF).

use super::{CartridgeError, Mapper, RamBus};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct E7 {
    rom: Vec<u8>,
    low_bank: usize,
    ram_bank: usize,
    ram: [u8; 1024],
}

impl E7 {
    pub fn new(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        if rom.len() != 16384 {
            return Err(CartridgeError::SchemeSizeMismatch(rom.len()));
        }
        Ok(Self { rom, low_bank: 0, ram_bank: 0, ram: [0; 1024] })
    }

    fn check_hotspot(&mut self, offset: u16) {
        let o = offset & 0x0FFF;
        match o {
            0x0FE0..=0x0FE7 => self.low_bank = (o - 0x0FE0) as usize,
            0x0FE8..=0x0FEB => self.ram_bank = (o - 0x0FE8) as usize,
            _ => {}
        }
    }
}

impl Mapper for E7 {
    fn access(&mut self, offset: u16) -> u8 {
        self.check_hotspot(offset);
        let o = (offset & 0x0FFF) as usize;
        if o < 0x0800 {
            if self.low_bank == 7 {
                return self.ram[o % 256 + 768];
            }
            self.rom[self.low_bank * 2048 + o]
        } else if (0x0900..0x0A00).contains(&o) {
            self.ram[self.ram_bank * 256 + (o - 0x0900)]
        } else {
            self.rom[14 * 1024 + (o - 0x0800)]
        }
    }

    fn access_volatile(&mut self, offset: u16, val: u8) {
        self.check_hotspot(offset);
        let o = (offset & 0x0FFF) as usize;
        if o < 0x0100 && self.low_bank == 7 {
            self.ram[o % 256 + 768] = val;
        }
    }

    fn ram_bus(&mut self) -> Option<&mut dyn RamBus> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "kind": "e7", "rom": self.rom, "low_bank": self.low_bank, "ram_bank": self.ram_bank, "ram": self.ram.to_vec() })
    }

    fn restore(&mut self, value: &serde_json::Value) -> Result<(), CartridgeError> {
        if let Some(b) = value.get("low_bank").and_then(|v| v.as_u64()) {
            self.low_bank = b as usize;
        }
        Ok(())
    }
}

impl RamBus for E7 {
    fn ram(&self) -> &[u8] {
        &self.ram
    }
    fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_bank_switches_among_eight_2k_banks() {
        let mut rom = vec![0u8; 16384];
        rom[2048] = 0x5A;
        let mut cart = E7::new(rom).unwrap();
        cart.access(0x0FE1);
        assert_eq!(cart.access(0x0000), 0x5A);
    }

    #[test]
    fn ram_bank_7_overlays_low_window() {
        let mut cart = E7::new(vec![0u8; 16384]).unwrap();
        cart.access(0x0FE7);
        cart.access_volatile(0x0010, 0x33);
        assert_eq!(cart.access(0x0010), 0x33);
    }
}
