//! CBS RAM+ (FA): 12K ROM as three 4K banks (hotspots 0x1FF8-0x1FFA) plus
//! 256 bytes of onboard RAM (write 0x1000-0x10FF, read 0x1100-0x11FF).

use super::{CartridgeError, Mapper, RamBus};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fa {
    rom: Vec<u8>,
    bank: usize,
    ram: [u8; 256],
}

impl Fa {
    pub fn new(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        if rom.len() != 12288 {
            return Err(CartridgeError::SchemeSizeMismatch(rom.len()));
        }
        Ok(Self { rom, bank: 0, ram: [0; 256] })
    }

    fn check_hotspot(&mut self, offset: u16) {
        if let 0x0FF8..=0x0FFA = offset & 0x0FFF {
            self.bank = (offset as usize & 0x0FFF) - 0x0FF8;
        }
    }
}

impl Mapper for Fa {
    fn access(&mut self, offset: u16) -> u8 {
        self.check_hotspot(offset);
        let o = offset & 0x0FFF;
        if (0x100..=0x1FF).contains(&o) {
            return self.ram[(o - 0x100) as usize];
        }
        let base = self.bank * 4096;
        self.rom[base + o as usize]
    }

    fn access_volatile(&mut self, offset: u16, val: u8) {
        self.check_hotspot(offset);
        let o = offset & 0x0FFF;
        if (0x000..=0x0FF).contains(&o) {
            self.ram[o as usize] = val;
        }
    }

    fn ram_bus(&mut self) -> Option<&mut dyn RamBus> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "kind": "fa", "rom": self.rom, "bank": self.bank, "ram": self.ram })
    }

    fn restore(&mut self, value: &serde_json::Value) -> Result<(), CartridgeError> {
        if let Some(bank) = value.get("bank").and_then(|v| v.as_u64()) {
            self.bank = bank as usize;
        }
        Ok(())
    }
}

impl RamBus for Fa {
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
    fn ram_write_read_split_windows() {
        let mut cart = Fa::new(vec![0u8; 12288]).unwrap();
        cart.access_volatile(0x0010, 0x5A);
        assert_eq!(cart.access(0x0110), 0x5A);
    }
}
