//! Plain Atari 2K/4K ROM, with optional "Superchip" 128-byte RAM overlay
//! (write window 0x000-0x07F, read window 0x080-0x0FF within the cart's
//! address space) used by titles like Dragster and Video Pinball.

use super::{CartridgeError, Mapper, RamBus};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtariRom {
    rom: Vec<u8>,
    superchip_ram: Option<[u8; 128]>,
}

impl AtariRom {
    pub fn new(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        if rom.len() != 2048 && rom.len() != 4096 {
            return Err(CartridgeError::SchemeSizeMismatch(rom.len()));
        }
        Ok(Self { rom, superchip_ram: None })
    }

    pub fn with_superchip(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        let mut this = Self::new(rom)?;
        this.superchip_ram = Some([0; 128]);
        Ok(this)
    }

    fn mask(&self, offset: u16) -> usize {
        (offset as usize) & (self.rom.len() - 1)
    }
}

impl Mapper for AtariRom {
    fn access(&mut self, offset: u16) -> u8 {
        if let Some(ram) = &self.superchip_ram {
            let o = offset & 0x0FFF;
            if (0x080..=0x0FF).contains(&o) {
                return ram[(o - 0x080) as usize];
            }
        }
        self.rom[self.mask(offset)]
    }

    fn access_volatile(&mut self, offset: u16, val: u8) {
        if let Some(ram) = &mut self.superchip_ram {
            let o = offset & 0x0FFF;
            if (0x000..=0x07F).contains(&o) {
                ram[o as usize] = val;
            }
        }
    }

    fn ram_bus(&mut self) -> Option<&mut dyn RamBus> {
        if self.superchip_ram.is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "kind": "atari_rom", "rom": self.rom, "ram": self.superchip_ram })
    }

    fn restore(&mut self, value: &serde_json::Value) -> Result<(), CartridgeError> {
        if let Some(rom) = value.get("rom").and_then(|v| v.as_array()) {
            self.rom = rom.iter().filter_map(|b| b.as_u64()).map(|b| b as u8).collect();
        }
        Ok(())
    }
}

impl RamBus for AtariRom {
    fn ram(&self) -> &[u8] {
        self.superchip_ram.as_ref().map(|r| r.as_slice()).unwrap_or(&[])
    }
    fn ram_mut(&mut self) -> &mut [u8] {
        self.superchip_ram.as_mut().map(|r| r.as_mut_slice()).unwrap_or(&mut [])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_size() {
        assert!(AtariRom::new(vec![0; 100]).is_err());
    }

    #[test]
    fn four_k_reads_through_directly() {
        let mut rom = vec![0u8; 4096];
        rom[0x0ABC] = 0x42;
        let mut cart = AtariRom::new(rom).unwrap();
        assert_eq!(cart.access(0x0ABC), 0x42);
    }

    #[test]
    fn superchip_ram_write_read_split() {
        let mut cart = AtariRom::with_superchip(vec![0u8; 4096]).unwrap();
        cart.access_volatile(0x0010, 0x99);
        assert_eq!(cart.access(0x0090), 0x99);
    }
}
