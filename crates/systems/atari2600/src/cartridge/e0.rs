//! Parker Bros E0: 8K ROM split into four 1K windows. The first three
//! windows each independently select one of eight 1K segments via hotspots
//! 0x1FE0-0x1FE7/0x1FE8-0x1FEF/0x1FF0-0x1FF7; the last window is hardwired
//! to segment 7.

use super::{CartridgeError, Mapper};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct E0 {
    rom: Vec<u8>,
    segments: [usize; 4],
}

impl E0 {
    pub fn new(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        if rom.len() != 8192 {
            return Err(CartridgeError::SchemeSizeMismatch(rom.len()));
        }
        Ok(Self { rom, segments: [0, 1, 2, 7] })
    }

    fn check_hotspot(&mut self, offset: u16) {
        let o = offset & 0x0FFF;
        match o {
            0x0FE0..=0x0FE7 => self.segments[0] = (o - 0x0FE0) as usize,
            0x0FE8..=0x0FEF => self.segments[1] = (o - 0x0FE8) as usize,
            0x0FF0..=0x0FF7 => self.segments[2] = (o - 0x0FF0) as usize,
            _ => {}
        }
    }
}

impl Mapper for E0 {
    fn access(&mut self, offset: u16) -> u8 {
        self.check_hotspot(offset);
        let o = (offset & 0x0FFF) as usize;
        let window = o / 1024;
        let seg = self.segments[window.min(3)];
        let within = o % 1024;
        self.rom[seg * 1024 + within]
    }

    fn access_volatile(&mut self, offset: u16, _val: u8) {
        self.check_hotspot(offset);
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "kind": "e0", "rom": self.rom, "segments": self.segments })
    }

    fn restore(&mut self, value: &serde_json::Value) -> Result<(), CartridgeError> {
        if let Some(segs) = value.get("segments").and_then(|v| v.as_array()) {
            for (i, s) in segs.iter().enumerate().take(4) {
                if let Some(v) = s.as_u64() {
                    self.segments[i] = v as usize;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_window_selects_segment_via_hotspot() {
        let mut rom = vec![0u8; 8192];
        rom[3 * 1024] = 0x77;
        let mut cart = E0::new(rom).unwrap();
        cart.access(0x0FE3);
        assert_eq!(cart.access(0x0000), 0x77);
    }

    #[test]
    fn last_window_fixed_to_segment_seven() {
        let mut rom = vec![0u8; 8192];
        rom[7 * 1024] = 0x99;
        let mut cart = E0::new(rom).unwrap();
        assert_eq!(cart.access(0x0C00), 0x99);
    }
}
