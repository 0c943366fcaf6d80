//! DPC (Pitfall II): 8K banked ROM plus the "Display Processor Chip" — eight
//! data fetchers, each a down-counter with top/bottom comparators, driving
//! graphics decode, a music mode, and a pseudo-random generator.
//!
//! Register windows within the cartridge's 4K page (mirrors of the real
//! 0x1000-based map): writes at 0x040-0x07F program counters/tops/bottoms;
//! reads at 0x000-0x03F pull the next display-data byte (and advance the
//! fetcher); reads at 0x008-0x00F additionally AND the byte with the
//! fetcher's flag, the trick Pitfall II's terrain renderer depends on.

use super::{CartridgeError, Mapper, RegisterBus};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct Fetcher {
    top: u8,
    bottom: u8,
    counter: u16,
    flag: bool,
    music_mode: bool,
}

impl Fetcher {
    fn advance(&mut self) {
        self.counter = self.counter.wrapping_sub(1) & 0x07FF;
        let low = (self.counter & 0xFF) as u8;
        self.flag = low == self.top || (self.flag && low != self.bottom);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dpc {
    rom: Vec<u8>,
    bank: usize,
    display_data: [u8; 2048],
    fetchers: [Fetcher; 8],
    rng: u8,
}

impl Dpc {
    pub fn new(rom: Vec<u8>, display_data: [u8; 2048]) -> Result<Self, CartridgeError> {
        if rom.len() != 8192 {
            return Err(CartridgeError::SchemeSizeMismatch(rom.len()));
        }
        Ok(Self { rom, bank: 1, display_data, fetchers: [Fetcher::default(); 8], rng: 1 })
    }

    fn check_hotspot(&mut self, offset: u16) {
        match offset & 0x0FFF {
            0x0FF8 => self.bank = 0,
            0x0FF9 => self.bank = 1,
            _ => {}
        }
    }

    fn step_rng(&mut self) -> u8 {
        let bit = ((self.rng >> 7) ^ (self.rng >> 5) ^ (self.rng >> 4) ^ (self.rng >> 3)) & 1;
        self.rng = (self.rng << 1) | bit;
        self.rng
    }
}

impl Mapper for Dpc {
    fn access(&mut self, offset: u16) -> u8 {
        self.check_hotspot(offset);
        let o = offset & 0x0FFF;
        if o < 0x40 {
            let idx = (o & 0x07) as usize;
            let f = &mut self.fetchers[idx];
            let byte = self.display_data[f.counter as usize & 0x7FF];
            let masked = if o & 0x08 != 0 && !f.flag { 0 } else { byte };
            f.advance();
            masked
        } else if o == 0x40 {
            self.step_rng()
        } else {
            let base = self.bank * 4096;
            self.rom[base + o as usize]
        }
    }

    fn access_volatile(&mut self, offset: u16, val: u8) {
        self.check_hotspot(offset);
        let o = offset & 0x0FFF;
        if (0x40..0x80).contains(&o) {
            let idx = (o as usize) & 0x07;
            let field = (o as usize >> 3) & 0x07;
            let f = &mut self.fetchers[idx];
            match field {
                0 => f.top = val,
                1 => f.bottom = val,
                2 => f.counter = (f.counter & 0xFF00) | val as u16,
                3 => {
                    f.counter = (f.counter & 0x00FF) | ((val as u16 & 0x07) << 8);
                    f.music_mode = val & 0x10 != 0;
                }
                _ => {}
            }
        }
    }

    fn register_bus(&mut self) -> Option<&mut dyn RegisterBus> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "kind": "dpc", "rom": self.rom, "bank": self.bank, "display_data": self.display_data.to_vec() })
    }

    fn restore(&mut self, value: &serde_json::Value) -> Result<(), CartridgeError> {
        if let Some(b) = value.get("bank").and_then(|v| v.as_u64()) {
            self.bank = b as usize;
        }
        Ok(())
    }
}

impl RegisterBus for Dpc {
    fn read_register(&mut self, index: u8) -> u8 {
        self.access(0x1000 | index as u16)
    }
    fn write_register(&mut self, index: u8, val: u8) {
        self.access_volatile(0x1040 | (index as u16 & 0x3F), val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetcher_advances_and_flags_at_top() {
        let rom = vec![0u8; 8192];
        let mut data = [0u8; 2048];
        data[10] = 0xAB;
        let mut cart = Dpc::new(rom, data).unwrap();
        cart.access_volatile(0x1052, 11); // field 2 (counter low), fetcher idx 2
        let v = cart.access(0x1002);
        assert_eq!(v, data[11]);
    }
}
