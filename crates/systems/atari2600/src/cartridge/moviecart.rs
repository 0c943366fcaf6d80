//! MovieCart: plays back a pre-rendered stream of TIA register writes and
//! audio samples rather than running 6507 code at all. Out of scope here is
//! decoding the actual MovieCart container format and any video/audio
//! codec; the core only accepts an already-demuxed sequence of bytes fed in
//! through `TapeSource`, one simulated "frame" of register pokes at a time.

use super::{CartridgeError, Mapper, TapeSource};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieCart {
    stream: Vec<u8>,
    cursor: usize,
    last_byte: u8,
}

impl MovieCart {
    pub fn new() -> Self {
        Self { stream: Vec::new(), cursor: 0, last_byte: 0 }
    }
}

impl Default for MovieCart {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper for MovieCart {
    fn access(&mut self, _offset: u16) -> u8 {
        self.last_byte
    }

    fn access_volatile(&mut self, _offset: u16, _val: u8) {}

    fn step(&mut self, _color_clocks: u32) {
        if self.cursor < self.stream.len() {
            self.last_byte = self.stream[self.cursor];
            self.cursor += 1;
        }
    }

    fn tape_bus(&mut self) -> Option<&mut dyn TapeSource> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "kind": "moviecart", "cursor": self.cursor })
    }

    fn restore(&mut self, value: &serde_json::Value) -> Result<(), CartridgeError> {
        if let Some(c) = value.get("cursor").and_then(|v| v.as_u64()) {
            self.cursor = c as usize;
        }
        Ok(())
    }
}

impl TapeSource for MovieCart {
    fn feed_byte(&mut self, byte: u8) {
        self.stream.push(byte);
    }

    fn tape_position(&self) -> u64 {
        self.cursor as u64
    }

    fn tape_exhausted(&self) -> bool {
        self.cursor >= self.stream.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepping_consumes_fed_bytes_in_order() {
        let mut cart = MovieCart::new();
        cart.feed_byte(0x11);
        cart.feed_byte(0x22);
        cart.step(1);
        assert_eq!(cart.access(0), 0x11);
        cart.step(1);
        assert_eq!(cart.access(0), 0x22);
        assert!(cart.tape_exhausted());
    }
}
