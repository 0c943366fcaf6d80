//! PlusROM: a thin wrapper around any ordinary bankswitched mapper that
//! additionally watches three extra hotspots (0x1FF2 write-out-byte,
//! 0x1FF3 write-send-to-host, 0x1FF4 read-next-receive-byte) the cartridge
//! ROM's driver code pokes to talk to a remote host. The core never opens a
//! socket itself — a host process drains `take_outgoing`/pumps
//! `push_incoming` on our behalf via the `NetworkBus` capability — the
//! network transport itself is out of scope; the core only exposes a
//! send/receive byte interface.

use super::{CartridgeError, Mapper, NetworkBus};
use serde_json::json;

#[derive(Debug)]
pub struct PlusRom {
    inner: Box<dyn Mapper>,
    host: String,
    path: String,
    write_buffer: Vec<u8>,
    outgoing: Vec<u8>,
    incoming: Vec<u8>,
    incoming_pos: usize,
}

impl PlusRom {
    pub fn new(inner: Box<dyn Mapper>, host: String, path: String) -> Result<Self, CartridgeError> {
        if host.is_empty() {
            return Err(CartridgeError::MissingPlusRomConfig);
        }
        Ok(Self { inner, host, path, write_buffer: Vec::new(), outgoing: Vec::new(), incoming: Vec::new(), incoming_pos: 0 })
    }
}

impl Mapper for PlusRom {
    fn access(&mut self, offset: u16) -> u8 {
        let o = offset & 0x0FFF;
        if o == 0x0FF4 {
            if self.incoming_pos < self.incoming.len() {
                let b = self.incoming[self.incoming_pos];
                self.incoming_pos += 1;
                b
            } else {
                0
            }
        } else {
            self.inner.access(offset)
        }
    }

    fn access_volatile(&mut self, offset: u16, val: u8) {
        let o = offset & 0x0FFF;
        match o {
            0x0FF2 => self.write_buffer.push(val),
            0x0FF3 => {
                self.outgoing.extend(self.write_buffer.drain(..));
                self.incoming.clear();
                self.incoming_pos = 0;
            }
            _ => self.inner.access_volatile(offset, val),
        }
    }

    fn access_passive(&mut self, full_addr: u16, val: u8) {
        self.inner.access_passive(full_addr, val);
    }

    fn step(&mut self, color_clocks: u32) {
        self.inner.step(color_clocks);
    }

    fn ram_bus(&mut self) -> Option<&mut dyn super::RamBus> {
        self.inner.ram_bus()
    }

    fn register_bus(&mut self) -> Option<&mut dyn super::RegisterBus> {
        self.inner.register_bus()
    }

    fn network_bus(&mut self) -> Option<&mut dyn NetworkBus> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({
            "kind": "plusrom",
            "host": self.host,
            "path": self.path,
            "inner": self.inner.snapshot(),
        })
    }

    fn restore(&mut self, value: &serde_json::Value) -> Result<(), CartridgeError> {
        if let Some(inner) = value.get("inner") {
            self.inner.restore(inner)?;
        }
        Ok(())
    }
}

impl NetworkBus for PlusRom {
    fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    fn take_outgoing(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outgoing)
    }

    fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.extend_from_slice(bytes);
        self.incoming_pos = 0;
    }

    fn host_and_path(&self) -> (String, String) {
        (self.host.clone(), self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::atari_rom::AtariRom;

    #[test]
    fn buffered_bytes_flush_to_outgoing_on_send_strobe() {
        let inner = Box::new(AtariRom::new(vec![0u8; 4096]).unwrap());
        let mut cart = PlusRom::new(inner, "example.test".to_string(), "/api".to_string()).unwrap();
        cart.access_volatile(0x1FF2, b'h');
        cart.access_volatile(0x1FF2, b'i');
        assert!(!cart.has_outgoing());
        cart.access_volatile(0x1FF3, 0);
        assert!(cart.has_outgoing());
        assert_eq!(cart.take_outgoing(), vec![b'h', b'i']);
    }

    #[test]
    fn incoming_bytes_readable_through_receive_hotspot() {
        let inner = Box::new(AtariRom::new(vec![0u8; 4096]).unwrap());
        let mut cart = PlusRom::new(inner, "example.test".to_string(), "/api".to_string()).unwrap();
        cart.push_incoming(&[1, 2, 3]);
        assert_eq!(cart.access(0x1FF4), 1);
        assert_eq!(cart.access(0x1FF4), 2);
    }

    #[test]
    fn rejects_empty_host() {
        let inner = Box::new(AtariRom::new(vec![0u8; 4096]).unwrap());
        assert!(PlusRom::new(inner, String::new(), "/api".to_string()).is_err());
    }
}
