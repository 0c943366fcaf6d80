//! Cartridge mappers: the `Mapper` trait plus one module per bankswitch
//! scheme.
//!
//! A single struct with a `BankingScheme` enum and a size-only detector
//! doesn't scale to the full roster (some schemes need RAM, some need a
//! register file, one needs an embedded ARM core), so this is a `Mapper`
//! trait plus optional capability surfaces, one file per concrete scheme.

pub mod atari_rom;
pub mod dpc;
pub mod dpc_plus_cdf;
pub mod e0;
pub mod e7;
pub mod f4;
pub mod f6;
pub mod f8;
pub mod fa;
pub mod fe;
pub mod moviecart;
pub mod plusrom;
pub mod supercharger;
pub mod three_f;

use crate::error::CartridgeError;
use std::fmt::Debug;

/// Capability: cartridge carries onboard RAM addressable by the CPU
/// (Superchip, E7, Supercharger, DPC+/CDF's display-data RAM...).
pub trait RamBus {
    fn ram(&self) -> &[u8];
    fn ram_mut(&mut self) -> &mut [u8];
}

/// Capability: cartridge exposes a register file beyond plain ROM/RAM reads
/// (DPC's data fetchers, DPC+/CDF's fetcher/function registers).
pub trait RegisterBus {
    fn read_register(&mut self, index: u8) -> u8;
    fn write_register(&mut self, index: u8, val: u8);
}

/// Capability: cartridge streams externally-supplied bytes (Supercharger
/// tape load, MovieCart video/audio feed). The core only exposes this
/// narrow interface; decoding the tape/video format is out of scope.
pub trait TapeSource {
    fn feed_byte(&mut self, byte: u8);
    fn tape_position(&self) -> u64;
    fn tape_exhausted(&self) -> bool;
}

/// Capability: PlusROM-style network byte queue. The core never touches a
/// socket; a host pumps bytes in and drains bytes out.
pub trait NetworkBus {
    fn has_outgoing(&self) -> bool;
    fn take_outgoing(&mut self) -> Vec<u8>;
    fn push_incoming(&mut self, bytes: &[u8]);
    fn host_and_path(&self) -> (String, String);
}

/// A mounted cartridge. `access`/`access_volatile` are the CPU's read/write
/// into the 0x1000-0x1FFF cartridge window (offset already masked to 12
/// bits by the bus); `access_passive` additionally observes *every* bus
/// write regardless of destination, which the Tigervision/3F family and the
/// FE "JSR stack snoop" trick both depend on.
pub trait Mapper: Debug {
    fn access(&mut self, offset: u16) -> u8;
    fn access_volatile(&mut self, offset: u16, val: u8);
    fn access_passive(&mut self, _full_addr: u16, _val: u8) {}
    /// Advance any onboard logic (ARM coprocessor, DPC fetchers' music mode)
    /// by `color_clocks` colour clocks of wall time.
    fn step(&mut self, _color_clocks: u32) {}

    /// Most recent ARM coprocessor fault, if this mapper embeds one and it
    /// has halted since the last check. Plain bankswitch schemes never have
    /// one to report.
    fn arm_fault(&self) -> Option<String> {
        None
    }

    fn ram_bus(&mut self) -> Option<&mut dyn RamBus> {
        None
    }
    fn register_bus(&mut self) -> Option<&mut dyn RegisterBus> {
        None
    }
    fn tape_bus(&mut self) -> Option<&mut dyn TapeSource> {
        None
    }
    fn network_bus(&mut self) -> Option<&mut dyn NetworkBus> {
        None
    }

    fn snapshot(&self) -> serde_json::Value;
    fn restore(&mut self, value: &serde_json::Value) -> Result<(), CartridgeError>;
}

fn contains_sequence(rom: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && rom.len() >= needle.len() && rom.windows(needle.len()).any(|w| w == needle)
}

/// Parker Bros E0 carts select their three switchable 1K windows by
/// STA/LDA absolute to one of the 0x1FE0-0x1FE7/0x1FE8-0x1FEF/0x1FF0-0x1FF7
/// hotspot ranges; the presence of any such opcode/operand pair anywhere in
/// the image is a strong fingerprint for the scheme.
fn looks_like_parker_bros_e0(rom: &[u8]) -> bool {
    for hotspot_hi in [0xE0u8, 0xE8, 0xF0] {
        for lo in 0..8u8 {
            let hotspot = hotspot_hi.wrapping_add(lo);
            if contains_sequence(rom, &[0x8D, hotspot, 0x1F]) || contains_sequence(rom, &[0xAD, hotspot, 0x1F]) {
                return true;
            }
        }
    }
    false
}

/// Activision FE has no dedicated hotspot register at all; real hardware
/// snoops the JSR that pushes a particular return address onto the stack.
/// The games that use it call through one of a small number of fixed
/// addresses, which makes their object code fingerprintable by the
/// JSR-plus-following-bytes sequence instead of by any register write.
fn looks_like_activision_fe(rom: &[u8]) -> bool {
    const SIGNATURES: [[u8; 5]; 2] =
        [[0x20, 0x00, 0xD0, 0xC6, 0xC5], [0x20, 0xC3, 0xF8, 0xA5, 0x82]];
    SIGNATURES.iter().any(|sig| contains_sequence(rom, sig))
}

/// Tigervision 3F bankswitches on a write to the $3F mirror; almost every
/// 3F cart's bankswitch routine is the same two-instruction idiom.
fn looks_like_tigervision_3f(rom: &[u8]) -> bool {
    rom.windows(4).any(|w| w[0] == 0xA9 && w[2] == 0x85 && w[3] == 0x3F)
}

/// Identify a bankswitch scheme from ROM image size and, where size alone
/// is ambiguous, a fingerprint scan for byte patterns specific schemes'
/// bankswitch code is known to contain. Callers with header metadata
/// should construct the mapper directly instead of going through this
/// detector.
pub fn detect(rom: &[u8]) -> Result<Box<dyn Mapper>, CartridgeError> {
    match rom.len() {
        2048 | 4096 => Ok(Box::new(atari_rom::AtariRom::new(rom.to_vec())?)),
        8192 => {
            if looks_like_parker_bros_e0(rom) {
                Ok(Box::new(e0::E0::new(rom.to_vec())?))
            } else if looks_like_activision_fe(rom) {
                Ok(Box::new(fe::Fe::new(rom.to_vec())?))
            } else if looks_like_tigervision_3f(rom) {
                Ok(Box::new(three_f::ThreeF::new(rom.to_vec())?))
            } else {
                Ok(Box::new(f8::F8::new(rom.to_vec())?))
            }
        }
        12288 => Ok(Box::new(fa::Fa::new(rom.to_vec())?)),
        16384 => Ok(Box::new(f6::F6::new(rom.to_vec())?)),
        32768 => Ok(Box::new(f4::F4::new(rom.to_vec())?)),
        n => Err(CartridgeError::UnrecognizedSize(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_8k_rom_without_any_fingerprint_defaults_to_f8() {
        let rom = vec![0u8; 8192];
        let cart = detect(&rom).unwrap();
        assert_eq!(format!("{cart:?}").contains("F8"), true);
    }

    #[test]
    fn parker_bros_fingerprint_selects_e0_over_size_default() {
        let mut rom = vec![0u8; 8192];
        // STA $1FE3 somewhere in the image.
        rom[100] = 0x8D;
        rom[101] = 0xE3;
        rom[102] = 0x1F;
        let cart = detect(&rom).unwrap();
        assert!(format!("{cart:?}").contains("E0"));
    }

    #[test]
    fn activision_signature_selects_fe_over_size_default() {
        let mut rom = vec![0u8; 8192];
        rom[200..205].copy_from_slice(&[0x20, 0x00, 0xD0, 0xC6, 0xC5]);
        let cart = detect(&rom).unwrap();
        assert!(format!("{cart:?}").contains("Fe"));
    }

    #[test]
    fn tigervision_signature_selects_3f_over_size_default() {
        let mut rom = vec![0u8; 8192];
        rom[50..54].copy_from_slice(&[0xA9, 0x01, 0x85, 0x3F]);
        let cart = detect(&rom).unwrap();
        assert!(format!("{cart:?}").contains("ThreeF"));
    }
}
