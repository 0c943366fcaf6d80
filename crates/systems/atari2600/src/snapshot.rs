//! Rewind/save-state snapshots: a single serde_json tree covering the CPU
//! register file, the bus's open-bus ghost byte, TIA, RIOT and whatever
//! cartridge is mounted. TIA/RIOT derive `Serialize`/`Deserialize` directly
//! (serde-derived wholesale); the CPU and cartridge don't — the CPU because `InstrState`
//! isn't meant to survive a restore mid-instruction, the cartridge because
//! `Mapper` needs to stay object-safe — so both are folded in by hand.

use crate::bus::Atari2600Bus;
use crate::cartridge::{self, Mapper};
use crate::cpu::Cpu6507;
use crate::error::EngineError;
use serde_json::json;

#[derive(Debug, Clone, Copy)]
pub struct SnapshotFormat {
    pub version: u32,
}

pub const CURRENT_FORMAT: SnapshotFormat = SnapshotFormat { version: 1 };

pub fn capture(cpu: &Cpu6507, bus: &Atari2600Bus) -> serde_json::Value {
    json!({
        "format_version": CURRENT_FORMAT.version,
        "cpu": {
            "a": cpu.a,
            "x": cpu.x,
            "y": cpu.y,
            "sp": cpu.sp,
            "status": cpu.status,
            "pc": cpu.pc,
            "halted": cpu.halted,
            "total_cycles": cpu.total_cycles,
        },
        "bus": {
            "ghost_byte": bus.ghost_byte(),
        },
        "tia": serde_json::to_value(&bus.tia).unwrap_or(serde_json::Value::Null),
        "riot": serde_json::to_value(&bus.riot).unwrap_or(serde_json::Value::Null),
        "cartridge": bus.cartridge.as_ref().map(|c| c.snapshot()),
    })
}

pub fn restore(
    value: &serde_json::Value,
    cpu: &mut Cpu6507,
    bus: &mut Atari2600Bus,
) -> Result<(), EngineError> {
    let version = value.get("format_version").and_then(|v| v.as_u64()).unwrap_or(0);
    if version != CURRENT_FORMAT.version as u64 {
        return Err(EngineError::IncompatibleSnapshot(format!(
            "snapshot format {version} does not match engine format {}",
            CURRENT_FORMAT.version
        )));
    }

    if let Some(c) = value.get("cpu") {
        cpu.a = field_u8(c, "a");
        cpu.x = field_u8(c, "x");
        cpu.y = field_u8(c, "y");
        cpu.sp = field_u8(c, "sp");
        cpu.status = field_u8(c, "status");
        cpu.pc = c.get("pc").and_then(|v| v.as_u64()).unwrap_or(0) as u16;
        cpu.halted = c.get("halted").and_then(|v| v.as_bool()).unwrap_or(false);
        cpu.total_cycles = c.get("total_cycles").and_then(|v| v.as_u64()).unwrap_or(0);
    }

    if let Some(b) = value.get("bus") {
        if let Some(g) = b.get("ghost_byte").and_then(|v| v.as_u64()) {
            bus.set_ghost_byte(g as u8);
        }
    }

    if let Some(tia_value) = value.get("tia") {
        if let Ok(tia) = serde_json::from_value(tia_value.clone()) {
            bus.tia = tia;
        }
    }
    if let Some(riot_value) = value.get("riot") {
        if let Ok(riot) = serde_json::from_value(riot_value.clone()) {
            bus.riot = riot;
        }
    }
    if let Some(cart_value) = value.get("cartridge") {
        if let Some(cart) = bus.cartridge.as_mut() {
            restore_cartridge(cart.as_mut(), cart_value)?;
        }
    }

    Ok(())
}

fn restore_cartridge(cart: &mut dyn Mapper, value: &serde_json::Value) -> Result<(), EngineError> {
    cart.restore(value).map_err(EngineError::Cartridge)
}

fn field_u8(v: &serde_json::Value, key: &str) -> u8 {
    v.get(key).and_then(|x| x.as_u64()).unwrap_or(0) as u8
}

/// Re-detect and mount a cartridge from a raw ROM image, used by callers
/// restoring a snapshot taken against a different cartridge instance than
/// the one currently mounted.
pub fn remount_from_rom(bus: &mut Atari2600Bus, rom: &[u8]) -> Result<(), EngineError> {
    let cart = cartridge::detect(rom)?;
    bus.mount(cart);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::atari_rom::AtariRom;

    #[test]
    fn round_trips_cpu_register_file() {
        let mut cpu = Cpu6507::new();
        let mut bus = Atari2600Bus::new();
        bus.mount(Box::new(AtariRom::new(vec![0u8; 2048]).unwrap()));
        cpu.a = 0x42;
        cpu.pc = 0xF000;
        cpu.total_cycles = 999;
        let snap = capture(&cpu, &bus);

        let mut restored_cpu = Cpu6507::new();
        let mut restored_bus = Atari2600Bus::new();
        restored_bus.mount(Box::new(AtariRom::new(vec![0u8; 2048]).unwrap()));
        restore(&snap, &mut restored_cpu, &mut restored_bus).unwrap();

        assert_eq!(restored_cpu.a, 0x42);
        assert_eq!(restored_cpu.pc, 0xF000);
        assert_eq!(restored_cpu.total_cycles, 999);
    }

    #[test]
    fn rejects_mismatched_format_version() {
        let cpu = Cpu6507::new();
        let bus = Atari2600Bus::new();
        let mut snap = capture(&cpu, &bus);
        snap["format_version"] = json!(999);
        let mut restored_cpu = Cpu6507::new();
        let mut restored_bus = Atari2600Bus::new();
        assert!(restore(&snap, &mut restored_cpu, &mut restored_bus).is_err());
    }
}
