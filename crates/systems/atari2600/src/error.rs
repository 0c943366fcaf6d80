//! Error kinds for the Atari 2600 engine.
//!
//! A flat, `thiserror`-derived enum per subsystem rather than a single
//! catch-all error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("ROM image size {0} bytes does not match any known bankswitch scheme")]
    UnrecognizedSize(usize),
    #[error("explicitly requested bankswitch scheme does not fit a {0} byte image")]
    SchemeSizeMismatch(usize),
    #[error("Supercharger tape image is malformed: {0}")]
    MalformedTape(String),
    #[error("PlusROM host/path metadata missing from cartridge")]
    MissingPlusRomConfig,
}

#[derive(Debug, Error)]
pub enum ArmError {
    #[error("undefined Thumb opcode {0:#06x} at pc={1:#010x}")]
    UndefinedOpcode(u16, u32),
    #[error("access to unmapped ARM address {0:#010x}")]
    UnmappedAccess(u32),
    #[error("attempted to execute ARM (non-Thumb) mode instruction, which is out of scope")]
    ArmModeUnsupported,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no cartridge mounted")]
    NoCartridge,
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[error(transparent)]
    Arm(#[from] ArmError),
    #[error("snapshot is not compatible with this engine build: {0}")]
    IncompatibleSnapshot(String),
    #[error("snapshot (de)serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}
