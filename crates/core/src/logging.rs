//! Centralized logging configuration for the emulator.
//!
//! Structured, category-scoped logging used in place of ad hoc `eprintln!`
//! calls scattered through the engine.
//!
//! - **LogConfig**: thread-safe global configuration using atomic operations
//! - **LogLevel**: hierarchical log levels (Off < Error < Warn < Info < Debug < Trace)
//! - **LogCategory**: engine subsystems that log independently of each other
//!
//! # Usage
//!
//! ```rust
//! use emu_core::logging::{LogConfig, LogLevel, LogCategory};
//!
//! LogConfig::global().set_level(LogCategory::Cpu, LogLevel::Debug);
//!
//! if LogConfig::global().should_log(LogCategory::Cpu, LogLevel::Info) {
//!     eprintln!("cpu: something happened");
//! }
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

/// Log level for controlling verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse a log level from a string (case-insensitive), accepting
    /// either names ("debug") or numeric levels ("4").
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(val: u8) -> Self {
        match val {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Engine subsystem a log line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    /// 6507 CPU core (instruction execution, PC tracing, interrupt entry)
    Cpu,
    /// Memory bus / address decoder (mirrors, ghost byte, bad writes)
    Bus,
    /// TIA video (register writes, HMOVE, collisions)
    Tia,
    /// TIA audio channels
    Audio,
    /// RIOT timer and I/O ports
    Riot,
    /// Cartridge mappers (bankswitch hotspots, PlusROM, Supercharger tape)
    Cartridge,
    /// ARM7TDMI Thumb coprocessor interpreter
    Arm,
    /// Orchestrator (stop reasons, observer conditions)
    Orchestrator,
}

/// Global logging configuration.
pub struct LogConfig {
    global_level: AtomicU8,
    cpu_level: AtomicU8,
    bus_level: AtomicU8,
    tia_level: AtomicU8,
    audio_level: AtomicU8,
    riot_level: AtomicU8,
    cartridge_level: AtomicU8,
    arm_level: AtomicU8,
    orchestrator_level: AtomicU8,
}

impl LogConfig {
    const fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            cpu_level: AtomicU8::new(LogLevel::Off as u8),
            bus_level: AtomicU8::new(LogLevel::Off as u8),
            tia_level: AtomicU8::new(LogLevel::Off as u8),
            audio_level: AtomicU8::new(LogLevel::Off as u8),
            riot_level: AtomicU8::new(LogLevel::Off as u8),
            cartridge_level: AtomicU8::new(LogLevel::Off as u8),
            arm_level: AtomicU8::new(LogLevel::Off as u8),
            orchestrator_level: AtomicU8::new(LogLevel::Off as u8),
        }
    }

    /// Get the global singleton instance.
    pub fn global() -> &'static Self {
        static INSTANCE: LogConfig = LogConfig::new();
        &INSTANCE
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level.to_u8(), Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    fn atomic_for(&self, category: LogCategory) -> &AtomicU8 {
        match category {
            LogCategory::Cpu => &self.cpu_level,
            LogCategory::Bus => &self.bus_level,
            LogCategory::Tia => &self.tia_level,
            LogCategory::Audio => &self.audio_level,
            LogCategory::Riot => &self.riot_level,
            LogCategory::Cartridge => &self.cartridge_level,
            LogCategory::Arm => &self.arm_level,
            LogCategory::Orchestrator => &self.orchestrator_level,
        }
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.atomic_for(category).store(level.to_u8(), Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.atomic_for(category).load(Ordering::Relaxed))
    }

    /// True if a message at `level` in `category` should be emitted: a
    /// category-specific level takes priority, falling back to the global
    /// level when the category has not been configured.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all levels to Off.
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in [
            LogCategory::Cpu,
            LogCategory::Bus,
            LogCategory::Tia,
            LogCategory::Audio,
            LogCategory::Riot,
            LogCategory::Cartridge,
            LogCategory::Arm,
            LogCategory::Orchestrator,
        ] {
            self.set_level(category, LogLevel::Off);
        }
    }
}

/// Log a line if `category`/`level` is enabled in the global configuration.
#[macro_export]
macro_rules! log {
    ($category:expr, $level:expr, $($arg:tt)*) => {
        if $crate::logging::LogConfig::global().should_log($category, $level) {
            eprintln!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parsing() {
        assert_eq!(LogLevel::from_str("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("5"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str("nonsense"), None);
    }

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn category_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::Cpu, LogLevel::Debug);

        assert!(config.should_log(LogCategory::Cpu, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::Bus, LogLevel::Warn));
        assert!(config.should_log(LogCategory::Bus, LogLevel::Error));
    }

    #[test]
    fn reset_clears_everything() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::Tia, LogLevel::Debug);
        config.reset();
        assert_eq!(config.get_global_level(), LogLevel::Off);
        assert_eq!(config.get_level(LogCategory::Tia), LogLevel::Off);
    }
}
