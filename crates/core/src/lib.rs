//! Shared, system-agnostic primitives used by the Atari 2600 engine.

pub mod logging;
