//! # In-Process Simulation Harness
//!
//! Drives [`motion_core::MotionCore`] against a host-loaded machine
//! configuration, without any physical hardware or MCU transport. Useful for
//! CI regression testing (golden step traces) and manual G-code-free replay
//! of planned moves.

pub mod config;
pub mod harness;
pub mod trace;

pub use config::{default_table, MachineConfigFile};
pub use harness::SimHarness;
pub use trace::{StepTrace, TraceEntry};
