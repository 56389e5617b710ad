#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// Shared logic for the controller macro player.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. The firmware feeds the sequencer from its HID task and
// the emulator replays the same scripts on the host.

pub mod report;
pub mod runner;
pub mod script;
pub mod sequencer;
pub mod telemetry;
