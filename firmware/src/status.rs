#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The HID task owns the runner; these atomics let other tasks observe its
//! progress without touching the runner itself.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Reports handed to the IN endpoint.
static REPORTS_SENT: AtomicU32 = AtomicU32::new(0);
/// Main-script passes completed.
static PASSES: AtomicU32 = AtomicU32::new(0);
/// Set once the runner drained to idle.
static IDLE: AtomicBool = AtomicBool::new(false);
/// Tracks whether the HID IN endpoint is enabled.
static LINK_READY: AtomicBool = AtomicBool::new(false);

/// Point-in-time copy of the status counters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub reports_sent: u32,
    pub passes: u32,
    pub idle: bool,
    pub link_ready: bool,
}

pub fn record_report_sent() {
    REPORTS_SENT.fetch_add(1, Ordering::Relaxed);
}

pub fn record_pass(pass: u32) {
    PASSES.store(pass, Ordering::Relaxed);
}

/// Marks the runner idle. Returns `true` the first time only.
pub fn mark_idle() -> bool {
    !IDLE.swap(true, Ordering::AcqRel)
}

pub fn is_idle() -> bool {
    IDLE.load(Ordering::Acquire)
}

pub fn set_link_ready(ready: bool) {
    LINK_READY.store(ready, Ordering::Relaxed);
}

pub fn snapshot() -> StatusSnapshot {
    StatusSnapshot {
        reports_sent: REPORTS_SENT.load(Ordering::Relaxed),
        passes: PASSES.load(Ordering::Relaxed),
        idle: is_idle(),
        link_ready: LINK_READY.load(Ordering::Relaxed),
    }
}
