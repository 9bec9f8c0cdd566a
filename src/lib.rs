//! This Rust package drives the control interface of an Arm Ethos-U NPU at the
//! register level: identity and capability discovery, AXI bus configuration,
//! soft reset, command stream dispatch, status and IRQ handling and clock/power
//! gating requests.
//!
//! The register window is reached through a [`RegisterAccess`](crate::driver_client::RegisterAccess)
//! backend, either a device node ([`FileChannel`](crate::driver_client::FileChannel))
//! or the in-memory [`SimDevice`](crate::ethosu::SimDevice).
//!
//! An [`EthosuDevice`](crate::ethosu::EthosuDevice) runs one command stream at a time
//! and does no locking of its own. Callers sharing a device hold one exclusive
//! lock for the whole session: configure, dispatch, wait for `irq_raised`,
//! read the status and clear it.
//!
pub mod driver_client;
pub mod error;
pub mod ethosu;
pub mod utils;
