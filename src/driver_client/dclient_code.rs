//! This module provides the silicon-defined offsets of the NPU register window.
#![allow(non_camel_case_types)]

use strum_macros::EnumIter;

/// Offsets of the Ethos-U55 APB register file, relative to the start of the window.
///
/// Multi-word registers (QBASE, BASEP) list their first word; the following
/// word holds the upper 32 bits of the address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter)]
pub enum ETHOSU_REG {
    ID = 0x0000,
    STATUS = 0x0004,
    CMD = 0x0008,
    RESET = 0x000C,
    QBASE0 = 0x0010,
    QBASE1 = 0x0014,
    QREAD = 0x0018,
    QCONFIG = 0x001C,
    QSIZE = 0x0020,
    PROT = 0x0024,
    CONFIG = 0x0028,
    LOCK = 0x002C,
    REGIONCFG = 0x003C,
    AXI_LIMIT0 = 0x0040,
    AXI_LIMIT1 = 0x0044,
    AXI_LIMIT2 = 0x0048,
    AXI_LIMIT3 = 0x004C,
    BASEP0 = 0x0080,
    DEBUG_ADDRESS = 0x0144,
    SHARED_BUFFER0 = 0x0400,
    REVISION = 0x0FC0,
}

impl From<ETHOSU_REG> for u64 {
    fn from(addr: ETHOSU_REG) -> Self {
        addr as u64
    }
}

/// Size of the APB register window in bytes.
pub const NPU_REG_WINDOW_SIZE: u64 = 0x1000;
/// Distance between consecutive 32-bit registers.
pub const REG_OFFSET: u64 = 4;
/// Distance between consecutive 64-bit base pointer slots.
pub const BASEP_STRIDE: u64 = 8;
/// Number of words exposed through the SHARED_BUFFER window (one 1 KiB section).
pub const SHRAM_SECTION_WORDS: usize = 256;
/// Size of one SHRAM dump section.
pub const SHRAM_SECTION_BYTES: u32 = 1024;
