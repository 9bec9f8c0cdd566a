use crate::error::*;
use std::fmt;
use strum_macros::{EnumIter, EnumString};

pub const DRIVER_VERSION_MAJOR: u32 = 0;
pub const DRIVER_VERSION_MINOR: u32 = 14;
pub const DRIVER_VERSION_PATCH: u32 = 0;
/// Number of base pointer slots a command stream may reference.
pub const BASEP_INDEXES: usize = 8;
/// Largest outstanding transaction count an AXI limit register can encode.
pub const MAX_OUTSTANDING_TRANSACTIONS: u32 = 0xFF;

/// Version and architecture fields of the ID register.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub version_status: u32,
    pub version_minor: u32,
    pub version_major: u32,
    pub product_major: u32,
    pub arch_patch_rev: u32,
    pub arch_minor_rev: u32,
    pub arch_major_rev: u32,
}

/// Static capabilities of the silicon, decoded from CONFIG.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    /// MACs per clock cycle.
    pub macs_per_cc: u32,
    pub cmd_stream_version: u32,
    /// SHRAM size in KiB.
    pub shram_size: u32,
}

impl Configuration {
    pub fn shram_size_bytes(&self) -> u32 {
        self.shram_size * 1024
    }

    /// Command streams are compiled for one command stream version; callers
    /// check it here before handing the stream to the dispatcher.
    pub fn check_cmd_stream_version(&self, compiled_for: u32) -> Result<()> {
        if compiled_for != self.cmd_stream_version {
            return Err(DriverClientError::invalid_parameter(format!(
                "command stream version {} does not match NPU version {}",
                compiled_for, self.cmd_stream_version
            )));
        }
        Ok(())
    }
}

/// Memory type used by QCONFIG and REGIONCFG. Each type routes its
/// transactions through the outstanding counter of the same index:
/// counters 0 and 1 belong to AXI port 0, counters 2 and 3 to AXI port 1.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString)]
pub enum MemoryType {
    Axi0OutstandingCounter0 = 0,
    Axi0OutstandingCounter1 = 1,
    Axi1OutstandingCounter2 = 2,
    Axi1OutstandingCounter3 = 3,
}

impl MemoryType {
    pub fn counter(&self) -> usize {
        *self as usize
    }

    pub fn axi_port(&self) -> usize {
        self.counter() / 2
    }
}

/// Burst split alignment.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString)]
pub enum AxiLimitBeats {
    Limit64Bytes = 0,
    Limit128Bytes = 1,
    Limit256Bytes = 2,
}

/// AXI cache policy of the transactions issued through one counter.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString)]
pub enum AxiLimitMemType {
    DeviceNonBufferable = 0,
    DeviceBufferable = 1,
    NormalNonCacheableNonBufferable = 2,
    NormalNonCacheableBufferable = 3,
    WriteThroughNoAllocate = 4,
    WriteThroughReadAllocate = 5,
    WriteThroughWriteAllocate = 6,
    WriteThroughReadAndWriteAllocate = 7,
    WriteBackNoAllocate = 8,
    WriteBackReadAllocate = 9,
    WriteBackWriteAllocate = 10,
    WriteBackReadAndWriteAllocate = 11,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockQRequest {
    /// NPU never signals ready for clock off.
    Disable = 0,
    /// NPU signals ready for clock off once stop+idle is reached.
    Enable = 1,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerQRequest {
    /// NPU never signals ready for power off.
    Disable = 0,
    /// NPU signals ready for power off once stop+idle is reached.
    Enable = 1,
}

/// Policy of one AXI outstanding transaction counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxiLimit {
    pub(crate) max_beats: AxiLimitBeats,
    pub(crate) memtype: AxiLimitMemType,
    pub(crate) max_reads: u8,
    pub(crate) max_writes: u8,
}

impl AxiLimit {
    /// Validate a counter policy. Outstanding counts are encoded minus one,
    /// so both must lie in `1..=255`.
    pub fn new(
        max_beats: AxiLimitBeats,
        memtype: AxiLimitMemType,
        max_reads: u32,
        max_writes: u32,
    ) -> Result<Self> {
        let check = |name: &str, value: u32| -> Result<u8> {
            if value == 0 || value > MAX_OUTSTANDING_TRANSACTIONS {
                return Err(DriverClientError::invalid_parameter(format!(
                    "{} = {} outside 1..={}",
                    name, value, MAX_OUTSTANDING_TRANSACTIONS
                )));
            }
            Ok(value as u8)
        };
        Ok(AxiLimit {
            max_beats,
            memtype,
            max_reads: check("max_reads", max_reads)?,
            max_writes: check("max_writes", max_writes)?,
        })
    }

    pub fn max_beats(&self) -> AxiLimitBeats {
        self.max_beats
    }

    pub fn memtype(&self) -> AxiLimitMemType {
        self.memtype
    }

    pub fn max_reads(&self) -> u8 {
        self.max_reads
    }

    pub fn max_writes(&self) -> u8 {
        self.max_writes
    }
}

/// Low 16 bits of STATUS. Bits 7..=15 are reserved and carried through untouched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusMask(u16);

impl StatusMask {
    pub const STATE: u16 = 1 << 0;
    pub const IRQ_RAISED: u16 = 1 << 1;
    pub const BUS_STATUS: u16 = 1 << 2;
    pub const RESET_STATUS: u16 = 1 << 3;
    pub const CMD_PARSE_ERROR: u16 = 1 << 4;
    pub const CMD_END_REACHED: u16 = 1 << 5;
    pub const PMU_IRQ_RAISED: u16 = 1 << 6;
    pub const RESERVED: u16 = 0xFF80;

    pub fn from_bits(bits: u16) -> Self {
        StatusMask(bits)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    /// `true` while the NPU is running a command stream.
    pub fn state(&self) -> bool {
        self.0 & Self::STATE != 0
    }

    pub fn irq_raised(&self) -> bool {
        self.0 & Self::IRQ_RAISED != 0
    }

    /// `true` when an AXI bus fault was reported.
    pub fn bus_status(&self) -> bool {
        self.0 & Self::BUS_STATUS != 0
    }

    pub fn reset_status(&self) -> bool {
        self.0 & Self::RESET_STATUS != 0
    }

    pub fn cmd_parse_error(&self) -> bool {
        self.0 & Self::CMD_PARSE_ERROR != 0
    }

    pub fn cmd_end_reached(&self) -> bool {
        self.0 & Self::CMD_END_REACHED != 0
    }

    pub fn pmu_irq_raised(&self) -> bool {
        self.0 & Self::PMU_IRQ_RAISED != 0
    }

    pub fn reserved(&self) -> u16 {
        self.0 & Self::RESERVED
    }

    /// Interpret the mask after an IRQ, faults first.
    pub fn completion(&self) -> Completion {
        if self.bus_status() {
            Completion::BusError
        } else if self.cmd_parse_error() {
            Completion::ParseError
        } else if self.cmd_end_reached() {
            Completion::Completed
        } else {
            Completion::Pending
        }
    }
}

/// Sticky IRQ history: every source seen since it was last cleared.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IrqHistoryMask(u16);

impl IrqHistoryMask {
    pub fn from_bits(bits: u16) -> Self {
        IrqHistoryMask(bits)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn contains(&self, bits: u16) -> bool {
        self.0 & bits == bits
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Outcome of a dispatch as read from the status mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Pending,
    Completed,
    /// The NPU rejected the command stream; a soft reset is required.
    ParseError,
    BusError,
}

/// Reset controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    Unknown,
    Resetting,
    Ready,
    Faulted,
}

impl fmt::Display for ResetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One command stream execution as built by the caller for a single inference.
///
/// Base address 0 is the weight tensor, 1 the scratch tensor; the rest are
/// inputs and outputs in the order the compiled stream expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStreamInvocation {
    pub cmd_stream_ptr: u64,
    pub cms_length: u32,
    pub base_addr: Vec<u64>,
}

impl CommandStreamInvocation {
    pub fn new(cmd_stream_ptr: u64, cms_length: u32, base_addr: &[u64]) -> Self {
        CommandStreamInvocation {
            cmd_stream_ptr,
            cms_length,
            base_addr: base_addr.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn axi_limit_bounds() {
        let beats = AxiLimitBeats::Limit64Bytes;
        let mem = AxiLimitMemType::DeviceNonBufferable;
        assert!(AxiLimit::new(beats, mem, 1, 1).is_ok());
        assert!(AxiLimit::new(beats, mem, 255, 255).is_ok());
        assert!(matches!(
            AxiLimit::new(beats, mem, 256, 1),
            Err(DriverClientError::InvalidParameter { .. })
        ));
        assert!(matches!(
            AxiLimit::new(beats, mem, 1, 300),
            Err(DriverClientError::InvalidParameter { .. })
        ));
        assert!(AxiLimit::new(beats, mem, 0, 1).is_err());
    }

    #[test]
    fn completion_prefers_faults() {
        let done = StatusMask::from_bits(StatusMask::IRQ_RAISED | StatusMask::CMD_END_REACHED);
        assert_eq!(done.completion(), Completion::Completed);

        let parse = StatusMask::from_bits(StatusMask::CMD_PARSE_ERROR | StatusMask::CMD_END_REACHED);
        assert_eq!(parse.completion(), Completion::ParseError);

        let bus = StatusMask::from_bits(StatusMask::BUS_STATUS | StatusMask::CMD_PARSE_ERROR);
        assert_eq!(bus.completion(), Completion::BusError);

        assert_eq!(StatusMask::default().completion(), Completion::Pending);
    }

    #[test]
    fn reserved_bits_are_opaque() {
        let mask = StatusMask::from_bits(0x8001);
        assert!(mask.state());
        assert_eq!(mask.reserved(), 0x8000);
        assert_eq!(mask.bits(), 0x8001);
    }

    #[test]
    fn memory_type_ports() {
        assert_eq!(MemoryType::Axi0OutstandingCounter1.axi_port(), 0);
        assert_eq!(MemoryType::Axi1OutstandingCounter2.axi_port(), 1);
        assert_eq!(
            MemoryType::from_str("Axi1OutstandingCounter3").unwrap().counter(),
            3
        );
    }

    #[test]
    fn cmd_stream_version_check() {
        let cfg = Configuration {
            macs_per_cc: 256,
            cmd_stream_version: 1,
            shram_size: 48,
        };
        assert!(cfg.check_cmd_stream_version(1).is_ok());
        assert!(cfg.check_cmd_stream_version(2).is_err());
    }
}
