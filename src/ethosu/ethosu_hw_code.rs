//! Bit layouts of the multi-field NPU registers.
//!
//! The packed structs use the `msb0` numbering over the big-endian bytes of
//! the register word, so bit `n` of a struct is bit `31 - n` of the register.
use super::ethosu_data::*;
use crate::error::*;
use packed_struct::prelude::*;

// ==== ID ====
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0")]
pub struct IdRegister {
    #[packed_field(bits = "0..=3", endian = "lsb")]
    pub arch_major_rev: u8,
    #[packed_field(bits = "4..=11", endian = "lsb")]
    pub arch_minor_rev: u8,
    #[packed_field(bits = "12..=15", endian = "lsb")]
    pub arch_patch_rev: u8,
    #[packed_field(bits = "16..=19", endian = "lsb")]
    pub product_major: u8,
    #[packed_field(bits = "20..=23", endian = "lsb")]
    pub version_major: u8,
    #[packed_field(bits = "24..=27", endian = "lsb")]
    pub version_minor: u8,
    #[packed_field(bits = "28..=31", endian = "lsb")]
    pub version_status: u8,
}

// ==== CONFIG ====
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0")]
pub struct ConfigRegister {
    #[packed_field(bits = "0..=3", endian = "lsb")]
    pub product: u8,
    #[packed_field(bits = "16..=23", endian = "lsb")]
    pub shram_size: u8,
    #[packed_field(bits = "24..=27", endian = "lsb")]
    pub cmd_stream_version: u8,
    #[packed_field(bits = "28..=31", endian = "lsb")]
    pub macs_per_cc: u8,
}

// ==== AXI_LIMIT0..3 ====
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0")]
pub struct AxiLimitRegister {
    #[packed_field(bits = "0..=7", endian = "lsb")]
    pub max_outstanding_write_m1: u8,
    #[packed_field(bits = "8..=15", endian = "lsb")]
    pub max_outstanding_read_m1: u8,
    #[packed_field(bits = "24..=27", endian = "lsb")]
    pub memtype: u8,
    #[packed_field(bits = "30..=31", endian = "lsb")]
    pub max_beats: u8,
}

macro_rules! impl_register_word {
    ($reg:ident, $name:expr) => {
        impl $reg {
            pub fn from_word(word: u32) -> Result<Self> {
                $reg::unpack(&word.to_be_bytes()).map_err(|e| DriverClientError::PackingError {
                    register: $name.to_string(),
                    reason: format!("{:?}", e),
                })
            }

            pub fn to_word(&self) -> Result<u32> {
                let bytes = self.pack().map_err(|e| DriverClientError::PackingError {
                    register: $name.to_string(),
                    reason: format!("{:?}", e),
                })?;
                Ok(u32::from_be_bytes(bytes))
            }
        }
    };
}

impl_register_word!(IdRegister, "ID");
impl_register_word!(ConfigRegister, "CONFIG");
impl_register_word!(AxiLimitRegister, "AXI_LIMIT");

impl From<IdRegister> for Identity {
    fn from(reg: IdRegister) -> Self {
        Identity {
            version_status: reg.version_status as u32,
            version_minor: reg.version_minor as u32,
            version_major: reg.version_major as u32,
            product_major: reg.product_major as u32,
            arch_patch_rev: reg.arch_patch_rev as u32,
            arch_minor_rev: reg.arch_minor_rev as u32,
            arch_major_rev: reg.arch_major_rev as u32,
        }
    }
}

impl From<ConfigRegister> for Configuration {
    fn from(reg: ConfigRegister) -> Self {
        Configuration {
            macs_per_cc: 1 << reg.macs_per_cc,
            cmd_stream_version: reg.cmd_stream_version as u32,
            shram_size: reg.shram_size as u32,
        }
    }
}

impl From<&AxiLimit> for AxiLimitRegister {
    fn from(limit: &AxiLimit) -> Self {
        AxiLimitRegister {
            max_outstanding_write_m1: limit.max_writes() - 1,
            max_outstanding_read_m1: limit.max_reads() - 1,
            memtype: limit.memtype() as u8,
            max_beats: limit.max_beats() as u8,
        }
    }
}

// ==== CMD ====
pub(crate) const CMD_TRANSITION_TO_RUNNING_STATE: u32 = 1 << 0;
pub(crate) const CMD_CLEAR_IRQ: u32 = 1 << 1;
pub(crate) const CMD_CLOCK_Q_ENABLE: u32 = 1 << 2;
pub(crate) const CMD_POWER_Q_ENABLE: u32 = 1 << 3;
pub(crate) const CMD_CLEAR_IRQ_HISTORY_SHIFT: u32 = 16;

/// Write-only command register. Every write carries the clock/power q
/// request bits, so they have to be re-sent with each command.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CmdRegister {
    pub transition_to_running_state: bool,
    pub clear_irq: bool,
    pub clock_q_enable: bool,
    pub power_q_enable: bool,
    pub clear_irq_history: u16,
}

impl CmdRegister {
    pub fn to_word(&self) -> u32 {
        let mut word = (self.clear_irq_history as u32) << CMD_CLEAR_IRQ_HISTORY_SHIFT;
        if self.transition_to_running_state {
            word |= CMD_TRANSITION_TO_RUNNING_STATE;
        }
        if self.clear_irq {
            word |= CMD_CLEAR_IRQ;
        }
        if self.clock_q_enable {
            word |= CMD_CLOCK_Q_ENABLE;
        }
        if self.power_q_enable {
            word |= CMD_POWER_Q_ENABLE;
        }
        word
    }

    pub fn from_word(word: u32) -> Self {
        CmdRegister {
            transition_to_running_state: word & CMD_TRANSITION_TO_RUNNING_STATE != 0,
            clear_irq: word & CMD_CLEAR_IRQ != 0,
            clock_q_enable: word & CMD_CLOCK_Q_ENABLE != 0,
            power_q_enable: word & CMD_POWER_Q_ENABLE != 0,
            clear_irq_history: (word >> CMD_CLEAR_IRQ_HISTORY_SHIFT) as u16,
        }
    }
}

// ==== RESET ====
/// Security and privilege level the NPU adopts when it leaves reset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResetRegister {
    pub pending_cpl_privileged: bool,
    pub pending_csl_secure: bool,
}

impl ResetRegister {
    pub fn to_word(&self) -> u32 {
        (self.pending_cpl_privileged as u32) | (self.pending_csl_secure as u32) << 1
    }
}

// ==== STATUS ====
/// Full STATUS word: live status in the low half, sticky IRQ history in the high half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRegister {
    pub status: StatusMask,
    pub irq_history: IrqHistoryMask,
}

impl StatusRegister {
    pub fn from_word(word: u32) -> Self {
        StatusRegister {
            status: StatusMask::from_bits((word & 0xFFFF) as u16),
            irq_history: IrqHistoryMask::from_bits((word >> 16) as u16),
        }
    }

    pub fn to_word(&self) -> u32 {
        (self.irq_history.bits() as u32) << 16 | self.status.bits() as u32
    }
}

// ==== REGIONCFG ====
pub(crate) const REGION_FIELD_BITS: u32 = 2;
pub(crate) const REGION_FIELD_MASK: u32 = 0b11;

/// REGIONCFG: bits `[2k+1:2k]` hold the memory type used for BASEP[k].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegionConfig(u32);

impl RegionConfig {
    pub fn from_word(word: u32) -> Self {
        RegionConfig(word)
    }

    pub fn to_word(&self) -> u32 {
        self.0
    }

    pub fn region(&self, region: u8) -> u8 {
        ((self.0 >> (region as u32 * REGION_FIELD_BITS)) & REGION_FIELD_MASK) as u8
    }

    /// Replace exactly the two bits of `region`; other regions and the
    /// unused upper half pass through unchanged.
    pub fn with_region(self, region: u8, memory_type: MemoryType) -> Self {
        let shift = region as u32 * REGION_FIELD_BITS;
        let cleared = self.0 & !(REGION_FIELD_MASK << shift);
        RegionConfig(cleared | (memory_type as u32 & REGION_FIELD_MASK) << shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_register_field_positions() {
        // arch 1.0.6, product 0, version 1.0 status 0
        let id = IdRegister::from_word(0x1006_0100).unwrap();
        assert_eq!(id.arch_major_rev, 1);
        assert_eq!(id.arch_minor_rev, 0);
        assert_eq!(id.arch_patch_rev, 6);
        assert_eq!(id.product_major, 0);
        assert_eq!(id.version_major, 1);
        assert_eq!(id.version_minor, 0);
        assert_eq!(id.version_status, 0);

        let id = IdRegister::from_word(0x2AB0_0000).unwrap();
        assert_eq!(id.arch_major_rev, 2);
        assert_eq!(id.arch_minor_rev, 0xAB);
    }

    #[test]
    fn id_register_packs_back() {
        let word = 0x1234_5678;
        assert_eq!(IdRegister::from_word(word).unwrap().to_word().unwrap(), word);
    }

    #[test]
    fn config_register_decodes_capabilities() {
        // product 1, shram 48 KiB, command stream v1, 2^8 MACs
        let cfg = ConfigRegister::from_word(0x1000_3018).unwrap();
        assert_eq!(cfg.product, 1);
        assert_eq!(cfg.shram_size, 0x30);
        assert_eq!(cfg.cmd_stream_version, 1);
        assert_eq!(cfg.macs_per_cc, 8);

        let config: Configuration = cfg.into();
        assert_eq!(config.macs_per_cc, 256);
        assert_eq!(config.shram_size_bytes(), 48 * 1024);
    }

    #[test]
    fn axi_limit_register_layout() {
        let limit = AxiLimit::new(
            AxiLimitBeats::Limit128Bytes,
            AxiLimitMemType::WriteBackReadAndWriteAllocate,
            32,
            16,
        )
        .unwrap();
        let word = AxiLimitRegister::from(&limit).to_word().unwrap();
        assert_eq!(word & 0b11, 1);
        assert_eq!((word >> 4) & 0xF, 11);
        assert_eq!((word >> 16) & 0xFF, 31);
        assert_eq!((word >> 24) & 0xFF, 15);
        assert_eq!(word & 0x0000_FF0C, 0);
    }

    #[test]
    fn cmd_register_round_trip() {
        let cmd = CmdRegister {
            clear_irq: true,
            power_q_enable: true,
            clear_irq_history: 0x0030,
            ..Default::default()
        };
        assert_eq!(cmd.to_word(), 0x0030_000A);
        assert_eq!(CmdRegister::from_word(0x0030_000A), cmd);
    }

    #[test]
    fn reset_register_levels() {
        assert_eq!(ResetRegister::default().to_word(), 0);
        let reset = ResetRegister {
            pending_cpl_privileged: true,
            pending_csl_secure: true,
        };
        assert_eq!(reset.to_word(), 0b11);
    }

    #[test]
    fn status_register_splits_history() {
        let reg = StatusRegister::from_word(0x0020_0022);
        assert!(reg.status.irq_raised());
        assert!(reg.status.cmd_end_reached());
        assert_eq!(reg.irq_history.bits(), 0x0020);
        assert_eq!(reg.to_word(), 0x0020_0022);
    }

    #[test]
    fn region_config_replaces_two_bits() {
        let cfg = RegionConfig::from_word(0xFFFF_FFFF).with_region(3, MemoryType::Axi0OutstandingCounter0);
        assert_eq!(cfg.to_word(), 0xFFFF_FF3F);
        let cfg = RegionConfig::default().with_region(7, MemoryType::Axi1OutstandingCounter3);
        assert_eq!(cfg.to_word(), 0x0000_C000);
        assert_eq!(cfg.region(7), 3);
    }
}
