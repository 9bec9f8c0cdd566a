use super::ethosu_data::*;
use strum_macros::EnumString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
pub enum AxiProfile {
    /// Bus setup of the reference platform: command stream and scratch on
    /// port 0, weights and tensors on port 1.
    Default,
    /// Single outstanding, device-typed transactions on every counter.
    /// Slow, but isolates bus faults while bringing up a new platform.
    Conservative,
}

/// The [`AxiConfig`] is everything the AXI/bus configuration manager programs
/// before the first dispatch: the command stream memory type, the memory type
/// of each base pointer region and the policy of the four outstanding
/// transaction counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxiConfig {
    pub qconfig: MemoryType,
    pub regioncfg: [MemoryType; BASEP_INDEXES],
    pub axi_limits: [AxiLimit; 4],
}

impl AxiConfig {
    pub fn axi_cfg(profile: AxiProfile) -> Self {
        match profile {
            AxiProfile::Default => default_axi_cfg(),
            AxiProfile::Conservative => conservative_axi_cfg(),
        }
    }
}

const fn limit(max_beats: AxiLimitBeats, memtype: AxiLimitMemType, reads: u8, writes: u8) -> AxiLimit {
    AxiLimit {
        max_beats,
        memtype,
        max_reads: reads,
        max_writes: writes,
    }
}

fn default_axi_cfg() -> AxiConfig {
    use MemoryType::*;
    let normal = AxiLimitMemType::NormalNonCacheableBufferable;
    AxiConfig {
        qconfig: Axi1OutstandingCounter2,
        regioncfg: [
            Axi1OutstandingCounter3,
            Axi0OutstandingCounter0,
            Axi0OutstandingCounter1,
            Axi0OutstandingCounter1,
            Axi0OutstandingCounter1,
            Axi0OutstandingCounter1,
            Axi0OutstandingCounter1,
            Axi0OutstandingCounter1,
        ],
        axi_limits: [
            limit(AxiLimitBeats::Limit64Bytes, normal, 32, 16),
            limit(AxiLimitBeats::Limit64Bytes, normal, 32, 16),
            limit(AxiLimitBeats::Limit64Bytes, normal, 32, 16),
            limit(AxiLimitBeats::Limit64Bytes, normal, 32, 16),
        ],
    }
}

fn conservative_axi_cfg() -> AxiConfig {
    let device = limit(
        AxiLimitBeats::Limit64Bytes,
        AxiLimitMemType::DeviceNonBufferable,
        1,
        1,
    );
    AxiConfig {
        qconfig: MemoryType::Axi0OutstandingCounter0,
        regioncfg: [MemoryType::Axi0OutstandingCounter0; BASEP_INDEXES],
        axi_limits: [device; 4],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn profiles_hold_valid_limits() {
        for profile in [AxiProfile::Default, AxiProfile::Conservative] {
            let cfg = AxiConfig::axi_cfg(profile);
            for l in cfg.axi_limits.iter() {
                assert!(AxiLimit::new(l.max_beats(), l.memtype(), l.max_reads() as u32, l.max_writes() as u32).is_ok());
            }
        }
    }

    #[test]
    fn profile_from_name() {
        assert_eq!(AxiProfile::from_str("Conservative").unwrap(), AxiProfile::Conservative);
        let cfg = AxiConfig::axi_cfg(AxiProfile::from_str("Default").unwrap());
        assert_eq!(cfg.qconfig, MemoryType::Axi1OutstandingCounter2);
        assert_eq!(cfg.regioncfg[0], MemoryType::Axi1OutstandingCounter3);
    }
}
