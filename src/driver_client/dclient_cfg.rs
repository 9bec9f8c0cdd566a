use super::dclient_code::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpuType {
    EthosU55,
}

/// Offsets of every register the control protocol touches.
///
/// The layout is fixed by the silicon; it is carried as data so the driver can
/// run against a simulated register file as well as the real window.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterMap {
    pub id: u64,
    pub status: u64,
    pub cmd: u64,
    pub reset: u64,
    pub qbase0: u64,
    pub qbase1: u64,
    pub qread: u64,
    pub qconfig: u64,
    pub qsize: u64,
    pub prot: u64,
    pub config: u64,
    pub lock: u64,
    pub regioncfg: u64,
    pub axi_limit: [u64; 4],
    pub basep0: u64,
    pub debug_address: u64,
    pub shared_buffer0: u64,
    pub revision: u64,
}

impl RegisterMap {
    /// Offset of the low word of base pointer slot `index`.
    pub fn basep_lo(&self, index: usize) -> u64 {
        self.basep0 + index as u64 * BASEP_STRIDE
    }

    /// Offset of the high word of base pointer slot `index`.
    pub fn basep_hi(&self, index: usize) -> u64 {
        self.basep_lo(index) + REG_OFFSET
    }

    /// Every named register of the map in window order, base pointer slots
    /// expanded to their low and high words.
    pub fn named(&self) -> Vec<(&'static str, u64)> {
        let mut regs = vec![
            ("ID", self.id),
            ("STATUS", self.status),
            ("CMD", self.cmd),
            ("RESET", self.reset),
            ("QBASE0", self.qbase0),
            ("QBASE1", self.qbase1),
            ("QREAD", self.qread),
            ("QCONFIG", self.qconfig),
            ("QSIZE", self.qsize),
            ("PROT", self.prot),
            ("CONFIG", self.config),
            ("LOCK", self.lock),
            ("REGIONCFG", self.regioncfg),
        ];
        regs.extend(AXI_LIMIT_NAMES.iter().copied().zip(self.axi_limit));
        regs.extend(BASEP_NAMES.iter().enumerate().map(|(i, name)| {
            let slot = i / 2;
            let offset = if i % 2 == 0 {
                self.basep_lo(slot)
            } else {
                self.basep_hi(slot)
            };
            (*name, offset)
        }));
        regs.push(("DEBUG_ADDRESS", self.debug_address));
        regs.push(("SHARED_BUFFER0", self.shared_buffer0));
        regs.push(("REVISION", self.revision));
        regs
    }
}

const AXI_LIMIT_NAMES: [&str; 4] = ["AXI_LIMIT0", "AXI_LIMIT1", "AXI_LIMIT2", "AXI_LIMIT3"];

const BASEP_NAMES: [&str; 16] = [
    "BASEP0", "BASEP1", "BASEP2", "BASEP3", "BASEP4", "BASEP5", "BASEP6", "BASEP7",
    "BASEP8", "BASEP9", "BASEP10", "BASEP11", "BASEP12", "BASEP13", "BASEP14", "BASEP15",
];

/// The [`DriverConfig`] describes the register window of one NPU instance:
/// where it lives, how large it is and the bounds the protocol runs under.
#[derive(Copy, Clone, Debug)]
pub struct DriverConfig {
    pub(crate) regs: RegisterMap,
    /// Physical address of the register window inside the device node.
    pub(crate) ctrl_baseaddr: u64,
    pub(crate) window_size: u64,
    /// Maximum number of STATUS polls performed by `wait_for_reset`.
    pub(crate) reset_poll_limit: usize,
    /// Added to every address handed to the NPU (QBASE and BASEP).
    pub(crate) base_pointer_offset: u64,
    /// Security and privilege level requested on soft reset.
    pub(crate) reset_secure: bool,
    pub(crate) reset_privileged: bool,
}

impl DriverConfig {
    /// Create a new driver config.
    pub fn driver_client_cfg(npu_type: NpuType) -> Self {
        match npu_type {
            NpuType::EthosU55 => ethos_u55_cfg(),
        }
    }

    pub fn with_ctrl_baseaddr(mut self, addr: u64) -> Self {
        self.ctrl_baseaddr = addr;
        self
    }

    pub fn with_reset_poll_limit(mut self, polls: usize) -> Self {
        self.reset_poll_limit = polls;
        self
    }

    pub fn with_base_pointer_offset(mut self, offset: u64) -> Self {
        self.base_pointer_offset = offset;
        self
    }

    pub fn with_reset_security(mut self, secure: bool, privileged: bool) -> Self {
        self.reset_secure = secure;
        self.reset_privileged = privileged;
        self
    }

    pub fn regs(&self) -> &RegisterMap {
        &self.regs
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    pub fn reset_poll_limit(&self) -> usize {
        self.reset_poll_limit
    }
}

fn ethos_u55_regs() -> RegisterMap {
    RegisterMap {
        id: ETHOSU_REG::ID.into(),
        status: ETHOSU_REG::STATUS.into(),
        cmd: ETHOSU_REG::CMD.into(),
        reset: ETHOSU_REG::RESET.into(),
        qbase0: ETHOSU_REG::QBASE0.into(),
        qbase1: ETHOSU_REG::QBASE1.into(),
        qread: ETHOSU_REG::QREAD.into(),
        qconfig: ETHOSU_REG::QCONFIG.into(),
        qsize: ETHOSU_REG::QSIZE.into(),
        prot: ETHOSU_REG::PROT.into(),
        config: ETHOSU_REG::CONFIG.into(),
        lock: ETHOSU_REG::LOCK.into(),
        regioncfg: ETHOSU_REG::REGIONCFG.into(),
        axi_limit: [
            ETHOSU_REG::AXI_LIMIT0.into(),
            ETHOSU_REG::AXI_LIMIT1.into(),
            ETHOSU_REG::AXI_LIMIT2.into(),
            ETHOSU_REG::AXI_LIMIT3.into(),
        ],
        basep0: ETHOSU_REG::BASEP0.into(),
        debug_address: ETHOSU_REG::DEBUG_ADDRESS.into(),
        shared_buffer0: ETHOSU_REG::SHARED_BUFFER0.into(),
        revision: ETHOSU_REG::REVISION.into(),
    }
}

fn ethos_u55_cfg() -> DriverConfig {
    DriverConfig {
        regs: ethos_u55_regs(),
        ctrl_baseaddr: 0x4800_0000,
        window_size: NPU_REG_WINDOW_SIZE,
        reset_poll_limit: 100_000,
        base_pointer_offset: 0,
        reset_secure: false,
        reset_privileged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn basep_slots_are_64_bit_pairs() {
        let cfg = DriverConfig::driver_client_cfg(NpuType::EthosU55);
        assert_eq!(cfg.regs().basep_lo(0), 0x80);
        assert_eq!(cfg.regs().basep_hi(0), 0x84);
        assert_eq!(cfg.regs().basep_lo(7), 0xB8);
        assert_eq!(cfg.regs().basep_hi(7), 0xBC);
    }

    #[test]
    fn named_registers_follow_the_map() {
        let cfg = DriverConfig::driver_client_cfg(NpuType::EthosU55);
        let named = cfg.regs().named();
        assert_eq!(named.len(), 13 + 4 + 16 + 3);
        assert_eq!(named[0], ("ID", 0x0));
        assert!(named.contains(&("AXI_LIMIT3", 0x4C)));
        assert!(named.contains(&("BASEP15", 0xBC)));
        assert_eq!(*named.last().unwrap(), ("REVISION", 0xFC0));
        assert!(named.windows(2).all(|w| w[0].1 < w[1].1));
        for reg in ETHOSU_REG::iter() {
            assert!(
                named.iter().any(|(_, offset)| *offset == u64::from(reg)),
                "{:?} missing from the map",
                reg
            );
        }
    }

    #[test]
    fn builder_overrides_keep_register_map() {
        let cfg = DriverConfig::driver_client_cfg(NpuType::EthosU55)
            .with_reset_poll_limit(8)
            .with_base_pointer_offset(0x6000_0000);
        assert_eq!(cfg.reset_poll_limit(), 8);
        assert_eq!(cfg.base_pointer_offset, 0x6000_0000);
        assert_eq!(cfg.regs().status, 0x4);
    }
}
