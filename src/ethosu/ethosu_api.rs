use super::{ethosu_cfg::*, ethosu_data::*, ethosu_hw_code::*};
use crate::{driver_client::*, error::*};

/// Control session over one Ethos-U NPU.
///
/// The device is not internally synchronised. Callers sharing it must hold a
/// single exclusive lock across configure, dispatch, completion wait and
/// status clear; interleaving two sessions corrupts both.
pub struct EthosuDevice<B: RegisterAccess = FileChannel> {
    reset_state: ResetState,
    clock_q: ClockQRequest,
    power_q: PowerQRequest,
    pub driver_client: DriverClient<B>,
}

impl<B: RegisterAccess> EthosuDevice<B> {
    /// Take over a mapped register window.
    ///
    /// The ID register is read once to prove the window answers. Clock and
    /// power q requests start enabled, the state the NPU leaves reset in.
    pub fn init(dclient: DriverClient<B>) -> Result<Self> {
        let device = EthosuDevice {
            reset_state: ResetState::Unknown,
            clock_q: ClockQRequest::Enable,
            power_q: PowerQRequest::Enable,
            driver_client: dclient,
        };
        let id = device.get_id()?;
        log::info!(
            "Ethos-U arch {}.{}.{} product {} version {}.{} (status {}), driver {}.{}.{}",
            id.arch_major_rev,
            id.arch_minor_rev,
            id.arch_patch_rev,
            id.product_major,
            id.version_major,
            id.version_minor,
            id.version_status,
            DRIVER_VERSION_MAJOR,
            DRIVER_VERSION_MINOR,
            DRIVER_VERSION_PATCH
        );
        Ok(device)
    }

    fn regs(&self) -> RegisterMap {
        *self.driver_client.cfg.regs()
    }

    pub fn reset_state(&self) -> ResetState {
        self.reset_state
    }

    pub fn clock_and_power(&self) -> (ClockQRequest, PowerQRequest) {
        (self.clock_q, self.power_q)
    }

    // ==== identity ====
    pub fn get_id(&self) -> Result<Identity> {
        let word = self.driver_client.ctrl_read_u32(self.regs().id)?;
        Ok(IdRegister::from_word(word)?.into())
    }

    pub fn get_config(&self) -> Result<Configuration> {
        let word = self.driver_client.ctrl_read_u32(self.regs().config)?;
        Ok(ConfigRegister::from_word(word)?.into())
    }

    pub fn get_revision(&self) -> Result<u32> {
        self.driver_client.ctrl_read_u32(self.regs().revision)
    }

    /// Raw read of `num_reg` consecutive registers starting at byte offset `start`.
    pub fn read_apb_reg(&self, start: u64, num_reg: usize) -> Result<Vec<u32>> {
        self.driver_client.read_range(start, num_reg)
    }

    // ==== status & irq ====
    fn status_register(&self) -> Result<StatusRegister> {
        let word = self.driver_client.ctrl_read_u32(self.regs().status)?;
        Ok(StatusRegister::from_word(word))
    }

    pub fn get_status_mask(&self) -> Result<StatusMask> {
        Ok(self.status_register()?.status)
    }

    pub fn is_irq_raised(&self) -> Result<bool> {
        Ok(self.get_status_mask()?.irq_raised())
    }

    pub fn get_irq_history_mask(&self) -> Result<IrqHistoryMask> {
        Ok(self.status_register()?.irq_history)
    }

    fn write_cmd(&self, cmd: CmdRegister) -> Result<()> {
        let cmd = CmdRegister {
            clock_q_enable: self.clock_q == ClockQRequest::Enable,
            power_q_enable: self.power_q == PowerQRequest::Enable,
            ..cmd
        };
        self.driver_client.ctrl_write_u32(self.regs().cmd, cmd.to_word())
    }

    /// Clear the irq latch. History bits stay untouched.
    pub fn clear_irq_status(&self) -> Result<()> {
        self.write_cmd(CmdRegister {
            clear_irq: true,
            ..Default::default()
        })
    }

    /// Clear exactly the history bits set in `mask`.
    pub fn clear_irq_history_mask(&self, mask: u16) -> Result<()> {
        self.write_cmd(CmdRegister {
            clear_irq_history: mask,
            ..Default::default()
        })
    }

    // ==== power/clock gating ====
    pub fn set_clock_and_power(
        &mut self,
        clock_q: ClockQRequest,
        power_q: PowerQRequest,
    ) -> Result<()> {
        self.clock_q = clock_q;
        self.power_q = power_q;
        log::debug!("Clock q {:?}, power q {:?}", clock_q, power_q);
        self.write_cmd(CmdRegister::default())
    }

    // ==== reset ====
    pub fn soft_reset(&mut self) -> Result<()> {
        let cfg = self.driver_client.cfg;
        let reset = ResetRegister {
            pending_cpl_privileged: cfg.reset_privileged,
            pending_csl_secure: cfg.reset_secure,
        };
        log::info!(
            "Soft reset (secure: {}, privileged: {})",
            cfg.reset_secure,
            cfg.reset_privileged
        );
        self.driver_client
            .ctrl_write_u32(self.regs().reset, reset.to_word())?;
        self.reset_state = ResetState::Resetting;
        Ok(())
    }

    /// Poll STATUS until `reset_status` drops, at most `reset_poll_limit` times.
    pub fn wait_for_reset(&mut self) -> Result<()> {
        if self.reset_state == ResetState::Faulted {
            return Err(DriverClientError::InvalidState {
                state: self.reset_state.to_string(),
            });
        }
        let polls = self.driver_client.cfg.reset_poll_limit();
        for _ in 0..polls {
            if !self.get_status_mask()?.reset_status() {
                self.reset_state = ResetState::Ready;
                log::debug!("NPU left reset");
                return Ok(());
            }
        }
        self.reset_state = ResetState::Faulted;
        log::error!("NPU still in reset after {} polls", polls);
        Err(DriverClientError::Timeout { polls })
    }

    // ==== AXI/bus configuration ====
    pub fn set_qconfig(&self, memory_type: MemoryType) -> Result<()> {
        self.driver_client
            .ctrl_write_u32(self.regs().qconfig, memory_type as u32)
    }

    /// Set the memory type of base pointer region `region`, keeping every
    /// other region as it is.
    pub fn set_regioncfg(&self, region: u8, memory_type: MemoryType) -> Result<()> {
        if region as usize >= BASEP_INDEXES {
            return Err(DriverClientError::invalid_parameter(format!(
                "region {} outside 0..{}",
                region, BASEP_INDEXES
            )));
        }
        let regs = self.regs();
        let cur = RegionConfig::from_word(self.driver_client.ctrl_read_u32(regs.regioncfg)?);
        let next = cur.with_region(region, memory_type);
        self.driver_client.ctrl_write_u32(regs.regioncfg, next.to_word())
    }

    /// Program outstanding transaction counter `counter` (0..=3).
    ///
    /// `max_reads` and `max_writes` must lie in `1..=255`: the register holds
    /// the count minus one. Anything else is `InvalidParameter` and nothing
    /// is written.
    pub fn set_axi_limit(
        &self,
        counter: usize,
        max_beats: AxiLimitBeats,
        memtype: AxiLimitMemType,
        max_reads: u32,
        max_writes: u32,
    ) -> Result<()> {
        let regs = self.regs();
        let offset = *regs.axi_limit.get(counter).ok_or_else(|| {
            DriverClientError::invalid_parameter(format!("AXI limit counter {}", counter))
        })?;
        let limit = AxiLimit::new(max_beats, memtype, max_reads, max_writes)?;
        let word = AxiLimitRegister::from(&limit).to_word()?;
        self.driver_client.ctrl_write_u32(offset, word)
    }

    pub fn set_axi_limit0(
        &self,
        max_beats: AxiLimitBeats,
        memtype: AxiLimitMemType,
        max_reads: u32,
        max_writes: u32,
    ) -> Result<()> {
        self.set_axi_limit(0, max_beats, memtype, max_reads, max_writes)
    }

    pub fn set_axi_limit1(
        &self,
        max_beats: AxiLimitBeats,
        memtype: AxiLimitMemType,
        max_reads: u32,
        max_writes: u32,
    ) -> Result<()> {
        self.set_axi_limit(1, max_beats, memtype, max_reads, max_writes)
    }

    pub fn set_axi_limit2(
        &self,
        max_beats: AxiLimitBeats,
        memtype: AxiLimitMemType,
        max_reads: u32,
        max_writes: u32,
    ) -> Result<()> {
        self.set_axi_limit(2, max_beats, memtype, max_reads, max_writes)
    }

    pub fn set_axi_limit3(
        &self,
        max_beats: AxiLimitBeats,
        memtype: AxiLimitMemType,
        max_reads: u32,
        max_writes: u32,
    ) -> Result<()> {
        self.set_axi_limit(3, max_beats, memtype, max_reads, max_writes)
    }

    /// Reset the NPU and program the bus setup of `axi`.
    pub fn bring_up(&mut self, axi: &AxiConfig) -> Result<()> {
        log::info!("Start NPU bring-up");
        self.soft_reset()?;
        self.wait_for_reset()?;

        self.set_qconfig(axi.qconfig)?;
        for (region, memory_type) in axi.regioncfg.iter().enumerate() {
            self.set_regioncfg(region as u8, *memory_type)?;
        }
        for (counter, limit) in axi.axi_limits.iter().enumerate() {
            self.set_axi_limit(
                counter,
                limit.max_beats(),
                limit.memtype(),
                limit.max_reads() as u32,
                limit.max_writes() as u32,
            )?;
        }
        log::info!("NPU ready");
        Ok(())
    }

    // ==== dispatch ====
    /// Start a command stream and return without waiting for it.
    ///
    /// # Arguments
    ///
    /// * `cmd_stream_ptr`: bus address of the command stream.
    /// * `cms_length`: command stream length in bytes.
    /// * `base_addr`: bus addresses loaded into BASEP0.., at most [`BASEP_INDEXES`].
    ///
    /// Completion is signalled through `irq_raised`; the caller polls or waits
    /// on the interrupt, then reads the status mask and clears it.
    pub fn run_command_stream(
        &self,
        cmd_stream_ptr: u64,
        cms_length: u32,
        base_addr: &[u64],
    ) -> Result<()> {
        if base_addr.len() > BASEP_INDEXES {
            return Err(DriverClientError::invalid_parameter(format!(
                "{} base addresses, at most {} supported",
                base_addr.len(),
                BASEP_INDEXES
            )));
        }
        if matches!(self.reset_state, ResetState::Resetting | ResetState::Faulted) {
            log::warn!("Dispatching while reset state is {}", self.reset_state);
        }

        let regs = self.regs();
        let translate = self.driver_client.cfg.base_pointer_offset;

        let (qbase_lo, qbase_hi) = crate::utils::split_u64(cmd_stream_ptr.wrapping_add(translate));
        self.driver_client.ctrl_write_u32(regs.qbase0, qbase_lo)?;
        self.driver_client.ctrl_write_u32(regs.qbase1, qbase_hi)?;
        self.driver_client.ctrl_write_u32(regs.qsize, cms_length)?;

        for (index, addr) in base_addr.iter().enumerate() {
            let (lo, hi) = crate::utils::split_u64(addr.wrapping_add(translate));
            self.driver_client.ctrl_write_u32(regs.basep_lo(index), lo)?;
            self.driver_client.ctrl_write_u32(regs.basep_hi(index), hi)?;
        }

        log::debug!(
            "Run command stream at {:#X}, {} bytes, {} base pointers",
            cmd_stream_ptr,
            cms_length,
            base_addr.len()
        );
        self.set_command_run()
    }

    pub fn dispatch(&self, invocation: &CommandStreamInvocation) -> Result<()> {
        self.run_command_stream(
            invocation.cmd_stream_ptr,
            invocation.cms_length,
            &invocation.base_addr,
        )
    }

    /// Issue the run command; the NPU continues from the current QREAD.
    pub fn set_command_run(&self) -> Result<()> {
        self.write_cmd(CmdRegister {
            transition_to_running_state: true,
            ..Default::default()
        })
    }

    /// Bytes of the command stream consumed so far.
    pub fn get_qread(&self) -> Result<u32> {
        self.driver_client.ctrl_read_u32(self.regs().qread)
    }

    // ==== debug ====
    /// Read one 1 KiB section of the shared buffer RAM.
    pub fn get_shram_data(&self, section: u32) -> Result<Vec<u32>> {
        let config = self.get_config()?;
        if section >= config.shram_size_bytes() / SHRAM_SECTION_BYTES {
            return Err(DriverClientError::invalid_parameter(format!(
                "SHRAM section {} outside {} KiB",
                section, config.shram_size
            )));
        }
        let regs = self.regs();
        self.driver_client
            .ctrl_write_u32(regs.debug_address, section * SHRAM_SECTION_BYTES)?;
        self.driver_client
            .read_range(regs.shared_buffer0, SHRAM_SECTION_WORDS)
    }

    /// Log every named register of the configured map. AXI limits and the
    /// region types are decoded at debug level.
    pub fn dump_registers(&self) -> Result<Vec<(&'static str, u32)>> {
        let regs = self.regs();
        regs.named()
            .into_iter()
            .map(|(name, offset)| -> Result<(&'static str, u32)> {
                let value = self.driver_client.ctrl_read_u32(offset)?;
                log::info!("{:<16} {:#010X}", name, value);
                if regs.axi_limit.contains(&offset) {
                    let limit = AxiLimitRegister::from_word(value)?;
                    log::debug!(
                        "{}: reads {}, writes {}, memtype {}, beats {}",
                        name,
                        limit.max_outstanding_read_m1 as u32 + 1,
                        limit.max_outstanding_write_m1 as u32 + 1,
                        limit.memtype,
                        limit.max_beats
                    );
                } else if offset == regs.regioncfg {
                    let cfg = RegionConfig::from_word(value);
                    let types: Vec<u8> = (0..BASEP_INDEXES as u8).map(|r| cfg.region(r)).collect();
                    log::debug!("{}: region memory types {:?}", name, types);
                }
                Ok((name, value))
            })
            .collect()
    }
}
