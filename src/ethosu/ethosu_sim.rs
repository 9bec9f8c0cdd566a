//! Simulated Ethos-U register file.
//!
//! [`SimDevice`] answers the control protocol the way the silicon does at the
//! register level: RESET raises `reset_status` for a configurable number of
//! STATUS polls, a run command completes after a configurable number of polls
//! and latches `irq_raised`, and event bits accumulate in the sticky history
//! half of STATUS until cleared through CMD. QREAD advances while a stream runs
//! and only drops back to zero when QBASE or QSIZE is reprogrammed. Recent
//! writes are logged so tests can assert on the exact register traffic.
use super::{ethosu_data::*, ethosu_hw_code::*};
use crate::driver_client::{DriverConfig, RegisterAccess, RegisterMap, SHRAM_SECTION_BYTES, SHRAM_SECTION_WORDS};
use std::{
    io,
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

/// ID word of the simulated NPU: arch 1.0.6, product 0, version 1.0 (status 1).
pub const SIM_ID: u32 = 0x1006_0101;
/// CONFIG word: product 0, 48 KiB SHRAM, command stream v1, 256 MACs/cc.
pub const SIM_CONFIG: u32 = 0x0000_3018;
pub const SIM_REVISION: u32 = 0x0000_0000;
/// Most recent writes kept by the write log; older entries are dropped.
pub const WRITE_LOG_CAPACITY: usize = 4096;

const HISTORY_EVENTS: u16 = StatusMask::BUS_STATUS
    | StatusMask::CMD_PARSE_ERROR
    | StatusMask::CMD_END_REACHED
    | StatusMask::PMU_IRQ_RAISED;

#[derive(Debug)]
struct SimState {
    regs: Vec<u32>,
    map: RegisterMap,
    window_size: u64,
    /// STATUS polls that still observe reset_status; `None` never leaves reset.
    reset_latency: Option<usize>,
    reset_polls_left: Option<usize>,
    resetting: bool,
    run_latency: usize,
    run_polls_left: Option<usize>,
    parse_error_pending: bool,
    shram: Vec<u32>,
    writes: VecDeque<(u64, u32)>,
    log_writes: bool,
}

impl SimState {
    fn reg(&self, offset: u64) -> u32 {
        self.regs[(offset / 4) as usize]
    }

    fn set_reg(&mut self, offset: u64, value: u32) {
        self.regs[(offset / 4) as usize] = value;
    }

    fn status(&self) -> StatusRegister {
        StatusRegister::from_word(self.reg(self.map.status))
    }

    fn set_status(&mut self, status: StatusMask, history: IrqHistoryMask) {
        let word = StatusRegister {
            status,
            irq_history: history,
        }
        .to_word();
        self.set_reg(self.map.status, word);
    }

    fn raise(&mut self, bits: u16) {
        let cur = self.status();
        self.set_status(
            StatusMask::from_bits(cur.status.bits() | bits),
            IrqHistoryMask::from_bits(cur.irq_history.bits() | (bits & HISTORY_EVENTS)),
        );
    }

    /// A new queue restarts consumption from its first byte.
    fn queue_reprogrammed(&self, offset: u64) -> bool {
        [self.map.qbase0, self.map.qbase1, self.map.qsize].contains(&offset)
    }

    fn read_only(&self, offset: u64) -> bool {
        [
            self.map.id,
            self.map.status,
            self.map.config,
            self.map.qread,
            self.map.revision,
        ]
        .contains(&offset)
    }

    fn poll_status(&mut self) {
        if self.resetting {
            match self.reset_polls_left {
                Some(0) => {
                    let cur = self.status();
                    self.set_status(
                        StatusMask::from_bits(cur.status.bits() & !StatusMask::RESET_STATUS),
                        cur.irq_history,
                    );
                    self.resetting = false;
                    self.reset_polls_left = None;
                }
                Some(n) => self.reset_polls_left = Some(n - 1),
                None => {}
            }
            return;
        }

        match self.run_polls_left {
            Some(0) => self.finish_run(),
            Some(n) => {
                self.run_polls_left = Some(n - 1);
                let qsize = self.reg(self.map.qsize);
                let step = qsize / (self.run_latency as u32 + 1);
                let qread = self.reg(self.map.qread).saturating_add(step).min(qsize);
                self.set_reg(self.map.qread, qread);
            }
            None => {}
        }
    }

    fn start_run(&mut self) {
        let cur = self.status();
        let cleared = cur.status.bits()
            & !(StatusMask::CMD_END_REACHED | StatusMask::CMD_PARSE_ERROR);
        self.set_status(
            StatusMask::from_bits(cleared | StatusMask::STATE),
            cur.irq_history,
        );
        self.run_polls_left = Some(self.run_latency);
        if self.run_latency == 0 {
            self.finish_run();
        }
    }

    fn finish_run(&mut self) {
        self.run_polls_left = None;
        let cur = self.status();
        self.set_status(
            StatusMask::from_bits(cur.status.bits() & !StatusMask::STATE),
            cur.irq_history,
        );
        if self.parse_error_pending {
            self.parse_error_pending = false;
            self.raise(StatusMask::IRQ_RAISED | StatusMask::CMD_PARSE_ERROR);
        } else {
            let qsize = self.reg(self.map.qsize);
            self.set_reg(self.map.qread, qsize);
            self.raise(StatusMask::IRQ_RAISED | StatusMask::CMD_END_REACHED);
        }
    }

    fn reset(&mut self) {
        self.set_status(
            StatusMask::from_bits(StatusMask::RESET_STATUS),
            IrqHistoryMask::default(),
        );
        self.set_reg(self.map.cmd, 0);
        self.set_reg(self.map.qread, 0);
        self.run_polls_left = None;
        self.parse_error_pending = false;
        self.resetting = true;
        self.reset_polls_left = self.reset_latency;
    }

    fn command(&mut self, word: u32) {
        self.set_reg(self.map.cmd, word);
        let cmd = CmdRegister::from_word(word);
        let cur = self.status();
        let mut status = cur.status.bits();
        if cmd.clear_irq {
            status &= !StatusMask::IRQ_RAISED;
        }
        let history = cur.irq_history.bits() & !cmd.clear_irq_history;
        self.set_status(
            StatusMask::from_bits(status),
            IrqHistoryMask::from_bits(history),
        );
        if cmd.transition_to_running_state && !self.resetting {
            self.start_run();
        }
    }

    fn shram_word(&self, offset: u64) -> u32 {
        let section = (self.reg(self.map.debug_address) / SHRAM_SECTION_BYTES) as usize;
        let index = ((offset - self.map.shared_buffer0) / 4) as usize;
        self.shram
            .get(section * SHRAM_SECTION_WORDS + index)
            .copied()
            .unwrap_or(0)
    }

    fn in_shared_buffer(&self, offset: u64) -> bool {
        offset >= self.map.shared_buffer0
            && offset < self.map.shared_buffer0 + (SHRAM_SECTION_WORDS as u64) * 4
    }
}

/// In-memory NPU serving the register window of a [`DriverConfig`].
#[derive(Debug)]
pub struct SimDevice {
    inner: Mutex<SimState>,
}

impl SimDevice {
    pub fn new(cfg: &DriverConfig) -> Self {
        let map = *cfg.regs();
        let mut state = SimState {
            regs: vec![0; (cfg.window_size() / 4) as usize],
            map,
            window_size: cfg.window_size(),
            reset_latency: Some(4),
            reset_polls_left: None,
            resetting: false,
            run_latency: 3,
            run_polls_left: None,
            parse_error_pending: false,
            shram: Vec::new(),
            writes: VecDeque::new(),
            log_writes: true,
        };
        state.set_reg(map.id, SIM_ID);
        state.set_reg(map.config, SIM_CONFIG);
        state.set_reg(map.revision, SIM_REVISION);
        let shram_kb = ConfigRegister::from_word(SIM_CONFIG)
            .map(|c| c.shram_size as usize)
            .unwrap_or(0);
        state.shram = vec![0; shram_kb * SHRAM_SECTION_WORDS];
        SimDevice {
            inner: Mutex::new(state),
        }
    }

    /// Number of STATUS polls that still report `reset_status` after a reset;
    /// `None` keeps the device in reset forever.
    pub fn with_reset_latency(self, polls: Option<usize>) -> Self {
        self.state().reset_latency = polls;
        self
    }

    /// Number of STATUS polls a run takes before raising its IRQ.
    pub fn with_run_latency(self, polls: usize) -> Self {
        self.state().run_latency = polls;
        self
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The next run ends with `cmd_parse_error` instead of `cmd_end_reached`.
    pub fn inject_parse_error(&self) {
        self.state().parse_error_pending = true;
    }

    pub fn raise_bus_fault(&self) {
        self.state().raise(StatusMask::IRQ_RAISED | StatusMask::BUS_STATUS);
    }

    pub fn raise_pmu_irq(&self) {
        self.state().raise(StatusMask::IRQ_RAISED | StatusMask::PMU_IRQ_RAISED);
    }

    pub fn load_shram(&self, words: &[u32]) {
        let mut state = self.state();
        let len = words.len().min(state.shram.len());
        state.shram[..len].copy_from_slice(&words[..len]);
    }

    /// Raw register content, without the side effects of a bus read.
    pub fn peek(&self, offset: u64) -> u32 {
        self.state().reg(offset)
    }

    /// Preset a register, bypassing the write log and side effects.
    pub fn poke(&self, offset: u64, value: u32) {
        self.state().set_reg(offset, value);
    }

    pub fn is_running(&self) -> bool {
        self.state().run_polls_left.is_some()
    }

    /// Stop recording register writes, e.g. for long benchmark runs.
    pub fn with_write_log(self, enabled: bool) -> Self {
        {
            let mut state = self.state();
            state.log_writes = enabled;
            if !enabled {
                state.writes.clear();
            }
        }
        self
    }

    /// The last [`WRITE_LOG_CAPACITY`] writes, oldest first.
    pub fn writes(&self) -> Vec<(u64, u32)> {
        self.state().writes.iter().copied().collect()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }
}

fn out_of_window(offset: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("offset {:#X} outside simulated window", offset),
    )
}

impl RegisterAccess for SimDevice {
    fn read_u32(&self, offset: u64) -> io::Result<u32> {
        let mut state = self.state();
        if offset + 4 > state.window_size {
            return Err(out_of_window(offset));
        }
        if offset == state.map.status {
            state.poll_status();
        }
        if state.in_shared_buffer(offset) {
            return Ok(state.shram_word(offset));
        }
        Ok(state.reg(offset))
    }

    fn write_u32(&self, offset: u64, data: u32) -> io::Result<()> {
        let mut state = self.state();
        if offset + 4 > state.window_size {
            return Err(out_of_window(offset));
        }
        if state.log_writes {
            if state.writes.len() == WRITE_LOG_CAPACITY {
                state.writes.pop_front();
            }
            state.writes.push_back((offset, data));
        }
        if offset == state.map.reset {
            state.set_reg(offset, data);
            state.reset();
        } else if offset == state.map.cmd {
            state.command(data);
        } else if !state.read_only(offset) {
            state.set_reg(offset, data);
            if state.queue_reprogrammed(offset) {
                let qread = state.map.qread;
                state.set_reg(qread, 0);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver_client::NpuType;

    fn sim() -> (SimDevice, RegisterMap) {
        let cfg = DriverConfig::driver_client_cfg(NpuType::EthosU55);
        (SimDevice::new(&cfg), *cfg.regs())
    }

    #[test]
    fn reset_clears_after_latency() {
        let (dev, map) = sim();
        let dev = dev.with_reset_latency(Some(2));
        dev.write_u32(map.reset, 0).unwrap();
        let polls: Vec<bool> = (0..3)
            .map(|_| StatusRegister::from_word(dev.read_u32(map.status).unwrap()).status.reset_status())
            .collect();
        assert_eq!(polls, vec![true, true, false]);
    }

    #[test]
    fn run_latches_irq_and_history() {
        let (dev, map) = sim();
        let dev = dev.with_run_latency(1);
        dev.write_u32(map.qsize, 128).unwrap();
        dev.write_u32(map.cmd, CMD_TRANSITION_TO_RUNNING_STATE).unwrap();
        assert!(dev.is_running());

        let first = StatusRegister::from_word(dev.read_u32(map.status).unwrap());
        assert!(first.status.state());
        assert!(!first.status.irq_raised());

        let second = StatusRegister::from_word(dev.read_u32(map.status).unwrap());
        assert!(second.status.irq_raised());
        assert!(second.status.cmd_end_reached());
        assert!(second.irq_history.contains(StatusMask::CMD_END_REACHED));
        assert_eq!(dev.peek(map.qread), 128);
    }

    #[test]
    fn read_only_registers_ignore_writes() {
        let (dev, map) = sim();
        dev.write_u32(map.id, 0).unwrap();
        assert_eq!(dev.peek(map.id), SIM_ID);
        assert_eq!(dev.writes(), vec![(map.id, 0)]);
    }

    #[test]
    fn write_log_is_bounded() {
        let (dev, map) = sim();
        for i in 0..(WRITE_LOG_CAPACITY as u32 + 10) {
            dev.write_u32(map.qconfig, i).unwrap();
        }
        let writes = dev.writes();
        assert_eq!(writes.len(), WRITE_LOG_CAPACITY);
        assert_eq!(writes[0], (map.qconfig, 10));
        assert_eq!(*writes.last().unwrap(), (map.qconfig, WRITE_LOG_CAPACITY as u32 + 9));

        let dev = dev.with_write_log(false);
        dev.write_u32(map.qconfig, 1).unwrap();
        assert!(dev.writes().is_empty());
        assert_eq!(dev.peek(map.qconfig), 1);
    }

    #[test]
    fn rerun_keeps_queue_position() {
        let (dev, map) = sim();
        let dev = dev.with_run_latency(3);
        dev.write_u32(map.qsize, 128).unwrap();
        dev.write_u32(map.cmd, CMD_TRANSITION_TO_RUNNING_STATE).unwrap();
        dev.read_u32(map.status).unwrap();
        dev.read_u32(map.status).unwrap();
        let mid = dev.peek(map.qread);
        assert_eq!(mid, 64);

        dev.write_u32(map.cmd, CMD_TRANSITION_TO_RUNNING_STATE).unwrap();
        assert_eq!(dev.peek(map.qread), mid);
        dev.read_u32(map.status).unwrap();
        assert!(dev.peek(map.qread) >= mid);

        dev.write_u32(map.qsize, 128).unwrap();
        assert_eq!(dev.peek(map.qread), 0);
    }

    #[test]
    fn shram_window_follows_debug_address() {
        let (dev, map) = sim();
        let words: Vec<u32> = (0..(2 * SHRAM_SECTION_WORDS) as u32).collect();
        dev.load_shram(&words);
        dev.write_u32(map.debug_address, SHRAM_SECTION_BYTES).unwrap();
        assert_eq!(dev.read_u32(map.shared_buffer0).unwrap(), 256);
        assert_eq!(dev.read_u32(map.shared_buffer0 + 4).unwrap(), 257);
    }
}
