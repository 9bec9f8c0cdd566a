//! This module provides the register access layer for an NPU register window.
//! It includes the backend trait through which 32-bit registers are read and written,
//! a backend working on a device node and the bounds-checked [`DriverClient`] on top.
//!
//! The client has no knowledge of the control protocol: it only guarantees that
//! every access stays within the mapped window and that failures are reported
//! with the offset that caused them.
//!
use super::{dclient_cfg::*, dclient_code::*};
use crate::{
    error::*,
    utils::{open_channel, AccessFlags},
};
use std::{fmt::Debug, fs::File, io, os::unix::fs::FileExt, sync::Arc};

/// A trait for anything that can serve 32-bit reads and writes at a byte offset
/// of the register window.
pub trait RegisterAccess {
    fn read_u32(&self, offset: u64) -> io::Result<u32>;
    fn write_u32(&self, offset: u64, data: u32) -> io::Result<()>;
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for Arc<T> {
    fn read_u32(&self, offset: u64) -> io::Result<u32> {
        (**self).read_u32(offset)
    }

    fn write_u32(&self, offset: u64, data: u32) -> io::Result<()> {
        (**self).write_u32(offset, data)
    }
}

/// Register window reached through positioned reads and writes on a device node,
/// e.g. `/dev/mem` with the window's physical address as base.
#[derive(Debug)]
pub struct FileChannel {
    ctrl: File,
    base: u64,
}

impl FileChannel {
    pub fn open(path: &str, base: u64) -> Result<Self> {
        let ctrl = open_channel(path, AccessFlags::RdwrMode).map_err(|e| {
            DriverClientError::DeviceUnavailable {
                path: path.to_string(),
                source: e,
            }
        })?;
        Ok(FileChannel { ctrl, base })
    }
}

impl RegisterAccess for FileChannel {
    fn read_u32(&self, offset: u64) -> io::Result<u32> {
        let mut word = [0, 0, 0, 0];
        self.ctrl.read_exact_at(&mut word, self.base + offset)?;
        Ok(u32::from_le_bytes(word))
    }

    fn write_u32(&self, offset: u64, data: u32) -> io::Result<()> {
        self.ctrl.write_all_at(&data.to_le_bytes(), self.base + offset)
    }
}

/// The [`DriverClient`] couples a [`DriverConfig`] with the backend serving its
/// register window.
pub struct DriverClient<B: RegisterAccess = FileChannel> {
    /// Register map and bounds of the current NPU.
    pub(crate) cfg: DriverConfig,
    /// Read and write access to the APB register window.
    pub ctrl: B,
}

impl DriverClient<FileChannel> {
    /// The function creates a new instance of [`DriverClient`] over a device node.
    ///
    /// # Arguments
    ///
    /// * `path` - the device node exposing the physical address space, usually `/dev/mem`.
    /// * `cfg` - argument is of the type [`DriverConfig`] and is used to locate
    /// and bound the register window.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ethosu_core::driver_client::*;
    ///
    /// let dclient = DriverClient::new("/dev/mem", DriverConfig::driver_client_cfg(NpuType::EthosU55));
    /// ```
    pub fn new(path: &str, cfg: DriverConfig) -> Result<Self> {
        let ctrl = FileChannel::open(path, cfg.ctrl_baseaddr)?;
        Ok(DriverClient { cfg, ctrl })
    }
}

impl<B: RegisterAccess> DriverClient<B> {
    /// Create a client over an already mapped backend.
    pub fn with_backend(cfg: DriverConfig, ctrl: B) -> Self {
        DriverClient { cfg, ctrl }
    }

    pub fn cfg(&self) -> &DriverConfig {
        &self.cfg
    }

    fn check_window(&self, offset: u64, nof_regs: usize) -> Result<()> {
        let end = (nof_regs as u64)
            .checked_mul(REG_OFFSET)
            .and_then(|len| offset.checked_add(len));
        match end {
            _ if offset % REG_OFFSET != 0 => Err(DriverClientError::invalid_parameter(format!(
                "register offset {:#X} is not word aligned",
                offset
            ))),
            _ if offset >= self.cfg.window_size => Err(DriverClientError::invalid_parameter(format!(
                "register offset {:#X} outside window of {:#X} bytes",
                offset, self.cfg.window_size
            ))),
            Some(end) if end <= self.cfg.window_size => Ok(()),
            _ => Err(DriverClientError::invalid_parameter(format!(
                "{} register(s) at {:#X} exceed window of {:#X} bytes",
                nof_regs, offset, self.cfg.window_size
            ))),
        }
    }

    // ==== APB CTRL BUS ====
    /// Read a 32-bit register at a given offset of the window.
    ///
    /// # Arguments
    ///
    /// * `offset`: offset of the register, either raw or an [`ETHOSU_REG`] entry.
    ///
    /// returns: u32
    pub fn ctrl_read_u32<T: Debug + Into<u64> + Copy>(&self, offset: T) -> Result<u32> {
        let addr: u64 = offset.into();
        self.check_window(addr, 1)?;
        let res = self
            .ctrl
            .read_u32(addr)
            .map_err(|e| DriverClientError::ReadError {
                offset: format!("{:#X?}", offset),
                source: e,
            })?;
        log::debug!("Getting data [ {:#X?} ] from label {:#X?}", res, offset);
        Ok(res)
    }

    /// Write a 32-bit register at a given offset of the window.
    ///
    /// # Arguments
    ///
    /// * `offset`: offset of the register, either raw or an [`ETHOSU_REG`] entry.
    /// * `data`: a 32-bit value for writing.
    pub fn ctrl_write_u32<T: Debug + Into<u64> + Copy>(&self, offset: T, data: u32) -> Result<()> {
        let addr: u64 = offset.into();
        self.check_window(addr, 1)?;
        self.ctrl
            .write_u32(addr, data)
            .map_err(|e| DriverClientError::WriteError {
                offset: format!("{:#X?}", offset),
                source: e,
            })?;
        crate::setter_log!(data, offset);
        Ok(())
    }

    /// Bulk APB read of `nof_regs` consecutive registers starting at `start`.
    ///
    /// The whole range is validated before the first access, so either every
    /// word is returned or nothing is read.
    pub fn read_range<T: Debug + Into<u64> + Copy>(
        &self,
        start: T,
        nof_regs: usize,
    ) -> Result<Vec<u32>> {
        let start_addr: u64 = start.into();
        self.check_window(start_addr, nof_regs)?;
        let words = (0..nof_regs as u64)
            .map(|i| {
                let addr = start_addr + i * REG_OFFSET;
                self.ctrl
                    .read_u32(addr)
                    .map_err(|e| DriverClientError::ReadError {
                        offset: format!("{:#X?}", addr),
                        source: e,
                    })
            })
            .collect::<Result<Vec<u32>>>()?;
        crate::getter_log!(words, start);
        Ok(words)
    }

    // ==== utils ====>
    pub fn is_ctrl_field_expected_value<T: Debug + Into<u64> + Copy>(
        &self,
        offset: T,
        value: u32,
    ) -> Result<bool> {
        Ok(self.ctrl_read_u32(offset)? == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethosu::SimDevice;

    fn client() -> DriverClient<Arc<SimDevice>> {
        let cfg = DriverConfig::driver_client_cfg(NpuType::EthosU55);
        DriverClient::with_backend(cfg, Arc::new(SimDevice::new(&cfg)))
    }

    #[test]
    fn rejects_offsets_outside_window() {
        let dclient = client();
        let err = dclient.ctrl_read_u32(NPU_REG_WINDOW_SIZE).unwrap_err();
        assert!(matches!(err, DriverClientError::InvalidParameter { .. }));
        let err = dclient.ctrl_write_u32(0x1002u64, 1).unwrap_err();
        assert!(matches!(err, DriverClientError::InvalidParameter { .. }));
        assert!(dclient.ctrl.writes().is_empty());
    }

    #[test]
    fn rejects_unaligned_offsets() {
        let dclient = client();
        assert!(matches!(
            dclient.ctrl_read_u32(0x6u64),
            Err(DriverClientError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn write_then_read_register() {
        let dclient = client();
        dclient.ctrl_write_u32(ETHOSU_REG::QSIZE, 0x80).unwrap();
        assert_eq!(dclient.ctrl_read_u32(ETHOSU_REG::QSIZE).unwrap(), 0x80);
        assert!(dclient
            .is_ctrl_field_expected_value(ETHOSU_REG::QSIZE, 0x80)
            .unwrap());
    }

    #[test]
    fn read_range_is_all_or_nothing() {
        let dclient = client();
        dclient.ctrl_write_u32(ETHOSU_REG::QBASE0, 0x11).unwrap();
        dclient.ctrl_write_u32(ETHOSU_REG::QBASE1, 0x22).unwrap();
        let words = dclient.read_range(ETHOSU_REG::QBASE0, 2).unwrap();
        assert_eq!(words, vec![0x11, 0x22]);

        let last = NPU_REG_WINDOW_SIZE - REG_OFFSET;
        assert_eq!(dclient.read_range(last, 1).unwrap().len(), 1);
        assert!(dclient.read_range(last, 2).is_err());
        assert!(dclient.read_range(0u64, 0).unwrap().is_empty());
    }

    #[test]
    fn empty_range_at_window_end_is_rejected() {
        let dclient = client();
        assert!(matches!(
            dclient.read_range(NPU_REG_WINDOW_SIZE, 0),
            Err(DriverClientError::InvalidParameter { .. })
        ));
        assert!(matches!(
            dclient.read_range(NPU_REG_WINDOW_SIZE + REG_OFFSET, 0),
            Err(DriverClientError::InvalidParameter { .. })
        ));
        assert!(dclient.read_range(NPU_REG_WINDOW_SIZE - REG_OFFSET, 0).unwrap().is_empty());
    }

    #[test]
    fn missing_device_node_is_unavailable() {
        let cfg = DriverConfig::driver_client_cfg(NpuType::EthosU55);
        assert!(matches!(
            DriverClient::new("/nonexistent/mem", cfg),
            Err(DriverClientError::DeviceUnavailable { .. })
        ));
    }
}
