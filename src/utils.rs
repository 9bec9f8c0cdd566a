use std::{
    fs::{File, OpenOptions},
    io::Result,
    os::unix::prelude::OpenOptionsExt,
};

#[macro_export]
macro_rules! getter_log {
    ($data:expr, $from: expr) => {
        if $data.len() < 256 {
            log::debug!("Getting data [ {:#X?} ] from {:#X?}", $data, $from);
        } else {
            log::debug!(
                "Getting data of size [ {:?} ] from {:#X?}",
                $data.len(),
                $from
            );
        }
    };
}

#[macro_export]
macro_rules! setter_log {
    ($data:expr, $from: expr) => {
        log::trace!("Successfully set data [ {:#X?} ] to {:#X?}", $data, $from);
    };
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessFlags {
    RdMode = 0,   // rdonly channel
    WrMode = 1,   // wronly channel
    RdwrMode = 2, // rdwr channel
}

// ==== read/write ====
pub fn open_channel(path: &str, mode: AccessFlags) -> Result<File> {
    let mut options = OpenOptions::new();
    if mode == AccessFlags::RdwrMode || mode == AccessFlags::RdMode {
        options.read(true);
    }

    if mode == AccessFlags::RdwrMode || mode == AccessFlags::WrMode {
        options.write(true);
    }

    if cfg!(unix) {
        options.custom_flags(libc::O_SYNC);
    }
    options.open(path)
}

// ==== conversions ====
pub fn u32_words_to_u8_vec(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

pub fn split_u64(value: u64) -> (u32, u32) {
    ((value & 0xFFFF_FFFF) as u32, (value >> 32) as u32)
}
