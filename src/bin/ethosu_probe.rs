//! Print identity, configuration and live status of an Ethos-U NPU.
//!
//! Environment:
//! * `DEVICE` - device node exposing the register window (default `/dev/mem`).
//! * `BASE` - physical address of the window, hex (default `0x48000000`).
//! * `SHRAM_SECTION` - dump one 1 KiB SHRAM section when set.
//! * `DUMP_REGS` - log every named register when set.
use anyhow::Context;
use ethosu_core::{driver_client::*, ethosu::*, utils::u32_words_to_u8_vec};
use std::env;

fn parse_hex(value: &str) -> anyhow::Result<u64> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .with_context(|| format!("invalid hex value {:?}", value))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = env::var("DEVICE").unwrap_or_else(|_| "/dev/mem".to_string());
    let base = match env::var("BASE") {
        Ok(b) => parse_hex(&b)?,
        Err(_) => 0x4800_0000,
    };

    let cfg = DriverConfig::driver_client_cfg(NpuType::EthosU55).with_ctrl_baseaddr(base);
    let dclient = DriverClient::new(&path, cfg)
        .with_context(|| format!("opening {} at {:#X}", path, base))?;
    let device = EthosuDevice::init(dclient)?;

    let id = device.get_id()?;
    let config = device.get_config()?;
    println!(
        "driver   {}.{}.{}",
        DRIVER_VERSION_MAJOR, DRIVER_VERSION_MINOR, DRIVER_VERSION_PATCH
    );
    println!(
        "arch     {}.{}.{}",
        id.arch_major_rev, id.arch_minor_rev, id.arch_patch_rev
    );
    println!(
        "version  {}.{} (product {}, status {})",
        id.version_major, id.version_minor, id.product_major, id.version_status
    );
    println!("revision {:#X}", device.get_revision()?);
    println!("macs/cc  {}", config.macs_per_cc);
    println!("cmd ver  {}", config.cmd_stream_version);
    println!("shram    {} KiB", config.shram_size);

    let status = device.get_status_mask()?;
    println!("status   {:#06X} ({:?})", status.bits(), status.completion());
    println!("history  {:#06X}", device.get_irq_history_mask()?.bits());
    println!("qread    {:#X}", device.get_qread()?);

    if env::var("DUMP_REGS").is_ok() {
        device.dump_registers()?;
    }

    if let Ok(section) = env::var("SHRAM_SECTION") {
        let section: u32 = section.parse().context("SHRAM_SECTION")?;
        let bytes = u32_words_to_u8_vec(&device.get_shram_data(section)?);
        for (row, chunk) in bytes.chunks(16).enumerate() {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
            println!("{:05X}: {}", section as usize * 1024 + row * 16, hex.join(" "));
        }
    }
    Ok(())
}
