use ethosu_core::{driver_client::*, ethosu::*};
use std::sync::Arc;

pub type SimNpu = EthosuDevice<Arc<SimDevice>>;

pub const CMD_STREAM_ADDR: u64 = 0x6000_0000;
pub const CMD_STREAM_LEN: u32 = 0x200;

pub fn sim_device(cfg: DriverConfig) -> (SimNpu, Arc<SimDevice>) {
    sim_device_from(cfg, SimDevice::new(&cfg))
}

pub fn sim_device_from(cfg: DriverConfig, sim: SimDevice) -> (SimNpu, Arc<SimDevice>) {
    let sim = Arc::new(sim);
    let dclient = DriverClient::with_backend(cfg, Arc::clone(&sim));
    let device = EthosuDevice::init(dclient).expect("init on simulator");
    (device, sim)
}

pub fn default_cfg() -> DriverConfig {
    DriverConfig::driver_client_cfg(NpuType::EthosU55)
}

/// Poll until the irq latch is set, bounded by `max_polls`.
pub fn wait_irq(device: &SimNpu, max_polls: usize) -> Option<StatusMask> {
    (0..max_polls).find_map(|_| {
        let status = device.get_status_mask().ok()?;
        status.irq_raised().then_some(status)
    })
}

pub fn invocation(nof_tensors: usize) -> CommandStreamInvocation {
    let base_addr: Vec<u64> = (0..nof_tensors as u64)
        .map(|i| 0x7000_0000 + i * 0x10_0000)
        .collect();
    CommandStreamInvocation::new(CMD_STREAM_ADDR, CMD_STREAM_LEN, &base_addr)
}
