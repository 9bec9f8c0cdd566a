pub mod ethosu_api;
pub mod ethosu_cfg;
pub mod ethosu_data;
mod ethosu_hw_code;
pub mod ethosu_sim;

pub use ethosu_api::*;
pub use ethosu_cfg::{AxiConfig, AxiProfile};
pub use ethosu_data::*;
pub use ethosu_sim::{SimDevice, SIM_CONFIG, SIM_ID, SIM_REVISION, WRITE_LOG_CAPACITY};
