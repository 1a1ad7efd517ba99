pub mod application;
pub mod power_direction;
pub mod proxy_config;
pub mod reboot_config;
pub mod run_summary;
