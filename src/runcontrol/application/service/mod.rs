pub mod reboot_workflow;
pub mod restart_service;
pub mod state_resolver;
pub mod toggle_service;
