pub mod api_client;
pub mod audit_store;
pub mod interrupt;
pub mod reachability;
pub mod remote_shell;
pub mod terminal_prompt;
