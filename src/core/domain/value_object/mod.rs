mod api_url;
mod credentials;
mod full_path;
mod service_descriptor;

pub use api_url::ApiUrl;
pub use credentials::Credentials;
pub use full_path::FullPath;
pub use service_descriptor::{ServiceDescriptor, get_host};

// Re-export validation functions for internal use
pub(crate) use api_url::validate_api_url;
pub(crate) use credentials::validate_username;
