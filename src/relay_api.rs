mod http;
mod interface;
pub mod types;

pub use http::RelayDirectoryClient;
pub use interface::RelayDirectory;
pub use types::RelaysResponse;
