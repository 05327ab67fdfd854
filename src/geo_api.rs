mod http;
mod interface;
mod types;

pub use http::GeoClient;
pub use interface::GeoLookup;
pub use types::GeoLocation;
