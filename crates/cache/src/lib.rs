pub mod fingerprint;
pub mod store;

pub use fingerprint::{fingerprint, request_fingerprint};
pub use store::ResultCache;
