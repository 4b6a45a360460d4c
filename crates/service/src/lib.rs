//! Service layer for the status document.
//! - `storage`: the injected key-value capability and its backends.
//! - `status`: read / update contract over the single status record.

pub mod errors;
pub mod status;
pub mod storage;

pub use errors::StatusError;
pub use status::StatusStore;
