//! Status document data model shared by the service and server crates.

pub mod errors;
pub mod source;
pub mod status;
pub mod timestamp;

pub use source::Source;
pub use status::{StatusDocument, SystemState, UpdateRequest, UpdateResult};
