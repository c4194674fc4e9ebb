//! Local record store on SQLite.
//!
//! Durable storage for pending old/new meter records, the available-serial
//! reference table and sync metadata. No network access happens here.

mod error;
mod metadata;
mod new_meters;
mod old_meters;
mod pool;
mod records;
mod serials;
mod stats;

pub use error::*;
pub use metadata::*;
pub use new_meters::*;
pub use old_meters::*;
pub use pool::*;
pub use records::*;
pub use serials::*;
pub use stats::*;
