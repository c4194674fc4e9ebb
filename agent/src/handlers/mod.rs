//! Request handlers for the control API.

mod events;
mod records;
mod status;

pub use events::*;
pub use records::*;
pub use status::*;
