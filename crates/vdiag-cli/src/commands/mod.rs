//! Command implementations for vdiag

pub mod dtc;
pub mod list;
pub mod query;
pub mod raw;
pub mod scan;
pub mod status;

pub use dtc::dtc;
pub use list::list;
pub use query::{group, pid};
pub use raw::raw;
pub use scan::scan;
pub use status::status;
