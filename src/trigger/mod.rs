//! Triggers that decide when categories are restored or backed up

pub mod change;
pub mod session;

pub use change::*;
pub use session::*;
