pub mod category;
pub mod events;
pub mod payload;

pub use category::*;
pub use events::*;
pub use payload::*;
