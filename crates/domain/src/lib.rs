pub mod entities;
pub mod events;
pub mod ports;

pub use dispatch_core::{DispatchError, DispatchResult};
pub use entities::*;
pub use events::*;
pub use ports::*;
