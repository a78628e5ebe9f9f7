//! Dispatch engine
//!
//! Session registry, acceptance arbitration, offer broadcast and the
//! order intake loop, plus the rider-facing service used by the API.

pub mod broadcaster;
pub mod engine;
pub mod fee;
pub mod intake;
pub mod pickup;
pub mod registry;
pub mod service;
pub mod session;

pub use broadcaster::{BroadcastSummary, OfferBroadcaster};
pub use engine::{DispatchCollaborators, DispatchEngine, DispatchOutcome, DispatchReport};
pub use intake::OrderIntake;
pub use pickup::PickupPacketBuilder;
pub use registry::SessionRegistry;
pub use service::{DeliveryService, OrderTracking};
pub use session::{CancelSignal, DispatchSession, SessionSnapshot};
