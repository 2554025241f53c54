//! View state plumbing
//!
//! Events emitted by the views, the dispatcher that delivers them, and the
//! id allocator a view owns instead of a process-wide counter.

pub mod dispatcher;
pub mod events;
pub mod ids;

pub use dispatcher::{EventDispatcher, FnSubscriber, ViewSubscriber};
pub use events::ViewEvent;
pub use ids::IdAllocator;
