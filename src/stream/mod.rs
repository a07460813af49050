//! Event-log streaming - historical iteration and live subscriptions

mod iterator;
mod watcher;

pub use iterator::{EventIterator, IterState};
pub use watcher::EventSubscription;
