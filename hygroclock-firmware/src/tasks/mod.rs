//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod coordinator;
pub mod http;
pub mod net;
pub mod notifier;
pub mod time_sync;

pub use coordinator::{coordinator_task, DeviceScheduler};
pub use http::{http_task, HTTP_WORKERS};
pub use net::{cyw43_task, net_task};
pub use notifier::notifier_task;
pub use time_sync::time_sync_task;
