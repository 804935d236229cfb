//! # matcha-client
//!
//! Client core of the Matcha dating app: who is logged in, whether their
//! profile is complete enough to use the app, which screens they may see,
//! and the real-time channel that keeps cached reads fresh.
//!
//! Everything hangs off an explicitly constructed [`ClientContext`]; there
//! is no global state, so tests (and multiple "tabs") can run isolated
//! instances side by side.

pub mod cache;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod guard;
pub mod notifications;
pub mod realtime;
pub mod session;
pub mod state;
pub mod sync;
pub mod viewer;

#[cfg(test)]
pub(crate) mod testing;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub use cache::{QueryCache, QueryKey};
pub use config::ClientConfig;
pub use context::ClientContext;
pub use error::ClientError;
pub use events::{ClientEvent, EventBus};
pub use guard::{GuardDecision, RouteConfig, RouteGuard};
pub use notifications::NotificationFeed;
pub use realtime::{PushHandler, RealtimeChannel, ReconnectPolicy};
pub use session::{BootOutcome, RefreshOutcome, SessionStore};
pub use state::{SessionStatus, SessionView};

/// Install the `fmt` subscriber, honoring `RUST_LOG`. Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("matcha_client=debug,matcha_net=debug,matcha_store=info,warn")
    });

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        info!("Matcha client v{} starting", env!("CARGO_PKG_VERSION"));
    }
}
