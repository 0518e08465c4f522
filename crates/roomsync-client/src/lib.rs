//! # roomsync-client
//!
//! Room synchronization core: room directory, message feed, per-member read
//! state and contacts, exposed as async operations on [`ChatClient`] and as
//! live [`Subscription`] streams.

pub mod commands;
pub mod config;
pub mod directory;
pub mod events;
pub mod state;
pub mod subscription;

use tracing_subscriber::{fmt, EnvFilter};

pub use commands::contacts::filter_contacts;
pub use config::ClientConfig;
pub use directory::{filter_rooms, sort_rooms, DirectoryState, RoomDirectory, UserDirectory};
pub use events::Change;
pub use state::ChatClient;
pub use subscription::{Snapshot, Subscription};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the built-in default filter. Calling this
/// more than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("roomsync_client=debug,roomsync_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
