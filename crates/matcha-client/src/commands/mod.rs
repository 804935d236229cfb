//! User-initiated operations.
//!
//! Each sub-module groups related commands by domain. Every function takes
//! the [`ClientContext`](crate::ClientContext) it acts on and surfaces its
//! errors to the caller. Mutations of the own profile end with a profile
//! refresh so the snapshot, and with it the completeness gate, reflects
//! the server's view.

pub mod browsing;
pub mod chat;
pub mod dates;
pub mod images;
pub mod notifications;
pub mod profile;
pub mod tags;
