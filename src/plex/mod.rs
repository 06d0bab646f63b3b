//! Clients for the Plex Media Server and the plex.tv account service.

mod client;
mod tv;
mod types;

pub use client::PlexServer;
pub use tv::PlexTv;
pub use types::*;
