//! Layout and interaction core of the service topology viewer.
//!
//! Everything here is free of rendering: the `topology-viewer` binary feeds
//! snapshots and pointer events in and paints what comes out.

pub mod config;
pub mod histogram;
pub mod interaction;
pub mod layout;
pub mod logging;
pub mod topology;
pub mod util;
pub mod viewport;
