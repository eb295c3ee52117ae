//! Interactive load planning for a single truck container.
//!
//! The engine keeps a set of box-shaped packages on the container floor free
//! of overlaps while a user drags, rotates, deletes and restores them.
//! [`session::LoadSession`] is the entry point; the other modules are the
//! building blocks it composes and can be used on their own.

pub mod api;
pub mod config;
pub mod drag;
pub mod error;
pub mod geometry;
pub mod ingest;
pub mod model;
pub mod notify;
pub mod palette;
pub mod placement;
pub mod rotation;
pub mod session;
pub mod snap;
pub mod types;
pub mod weight;
