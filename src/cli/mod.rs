//! Terminal front end: renders widget snapshots as tables.

pub mod setup;
pub mod show;
pub mod table;
pub mod ui;
pub mod watch;
