//! Daemon subsystem: event loop, poll scheduling, signal handling and the link
//! opener.

#[cfg(feature = "daemon")]
pub mod loop_main;
pub mod opener;
pub mod schedule;
#[cfg(feature = "daemon")]
pub mod signals;
