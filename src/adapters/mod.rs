//! Adapter implementations of the domain ports.

pub mod expansion;
pub mod sqlite;
