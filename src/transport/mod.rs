//! Dialer implementations.
//!
//! This module provides concrete implementations of the domain-level
//! `Dialer` trait. Client code depends only on `DialerPtr`.

mod memory;
mod tcp;

pub use memory::{MemoryDialer, MemoryListener};
pub use tcp::TcpDialer;
