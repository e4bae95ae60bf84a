//! Domain layer public interface.
//!
//! This module defines the abstractions the client core is written against,
//! independent of how a byte stream to the peer is actually obtained.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod dialer;

// --- Dialer domain re-exports ---

pub use dialer::{
    //
    BoxedStream,
    ByteStream,
    Dialer,
    DialerPtr,
};
