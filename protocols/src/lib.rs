//! Wire formats spoken by the resolver.

pub mod dns;
