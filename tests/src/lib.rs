//! End-to-end checks of the scan pipeline with the network replaced by fakes.

pub mod support;

#[cfg(test)]
mod pipeline;
#[cfg(test)]
mod provider;
