pub mod aggregate;
pub mod candidates;
pub mod enumerator;
pub mod pipeline;
pub mod probe;
pub mod resolver;
pub mod scoring;
