//! Session storage backends for Promptwright.

pub mod in_memory;

pub use in_memory::InMemorySessionStore;
