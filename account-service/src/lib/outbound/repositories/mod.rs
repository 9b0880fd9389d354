pub mod memory;

pub use memory::InMemoryAccountStore;
