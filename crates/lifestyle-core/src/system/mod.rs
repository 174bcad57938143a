pub mod persistence;

pub use persistence::{MemoryStorage, Persistence};
