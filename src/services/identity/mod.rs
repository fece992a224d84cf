#[cfg(test)]
pub mod memory;
pub mod resolver;
pub mod store;

pub use resolver::{IdentityResolver, Resolution};
pub use store::PgIdentityStore;
