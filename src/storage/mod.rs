//! Service backends other than the HTTP client

pub mod in_memory;

pub use in_memory::{InMemoryCategoryService, InMemoryExpenseService};
