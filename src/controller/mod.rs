//! Client-side state controllers
//!
//! Pure state machines ([`filter`], [`selection`], [`pagination`],
//! [`debounce`]) composed by the [`ListController`], plus the dispatchers
//! that issue mutations and reconcile caches afterwards.

pub mod catalog;
pub mod debounce;
pub mod dispatcher;
pub mod fallback;
pub mod filter;
pub mod list;
pub mod pagination;
pub mod selection;

pub use catalog::CatalogDispatcher;
pub use debounce::{Debouncer, SearchBinding, TimerHandle, schedule};
pub use dispatcher::MutationDispatcher;
pub use fallback::{CrashReport, Recovery, guard};
pub use filter::FilterState;
pub use list::{Dialog, ListController, ListView, RefreshOutcome};
pub use pagination::PageCursor;
pub use selection::{SelectionSet, SelectionState};
