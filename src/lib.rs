//! # Tracex client
//!
//! Typed client and list state controller for the Tracex expense-tracking
//! REST API.
//!
//! ## Features
//!
//! - **HTTP client**: every endpoint behind async service traits, with
//!   envelope decoding, bearer tokens and status-mapped errors
//! - **List controller**: filters, debounced search, pagination and a
//!   selection set driving bulk delete, bulk edit and import
//! - **Cache invalidation**: mutations invalidate query keys only after the
//!   server answered; subscribers re-fetch
//! - **In-memory backend**: the same service traits without a server, for
//!   tests and demos
//! - **Configuration**: YAML file with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tracex::prelude::*;
//!
//! let config = ClientConfig::from_yaml_file("tracex.yaml")?.with_env()?;
//! let events = EventBus::new(config.event_capacity);
//! let client = ApiClient::new(&config, Arc::new(InMemoryTokenStore::new()), events.clone())?;
//!
//! let list = ListController::new(Arc::new(client), QueryCache::new(events), &config);
//! list.spawn_refresh_loop();
//! list.search_input("Lunch");
//! ```

pub mod client;
pub mod config;
pub mod controller;
pub mod core;
pub mod storage;

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`)
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{InMemoryTokenStore, Session, SessionState, TokenStore},
        cache::{QueryCache, QueryKey},
        entity::{
            BulkEditForm, Category, CategoryForm, Expense, ExpenseDraft, ExpenseForm,
            ExpensePatch,
        },
        error::{ErrorKind, Notice, NoticeLevel, TracexError, TracexResult},
        events::{ClientEvent, EventBus, EventEnvelope},
        preferences::{InMemoryPreferenceStore, PreferenceStore, Theme},
        query::{FilterChange, FilterQuery, Page, PageSize, PaginationMeta, SortField, SortOrder},
        service::{AuthService, BudgetService, CategoryService, ExpenseService, RecurringService},
        validation::Validate,
    };

    // === Controllers ===
    pub use crate::controller::{
        CatalogDispatcher, Dialog, ListController, ListView, MutationDispatcher, PageCursor,
        RefreshOutcome, SelectionState,
    };

    // === Client ===
    pub use crate::client::{ApiClient, CsvExport, export::ExportQuery};

    // === Storage ===
    pub use crate::storage::{InMemoryCategoryService, InMemoryExpenseService};

    // === Config ===
    pub use crate::config::{BulkDeleteStrategy, ClientConfig};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
