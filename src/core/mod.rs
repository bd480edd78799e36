//! Core module containing the domain model, errors and service traits

pub mod auth;
pub mod cache;
pub mod entity;
pub mod error;
pub mod events;
pub mod preferences;
pub mod query;
pub mod service;
pub mod validation;

pub use auth::{InMemoryTokenStore, Session, SessionState, TokenStore};
pub use cache::{QueryCache, QueryKey};
pub use entity::{Category, Expense, ExpenseDraft, ExpensePatch};
pub use error::{ErrorKind, Notice, NoticeLevel, TracexError, TracexResult};
pub use events::{ClientEvent, EventBus, EventEnvelope};
pub use preferences::{InMemoryPreferenceStore, PreferenceStore, Theme};
pub use query::{FilterChange, FilterQuery, Page, PageSize, PaginationMeta, SortField, SortOrder};
pub use service::{
    AuthService, BudgetService, BulkUpdated, CategoryService, ExpenseService, RecurringService,
};
pub use validation::Validate;
