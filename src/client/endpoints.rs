//! API paths
//!
//! Everything except `/health` lives under `/api/v1`. Ids are pushed as
//! separate path segments so they are percent-encoded by the URL builder.

/// Prefix of every versioned route
pub const API_PREFIX: [&str; 2] = ["api", "v1"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Health,
    SignUp,
    SignIn,
    Me,
    ChangePassword,
    Categories,
    Category(&'a str),
    CategoryRestore(&'a str),
    Expenses,
    Expense(&'a str),
    ExpenseRestore(&'a str),
    ExpenseBulk,
    ExpenseSummary,
    ExpenseSummaryByCategory,
    ExpenseExport,
    Budgets,
    Budget(&'a str),
    BudgetCompare(&'a str),
    PublicBudget(&'a str),
    Recurring,
    RecurringOne(&'a str),
    RecurringRun,
}

impl<'a> Endpoint<'a> {
    /// Path segments, prefix included
    pub fn segments(&self) -> Vec<&'a str> {
        let route: Vec<&'a str> = match *self {
            Endpoint::Health => return vec!["health"],
            Endpoint::SignUp => vec!["auth", "signup"],
            Endpoint::SignIn => vec!["auth", "signin"],
            Endpoint::Me => vec!["auth", "me"],
            Endpoint::ChangePassword => vec!["auth", "change-password"],
            Endpoint::Categories => vec!["categories"],
            Endpoint::Category(id) => vec!["categories", id],
            Endpoint::CategoryRestore(id) => vec!["categories", id, "restore"],
            Endpoint::Expenses => vec!["expenses"],
            Endpoint::Expense(id) => vec!["expenses", id],
            Endpoint::ExpenseRestore(id) => vec!["expenses", id, "restore"],
            Endpoint::ExpenseBulk => vec!["expenses", "bulk"],
            Endpoint::ExpenseSummary => vec!["expenses", "summary"],
            Endpoint::ExpenseSummaryByCategory => vec!["expenses", "summary", "by-category"],
            Endpoint::ExpenseExport => vec!["expenses", "export"],
            Endpoint::Budgets => vec!["budgets"],
            Endpoint::Budget(id) => vec!["budgets", id],
            Endpoint::BudgetCompare(id) => vec!["budgets", id, "compare"],
            Endpoint::PublicBudget(slug) => vec!["public", "budgets", slug],
            Endpoint::Recurring => vec!["recurring"],
            Endpoint::RecurringOne(id) => vec!["recurring", id],
            Endpoint::RecurringRun => vec!["recurring", "run"],
        };
        API_PREFIX.into_iter().chain(route).collect()
    }

    /// Display form used in logs
    pub fn path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }
}
