//! Wire DTOs for the Daily X backend.
//!
//! DESIGN
//! ======
//! Field names follow the backend verbatim (`img_url`, `auth_token`,
//! camelCase expense fields) through serde attributes so the Rust side can
//! use ordinary snake_case. Numeric fields go through lenient deserializers:
//! the backend serializes decimal columns as strings in some responses and
//! as numbers in others.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// AUTH
// =============================================================================

/// How a session token was obtained. Doubles as the `type` query parameter
/// of the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthType {
    #[serde(rename = "basic")]
    Basic,
    #[serde(rename = "google-oauth")]
    GoogleOAuth,
}

impl AuthType {
    /// Query-string value for `/v1/user/token?type=`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::GoogleOAuth => "google-oauth",
        }
    }
}

/// Identity record returned by the auth endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
    /// Profile picture, present for Google accounts.
    #[serde(rename = "img_url", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<AuthType>,
}

/// Successful body of `/v1/user/token` and `/v1/user/`: the user record with
/// the session token spliced in.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    #[serde(flatten)]
    pub user: User,
    pub auth_token: String,
}

// =============================================================================
// BUDGETS & EXPENSES
// =============================================================================

/// One day's budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    #[serde(deserialize_with = "deserialize_f64_lenient")]
    pub amount: f64,
    /// ISO date or timestamp of the budgeted day.
    pub day: String,
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub user_id: i64,
    #[serde(deserialize_with = "deserialize_f64_lenient")]
    pub remaining: f64,
}

impl Budget {
    /// Amount already spent against this budget.
    #[must_use]
    pub fn spent(&self) -> f64 {
        self.amount - self.remaining
    }

    /// A budget with nothing left counts as overspent.
    #[must_use]
    pub fn is_overspent(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Remaining share of the budget, `0.0` for a zero budget.
    #[must_use]
    pub fn remaining_ratio(&self) -> f64 {
        if self.amount == 0.0 { 0.0 } else { self.remaining / self.amount }
    }
}

/// A single expense booked against a daily budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    #[serde(deserialize_with = "deserialize_f64_lenient")]
    pub amount: f64,
    pub description: String,
    pub date: String,
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub user_id: i64,
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub budget_id: i64,
}

/// An expense as listed in the monthly summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthExpense {
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub id: i64,
    #[serde(deserialize_with = "deserialize_f64_lenient")]
    pub amount: f64,
    #[serde(deserialize_with = "deserialize_i64_from_number")]
    pub user_id: i64,
    /// Month identifier in `MM-YYYY` form.
    pub mid: String,
    pub description: String,
    pub date: String,
}

/// The day with the highest spend in a month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaxSpendInDay {
    #[serde(deserialize_with = "deserialize_f64_lenient")]
    pub amount: f64,
    pub date: String,
}

/// Aggregate returned by `/v1/expense/month`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBudget {
    #[serde(default)]
    pub monthly_expenses: Vec<MonthExpense>,
    #[serde(deserialize_with = "deserialize_f64_lenient")]
    pub total_spend: f64,
    pub max_spend_in_day: Option<MaxSpendInDay>,
}

/// Page cursor attached to every paginated listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_more: bool,
}

impl Pagination {
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.has_more
    }

    /// Page to request for "next", or `None` on the last page.
    #[must_use]
    pub fn next_page(&self) -> Option<u32> {
        if self.has_next() { self.page.checked_add(1) } else { None }
    }

    /// Page to request for "previous", or `None` on the first page.
    #[must_use]
    pub fn previous_page(&self) -> Option<u32> {
        self.has_previous().then(|| self.page - 1)
    }
}

/// `/v1/expense/budget/all` listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetsPage {
    pub budgets: Vec<Budget>,
    pub pagination: Pagination,
}

/// `/v1/expense` listing for one day, with that day's budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpensesPage {
    pub expenses: Vec<Expense>,
    pub budget: Budget,
    pub pagination: Pagination,
}

// =============================================================================
// LENIENT NUMBERS
// =============================================================================

fn deserialize_i64_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Ok(int);
            }
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            if let Some(float) = number.as_f64()
                && float.is_finite()
                && float.fract() == 0.0
                && float >= i64::MIN as f64
                && float <= i64::MAX as f64
            {
                return Ok(float as i64);
            }
            Err(D::Error::custom("expected integer-compatible number"))
        }
        serde_json::Value::String(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("expected integer string, got {raw:?}"))),
        _ => Err(D::Error::custom("expected number")),
    }
}

fn deserialize_f64_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(float) if float.is_finite() => Ok(float),
        _ => Err(D::Error::custom(format!("expected finite number, got {value}"))),
    }
}
