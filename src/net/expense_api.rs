//! Budget and expense endpoints.
//!
//! Every call reads the current token from the session store at send time,
//! so a sign-out between two calls is honored immediately.

#[cfg(test)]
#[path = "expense_api_test.rs"]
mod expense_api_test;

use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::types::{Budget, BudgetsPage, Expense, ExpensesPage, MonthlyBudget};
use crate::config::{AuthScheme, ClientConfig, HttpTimeouts};
use crate::state::session::SessionStore;

pub struct ExpenseApi {
    http: reqwest::Client,
    base_url: String,
    scheme: AuthScheme,
    session: SessionStore,
}

impl ExpenseApi {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        timeouts: HttpTimeouts,
        scheme: AuthScheme,
        session: SessionStore,
    ) -> Result<Self, ApiError> {
        let http = super::build_http_client(timeouts)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url, scheme, session })
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiError> {
        Self::new(config.api_url.clone(), config.timeouts, config.auth_scheme, session)
    }

    /// Budget for `day` (`YYYY-MM-DD`), `None` when none was set.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when signed out or the request fails.
    pub async fn budget_for_day(&self, day: &str) -> Result<Option<Budget>, ApiError> {
        let request = self.http.get(self.url("/v1/expense/budget")).query(&[("day", day)]);
        let value: serde_json::Value = self.send(request, "budget_for_day").await?;
        if is_empty_body(&value) {
            return Ok(None);
        }
        decode(value, "budget_for_day").map(Some)
    }

    /// Spend summary for month `mid` (`MM-YYYY`).
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when signed out or the request fails.
    pub async fn monthly_summary(&self, mid: &str) -> Result<MonthlyBudget, ApiError> {
        let request = self.http.post(self.url("/v1/expense/month")).query(&[("mid", mid)]);
        let value = self.send(request, "monthly_summary").await?;
        decode(value, "monthly_summary")
    }

    /// # Errors
    ///
    /// Returns an [`ApiError`] when signed out or the request fails.
    pub async fn budgets_page(&self, page: u32, limit: u32) -> Result<BudgetsPage, ApiError> {
        let request = self
            .http
            .post(self.url("/v1/expense/budget/all"))
            .query(&[("page", page), ("limit", limit)]);
        let value = self.send(request, "budgets_page").await?;
        decode(value, "budgets_page")
    }

    /// Set today's budget.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when signed out or the request fails.
    pub async fn add_budget(&self, amount: i64) -> Result<Budget, ApiError> {
        let request = self
            .http
            .post(self.url("/v1/expense/budget"))
            .json(&serde_json::json!({ "amount": amount }));
        let value = self.send(request, "add_budget").await?;
        decode(value, "add_budget")
    }

    /// Expenses booked on `day`, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when signed out or the request fails.
    pub async fn expenses_page(&self, page: u32, limit: u32, day: &str) -> Result<ExpensesPage, ApiError> {
        let page = page.to_string();
        let limit = limit.to_string();
        let request = self
            .http
            .get(self.url("/v1/expense"))
            .query(&[("day", day), ("page", page.as_str()), ("limit", limit.as_str())]);
        let value = self.send(request, "expenses_page").await?;
        decode(value, "expenses_page")
    }

    /// # Errors
    ///
    /// Returns an [`ApiError`] when signed out or the request fails.
    pub async fn add_expense(&self, amount: i64, description: &str, budget_id: i64) -> Result<Expense, ApiError> {
        let request = self
            .http
            .post(self.url("/v1/expense/"))
            .json(&serde_json::json!({ "amount": amount, "description": description, "budgetId": budget_id }));
        let value = self.send(request, "add_expense").await?;
        decode(value, "add_expense")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder, op: &'static str) -> Result<serde_json::Value, ApiError> {
        let token = self.session.token().ok_or(ApiError::MissingToken)?;
        let result = async {
            let response = request
                .header(AUTHORIZATION, self.scheme.header_value(&token))
                .send()
                .await
                .map_err(|e| ApiError::network(&e))?;
            let status = response.status().as_u16();
            let text = response.text().await.map_err(|e| ApiError::network(&e))?;
            super::check_body(status, &text)
        }
        .await;
        if let Err(e) = &result {
            tracing::warn!(op, error = %e, "expense API call failed");
        }
        result
    }
}

fn is_empty_body(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn decode<T: DeserializeOwned>(value: serde_json::Value, op: &'static str) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| {
        tracing::warn!(op, error = %e, "unexpected expense API payload");
        ApiError::Parse(e.to_string())
    })
}
