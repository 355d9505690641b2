//! Route guard derived from the session store.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every protected view asks the guard what to show instead of inspecting the
//! session itself, so redirect behavior is identical everywhere: a loader
//! while the persisted session is being restored, the entry screen when
//! signed out, the requested view when signed in.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::fmt;

use tokio::sync::watch;

use super::session::{Session, SessionStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    /// Startup restore still running.
    Restoring,
    Unauthenticated,
    Authenticated,
}

impl GuardState {
    #[must_use]
    pub fn of(session: &Session) -> Self {
        if !session.is_hydrated() {
            Self::Restoring
        } else if session.is_authenticated() {
            Self::Authenticated
        } else {
            Self::Unauthenticated
        }
    }
}

/// Navigable destinations of the app.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// Sign-in / sign-up screen.
    Entry,
    Home,
    Dashboard,
    Expenses,
    /// Expenses of one day, `YYYY-MM-DD`.
    ExpenseDay(String),
    Profile,
    /// Landing target of the OAuth consent redirect.
    OAuthRedirect,
}

impl Route {
    /// Parse an app path. Unknown paths yield `None`.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_end_matches('/');
        let route = match trimmed {
            "" => Self::Home,
            "/auth" => Self::Entry,
            "/dashboard" => Self::Dashboard,
            "/expense" => Self::Expenses,
            "/profile" => Self::Profile,
            "/oauthredirect" => Self::OAuthRedirect,
            other => {
                let day = other.strip_prefix("/expense/")?;
                if day.is_empty() || day.contains('/') {
                    return None;
                }
                Self::ExpenseDay(day.to_owned())
            }
        };
        Some(route)
    }

    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Entry => "/auth".into(),
            Self::Home => "/".into(),
            Self::Dashboard => "/dashboard".into(),
            Self::Expenses => "/expense".into(),
            Self::ExpenseDay(day) => format!("/expense/{day}"),
            Self::Profile => "/profile".into(),
            Self::OAuthRedirect => "/oauthredirect".into(),
        }
    }

    /// Whether the route needs a signed-in user.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Entry | Self::OAuthRedirect)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// What to show for a navigation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    /// Loading indicator and nothing else.
    Loading,
    Redirect(Route),
    Render(Route),
}

/// Decide what to show for `route` in guard state `state`.
#[must_use]
pub fn decide(state: GuardState, route: &Route) -> RouteDecision {
    match state {
        GuardState::Restoring => RouteDecision::Loading,
        GuardState::Unauthenticated if route.is_protected() => RouteDecision::Redirect(Route::Entry),
        GuardState::Authenticated if *route == Route::Entry => RouteDecision::Redirect(Route::Home),
        _ => RouteDecision::Render(route.clone()),
    }
}

/// Read-only view over a [`SessionStore`].
#[derive(Clone)]
pub struct RouteGuard {
    rx: watch::Receiver<Session>,
    /// State last handed out by [`RouteGuard::settled`] or
    /// [`RouteGuard::changed`].
    observed: GuardState,
}

impl RouteGuard {
    #[must_use]
    pub fn new(store: &SessionStore) -> Self {
        let rx = store.subscribe();
        let observed = GuardState::of(&rx.borrow());
        Self { rx, observed }
    }

    #[must_use]
    pub fn state(&self) -> GuardState {
        GuardState::of(&self.rx.borrow())
    }

    #[must_use]
    pub fn decide(&self, route: &Route) -> RouteDecision {
        decide(self.state(), route)
    }

    /// Wait until the startup restore has finished and return the resulting
    /// state. Returns immediately once restored.
    pub async fn settled(&mut self) -> GuardState {
        let state = match self.rx.wait_for(Session::is_hydrated).await {
            Ok(session) => GuardState::of(&session),
            // The store is gone; nothing will ever authenticate.
            Err(_) => GuardState::Unauthenticated,
        };
        self.observed = state;
        state
    }

    /// Wait until the guard state differs from the one last observed.
    /// Session changes that keep the same state (a loading toggle, a token
    /// swap) are skipped. Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<GuardState> {
        loop {
            let now = GuardState::of(&self.rx.borrow_and_update());
            if now != self.observed {
                self.observed = now;
                return Some(now);
            }
            self.rx.changed().await.ok()?;
        }
    }
}
