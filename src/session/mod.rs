//! Per-connection conversation. Each inbound line is interpreted against the
//! current `SessionState`; replies are plain text lines.

mod admin;
mod chef;
mod employee;
pub mod render;
pub mod state;
pub mod ws;

use tracing::{debug, error, info, warn};

use crate::auth::repo_types::{RoleKind, User};
use crate::auth::services::{authenticate, find_user, logout};
use crate::error::{ServiceError, ServiceResult};
use crate::notifications::services::unread_for;
use crate::state::AppState;

pub use state::SessionState;

pub const GENERIC_FAILURE: &str = "Something went wrong on our side. Please try again later.";

#[derive(Debug, Default)]
pub struct Reply {
    pub lines: Vec<String>,
    /// The transport should close the connection after sending `lines`.
    pub close: bool,
}

impl Reply {
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

pub struct Session {
    state: SessionState,
    user: Option<User>,
}

impl Session {
    pub fn start() -> (Self, Reply) {
        let mut reply = Reply::default();
        reply.push("Please enter your username:");
        (
            Self {
                state: SessionState::Username,
                user: None,
            },
            reply,
        )
    }

    #[cfg(test)]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Runs one inbound line. On error the state is rolled back (or reset to
    /// `Authenticated` for not-found and rule violations) and the client gets
    /// a message; nothing here ends the connection except `logout`.
    pub async fn handle(&mut self, st: &AppState, input: &str) -> Reply {
        let input = input.trim();
        let mut out = Reply::default();
        let current = self.state.clone();

        let result = if self.user.is_some()
            && current.is_sub_state()
            && input.eq_ignore_ascii_case("cancel")
        {
            out.push("Cancelled.");
            Ok(SessionState::Authenticated)
        } else {
            self.step(st, current.clone(), input, &mut out).await
        };

        let next = match result {
            Ok(next) => next,
            Err(e) => self.recover(&current, e, &mut out),
        };
        if matches!(next, SessionState::Authenticated)
            && !matches!(current, SessionState::Password { .. })
        {
            if let Some(role) = self.user.as_ref().and_then(User::role_kind) {
                out.push(options(role));
            }
        }
        if matches!(next, SessionState::Closed) {
            out.close = true;
        }
        debug!(from = ?state_name(&current), to = ?state_name(&next), "session step");
        self.state = next;
        out
    }

    fn recover(&self, current: &SessionState, e: ServiceError, out: &mut Reply) -> SessionState {
        match e {
            ServiceError::Invalid(msg) => {
                out.push(msg);
                current.clone()
            }
            ServiceError::NotFound(_) | ServiceError::Rejected(_) => {
                out.push(e.to_string());
                if self.user.is_some() {
                    SessionState::Authenticated
                } else {
                    current.clone()
                }
            }
            ServiceError::Unavailable(_) | ServiceError::Storage(_) => {
                error!(
                    error = %format!("{e:#}"),
                    state = ?state_name(current),
                    user_id = self.user.as_ref().map(|u| u.id),
                    "session step failed"
                );
                out.push(GENERIC_FAILURE);
                current.clone()
            }
        }
    }

    async fn step(
        &mut self,
        st: &AppState,
        current: SessionState,
        input: &str,
        out: &mut Reply,
    ) -> ServiceResult<SessionState> {
        match current {
            SessionState::Closed => Ok(SessionState::Closed),
            SessionState::Username => {
                if find_user(st, input).await?.is_none() {
                    out.push("User not found. Please enter your username:");
                    return Ok(SessionState::Username);
                }
                out.push("Please enter your password:");
                Ok(SessionState::Password {
                    username: input.to_string(),
                })
            }
            SessionState::Password { username } => self.login(st, &username, input, out).await,
            other => {
                let Some(user) = self.user.clone() else {
                    out.push("Please enter your username:");
                    return Ok(SessionState::Username);
                };
                self.step_authenticated(st, &user, other, input, out).await
            }
        }
    }

    async fn login(
        &mut self,
        st: &AppState,
        username: &str,
        password: &str,
        out: &mut Reply,
    ) -> ServiceResult<SessionState> {
        let Some(user) = find_user(st, username).await? else {
            out.push("User not found. Please enter your username:");
            return Ok(SessionState::Username);
        };
        if !authenticate(st, &user, password).await? {
            out.push("Invalid password. Please enter your username:");
            return Ok(SessionState::Username);
        }
        let Some(role) = user.role_kind() else {
            warn!(user_id = user.id, role = %user.role, "user has no known role");
            out.push("Unknown role. Please contact an administrator.");
            return Ok(SessionState::Username);
        };

        out.push(format!("Welcome, {}! You are logged in as {}.", user.username, user.role));
        out.push(options(role));
        let notifications = unread_for(st, &user).await?;
        if notifications.is_empty() {
            out.push("No new notifications.");
        }
        for n in notifications {
            out.push(format!("Notification: {}", n.content));
        }
        self.user = Some(user);
        Ok(SessionState::Authenticated)
    }

    async fn step_authenticated(
        &mut self,
        st: &AppState,
        user: &User,
        current: SessionState,
        input: &str,
        out: &mut Reply,
    ) -> ServiceResult<SessionState> {
        let role = user.role_kind();
        match current {
            SessionState::Authenticated if input.eq_ignore_ascii_case("logout") => {
                logout(st, user).await?;
                info!(user_id = user.id, "session closed by logout");
                out.push(format!("Logging you out, {}.", user.username));
                Ok(SessionState::Closed)
            }
            SessionState::Authenticated => match role {
                Some(RoleKind::Admin) => admin::command(st, input, out).await,
                Some(RoleKind::Chef) => chef::command(st, input, out).await,
                Some(RoleKind::Employee) => employee::command(st, user, input, out).await,
                None => {
                    out.push("Unknown role.");
                    Ok(SessionState::Authenticated)
                }
            },
            state @ (SessionState::AddUserUsername
            | SessionState::AddUserPassword { .. }
            | SessionState::AddUserRole { .. }
            | SessionState::AddMenuItemDetails
            | SessionState::UpdateMenuItemId
            | SessionState::UpdateMenuItem { .. }
            | SessionState::DeleteMenuItemId
            | SessionState::ChangeAvailability) => admin::input(st, state, input, out).await,
            state @ (SessionState::SelectRecommendations { .. } | SessionState::SelectItemToPrepare) => {
                chef::input(st, state, input, out).await
            }
            state @ (SessionState::EmployeeCastVote
            | SessionState::EmployeeGiveFeedback
            | SessionState::EmployeeEnterMenuItemIdForSurvey
            | SessionState::EmployeeAnsweringSurvey { .. }
            | SessionState::EmployeeUpdatingProfile { .. }) => {
                employee::input(st, user, state, input, out).await
            }
            SessionState::Username | SessionState::Password { .. } | SessionState::Closed => {
                out.push("Invalid state. Please try again.");
                Ok(SessionState::Authenticated)
            }
        }
    }
}

pub fn options(role: RoleKind) -> &'static str {
    match role {
        RoleKind::Admin => {
            "Options: 1. Add User, 2. Add Menu Item, 3. Show Menu Items, 4. Update Menu Item, \
             5. Delete Menu Item, 6. View Discard List, 7. Change Availability, logout"
        }
        RoleKind::Chef => {
            "Options: 1. View Menu, 2. Fetch Recommendations, 3. Select Recommendations, \
             4. View Votes, 5. Select Item to Prepare, logout"
        }
        RoleKind::Employee => {
            "Options: 1. View Rolled Out Menu, 2. Cast Vote, 3. View Prepared Items, \
             4. Give Feedback, 5. View Surveys, 6. Enter Survey Item ID, 7. Update Profile, logout"
        }
    }
}

/// Variant name only; payloads can hold passwords.
fn state_name(state: &SessionState) -> &'static str {
    match state {
        SessionState::Username => "username",
        SessionState::Password { .. } => "password",
        SessionState::Authenticated => "authenticated",
        SessionState::AddUserUsername => "addUserUsername",
        SessionState::AddUserPassword { .. } => "addUserPassword",
        SessionState::AddUserRole { .. } => "addUserRole",
        SessionState::AddMenuItemDetails => "addMenuItemDetails",
        SessionState::UpdateMenuItemId => "updateMenuItemId",
        SessionState::UpdateMenuItem { .. } => "updateMenuItem",
        SessionState::DeleteMenuItemId => "deleteMenuItemId",
        SessionState::ChangeAvailability => "changeAvailability",
        SessionState::SelectRecommendations { .. } => "selectRecommendations",
        SessionState::SelectItemToPrepare => "selectItemToPrepare",
        SessionState::EmployeeCastVote => "employeeCastVote",
        SessionState::EmployeeGiveFeedback => "employeeGiveFeedback",
        SessionState::EmployeeEnterMenuItemIdForSurvey => "employeeEnterMenuItemIdForSurvey",
        SessionState::EmployeeAnsweringSurvey { .. } => "employeeAnsweringSurvey",
        SessionState::EmployeeUpdatingProfile { .. } => "employeeUpdatingProfile",
        SessionState::Closed => "closed",
    }
}
