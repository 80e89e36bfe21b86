use async_trait::async_trait;
use axum::{
    Json,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{Clinic, Identity, User},
    paths::{self, AppPath, PathCategory},
};

/// Role
///
/// The role derived from a user's markers. A user carries at most one marker;
/// `Session::from_identity` rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Role {
    HealthWorker { id: Uuid },
    ClinicAdmin { id: Uuid },
    /// Signed in, but neither marker is present.
    Unassigned,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("user {0} is both a health worker and a clinic admin")]
    ConflictingRoles(Uuid),
}

/// Session
///
/// The authenticated identity resolved for the current request. Built fresh on
/// every request and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    pub clinic: Clinic,
    pub role: Role,
}

impl Session {
    /// from_identity
    ///
    /// Derives the role from the identity's markers and enforces that a user is
    /// never both a health worker and a clinic admin.
    pub fn from_identity(identity: Identity) -> Result<Self, SessionError> {
        let role = match (identity.health_worker_id, identity.clinic_admin_id) {
            (Some(_), Some(_)) => return Err(SessionError::ConflictingRoles(identity.user.id)),
            (Some(id), None) => Role::HealthWorker { id },
            (None, Some(id)) => Role::ClinicAdmin { id },
            (None, None) => Role::Unassigned,
        };

        Ok(Self {
            user: identity.user,
            clinic: identity.clinic,
            role,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn clinic_id(&self) -> Uuid {
        self.clinic.id
    }

    pub fn health_worker_id(&self) -> Option<Uuid> {
        match self.role {
            Role::HealthWorker { id } => Some(id),
            _ => None,
        }
    }

    pub fn clinic_admin_id(&self) -> Option<Uuid> {
        match self.role {
            Role::ClinicAdmin { id } => Some(id),
            _ => None,
        }
    }

    pub fn is_health_worker(&self) -> bool {
        self.health_worker_id().is_some()
    }

    pub fn is_clinic_admin(&self) -> bool {
        self.clinic_admin_id().is_some()
    }

    pub fn require_health_worker(&self) -> Result<Uuid, ApiError> {
        self.health_worker_id()
            .ok_or_else(|| ApiError::forbidden("health worker session required"))
    }

    pub fn require_clinic_admin(&self) -> Result<Uuid, ApiError> {
        self.clinic_admin_id()
            .ok_or_else(|| ApiError::forbidden("clinic admin session required"))
    }

    /// Fails unless `clinic_id` is the session's own clinic.
    pub fn require_clinic(&self, clinic_id: Uuid) -> Result<(), ApiError> {
        if self.clinic.id == clinic_id {
            Ok(())
        } else {
            Err(ApiError::forbidden("the resource belongs to another clinic"))
        }
    }
}

/// GuardDecision
///
/// The outcome of one guard evaluation. The guard itself never navigates; the
/// HTTP layer turns `Redirect` into a `303 See Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    /// Render with this session.
    Allow(Session),
    /// Render without a session (public page, nobody signed in).
    AllowAnonymous,
    /// Navigate elsewhere; rendering stops.
    Redirect(AppPath),
}

impl GuardDecision {
    pub fn redirect_target(&self) -> Option<&AppPath> {
        match self {
            GuardDecision::Redirect(target) => Some(target),
            _ => None,
        }
    }
}

impl IntoResponse for GuardDecision {
    fn into_response(self) -> Response {
        match self {
            GuardDecision::Allow(session) => Json(Some(session)).into_response(),
            GuardDecision::AllowAnonymous => Json(None::<Session>).into_response(),
            GuardDecision::Redirect(target) => Redirect::to(&target.as_path()).into_response(),
        }
    }
}

/// decide
///
/// The guard's decision table for a path from the enumeration.
pub fn decide(path: &AppPath, session: Option<Session>) -> GuardDecision {
    decide_category(Some(path.category()), session)
}

/// Same table for a raw request path. Paths outside the enumeration belong to
/// no category, so they are never reachable anonymously.
pub fn decide_raw(path: &str, session: Option<Session>) -> GuardDecision {
    decide_category(paths::classify(path), session)
}

fn decide_category(category: Option<PathCategory>, session: Option<Session>) -> GuardDecision {
    let Some(session) = session else {
        return match category {
            Some(PathCategory::Public) => GuardDecision::AllowAnonymous,
            _ => GuardDecision::Redirect(AppPath::SignIn),
        };
    };

    match session.role {
        Role::HealthWorker { .. } => match category {
            Some(PathCategory::Authenticated | PathCategory::HealthWorker) => {
                GuardDecision::Allow(session)
            }
            _ => GuardDecision::Redirect(AppPath::Dashboard),
        },
        Role::ClinicAdmin { .. } => match category {
            Some(PathCategory::Admin | PathCategory::Authenticated) => {
                GuardDecision::Allow(session)
            }
            _ => GuardDecision::Redirect(AppPath::admin_landing()),
        },
        Role::Unassigned => GuardDecision::Redirect(AppPath::Dashboard),
    }
}

/// SessionSource
///
/// The capability to resolve the current request's session. The guard calls it
/// exactly once per evaluation and does not catch its failures.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, ApiError>;
}

/// A session that has already been resolved.
#[async_trait]
impl SessionSource for Option<Session> {
    async fn current_session(&self) -> Result<Option<Session>, ApiError> {
        Ok(self.clone())
    }
}

/// guard
///
/// Resolves the session once through `source` and applies the decision table to
/// `path`. Identity-provider failures propagate unchanged.
pub async fn guard<S>(source: &S, path: &str) -> Result<GuardDecision, ApiError>
where
    S: SessionSource + ?Sized,
{
    let session = source.current_session().await?;
    let decision = decide_raw(path, session);

    if let Some(target) = decision.redirect_target() {
        tracing::debug!(requested = %path, redirect = %target, "page guard redirect");
    }

    Ok(decision)
}
