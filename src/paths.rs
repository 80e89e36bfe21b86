use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

/// PathCategory
///
/// The visibility bucket a page path belongs to. Every `AppPath` variant maps to
/// exactly one category, so the guard's decision table only ever has to reason
/// about these four cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum PathCategory {
    /// Reachable without a session (sign-in, sign-up).
    Public,
    /// Any signed-in role.
    Authenticated,
    /// Clinic administrators only.
    Admin,
    /// Health workers only.
    HealthWorker,
}

/// AppPath
///
/// The closed set of page routes the portal renders. Route strings are never
/// looked up at runtime from a table: the mapping lives in `as_path`, `parse`
/// and `category`, which are exhaustive matches, so adding a variant without
/// classifying it fails to compile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppPath {
    SignIn,
    SignUp,
    Dashboard,
    HealthUsers,
    HealthWorkers,
    ClinicalDocuments,
    ClinicAdmins,
    Configuration,
    /// A single patient's clinical history and chatbot, keyed by the patient's CI.
    ClinicalHistory { ci: String },
}

const SIGN_IN: &str = "/sign-in";
const SIGN_UP: &str = "/sign-up";
const DASHBOARD: &str = "/";
const HEALTH_USERS: &str = "/usuarios-de-salud";
const HEALTH_WORKERS: &str = "/profesionales-de-salud";
const CLINICAL_DOCUMENTS: &str = "/profesionales-de-salud/documentos-clinicos";
const CLINIC_ADMINS: &str = "/administradores";
const CONFIGURATION: &str = "/configuracion";

impl AppPath {
    /// Every variant without a dynamic segment, in declaration order.
    pub const STATIC: [AppPath; 8] = [
        AppPath::SignIn,
        AppPath::SignUp,
        AppPath::Dashboard,
        AppPath::HealthUsers,
        AppPath::HealthWorkers,
        AppPath::ClinicalDocuments,
        AppPath::ClinicAdmins,
        AppPath::Configuration,
    ];

    pub fn category(&self) -> PathCategory {
        match self {
            AppPath::SignIn | AppPath::SignUp => PathCategory::Public,
            AppPath::Dashboard
            | AppPath::HealthUsers
            | AppPath::HealthWorkers
            | AppPath::ClinicalDocuments
            | AppPath::ClinicAdmins => PathCategory::Authenticated,
            AppPath::Configuration => PathCategory::Admin,
            AppPath::ClinicalHistory { .. } => PathCategory::HealthWorker,
        }
    }

    /// The landing page used when a clinic administrator asks for a page
    /// outside their role.
    pub fn admin_landing() -> AppPath {
        AppPath::Configuration
    }

    pub fn clinical_history(ci: impl Into<String>) -> AppPath {
        AppPath::ClinicalHistory { ci: ci.into() }
    }

    /// parse
    ///
    /// Maps a request path onto the enumeration. A trailing slash is ignored,
    /// and the patient segment of `/usuarios-de-salud/{ci}` must be a CI-shaped
    /// token (digits with at most one hyphen). Anything else is `None`.
    pub fn parse(raw: &str) -> Option<AppPath> {
        let path = normalize(raw)?;

        let known = match path {
            SIGN_IN => Some(AppPath::SignIn),
            SIGN_UP => Some(AppPath::SignUp),
            DASHBOARD => Some(AppPath::Dashboard),
            HEALTH_USERS => Some(AppPath::HealthUsers),
            HEALTH_WORKERS => Some(AppPath::HealthWorkers),
            CLINICAL_DOCUMENTS => Some(AppPath::ClinicalDocuments),
            CLINIC_ADMINS => Some(AppPath::ClinicAdmins),
            CONFIGURATION => Some(AppPath::Configuration),
            _ => None,
        };
        if known.is_some() {
            return known;
        }

        let ci = path
            .strip_prefix(HEALTH_USERS)
            .and_then(|rest| rest.strip_prefix('/'))?;
        is_ci_segment(ci).then(|| AppPath::clinical_history(ci))
    }

    pub fn as_path(&self) -> String {
        match self {
            AppPath::SignIn => SIGN_IN.to_string(),
            AppPath::SignUp => SIGN_UP.to_string(),
            AppPath::Dashboard => DASHBOARD.to_string(),
            AppPath::HealthUsers => HEALTH_USERS.to_string(),
            AppPath::HealthWorkers => HEALTH_WORKERS.to_string(),
            AppPath::ClinicalDocuments => CLINICAL_DOCUMENTS.to_string(),
            AppPath::ClinicAdmins => CLINIC_ADMINS.to_string(),
            AppPath::Configuration => CONFIGURATION.to_string(),
            AppPath::ClinicalHistory { ci } => format!("{HEALTH_USERS}/{ci}"),
        }
    }
}

impl fmt::Display for AppPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_path())
    }
}

fn normalize(raw: &str) -> Option<&str> {
    if !raw.starts_with('/') {
        return None;
    }
    match raw.strip_suffix('/') {
        Some("") | None => Some(raw),
        Some(trimmed) if trimmed.ends_with('/') => None,
        Some(trimmed) => Some(trimmed),
    }
}

fn is_ci_segment(segment: &str) -> bool {
    let digits = segment.chars().filter(char::is_ascii_digit).count();
    let hyphens = segment.chars().filter(|c| *c == '-').count();
    digits > 0
        && hyphens <= 1
        && digits + hyphens == segment.len()
        && !segment.starts_with('-')
        && !segment.ends_with('-')
}

/// Classifies a raw request path; `None` for paths outside the enumeration.
pub fn classify(path: &str) -> Option<PathCategory> {
    AppPath::parse(path).map(|p| p.category())
}

pub fn is_public_path(path: &str) -> bool {
    classify(path) == Some(PathCategory::Public)
}

pub fn is_admin_path(path: &str) -> bool {
    classify(path) == Some(PathCategory::Admin)
}

pub fn is_authenticated_path(path: &str) -> bool {
    classify(path) == Some(PathCategory::Authenticated)
}

pub fn is_health_worker_path(path: &str) -> bool {
    classify(path) == Some(PathCategory::HealthWorker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_paths() -> Vec<AppPath> {
        let mut all = AppPath::STATIC.to_vec();
        all.push(AppPath::clinical_history("12345678"));
        all.push(AppPath::clinical_history("1234567-2"));
        all
    }

    #[test]
    fn every_path_round_trips_through_its_string_form() {
        for path in sample_paths() {
            assert_eq!(AppPath::parse(&path.as_path()), Some(path.clone()), "{path}");
        }
    }

    #[test]
    fn exclusive_categories_never_overlap() {
        for path in sample_paths() {
            let raw = path.as_path();
            let hits = [
                is_public_path(&raw),
                is_admin_path(&raw),
                is_health_worker_path(&raw),
            ]
            .iter()
            .filter(|hit| **hit)
            .count();
            assert!(hits <= 1, "{raw} is in more than one exclusive category");
        }
    }

    #[test]
    fn every_path_has_exactly_one_predicate() {
        for path in sample_paths() {
            let raw = path.as_path();
            let hits = [
                is_public_path(&raw),
                is_admin_path(&raw),
                is_authenticated_path(&raw),
                is_health_worker_path(&raw),
            ]
            .iter()
            .filter(|hit| **hit)
            .count();
            assert_eq!(hits, 1, "{raw}");
        }
    }

    #[test]
    fn unknown_paths_fail_every_predicate() {
        for raw in [
            "/admin",
            "/admin/configuracion",
            "/usuarios-de-salud/abc",
            "/usuarios-de-salud/12-34-56",
            "/usuarios-de-salud/123/extra",
            "sign-in",
            "",
            "//",
        ] {
            assert_eq!(classify(raw), None, "{raw:?}");
            assert!(!is_public_path(raw));
            assert!(!is_admin_path(raw));
            assert!(!is_authenticated_path(raw));
            assert!(!is_health_worker_path(raw));
        }
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert_eq!(AppPath::parse("/configuracion/"), Some(AppPath::Configuration));
        assert_eq!(AppPath::parse("/"), Some(AppPath::Dashboard));
        assert_eq!(AppPath::parse("/usuarios-de-salud/"), Some(AppPath::HealthUsers));
        assert_eq!(
            AppPath::parse("/usuarios-de-salud/12345678/"),
            Some(AppPath::clinical_history("12345678"))
        );
    }

    #[test]
    fn categories_match_the_route_table() {
        assert!(is_public_path("/sign-in"));
        assert!(is_public_path("/sign-up"));
        assert!(is_authenticated_path("/"));
        assert!(is_authenticated_path("/administradores"));
        assert!(is_authenticated_path("/profesionales-de-salud/documentos-clinicos"));
        assert!(is_admin_path("/configuracion"));
        assert!(is_health_worker_path("/usuarios-de-salud/12345678"));
        assert!(!is_health_worker_path("/usuarios-de-salud"));
    }
}
