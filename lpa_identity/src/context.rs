//! Per-request identity snapshot and the role/locale types it is built from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The actor a login or session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Donor,
    CertificateProvider,
    Attorney,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Donor, Role::CertificateProvider, Role::Attorney];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Donor => "donor",
            Role::CertificateProvider => "certificate-provider",
            Role::Attorney => "attorney",
        }
    }

    /// Whether logging in as this role also asks the provider for a verified identity.
    pub fn wants_identity(&self) -> bool {
        match self {
            Role::Donor | Role::CertificateProvider => true,
            Role::Attorney => false,
        }
    }

    pub fn login_path(&self) -> String {
        format!("/login/{}", self.as_str())
    }

    pub fn callback_path(&self) -> String {
        format!("/login/{}/callback", self.as_str())
    }

    /// Entry point of the document-check alternative to the provider.
    pub fn vendor_path(&self) -> String {
        format!("/identity-with-yoti/{}", self.as_str())
    }

    pub fn vendor_callback_path(&self) -> String {
        format!("/identity-with-yoti/{}/callback", self.as_str())
    }

    /// Landing page of the role's journey, also used after sign-out.
    pub fn start_path(&self) -> &'static str {
        match self {
            Role::Donor => "/start",
            Role::CertificateProvider => "/certificate-provider-start",
            Role::Attorney => "/attorney-start",
        }
    }

    /// Where the wizard continues once identity (or login, for attorneys) is done.
    pub fn forward_path(&self, case_id: Option<&str>) -> String {
        match (self, case_id) {
            (Role::Donor, Some(id)) => format!("/lpa/{id}/read-your-lpa"),
            (Role::CertificateProvider, Some(id)) => {
                format!("/certificate-provider/{id}/read-the-lpa")
            }
            (Role::Attorney, Some(id)) => format!("/attorney/{id}/read-the-lpa"),
            (Role::Donor, None) => "/dashboard".to_string(),
            (Role::Attorney, None) => "/attorney/enter-reference-number".to_string(),
            (Role::CertificateProvider, None) => self.start_path().to_string(),
        }
    }

    /// Where to send someone whose identity could not be confirmed.
    pub fn restart_path(&self, case_id: Option<&str>) -> String {
        match (self, case_id) {
            (Role::Donor, Some(id)) => format!("/lpa/{id}/select-your-identity-options"),
            (Role::CertificateProvider, Some(id)) => {
                format!("/certificate-provider/{id}/select-your-identity-options")
            }
            _ => self.start_path().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "donor" => Ok(Role::Donor),
            "certificate-provider" => Ok(Role::CertificateProvider),
            "attorney" => Ok(Role::Attorney),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Cy,
}

impl Lang {
    const WELSH_PREFIX: &'static str = "/cy";

    /// Requests under `/cy` are served in Welsh.
    pub fn from_path(path: &str) -> Self {
        match path.strip_prefix(Self::WELSH_PREFIX) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => Lang::Cy,
            _ => Lang::En,
        }
    }

    pub fn from_locale(locale: &str) -> Self {
        if locale.eq_ignore_ascii_case("cy") {
            Lang::Cy
        } else {
            Lang::En
        }
    }

    pub fn locale(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Cy => "cy",
        }
    }

    /// Prefixes an absolute path so the next page keeps the current language.
    pub fn url(&self, path: &str) -> String {
        match self {
            Lang::En => path.to_string(),
            Lang::Cy => format!("{}{path}", Self::WELSH_PREFIX),
        }
    }
}

/// Immutable snapshot of who is making the request.
///
/// Built once by the CSRF guard after session resolution. Handlers that need
/// a different value take a modified copy with one of the `with_*` methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppContext {
    pub role: Option<Role>,
    pub case_id: Option<String>,
    pub session_id: Option<String>,
    pub lang: Lang,
    pub csrf_token: String,
}

impl AppContext {
    pub fn with_role(&self, role: Role) -> Self {
        Self {
            role: Some(role),
            ..self.clone()
        }
    }

    pub fn with_case_id(&self, case_id: impl Into<String>) -> Self {
        Self {
            case_id: Some(case_id.into()),
            ..self.clone()
        }
    }

    pub fn with_session_id(&self, session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..self.clone()
        }
    }

    pub fn with_lang(&self, lang: Lang) -> Self {
        Self {
            lang,
            ..self.clone()
        }
    }

    pub fn with_csrf_token(&self, token: impl Into<String>) -> Self {
        Self {
            csrf_token: token.into(),
            ..self.clone()
        }
    }
}
