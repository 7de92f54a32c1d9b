use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::Role;

/// Discriminator for everything the codec can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Csrf,
    OneLogin,
    Donor,
    CertificateProvider,
    Attorney,
    ShareCode,
    Yoti,
}

impl SessionKind {
    pub const ALL: [SessionKind; 7] = [
        SessionKind::Csrf,
        SessionKind::OneLogin,
        SessionKind::Donor,
        SessionKind::CertificateProvider,
        SessionKind::Attorney,
        SessionKind::ShareCode,
        SessionKind::Yoti,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Csrf => "csrf",
            SessionKind::OneLogin => "one-login",
            SessionKind::Donor => "donor",
            SessionKind::CertificateProvider => "certificate-provider",
            SessionKind::Attorney => "attorney",
            SessionKind::ShareCode => "share-code",
            SessionKind::Yoti => "yoti",
        }
    }

    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Donor => SessionKind::Donor,
            Role::CertificateProvider => SessionKind::CertificateProvider,
            Role::Attorney => SessionKind::Attorney,
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfSession {
    pub token: String,
}

/// Correlates an outbound authorization redirect with its callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlightLoginSession {
    pub state: String,
    pub nonce: String,
    pub locale: String,
    pub role: Role,
    #[serde(default)]
    pub case_id: String,
    #[serde(default)]
    pub session_id: String,
    /// Whether the identity-verification scope was requested.
    #[serde(default)]
    pub identity: bool,
}

/// Fields shared by every role's post-login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedSession {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub case_id: String,
    #[serde(default)]
    pub session_id: String,
    /// Only used as the `id_token_hint` at sign-out.
    #[serde(default)]
    pub id_token: String,
}

impl AuthenticatedSession {
    pub fn into_role_value(self, role: Role) -> SessionValue {
        match role {
            Role::Donor => SessionValue::Donor(DonorSession(self)),
            Role::CertificateProvider => {
                SessionValue::CertificateProvider(CertificateProviderSession(self))
            }
            Role::Attorney => SessionValue::Attorney(AttorneySession(self)),
        }
    }
}

/// Case access granted by a validated share code, before the actor has
/// signed in. Written only by the share-code check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareCodeSession {
    pub role: Role,
    pub case_id: String,
    pub session_id: String,
}

/// Ties a vendor identity check to the case and language it started from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YotiSession {
    pub locale: String,
    pub case_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorSession(pub AuthenticatedSession);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateProviderSession(pub AuthenticatedSession);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttorneySession(pub AuthenticatedSession);

/// The closed set of values that can live in a cookie scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum SessionValue {
    Csrf(CsrfSession),
    OneLogin(InFlightLoginSession),
    Donor(DonorSession),
    CertificateProvider(CertificateProviderSession),
    Attorney(AttorneySession),
    ShareCode(ShareCodeSession),
    Yoti(YotiSession),
}

impl SessionValue {
    pub fn kind(&self) -> SessionKind {
        match self {
            SessionValue::Csrf(_) => SessionKind::Csrf,
            SessionValue::OneLogin(_) => SessionKind::OneLogin,
            SessionValue::Donor(_) => SessionKind::Donor,
            SessionValue::CertificateProvider(_) => SessionKind::CertificateProvider,
            SessionValue::Attorney(_) => SessionKind::Attorney,
            SessionValue::ShareCode(_) => SessionKind::ShareCode,
            SessionValue::Yoti(_) => SessionKind::Yoti,
        }
    }

    /// The authenticated session behind a role variant, if this is one.
    pub fn authenticated(&self) -> Option<(Role, &AuthenticatedSession)> {
        match self {
            SessionValue::Donor(s) => Some((Role::Donor, &s.0)),
            SessionValue::CertificateProvider(s) => Some((Role::CertificateProvider, &s.0)),
            SessionValue::Attorney(s) => Some((Role::Attorney, &s.0)),
            _ => None,
        }
    }
}

/// A typed payload the codec can save and load.
pub trait SessionPayload: Sized {
    const KIND: SessionKind;

    fn into_value(self) -> SessionValue;

    /// `None` when the stored value is a different variant.
    fn from_value(value: SessionValue) -> Option<Self>;

    fn valid(&self) -> bool {
        true
    }
}

impl SessionPayload for CsrfSession {
    const KIND: SessionKind = SessionKind::Csrf;

    fn into_value(self) -> SessionValue {
        SessionValue::Csrf(self)
    }

    fn from_value(value: SessionValue) -> Option<Self> {
        match value {
            SessionValue::Csrf(s) => Some(s),
            _ => None,
        }
    }

    fn valid(&self) -> bool {
        !self.token.is_empty()
    }
}

impl SessionPayload for InFlightLoginSession {
    const KIND: SessionKind = SessionKind::OneLogin;

    fn into_value(self) -> SessionValue {
        SessionValue::OneLogin(self)
    }

    fn from_value(value: SessionValue) -> Option<Self> {
        match value {
            SessionValue::OneLogin(s) => Some(s),
            _ => None,
        }
    }

    // The nonce is checked separately: its absence is a configuration fault,
    // not a user-recoverable one.
    fn valid(&self) -> bool {
        if self.state.is_empty() {
            return false;
        }
        match self.role {
            Role::CertificateProvider => !self.case_id.is_empty() && !self.session_id.is_empty(),
            _ => true,
        }
    }
}

impl SessionPayload for DonorSession {
    const KIND: SessionKind = SessionKind::Donor;

    fn into_value(self) -> SessionValue {
        SessionValue::Donor(self)
    }

    fn from_value(value: SessionValue) -> Option<Self> {
        match value {
            SessionValue::Donor(s) => Some(s),
            _ => None,
        }
    }

    fn valid(&self) -> bool {
        !self.0.sub.is_empty()
    }
}

impl SessionPayload for CertificateProviderSession {
    const KIND: SessionKind = SessionKind::CertificateProvider;

    fn into_value(self) -> SessionValue {
        SessionValue::CertificateProvider(self)
    }

    fn from_value(value: SessionValue) -> Option<Self> {
        match value {
            SessionValue::CertificateProvider(s) => Some(s),
            _ => None,
        }
    }

    fn valid(&self) -> bool {
        !self.0.sub.is_empty() && !self.0.case_id.is_empty()
    }
}

impl SessionPayload for AttorneySession {
    const KIND: SessionKind = SessionKind::Attorney;

    fn into_value(self) -> SessionValue {
        SessionValue::Attorney(self)
    }

    fn from_value(value: SessionValue) -> Option<Self> {
        match value {
            SessionValue::Attorney(s) => Some(s),
            _ => None,
        }
    }

    fn valid(&self) -> bool {
        !self.0.sub.is_empty()
    }
}

impl SessionPayload for ShareCodeSession {
    const KIND: SessionKind = SessionKind::ShareCode;

    fn into_value(self) -> SessionValue {
        SessionValue::ShareCode(self)
    }

    fn from_value(value: SessionValue) -> Option<Self> {
        match value {
            SessionValue::ShareCode(s) => Some(s),
            _ => None,
        }
    }

    fn valid(&self) -> bool {
        !self.case_id.is_empty() && !self.session_id.is_empty()
    }
}

impl SessionPayload for YotiSession {
    const KIND: SessionKind = SessionKind::Yoti;

    fn into_value(self) -> SessionValue {
        SessionValue::Yoti(self)
    }

    fn from_value(value: SessionValue) -> Option<Self> {
        match value {
            SessionValue::Yoti(s) => Some(s),
            _ => None,
        }
    }

    fn valid(&self) -> bool {
        !self.case_id.is_empty()
    }
}
