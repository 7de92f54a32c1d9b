use chrono::{DateTime, Utc};
use http::HeaderMap;
use serde::Deserialize;

/// Query string of `/login/{role}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "lpaId")]
    pub lpa_id: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Parameters the provider appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// What the callback decided. Rendering is left to the web layer.
#[derive(Debug, Clone)]
pub enum CallbackOutcome {
    /// Identity confirmed, now or on an earlier visit.
    Confirmed {
        full_name: String,
        confirmed_at: DateTime<Utc>,
        headers: HeaderMap,
    },
    /// The provider could not confirm who the user is. Nothing was written.
    CouldNotConfirm { restart_path: String },
    Redirect { location: String, headers: HeaderMap },
}

/// Query string the document-check vendor returns with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorCallbackQuery {
    pub token: Option<String>,
}

/// How a document check begins.
#[derive(Debug, Clone)]
pub enum VendorStart {
    /// Straight to the callback: already confirmed, or no vendor widget to show.
    Redirect { location: String, headers: HeaderMap },
    /// Show the vendor's widget, which returns to `callback_url` with a token.
    Widget {
        sdk_id: String,
        scenario_id: String,
        callback_url: String,
        headers: HeaderMap,
    },
}
