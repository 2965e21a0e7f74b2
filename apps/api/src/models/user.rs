use serde::{Deserialize, Serialize};

/// Profile supplied by the host platform. Used only to prefill a brand-new document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub avatar_uri: String,
}
