//! Patron account credentials

use serde::{Deserialize, Serialize};

/// DRM vendor and device identifiers attached to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrmIdentity {
    pub vendor_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Credentials for the signed-in patron
///
/// Requests authenticate with the bearer `token` when one is present and
/// fall back to HTTP basic auth with `barcode`/`pin` otherwise.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCredentials {
    pub barcode: String,
    pub pin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drm: Option<DrmIdentity>,
}

impl AccountCredentials {
    /// Creates barcode/PIN credentials
    pub fn new(barcode: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            pin: pin.into(),
            token: None,
            drm: None,
        }
    }

    /// Attaches a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attaches DRM identifiers
    pub fn with_drm(mut self, drm: DrmIdentity) -> Self {
        self.drm = Some(drm);
        self
    }
}

// PINs and tokens never reach log output.
impl std::fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("barcode", &self.barcode)
            .field("pin", &"***")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("drm", &self.drm)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = AccountCredentials::new("23333000000001", "9999").with_token("secret-token");
        let debug = format!("{:?}", creds);

        assert!(debug.contains("23333000000001"));
        assert!(!debug.contains("9999"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn test_json_omits_missing_token() {
        let creds = AccountCredentials::new("a", "b");
        let json = serde_json::to_value(&creds).unwrap();
        assert!(json.get("token").is_none());
    }
}
