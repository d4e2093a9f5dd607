use super::AuthorizationError;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per (address, parcel) authorization as reported by the land registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessData {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(alias = "isUpdateAuthorized")]
    pub has_access: bool,
}

#[async_trait]
pub trait LandRegistry: Send + Sync {
    async fn get_parcel_access_data(
        &self,
        address: &str,
        x: i32,
        y: i32,
    ) -> Result<AccessData, AuthorizationError>;
}

#[derive(Debug, Deserialize)]
struct RegistryEnvelope {
    ok: bool,
    data: Option<AccessData>,
    error: Option<String>,
}

/// HTTP client for the land registry API
#[derive(Debug, Clone)]
pub struct HttpLandRegistry {
    client: Client,
    base_url: String,
}

impl HttpLandRegistry {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AuthorizationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthorizationError::Registry(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn access_url(&self, address: &str, x: i32, y: i32) -> String {
        format!(
            "{}/parcels/{}/{}/{}/authorizations",
            self.base_url.trim_end_matches('/'),
            x,
            y,
            address
        )
    }
}

#[async_trait]
impl LandRegistry for HttpLandRegistry {
    async fn get_parcel_access_data(
        &self,
        address: &str,
        x: i32,
        y: i32,
    ) -> Result<AccessData, AuthorizationError> {
        let url = self.access_url(address, x, y);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthorizationError::Registry(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthorizationError::Registry(format!("{} returned {}", url, status)));
        }

        let envelope: RegistryEnvelope = response
            .json()
            .await
            .map_err(|e| AuthorizationError::Registry(format!("invalid response from {}: {}", url, e)))?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope(envelope: RegistryEnvelope) -> Result<AccessData, AuthorizationError> {
    if !envelope.ok {
        return Err(AuthorizationError::Registry(
            envelope.error.unwrap_or_else(|| "registry reported failure".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| AuthorizationError::Registry("missing access data".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_url() {
        let registry = HttpLandRegistry::new("https://registry.example/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            registry.access_url("0xabc", -3, 4),
            "https://registry.example/v1/parcels/-3/4/0xabc/authorizations"
        );
    }

    #[test]
    fn test_envelope_decoding() {
        let envelope: RegistryEnvelope = serde_json::from_str(
            r#"{"ok":true,"data":{"address":"0xabc","x":1,"y":2,"isUpdateAuthorized":true}}"#,
        )
        .unwrap();
        let access = unwrap_envelope(envelope).unwrap();
        assert!(access.has_access);
        assert_eq!((access.x, access.y), (1, 2));

        let envelope: RegistryEnvelope =
            serde_json::from_str(r#"{"ok":true,"data":{"hasAccess":false}}"#).unwrap();
        assert!(!unwrap_envelope(envelope).unwrap().has_access);
    }

    #[test]
    fn test_envelope_failure() {
        let envelope: RegistryEnvelope =
            serde_json::from_str(r#"{"ok":false,"error":"parcel not found"}"#).unwrap();
        assert!(matches!(unwrap_envelope(envelope), Err(AuthorizationError::Registry(m)) if m == "parcel not found"));
    }
}
