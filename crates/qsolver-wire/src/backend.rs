//! Request/response surface of the backend process

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Calls the overlay makes into the backend.
///
/// The backend owns persistence, model access and the save dialog; everything
/// here is request/response. Implementations translate the backend's
/// "empty string means success" convention with [`error_string_to_result`].
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the persisted settings
    async fn get_settings(&self) -> Result<Settings>;

    /// Persist settings given as camelCase JSON
    async fn sync_settings(&self, json: &str) -> Result<()>;

    /// List model identifiers available for a key and endpoint
    async fn get_models(&self, api_key: &str, base_url: &str) -> Result<Vec<String>>;

    /// Check that a key, endpoint and model can answer a request
    async fn test_connection(&self, api_key: &str, base_url: &str, model: &str) -> Result<()>;

    /// Save a `data:image/png;base64,` image.
    ///
    /// Returns `Ok(false)` when the user cancelled the save dialog.
    async fn save_image(&self, data_url: &str) -> Result<bool>;
}

/// Convert the backend's error-string convention into a `Result`
pub fn error_string_to_result(message: impl Into<String>) -> Result<()> {
    let message = message.into();
    if message.is_empty() {
        Ok(())
    } else {
        Err(Error::Backend(message))
    }
}

/// Decode a data URL (or bare base64) into raw bytes
pub fn decode_data_url(data: &str) -> Result<Vec<u8>> {
    let payload = match data.strip_prefix("data:") {
        Some(rest) => match rest.find(";base64,") {
            Some(idx) => &rest[idx + ";base64,".len()..],
            None => return Err(Error::Backend("data URL is not base64 encoded".into())),
        },
        None => data,
    };
    Ok(STANDARD.decode(payload.trim())?)
}

/// Encode PNG bytes as a data URL
pub fn encode_png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_string_convention() {
        assert!(error_string_to_result("").is_ok());
        let err = error_string_to_result("disk full").unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_decode_data_url_prefix() {
        let url = encode_png_data_url(b"\x89PNG");
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_url(&url).unwrap(), b"\x89PNG");
    }

    #[test]
    fn test_decode_bare_base64() {
        assert_eq!(decode_data_url("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_rejects_non_base64_data_url() {
        assert!(decode_data_url("data:text/plain,hello").is_err());
        assert!(matches!(
            decode_data_url("data:image/png;base64,@@@"),
            Err(Error::Base64(_))
        ));
    }
}
