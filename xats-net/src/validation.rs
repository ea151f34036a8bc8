// xats-net/src/validation.rs
use tracing::debug;
use url::Url;
use xats_common::error::{Result, XatsError};
use xats_common::integrity::verify_integrity;
use xats_common::model::ResolvedReference;

/// Validates a URL, ensuring it uses the HTTPS scheme.
pub fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| XatsError::ValidationError(format!("Failed to parse URL '{url_str}': {e}")))?;
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(XatsError::ValidationError(format!(
            "Invalid URL scheme for '{}': Must be https, but got '{}'",
            url_str,
            url.scheme()
        )))
    }
}

/// Checks fetched bytes against the size and integrity the registry declared.
pub fn verify_fetched(resolved: &ResolvedReference, bytes: &[u8]) -> Result<()> {
    let subject = resolved.reference.to_string();
    let expected_size = resolved.size();
    if bytes.len() as u64 != expected_size {
        return Err(XatsError::IntegrityMismatch(
            subject,
            format!("expected {expected_size} bytes, got {}", bytes.len()),
        ));
    }
    verify_integrity(&subject, resolved.expected_integrity(), bytes)?;
    debug!("Integrity verified for {}", subject);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_https_is_accepted() {
        assert!(validate_url("https://registry.example.org/pkg").is_ok());
        assert!(validate_url("http://registry.example.org/pkg").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
