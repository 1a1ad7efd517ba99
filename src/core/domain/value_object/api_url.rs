use crate::core::domain::error::ValidationError;
use url::Url;

const ALLOWED_SCHEMES: &[&str] = &["http", "https"];
const MAX_URL_LENGTH: usize = 2083;

/// A validated base URL of the run control management API.
///
/// The stored URL always ends with a `/` so that endpoint paths can be
/// appended without producing double or missing separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrl(Url);

impl ApiUrl {
    /// Parses and validates a base URL.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        validate_api_url(raw)?;
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{}/", raw)
        };
        Url::parse(&normalized)
            .map(Self)
            .map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))
    }

    /// Creates a new URL without validation.
    #[cfg(test)]
    pub(crate) fn new_unchecked(raw: &str) -> Self {
        Self(Url::parse(raw).unwrap())
    }

    /// Joins an endpoint path onto the base URL.
    ///
    /// The path is appended verbatim so that toggle paths, which carry
    /// their own slashes, are kept intact.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    /// Returns the host portion of the URL.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Validates a management API base URL.
pub(crate) fn validate_api_url(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::Field {
            field: "api_url".to_string(),
            message: "URL cannot be empty".to_string(),
        });
    }

    if raw.len() > MAX_URL_LENGTH {
        return Err(ValidationError::Format(format!(
            "URL exceeds maximum length of {} characters",
            MAX_URL_LENGTH
        )));
    }

    let parsed =
        Url::parse(raw).map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))?;

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return Err(ValidationError::ConstraintViolation(format!(
            "Invalid scheme. Must be one of: {}",
            ALLOWED_SCHEMES.join(", ")
        )));
    }

    if parsed.host_str().is_none() {
        return Err(ValidationError::Field {
            field: "api_url".to_string(),
            message: "URL must name a host".to_string(),
        });
    }

    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ValidationError::ConstraintViolation(
            "Base URL cannot carry a query or fragment".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_api_url("http://srv-s2d16-22-01.cms/runcontrol/api/").is_ok());
        assert!(validate_api_url("https://localhost:8080/api").is_ok());
    }

    #[test]
    fn test_invalid_urls() {
        let test_cases = vec![
            ("", "empty url"),
            ("not a url", "no scheme"),
            ("ftp://host/api/", "wrong scheme"),
            ("http://host/api/?x=1", "query string"),
            ("http://host/api/#top", "fragment"),
        ];

        for (url, case) in test_cases {
            assert!(
                validate_api_url(url).is_err(),
                "Case '{}' should fail validation: {}",
                case,
                url
            );
        }
    }

    #[test]
    fn test_trailing_slash_is_added() {
        let url = ApiUrl::new("http://srv-s2d16-22-01.cms/runcontrol/api").unwrap();
        assert_eq!(url.as_str(), "http://srv-s2d16-22-01.cms/runcontrol/api/");
    }

    #[test]
    fn test_endpoint_composition() {
        let url = ApiUrl::new("http://srv-s2d16-22-01.cms/runcontrol/api/").unwrap();
        assert_eq!(
            url.endpoint("running/lumipro"),
            "http://srv-s2d16-22-01.cms/runcontrol/api/running/lumipro"
        );
        assert_eq!(
            url.endpoint("send/TurnOFF/lumipro/dip/global/X"),
            "http://srv-s2d16-22-01.cms/runcontrol/api/send/TurnOFF/lumipro/dip/global/X"
        );
        assert_eq!(url.host(), Some("srv-s2d16-22-01.cms"));
    }
}
