use crate::core::domain::error::ValidationError;

/// A systemd unit qualified with its target host, `unit@host.domain`.
///
/// Only string decomposition is performed; neither the unit nor the host
/// is checked for existence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceDescriptor {
    raw: String,
    host: String,
}

impl ServiceDescriptor {
    /// Parses a descriptor, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::Field {
                field: "service".to_string(),
                message: "Service cannot be empty".to_string(),
            });
        }
        let host = get_host(raw)?.to_string();
        Ok(Self {
            raw: raw.to_string(),
            host,
        })
    }

    /// The short host name the unit runs on.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The full descriptor, as handed to `systemctl`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Extracts the short host name from `unit@host.domain`.
pub fn get_host(service: &str) -> Result<&str, ValidationError> {
    let (unit, rest) = service.split_once('@').ok_or_else(|| {
        ValidationError::Format(format!("Service '{}' has no '@host' part", service))
    })?;
    if unit.is_empty() {
        return Err(ValidationError::Format(format!(
            "Service '{}' has no unit name",
            service
        )));
    }
    let host = rest.split('.').next().unwrap_or_default();
    if host.is_empty() {
        return Err(ValidationError::Field {
            field: "host".to_string(),
            message: format!("Service '{}' names an empty host", service),
        });
    }
    Ok(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_host() {
        assert_eq!(
            get_host("bril.central@srv-s2d16-18-01.service").unwrap(),
            "srv-s2d16-18-01"
        );
        assert_eq!(get_host("unit@host").unwrap(), "host");
    }

    #[test]
    fn test_invalid_descriptors() {
        let test_cases = vec![
            ("bril.central.service", "missing @"),
            ("@srv-s2d16-18-01.service", "missing unit"),
            ("bril.central@.service", "empty host"),
            ("   ", "blank"),
        ];

        for (service, case) in test_cases {
            assert!(
                ServiceDescriptor::parse(service).is_err(),
                "Case '{}' should fail validation: {}",
                case,
                service
            );
        }
    }

    #[test]
    fn test_parse_trims_line_endings() {
        let descriptor = ServiceDescriptor::parse("bril.central@srv-s2d16-27-01.service\n").unwrap();
        assert_eq!(descriptor.as_str(), "bril.central@srv-s2d16-27-01.service");
        assert_eq!(descriptor.host(), "srv-s2d16-27-01");
    }
}
