use crate::domain::DomainError;

/// Argument checks shared by connectors. Every failure is `InvalidInput`
/// naming the offending argument.
pub struct Verify;

impl Verify {
    pub fn not_empty(value: &str, name: &str) -> Result<(), DomainError> {
        if value.trim().is_empty() {
            return Err(DomainError::invalid_input(format!("{name} must not be empty")));
        }
        Ok(())
    }

    pub fn not_null<T>(value: Option<T>, name: &str) -> Result<T, DomainError> {
        value.ok_or_else(|| DomainError::invalid_input(format!("{name} must be provided")))
    }

    /// Parse `value` as a URL. With `require_https`, plain http is only
    /// accepted for loopback hosts.
    pub fn valid_url(
        value: &str,
        name: &str,
        require_https: bool,
    ) -> Result<reqwest::Url, DomainError> {
        Self::not_empty(value, name)?;
        let parsed = reqwest::Url::parse(value)
            .map_err(|e| DomainError::invalid_input(format!("{name} is not a valid URL: {e}")))?;

        match parsed.scheme() {
            "https" => {}
            "http" => {
                let local = matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1"));
                if require_https && !local {
                    return Err(DomainError::invalid_input(format!(
                        "{name} must use https: {value}"
                    )));
                }
            }
            other => {
                return Err(DomainError::invalid_input(format!(
                    "{name} has unsupported scheme {other}"
                )))
            }
        }
        Ok(parsed)
    }

    pub fn in_range<T>(value: T, min: T, max: T, name: &str) -> Result<(), DomainError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if !(min..=max).contains(&value) {
            return Err(DomainError::invalid_input(format!(
                "{name} must be between {min} and {max}, got {value}"
            )));
        }
        Ok(())
    }

    pub fn valid_qdrant_collection_name(name: &str) -> Result<(), DomainError> {
        if name.is_empty() || name.chars().count() > 255 {
            return Err(DomainError::invalid_input(
                "collection name must be between 1 and 255 characters",
            ));
        }
        if name.trim() != name {
            return Err(DomainError::invalid_input(format!(
                "collection name '{name}' must not start or end with whitespace"
            )));
        }
        if name.contains(['/', '\\', '\0']) {
            return Err(DomainError::invalid_input(format!(
                "collection name '{name}' contains an invalid character"
            )));
        }
        Ok(())
    }

    /// Weaviate class names: an uppercase letter followed by `[_0-9A-Za-z]*`.
    pub fn valid_weaviate_class_name(name: &str) -> Result<(), DomainError> {
        let mut chars = name.chars();
        let first_ok = chars.next().is_some_and(|c| c.is_ascii_uppercase());
        let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !first_ok || !rest_ok {
            return Err(DomainError::invalid_input(format!(
                "'{name}' is not a valid Weaviate class name"
            )));
        }
        Ok(())
    }
}
