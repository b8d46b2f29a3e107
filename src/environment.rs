use http::Uri;

// Known endpoints. A custom endpoint can be provided for testing or regional deployments.
const APS_TOKEN_ENDPOINT_STR: &str = "https://developer.api.autodesk.com/authentication/v2/token";

/// Scopes requested with every client-credentials grant unless configured otherwise.
pub const DEFAULT_SCOPE: &str = "data:read data:write";

/// Represents the identity provider instance tokens are requested from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ApsEnvironment {
    #[default]
    Production,
    Custom {
        token_endpoint: Uri,
    },
}

impl TryFrom<&str> for ApsEnvironment {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let token_endpoint = value
            .parse::<Uri>()
            .map_err(|e| format!("Invalid token endpoint `{value}`: {e}"))?;
        match token_endpoint.scheme_str() {
            Some("http") | Some("https") => Ok(Self::Custom { token_endpoint }),
            _ => Err(format!(
                "Invalid token endpoint `{value}`: expected an absolute http(s) url"
            )),
        }
    }
}

impl ApsEnvironment {
    /// Get the URI for the client-credentials token endpoint for the current environment.
    pub fn token_endpoint(&self) -> Uri {
        match self {
            Self::Production => Uri::from_static(APS_TOKEN_ENDPOINT_STR),
            Self::Custom { token_endpoint } => token_endpoint.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_endpoint() {
        assert_eq!(
            ApsEnvironment::Production.token_endpoint(),
            "https://developer.api.autodesk.com/authentication/v2/token"
        );
    }

    #[test]
    fn custom_endpoint() {
        let environment = ApsEnvironment::try_from("http://127.0.0.1:8080/token").unwrap();
        assert_eq!(environment.token_endpoint(), "http://127.0.0.1:8080/token");
    }

    #[test]
    fn relative_endpoint_is_rejected() {
        assert!(ApsEnvironment::try_from("/token").is_err());
        assert!(ApsEnvironment::try_from("not a url").is_err());
    }
}
