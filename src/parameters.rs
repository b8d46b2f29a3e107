use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use thiserror::Error;

use crate::credentials::ClientCredentials;
use crate::environment::{ApsEnvironment, DEFAULT_SCOPE};
use crate::http::config::{HttpConfig, ProxyConfig, ProxyError};
use crate::viewer::{DEFAULT_FACILITIES_BASE_URL, ViewerConfig};

pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("`{0}` must not be empty")]
    EmptyValue(&'static str),
    #[error("invalid token endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("invalid facilities base url `{0}`: expected an absolute http(s) url")]
    InvalidFacilitiesUrl(String),
    #[error("proxy configuration: {0}")]
    Proxy(#[from] ProxyError),
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs the token proxy together with the health check and the viewer page.
    Serve {
        #[command(flatten)]
        server: ServerArgs,

        #[command(flatten)]
        credentials: CredentialArgs,

        #[command(flatten)]
        upstream: UpstreamArgs,

        #[command(flatten)]
        viewer: ViewerArgs,
    },
    /// Retrieve a token once, useful to check the configured credentials.
    RetrieveToken {
        #[command(flatten)]
        credentials: CredentialArgs,

        #[command(flatten)]
        upstream: UpstreamArgs,

        /// Select format how the Token should be obtained
        #[arg(long, required = true)]
        output_token_format: OutPutTokenFormat,
    },
}

#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutPutTokenFormat {
    /// Returns only the access token
    #[value(name = "Plain")]
    Plain,
    /// Returns the access token and its remaining lifetime in json format
    #[value(name = "Json")]
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Address the server listens on
    #[arg(long, env = "HOST", default_value_t = DEFAULT_HOST)]
    host: IpAddr,

    /// Port the server listens on
    #[arg(long, short, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
}

impl ServerArgs {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// ID of the APS application
    #[arg(long, env = "FORGE_CLIENT_ID", hide_env_values = true)]
    client_id: String,

    /// Secret of the APS application
    #[arg(long, env = "FORGE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,
}

#[derive(Args, Debug, Clone)]
pub struct UpstreamArgs {
    /// Overrides the APS client-credentials token endpoint
    #[arg(long, env = "APS_TOKEN_ENDPOINT")]
    token_endpoint: Option<String>,

    /// Space separated scopes requested with every token
    #[arg(long, env = "APS_SCOPE", default_value = DEFAULT_SCOPE)]
    scope: String,

    /// Proxy used to reach APS, HTTPS_PROXY or HTTP_PROXY apply when unset
    #[arg(long)]
    proxy_url: Option<String>,

    /// Timeout in seconds for requests to APS. No timeout when unset.
    #[arg(long, env = "APS_HTTP_TIMEOUT")]
    http_timeout: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ViewerArgs {
    /// Facility shown by the viewer page, `urn:adsk.dtt:<facilityId>`
    #[arg(long, env = "TANDEM_DEFAULT_FACILITY_URN")]
    default_facility_urn: Option<String>,

    /// Prefix of the direct Tandem facility pages
    #[arg(long, env = "TANDEM_FACILITIES_BASE_URL", default_value = DEFAULT_FACILITIES_BASE_URL)]
    facilities_base_url: String,
}

/// Everything needed to request tokens from APS.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub credentials: ClientCredentials,
    pub scope: String,
    pub environment: ApsEnvironment,
    pub http_config: HttpConfig,
}

#[derive(Debug, Clone)]
pub struct ServeSettings {
    pub listen_addr: SocketAddr,
    pub upstream: UpstreamSettings,
    pub viewer: ViewerConfig,
}

pub fn create_serve_settings(
    server: &ServerArgs,
    credentials: &CredentialArgs,
    upstream: &UpstreamArgs,
    viewer: ViewerArgs,
) -> Result<ServeSettings, ConfigError> {
    Ok(ServeSettings {
        listen_addr: server.socket_addr(),
        upstream: create_upstream_settings(credentials, upstream)?,
        viewer: build_viewer_config(viewer)?,
    })
}

pub fn create_upstream_settings(
    credentials: &CredentialArgs,
    upstream: &UpstreamArgs,
) -> Result<UpstreamSettings, ConfigError> {
    let scope = upstream.scope.trim();
    if scope.is_empty() {
        return Err(ConfigError::EmptyValue("APS_SCOPE"));
    }

    Ok(UpstreamSettings {
        credentials: build_credentials(credentials)?,
        scope: scope.to_string(),
        environment: select_environment(upstream.token_endpoint.as_deref())?,
        http_config: build_http_config(upstream)?,
    })
}

pub fn build_credentials(args: &CredentialArgs) -> Result<ClientCredentials, ConfigError> {
    if args.client_id.trim().is_empty() {
        return Err(ConfigError::EmptyValue("FORGE_CLIENT_ID"));
    }
    if args.client_secret.is_empty() {
        return Err(ConfigError::EmptyValue("FORGE_CLIENT_SECRET"));
    }

    Ok(ClientCredentials::new(
        args.client_id.trim().to_string(),
        args.client_secret.as_str().into(),
    ))
}

pub fn select_environment(token_endpoint: Option<&str>) -> Result<ApsEnvironment, ConfigError> {
    match token_endpoint.map(str::trim) {
        None | Some("") => Ok(ApsEnvironment::Production),
        Some(endpoint) => {
            ApsEnvironment::try_from(endpoint).map_err(ConfigError::InvalidEndpoint)
        }
    }
}

pub fn build_http_config(args: &UpstreamArgs) -> Result<HttpConfig, ConfigError> {
    let proxy = ProxyConfig::new(args.proxy_url.as_deref().unwrap_or_default())?
        .with_env_fallback()?;

    Ok(HttpConfig::new(
        args.http_timeout.map(Duration::from_secs),
        None,
        proxy,
    ))
}

pub fn build_viewer_config(args: ViewerArgs) -> Result<ViewerConfig, ConfigError> {
    let base = args.facilities_base_url.trim();
    if !(base.starts_with("https://") || base.starts_with("http://")) {
        return Err(ConfigError::InvalidFacilitiesUrl(args.facilities_base_url));
    }

    Ok(ViewerConfig {
        default_facility_urn: args
            .default_facility_urn
            .filter(|urn| !urn.trim().is_empty()),
        facilities_base_url: base.to_string(),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::Parser;

    use super::*;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    fn parse(args: &[&str]) -> Commands {
        TestCli::try_parse_from(args).unwrap().command
    }

    fn credential_args(client_id: &str, client_secret: &str) -> CredentialArgs {
        CredentialArgs {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn upstream_args() -> UpstreamArgs {
        UpstreamArgs {
            token_endpoint: None,
            scope: DEFAULT_SCOPE.into(),
            proxy_url: Some("http://proxy.local:3128".into()),
            http_timeout: None,
        }
    }

    #[test]
    fn serve_parses_explicit_arguments() {
        let command = parse(&[
            "cli",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--client-id",
            "id",
            "--client-secret",
            "secret",
            "--token-endpoint",
            "http://127.0.0.1:9000/token",
            "--default-facility-urn",
            "urn:adsk.dtt:abc123",
        ]);

        let Commands::Serve {
            server,
            credentials,
            upstream,
            viewer,
        } = command
        else {
            panic!("expected serve command");
        };
        assert_eq!(server.socket_addr(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(credentials.client_id, "id");
        assert_eq!(
            upstream.token_endpoint.as_deref(),
            Some("http://127.0.0.1:9000/token")
        );
        assert_eq!(
            viewer.default_facility_urn.as_deref(),
            Some("urn:adsk.dtt:abc123")
        );
    }

    #[test]
    fn serve_listens_on_port_3001_by_default() {
        let command = parse(&[
            "cli",
            "serve",
            "--client-id",
            "id",
            "--client-secret",
            "secret",
        ]);

        let Commands::Serve {
            server, upstream, ..
        } = command
        else {
            panic!("expected serve command");
        };
        assert_eq!(server.port, DEFAULT_PORT);
        assert_eq!(upstream.scope, "data:read data:write");
        assert_eq!(upstream.http_timeout, None);
    }

    #[test]
    fn retrieve_token_requires_output_format() {
        let result = TestCli::try_parse_from([
            "cli",
            "retrieve-token",
            "--client-id",
            "id",
            "--client-secret",
            "secret",
        ]);
        assert!(result.is_err());

        let command = parse(&[
            "cli",
            "retrieve-token",
            "--client-id",
            "id",
            "--client-secret",
            "secret",
            "--output-token-format",
            "Json",
        ]);
        assert_matches!(
            command,
            Commands::RetrieveToken {
                output_token_format: OutPutTokenFormat::Json,
                ..
            }
        );
    }

    #[test]
    fn empty_credentials_are_rejected() {
        assert_matches!(
            build_credentials(&credential_args("  ", "secret")),
            Err(ConfigError::EmptyValue("FORGE_CLIENT_ID"))
        );
        assert_matches!(
            build_credentials(&credential_args("id", "")),
            Err(ConfigError::EmptyValue("FORGE_CLIENT_SECRET"))
        );
    }

    #[test]
    fn credentials_build_basic_authorization() {
        let credentials = build_credentials(&credential_args("client", "secret")).unwrap();
        assert_eq!(
            credentials.basic_authorization(),
            "Basic Y2xpZW50OnNlY3JldA=="
        );
    }

    #[test]
    fn environment_selection() {
        assert_eq!(select_environment(None).unwrap(), ApsEnvironment::Production);
        assert_eq!(
            select_environment(Some("")).unwrap(),
            ApsEnvironment::Production
        );
        assert_eq!(
            select_environment(Some("http://localhost:9000/token"))
                .unwrap()
                .token_endpoint(),
            "http://localhost:9000/token"
        );
        assert_matches!(
            select_environment(Some("token")),
            Err(ConfigError::InvalidEndpoint(_))
        );
    }

    #[test]
    fn upstream_settings_from_arguments() {
        let upstream = UpstreamArgs {
            scope: " data:read ".into(),
            http_timeout: Some(10),
            ..upstream_args()
        };

        let settings =
            create_upstream_settings(&credential_args("id", "secret"), &upstream).unwrap();

        assert_eq!(settings.scope, "data:read");
        assert_eq!(settings.environment, ApsEnvironment::Production);
        assert_eq!(settings.http_config.timeout, Some(Duration::from_secs(10)));
        assert_eq!(
            settings.http_config.proxy,
            ProxyConfig::new("http://proxy.local:3128").unwrap()
        );
    }

    #[test]
    fn blank_scope_is_rejected() {
        let upstream = UpstreamArgs {
            scope: " ".into(),
            ..upstream_args()
        };
        assert_matches!(
            create_upstream_settings(&credential_args("id", "secret"), &upstream),
            Err(ConfigError::EmptyValue("APS_SCOPE"))
        );
    }

    #[test]
    fn invalid_proxy_is_rejected() {
        let upstream = UpstreamArgs {
            proxy_url: Some("/no-host".into()),
            ..upstream_args()
        };
        assert_matches!(build_http_config(&upstream), Err(ConfigError::Proxy(_)));
    }

    #[test]
    fn viewer_config_from_arguments() {
        let config = build_viewer_config(ViewerArgs {
            default_facility_urn: Some("".into()),
            facilities_base_url: "https://tandem.example/facilities/".into(),
        })
        .unwrap();
        assert_eq!(config.default_facility_urn, None);
        assert_eq!(config.facilities_base_url, "https://tandem.example/facilities/");

        assert_matches!(
            build_viewer_config(ViewerArgs {
                default_facility_urn: None,
                facilities_base_url: "tandem.example".into(),
            }),
            Err(ConfigError::InvalidFacilitiesUrl(_))
        );
    }
}
