use std::error::Error;

use clap::Parser;
use tandem_glue::authenticator::HttpAuthenticator;
use tandem_glue::commands::retrieve_token::RetrieveTokenCommand;
use tandem_glue::commands::serve::ServeCommand;
use tandem_glue::http::client::HttpClient;
use tandem_glue::parameters::{
    Commands, OutPutTokenFormat, create_serve_settings, create_upstream_settings,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "tandem_glue=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "tandem-glue-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Values from a local .env file never override the real environment.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli_command = Cli::parse();

    match cli_command.command {
        Commands::Serve {
            server,
            credentials,
            upstream,
            viewer,
        } => {
            let settings = create_serve_settings(&server, &credentials, &upstream, viewer)?;
            ServeCommand::new(settings).run().await?;
            Ok(())
        }
        Commands::RetrieveToken {
            credentials,
            upstream,
            output_token_format,
        } => {
            let settings = create_upstream_settings(&credentials, &upstream)?;
            let http_client = HttpClient::new(settings.http_config)
                .map_err(|e| format!("error creating http client: {}", e))?;
            let http_authenticator =
                HttpAuthenticator::new(http_client, settings.environment.token_endpoint());
            let retrieve_token_command = RetrieveTokenCommand::new(http_authenticator);
            let grant = retrieve_token_command
                .retrieve_token(settings.credentials, &settings.scope)
                .await?;
            match output_token_format {
                OutPutTokenFormat::Plain => {
                    println!("{}", grant.access_token);
                }
                OutPutTokenFormat::Json => {
                    let output = serde_json::to_string_pretty(&grant)?;
                    println!("{}", output);
                }
            }
            Ok(())
        }
    }
}
