use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pathwise::openapi::ApiInfo;
use pathwise::{AppConfig, Server, modules};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pathwise", version, about = "Controller-routed JSON API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Discover controllers and serve them (default)
    Serve,
    /// Write the OpenAPI document for the discovered controllers
    Openapi {
        #[arg(long, default_value = "docs/openapi.json")]
        out: PathBuf,
        #[arg(long, default_value = "pathwise API")]
        title: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Openapi { out, title } => write_openapi(&config, &out, title),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: AppConfig) -> Result<(), pathwise::Error> {
    let app = pathwise::bootstrap(&config, &modules::manifest())?;
    info!(routes = app.route_count, prefix = %config.api_prefix, "routes registered");
    Server::bind(&config.bind_addr())?.serve(app.router).await
}

fn write_openapi(config: &AppConfig, out: &Path, title: String) -> Result<(), pathwise::Error> {
    let app = pathwise::bootstrap(config, &modules::manifest())?;
    let info = ApiInfo {
        title: title.clone(),
        version: config.app_version.clone(),
        description: Some(format!("{title} documentation")),
    };
    let document = app.openapi(&info);

    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_vec_pretty(&document).map_err(std::io::Error::other)?;
    std::fs::write(out, json)?;
    info!(path = %out.display(), "OpenAPI document written");
    Ok(())
}
