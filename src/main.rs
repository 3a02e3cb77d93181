use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error};

use authgate::config::ConfigArgs;
use authgate::server::config::ServerConfig;
use authgate::server::factory::ServerFactory;
use authgate::users;

/// Authorization endpoint for reverse proxies doing single sign-on. Serves
/// the Legacy, ForwardAuth, AuthRequest and ExtAuthz endpoints.
#[derive(Parser)]
#[command(author, version, about)]
struct ServerArgs {
    /// Print the completed config as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Print the users file entry for a password and exit.
    #[arg(long, value_name = "PASSWORD")]
    hash_password: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,
}

impl ServerArgs {
    async fn run(&self) -> Result<()> {
        if let Some(password) = self.hash_password.as_ref() {
            let salt = users::generate_salt();
            println!("{}", users::hash_password(password, &salt));
            return Ok(());
        }

        let cfg: ServerConfig = self.config.load()?;
        if self.print_config {
            let json = serde_json::to_string_pretty(&cfg).context("encode config")?;
            println!("{json}");
            return Ok(());
        }

        cfg.logs.init()?;
        debug!("Use config: {cfg:?}");

        let factory = ServerFactory::new(cfg);
        let srv = factory.build_server()?;
        srv.run().await
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = ServerArgs::parse();
    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if log::max_level() == log::LevelFilter::Off {
                _ = writeln!(io::stderr(), "Fatal: {err:#}");
            } else {
                error!("Fatal: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
