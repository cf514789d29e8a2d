use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use coffee_shop::config::ConfigArgs;
use coffee_shop::server::config::ServerConfig;
use log::{error, info};

#[derive(Parser, Debug)]
#[command(author, version = env!("COFFEE_SHOP_VERSION"), about)]
struct ServerArgs {
    /// Print server configuration data (JSON) and exit.
    #[arg(long)]
    pub print_config: bool,

    /// Drop all drinks and seed the catalog before serving.
    #[arg(long)]
    pub reset_db: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

async fn run(args: ServerArgs) -> Result<()> {
    let mut cfg: ServerConfig = args.config.load("server")?;

    if args.print_config {
        let json = serde_json::to_string_pretty(&cfg).context("encode config")?;
        println!("{json}");
        return Ok(());
    }

    if args.reset_db {
        cfg.db.reset = true;
    }

    cfg.logs.init("server")?;

    let ctx = cfg.build_ctx().await?;
    let restful_server = cfg.build_restful_server(ctx)?;

    restful_server.run().await.context("run restful server")?;

    info!("Server exited by user");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();
    if let Err(e) = run(args).await {
        error!("Error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
