//! Serve command - run the HTTP API

use std::net::SocketAddr;

use anyhow::{Context as _, Result};
use clap::Args;
use rostergraph_config::ConfigOverrides;

use super::{build_service, ctrl_c_token, Context};

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, short = 'p', env = "ROSTERGRAPH_PORT")]
    pub port: Option<u16>,
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, mut ctx: Context) -> Result<()> {
    ctx.config.apply_overrides(&ConfigOverrides {
        port: args.port,
        ..Default::default()
    });

    let addr: SocketAddr = ctx
        .config
        .listen_addr()
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", ctx.config.listen_addr()))?;

    let service = build_service(&ctx.config, &ctx.root)?;
    let shutdown = ctrl_c_token();

    ctx.info(format!("Serving on http://{}", addr));
    let app = rostergraph_server::create_app(service, shutdown.clone());
    rostergraph_server::run_server(app, addr, shutdown).await
}
