// TCPickle Linux host: `serve` offers a sample unit until declined, `fetch` pulls a few and stops.

mod config;

use anyhow::{bail, Context};
use tcpickle_core::{ProtocolClient, ProtocolServer};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Unit offered by `serve`.
const SAMPLE_UNIT: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];

const DEFAULT_FETCH_COUNT: usize = 2;

const USAGE: &str = "usage: tcpickle [--version] <serve | fetch [COUNT]>";

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("tcpickle {}", VERSION);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = config::load().context("loading config")?;
    tracing::debug!(?cfg, "config loaded");

    match args.first().map(String::as_str) {
        Some("serve") => serve(&cfg),
        Some("fetch") => {
            let count = match args.get(1) {
                Some(n) => n.parse::<usize>().with_context(|| format!("invalid count {n:?}"))?,
                None => DEFAULT_FETCH_COUNT,
            };
            fetch(&cfg, count)
        }
        _ => bail!(USAGE),
    }
}

fn serve(cfg: &config::Config) -> anyhow::Result<()> {
    let mut server = ProtocolServer::new(cfg.host.clone(), cfg.port);
    let (host, port) = server.initialize().context("starting server")?;
    tracing::info!(%host, port, "offering data");
    let unit = SAMPLE_UNIT.to_vec();
    let mut sent = 0usize;
    while server.offer_unit(&unit).context("offering data")? {
        sent += 1;
    }
    tracing::info!(sent, "server has been closed");
    Ok(())
}

fn fetch(cfg: &config::Config, count: usize) -> anyhow::Result<()> {
    let mut client =
        ProtocolClient::new(cfg.host.clone(), cfg.port).with_retry(cfg.retry_policy());
    for i in 0..count {
        if i > 0 {
            std::thread::sleep(cfg.fetch_pause());
        }
        match client
            .request_unit::<Vec<f64>>()
            .context("requesting data")?
        {
            Some(unit) => tracing::info!(values = unit.len(), ?unit, "received data"),
            None => tracing::warn!("server sent no data"),
        }
    }
    client.stop_session().context("stopping session")?;
    tracing::info!("session stopped");
    Ok(())
}
