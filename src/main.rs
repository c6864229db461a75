//! Dry-run routing CLI.
//!
//! Feeds a prompt through the complexity analyzer and tier selector and
//! prints the decision, without calling any provider or touching credits.
//!
//! ```text
//! tiergate [--config path/to/tiergate.toml] <prompt...>
//! ```

use std::env;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use tiergate::config::RouterConfig;
use tiergate::request::{Request, RequestKind};
use tiergate::routing;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tiergate=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut args = env::args().skip(1).peekable();
    let config = match args.peek().map(String::as_str) {
        Some("--config") => {
            args.next();
            let path = args.next().context("--config requires a path")?;
            RouterConfig::from_path(&path)
                .with_context(|| format!("failed to load config from {path}"))?
        }
        _ => RouterConfig::default(),
    };

    let prompt = args.collect::<Vec<_>>().join(" ");
    if prompt.is_empty() {
        bail!("usage: tiergate [--config <path>] <prompt>");
    }

    let request = Request::new(Uuid::new_v4(), RequestKind::General, prompt);
    let decision = routing::select(&request);

    println!("tier:       {}", decision.tier);
    println!("score:      {}", decision.score.score);
    println!("confidence: {:.2}", decision.score.confidence);
    println!("cost:       {} credits", config.costs.cost(decision.tier));
    println!("reason:     {}", decision.reason);
    for factor in &decision.score.factors {
        println!("  - {factor}");
    }

    Ok(())
}
