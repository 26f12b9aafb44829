use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use threadlet::config::Config;
use threadlet::mail::{find_thread, load_threads};
use threadlet::vis::{ThreadOverview, ThreadView};

/// Print the layout model of one thread, or the overview of all threads
/// with `--overview`, as JSON.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threadlet=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let overview = args.iter().any(|a| a == "--overview");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let path = positional
        .first()
        .map(PathBuf::from)
        .context("usage: dump_layout <dataset.json> [thread-id] [--overview]")?;
    let threads = load_threads(&path)?;
    let config = Config::load();

    let json = if overview {
        let mut view = ThreadOverview::new(config.view, config.layout);
        view.set_threads(threads)?;
        serde_json::to_string_pretty(&view.layout())?
    } else {
        let thread = match positional.get(1) {
            Some(id) => find_thread(&threads, id),
            None => threads.first(),
        };
        let Some(thread) = thread else {
            bail!("thread not found");
        };
        let mut view = ThreadView::new(config.view, config.layout);
        view.set_messages(thread.messages.clone())?;
        serde_json::to_string_pretty(&view.layout())?
    };

    println!("{json}");
    Ok(())
}
