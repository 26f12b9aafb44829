use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use threadlet::config::Config;
use threadlet::mail::{cache, import_maildir, save_threads};
use threadlet::vis::features::annotate_threads;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threadlet=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let clear_cache = args.iter().any(|a| a == "--clear-cache");
    let no_cache = args.iter().any(|a| a == "--no-cache");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let config = Config::load();
    let maildir = positional
        .first()
        .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
        .or_else(|| config.dataset.maildir())
        .context("usage: import_maildir <maildir> [out.json] [--clear-cache] [--no-cache]")?;
    let out = positional
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("threads.json"));

    let cache_path = if no_cache {
        None
    } else {
        cache::default_cache_path()
    };
    if clear_cache {
        if let Some(path) = &cache_path {
            let _ = std::fs::remove_file(path);
            println!("Cleared cache");
        }
    }

    println!("Scanning: {}", maildir.display());
    let start = Instant::now();
    let mut threads = import_maildir(&maildir, cache_path.as_deref(), |current, total| {
        if current % 5000 == 0 {
            println!("Scan progress: {}/{}", current, total);
        }
    })
    .with_context(|| format!("failed to import {}", maildir.display()))?;
    let scan_duration = start.elapsed();

    annotate_threads(&mut threads);

    let messages: usize = threads.iter().map(|t| t.messages.len()).sum();
    println!(
        "Built {} threads from {} messages in {:?}",
        threads.len(),
        messages,
        scan_duration
    );

    save_threads(&out, &threads)?;
    println!("Wrote {}", out.display());
    Ok(())
}
