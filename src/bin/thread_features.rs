use std::path::PathBuf;

use anyhow::{Context, Result};
use threadlet::mail::{load_threads, save_threads};
use threadlet::vis::features::{ThreadFeature, annotate_threads};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threadlet=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .map(PathBuf::from)
        .context("usage: thread_features <dataset.json> [out.json]")?;
    let output = args.next().map(PathBuf::from).unwrap_or_else(|| input.clone());

    let mut threads = load_threads(&input)?;
    annotate_threads(&mut threads);

    println!("Threads: {}", threads.len());
    println!("\nFeature ranges:");
    for f in ThreadFeature::ALL {
        let values: Vec<f64> = threads.iter().filter_map(|t| t.feature(f.name())).collect();
        if values.is_empty() {
            println!("  {:<26} (no values)", f.name());
            continue;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        println!(
            "  {:<26} min {:>10.3}  mean {:>10.3}  max {:>10.3}  ({} threads)",
            f.name(),
            min,
            mean,
            max,
            values.len()
        );
    }

    save_threads(&output, &threads)?;
    println!("\nWrote {}", output.display());
    Ok(())
}
