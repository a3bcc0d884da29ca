//! segmentforge: customer segmentation CLI
//!
//! Loads a CSV of customer features, runs the segmentation pipeline and
//! prints the per-segment profile.

use anyhow::{Context, Result};
use clap::Parser;
use segmentforge::{
    load_records, segment_ids, silhouette_sample, write_csv, Args, SegmentationOutput,
    SegmentationPipeline,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(args.verbose >= 2)
        .init();

    debug!("segmentforge started with verbosity level: {}", args.verbose);

    let config = args.to_config().context("invalid configuration")?;
    let strategy = args.build_strategy(&config);
    let pipeline = SegmentationPipeline::new(config)?.with_strategy(strategy);

    let table = load_records(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    println!(
        "Loaded {} customers from {}",
        table.height(),
        args.input.display()
    );

    let mut output = pipeline.run(&table).context("segmentation failed")?;
    print_report(&args, &output)?;

    if let Some(path) = &args.labeled_output {
        write_csv(&mut output.labeled, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Labeled table saved to: {}", path.display());
    }

    if let Some(path) = &args.profile_output {
        let profile = match args.round {
            Some(decimals) => output.profile.round(decimals),
            None => output.profile.clone(),
        };
        let mut df = profile.to_dataframe()?;
        write_csv(&mut df, path).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Segment profile saved to: {}", path.display());
    }

    Ok(())
}

fn print_report(args: &Args, output: &SegmentationOutput) -> Result<()> {
    let total = output.labeled.height();

    println!("\n=== Segment Sizes ===");
    for row in output.profile.rows() {
        let percentage = (row.size as f64 / total as f64) * 100.0;
        println!(
            "Segment {}: {} customers ({:.1}%)",
            row.segment, row.size, percentage
        );
    }

    // Silhouette on a sample, in the standardized space the clustering saw
    let labels: Vec<usize> = segment_ids(&output.labeled)?
        .into_iter()
        .map(|id| id.unwrap_or_default() as usize)
        .collect();
    let silhouette = silhouette_sample(output.scaled.view(), &labels, 100.min(total));
    println!("\nSilhouette score (sample): {:.3}", silhouette);

    let profile = match args.round {
        Some(decimals) => output.profile.round(decimals),
        None => output.profile.clone(),
    };
    println!("\n=== Segment Profile ===");
    println!("{}", profile.to_dataframe()?);

    Ok(())
}
