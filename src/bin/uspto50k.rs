use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use synthon::dataset::{SplitConfig, DATA_FILE};
use synthon::*;
use tracing::*;

const BUCKET_NAMES: [&str; 3] = ["train", "valid", "test"];

fn command() -> Command {
    Command::new("uspto50k")
        .about("Extract reaction centers or synthons from USPTO-50k and split by reaction type")
        .arg(
            Arg::new("input")
                .required(false)
                .long("input")
                .short('i')
                .num_args(1)
                .default_value(DATA_FILE),
        )
        .arg(
            Arg::new("output")
                .required(true)
                .long("output")
                .short('o')
                .num_args(1),
        )
        .arg(
            Arg::new("synthon")
                .long("synthon")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ratios")
                .long("ratios")
                .num_args(1)
                .default_value("0.8,0.1,0.1"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .num_args(1)
                .default_value("0"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .default_value("info"),
        )
        .arg(Arg::new("dot").long("dot").num_args(1))
}

fn parse_ratios(ratios: &str) -> Result<Vec<f64>> {
    ratios
        .split(',')
        .map(|ratio| {
            ratio
                .trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid split ratio {ratio:?}"))
        })
        .collect()
}

fn bucket_file(bucket: usize, num_buckets: usize) -> String {
    if num_buckets == BUCKET_NAMES.len() {
        format!("{}.csv", BUCKET_NAMES[bucket])
    } else {
        format!("split_{bucket}.csv")
    }
}

fn write_sample_dot(dataset: &Uspto50k, index: usize, output: &Path) -> Result<()> {
    let sample = dataset
        .get(index)
        .with_context(|| format!("No sample {index}, the dataset has {}", dataset.len()))?;
    let (nodes, edges) = reaction_center_highlights(&sample.product, &sample.reaction_center);
    let dot = sample_to_dot(&sample.product, &nodes, &edges);
    write_dot(output.join(format!("sample_{index}.dot")), &dot)
}

fn action(matches: &ArgMatches) -> Result<()> {
    let input = matches
        .get_one::<String>("input")
        .context("Failed to extract input path")?;
    let output = PathBuf::from(
        matches
            .get_one::<String>("output")
            .context("Failed to extract output directory")?,
    );
    let config = Uspto50kConfig {
        as_synthon: matches.get_flag("synthon"),
        verbose: true,
    };
    let split_config = SplitConfig {
        ratios: parse_ratios(
            matches
                .get_one::<String>("ratios")
                .context("Failed to extract ratios")?,
        )?,
        seed: matches
            .get_one::<String>("seed")
            .context("Failed to extract seed")?
            .parse()
            .context("Seed must be a non-negative integer")?,
    };
    split_config.validate()?;

    info!("input={input}, output={}, config={config:?}, split={split_config:?}", output.display());

    let dataset = Uspto50k::load_csv(input, &config)?;
    info!(
        "{} samples in {} reaction types, valid rate {:.4}",
        dataset.len(),
        dataset.num_reaction_type(),
        dataset.valid_rate()
    );

    let buckets = dataset.split(&split_config)?;
    std::fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;
    for (bucket, indices) in buckets.iter().enumerate() {
        let path = output.join(bucket_file(bucket, buckets.len()));
        dataset.write_csv(&path, indices)?;
        info!("{} samples written to {}", indices.len(), path.display());
    }

    if let Some(index) = matches.get_one::<String>("dot") {
        let index = index.parse::<usize>().context("--dot takes a sample index")?;
        write_sample_dot(&dataset, index, &output)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let matches = command().get_matches();
    let level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(level);
    action(&matches)
}
