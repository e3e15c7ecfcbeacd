mod config;
mod input;
mod output;

use clap::{ArgAction, Parser};
use licchavi_core::constants::CRITERIA;
use licchavi_core::{
    criteria, distribute_data, select_criterion, Category, ComparisonRecord, Device, Licchavi,
    LicchaviConfig, LicchaviError, NodeData,
};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use tracing::{info, Level};

use crate::config::FileConfig;
use crate::output::CriterionOutput;

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(name = "licchavi", version, about = "Score items from many contributors' pairwise comparisons")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Train consensus and per-contributor scores from comparison records
    Rank(RankArgs),
    /// Create a default config file at ~/.config/licchavi/config.toml
    Init,
}

#[derive(Parser)]
struct RankArgs {
    /// Comparison records: JSON array or lines of
    /// contributor,item1,item2,criterion,score[,weight]. Reads stdin if absent.
    #[arg(long)]
    comparisons: Option<PathBuf>,

    /// Criterion to train (repeatable). Default: config file list, else every
    /// known criterion present in the input.
    #[arg(long = "criterion")]
    criteria: Vec<String>,

    /// Training epochs per criterion
    #[arg(long)]
    epochs: Option<usize>,

    /// Path to config file (default: ~/.config/licchavi/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output JSON instead of table
    #[arg(long)]
    json: bool,

    /// Also output per-contributor scores
    #[arg(long)]
    local: bool,

    /// Log more to stderr (-v: population changes and every step).
    /// Epoch and training times are always logged.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Spread per-contributor computations over all cores
    #[arg(long)]
    parallel: bool,

    /// Seed for model initialization and sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Consensus regularization strength
    #[arg(long)]
    w0: Option<f64>,

    /// Pull of each contributor toward the consensus
    #[arg(long)]
    w: Option<f64>,

    /// Learning rate of the contributor optimizers
    #[arg(long)]
    lr_node: Option<f64>,

    /// Learning rate of the consensus optimizer
    #[arg(long)]
    lr_gen: Option<f64>,

    /// Consensus steps per contributor step
    #[arg(long)]
    gen_freq: Option<usize>,

    /// Add this many synthetic contributors before training
    #[arg(long)]
    inject: Option<usize>,

    /// Comparisons per synthetic contributor, sampled from the whole input.
    /// Default: average per real contributor.
    #[arg(long)]
    sample_size: Option<usize>,

    /// Synthetic contributor category: "honest", "unknown" or "adversarial"
    #[arg(long, default_value = "honest")]
    category: String,

    /// Item favoured by adversarial contributors
    #[arg(long)]
    favorite: Option<i64>,

    /// Probability that an adversarial contributor rewrites a rating involving
    /// its favorite
    #[arg(long, default_value_t = 1.0)]
    strength: f64,

    /// Weight of synthetic contributors (default: --w)
    #[arg(long)]
    inject_weight: Option<f64>,
}

/// Epoch progress and timings are `info`, so the default shows them.
fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        _ => Level::DEBUG,
    }
}

fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Load records from --comparisons or stdin.
fn load_records(args: &RankArgs) -> Vec<ComparisonRecord> {
    let content = match &args.comparisons {
        Some(path) => std::fs::read_to_string(path)
            .unwrap_or_else(|e| bail(format!("Failed to read comparisons file {}: {e}", path.display()))),
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                bail("No comparisons provided. Use --comparisons <file> or pipe records via stdin.");
            }
            let mut content = String::new();
            stdin
                .lock()
                .read_to_string(&mut content)
                .unwrap_or_else(|e| bail(format!("Failed to read from stdin: {e}")));
            content
        }
    };

    let records = input::parse_records(&content).unwrap_or_else(|e| bail(e));
    if records.is_empty() {
        bail("No comparison records in input");
    }
    records
}

/// CLI flags win over the config file, which wins over engine defaults.
fn build_config(args: &RankArgs, file: &FileConfig) -> LicchaviConfig {
    let defaults = LicchaviConfig::default();
    let device = if args.parallel {
        Device::Parallel
    } else {
        file.device.unwrap_or(defaults.device)
    };
    LicchaviConfig {
        w0: args.w0.or(file.w0).unwrap_or(defaults.w0),
        w: args.w.or(file.w).unwrap_or(defaults.w),
        lr_node: args.lr_node.or(file.lr_node).unwrap_or(defaults.lr_node),
        lr_gen: args.lr_gen.or(file.lr_gen).unwrap_or(defaults.lr_gen),
        gen_freq: args.gen_freq.or(file.gen_freq).unwrap_or(defaults.gen_freq),
        pow_gen: file.pow_gen.unwrap_or(defaults.pow_gen),
        pow_reg: file.pow_reg.unwrap_or(defaults.pow_reg),
        device,
        epochs: args.epochs.or(file.epochs).or(defaults.epochs),
        seed: args.seed.or(file.seed),
    }
}

/// Criteria to train, in order.
fn pick_criteria(args: &RankArgs, file: &FileConfig, records: &[ComparisonRecord]) -> Vec<String> {
    if !args.criteria.is_empty() {
        return args.criteria.clone();
    }
    if let Some(list) = &file.criteria {
        return list.clone();
    }
    let present = criteria(records);
    let known: Vec<String> = CRITERIA
        .iter()
        .filter(|c| present.iter().any(|p| p == *c))
        .map(|c| c.to_string())
        .collect();
    if known.is_empty() { present } else { known }
}

fn run_criterion(
    records: &[ComparisonRecord],
    criterion: &str,
    config: &LicchaviConfig,
    args: &RankArgs,
) -> Result<CriterionOutput, LicchaviError> {
    let selected = select_criterion(records, criterion)?;
    let data = distribute_data(&selected)?;
    let nb_contributors = data.contributor_ids.len();
    let pooled: Vec<(usize, usize, f64)> = data.nodes.iter().flat_map(|n| n.rows()).collect();

    let mut licchavi = Licchavi::new(data.dictionary, config);
    licchavi.set_allnodes(data.nodes, data.contributor_ids)?;

    if let Some(count) = args.inject.filter(|&n| n > 0) {
        let category = Category::from_label(&args.category, args.favorite, args.strength)?;
        let sample_size = args.sample_size.unwrap_or((pooled.len() / nb_contributors).max(1));
        let weight = args.inject_weight.unwrap_or(config.w);
        let source = NodeData::from_indexed(licchavi.dictionary(), &pooled)?;
        licchavi.add_nodes(&source, (count, sample_size), category, weight)?;
    }

    info!("Training criterion \"{}\" with {} nodes", criterion, licchavi.nb_nodes());
    licchavi.train(config)?;
    licchavi.assert_consistent()?;

    let scores = licchavi.output_scores();
    Ok(CriterionOutput {
        criterion: criterion.to_string(),
        nb_contributors: licchavi.nb_nodes(),
        global: scores.global_records(criterion),
        local: args.local.then(|| scores.local_records(criterion)),
        history: licchavi.history().clone(),
    })
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rank(args) => {
            init_logging(args.verbose);
            run_rank(args);
        }
        Commands::Init => {
            let path = config::create_default_config();
            println!("Created config at {}", path.display());
            println!("Edit it to set your default hyperparameters and criteria.");
        }
    }
}

fn run_rank(args: RankArgs) {
    let config_path = args.config.clone().unwrap_or_else(config::config_path);
    let file_config = config::load_config(&config_path);

    let config = build_config(&args, &file_config);
    if let Err(e) = config.validate() {
        bail(format!("Invalid configuration: {e}"));
    }

    let records = load_records(&args);
    let criteria = pick_criteria(&args, &file_config, &records);
    if criteria.is_empty() {
        bail("No criterion to train");
    }

    let outputs: Vec<CriterionOutput> = criteria
        .iter()
        .map(|criterion| {
            run_criterion(&records, criterion, &config, &args)
                .unwrap_or_else(|e| bail(format!("Criterion \"{criterion}\": {e}")))
        })
        .collect();

    if args.json {
        output::print_json(&outputs);
    } else {
        output::print_table(&outputs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use licchavi_core::Power;

    fn args(flags: &[&str]) -> RankArgs {
        RankArgs::parse_from(std::iter::once("rank").chain(flags.iter().copied()))
    }

    fn record(contributor: i64, item1: i64, item2: i64, criterion: &str, score: f64) -> ComparisonRecord {
        ComparisonRecord {
            contributor,
            item1,
            item2,
            criterion: criterion.to_string(),
            score: Some(score),
            weight: 1.0,
        }
    }

    #[test]
    fn test_flags_override_file_over_defaults() {
        let file = FileConfig {
            w0: Some(0.7),
            lr_gen: Some(0.3),
            pow_reg: Some(Power::new(2.0, 0.5)),
            device: Some(Device::Cpu),
            ..Default::default()
        };
        let cfg = build_config(&args(&["--w0", "0.9", "--parallel", "--seed", "3"]), &file);
        assert_eq!(cfg.w0, 0.9);
        assert_eq!(cfg.lr_gen, 0.3);
        assert_eq!(cfg.lr_node, LicchaviConfig::default().lr_node);
        assert_eq!(cfg.pow_reg, Power::new(2.0, 0.5));
        assert_eq!(cfg.device, Device::Parallel);
        assert_eq!(cfg.seed, Some(3));
        assert_eq!(cfg.epochs, None);
    }

    #[test]
    fn test_default_log_level_shows_timings() {
        assert_eq!(log_level(args(&[]).verbose), Level::INFO);
        assert_eq!(log_level(args(&["-v"]).verbose), Level::DEBUG);
        assert_eq!(log_level(args(&["-vv"]).verbose), Level::DEBUG);
    }

    #[test]
    fn test_pick_criteria_order() {
        let records = vec![
            record(1, 1, 2, "custom", 10.0),
            record(1, 1, 2, "importance", 10.0),
            record(1, 1, 2, "reliability", 10.0),
        ];
        let file = FileConfig::default();
        assert_eq!(pick_criteria(&args(&[]), &file, &records), vec!["reliability", "importance"]);
        assert_eq!(
            pick_criteria(&args(&["--criterion", "custom"]), &file, &records),
            vec!["custom"]
        );

        let only_custom = vec![record(1, 1, 2, "custom", 10.0)];
        assert_eq!(pick_criteria(&args(&[]), &file, &only_custom), vec!["custom"]);
    }

    #[test]
    fn test_run_criterion_with_injection() {
        let records = vec![
            record(1, 10, 20, "reliability", 80.0),
            record(1, 20, 30, "reliability", 40.0),
            record(2, 10, 30, "reliability", 100.0),
            record(2, 10, 20, "importance", 0.0),
        ];
        let args = args(&[
            "--inject", "3", "--category", "adversarial", "--favorite", "30", "--local",
        ]);
        let config = LicchaviConfig { seed: Some(1), ..Default::default() };
        let out = run_criterion(&records, "reliability", &config, &args).unwrap();

        assert_eq!(out.nb_contributors, 5);
        assert_eq!(out.global.len(), 3);
        assert_eq!(out.history.len(), 2);
        let local = out.local.unwrap();
        assert!(local.iter().any(|r| r.contributor == 4));
    }

    #[test]
    fn test_run_criterion_errors() {
        let records = vec![record(1, 10, 20, "reliability", 80.0)];
        let config = LicchaviConfig { seed: Some(2), ..Default::default() };
        assert!(matches!(
            run_criterion(&records, "pedagogy", &config, &args(&[])),
            Err(LicchaviError::Dataset(_))
        ));
        assert!(matches!(
            run_criterion(&records, "reliability", &config, &args(&["--inject", "1", "--category", "sneaky"])),
            Err(LicchaviError::Population(_))
        ));
    }
}
