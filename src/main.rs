use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use case_pipeline::case::ingest::read_cases;
use case_pipeline::case::{CaseRecord, FieldKey};
use case_pipeline::config::{Config, ConfigOverrides};
use case_pipeline::output::csv::{
    gaps_to_csv, pipeline_to_csv, promotions_to_csv, ranking_to_csv, scores_to_csv,
    whatif_to_csv,
};
use case_pipeline::output::json::{render_json, render_pipeline_json};
use case_pipeline::output::table::{
    render_gaps_table, render_pipeline_table, render_promotions_table, render_ranking_table,
    render_scores_table, render_whatif_table,
};
use case_pipeline::pipeline::{PipelineStore, PromotionRecord, Stage};
use case_pipeline::scoring::ranking::{
    rank_cases, score_cases, summarize_ranking, CaseScore, RankedCase,
};
use case_pipeline::scoring::whatif::{simulate_whatif, WhatIfResult};
use case_pipeline::scoring::CaseGaps;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "case-pipeline",
    about = "Business-case scoring and promotion pipeline"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Pipeline state file; overrides `storage.state_path`.
    #[arg(short, long)]
    state: Option<String>,
    /// Minimum overall score for promotion; overrides `pipeline.promotion_threshold`.
    #[arg(short, long)]
    threshold: Option<f64>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Score every case in a CSV file.
    Score { input: PathBuf },
    /// Current vs target operating gaps.
    Gaps {
        input: PathBuf,
        #[arg(long = "case")]
        case_id: Option<String>,
    },
    Rank {
        input: PathBuf,
        #[arg(long)]
        top: Option<usize>,
    },
    /// Re-score one case with hypothetical field values.
    Whatif {
        input: PathBuf,
        #[arg(long = "case")]
        case_id: Option<String>,
        #[arg(long = "set", value_parser = parse_field_change, required = true)]
        changes: Vec<(FieldKey, f64)>,
    },
    /// Score cases and park the ones that qualify.
    Promote { input: PathBuf },
    Pipeline {
        #[arg(long)]
        stage: Option<String>,
    },
    Advance { case_id: String },
    Remove { case_id: String },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        promotion_threshold: cli.threshold,
        state_path: cli.state.clone(),
    });
    config.validate()?;

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }

    let engine = config.engine()?;
    let promoter = config.promoter();
    let threshold = promoter.threshold();
    let state_path = config.resolved_state_path();

    match &cli.command {
        Commands::Score { input } => {
            let cases = load_cases(input)?;
            print_scores(&score_cases(&engine, &cases, threshold), cli.output)?;
        }
        Commands::Gaps { input, case_id } => {
            let cases = load_cases(input)?;
            let reports = match case_id {
                Some(id) => vec![CaseGaps::for_case(find_case(&cases, id)?)],
                None => cases.iter().map(CaseGaps::for_case).collect(),
            };
            for report in &reports {
                let regressions = report.gaps.regressions();
                if !regressions.is_empty() {
                    warn!(
                        "case {} targets a regression on {}",
                        report.case_id,
                        regressions
                            .iter()
                            .map(|f| f.as_slug())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
            }
            print_gaps(&reports, cli.output)?;
        }
        Commands::Rank { input, top } => {
            let cases = load_cases(input)?;
            let mut ranked = rank_cases(&engine, &cases, threshold);
            let summary = summarize_ranking(&ranked);
            if let Some(top) = top {
                ranked.truncate(*top);
            }
            print_ranking(&ranked, &summary, cli.output)?;
        }
        Commands::Whatif {
            input,
            case_id,
            changes,
        } => {
            let cases = load_cases(input)?;
            let case = match case_id {
                Some(id) => find_case(&cases, id)?,
                None => match cases.as_slice() {
                    [only] => only,
                    _ => {
                        return Err(anyhow!(
                            "--case is required when the input has {} cases",
                            cases.len()
                        ))
                    }
                },
            };
            let result = simulate_whatif(&engine, case, changes, threshold);
            if result.gains_qualification() {
                info!("case {} would qualify for promotion", result.case_id);
            } else if result.loses_qualification() {
                warn!("case {} would drop below the threshold", result.case_id);
            }
            print_whatif(&result, cli.output)?;
        }
        Commands::Promote { input } => {
            let cases = load_cases(input)?;
            let mut store = PipelineStore::load(&state_path)?;
            let records = promoter.evaluate_all(&mut store, &engine, &cases);
            store.save(&state_path)?;
            print_promotions(&records, cli.output)?;
        }
        Commands::Pipeline { stage } => {
            let store = PipelineStore::load(&state_path)?;
            let stages = match stage {
                Some(raw) => vec![Stage::from_str(raw)?],
                None => Stage::ALL.to_vec(),
            };
            print_pipeline(&store, &stages, cli.output)?;
        }
        Commands::Advance { case_id } => {
            let mut store = PipelineStore::load(&state_path)?;
            let entry = promoter.advance(&mut store, case_id)?;
            store.save(&state_path)?;
            println!("{} moved to {}", entry.case_id(), entry.stage);
        }
        Commands::Remove { case_id } => {
            let mut store = PipelineStore::load(&state_path)?;
            match promoter.remove(&mut store, case_id) {
                Some(entry) => {
                    store.save(&state_path)?;
                    println!("{} removed from {}", entry.case_id(), entry.stage);
                }
                None => warn!("case {case_id} is not in the pipeline"),
            }
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &Path) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn load_cases(path: &Path) -> Result<Vec<CaseRecord>> {
    let cases = read_cases(path)?;
    for case in &cases {
        let out_of_range = case.out_of_range_fields();
        if !out_of_range.is_empty() {
            warn!(
                "case {} has values outside the expected range: {}",
                case.id(),
                out_of_range
                    .iter()
                    .map(|k| k.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    Ok(cases)
}

fn find_case<'a>(cases: &'a [CaseRecord], case_id: &str) -> Result<&'a CaseRecord> {
    cases
        .iter()
        .find(|c| c.id() == case_id)
        .ok_or_else(|| anyhow!("case {case_id} not found in input"))
}

fn parse_field_change(raw: &str) -> Result<(FieldKey, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got {raw}"))?;
    let key = FieldKey::from_str(key).map_err(|e| e.to_string())?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for {key}: {e}"))?;
    if !value.is_finite() {
        return Err(format!("value for {key} must be finite"));
    }
    Ok((key, value))
}

fn print_scores(scores: &[CaseScore], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_scores_table(scores)),
        OutputFormat::Json => println!("{}", render_json(scores)?),
        OutputFormat::Csv => println!("{}", scores_to_csv(scores)?),
    }
    Ok(())
}

fn print_gaps(reports: &[CaseGaps], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_gaps_table(reports)),
        OutputFormat::Json => println!("{}", render_json(reports)?),
        OutputFormat::Csv => println!("{}", gaps_to_csv(reports)?),
    }
    Ok(())
}

fn print_ranking(ranked: &[RankedCase], summary: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_ranking_table(ranked));
            println!("{summary}");
        }
        OutputFormat::Json => println!("{}", render_json(ranked)?),
        OutputFormat::Csv => println!("{}", ranking_to_csv(ranked)?),
    }
    Ok(())
}

fn print_whatif(result: &WhatIfResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_whatif_table(result)),
        OutputFormat::Json => println!("{}", render_json(result)?),
        OutputFormat::Csv => println!("{}", whatif_to_csv(result)?),
    }
    Ok(())
}

fn print_promotions(records: &[PromotionRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_promotions_table(records)),
        OutputFormat::Json => println!("{}", render_json(records)?),
        OutputFormat::Csv => println!("{}", promotions_to_csv(records)?),
    }
    Ok(())
}

fn print_pipeline(store: &PipelineStore, stages: &[Stage], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_pipeline_table(store, stages)),
        OutputFormat::Json => println!("{}", render_pipeline_json(store, stages)?),
        OutputFormat::Csv => println!("{}", pipeline_to_csv(store, stages)?),
    }
    Ok(())
}
