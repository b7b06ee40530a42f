use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use partnership_alignment::{
    align_partnerships, commit_alignment, generate_population, AlignmentParams, GeneratorConfig,
    ProbitPartnershipModel, RegionalMatcher, RootSearch, TargetShareCategory,
};

#[derive(Parser, Debug)]
#[command(name = "partnership_alignment")]
#[command(about = "Calibrate union formation so the partnered share matches its target")]
struct Args {
    /// Number of persons in the synthetic population
    #[arg(short = 'n', long, default_value = "10000")]
    persons: usize,

    /// Number of regions
    #[arg(short, long, default_value = "12")]
    regions: u16,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Simulation year whose target share is used
    #[arg(short, long, default_value = "2022")]
    year: i32,

    /// JSON parameter file (missing fields use defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the partnership target share for the year
    #[arg(short, long)]
    target: Option<f64>,

    /// Apply the calibrated dissolutions and unions to the population
    #[arg(long)]
    commit: bool,

    /// Write the alignment report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut params = match &args.config {
        Some(path) => AlignmentParams::from_json_file(path)?,
        None => AlignmentParams::default(),
    };
    if let Some(target) = args.target {
        params
            .targets
            .insert(args.year, TargetShareCategory::Partnership, target);
    }

    // Initialize RNG
    let seed = args.seed.unwrap_or_else(|| rand::random());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    println!("Generating population with seed: {}", seed);
    let generator = GeneratorConfig {
        persons: args.persons,
        regions: args.regions,
        min_age_cohabitation: params.min_age_cohabitation,
        ..GeneratorConfig::default()
    };
    let mut population = generate_population(&generator, &mut rng)?;
    let eligible = population.eligible_count(params.min_age_cohabitation);
    let partnered = population.iter().filter(|p| p.is_partnered()).count();
    println!(
        "Population: {} persons, {} eligible (age >= {}), {} in committed unions",
        population.len(),
        eligible,
        params.min_age_cohabitation,
        partnered
    );

    let model = ProbitPartnershipModel::new(params.model.clone());
    let mut matcher = RegionalMatcher::new(params.matching.clone());
    let search = RootSearch::new(params.search.clone());

    println!("Aligning partnership share for {}...", args.year);
    let report = align_partnerships(
        &mut population,
        0.0,
        args.year,
        &params.targets,
        params.min_age_cohabitation,
        &model,
        &mut matcher,
        &search,
    )?;

    println!(
        "Target share {:.4}, simulated {:.4} (error {:+.5})",
        report.target_share, report.observed_share, report.error
    );
    println!(
        "Intercept adjustment: {:.6} after {} bisection steps, {} evaluations{}",
        report.adjustment,
        report.iterations,
        report.evaluations,
        if report.converged { "" } else { " (not converged)" }
    );

    if args.commit {
        let summary = commit_alignment(&mut population, &mut matcher, params.min_age_cohabitation)?;
        println!(
            "Committed {} dissolutions and {} new unions; partnered share now {:.4}",
            summary.dissolutions,
            summary.unions,
            population.considered_partnered_share(params.min_age_cohabitation)
        );
    }

    if let Some(path) = &args.output {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, &report)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}
