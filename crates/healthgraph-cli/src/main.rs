use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, Result, WrapErr};
use healthgraph_core::graph::{bundle_files, DirectoryLoadReport, LoadResult};
use healthgraph_core::graph::BodySystemSummary;
use healthgraph_core::{
    ConditionDetail, Config, HealthGraph, MedicationDetail, PatientHealthSummary, PatientListing,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "healthgraph")]
#[command(about = "Load FHIR bundles into a clinical knowledge graph", long_about = None)]
struct Cli {
    /// Config file (defaults to ./healthgraph.toml, then the user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a bundle file or every bundle in a directory
    Load {
        path: PathBuf,
        /// Seed body systems after loading
        #[arg(long)]
        seed: bool,
    },
    /// Create body systems and wire condition/medication categories
    Seed,
    /// Show a patient's health summary
    Summary {
        patient_id: String,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a patient's conditions with the body systems they affect
    Conditions {
        patient_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Show a patient's medications with what they treat and target
    Medications {
        patient_id: String,
        #[arg(long)]
        json: bool,
    },
    /// List every body system in the graph
    BodySystems,
    /// List patients, optionally filtered by name
    Patients {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show node and edge counts
    Stats,
    /// Print the default configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("loading config from {}", path.display()))?,
        None => Config::load().wrap_err("loading config")?,
    };
    init_tracing(&config);

    if let Commands::Config = cli.command {
        print!("{}", Config::default_config_string());
        return Ok(());
    }

    let graph = HealthGraph::open(&config.store)
        .await
        .wrap_err_with(|| format!("opening {} store", config.store.backend))?;

    match cli.command {
        Commands::Load { path, seed } => {
            let result = load(&graph, &path, &config.loader.bundle_extension).await?;
            print_load_result(&result);
            if seed {
                run_seed(&graph).await?;
            }
        }
        Commands::Seed => run_seed(&graph).await?,
        Commands::Summary { patient_id, json } => {
            let summary = graph.get_summary(&patient_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::Conditions { patient_id, json } => {
            let conditions = graph.patient_conditions(&patient_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&conditions)?);
            } else {
                print_conditions(&conditions);
            }
        }
        Commands::Medications { patient_id, json } => {
            let medications = graph.patient_medications(&patient_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&medications)?);
            } else {
                print_medications(&medications);
            }
        }
        Commands::BodySystems => print_body_systems(&graph.body_systems().await?),
        Commands::Patients { search, limit } => {
            let limit = limit.unwrap_or(config.summary.patient_limit);
            let patients = match search.as_deref() {
                Some(term) => graph.search_patients(term, limit).await?,
                None => graph.list_patients(limit).await?,
            };
            print_patients(&patients);
        }
        Commands::Stats => {
            let stats = graph.stats().await?;
            println!("Nodes");
            println!("  Patients:     {}", stats.nodes.patients);
            println!("  Conditions:   {}", stats.nodes.conditions);
            println!("  Medications:  {}", stats.nodes.medications);
            println!("  Body systems: {}", stats.nodes.body_systems);
            println!("Edges ({} total)", stats.edges.total());
            println!("  HAS_CONDITION:    {}", stats.edges.has_condition);
            println!("  TAKES_MEDICATION: {}", stats.edges.takes_medication);
            println!("  AFFECTS:          {}", stats.edges.affects);
            println!("  TREATS:           {}", stats.edges.treats);
            println!("  TARGETS:          {}", stats.edges.targets);
            println!("  RELATED_TO:       {}", stats.edges.related_to);
        }
        Commands::Config => {}
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.filter_or_default()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load(graph: &HealthGraph, path: &Path, extension: &str) -> Result<LoadResult> {
    if path.is_file() {
        return Ok(graph.load_bundle_file(path).await?);
    }
    if !path.is_dir() {
        bail!("{} is neither a file nor a directory", path.display());
    }

    let files = bundle_files(path, extension)?;
    if files.is_empty() {
        bail!("no .{} bundle files in {}", extension, path.display());
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>5}/{len:5} {msg}")?,
    );

    let report: DirectoryLoadReport = graph
        .load_files(files, |file| {
            if let Some(name) = file.file_name() {
                progress.set_message(name.to_string_lossy().into_owned());
            }
            progress.inc(1);
        })
        .await;
    progress.finish_with_message("done");

    println!("Files loaded: {}", report.files_processed);
    for (file, error) in &report.failed {
        println!("  failed: {} ({})", file.display(), error);
    }
    Ok(report.result)
}

async fn run_seed(graph: &HealthGraph) -> Result<()> {
    let report = graph.seed().await?;
    println!("Body systems:   {}", report.body_systems);
    println!("AFFECTS edges:  {}", report.affects_edges);
    println!("TARGETS edges:  {}", report.targets_edges);
    println!("RELATED_TO edges: {}", report.related_edges);
    if !report.unmapped_codes.is_empty() {
        println!("Unmapped codes: {}", report.unmapped_codes.join(", "));
    }
    Ok(())
}

fn print_load_result(result: &LoadResult) {
    println!("Entries loaded:  {}", result.entries_loaded);
    println!("Entries ignored: {}", result.entries_ignored);
    println!("Nodes written:   {}", result.nodes_written);
    println!("Edges written:   {}", result.edges_written);
    if !result.skipped.is_empty() {
        println!("Skipped {} entries:", result.skipped.len());
        for entry in &result.skipped {
            println!(
                "  #{} {} {}: {}",
                entry.index,
                entry.resource_type,
                entry.resource_id.as_deref().unwrap_or("-"),
                entry.reason
            );
        }
    }
}

fn print_summary(summary: &PatientHealthSummary) {
    println!("{} ({})", summary.patient_name, summary.patient_id);

    if summary.is_empty() {
        println!("  No conditions or medications recorded.");
        return;
    }

    println!("\nConditions");
    for condition in &summary.conditions {
        match &condition.onset {
            Some(onset) => println!("  {} [{}] since {}", condition.display, condition.code, onset),
            None => println!("  {} [{}]", condition.display, condition.code),
        }
    }

    println!("\nMedications");
    for medication in &summary.medications {
        if medication.treats.is_empty() {
            println!("  {} [{}]", medication.display, medication.code);
        } else {
            println!(
                "  {} [{}] treats {}",
                medication.display,
                medication.code,
                medication.treats.join(", ")
            );
        }
    }

    if !summary.body_systems_affected.is_empty() {
        println!("\nBody systems");
        for system in &summary.body_systems_affected {
            println!("  {}: {}", system.system, system.description);
        }
    }

    if !summary.condition_relationships.is_empty() {
        println!("\nRelated conditions");
        for relationship in &summary.condition_relationships {
            println!("  {} -> {}", relationship.condition, relationship.related_to);
        }
    }
}

fn print_conditions(conditions: &[ConditionDetail]) {
    if conditions.is_empty() {
        println!("No conditions recorded.");
        return;
    }
    for condition in conditions {
        match &condition.onset {
            Some(onset) => println!("{} [{}] since {}", condition.display, condition.code, onset),
            None => println!("{} [{}]", condition.display, condition.code),
        }
        if let Some(system) = &condition.coding_system {
            println!("  coding: {}", system);
        }
        for affected in &condition.body_systems {
            match &affected.subsystem {
                Some(subsystem) => println!("  affects {} ({})", affected.system, subsystem),
                None => println!("  affects {}", affected.system),
            }
        }
    }
}

fn print_medications(medications: &[MedicationDetail]) {
    if medications.is_empty() {
        println!("No medications recorded.");
        return;
    }
    for medication in medications {
        println!("{} [{}]", medication.display, medication.code);
        if !medication.treats.is_empty() {
            println!("  treats {}", medication.treats.join(", "));
        }
        for target in &medication.targets {
            match &target.action {
                Some(action) => println!("  targets {}: {}", target.system, action),
                None => println!("  targets {}", target.system),
            }
        }
    }
}

fn print_body_systems(systems: &[BodySystemSummary]) {
    if systems.is_empty() {
        println!("No body systems. Run `healthgraph seed` first.");
        return;
    }
    for system in systems {
        println!("{:<22} {}", system.system, system.description);
    }
}

fn print_patients(patients: &[PatientListing]) {
    if patients.is_empty() {
        println!("No patients found.");
        return;
    }
    for patient in patients {
        println!(
            "{:<24} {:<28} {:<8} {:<12} {} conditions",
            patient.id,
            patient.name,
            patient.gender.as_deref().unwrap_or("-"),
            patient.birth_date.as_deref().unwrap_or("-"),
            patient.condition_count
        );
    }
}
