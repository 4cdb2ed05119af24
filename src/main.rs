use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chainscope::analysis::{DirectorySource, GraphBuilder, MetadataCatalog};
use chainscope::config::{self, Settings, DOCUMENTED_CONFIG};
use chainscope::export::ExportData;
use chainscope::output::OutputManager;
use chainscope::parser::ParserRegistry;
use chainscope::risk::RiskAnalyzer;

#[derive(Parser)]
#[command(name = "chainscope")]
#[command(author, version, about = "Supply-chain dependency analyzer with heuristic risk scoring", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "CHAINSCOPE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output directory override
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the dependencies of a local repository
    Analyze {
        /// Repository to analyze
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Deepest dependency level to expand
        #[arg(short = 'd', long, conflicts_with = "unbounded")]
        max_depth: Option<usize>,

        /// Expand dependencies without a depth limit
        #[arg(long)]
        unbounded: bool,

        /// Maximum number of components, root included
        #[arg(short = 'n', long)]
        max_components: Option<usize>,

        /// Name of the root component (defaults to the directory name)
        #[arg(short, long)]
        project_name: Option<String>,

        /// JSON file with per-component popularity, release age and CVE counts
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Skip the root's development dependencies
        #[arg(long)]
        no_dev: bool,
    },
    /// List all analyzed projects
    ListProjects,
    /// Summarize the output directory
    Status,
    /// Show the output files of one project
    ProjectFiles {
        /// Project name
        name: String,
    },
    /// Delete output files older than the given age
    Cleanup {
        /// Age in days
        #[arg(long, default_value_t = 30)]
        days: u64,
    },
    /// Print the documented default configuration
    Config {
        /// Write it to this path instead of stdout
        #[arg(long)]
        write: Option<PathBuf>,
    },
    /// Show version information
    Version,
}

struct AnalyzeArgs {
    path: PathBuf,
    max_depth: Option<usize>,
    unbounded: bool,
    max_components: Option<usize>,
    project_name: Option<String>,
    metadata: Option<PathBuf>,
    no_dev: bool,
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chainscope={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&Path>, output_dir: Option<PathBuf>) -> Result<Settings> {
    let mut settings = config::load(path).context("failed to load configuration")?;
    if let Some(dir) = output_dir {
        settings.output.base_directory = dir;
    }
    Ok(settings)
}

fn analyze(mut settings: Settings, args: AnalyzeArgs) -> Result<()> {
    if args.unbounded {
        settings.analysis.max_depth = None;
    } else if let Some(depth) = args.max_depth {
        settings.analysis.max_depth = Some(depth);
    }
    if let Some(limit) = args.max_components {
        settings.analysis.max_components = limit;
    }
    if args.no_dev {
        settings.analysis.include_dev_dependencies = false;
    }
    settings.validate().context("invalid analysis options")?;

    let catalog = match &args.metadata {
        Some(path) => MetadataCatalog::load(path)
            .with_context(|| format!("failed to load metadata from {}", path.display()))?,
        None => MetadataCatalog::new(),
    };

    let registry = ParserRegistry::with_defaults();
    let source = DirectorySource::new(&args.path, settings.analysis.dependency_dirs.clone())
        .with_context(|| format!("cannot analyze {}", args.path.display()))?;

    let analysis = GraphBuilder::new(&settings.analysis, &registry)
        .with_catalog(&catalog)
        .build(&source, args.project_name.as_deref())
        .context("dependency graph construction failed")?;

    let analyzer = RiskAnalyzer::new(settings.risk.weights, settings.risk.high_risk_threshold)
        .with_critical_min_dependents(settings.risk.critical_min_dependents);
    let assessment = analyzer.assess(&analysis.graph);

    let project = analysis.graph.root().name.clone();
    let data = ExportData::new(&project, &analysis, &assessment, &settings.analysis);
    let mut output = OutputManager::new(&settings.output.base_directory);
    let files = output.write_run(&data).context("failed to write analysis outputs")?;

    let stats = analysis.graph.stats();
    println!("Project:      {} ({})", project, analysis.graph.root().ecosystem);
    println!(
        "Components:   {} ({} edges, deepest level {})",
        stats.total_components, stats.total_edges, stats.deepest_level
    );
    println!(
        "Overall risk: {} ({})",
        assessment.overall, assessment.overall_level
    );
    println!(
        "High risk:    {} of {} ({:.1}%)",
        assessment.high_risk_count,
        assessment.components.len(),
        assessment.high_risk_percentage
    );
    if let Some(path) = assessment.critical_paths.first() {
        println!(
            "Critical:     {} (impact {:.1}, {} dependents)",
            path.component, path.impact, path.total_dependents
        );
    }
    if !analysis.failures.is_empty() {
        println!("Skipped:      {} manifest(s) failed to parse", analysis.failures.len());
    }
    if analysis.dropped_components > 0 {
        println!(
            "Dropped:      {} component(s) over the limit of {}",
            analysis.dropped_components, settings.analysis.max_components
        );
    }
    println!();
    for path in files.paths() {
        println!("  {}", path.display());
    }

    Ok(())
}

fn status(output: &OutputManager) {
    let summary = output.summary();
    println!("Output directory: {}", summary.base_directory.display());
    println!("Projects:         {}", summary.total_projects);
    for (category, count) in &summary.files_per_category {
        println!("  {:<8} {} file(s)", category, count);
    }
    if !summary.recent_projects.is_empty() {
        println!("Recent:           {}", summary.recent_projects.join(", "));
    }
}

fn write_config(path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path else {
        print!("{}", DOCUMENTED_CONFIG);
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .with_context(|| format!("refusing to write {}", path.display()))?;
    file.write_all(DOCUMENTED_CONFIG.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("Wrote {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Analyze {
            path,
            max_depth,
            unbounded,
            max_components,
            project_name,
            metadata,
            no_dev,
        } => {
            let settings = load_settings(cli.config.as_deref(), cli.output_dir)?;
            analyze(
                settings,
                AnalyzeArgs {
                    path,
                    max_depth,
                    unbounded,
                    max_components,
                    project_name,
                    metadata,
                    no_dev,
                },
            )
        }
        Commands::ListProjects => {
            let settings = load_settings(cli.config.as_deref(), cli.output_dir)?;
            let projects = OutputManager::new(&settings.output.base_directory).list_projects();
            if projects.is_empty() {
                println!("No analyzed projects found");
            }
            for project in projects {
                println!("{}", project);
            }
            Ok(())
        }
        Commands::Status => {
            let settings = load_settings(cli.config.as_deref(), cli.output_dir)?;
            status(&OutputManager::new(&settings.output.base_directory));
            Ok(())
        }
        Commands::ProjectFiles { name } => {
            let settings = load_settings(cli.config.as_deref(), cli.output_dir)?;
            let files = OutputManager::new(&settings.output.base_directory).project_files(&name);
            if files.values().all(Vec::is_empty) {
                bail!("no output files for project '{}'", name);
            }
            for (category, paths) in files {
                println!("{}:", category);
                for path in paths {
                    println!("  {}", path.display());
                }
            }
            Ok(())
        }
        Commands::Cleanup { days } => {
            let settings = load_settings(cli.config.as_deref(), cli.output_dir)?;
            let removed = OutputManager::new(&settings.output.base_directory)
                .cleanup_older_than(days)
                .context("cleanup failed")?;
            println!("Removed {} file(s) older than {} day(s)", removed.len(), days);
            Ok(())
        }
        Commands::Config { write } => write_config(write),
        Commands::Version => {
            println!("chainscope v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
