use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm};
use file_court::analysis;
use file_court::court::{render_text_report, write_reports, Corpus, CourtReport, CourtSummary, FileCourt};
use file_court::quarantine::{status_report, FileOutcome, QuarantineManager};
use file_court::ui::{percent, spinner, Theme};
use file_court::{CourtConfig, Mode};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "file-court")]
#[command(version, about = "Adversarial file-retention analyzer", long_about = None)]
pub struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only, no progress bars)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that reads a repository.
#[derive(clap::Args, Debug, Clone)]
pub struct RepoArgs {
    /// Repository root
    #[arg(value_name = "REPO", default_value = ".")]
    pub repo: PathBuf,

    /// Extra entry-point file name for reachability (repeatable)
    #[arg(short = 'e', long = "entry-point", value_name = "NAME")]
    pub entry_points: Vec<String>,

    /// Extra glob pattern to exclude (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Configuration file (default: <REPO>/file-court.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Skip source-control history
    #[arg(long)]
    pub no_git: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Screen every file, try the suspects and report verdicts
    Analyze {
        #[command(flatten)]
        repo: RepoArgs,

        /// Suspicion threshold for a full trial
        #[arg(short, long, value_name = "0..1")]
        threshold: Option<f64>,

        /// Favor removal instead of retention
        #[arg(long)]
        aggressive: bool,

        /// Run trials on one thread
        #[arg(long)]
        sequential: bool,

        /// Write reports into this directory instead of printing
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Print the structured report as JSON
        #[arg(long)]
        json: bool,

        /// Quarantine files sentenced to QUARANTINE or DELETE
        #[arg(long)]
        quarantine: bool,

        /// Show what would be quarantined without moving anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Quarantine session identifier (default: timestamp)
        #[arg(long, value_name = "ID")]
        session: Option<String>,
    },

    /// Dependency graph statistics, orphans and cycles
    Graph {
        #[command(flatten)]
        repo: RepoArgs,

        /// Print Graphviz DOT instead of statistics
        #[arg(long)]
        dot: bool,
    },

    /// Topic clusters, doc/code links and near-duplicates
    Semantics {
        #[command(flatten)]
        repo: RepoArgs,

        #[arg(long)]
        json: bool,
    },

    /// Quick relevance scan without trials
    Scan {
        #[command(flatten)]
        repo: RepoArgs,

        #[arg(long)]
        json: bool,

        /// Write the report to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Inspect and manage quarantined files
    Quarantine {
        /// Repository root
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        #[command(subcommand)]
        action: QuarantineAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum QuarantineAction {
    /// List quarantined files, newest first
    List {
        #[arg(long, value_name = "ID")]
        session: Option<String>,
    },
    /// Counts of quarantined, restored and deleted files
    Summary,
    /// Markdown status report
    Report,
    /// Move one file back to its original path
    Restore {
        path: String,
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Move every file of a session back
    RestoreSession {
        session_id: String,
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Permanently delete a quarantined file
    Delete {
        path: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove session directories older than N days
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: i64,
        #[arg(short, long)]
        yes: bool,
    },
}

pub fn run(args: Args) -> Result<()> {
    let theme = Theme::from_flag(args.no_color);
    if args.no_color {
        colored::control::set_override(false);
    }
    let console = Console {
        theme,
        quiet: args.quiet,
    };

    match args.command {
        Commands::Analyze {
            repo,
            threshold,
            aggressive,
            sequential,
            output,
            json,
            quarantine,
            dry_run,
            yes,
            session,
        } => {
            let mut config = load_config(&repo)?;
            if let Some(threshold) = threshold {
                config.suspicion_threshold = threshold;
            }
            if aggressive {
                config.mode = Mode::Aggressive;
            }
            if sequential {
                config.parallel = false;
            }
            let options = AnalyzeOptions {
                output,
                json,
                quarantine,
                dry_run,
                yes,
                session,
            };
            analyze(&console, config, &options)
        }
        Commands::Graph { repo, dot } => show_graph(&console, &repo, dot),
        Commands::Semantics { repo, json } => show_semantics(&console, &repo, json),
        Commands::Scan { repo, json, output } => run_scan(&console, &repo, json, output),
        Commands::Quarantine { repo, action } => manage_quarantine(&console, &repo, action),
    }
}

struct Console {
    theme: Theme,
    quiet: bool,
}

struct AnalyzeOptions {
    output: Option<PathBuf>,
    json: bool,
    quarantine: bool,
    dry_run: bool,
    yes: bool,
    session: Option<String>,
}

fn load_config(repo: &RepoArgs) -> Result<CourtConfig> {
    let mut config = match &repo.config {
        Some(path) => {
            let mut config = CourtConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            config.repo_root = repo.repo.clone();
            config
        }
        None => CourtConfig::load(&repo.repo).context("Failed to load configuration")?,
    };
    config.entry_points.extend(repo.entry_points.iter().cloned());
    config.exclude.extend(repo.exclude.iter().cloned());
    if repo.no_git {
        config.git.enabled = false;
    }
    config.validate()?;
    Ok(config)
}

fn build_corpus(console: &Console, repo: &RepoArgs) -> Result<Corpus> {
    let mut config = load_config(repo)?;
    // Graph, semantic and scan views never use commit history.
    config.git.enabled = false;
    let progress = spinner("Reading repository", !console.quiet);
    let corpus = Corpus::build(&config);
    progress.finish_and_clear();
    Ok(corpus?)
}

fn confirm(prompt: &str) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Confirmation needs an interactive terminal; pass --yes")
}

fn print_outcomes(console: &Console, verb: &str, outcomes: &[FileOutcome]) {
    for outcome in outcomes {
        match &outcome.failure {
            None => {
                let suffix = if outcome.dry_run { " (dry run)" } else { "" };
                let destination = outcome
                    .quarantine_path
                    .as_deref()
                    .map(|q| format!(" <-> {}", q))
                    .unwrap_or_default();
                println!(
                    "  {} {}{}{}",
                    console.theme.success("✓"),
                    outcome.path,
                    destination,
                    suffix
                );
            }
            Some(failure) => println!("  {} {}: {}", console.theme.failure("✗"), outcome.path, failure),
        }
    }
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    println!("{} {}/{} files", verb, succeeded, outcomes.len());
}

fn analyze(console: &Console, config: CourtConfig, options: &AnalyzeOptions) -> Result<()> {
    let repo_root = config.repo_root.clone();
    let threshold = config.suspicion_threshold;

    let progress = spinner("Building dependency graph and semantic index", !console.quiet);
    let court = FileCourt::new(config);
    progress.finish_and_clear();
    let mut court = court.context("Failed to open the repository")?.with_progress(!console.quiet);

    let suspects = court.identify_suspects(threshold);
    court.run_all_trials(&suspects);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&CourtReport::build(&court))?);
    } else if let Some(dir) = &options.output {
        let paths = write_reports(&court, dir)
            .with_context(|| format!("Failed to write reports to {}", dir.display()))?;
        println!("Text report: {}", paths.text.display());
        println!("JSON report: {}", paths.json.display());
        if let Some(list) = paths.quarantine_list {
            println!("Quarantine list: {}", list.display());
        }
    } else {
        println!("{}", render_text_report(&court));
    }

    if !options.json {
        let summary = CourtSummary::from_trials(court.trials());
        println!();
        println!("{}", console.theme.heading("COURT ADJOURNED"));
        println!("   Trials: {}", summary.total_cases);
        for trial in court.trials().iter().filter(|t| t.verdict.decision.removes_file()) {
            println!(
                "   {} {} ({})",
                console.theme.decision(trial.verdict.decision),
                trial.file_path,
                percent(trial.verdict.confidence)
            );
        }
        println!("   Quarantine: {}", summary.verdicts.quarantine + summary.verdicts.delete);
        println!("   Review: {}", summary.verdicts.review_needed);
        println!("   Keep: {}", summary.verdicts.keep);
    }

    if options.quarantine {
        quarantine_verdicts(console, &court, &repo_root, options)?;
    }
    Ok(())
}

fn quarantine_verdicts(
    console: &Console,
    court: &FileCourt,
    repo_root: &Path,
    options: &AnalyzeOptions,
) -> Result<()> {
    let files = court.quarantine_list();
    if files.is_empty() {
        println!("No files sentenced to quarantine.");
        return Ok(());
    }
    if !options.dry_run && !options.yes {
        let prompt = format!("Move {} files to quarantine?", files.len());
        if !confirm(&prompt)? {
            println!("Quarantine cancelled.");
            return Ok(());
        }
    }

    let mut manager = QuarantineManager::open(repo_root);
    let outcomes = manager
        .move_to_quarantine(
            &files,
            &court.quarantine_reasons(),
            options.session.as_deref(),
            options.dry_run,
        )
        .context("Failed to record the quarantine session")?;
    let verb = if options.dry_run { "Would quarantine" } else { "Quarantined" };
    print_outcomes(console, verb, &outcomes);
    Ok(())
}

fn show_graph(console: &Console, repo: &RepoArgs, dot: bool) -> Result<()> {
    let corpus = build_corpus(console, repo)?;
    let graph = &corpus.graph;
    let orphaned = graph.orphaned_files(&corpus.entry_points);

    if dot {
        println!("{}", graph.to_dot(&orphaned));
        return Ok(());
    }

    let theme = &console.theme;
    println!("{}", theme.heading("Dependency graph"));
    println!("  Files: {}", graph.node_count());
    println!("  Edges: {}", graph.edge_count());

    println!("\n{}", theme.heading("Most depended upon"));
    for (path, count) in graph.most_depended_upon(10) {
        println!("  {:4}  {}", count, path);
    }

    println!("\n{} ({})", theme.heading("Orphaned files"), orphaned.len());
    for path in &orphaned {
        println!("  {}", path);
    }

    let cycles = graph.circular_dependencies();
    println!("\n{} ({})", theme.heading("Circular dependencies"), cycles.len());
    for cycle in &cycles {
        println!("  {}", cycle.join(" -> "));
    }
    Ok(())
}

fn show_semantics(console: &Console, repo: &RepoArgs, json: bool) -> Result<()> {
    let corpus = build_corpus(console, repo)?;
    let report = corpus.semantics.report();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let theme = &console.theme;
    println!("{} ({} files)", theme.heading("Semantic analysis"), report.total_files);

    println!("\n{} ({})", theme.heading("Clusters"), report.clusters.len());
    for cluster in &report.clusters {
        println!("  [{}] {}", cluster.topic, cluster.files.join(", "));
    }

    println!("\n{}", theme.heading("Documentation links"));
    for link in &report.doc_links {
        println!("  {}", serde_json::to_string(link)?);
    }

    println!("\n{} ({})", theme.heading("Duplicates"), report.duplicates.len());
    for pair in &report.duplicates {
        println!(
            "  {} ~ {} ({})",
            pair.first,
            pair.second,
            percent(pair.similarity)
        );
    }

    if !report.warnings.is_empty() {
        println!("\n{}", theme.heading("Warnings"));
        for warning in &report.warnings {
            println!("  {}", theme.muted(warning));
        }
    }
    Ok(())
}

fn run_scan(console: &Console, repo: &RepoArgs, json: bool, output: Option<PathBuf>) -> Result<()> {
    let corpus = build_corpus(console, repo)?;
    let report = analysis::scan(&corpus);
    let rendered = if json {
        serde_json::to_string_pretty(&report)?
    } else {
        report.to_markdown()
    };
    match output {
        Some(path) => {
            fs::write(&path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn manage_quarantine(console: &Console, repo: &Path, action: QuarantineAction) -> Result<()> {
    if !repo.is_dir() {
        anyhow::bail!("Repository root {} is not a directory", repo.display());
    }
    let mut manager = QuarantineManager::open(repo);
    let theme = &console.theme;

    match action {
        QuarantineAction::List { session } => {
            let files = manager.list(session.as_deref());
            if files.is_empty() {
                println!("No quarantined files.");
            }
            for (path, record) in files {
                println!("[{}] {} (session: {})", record.status(), path, record.session_id);
            }
        }
        QuarantineAction::Summary => {
            let summary = manager.summary();
            println!("{}", theme.heading("Quarantine summary"));
            println!("  Total:    {}", summary.total_quarantined);
            println!("  Restored: {}", summary.restored);
            println!("  Deleted:  {}", summary.deleted);
            println!("  Pending:  {}", summary.pending);
            println!("  Sessions: {}", summary.sessions);
            println!("  Updated:  {}", summary.last_updated);
        }
        QuarantineAction::Report => println!("{}", status_report(&manager)),
        QuarantineAction::Restore { path, dry_run } => {
            let outcome = manager.restore_file(&path, dry_run);
            let verb = if dry_run { "Would restore" } else { "Restored" };
            print_outcomes(console, verb, std::slice::from_ref(&outcome));
        }
        QuarantineAction::RestoreSession { session_id, dry_run } => {
            let outcomes = manager.restore_session(&session_id, dry_run);
            let verb = if dry_run { "Would restore" } else { "Restored" };
            print_outcomes(console, verb, &outcomes);
        }
        QuarantineAction::Delete { path, yes } => {
            if !yes && !confirm(&format!("Permanently delete the quarantined copy of {}?", path))? {
                println!("Delete cancelled.");
                return Ok(());
            }
            let outcome = manager.permanently_delete(&path);
            print_outcomes(console, "Deleted", std::slice::from_ref(&outcome));
        }
        QuarantineAction::Cleanup { days, yes } => {
            if !yes && !confirm(&format!("Remove quarantine sessions older than {} days?", days))? {
                println!("Cleanup cancelled.");
                return Ok(());
            }
            let report = manager.cleanup_old_sessions(days)?;
            println!(
                "Cleaned {} sessions older than {}",
                report.sessions_cleaned, report.cutoff_date
            );
        }
    }
    Ok(())
}
