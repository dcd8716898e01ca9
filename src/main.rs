mod checker;
mod compiler;
mod config;
mod core;
mod error;
mod judger;
mod languages;
mod report;
mod runner;
mod samples;
mod submit;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, Overrides};
use crate::error::JudgeError;
use crate::judger::{SampleReport, TestSummary};
use crate::languages::Language;
use crate::report::{indented, Reporter};
use crate::runner::{RuntimeContext, SystemLauncher, Toolchains};
use crate::samples::{
    CachedSource, DirCache, LocalSource, MemoryCache, RemoteSource, SampleSource,
};
use crate::submit::{Credentials, HttpJudge, Submission, SubmissionState};

#[derive(Parser, Debug)]
#[clap(
    name = "solcheck",
    version,
    about = "Test solutions against sample data and submit them to a judge"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a solution on local and remote samples
    Test {
        file: PathBuf,

        /// Problem id (defaults to the file stem)
        #[clap(short, long)]
        problem: Option<String>,

        #[clap(flatten)]
        flags: RunFlags,
    },

    /// Verify a solution on the samples, then submit it
    Submit {
        file: PathBuf,

        /// Problem id (defaults to the file stem)
        #[clap(short, long)]
        problem: Option<String>,

        /// Don't ask for confirmation
        #[clap(short = 'y', long)]
        yes: bool,

        /// Submit without running the samples first
        #[clap(long)]
        force: bool,

        #[clap(flatten)]
        flags: RunFlags,
    },

    /// Manage cached remote samples
    Cache {
        #[clap(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Remove cached samples for one problem, or for every problem
    Clear { problem: Option<String> },
}

#[derive(Args, Debug, Clone, Default)]
struct RunFlags {
    /// Compare output against expected output
    #[clap(long, overrides_with = "no_diff")]
    diff: bool,
    #[clap(long, overrides_with = "diff")]
    no_diff: bool,

    /// Ignore debug lines in the output when comparing
    #[clap(long, overrides_with = "no_ignore_debug")]
    ignore_debug: bool,
    #[clap(long, overrides_with = "ignore_debug")]
    no_ignore_debug: bool,

    #[clap(short, long)]
    verbose: bool,

    /// Number of samples to run at once
    #[clap(short, long)]
    jobs: Option<usize>,

    /// Always download remote samples
    #[clap(long)]
    no_cache: bool,
}

fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl RunFlags {
    fn overrides(&self) -> Overrides {
        Overrides {
            diff: toggle(self.diff, self.no_diff),
            ignore_debug: toggle(self.ignore_debug, self.no_ignore_debug),
            verbose: self.verbose.then_some(true),
            force: None,
            jobs: self.jobs,
            no_cache: self.no_cache,
        }
    }
}

impl Cli {
    fn verbose(&self) -> bool {
        match &self.command {
            Commands::Test { flags, .. } | Commands::Submit { flags, .. } => flags.verbose,
            Commands::Cache { .. } => false,
        }
    }
}

/// The solution file and the problem it solves
struct Target {
    file: PathBuf,
    dir: PathBuf,
    file_name: String,
    stem: String,
    problem: String,
}

impl Target {
    async fn resolve(file: &Path, problem: Option<String>) -> Result<Self> {
        let file = tokio::fs::canonicalize(file)
            .await
            .with_context(|| format!("cannot open {}", file.display()))?;
        let dir = file.parent().unwrap_or(Path::new(".")).to_path_buf();
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let problem = match problem {
            Some(problem) => problem,
            None => {
                info!("No problem name specified, guessing '{}'", stem);
                stem.clone()
            }
        };

        Ok(Self {
            file,
            dir,
            file_name,
            stem,
            problem,
        })
    }
}

fn load_config(dir: &Path, overrides: &Overrides) -> Result<Config> {
    let mut config = Config::load(dir).context("failed to load configuration")?;
    config.apply_overrides(overrides);
    Ok(config)
}

fn sample_sources(config: &Config, stem: &str, client: reqwest::Client) -> Vec<Box<dyn SampleSource>> {
    let remote = RemoteSource::new(client, config.judge.base_url.clone());
    let remote: Box<dyn SampleSource> = match (&config.cache_dir, config.use_cache) {
        (_, false) => Box::new(remote),
        (Some(dir), true) => Box::new(CachedSource::new(remote, Box::new(DirCache::new(dir)))),
        (None, true) => Box::new(CachedSource::new(remote, Box::new(MemoryCache::new()))),
    };

    vec![Box::new(LocalSource::new().with_alias(stem)), remote]
}

/// Run the solution on every sample and print the results
async fn verify(config: &Config, target: &Target, client: reqwest::Client) -> Result<TestSummary> {
    let ctx = RuntimeContext::new(
        config.clone(),
        Arc::new(SystemLauncher::new()),
        Toolchains::from_env(),
    );
    let sources = sample_sources(config, &target.stem, client);
    let reporter = Reporter::new(config.color, config.verbose);

    let summary = judger::test_solution(
        &ctx,
        &target.file,
        &target.problem,
        &sources,
        &mut |report: &SampleReport| {
            if let Err(e) = reporter.sample(&mut io::stdout().lock(), report) {
                warn!("failed to print report: {}", e);
            }
        },
    )
    .await?;

    reporter.summary(&mut io::stdout().lock(), &summary)?;
    Ok(summary)
}

async fn cmd_test(file: &Path, problem: Option<String>, flags: &RunFlags) -> Result<ExitCode> {
    let target = Target::resolve(file, problem).await?;
    let config = load_config(&target.dir, &flags.overrides())?;
    let judge = HttpJudge::new(config.judge.base_url.clone())?;

    verify(&config, &target, judge.http_client()).await?;
    Ok(ExitCode::SUCCESS)
}

fn submit_question(target: &Target, language: Language) -> String {
    format!(
        "Submit {} to problem {} as {}?",
        target.file_name, target.problem, language
    )
}

async fn confirm(question: String) -> Result<bool> {
    let answer = tokio::task::spawn_blocking(move || {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(question)
            .default(false)
            .interact()
    })
    .await??;

    Ok(answer)
}

async fn cmd_submit(
    file: &Path,
    problem: Option<String>,
    yes: bool,
    force: bool,
    flags: &RunFlags,
) -> Result<ExitCode> {
    let target = Target::resolve(file, problem).await?;
    let mut overrides = flags.overrides();
    overrides.force = force.then_some(true);
    let config = load_config(&target.dir, &overrides)?;

    // Before anything touches the network
    let language = Language::from_path(&target.file)?;
    let judge = HttpJudge::new(config.judge.base_url.clone())?;

    if !config.force {
        let summary = verify(&config, &target, judge.http_client()).await?;
        if !summary.all_clean() {
            eprintln!("Samples failed, not submitting (use --force to submit anyway)");
            return Ok(ExitCode::from(1));
        }
    }

    let credentials = Credentials::from_config(&config.judge)?;

    if !yes {
        if !confirm(submit_question(&target, language)).await? {
            println!("Not submitted");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let submission = Submission {
        problem: target.problem.clone(),
        language,
        file_name: target.file_name.clone(),
        source: tokio::fs::read_to_string(&target.file)
            .await
            .with_context(|| format!("cannot read {}", target.file.display()))?,
    };
    let id = submit::submit(&judge, &credentials, &submission).await?;
    println!("Submission: {}", judge.submission_url(&id));

    let reporter = Reporter::new(config.color, config.verbose);
    let mut last_line = String::new();
    let state = submit::track(
        &judge,
        &id,
        config.judge.poll_interval,
        &mut |state: &SubmissionState| {
            let line = reporter.submission(state);
            if line != last_line {
                println!("{}", line);
                last_line = line;
            }
        },
    )
    .await?;

    Ok(if state.is_accepted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

async fn cmd_cache_clear(problem: Option<String>) -> Result<ExitCode> {
    let dir = std::env::current_dir()?;
    let config = load_config(&dir, &Overrides::default())?;
    let cache_dir = config
        .cache_dir
        .context("no cache directory available on this platform")?;

    let removed = DirCache::new(&cache_dir).clear(problem.as_deref()).await?;
    println!("Removed {} cached entr{}", removed, if removed == 1 { "y" } else { "ies" });
    Ok(ExitCode::SUCCESS)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Test {
            file,
            problem,
            flags,
        } => cmd_test(&file, problem, &flags).await,
        Commands::Submit {
            file,
            problem,
            yes,
            force,
            flags,
        } => cmd_submit(&file, problem, yes, force, &flags).await,
        Commands::Cache {
            action: CacheCommand::Clear { problem },
        } => cmd_cache_clear(problem).await,
    }
}

/// Print a fatal error as one line and pick the exit code
fn report_error(err: &anyhow::Error) -> ExitCode {
    eprintln!("error: {:#}", err);
    match err.downcast_ref::<JudgeError>() {
        Some(JudgeError::CompileFailed { stderr, .. }) => {
            if !stderr.is_empty() {
                eprintln!("{}", indented(stderr));
            }
            ExitCode::from(1)
        }
        _ => ExitCode::from(2),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let default_directive = if cli.verbose() {
        "solcheck=debug"
    } else {
        "solcheck=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .init();

    tokio::select! {
        result = run(cli) => match result {
            Ok(code) => code,
            Err(e) => report_error(&e),
        },
        _ = tokio::signal::ctrl_c() => {
            // The command future is dropped by now, taking build directories
            // and child processes with it. A pending stdin read would keep the
            // runtime alive, so leave right away.
            eprintln!("Interrupted");
            std::process::exit(130);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_test_command() {
        let cli = Cli::parse_from(["solcheck", "test", "hello.py", "-p", "hello", "--no-diff", "-j", "4"]);
        match cli.command {
            Commands::Test {
                file,
                problem,
                flags,
            } => {
                assert_eq!(file, PathBuf::from("hello.py"));
                assert_eq!(problem.as_deref(), Some("hello"));
                let overrides = flags.overrides();
                assert_eq!(overrides.diff, Some(false));
                assert_eq!(overrides.ignore_debug, None);
                assert_eq!(overrides.jobs, Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_last_toggle_wins() {
        let cli = Cli::parse_from(["solcheck", "test", "a.py", "--no-ignore-debug", "--ignore-debug"]);
        let Commands::Test { flags, .. } = cli.command else {
            panic!("expected test command");
        };
        assert_eq!(flags.overrides().ignore_debug, Some(true));
    }

    #[test]
    fn test_cli_parses_submit_and_cache() {
        let cli = Cli::parse_from(["solcheck", "submit", "a.cpp", "-y", "--force", "-v"]);
        assert!(cli.verbose());
        assert!(matches!(
            cli.command,
            Commands::Submit {
                yes: true,
                force: true,
                ..
            }
        ));

        let cli = Cli::parse_from(["solcheck", "cache", "clear", "hello"]);
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheCommand::Clear { problem: Some(_) }
            }
        ));
    }

    #[test]
    fn test_submit_question_names_file_problem_and_language() {
        let target = Target {
            file: PathBuf::from("/work/hello.py"),
            dir: PathBuf::from("/work"),
            file_name: "hello.py".to_string(),
            stem: "hello".to_string(),
            problem: "hi".to_string(),
        };
        assert_eq!(
            submit_question(&target, Language::Python),
            "Submit hello.py to problem hi as Python?"
        );
    }

    #[test]
    fn test_compile_failure_exits_with_one() {
        let err = anyhow::Error::new(JudgeError::CompileFailed {
            exit_code: 1,
            stderr: "oops".to_string(),
        })
        .context("while testing");
        assert_eq!(report_error(&err), ExitCode::from(1));

        let err = anyhow::Error::new(JudgeError::NoSamples {
            problem: "x".to_string(),
        });
        assert_eq!(report_error(&err), ExitCode::from(2));
    }
}
