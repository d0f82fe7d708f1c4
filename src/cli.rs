use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sklint",
    version,
    about = "Usage analyzer for ServiceKit dependency injection",
    after_help = r#"Examples:
  sklint check --repo .
  sklint check --repo . --format sarif > sklint.sarif
  sklint fixes --repo . --path Assets/Scripts/Player.cs --line 12
  sklint fix --repo . --rule SK004 --prefer SK004_UseExecuteWithCancellationAsync
  sklint fix --repo . --dry-run
  sklint rules
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze C# sources and print diagnostics.
    Check {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Token expression named in cancellation messages.
        #[arg(long)]
        token: Option<String>,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
    },
    /// List the fixes offered for diagnostics on one line.
    Fixes {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// File path, relative to the repo or absolute.
        #[arg(long)]
        path: PathBuf,
        /// 1-based line number.
        #[arg(long)]
        line: i64,
        /// Token expression used by cancellation fixes.
        #[arg(long)]
        token: Option<String>,
    },
    /// Apply fixes across the repository.
    Fix {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Only fix these rules (e.g. SK004). Repeatable.
        #[arg(long = "rule")]
        rules: Vec<String>,
        /// Equivalence key to pick when a diagnostic offers several fixes. Repeatable.
        #[arg(long)]
        prefer: Vec<String>,
        /// Token expression used by cancellation fixes.
        #[arg(long)]
        token: Option<String>,
        /// Upper bound on analyze-and-fix rounds.
        #[arg(long)]
        max_passes: Option<usize>,
        /// Report what would change without writing files.
        #[arg(long)]
        dry_run: bool,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
    },
    /// Print rule descriptors as JSON.
    Rules,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Sarif,
}
