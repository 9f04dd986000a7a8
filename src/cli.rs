//! The `build`/`compile`/`check` subcommand surface (SPEC_FULL.md §6),
//! modeled on `main.py`'s `argparse` subcommands and the teacher's
//! `clap::Parser`-derived `Args`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "apisan",
    about = "Mines API-usage bug reports from symbolic-execution traces"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Invokes the underlying analyzer over a whole build.
    Build(BuildArgs),
    /// Invokes the underlying analyzer over a single compile command.
    Compile(CompileArgs),
    /// Runs a checker over previously captured traces.
    Check(CheckArgs),
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Build command to run under the analyzer, e.g. "make".
    pub command: Vec<String>,

    #[arg(long)]
    pub outdir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct CompileArgs {
    /// Single compile command to run under the analyzer.
    pub command: Vec<String>,

    #[arg(long)]
    pub outdir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Checker to run: "missing_check" or "thread_safety".
    pub checker: String,

    #[arg(long = "db")]
    pub db: PathBuf,

    #[arg(long)]
    pub filename: Option<PathBuf>,

    #[arg(long, conflicts_with = "cache")]
    pub skip_cache: bool,

    #[arg(long, conflicts_with = "skip_cache")]
    pub cache: bool,

    #[arg(long)]
    pub threshold: Option<f64>,

    #[arg(long)]
    pub reference: Option<usize>,
}

/// Renders the build/compile command line the underlying analyzer would be
/// invoked with. This crate stubs the invocation boundary: it models the
/// command, it does not shell out to `scan-build` (SPEC_FULL.md §1).
pub fn analyzer_command_line(prefix: &str, user_command: &[String]) -> Vec<String> {
    let mut line = vec![
        prefix.to_string(),
        "--use-analyzer".to_string(),
        "apisan".to_string(),
    ];
    line.extend(user_command.iter().cloned());
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_compile_resolve_to_the_same_analyzer_prefix() {
        let command = vec!["make".to_string(), "-j4".to_string()];
        let line = analyzer_command_line("scan-build", &command);
        assert_eq!(line[0], "scan-build");
        assert!(line.contains(&"-j4".to_string()));
    }
}
