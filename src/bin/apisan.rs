use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use apisan::checker::Checker;
use apisan::checkers::{MissingCheck, ThreadSafety};
use apisan::cli::{analyzer_command_line, CheckArgs, Cli, Command};
use apisan::config::{Config, ConfigOverlay};
use apisan::explorer::Explorer;
use apisan::render::{humanize_range, render_report};

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Build(args) => {
            let line = analyzer_command_line("scan-build", &args.command);
            println!("{}", line.join(" "));
            ExitCode::SUCCESS
        }
        Command::Compile(args) => {
            let line = analyzer_command_line("scan-build", &args.command);
            println!("{}", line.join(" "));
            ExitCode::SUCCESS
        }
        Command::Check(args) => handle_check(args),
    }
}

fn handle_check(args: CheckArgs) -> ExitCode {
    let overlay = ConfigOverlay {
        threshold: args.threshold,
        reference: args.reference,
        skip_cache: Some(args.skip_cache),
    };
    let config = match Config::load(overlay) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let checker: Box<dyn Checker> = match args.checker.as_str() {
        "missing_check" => Box::new(MissingCheck::new(config.threshold)),
        "thread_safety" => Box::new(ThreadSafety::new(config.threshold)),
        other => {
            eprintln!("unknown checker {other:?}");
            return ExitCode::FAILURE;
        }
    };

    let explorer = Explorer::new(checker.as_ref(), config.skip_cache);
    let reports = if let Some(filename) = &args.filename {
        explorer.explore_single_file(filename, &args.db);
        Vec::new()
    } else {
        explorer.explore_parallel(&args.db)
    };

    print_bugs(&reports, config.reference);
    ExitCode::SUCCESS
}

fn print_bugs(reports: &[apisan::context::BugReport], reference_count: usize) {
    if reports.is_empty() {
        return;
    }
    println!("{}", "POTENTIAL BUGS".bold());
    for report in reports {
        println!("{}", render_report(report, reference_count, humanize_range));
    }
}
