use clap::Parser;
use diffharness::cli::commands;
use diffharness::cli::{Cli, Commands, ReportFormat};
use diffharness::logging::init_logging;
use diffharness::output::OutputContext;
use diffharness::{HarnessError, StructuredError};
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, None, cli.json) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let ctx = OutputContext::from_flags(cli.json, cli.quiet, cli.no_color);

    let result = match &cli.command {
        Commands::Run(args) => commands::run::execute(args, &ctx),
        Commands::List(args) => commands::list::execute(args, &ctx).map(|()| 0),
        Commands::Configs(args) => commands::configs::execute(args, &ctx).map(|()| 0),
        Commands::Completions(args) => commands::completions::execute(args, &ctx).map(|()| 0),
        Commands::Version => commands::version::execute(&ctx).map(|()| 0),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => handle_error(&e, wants_json(&cli)),
    }
}

fn wants_json(cli: &Cli) -> bool {
    cli.json || matches!(&cli.command, Commands::Run(args) if args.format == ReportFormat::Json)
}

/// Report `err` and exit with its code.
///
/// When JSON output was requested or stdout is not a TTY, a structured JSON
/// error goes to stderr; otherwise a human-readable message.
fn handle_error(err: &HarnessError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    if json_mode || !io::stdout().is_terminal() {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        eprintln!("{}", structured.to_human(io::stderr().is_terminal()));
    }

    std::process::exit(exit_code);
}
