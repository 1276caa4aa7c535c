//! `dh completions`: shell completion scripts.
//!
//! ```bash
//! dh completions bash > ~/.local/share/bash-completion/completions/dh
//! dh completions zsh -o ~/.zsh/completions/_dh
//! ```

use crate::cli::{Cli, CompletionsArgs, ShellType};
use crate::error::Result;
use crate::output::OutputContext;
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io;
use tracing::info;

const BIN_NAME: &str = "dh";

/// Execute the completions command.
///
/// # Errors
///
/// Returns an error if the output file cannot be created.
pub fn execute(args: &CompletionsArgs, ctx: &OutputContext) -> Result<()> {
    let mut cmd = Cli::command();
    let shell = convert_shell_type(args.shell);

    match &args.output {
        Some(path) => {
            let mut file = std::fs::File::create(path)?;
            generate(shell, &mut cmd, BIN_NAME, &mut file);
            info!(shell = ?args.shell, path = %path.display(), "Wrote completion script");
            if !ctx.is_quiet() && !ctx.is_json() {
                eprintln!("Generated {} completions to {}", shell_name(args.shell), path.display());
                eprintln!("{}", install_hint(args.shell));
            }
        }
        None => generate(shell, &mut cmd, BIN_NAME, &mut io::stdout()),
    }
    Ok(())
}

const fn convert_shell_type(shell: ShellType) -> Shell {
    match shell {
        ShellType::Bash => Shell::Bash,
        ShellType::Zsh => Shell::Zsh,
        ShellType::Fish => Shell::Fish,
        ShellType::PowerShell => Shell::PowerShell,
        ShellType::Elvish => Shell::Elvish,
    }
}

const fn shell_name(shell: ShellType) -> &'static str {
    match shell {
        ShellType::Bash => "bash",
        ShellType::Zsh => "zsh",
        ShellType::Fish => "fish",
        ShellType::PowerShell => "PowerShell",
        ShellType::Elvish => "elvish",
    }
}

const fn install_hint(shell: ShellType) -> &'static str {
    match shell {
        ShellType::Bash => "Place the script in ~/.local/share/bash-completion/completions/dh",
        ShellType::Zsh => "Put _dh on your fpath, e.g. fpath=(~/.zsh/completions $fpath)",
        ShellType::Fish => "Fish loads ~/.config/fish/completions/dh.fish automatically",
        ShellType::PowerShell => "Dot-source the script from your $PROFILE",
        ShellType::Elvish => "Place the script in ~/.elvish/lib/dh.elv and add `use dh` to rc.elv",
    }
}
