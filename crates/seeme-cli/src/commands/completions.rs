use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use crate::common::CliResult;
use crate::Cli;

#[derive(Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}

pub fn run(args: CompletionsArgs) -> CliResult {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(args.shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}
