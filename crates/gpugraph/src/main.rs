mod cli;
mod paths;
mod run;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(cli::Command::PrintConfig) => run::print_config(&cli.run),
        Some(cli::Command::Functions) => {
            run::list_functions();
            Ok(())
        }
        Some(cli::Command::Where) => run::print_where(&cli.run),
        None => run::run(cli.run),
    }
}
