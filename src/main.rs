use anyhow::{Context, Result};
use clap::Parser;
use compiledb::cli::{AppContext, Cli, Commands};
use compiledb::infra::{load_config, logging};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log = logging::init(cli.options.verbose);

    let code = match cli.command {
        Some(Commands::Init(args)) => compiledb::infra::config_init(args).map(|_| 0)?,
        Some(Commands::Completions(args)) => compiledb::completion::run(args).map(|_| 0)?,
        command => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            let file = load_config()?;

            // Build a context once, pass everywhere
            match command {
                Some(Commands::Make(make)) => {
                    let ctx = AppContext::resolve(&cli.options, file, true, &cwd, log);
                    compiledb::shadow_run(&make.args, &ctx)?
                }
                _ => {
                    let ctx = AppContext::resolve(&cli.options, file, false, &cwd, log);
                    compiledb::generate(&ctx)?
                }
            }
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
