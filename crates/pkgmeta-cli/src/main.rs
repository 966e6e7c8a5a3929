use std::process::ExitCode;

use clap::Parser;
use cli::{Args, Commands};
use error::{CliError, CliResult};
use inspect::{inspect_files, store_files};
use logging::setup_logging;
use pkgmeta_config::{config::CONFIG_PATH, ExtractConfig};
use tracing::{debug, info};
use utils::COLOR;

mod cli;
mod error;
mod inspect;
mod logging;
mod utils;

fn handle_cli() -> CliResult<()> {
    let args = Args::parse();

    setup_logging(&args)?;

    if args.no_color {
        *COLOR.write()? = false;
    }

    if let Some(ref path) = args.config {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            std::env::current_dir()
                .map_err(|source| CliError::IoError {
                    action: "retrieving current directory".into(),
                    source,
                })?
                .join(path)
        };
        *CONFIG_PATH.write()? = path;
    }

    let config = ExtractConfig::new()?;
    debug!(
        sniff_len = config.sniff_len,
        rpm_include_release = config.rpm_include_release,
        "configuration loaded"
    );

    match args.command {
        Commands::Inspect { files } => inspect_files(&config, &files, args.json)?,
        Commands::Store { dir, files } => store_files(&config, &dir, &files, args.json)?,
        Commands::Config => info!("{}", config.to_toml_string()?),
    }

    Ok(())
}

fn main() -> ExitCode {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    match handle_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::FAILURE
        }
    }
}
