#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::style)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use svtc::cli::{Args, Mode};
use svtc::generator::{Generator, expand_tilde};
use svtc::interactive;
use tracing::Level;

fn main() -> ExitCode {
    let args = Args::parse();
    let is_verbose = args.verbose;
    tracing_subscriber::fmt()
        .with_max_level(if is_verbose {
            Level::TRACE
        } else {
            Level::INFO
        })
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let generator = Generator::new(args.generator_config()?);
    let (mut session, _) = generator.session();

    match args.mode() {
        Mode::Single(link) => {
            session.add_link(&link)?;
        }
        Mode::Batch(input) => {
            let path = expand_tilde(&input);
            tracing::info!("Reading links from {}", path);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read links from {}", path))?;
            session.add_links(&content);
        }
        Mode::Config => {
            tracing::info!(
                "Loaded {} link(s) from generator config",
                generator.config().links.len()
            );
        }
        Mode::Interactive => return interactive::run(&generator, session),
    }

    let path = generator.generate_to_file(&session, None)?;
    tracing::info!("Config generation complete: {}", path.display());
    Ok(())
}

/// Exit code for the library error kind, 1 for anything else
fn exit_code(e: &anyhow::Error) -> u8 {
    e.downcast_ref::<svtc::Error>()
        .map_or(1, svtc::Error::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_for_library_errors() {
        let e = anyhow::Error::from(svtc::Error::EmptyProxySet);
        assert_eq!(exit_code(&e), 6);

        let e = anyhow::Error::from(svtc::Error::UnsupportedScheme("ss://x".to_string()))
            .context("while converting");
        assert_eq!(exit_code(&e), 4);

        let e = anyhow::Error::from(svtc::Error::Config("bad".to_string()));
        assert_eq!(exit_code(&e), 8);
    }

    #[test]
    fn test_exit_code_for_other_errors() {
        let missing = std::env::temp_dir().join("svtc-no-such-links-file.txt");
        let e = std::fs::read_to_string(&missing)
            .with_context(|| format!("Failed to read links from {}", missing.display()))
            .unwrap_err();
        assert_eq!(exit_code(&e), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("terminal closed")), 1);
    }

    #[test]
    fn test_run_single_link_exit_codes() {
        let args = Args::parse_from(["svtc", "vless://missing-at-sign"]);
        assert_eq!(exit_code(&run(&args).unwrap_err()), 3);

        let args = Args::parse_from(["svtc", "trojan://pw@host:443"]);
        assert_eq!(exit_code(&run(&args).unwrap_err()), 4);

        let missing = std::env::temp_dir().join("svtc-no-such-input.txt");
        let missing = missing.to_string_lossy().into_owned();
        let args = Args::parse_from(["svtc", "--input", missing.as_str()]);
        assert_eq!(exit_code(&run(&args).unwrap_err()), 1);
    }
}
