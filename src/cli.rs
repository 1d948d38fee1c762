use clap::Parser;

use crate::config::Protocol;
use crate::error::Result;
use crate::generator::GeneratorConfig;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Convert VMess/VLESS share links into a Clash config",
    long_about = None
)]
pub struct Args {
    #[arg(help = "Share link to convert; starts interactive mode when omitted")]
    pub link: Option<String>,

    #[arg(
        short,
        long,
        conflicts_with_all = ["link", "config"],
        help = "File of share links, one per line or Base64 encoded"
    )]
    pub input: Option<String>,

    #[arg(short, long, conflicts_with = "link", help = "Generator config (TOML)")]
    pub config: Option<String>,

    #[arg(short, long, help = "Template path [default: template.yaml]")]
    pub template: Option<String>,

    #[arg(short, long, help = "Config output path [default: SVTC.yaml]")]
    pub output: Option<String>,

    #[arg(short, long, help = "Only accept links of this protocol (vmess or vless)")]
    pub protocol: Option<Protocol>,

    #[arg(short, long, help = "Emit debug log")]
    pub verbose: bool,
}

/// What the binary should do for a given set of arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Convert a single link
    Single(String),
    /// Convert every link in a file
    Batch(String),
    /// Convert the links listed in the generator config
    Config,
    /// Menu driven session
    Interactive,
}

impl Args {
    pub fn mode(&self) -> Mode {
        if let Some(link) = &self.link {
            Mode::Single(link.clone())
        } else if let Some(input) = &self.input {
            Mode::Batch(input.clone())
        } else if self.config.is_some() {
            Mode::Config
        } else {
            Mode::Interactive
        }
    }

    /// Generator config from `--config` (or defaults) with flag overrides applied
    pub fn generator_config(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };

        if let Some(template) = &self.template {
            config.template = template.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(protocol) = self.protocol {
            config.protocol = Some(protocol.scheme().to_string());
        }

        Ok(config)
    }
}
