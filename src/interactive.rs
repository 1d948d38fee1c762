//! Interactive mode
//!
//! A small menu loop around a [`Session`]: links are pasted line by line,
//! nodes can be listed or cleared, and the config is generated on demand.

use anyhow::Result;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use tracing::{error, info, warn};

use crate::config::{Protocol, ProxyRecord};
use crate::error::Error;
use crate::generator::Generator;
use crate::get_version;
use crate::session::{AddReport, Session};

// ============================================================================
// Menu
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    AddLinks,
    SelectProtocol,
    ListNodes,
    ClearNodes,
    Generate,
    Quit,
}

impl MenuAction {
    const ALL: [MenuAction; 6] = [
        MenuAction::AddLinks,
        MenuAction::SelectProtocol,
        MenuAction::ListNodes,
        MenuAction::ClearNodes,
        MenuAction::Generate,
        MenuAction::Quit,
    ];

    fn label(&self) -> &'static str {
        match self {
            MenuAction::AddLinks => "Add links",
            MenuAction::SelectProtocol => "Select protocol filter",
            MenuAction::ListNodes => "List nodes",
            MenuAction::ClearNodes => "Clear nodes",
            MenuAction::Generate => "Generate config",
            MenuAction::Quit => "Quit",
        }
    }
}

/// Run the menu loop until the user quits
pub fn run(generator: &Generator, mut session: Session) -> Result<()> {
    let theme = ColorfulTheme::default();
    let labels: Vec<&str> = MenuAction::ALL.iter().map(MenuAction::label).collect();

    println!("svtc {}", get_version());

    loop {
        println!();
        let prompt = format!(
            "{} node(s), filter: {}",
            session.len(),
            filter_label(session.protocol())
        );
        let selection = Select::with_theme(&theme)
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact()?;

        match MenuAction::ALL[selection] {
            MenuAction::AddLinks => {
                let text = read_links(&theme)?;
                if text.trim().is_empty() {
                    info!("No links entered");
                    continue;
                }
                let report = session.add_links(&text);
                print_report(&report);
            }
            MenuAction::SelectProtocol => {
                let protocol = select_protocol(&theme, session.protocol())?;
                session.set_protocol(protocol);
                info!("Protocol filter set to {}", filter_label(protocol));
            }
            MenuAction::ListNodes => {
                if session.is_empty() {
                    println!("No nodes added yet");
                }
                for (index, record) in session.proxies().iter().enumerate() {
                    println!("{:>3}. {}", index + 1, describe_node(record));
                }
            }
            MenuAction::ClearNodes => session.clear(),
            MenuAction::Generate => match generator.generate_to_file(&session, None) {
                Ok(path) => println!("Config saved to {}", path.display()),
                Err(Error::EmptyProxySet) => warn!("No nodes to generate a config from"),
                Err(e) => error!("Failed to generate config: {}", e),
            },
            MenuAction::Quit => return Ok(()),
        }
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// Read links until an empty line
fn read_links(theme: &ColorfulTheme) -> Result<String> {
    println!("Paste links, one per line. Finish with an empty line.");
    let mut lines = Vec::new();
    loop {
        let line: String = Input::with_theme(theme)
            .with_prompt(">")
            .allow_empty(true)
            .interact_text()?;
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn select_protocol(theme: &ColorfulTheme, current: Option<Protocol>) -> Result<Option<Protocol>> {
    let choices = [None, Some(Protocol::Vmess), Some(Protocol::Vless)];
    let labels: Vec<&str> = choices.iter().map(|p| filter_label(*p)).collect();
    let default = choices.iter().position(|p| *p == current).unwrap_or(0);

    let selection = Select::with_theme(theme)
        .with_prompt("Accept links of")
        .items(&labels)
        .default(default)
        .interact()?;
    Ok(choices[selection])
}

// ============================================================================
// Formatting
// ============================================================================

fn filter_label(protocol: Option<Protocol>) -> &'static str {
    match protocol {
        None => "any",
        Some(Protocol::Vmess) => "VMess",
        Some(Protocol::Vless) => "VLESS",
    }
}

fn describe_node(record: &ProxyRecord) -> String {
    format!(
        "[{}] {} ({}:{}, {}{})",
        record.protocol,
        record.name,
        record.server,
        record.port,
        record.transport,
        if record.tls_enabled { ", tls" } else { "" }
    )
}

fn print_report(report: &AddReport) {
    for (link, reason) in &report.skipped {
        println!("  skipped {}: {}", link, reason);
    }
    println!(
        "Added {} node(s), skipped {}",
        report.added.len(),
        report.skipped.len()
    );
}
