pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod interactive;
pub mod parser;
pub mod session;

pub use config::{ClashConfig, Protocol, ProxyRecord};
pub use error::{Error, Result};
pub use generator::{Generator, GeneratorConfig, assemble, load_template, serialize};
pub use parser::{decode_vless, decode_vmess};
pub use session::{AddReport, Session};

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
