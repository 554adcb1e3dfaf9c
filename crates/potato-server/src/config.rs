use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use potato_custody::{DirectoryResolver, PassthroughResolver, ReceiverResolver};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server configuration, read from TOML. Every field has a default.
///
/// ```toml
/// bind_addr = "0.0.0.0:8787"
/// data_path = "/var/lib/potato/potatoes.json"
///
/// [resolver]
/// allow_unlisted = false
///
/// [resolver.directory]
/// alice = "0x52908400098527886E0F7030069857D2E4169EE7"
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_path: PathBuf,
    pub resolver: ResolverConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            data_path: PathBuf::from("data/potatoes.json"),
            resolver: ResolverConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }
}

/// How receiver handles are mapped to canonical addresses.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Handle -> address table.
    pub directory: BTreeMap<String, String>,
    /// Resolve handles missing from `directory` to themselves.
    pub allow_unlisted: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            directory: BTreeMap::new(),
            allow_unlisted: true,
        }
    }
}

impl ResolverConfig {
    /// Build the resolver this configuration describes.
    pub fn build(&self) -> ServerResult<Box<dyn ReceiverResolver>> {
        if self.directory.is_empty() && self.allow_unlisted {
            return Ok(Box::new(PassthroughResolver));
        }
        let directory = DirectoryResolver::new(&self.directory)
            .map_err(|e| ServerError::Config(format!("resolver directory: {e}")))?
            .allow_unlisted(self.allow_unlisted);
        Ok(Box::new(directory))
    }
}
