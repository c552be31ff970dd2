//! Build/serve context and resource address resolution
//!
//! The host tells the compiler which mode it runs in (`production`,
//! `development`, `staging`, ...), whether it is an interactive dev server or a
//! one-shot build, and once bound, where the dev server listens. From that and
//! the configured `entry` map the manifest's `resource` is derived.

use crate::errors::ManifestError;
use std::collections::BTreeMap;
use std::fmt;

/// Mode whose build falls back to [`DEFAULT_RESOURCE`]
pub const PRODUCTION_MODE: &str = "production";

/// Entry document used by production builds without an explicit entry
pub const DEFAULT_RESOURCE: &str = "index.html";

/// How the host invoked the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Interactive dev server, manifest kept live
    Serve,
    /// One-shot build, manifest written once the bundle is final
    Build,
}

/// Where a running dev server accepts connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(protocol: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        ServerAddress {
            protocol: protocol.into(),
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Build/serve context supplied by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub mode: String,
    pub command: CommandKind,
    /// Bound dev server, `None` until the server is listening or in build mode
    pub server: Option<ServerAddress>,
}

impl BuildContext {
    pub fn serve(mode: impl Into<String>, server: Option<ServerAddress>) -> Self {
        BuildContext {
            mode: mode.into(),
            command: CommandKind::Serve,
            server,
        }
    }

    pub fn build(mode: impl Into<String>) -> Self {
        BuildContext {
            mode: mode.into(),
            command: CommandKind::Build,
            server: None,
        }
    }

    pub fn is_serve(&self) -> bool {
        self.command == CommandKind::Serve
    }
}

/// Resolve the manifest `resource` for the current context
///
/// An explicit `entry[mode]` always wins. Otherwise a dev server uses its bound
/// address, and a build falls back to `index.html` only in production mode.
pub fn resolve_resource(
    entry: &BTreeMap<String, String>,
    context: &BuildContext,
) -> Result<String, ManifestError> {
    if let Some(explicit) = entry.get(&context.mode) {
        return Ok(explicit.clone());
    }

    match context.command {
        CommandKind::Serve => context
            .server
            .as_ref()
            .map(ToString::to_string)
            .ok_or(ManifestError::DevServerUnavailable),
        CommandKind::Build if context.mode == PRODUCTION_MODE => Ok(DEFAULT_RESOURCE.to_string()),
        CommandKind::Build => Err(ManifestError::MissingEntryPoint(context.mode.clone())),
    }
}
