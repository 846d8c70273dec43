//! Runtime settings for footle.
//!
//! Settings come from the command line, layered over an optional TOML file:
//!
//! ```toml
//! codebase = "~/src/shop"
//! codebase_remote = "/var/www/html"
//! dbgp_port = 9003
//! verbose = true
//! ```
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default port for DBGp engines to connect to.
pub const DEFAULT_DBGP_PORT: u16 = 9003;

/// Number of `-v` flags that turns on raw traffic logging.
const VERBOSE_LEVEL: u8 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("determining current directory")]
    CurrentDir(#[source] std::io::Error),

    #[error("codebase {0} is not a directory")]
    MissingCodebase(PathBuf),

    #[error("remote codebase {0} must be an absolute path")]
    RelativeRemoteCodebase(PathBuf),
}

/// Command line flags.
#[derive(Debug, Clone, Default, clap::Args)]
#[group(id = "ConfigArgs")]
pub struct Args {
    /// Directory holding the code being debugged [default: current directory]
    #[clap(long)]
    pub codebase: Option<PathBuf>,

    /// Path of the codebase on the machine running the DBGp engine
    #[clap(long)]
    pub codebase_remote: Option<PathBuf>,

    /// Port to listen on for DBGp engines [default: 9003]
    #[clap(long)]
    pub port_dbgp: Option<u16>,

    /// Increase verbosity; -vvv logs all traffic with the DBGp engine
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file [default: <config dir>/footle/config.toml]
    #[clap(long)]
    pub config: Option<PathBuf>,
}

/// Contents of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    codebase: Option<PathBuf>,
    codebase_remote: Option<PathBuf>,
    dbgp_port: Option<u16>,
    verbose: Option<bool>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Local codebase root.
    pub codebase: PathBuf,
    /// Codebase root as seen by the engine, when it differs.
    pub codebase_remote: Option<PathBuf>,
    pub dbgp_port: u16,
    /// Log every raw command and exchange with the engine.
    pub verbose: bool,
}

impl Config {
    pub fn new(codebase: impl Into<PathBuf>) -> Self {
        Self {
            codebase: codebase.into(),
            codebase_remote: None,
            dbgp_port: DEFAULT_DBGP_PORT,
            verbose: false,
        }
    }

    /// Build the configuration from command line flags and the config file.
    ///
    /// An explicitly named config file must exist; the default one is only
    /// read when present.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => FileConfig::load(&path)?,
                _ => FileConfig::default(),
            },
        };
        Self::layered(args, file)
    }

    fn layered(args: &Args, file: FileConfig) -> Result<Self, ConfigError> {
        let codebase = match args.codebase.clone().or(file.codebase) {
            Some(path) => {
                std::path::absolute(normalise_path(&path)).map_err(ConfigError::CurrentDir)?
            }
            None => std::env::current_dir().map_err(ConfigError::CurrentDir)?,
        };
        if !codebase.is_dir() {
            return Err(ConfigError::MissingCodebase(codebase));
        }

        // the remote root lives on the engine's machine, so there is nothing
        // to resolve a relative one against
        let codebase_remote = args.codebase_remote.clone().or(file.codebase_remote);
        if let Some(remote) = codebase_remote.as_ref().filter(|remote| remote.is_relative()) {
            return Err(ConfigError::RelativeRemoteCodebase(remote.clone()));
        }

        let config = Self {
            codebase,
            codebase_remote,
            dbgp_port: args
                .port_dbgp
                .or(file.dbgp_port)
                .unwrap_or(DEFAULT_DBGP_PORT),
            verbose: args.verbose >= VERBOSE_LEVEL || file.verbose.unwrap_or(false),
        };
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }

    /// Root of engine-reported file paths: the remote codebase when set.
    pub fn code_dir(&self) -> &Path {
        self.codebase_remote.as_deref().unwrap_or(&self.codebase)
    }

    /// Root used to look up files on this machine.
    pub fn codebase(&self) -> &Path {
        &self.codebase
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("footle").join("config.toml"))
}

fn normalise_path(path: &Path) -> Cow<'_, Path> {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return Cow::Owned(home.join(stripped));
        }
        tracing::warn!("cannot determine home directory, using path as-is");
    }
    Cow::Borrowed(path)
}
