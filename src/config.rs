use etcetera::{AppStrategy, AppStrategyArgs, choose_app_strategy};
use serde::Deserialize;
use snafu::{ResultExt, Snafu};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::tools::sandbox::{Sandbox, SandboxError};
use crate::tools::tokens::EstimatorKind;
use crate::tools::view::{
    DEFAULT_MAX_TOKENS, DEFAULT_SAFETY_MARGIN, DEFAULT_TRUNCATED_LINE_COUNT, FileViewer,
};

pub const CONFIG_PATH_ENV: &str = "SANDBOX_EDITOR_CONFIG_PATH";

/// Errors while getting the config
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    #[snafu(transparent)]
    IO { source: io::Error },

    #[snafu(display("Error deserializing config. Double check all fields are valid"))]
    TomlDeserialize {
        #[snafu(source)]
        source: toml::de::Error,
    },

    #[snafu(display("Failed to create sandbox root '{}': {}", path.display(), source))]
    CreateRoot { source: io::Error, path: PathBuf },

    #[snafu(display("Invalid sandbox root"))]
    SandboxRoot { source: SandboxError },

    #[snafu(display("Invalid value for '{field}': {reason}"))]
    InvalidValue { field: String, reason: String },
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

fn get_config_file_path() -> Option<PathBuf> {
    // On Linux this is $HOME/.config/sandbox_editor/config.toml
    let strategy = choose_app_strategy(AppStrategyArgs {
        top_level_domain: "com".to_string(),
        author: "sandbox_editor".to_string(),
        app_name: "sandbox_editor".to_string(),
    })
    .ok()?;

    Some(strategy.config_dir().join("config.toml"))
}

/// The config we deserialize directly from toml
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub root: PathBuf,
    pub create_root: bool,
    pub max_tokens: usize,
    pub safety_margin: usize,
    pub truncated_line_count: usize,
    pub token_estimator: EstimatorKind,
    pub chars_per_token: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            create_root: true,
            max_tokens: DEFAULT_MAX_TOKENS,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            truncated_line_count: DEFAULT_TRUNCATED_LINE_COUNT,
            token_estimator: EstimatorKind::default(),
            chars_per_token: 4,
        }
    }
}

impl Config {
    /// Load from the env var path or the platform config dir, falling back to
    /// the bundled defaults when neither file exists.
    pub fn new() -> Result<Self> {
        let config_file_path = if let Ok(env_path) = std::env::var(CONFIG_PATH_ENV) {
            tracing::debug!("Using config path from {CONFIG_PATH_ENV} env var: {env_path}");
            Some(PathBuf::from(env_path))
        } else {
            get_config_file_path()
        };

        match config_file_path {
            Some(path) if fs::exists(&path)? => {
                tracing::debug!("Found user config file at {:?}", path);
                Self::from_file(&path)
            }
            _ => {
                tracing::debug!("No user config file found, using defaults");
                Self::load_default()
            }
        }
    }

    /// An explicitly requested file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Self::new(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context(TomlDeserializeSnafu)
    }

    pub fn load_default() -> Result<Self> {
        Self::from_toml(include_str!("../default_config.toml"))
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(root) = &overrides.root {
            self.root = root.clone();
        }
        if let Some(max_tokens) = overrides.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(safety_margin) = overrides.safety_margin {
            self.safety_margin = safety_margin;
        }
    }
}

/// Command line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root: Option<PathBuf>,
    pub max_tokens: Option<usize>,
    pub safety_margin: Option<usize>,
}

/// Validated config: the root exists and is canonical, the estimator is built.
#[derive(Debug, Clone)]
pub struct ParsedConfig {
    pub sandbox: Sandbox,
    pub viewer: FileViewer,
}

impl TryFrom<Config> for ParsedConfig {
    type Error = ConfigError;

    fn try_from(value: Config) -> Result<Self, Self::Error> {
        if value.truncated_line_count == 0 {
            return InvalidValueSnafu {
                field: "truncated_line_count",
                reason: "must be at least 1",
            }
            .fail();
        }
        if value.chars_per_token == 0 {
            return InvalidValueSnafu {
                field: "chars_per_token",
                reason: "must be at least 1",
            }
            .fail();
        }

        if value.create_root {
            fs::create_dir_all(&value.root).context(CreateRootSnafu { path: &value.root })?;
        }
        let sandbox = Sandbox::new(&value.root).context(SandboxRootSnafu)?;
        tracing::info!(root = %sandbox.root().display(), "sandbox ready");

        let estimator = value.token_estimator.build(value.chars_per_token);
        let viewer = FileViewer::new(value.max_tokens, value.safety_margin, estimator)
            .with_truncated_line_count(value.truncated_line_count);

        Ok(ParsedConfig { sandbox, viewer })
    }
}
