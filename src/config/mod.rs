use crate::error::{Result, StripeMcpError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable consulted when no API key is configured explicitly.
pub const API_KEY_ENV: &str = "STRIPE_API_KEY";
/// Environment variable consulted when no connected account is configured.
pub const STRIPE_ACCOUNT_ENV: &str = "STRIPE_ACCOUNT";
/// Tool selector passed to the server when none is configured.
pub const DEFAULT_TOOLS: &str = "paymentLinks.create";

/// Options accepted by [`crate::StripeMcpClient::new`].
///
/// Every field is optional here; [`SessionConfig::resolve`] fills the gaps
/// from the environment and rejects a configuration without an API key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Stripe secret key. Falls back to `STRIPE_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Comma separated tool selector for `--tools=`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<String>,
    /// Connected account id. Falls back to `STRIPE_ACCOUNT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_account: Option<String>,
    /// Log connection lifecycle and available tools.
    #[serde(default)]
    pub debug: bool,
}

/// How the Stripe MCP server process is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Package runner executable
    #[serde(default = "default_command")]
    pub command: String,
    /// Package providing the server
    #[serde(default = "default_package")]
    pub package: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            package: default_package(),
        }
    }
}

fn default_command() -> String {
    "npx".to_string()
}

fn default_package() -> String {
    "@stripe/mcp".to_string()
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stripe: ClientOptions,
    #[serde(default)]
    pub launcher: LauncherConfig,
}

impl Config {
    /// Default location: `~/.config/stripe-mcp-client/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|mut p| {
            p.push(".config");
            p.push("stripe-mcp-client");
            p.push("config.toml");
            p
        })
    }

    /// Load configuration from file.
    ///
    /// An explicit path must exist. When no path is given the default
    /// location is tried and a missing file yields the default config.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(StripeMcpError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(&path)
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| StripeMcpError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&config_str)
            .map_err(|e| StripeMcpError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Generate example configuration
    pub fn example() -> Result<String> {
        let example = Config {
            stripe: ClientOptions {
                api_key: Some("sk_test_replace_me".to_string()),
                tools: Some(DEFAULT_TOOLS.to_string()),
                stripe_account: None,
                debug: false,
            },
            launcher: LauncherConfig::default(),
        };

        toml::to_string_pretty(&example).map_err(|e| {
            StripeMcpError::Config(format!("Failed to render example config: {}", e))
        })
    }
}

/// Secret API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only long keys show their mode prefix (`sk_test`, `rk_live`).
        if self.0.chars().count() > 12 {
            let prefix: String = self.0.chars().take(7).collect();
            write!(f, "ApiKey({}…)", prefix)
        } else {
            f.write_str("ApiKey(***)")
        }
    }
}

/// Fully resolved, immutable session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    api_key: ApiKey,
    tools: String,
    stripe_account: Option<String>,
    debug: bool,
    launcher: LauncherConfig,
}

impl SessionConfig {
    /// Resolve options against the process environment.
    ///
    /// This is the only place the environment is read.
    pub fn resolve(options: ClientOptions) -> Result<Self> {
        Self::resolve_with(options, |name| std::env::var(name).ok())
    }

    /// Resolve options using `lookup` for environment fallbacks.
    pub fn resolve_with<F>(options: ClientOptions, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(options.api_key)
            .or_else(|| non_empty(lookup(API_KEY_ENV)))
            .ok_or_else(|| {
                StripeMcpError::Config(format!(
                    "Stripe API key is required. Pass it as an option or set {} environment variable.",
                    API_KEY_ENV
                ))
            })?;

        let stripe_account =
            non_empty(options.stripe_account).or_else(|| non_empty(lookup(STRIPE_ACCOUNT_ENV)));

        Ok(Self {
            api_key: ApiKey(api_key),
            tools: non_empty(options.tools).unwrap_or_else(|| DEFAULT_TOOLS.to_string()),
            stripe_account,
            debug: options.debug,
            launcher: LauncherConfig::default(),
        })
    }

    /// Replace the launcher used to start the server.
    pub fn with_launcher(mut self, launcher: LauncherConfig) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    pub fn tools(&self) -> &str {
        &self.tools
    }

    pub fn stripe_account(&self) -> Option<&str> {
        self.stripe_account.as_deref()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn launcher(&self) -> &LauncherConfig {
        &self.launcher
    }

    /// Command line for the server process. Each flag is its own argv entry.
    pub fn launch_spec(&self) -> LaunchSpec {
        let mut args = vec![
            "-y".to_string(),
            self.launcher.package.clone(),
            format!("--tools={}", self.tools),
            format!("--api-key={}", self.api_key.expose()),
        ];

        if let Some(account) = &self.stripe_account {
            args.push(format!("--stripe-account={}", account));
        }

        LaunchSpec {
            command: self.launcher.command.clone(),
            args,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Executable plus ordered argument list.
#[derive(Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub command: String,
    pub args: Vec<String>,
}

impl fmt::Debug for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<&str> = self
            .args
            .iter()
            .map(|a| {
                if a.starts_with("--api-key=") {
                    "--api-key=***"
                } else {
                    a.as_str()
                }
            })
            .collect();
        f.debug_struct("LaunchSpec")
            .field("command", &self.command)
            .field("args", &args)
            .finish()
    }
}
