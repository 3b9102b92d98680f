//! Configuration management for monopack
//!
//! Build configuration loads from environment variables with sensible
//! defaults; CLI flags override on top. Runtime probe parameters live in
//! [`crate::supervise`] because they are part of the orchestrator-facing
//! contract, not build configuration.
//!
//! # Environment Variables
//!
//! - `MONOPACK_INSTALL_COMMAND`: dependency installation command - default: "npm ci"
//! - `MONOPACK_BUILD_COMMAND`: whole-tree build command - default: "npm run build"
//! - `MONOPACK_START_COMMAND`: process-start command recorded in the image - default: "node server/dist/main.js"
//! - `MONOPACK_ARTIFACT_DIR`: per-workspace build output directory - default: "dist"
//! - `MONOPACK_STATIC_DIR`: static resources directory - default: "public"
//! - `MONOPACK_LICENSE_FILE`: license file name - default: "LICENSE"
//! - `MONOPACK_SHARED_CONFIGS`: comma-separated shared build config files - default: "tsconfig.base.json"
//! - `MONOPACK_IMAGE_USER`: unprivileged runtime user name - default: "node"
//! - `MONOPACK_IMAGE_UID`: runtime uid - default: "1000"
//! - `MONOPACK_IMAGE_GID`: runtime gid - default: "1000"
//! - `MONOPACK_EXPOSE_PORT`: port exposed by the image - default: "3000"
//! - `MONOPACK_LOG_LEVEL`: logging level - default: "info"

use std::env;
use thiserror::Error;

const DEFAULT_INSTALL_COMMAND: &str = "npm ci";
const DEFAULT_BUILD_COMMAND: &str = "npm run build";
const DEFAULT_START_COMMAND: &str = "node server/dist/main.js";
const DEFAULT_ARTIFACT_DIR: &str = "dist";
const DEFAULT_STATIC_DIR: &str = "public";
const DEFAULT_LICENSE_FILE: &str = "LICENSE";
const DEFAULT_SHARED_CONFIGS: &str = "tsconfig.base.json";
const DEFAULT_IMAGE_USER: &str = "node";
const DEFAULT_IMAGE_UID: u32 = 1000;
const DEFAULT_IMAGE_GID: u32 = 1000;
const DEFAULT_EXPOSE_PORT: u16 = 3000;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Build configuration for the packaging pipeline
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Dependency installation command (whole tree, one invocation)
    pub install_command: String,

    /// Build command (whole tree, one invocation)
    pub build_command: String,

    /// Process-start command recorded as the image entrypoint
    pub start_command: String,

    /// Per-workspace compiled output directory
    pub artifact_dir: String,

    /// Static resources directory at the repository root
    pub static_dir: String,

    /// License file name at the repository root
    pub license_file: String,

    /// Shared build configuration files overlaid next to the manifests
    pub shared_configs: Vec<String>,

    /// Unprivileged runtime user name
    pub image_user: String,

    /// Runtime uid owning every file in the image
    pub image_uid: u32,

    /// Runtime gid owning every file in the image
    pub image_gid: u32,

    /// Port the image exposes to the orchestration layer
    pub expose_port: u16,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            install_command: DEFAULT_INSTALL_COMMAND.to_string(),
            build_command: DEFAULT_BUILD_COMMAND.to_string(),
            start_command: DEFAULT_START_COMMAND.to_string(),
            artifact_dir: DEFAULT_ARTIFACT_DIR.to_string(),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
            license_file: DEFAULT_LICENSE_FILE.to_string(),
            shared_configs: vec![DEFAULT_SHARED_CONFIGS.to_string()],
            image_user: DEFAULT_IMAGE_USER.to_string(),
            image_uid: DEFAULT_IMAGE_UID,
            image_gid: DEFAULT_IMAGE_GID,
            expose_port: DEFAULT_EXPOSE_PORT,
        }
    }
}

impl BuildConfig {
    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let shared_configs = match env::var("MONOPACK_SHARED_CONFIGS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => defaults.shared_configs,
        };

        let config = Self {
            install_command: env_or("MONOPACK_INSTALL_COMMAND", defaults.install_command),
            build_command: env_or("MONOPACK_BUILD_COMMAND", defaults.build_command),
            start_command: env_or("MONOPACK_START_COMMAND", defaults.start_command),
            artifact_dir: env_or("MONOPACK_ARTIFACT_DIR", defaults.artifact_dir),
            static_dir: env_or("MONOPACK_STATIC_DIR", defaults.static_dir),
            license_file: env_or("MONOPACK_LICENSE_FILE", defaults.license_file),
            shared_configs,
            image_user: env_or("MONOPACK_IMAGE_USER", defaults.image_user),
            image_uid: env_parse("MONOPACK_IMAGE_UID", defaults.image_uid)?,
            image_gid: env_parse("MONOPACK_IMAGE_GID", defaults.image_gid)?,
            expose_port: env_parse("MONOPACK_EXPOSE_PORT", defaults.expose_port)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants
    ///
    /// The runtime identity must be unprivileged: uid 0 or gid 0 would let
    /// image files be owned by root, which the image contract forbids.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.install_command.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "install command cannot be empty".to_string(),
            ));
        }
        if self.build_command.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "build command cannot be empty".to_string(),
            ));
        }
        if self.start_command.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "start command cannot be empty".to_string(),
            ));
        }
        if self.image_uid == 0 || self.image_gid == 0 {
            return Err(ConfigError::ValidationFailed(format!(
                "runtime identity {}:{} is privileged",
                self.image_uid, self.image_gid
            )));
        }
        Ok(())
    }
}

fn env_or(var: &str, default: String) -> String {
    env::var(var).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::ParseError {
            field: var.to_string(),
            error: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
