// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for rebaseline-cl.

use crate::{
    build::Platform,
    collab::PlatformRegistry,
    errors::{ConfigParseError, ConfigParseErrorKind},
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};
use tracing::warn;

/// Overall configuration for rebaseline-cl.
///
/// The default config, embedded in the binary, is overlaid with the repository's config file.
#[derive(Clone, Debug)]
pub struct RebaselineConfig {
    workspace_root: Utf8PathBuf,
    inner: RebaselineConfigImpl,
}

impl RebaselineConfig {
    /// The default location of the config within the repository: `.config/rebaseline.toml`.
    pub const CONFIG_PATH: &'static str = ".config/rebaseline.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, or if not specified from `.config/rebaseline.toml`
    /// in the workspace root.
    ///
    /// A missing `.config/rebaseline.toml` is not an error, but since the default config defines
    /// no builders, validation will then fail.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let inner = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        inner
            .validate()
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        Ok(Self {
            workspace_root,
            inner,
        })
    }

    /// Parses a config from a TOML string layered on top of the default config. Used in tests.
    pub fn from_str_for_testing(
        workspace_root: impl Into<Utf8PathBuf>,
        contents: &str,
    ) -> Result<Self, ConfigParseError> {
        let builder =
            Self::make_default_config().add_source(File::from_str(contents, FileFormat::Toml));
        let inner = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new("<inline>", kind))?;
        inner
            .validate()
            .map_err(|kind| ConfigParseError::new("<inline>", kind))?;
        Ok(Self {
            workspace_root: workspace_root.into(),
            inner,
        })
    }

    /// Returns the workspace root.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the base URL of the results archive.
    pub fn results_base_url(&self) -> &str {
        self.inner.results.base_url.trim_end_matches('/')
    }

    /// Returns the timeout for each request to the results archive.
    pub fn results_timeout(&self) -> Duration {
        self.inner.results.timeout
    }

    /// Returns the layout tests directory relative to the repository root, always ending in `/`.
    pub fn layout_tests_base_dir(&self) -> String {
        let base_dir = self.inner.layout_tests.base_dir.trim_matches('/');
        if base_dir.is_empty() {
            String::new()
        } else {
            format!("{base_dir}/")
        }
    }

    /// Returns the upstream branch changed files are computed against.
    pub fn git_upstream(&self) -> &str {
        &self.inner.git.upstream
    }

    /// Returns the try server master to pass to `git cl try`, if any.
    pub fn try_master(&self) -> Option<&str> {
        let master = self.inner.git.try_master.as_str();
        (!master.is_empty()).then_some(master)
    }

    /// Returns the executor command, or `None` if the work order should be printed.
    pub fn executor_command(&self) -> Option<&[String]> {
        let command = self.inner.executor.command.as_slice();
        (!command.is_empty()).then_some(command)
    }

    /// Returns a registry of the configured try builders.
    pub fn builder_registry(&self) -> BuilderRegistry {
        BuilderRegistry::new(
            self.inner
                .builders
                .iter()
                .map(|b| (b.name.clone(), Platform::new(b.platform.clone()))),
        )
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<RebaselineConfigImpl, ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|err| ConfigParseErrorKind::BuildError(Box::new(err)))?;
        config
            .try_deserialize()
            .map_err(|err| ConfigParseErrorKind::BuildError(Box::new(err)))
    }
}

/// The try builders a project runs, and the platform each one produces baselines for.
#[derive(Clone, Debug, Default)]
pub struct BuilderRegistry {
    builders: BTreeMap<String, Platform>,
}

impl BuilderRegistry {
    /// Creates a new registry from `(builder name, platform)` pairs.
    pub fn new(builders: impl IntoIterator<Item = (String, Platform)>) -> Self {
        Self {
            builders: builders.into_iter().collect(),
        }
    }
}

impl PlatformRegistry for BuilderRegistry {
    fn all_supported_builders(&self) -> BTreeSet<String> {
        self.builders.keys().cloned().collect()
    }

    /// Returns the configured platform for `builder_name`.
    ///
    /// Builds are only ever discovered for configured builders. A builder that isn't configured
    /// is treated as its own platform.
    fn platform_for_builder(&self, builder_name: &str) -> Platform {
        match self.builders.get(builder_name) {
            Some(platform) => platform.clone(),
            None => {
                warn!("builder `{builder_name}` is not configured, using its name as the platform");
                Platform::new(builder_name)
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RebaselineConfigImpl {
    results: ResultsConfig,
    layout_tests: LayoutTestsConfig,
    git: GitConfig,
    executor: ExecutorConfig,
    #[serde(default)]
    builders: Vec<BuilderConfig>,
}

impl RebaselineConfigImpl {
    fn validate(&self) -> Result<(), ConfigParseErrorKind> {
        if self.builders.is_empty() {
            return Err(ConfigParseErrorKind::NoBuilders);
        }
        let mut seen = BTreeSet::new();
        for (index, builder) in self.builders.iter().enumerate() {
            if builder.name.is_empty() {
                return Err(ConfigParseErrorKind::EmptyBuilderField {
                    index,
                    field: "name",
                });
            }
            if builder.platform.is_empty() {
                return Err(ConfigParseErrorKind::EmptyBuilderField {
                    index,
                    field: "platform",
                });
            }
            if !seen.insert(builder.name.as_str()) {
                return Err(ConfigParseErrorKind::DuplicateBuilder(builder.name.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ResultsConfig {
    base_url: String,
    #[serde(with = "humantime_serde")]
    timeout: Duration,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct LayoutTestsConfig {
    base_dir: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct GitConfig {
    upstream: String,
    #[serde(default)]
    try_master: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ExecutorConfig {
    #[serde(default)]
    command: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct BuilderConfig {
    name: String,
    platform: String,
}
