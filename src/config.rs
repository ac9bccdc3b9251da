// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Editor configuration, read from TOML.
//!
//! Lookup order: an explicit path (which must exist), then `dfd.toml` in the working directory,
//! then built-in defaults. Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::layout::SugiyamaEngine;
use crate::ops::CommandSettings;
use crate::stack::StackOptions;
use crate::store::DialogTimings;

pub const LOCAL_CONFIG_FILE: &str = "dfd.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration file: {0}")]
    MissingFile(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub history_limit: usize,
    pub gate_timeout_ms: u64,
    pub dialog_fallback_ms: u64,
    pub dialog_limit_ms: u64,
    pub default_file_name: String,
    pub layout: LayoutConfig,
    pub fit: FitConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let stack = StackOptions::default();
        let dialog = DialogTimings::default();
        Self {
            history_limit: stack.history_limit,
            gate_timeout_ms: 1000,
            dialog_fallback_ms: dialog.fallback.as_millis() as u64,
            dialog_limit_ms: dialog.limit.as_millis() as u64,
            default_file_name: CommandSettings::default().default_file_name,
            layout: LayoutConfig::default(),
            fit: FitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub horizontal_spacing: f64,
    pub vertical_spacing: f64,
    pub margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let engine = SugiyamaEngine::default();
        Self {
            horizontal_spacing: engine.horizontal_spacing(),
            vertical_spacing: engine.vertical_spacing(),
            margin: engine.margin(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitConfig {
    pub padding: f64,
    pub max_zoom: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        let settings = CommandSettings::default();
        Self {
            padding: settings.fit_padding,
            max_zoom: settings.fit_max_zoom,
        }
    }
}

impl EditorConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("layout.horizontal_spacing", self.layout.horizontal_spacing),
            ("layout.vertical_spacing", self.layout.vertical_spacing),
            ("layout.margin", self.layout.margin),
            ("fit.padding", self.fit.padding),
        ];
        for (key, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a non-negative number"
                )));
            }
        }
        if !(self.fit.max_zoom.is_finite() && self.fit.max_zoom > 0.0) {
            return Err(ConfigError::Validation(
                "fit.max_zoom must be positive".to_owned(),
            ));
        }
        if self.gate_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "gate_timeout_ms must be positive".to_owned(),
            ));
        }
        if self.dialog_limit_ms == 0 || self.dialog_limit_ms < self.dialog_fallback_ms {
            return Err(ConfigError::Validation(
                "dialog_limit_ms must be positive and at least dialog_fallback_ms".to_owned(),
            ));
        }
        if self.default_file_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "default_file_name must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn stack_options(&self) -> StackOptions {
        StackOptions {
            history_limit: self.history_limit,
            gate_timeout: Duration::from_millis(self.gate_timeout_ms),
        }
    }

    pub fn command_settings(&self) -> CommandSettings {
        CommandSettings {
            fit_padding: self.fit.padding,
            fit_max_zoom: self.fit.max_zoom,
            default_file_name: self.default_file_name.clone(),
        }
    }

    pub fn layout_engine(&self) -> SugiyamaEngine {
        SugiyamaEngine::new(
            self.layout.horizontal_spacing,
            self.layout.vertical_spacing,
            self.layout.margin,
        )
    }

    pub fn dialog_timings(&self) -> DialogTimings {
        DialogTimings {
            fallback: Duration::from_millis(self.dialog_fallback_ms),
            limit: Duration::from_millis(self.dialog_limit_ms),
        }
    }
}

pub fn load_config(explicit: Option<&Path>) -> Result<EditorConfig, ConfigError> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "loading configuration");
        return load_config_file(path);
    }

    let local = Path::new(LOCAL_CONFIG_FILE);
    if local.exists() {
        info!(path = %local.display(), "loading local configuration");
        return load_config_file(local);
    }

    debug!("no configuration file found; using defaults");
    Ok(EditorConfig::default())
}

fn load_config_file(path: &Path) -> Result<EditorConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    EditorConfig::from_toml(&text)
}
