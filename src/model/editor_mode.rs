// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EditorMode {
    #[default]
    Edit,
    ReadOnly,
}

impl EditorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::ReadOnly => "readonly",
        }
    }
}

impl fmt::Display for EditorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown editor mode: {value}")]
pub struct ParseEditorModeError {
    value: String,
}

impl FromStr for EditorMode {
    type Err = ParseEditorModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edit" => Ok(Self::Edit),
            "readonly" => Ok(Self::ReadOnly),
            other => Err(ParseEditorModeError {
                value: other.to_owned(),
            }),
        }
    }
}

/// Editor mode context shared by the stack and the commands it runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorModeState {
    current: EditorMode,
}

impl EditorModeState {
    pub fn new(current: EditorMode) -> Self {
        Self { current }
    }

    pub fn current(&self) -> EditorMode {
        self.current
    }

    pub fn is_read_only(&self) -> bool {
        self.current == EditorMode::ReadOnly
    }

    pub fn set(&mut self, mode: EditorMode) {
        self.current = mode;
    }
}
