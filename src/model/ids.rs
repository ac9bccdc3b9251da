// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use thiserror::Error;

/// A typed identifier for diagram elements and label registry entries.
///
/// Ids are opaque strings coming from documents the editor did not author. They must be
/// non-empty, carry no control characters, and never contain [`DERIVED_SEPARATOR`]: that
/// character is reserved for ids the editor derives itself (`<node>#label`), so a derived id can
/// never collide with one a document or an edit supplies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        validate_id(&value)?;
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    /// Builds an id from a literal known to be valid.
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(validate_id(value).is_ok());
        Self {
            value: value.to_owned(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }

    /// Derives an id in the reserved namespace by appending `#<suffix>`.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            value: format!("{}{DERIVED_SEPARATOR}{suffix}", self.value),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<T> Borrow<str> for Id<T> {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<T> FromStr for Id<T> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl<T> TryFrom<String> for Id<T> {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,
    #[error("id must not contain control characters")]
    ControlCharacter,
    #[error("id must not contain the reserved character '#'")]
    ReservedCharacter,
}

/// Separates an owner id from the suffix of an id derived from it.
pub const DERIVED_SEPARATOR: char = '#';

fn validate_id(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    if value.chars().any(char::is_control) {
        return Err(IdError::ControlCharacter);
    }
    if value.contains(DERIVED_SEPARATOR) {
        return Err(IdError::ReservedCharacter);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementIdTag {}
pub type ElementId = Id<ElementIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabelTypeIdTag {}
pub type LabelTypeId = Id<LabelTypeIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabelValueIdTag {}
pub type LabelValueId = Id<LabelValueIdTag>;
