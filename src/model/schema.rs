// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Schema-only (serializable) form of the element tree and the snapshot built on it.

use std::collections::BTreeMap;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::element::{Element, ElementKind, ParseElementKindError};
use super::geometry::{Dimension, Point};
use super::ids::{ElementId, IdError, LabelTypeId, LabelValueId};
use super::label::LabelAssignment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ElementSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Dimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LabelAssignmentSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSchema>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabelAssignmentSchema {
    pub label_type_id: String,
    pub label_type_value_id: String,
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid {field} id {value:?}: {source}")]
    InvalidId {
        field: &'static str,
        value: String,
        #[source]
        source: IdError,
    },
    #[error(transparent)]
    UnknownKind(#[from] ParseElementKindError),
    #[error("element {id} ({kind}) is missing required field {field}")]
    MissingField {
        id: String,
        kind: ElementKind,
        field: &'static str,
    },
}

fn parse_id<T>(field: &'static str, value: &str) -> Result<super::ids::Id<T>, SchemaError> {
    super::ids::Id::new(value.to_owned()).map_err(|source| SchemaError::InvalidId {
        field,
        value: value.to_owned(),
        source,
    })
}

impl ElementSchema {
    pub fn from_element(element: &Element) -> Self {
        Self {
            kind: element.kind().as_str().to_owned(),
            id: element.id().as_str().to_owned(),
            position: element.position(),
            size: element.size(),
            text: element.text().map(str::to_owned),
            behavior: element.behavior().map(str::to_owned),
            labels: element
                .labels()
                .iter()
                .map(|assignment| LabelAssignmentSchema {
                    label_type_id: assignment.label_type_id().as_str().to_owned(),
                    label_type_value_id: assignment.label_type_value_id().as_str().to_owned(),
                })
                .collect(),
            source_id: element.source_id().map(|id| id.as_str().to_owned()),
            target_id: element.target_id().map(|id| id.as_str().to_owned()),
            children: element.children().iter().map(Self::from_element).collect(),
            extra: element.extra().clone(),
        }
    }

    /// Builds the typed element tree. Runtime features are initialized from each element's kind;
    /// dynamic bounds start empty.
    pub fn to_element(&self) -> Result<Element, SchemaError> {
        let kind = self.kind.parse::<ElementKind>()?;
        let id: ElementId = parse_id("element", &self.id)?;
        let mut element = Element::new(id, kind);
        element.set_position(self.position);
        element.set_size(self.size);
        element.set_text(self.text.clone());
        element.set_behavior(self.behavior.clone());

        for assignment in &self.labels {
            let type_id: LabelTypeId = parse_id("labelTypeId", &assignment.label_type_id)?;
            let value_id: LabelValueId =
                parse_id("labelTypeValueId", &assignment.label_type_value_id)?;
            element
                .labels_mut()
                .push(LabelAssignment::new(type_id, value_id));
        }

        if kind.is_edge() {
            let missing = |field| SchemaError::MissingField {
                id: self.id.clone(),
                kind,
                field,
            };
            let source = self.source_id.as_deref().ok_or_else(|| missing("sourceId"))?;
            let target = self.target_id.as_deref().ok_or_else(|| missing("targetId"))?;
            element.set_endpoints(
                Some(parse_id("sourceId", source)?),
                Some(parse_id("targetId", target)?),
            );
        }

        for child in &self.children {
            element.children_mut().push(child.to_element()?);
        }
        *element.extra_mut() = self.extra.clone();
        Ok(element)
    }
}

/// Immutable, detached copy of the logical element tree.
///
/// Snapshots never carry runtime decorations or derived children; cloning shares the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    root: Arc<ElementSchema>,
}

impl ModelSnapshot {
    pub fn new(root: ElementSchema) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &ElementSchema {
        &self.root
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self.root.as_ref())
    }
}
