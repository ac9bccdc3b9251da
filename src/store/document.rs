// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persisted diagram document: `{ model, labelTypes?, editorMode? }`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::{
    DiagramModel, EditorMode, ElementSchema, IdError, LabelType, LabelTypeId, LabelTypeRegistry,
    LabelTypeValue, LabelValueId, ModelError, ModelSnapshot, ParseEditorModeError,
};

/// Keys recomputed on every load and therefore never trusted from a document.
pub const TRANSIENT_KEYS: [&str; 2] = ["features", "canvasBounds"];

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct DocumentJson {
    model: ElementSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_types: Option<Vec<LabelTypeJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    editor_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct LabelTypeJson {
    id: String,
    name: String,
    #[serde(default)]
    values: Vec<LabelTypeValueJson>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct LabelTypeValueJson {
    id: String,
    text: String,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("document does not match the diagram schema: {0}")]
    Shape(#[source] serde_json::Error),
    #[error("invalid {field} id {value:?}: {source}")]
    InvalidId {
        field: &'static str,
        value: String,
        #[source]
        source: IdError,
    },
    #[error(transparent)]
    EditorMode(#[from] ParseEditorModeError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result of parsing a document: a materialized, validated model plus its registries.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub model: DiagramModel,
    pub label_types: Vec<LabelType>,
    pub editor_mode: Option<EditorMode>,
}

/// Recursively removes the keys in [`TRANSIENT_KEYS`] from every object in `value`.
pub fn preprocess_schema(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in TRANSIENT_KEYS {
                map.remove(key);
            }
            for child in map.values_mut() {
                preprocess_schema(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(preprocess_schema),
        _ => {}
    }
}

/// Applies [`preprocess_schema`] to a snapshot.
pub fn preprocess_snapshot(snapshot: &ModelSnapshot) -> Result<ModelSnapshot, DocumentError> {
    let mut value = snapshot.to_value().map_err(DocumentError::Serialize)?;
    preprocess_schema(&mut value);
    let root: ElementSchema = serde_json::from_value(value).map_err(DocumentError::Shape)?;
    Ok(ModelSnapshot::new(root))
}

pub fn parse_document(text: &str) -> Result<LoadedDocument, DocumentError> {
    let mut value: Value = serde_json::from_str(text).map_err(DocumentError::Parse)?;
    preprocess_schema(&mut value);
    let doc: DocumentJson = serde_json::from_value(value).map_err(DocumentError::Shape)?;

    let model = DiagramModel::from_snapshot(&ModelSnapshot::new(doc.model))?;
    model.validate()?;

    let label_types = doc
        .label_types
        .unwrap_or_default()
        .into_iter()
        .map(label_type_from_json)
        .collect::<Result<Vec<_>, _>>()?;

    let editor_mode = doc
        .editor_mode
        .as_deref()
        .map(str::parse::<EditorMode>)
        .transpose()?;

    Ok(LoadedDocument {
        model,
        label_types,
        editor_mode,
    })
}

/// Serializes the logical content of `model` with the given registries as pretty JSON.
pub fn serialize_document(
    model: &DiagramModel,
    label_types: &LabelTypeRegistry,
    editor_mode: EditorMode,
) -> Result<String, DocumentError> {
    let snapshot = model.snapshot();
    let doc = DocumentJson {
        model: snapshot.root().clone(),
        label_types: Some(
            label_types
                .label_types()
                .into_iter()
                .map(label_type_to_json)
                .collect(),
        ),
        editor_mode: Some(editor_mode.as_str().to_owned()),
    };
    serde_json::to_string_pretty(&doc).map_err(DocumentError::Serialize)
}

/// JSON Schema of the persisted document.
pub fn document_schema() -> Value {
    schemars::schema_for!(DocumentJson).to_value()
}

fn label_type_from_json(json: LabelTypeJson) -> Result<LabelType, DocumentError> {
    let id = LabelTypeId::new(json.id.clone()).map_err(|source| DocumentError::InvalidId {
        field: "labelType",
        value: json.id,
        source,
    })?;
    let values = json
        .values
        .into_iter()
        .map(|value| {
            LabelValueId::new(value.id.clone())
                .map(|id| LabelTypeValue::new(id, value.text))
                .map_err(|source| DocumentError::InvalidId {
                    field: "labelTypeValue",
                    value: value.id,
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LabelType::new(id, json.name, values))
}

fn label_type_to_json(label_type: &LabelType) -> LabelTypeJson {
    LabelTypeJson {
        id: label_type.id().as_str().to_owned(),
        name: label_type.name().to_owned(),
        values: label_type
            .values()
            .iter()
            .map(|value| LabelTypeValueJson {
                id: value.id().as_str().to_owned(),
                text: value.text().to_owned(),
            })
            .collect(),
    }
}
