// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Label types and the registry nodes reference them through.

use std::collections::BTreeMap;

use super::ids::{LabelTypeId, LabelValueId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTypeValue {
    id: LabelValueId,
    text: String,
}

impl LabelTypeValue {
    pub fn new(id: LabelValueId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    pub fn id(&self) -> &LabelValueId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelType {
    id: LabelTypeId,
    name: String,
    values: Vec<LabelTypeValue>,
}

impl LabelType {
    pub fn new(id: LabelTypeId, name: impl Into<String>, values: Vec<LabelTypeValue>) -> Self {
        Self {
            id,
            name: name.into(),
            values,
        }
    }

    pub fn id(&self) -> &LabelTypeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[LabelTypeValue] {
        &self.values
    }

    pub fn value(&self, value_id: &LabelValueId) -> Option<&LabelTypeValue> {
        self.values.iter().find(|value| value.id() == value_id)
    }
}

/// A node's reference to one value of one label type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelAssignment {
    label_type_id: LabelTypeId,
    label_type_value_id: LabelValueId,
}

impl LabelAssignment {
    pub fn new(label_type_id: LabelTypeId, label_type_value_id: LabelValueId) -> Self {
        Self {
            label_type_id,
            label_type_value_id,
        }
    }

    pub fn label_type_id(&self) -> &LabelTypeId {
        &self.label_type_id
    }

    pub fn label_type_value_id(&self) -> &LabelValueId {
        &self.label_type_value_id
    }
}

/// Registry of the label types known to the current document.
///
/// Registration order is preserved so a save writes label types back in the order they were
/// loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTypeRegistry {
    order: Vec<LabelTypeId>,
    types: BTreeMap<LabelTypeId, LabelType>,
}

impl LabelTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label_types(&self) -> Vec<&LabelType> {
        self.order
            .iter()
            .filter_map(|id| self.types.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.types.clear();
    }

    /// Registers `label_type`, replacing an existing type with the same id in place.
    pub fn register(&mut self, label_type: LabelType) {
        let id = label_type.id().clone();
        if self.types.insert(id.clone(), label_type).is_none() {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &LabelTypeId) -> Option<&LabelType> {
        self.types.get(id)
    }

    pub fn contains_value(&self, type_id: &LabelTypeId, value_id: &LabelValueId) -> bool {
        self.get(type_id)
            .is_some_and(|label_type| label_type.value(value_id).is_some())
    }

    pub fn replace_all(&mut self, label_types: impl IntoIterator<Item = LabelType>) {
        self.clear();
        for label_type in label_types {
            self.register(label_type);
        }
    }
}
