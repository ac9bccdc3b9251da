// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A diagram is a tree of typed elements under a graph root, plus the label-type registry and
//! editor mode that travel with it in a persisted document.

pub mod diagram;
pub mod editor_mode;
pub mod element;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod geometry;
pub mod ids;
pub mod label;
pub mod schema;

pub use diagram::{DiagramModel, ModelError, Viewport};
pub use editor_mode::{EditorMode, EditorModeState, ParseEditorModeError};
pub use element::{
    DerivedLabelKind, EdgeKind, Element, ElementKind, Feature, NodeKind, ParseElementKindError,
    PortKind,
};
pub use geometry::{Bounds, Dimension, Point};
pub use ids::{ElementId, Id, IdError, LabelTypeId, LabelValueId, DERIVED_SEPARATOR};
pub use label::{LabelAssignment, LabelType, LabelTypeRegistry, LabelTypeValue};
pub use schema::{ElementSchema, LabelAssignmentSchema, ModelSnapshot, SchemaError};
