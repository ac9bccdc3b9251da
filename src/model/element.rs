// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Typed element tree.
//!
//! Elements own their children (nodes own ports and derived labels, the graph owns nodes and
//! edges). Edges only reference their endpoints by id.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::geometry::{Bounds, Dimension, Point};
use super::ids::ElementId;
use super::label::LabelAssignment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Storage,
    Function,
    InputOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortKind {
    Input,
    /// Output ports carry a behavior description.
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    Arrow,
}

/// Runtime-only label children regenerated from their owner on every materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DerivedLabelKind {
    NodeText,
    EdgeText,
    PortBehavior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Graph,
    Node(NodeKind),
    Port(PortKind),
    Edge(EdgeKind),
    DerivedLabel(DerivedLabelKind),
}

impl ElementKind {
    pub const ALL: [ElementKind; 10] = [
        ElementKind::Graph,
        ElementKind::Node(NodeKind::Storage),
        ElementKind::Node(NodeKind::Function),
        ElementKind::Node(NodeKind::InputOutput),
        ElementKind::Port(PortKind::Input),
        ElementKind::Port(PortKind::Output),
        ElementKind::Edge(EdgeKind::Arrow),
        ElementKind::DerivedLabel(DerivedLabelKind::NodeText),
        ElementKind::DerivedLabel(DerivedLabelKind::EdgeText),
        ElementKind::DerivedLabel(DerivedLabelKind::PortBehavior),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Node(NodeKind::Storage) => "node:storage",
            Self::Node(NodeKind::Function) => "node:function",
            Self::Node(NodeKind::InputOutput) => "node:input-output",
            Self::Port(PortKind::Input) => "port:dfd-input",
            Self::Port(PortKind::Output) => "port:dfd-output",
            Self::Edge(EdgeKind::Arrow) => "edge:arrow",
            Self::DerivedLabel(DerivedLabelKind::NodeText) => "label:node-text",
            Self::DerivedLabel(DerivedLabelKind::EdgeText) => "label:edge-text",
            Self::DerivedLabel(DerivedLabelKind::PortBehavior) => "label:port-behavior",
        }
    }

    pub fn is_node(self) -> bool {
        matches!(self, Self::Node(_))
    }

    pub fn is_port(self) -> bool {
        matches!(self, Self::Port(_))
    }

    pub fn is_edge(self) -> bool {
        matches!(self, Self::Edge(_))
    }

    pub fn is_derived(self) -> bool {
        matches!(self, Self::DerivedLabel(_))
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown element type: {value}")]
pub struct ParseElementKindError {
    value: String,
}

impl FromStr for ElementKind {
    type Err = ParseElementKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseElementKindError {
                value: s.to_owned(),
            })
    }
}

/// Runtime feature markers. Never persisted; recomputed from the kind on every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Selectable,
    Movable,
    Deletable,
    EditableText,
    Connectable,
    Layoutable,
}

impl Feature {
    pub fn defaults_for(kind: ElementKind) -> BTreeSet<Feature> {
        use Feature::*;
        let features: &[Feature] = match kind {
            ElementKind::Graph => &[],
            ElementKind::Node(_) => &[Selectable, Movable, Deletable, EditableText, Layoutable],
            ElementKind::Port(_) => &[Selectable, Movable, Deletable, Connectable, Layoutable],
            ElementKind::Edge(_) => &[Selectable, Deletable, EditableText],
            ElementKind::DerivedLabel(_) => &[EditableText],
        };
        features.iter().copied().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: ElementId,
    kind: ElementKind,
    position: Option<Point>,
    size: Option<Dimension>,
    text: Option<String>,
    behavior: Option<String>,
    labels: Vec<LabelAssignment>,
    source_id: Option<ElementId>,
    target_id: Option<ElementId>,
    children: Vec<Element>,
    extra: BTreeMap<String, serde_json::Value>,
    features: BTreeSet<Feature>,
    dynamic_bounds: Option<Bounds>,
}

impl Element {
    pub fn new(id: ElementId, kind: ElementKind) -> Self {
        Self {
            id,
            kind,
            position: None,
            size: None,
            text: None,
            behavior: None,
            labels: Vec::new(),
            source_id: None,
            target_id: None,
            children: Vec::new(),
            extra: BTreeMap::new(),
            features: Feature::defaults_for(kind),
            dynamic_bounds: None,
        }
    }

    pub fn graph(id: ElementId) -> Self {
        Self::new(id, ElementKind::Graph)
    }

    pub fn node(id: ElementId, kind: NodeKind, position: Point, text: impl Into<String>) -> Self {
        Self::new(id, ElementKind::Node(kind))
            .with_position(position)
            .with_text(text)
    }

    pub fn port(id: ElementId, kind: PortKind, position: Point) -> Self {
        let port = Self::new(id, ElementKind::Port(kind)).with_position(position);
        match kind {
            PortKind::Output => port.with_behavior(""),
            PortKind::Input => port,
        }
    }

    pub fn edge(id: ElementId, source_id: ElementId, target_id: ElementId) -> Self {
        let mut edge = Self::new(id, ElementKind::Edge(EdgeKind::Arrow));
        edge.source_id = Some(source_id);
        edge.target_id = Some(target_id);
        edge
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_size(mut self, size: Dimension) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_behavior(mut self, behavior: impl Into<String>) -> Self {
        self.behavior = Some(behavior.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn set_position(&mut self, position: Option<Point>) {
        self.position = position;
    }

    pub fn size(&self) -> Option<Dimension> {
        self.size
    }

    pub fn set_size(&mut self, size: Option<Dimension>) {
        self.size = size;
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text;
    }

    pub fn behavior(&self) -> Option<&str> {
        self.behavior.as_deref()
    }

    pub fn set_behavior(&mut self, behavior: Option<String>) {
        self.behavior = behavior;
    }

    pub fn labels(&self) -> &[LabelAssignment] {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut Vec<LabelAssignment> {
        &mut self.labels
    }

    pub fn source_id(&self) -> Option<&ElementId> {
        self.source_id.as_ref()
    }

    pub fn target_id(&self) -> Option<&ElementId> {
        self.target_id.as_ref()
    }

    pub fn set_endpoints(&mut self, source_id: Option<ElementId>, target_id: Option<ElementId>) {
        self.source_id = source_id;
        self.target_id = target_id;
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Element> {
        &mut self.children
    }

    /// Unrecognized document fields, carried through load and save untouched.
    pub fn extra(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.extra
    }

    pub fn extra_mut(&mut self) -> &mut BTreeMap<String, serde_json::Value> {
        &mut self.extra
    }

    pub fn features(&self) -> &BTreeSet<Feature> {
        &self.features
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn dynamic_bounds(&self) -> Option<Bounds> {
        self.dynamic_bounds
    }

    pub fn set_dynamic_bounds(&mut self, bounds: Option<Bounds>) {
        self.dynamic_bounds = bounds;
    }

    /// Size the element renders at: measured bounds first, then the declared size.
    pub fn effective_size(&self) -> Option<Dimension> {
        self.dynamic_bounds
            .map(|bounds| bounds.size())
            .filter(|size| !size.is_empty())
            .or(self.size)
    }

    /// Drops runtime-only decorations (features and dynamic bounds) from the whole subtree.
    pub(crate) fn clear_runtime_state(&mut self) {
        self.features.clear();
        self.dynamic_bounds = None;
        for child in &mut self.children {
            child.clear_runtime_state();
        }
    }

    /// Recomputes the default feature set for the whole subtree.
    pub(crate) fn reset_features(&mut self) {
        self.features = Feature::defaults_for(self.kind);
        for child in &mut self.children {
            child.reset_features();
        }
    }

    pub fn find(&self, id: &str) -> Option<&Element> {
        if self.id.as_str() == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id.as_str() == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Returns the element that directly owns `id`, if any.
    pub fn parent_of(&self, id: &str) -> Option<&Element> {
        if self.children.iter().any(|child| child.id.as_str() == id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.parent_of(id))
    }

    /// Removes the descendant with `id` (and its subtree). The receiver itself is never removed.
    pub fn remove_descendant(&mut self, id: &str) -> Option<Element> {
        if let Some(index) = self.children.iter().position(|c| c.id.as_str() == id) {
            return Some(self.children.remove(index));
        }
        self.children
            .iter_mut()
            .find_map(|child| child.remove_descendant(id))
    }

    /// Depth-first, pre-order walk including the receiver.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, out: &mut Vec<&'a Element>) {
        out.push(self);
        for child in &self.children {
            child.collect_descendants(out);
        }
    }
}
