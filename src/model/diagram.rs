// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use thiserror::Error;

use super::element::{Element, ElementKind};
use super::geometry::{Bounds, Point};
use super::ids::ElementId;
use super::schema::{ElementSchema, ModelSnapshot, SchemaError};
use crate::sync::{synchronize, SyncMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll: Point,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll: Point::ORIGIN,
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("root element must be a graph, got {kind}")]
    NotGraphRoot { kind: ElementKind },
    #[error("graph element {id} may only appear as the root")]
    NestedGraph { id: String },
    #[error("duplicate element id: {id}")]
    DuplicateId { id: String },
    #[error("edge {edge} is missing its {endpoint}")]
    MissingEndpoint { edge: String, endpoint: &'static str },
    #[error("edge {edge} references unknown {endpoint} {target}")]
    DanglingEdge {
        edge: String,
        endpoint: &'static str,
        target: String,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// The authoritative diagram: the element tree plus cosmetic view state.
///
/// Viewport, selection and canvas bounds are not part of a [`ModelSnapshot`]; they are carried
/// over explicitly when a snapshot is rehydrated.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramModel {
    root: Element,
    viewport: Viewport,
    canvas_bounds: Option<Bounds>,
    selection: BTreeSet<ElementId>,
}

impl DiagramModel {
    pub fn new(root: Element) -> Result<Self, ModelError> {
        if root.kind() != ElementKind::Graph {
            return Err(ModelError::NotGraphRoot { kind: root.kind() });
        }
        Ok(Self {
            root,
            viewport: Viewport::default(),
            canvas_bounds: None,
            selection: BTreeSet::new(),
        })
    }

    /// An empty graph, the model before anything has been loaded.
    pub fn empty() -> Self {
        Self {
            root: Element::graph(ElementId::from_static("root")),
            viewport: Viewport::default(),
            canvas_bounds: None,
            selection: BTreeSet::new(),
        }
    }

    /// Builds a materialized model from a logical snapshot.
    pub fn from_snapshot(snapshot: &ModelSnapshot) -> Result<Self, ModelError> {
        let logical = snapshot.root().to_element()?;
        Self::new(synchronize(&logical, SyncMode::Materialize))
    }

    /// Builds a model from `snapshot` while keeping `previous`'s view state and the measured
    /// bounds of elements that still exist.
    pub fn rehydrate(snapshot: &ModelSnapshot, previous: &DiagramModel) -> Result<Self, ModelError> {
        let mut model = Self::from_snapshot(snapshot)?;
        model.viewport = previous.viewport;
        model.canvas_bounds = previous.canvas_bounds;

        let measured = previous
            .root
            .descendants()
            .into_iter()
            .filter_map(|e| e.dynamic_bounds().map(|b| (e.id().clone(), b)))
            .collect::<BTreeMap<_, _>>();
        for (id, bounds) in measured {
            if let Some(element) = model.root.find_mut(id.as_str()) {
                element.set_dynamic_bounds(Some(bounds));
            }
        }

        model.selection = previous
            .selection
            .iter()
            .filter(|id| model.root.contains(id.as_str()))
            .cloned()
            .collect();
        Ok(model)
    }

    /// Detached logical copy: derived children and runtime decorations removed.
    pub fn snapshot(&self) -> ModelSnapshot {
        let mut logical = synchronize(&self.root, SyncMode::Strip);
        logical.clear_runtime_state();
        ModelSnapshot::new(ElementSchema::from_element(&logical))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn find(&self, id: &str) -> Option<&Element> {
        self.root.find(id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.root.find_mut(id)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn canvas_bounds(&self) -> Option<Bounds> {
        self.canvas_bounds
    }

    pub fn set_canvas_bounds(&mut self, bounds: Option<Bounds>) {
        self.canvas_bounds = bounds;
    }

    pub fn selection(&self) -> &BTreeSet<ElementId> {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut BTreeSet<ElementId> {
        &mut self.selection
    }

    /// Checks the tree invariants: graph root, unique ids, resolvable edge endpoints.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.root.kind() != ElementKind::Graph {
            return Err(ModelError::NotGraphRoot {
                kind: self.root.kind(),
            });
        }

        let all = self.root.descendants();
        let mut seen = HashSet::with_capacity(all.len());
        for element in &all {
            if !seen.insert(element.id().as_str()) {
                return Err(ModelError::DuplicateId {
                    id: element.id().to_string(),
                });
            }
            if element.kind() == ElementKind::Graph && element.id() != self.root.id() {
                return Err(ModelError::NestedGraph {
                    id: element.id().to_string(),
                });
            }
        }

        for edge in all.iter().filter(|e| e.kind().is_edge()) {
            for (endpoint, target) in [("source", edge.source_id()), ("target", edge.target_id())] {
                let Some(target) = target else {
                    return Err(ModelError::MissingEndpoint {
                        edge: edge.id().to_string(),
                        endpoint,
                    });
                };
                if !seen.contains(target.as_str()) {
                    return Err(ModelError::DanglingEdge {
                        edge: edge.id().to_string(),
                        endpoint,
                        target: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// True when any node has no position or sits at the origin.
    pub fn has_unpositioned_nodes(&self) -> bool {
        self.root
            .descendants()
            .into_iter()
            .filter(|e| e.kind().is_node())
            .any(|node| node.position().map_or(true, |p| p.is_origin()))
    }

    /// Bounds of `id` in root coordinates.
    pub fn absolute_bounds(&self, id: &str) -> Option<Bounds> {
        fn walk(element: &Element, id: &str, offset: Point) -> Option<Bounds> {
            let local = element.position().unwrap_or(Point::ORIGIN);
            let origin = if element.kind() == ElementKind::Graph {
                offset
            } else {
                offset.translate(local.x, local.y)
            };
            if element.id().as_str() == id {
                let size = element.effective_size().unwrap_or_default();
                return Some(Bounds::from_parts(origin, size));
            }
            element
                .children()
                .iter()
                .find_map(|child| walk(child, id, origin))
        }
        walk(&self.root, id, Point::ORIGIN)
    }

    /// Union of the absolute bounds of every node, or of the given elements when `ids` is not
    /// empty. `None` when nothing matched.
    pub fn diagram_bounds(&self, ids: &[ElementId]) -> Option<Bounds> {
        let targets: Vec<&str> = if ids.is_empty() {
            self.root
                .descendants()
                .into_iter()
                .filter(|e| e.kind().is_node())
                .map(|e| e.id().as_str())
                .collect()
        } else {
            ids.iter().map(ElementId::as_str).collect()
        };
        targets
            .into_iter()
            .filter_map(|id| self.absolute_bounds(id))
            .reduce(|acc, b| acc.union(&b))
    }
}
