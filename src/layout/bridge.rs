// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Two-way mapping between the diagram model and the engine's shape-only graph.

use tracing::debug;

use super::LayoutError;
use crate::model::{DiagramModel, Dimension, Element, ElementId, ElementKind, Point, PortKind};

pub const DEFAULT_NODE_SIZE: Dimension = Dimension {
    width: 100.0,
    height: 50.0,
};
pub const DEFAULT_PORT_SIZE: Dimension = Dimension {
    width: 10.0,
    height: 10.0,
};

/// Shape-only view of a diagram handed to a [`super::LayoutEngine`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutGraph {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: ElementId,
    /// Current position, used as a hint on input and required on output.
    pub position: Option<Point>,
    pub size: Dimension,
    pub ports: Vec<LayoutPort>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPort {
    pub id: ElementId,
    pub kind: PortKind,
    /// Relative to the owning node.
    pub position: Option<Point>,
    pub size: Dimension,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEdge {
    pub id: ElementId,
    pub source: ElementId,
    pub target: ElementId,
}

fn shape_size(element: &Element, fallback: Dimension) -> Dimension {
    element
        .effective_size()
        .filter(|size| !size.is_empty())
        .unwrap_or(fallback)
}

/// Builds the engine input. Measured bounds win over declared sizes.
pub fn to_layout_input(model: &DiagramModel) -> LayoutGraph {
    let nodes = model
        .root()
        .children()
        .iter()
        .filter(|child| child.kind().is_node())
        .map(|node| LayoutNode {
            id: node.id().clone(),
            position: node.position(),
            size: shape_size(node, DEFAULT_NODE_SIZE),
            ports: node
                .children()
                .iter()
                .filter_map(|child| match child.kind() {
                    ElementKind::Port(kind) => Some(LayoutPort {
                        id: child.id().clone(),
                        kind,
                        position: child.position(),
                        size: shape_size(child, DEFAULT_PORT_SIZE),
                    }),
                    _ => None,
                })
                .collect(),
        })
        .collect();

    let edges = model
        .root()
        .descendants()
        .into_iter()
        .filter(|element| element.kind().is_edge())
        .filter_map(|edge| {
            Some(LayoutEdge {
                id: edge.id().clone(),
                source: edge.source_id()?.clone(),
                target: edge.target_id()?.clone(),
            })
        })
        .collect();

    LayoutGraph { nodes, edges }
}

/// Moves a border-placed port so its center sits on the border it touches.
///
/// `position` is the port's top-left corner relative to its parent. A coordinate `<= 0` is on the
/// left/top border, a coordinate `>= parent` extent on the right/bottom border.
pub fn center_port_on_border(position: Point, port: Dimension, parent: Dimension) -> Point {
    let mut out = position;
    if out.x <= 0.0 {
        out.x += port.width / 2.0;
    } else if out.x >= parent.width {
        out.x -= port.width / 2.0;
    }
    if out.y <= 0.0 {
        out.y += port.height / 2.0;
    } else if out.y >= parent.height {
        out.y -= port.height / 2.0;
    }
    out
}

/// Writes engine positions back into a copy of `model`.
///
/// Only positions change; every other field, derived children and runtime state included, is
/// carried over from `model`. Elements the engine left unpositioned keep their position.
pub fn from_layout_output(
    model: &DiagramModel,
    output: &LayoutGraph,
) -> Result<DiagramModel, LayoutError> {
    let mut next = model.clone();
    for laid_out in &output.nodes {
        let node = next
            .find_mut(laid_out.id.as_str())
            .ok_or_else(|| LayoutError::UnknownElement {
                id: laid_out.id.to_string(),
            })?;
        if !node.kind().is_node() {
            return Err(LayoutError::KindMismatch {
                id: laid_out.id.to_string(),
                expected: "node",
            });
        }
        if let Some(position) = laid_out.position {
            node.set_position(Some(position));
        }

        for port in &laid_out.ports {
            let element = node
                .children_mut()
                .iter_mut()
                .find(|child| child.id() == &port.id)
                .ok_or_else(|| LayoutError::UnknownElement {
                    id: port.id.to_string(),
                })?;
            if !element.kind().is_port() {
                return Err(LayoutError::KindMismatch {
                    id: port.id.to_string(),
                    expected: "port",
                });
            }
            if let Some(position) = port.position {
                let centered = center_port_on_border(position, port.size, laid_out.size);
                element.set_position(Some(centered));
            }
        }
    }
    debug!(nodes = output.nodes.len(), "applied layout output");
    Ok(next)
}
