// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Layered left-to-right layout backed by `rust-sugiyama`.
//!
//! The crate only ranks and orders vertices; sizes are applied here. Each connected component is
//! laid out in columns (one per layer), components are stacked vertically, and nodes without any
//! edge end up in a row below everything else.

use std::collections::{BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};

use rust_sugiyama::configure::Config;
use tracing::debug;

use super::bridge::{LayoutGraph, LayoutNode, LayoutPort};
use super::{LayoutEngine, LayoutError};
use crate::model::{Dimension, Point, PortKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SugiyamaEngine {
    horizontal_spacing: f64,
    vertical_spacing: f64,
    margin: f64,
}

impl Default for SugiyamaEngine {
    fn default() -> Self {
        Self::new(80.0, 40.0, 20.0)
    }
}

impl SugiyamaEngine {
    pub fn new(horizontal_spacing: f64, vertical_spacing: f64, margin: f64) -> Self {
        Self {
            horizontal_spacing,
            vertical_spacing,
            margin,
        }
    }

    pub fn horizontal_spacing(&self) -> f64 {
        self.horizontal_spacing
    }

    pub fn vertical_spacing(&self) -> f64 {
        self.vertical_spacing
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }
}

type Components = Vec<(Vec<(usize, (f64, f64))>, f64, f64)>;

impl LayoutEngine for SugiyamaEngine {
    fn compute(&self, mut graph: LayoutGraph) -> Result<LayoutGraph, LayoutError> {
        let node_index: HashMap<&str, u32> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i as u32))
            .collect();
        let port_owner: HashMap<&str, u32> = graph
            .nodes
            .iter()
            .enumerate()
            .flat_map(|(i, node)| node.ports.iter().map(move |p| (p.id.as_str(), i as u32)))
            .collect();
        let resolve = |id: &str| {
            node_index
                .get(id)
                .or_else(|| port_owner.get(id))
                .copied()
        };

        let mut edges = BTreeSet::new();
        for edge in &graph.edges {
            match (resolve(edge.source.as_str()), resolve(edge.target.as_str())) {
                (Some(source), Some(target)) if source != target => {
                    edges.insert((source, target));
                }
                (Some(_), Some(_)) => {}
                _ => debug!(edge = %edge.id, "skipping edge with endpoint outside the layout"),
            }
        }
        let edges: Vec<(u32, u32)> = edges.into_iter().collect();

        let components = if edges.is_empty() {
            Vec::new()
        } else {
            debug!(
                nodes = graph.nodes.len(),
                edges = edges.len(),
                "running sugiyama layout"
            );
            run_sugiyama(&edges)?
        };

        let sizes: Vec<Dimension> = graph.nodes.iter().map(|node| node.size).collect();
        let mut positions: Vec<Option<Point>> = vec![None; graph.nodes.len()];
        let mut top = self.margin;

        for (coords, _, _) in &components {
            let columns = layer_columns(coords, &edges);
            let mut column_x = self.margin;
            let mut component_height: f64 = 0.0;
            for column in &columns {
                let mut y = top;
                let mut column_width: f64 = 0.0;
                for &vertex in column {
                    let Some(size) = sizes.get(vertex) else {
                        return Err(LayoutError::EngineFailure(format!(
                            "layout returned unknown vertex {vertex}"
                        )));
                    };
                    positions[vertex] = Some(Point::new(column_x, y));
                    y += size.height + self.vertical_spacing;
                    column_width = column_width.max(size.width);
                }
                component_height = component_height.max(y - top - self.vertical_spacing);
                column_x += column_width + self.horizontal_spacing;
            }
            top += component_height + self.vertical_spacing;
        }

        let mut x = self.margin;
        for (vertex, position) in positions.iter_mut().enumerate() {
            if position.is_none() {
                *position = Some(Point::new(x, top));
                x += sizes[vertex].width + self.horizontal_spacing;
            }
        }

        for (node, position) in graph.nodes.iter_mut().zip(positions) {
            node.position = position;
            place_ports(node);
        }
        Ok(graph)
    }
}

fn run_sugiyama(edges: &[(u32, u32)]) -> Result<Components, LayoutError> {
    let config = Config {
        minimum_length: 1,
        vertex_spacing: 1.0,
        ..Default::default()
    };
    let result = catch_unwind(AssertUnwindSafe(|| {
        rust_sugiyama::from_edges(edges, &config)
    }));
    match result {
        Ok(components) if !components.is_empty() => Ok(components),
        Ok(_) => Err(LayoutError::EngineFailure(
            "sugiyama returned no components".to_owned(),
        )),
        Err(panic) => {
            let message = panic
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| panic.downcast_ref::<&str>().map(|s| (*s).to_owned()))
                .unwrap_or_else(|| "unknown panic".to_owned());
            Err(LayoutError::Panicked(message))
        }
    }
}

/// Groups the vertices of one component into layers ordered along the edge direction, each layer
/// ordered by the crate's in-layer coordinate.
fn layer_columns(coords: &[(usize, (f64, f64))], edges: &[(u32, u32)]) -> Vec<Vec<usize>> {
    let mut levels: Vec<f64> = coords.iter().map(|(_, (_, y))| *y).collect();
    levels.sort_by(f64::total_cmp);
    levels.dedup_by(|a, b| (*a - *b).abs() < 1e-6);

    let level_of = |y: f64| {
        levels
            .iter()
            .position(|level| (level - y).abs() < 1e-6)
            .unwrap_or(0)
    };
    let layer: HashMap<usize, usize> = coords
        .iter()
        .map(|&(vertex, (_, y))| (vertex, level_of(y)))
        .collect();

    let (mut forward, mut backward) = (0usize, 0usize);
    for &(source, target) in edges {
        let (Some(s), Some(t)) = (layer.get(&(source as usize)), layer.get(&(target as usize)))
        else {
            continue;
        };
        if s < t {
            forward += 1;
        } else if s > t {
            backward += 1;
        }
    }

    let mut columns: Vec<Vec<(f64, usize)>> = vec![Vec::new(); levels.len()];
    for &(vertex, (x, _)) in coords {
        let mut index = layer.get(&vertex).copied().unwrap_or(0);
        if backward > forward {
            index = levels.len() - 1 - index;
        }
        columns[index].push((x, vertex));
    }
    columns
        .into_iter()
        .map(|mut column| {
            column.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            column.into_iter().map(|(_, vertex)| vertex).collect()
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    West,
    East,
    North,
    South,
}

fn side_of(port: &LayoutPort, node: Dimension) -> Side {
    match port.position {
        Some(hint) => {
            let cx = hint.x + port.size.width / 2.0;
            let cy = hint.y + port.size.height / 2.0;
            let candidates = [
                (cx, Side::West),
                (node.width - cx, Side::East),
                (cy, Side::North),
                (node.height - cy, Side::South),
            ];
            candidates
                .into_iter()
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map_or(Side::West, |(_, side)| side)
        }
        None => match port.kind {
            PortKind::Input => Side::West,
            PortKind::Output => Side::East,
        },
    }
}

/// Places ports just outside their node's border, spread evenly along the side they face.
fn place_ports(node: &mut LayoutNode) {
    let size = node.size;
    let sides: Vec<Side> = node.ports.iter().map(|port| side_of(port, size)).collect();
    for side in [Side::West, Side::East, Side::North, Side::South] {
        let on_side: Vec<usize> = (0..node.ports.len()).filter(|&i| sides[i] == side).collect();
        let slots = on_side.len() as f64 + 1.0;
        for (k, &i) in on_side.iter().enumerate() {
            let port = &mut node.ports[i];
            let fraction = (k as f64 + 1.0) / slots;
            let (w, h) = (port.size.width, port.size.height);
            port.position = Some(match side {
                Side::West => Point::new(-w, size.height * fraction - h / 2.0),
                Side::East => Point::new(size.width, size.height * fraction - h / 2.0),
                Side::North => Point::new(size.width * fraction - w / 2.0, -h),
                Side::South => Point::new(size.width * fraction - w / 2.0, size.height),
            });
        }
    }
}
