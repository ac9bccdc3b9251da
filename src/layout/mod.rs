// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Automatic layout.
//!
//! The model is bridged to a shape-only [`LayoutGraph`], handed to a [`LayoutEngine`], and the
//! resulting positions are written back with ports re-centered on their node's border.

pub mod adapter;
pub mod bridge;
pub mod sugiyama;

use thiserror::Error;

pub use adapter::LayoutAdapter;
pub use bridge::{
    center_port_on_border, from_layout_output, to_layout_input, LayoutEdge, LayoutGraph,
    LayoutNode, LayoutPort,
};
pub use sugiyama::SugiyamaEngine;

/// A layered-graph layout algorithm.
pub trait LayoutEngine: Send + Sync {
    fn compute(&self, graph: LayoutGraph) -> Result<LayoutGraph, LayoutError>;
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout engine failed: {0}")]
    EngineFailure(String),
    #[error("layout engine panicked: {0}")]
    Panicked(String),
    #[error("layout output references unknown element {id}")]
    UnknownElement { id: String },
    #[error("layout output places {id} as a {expected} but it is not one")]
    KindMismatch { id: String, expected: &'static str },
    #[error("layout worker failed: {0}")]
    Worker(String),
}
