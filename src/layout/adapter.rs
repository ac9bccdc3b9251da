// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::bridge::{from_layout_output, to_layout_input};
use super::{LayoutEngine, LayoutError};
use crate::model::{DiagramModel, EditorModeState};

/// Runs a [`LayoutEngine`] against a diagram model.
///
/// The engine is synchronous and may be slow, so it runs on tokio's blocking pool.
#[derive(Clone)]
pub struct LayoutAdapter {
    engine: Arc<dyn LayoutEngine>,
}

impl fmt::Debug for LayoutAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutAdapter").finish_non_exhaustive()
    }
}

impl LayoutAdapter {
    pub fn new(engine: Arc<dyn LayoutEngine>) -> Self {
        Self { engine }
    }

    /// Lays out `model`. In read-only mode the model is returned unchanged and the engine is not
    /// invoked.
    pub async fn layout(
        &self,
        model: &DiagramModel,
        mode: &EditorModeState,
    ) -> Result<DiagramModel, LayoutError> {
        if mode.is_read_only() {
            debug!("editor is read-only; skipping layout");
            return Ok(model.clone());
        }

        let input = to_layout_input(model);
        let nodes = input.nodes.len();
        let engine = Arc::clone(&self.engine);
        let output = tokio::task::spawn_blocking(move || engine.compute(input))
            .await
            .map_err(|err| LayoutError::Worker(err.to_string()))??;

        let next = from_layout_output(model, &output)?;
        info!(nodes, "layout applied");
        Ok(next)
    }
}
