// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use async_trait::async_trait;
use tracing::{debug, error};

use super::{Command, CommandContext, CommandError, CommandKind, Execution, SnapshotMemo};
use crate::model::DiagramModel;
use crate::store::preprocess_snapshot;

/// Runs the configured layout engine.
///
/// Redo replays the cached result: engines are not required to be deterministic.
#[derive(Debug, Default)]
pub struct LayoutCommand {
    memo: Option<SnapshotMemo>,
}

impl LayoutCommand {
    pub fn new() -> Self {
        Self::default()
    }

    fn memo(&self) -> Result<&SnapshotMemo, CommandError> {
        self.memo
            .as_ref()
            .ok_or(CommandError::NotExecuted(CommandKind::Layout))
    }
}

#[async_trait]
impl Command for LayoutCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::Layout
    }

    async fn execute(
        &mut self,
        model: &DiagramModel,
        ctx: &mut CommandContext,
    ) -> Result<Execution, CommandError> {
        if ctx.editor_mode.is_read_only() {
            debug!("layout skipped in read-only mode");
            return Ok(Execution::Skipped);
        }
        let adapter = ctx.layout_adapter()?;
        let next = adapter
            .layout(model, &ctx.editor_mode)
            .await
            .map_err(|err| {
                error!(error = %err, "layout failed");
                CommandError::Layout(err)
            })?;
        self.memo = Some(SnapshotMemo::new(model, &next));
        Ok(Execution::Applied(next))
    }

    fn undo(
        &mut self,
        model: &DiagramModel,
        _ctx: &mut CommandContext,
    ) -> Result<DiagramModel, CommandError> {
        let before =
            preprocess_snapshot(&self.memo()?.before).map_err(CommandError::MalformedDocument)?;
        Ok(DiagramModel::rehydrate(&before, model)?)
    }

    fn redo(
        &mut self,
        model: &DiagramModel,
        _ctx: &mut CommandContext,
    ) -> Result<DiagramModel, CommandError> {
        Ok(DiagramModel::rehydrate(&self.memo()?.after, model)?)
    }
}
