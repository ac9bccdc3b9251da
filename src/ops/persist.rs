// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Load, default-load and save.

use async_trait::async_trait;
use tracing::{error, info};

use super::{Action, Command, CommandContext, CommandError, CommandKind, Execution};
use crate::model::{DiagramModel, EditorMode, LabelTypeRegistry, ModelSnapshot};
use crate::store::{parse_document, serialize_document, Picked, DEFAULT_DOCUMENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Ask the storage collaborator for a document.
    Storage,
    /// The built-in default diagram.
    BuiltIn,
}

/// Everything a load replaces, captured on both sides so undo and redo swap it atomically.
#[derive(Debug, Clone)]
struct LoadState {
    snapshot: ModelSnapshot,
    label_types: LabelTypeRegistry,
    editor_mode: EditorMode,
}

impl LoadState {
    fn capture(model: &DiagramModel, ctx: &CommandContext) -> Self {
        Self {
            snapshot: model.snapshot(),
            label_types: ctx.label_types.clone(),
            editor_mode: ctx.editor_mode.current(),
        }
    }

    fn restore(
        &self,
        model: &DiagramModel,
        ctx: &mut CommandContext,
    ) -> Result<DiagramModel, CommandError> {
        let restored = DiagramModel::rehydrate(&self.snapshot, model)?;
        ctx.label_types = self.label_types.clone();
        ctx.editor_mode.set(self.editor_mode);
        Ok(restored)
    }
}

#[derive(Debug)]
pub struct LoadCommand {
    source: LoadSource,
    before: Option<LoadState>,
    after: Option<LoadState>,
}

impl LoadCommand {
    pub fn new(source: LoadSource) -> Self {
        Self {
            source,
            before: None,
            after: None,
        }
    }

    async fn read(&self, ctx: &CommandContext) -> Result<Option<String>, CommandError> {
        match self.source {
            LoadSource::BuiltIn => Ok(Some(DEFAULT_DOCUMENT.to_owned())),
            LoadSource::Storage => {
                let storage = ctx.storage()?;
                match storage.pick_file_for_read().await {
                    Ok(Picked::Document(text)) => Ok(Some(text)),
                    Ok(Picked::Aborted) => Ok(None),
                    Err(err) => {
                        error!(error = %err, "failed to read diagram document");
                        Err(err.into())
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Command for LoadCommand {
    fn kind(&self) -> CommandKind {
        match self.source {
            LoadSource::Storage => CommandKind::Load,
            LoadSource::BuiltIn => CommandKind::LoadDefault,
        }
    }

    async fn execute(
        &mut self,
        model: &DiagramModel,
        ctx: &mut CommandContext,
    ) -> Result<Execution, CommandError> {
        let Some(text) = self.read(ctx).await? else {
            info!("load aborted by user");
            return Ok(Execution::Aborted);
        };

        let loaded = parse_document(&text).map_err(|err| {
            error!(error = %err, "failed to load diagram document");
            CommandError::MalformedDocument(err)
        })?;

        let before = LoadState::capture(model, ctx);

        let mut next = loaded.model;
        next.set_viewport(model.viewport());
        next.set_canvas_bounds(model.canvas_bounds());
        ctx.label_types.replace_all(loaded.label_types);
        if let Some(mode) = loaded.editor_mode {
            ctx.editor_mode.set(mode);
        }

        if next.has_unpositioned_nodes() {
            ctx.queue(Action::Layout);
        }
        ctx.queue(Action::fit_whole_diagram());

        info!(
            source = ?self.source,
            elements = next.root().descendants().len(),
            label_types = ctx.label_types.len(),
            "diagram loaded"
        );
        self.after = Some(LoadState::capture(&next, ctx));
        self.before = Some(before);
        Ok(Execution::Applied(next))
    }

    fn undo(
        &mut self,
        model: &DiagramModel,
        ctx: &mut CommandContext,
    ) -> Result<DiagramModel, CommandError> {
        self.before
            .as_ref()
            .ok_or(CommandError::NotExecuted(self.kind()))?
            .restore(model, ctx)
    }

    fn redo(
        &mut self,
        model: &DiagramModel,
        ctx: &mut CommandContext,
    ) -> Result<DiagramModel, CommandError> {
        self.after
            .as_ref()
            .ok_or(CommandError::NotExecuted(self.kind()))?
            .restore(model, ctx)
    }

    /// Follow-ups (layout, fit) need the renderer to have measured the new elements first.
    fn blocks_until(&self) -> Option<CommandKind> {
        Some(CommandKind::BoundsMeasured)
    }
}

/// Writes the current diagram through the storage collaborator. Never changes the model, so
/// undo and redo keep the default no-op behavior.
#[derive(Debug)]
pub struct SaveCommand {
    file_name: Option<String>,
}

impl SaveCommand {
    pub fn new(file_name: Option<String>) -> Self {
        Self { file_name }
    }
}

#[async_trait]
impl Command for SaveCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::Save
    }

    async fn execute(
        &mut self,
        model: &DiagramModel,
        ctx: &mut CommandContext,
    ) -> Result<Execution, CommandError> {
        let storage = ctx.storage()?;
        let name = self
            .file_name
            .clone()
            .unwrap_or_else(|| ctx.settings().default_file_name.clone());
        let text = serialize_document(model, &ctx.label_types, ctx.editor_mode.current())
            .map_err(CommandError::Encode)?;

        if let Err(err) = storage.write_file(&name, text.as_bytes()).await {
            error!(error = %err, file = %name, "failed to save diagram");
            return Err(err.into());
        }
        info!(file = %name, bytes = text.len(), "diagram saved");
        Ok(Execution::Applied(model.clone()))
    }
}
