// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Actions and the commands that execute them.
//!
//! An [`Action`] is plain data describing a requested change. The stack looks up the factory
//! registered for the action's [`CommandKind`] in a [`CommandRegistry`], builds a [`Command`],
//! and executes it against the current model. Commands that end up in history keep whatever they
//! need to undo and redo themselves.

pub mod edit;
pub mod layout;
pub mod persist;
pub mod view;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::layout::{LayoutAdapter, LayoutError};
use crate::model::{
    Bounds, DiagramModel, Dimension, EditorModeState, ElementId, LabelAssignment,
    LabelTypeRegistry, ModelError, ModelSnapshot, NodeKind, Point, PortKind, Viewport,
};
use crate::store::{DocumentError, Storage, StorageError};

pub use edit::EditCommand;
pub use layout::LayoutCommand;
pub use persist::{LoadCommand, LoadSource, SaveCommand};
pub use view::{measure_declared_bounds, ViewCommand};

#[derive(Debug, Clone, PartialEq)]
pub struct ElementMove {
    pub element_id: ElementId,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementBounds {
    pub element_id: ElementId,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateNode {
        id: ElementId,
        kind: NodeKind,
        position: Point,
        size: Option<Dimension>,
        text: String,
    },
    CreatePort {
        id: ElementId,
        kind: PortKind,
        node_id: ElementId,
        position: Point,
    },
    CreateEdge {
        id: ElementId,
        source_id: ElementId,
        target_id: ElementId,
        text: Option<String>,
    },
    DeleteElements {
        ids: Vec<ElementId>,
    },
    /// Targets a node, edge or output port, or one of their derived labels.
    EditText {
        element_id: ElementId,
        text: String,
    },
    Move {
        moves: Vec<ElementMove>,
    },
    AssignLabel {
        node_id: ElementId,
        assignment: LabelAssignment,
    },
    UnassignLabel {
        node_id: ElementId,
        assignment: LabelAssignment,
    },
    Load,
    LoadDefault,
    Save {
        file_name: Option<String>,
    },
    Layout,
    Select {
        ids: Vec<ElementId>,
        deselect_all: bool,
    },
    SetViewport {
        viewport: Viewport,
    },
    BringToFront {
        ids: Vec<ElementId>,
    },
    /// Empty `element_ids` fits the whole diagram.
    FitToView {
        element_ids: Vec<ElementId>,
        padding: Option<f64>,
        max_zoom: Option<f64>,
    },
    Center {
        element_ids: Vec<ElementId>,
    },
    /// The renderer measured the canvas and the elements on it.
    BoundsMeasured {
        canvas: Bounds,
        elements: Vec<ElementBounds>,
    },
    Undo,
    Redo,
}

impl Action {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::CreateNode { .. } => CommandKind::CreateNode,
            Self::CreatePort { .. } => CommandKind::CreatePort,
            Self::CreateEdge { .. } => CommandKind::CreateEdge,
            Self::DeleteElements { .. } => CommandKind::DeleteElements,
            Self::EditText { .. } => CommandKind::EditText,
            Self::Move { .. } => CommandKind::Move,
            Self::AssignLabel { .. } => CommandKind::AssignLabel,
            Self::UnassignLabel { .. } => CommandKind::UnassignLabel,
            Self::Load => CommandKind::Load,
            Self::LoadDefault => CommandKind::LoadDefault,
            Self::Save { .. } => CommandKind::Save,
            Self::Layout => CommandKind::Layout,
            Self::Select { .. } => CommandKind::Select,
            Self::SetViewport { .. } => CommandKind::SetViewport,
            Self::BringToFront { .. } => CommandKind::BringToFront,
            Self::FitToView { .. } => CommandKind::FitToView,
            Self::Center { .. } => CommandKind::Center,
            Self::BoundsMeasured { .. } => CommandKind::BoundsMeasured,
            Self::Undo => CommandKind::Undo,
            Self::Redo => CommandKind::Redo,
        }
    }

    pub fn fit_whole_diagram() -> Self {
        Self::FitToView {
            element_ids: Vec::new(),
            padding: None,
            max_zoom: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    CreateNode,
    CreatePort,
    CreateEdge,
    DeleteElements,
    EditText,
    Move,
    AssignLabel,
    UnassignLabel,
    Load,
    LoadDefault,
    Save,
    Layout,
    Select,
    SetViewport,
    BringToFront,
    FitToView,
    Center,
    BoundsMeasured,
    Undo,
    Redo,
}

impl CommandKind {
    /// Whether an executed command of this kind is pushed onto the undo history.
    ///
    /// Cosmetic kinds fire far more often than structural edits and stay out of history. Undo and
    /// redo operate on history instead of entering it.
    pub fn records_history(self) -> bool {
        match self {
            Self::CreateNode
            | Self::CreatePort
            | Self::CreateEdge
            | Self::DeleteElements
            | Self::EditText
            | Self::Move
            | Self::AssignLabel
            | Self::UnassignLabel
            | Self::Load
            | Self::LoadDefault
            | Self::Save
            | Self::Layout => true,
            Self::Select
            | Self::SetViewport
            | Self::BringToFront
            | Self::FitToView
            | Self::Center
            | Self::BoundsMeasured
            | Self::Undo
            | Self::Redo => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateNode => "create-node",
            Self::CreatePort => "create-port",
            Self::CreateEdge => "create-edge",
            Self::DeleteElements => "delete-elements",
            Self::EditText => "edit-text",
            Self::Move => "move",
            Self::AssignLabel => "assign-label",
            Self::UnassignLabel => "unassign-label",
            Self::Load => "load",
            Self::LoadDefault => "load-default",
            Self::Save => "save",
            Self::Layout => "layout",
            Self::Select => "select",
            Self::SetViewport => "set-viewport",
            Self::BringToFront => "bring-to-front",
            Self::FitToView => "fit-to-view",
            Self::Center => "center",
            Self::BoundsMeasured => "bounds-measured",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed document: {0}")]
    MalformedDocument(#[source] DocumentError),
    #[error("failed to encode document: {0}")]
    Encode(#[source] DocumentError),
    #[error("no {0} collaborator is configured")]
    MissingCollaborator(&'static str),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("command produced an invalid model: {0}")]
    InvalidModel(#[from] ModelError),
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("element already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid edit: {0}")]
    InvalidEdit(String),
    #[error("{0} command has not been executed")]
    NotExecuted(CommandKind),
}

/// Result of a successful `execute`.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    /// The command ran; the model becomes current (it may equal the old one, e.g. after a save).
    Applied(DiagramModel),
    /// The user abandoned the operation. Nothing changes and nothing is recorded.
    Aborted,
    /// The command had nothing to do (e.g. layout in read-only mode). Nothing is recorded.
    Skipped,
}

/// Settings commands read from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSettings {
    pub fit_padding: f64,
    pub fit_max_zoom: f64,
    pub default_file_name: String,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            fit_padding: 20.0,
            fit_max_zoom: 1.0,
            default_file_name: "diagram.json".to_owned(),
        }
    }
}

/// Everything a command may touch besides the model: the label-type registry, the editor mode,
/// the external collaborators, and the follow-up queue.
#[derive(Default)]
pub struct CommandContext {
    pub label_types: LabelTypeRegistry,
    pub editor_mode: EditorModeState,
    storage: Option<Arc<dyn Storage>>,
    layout: Option<LayoutAdapter>,
    settings: CommandSettings,
    follow_ups: Vec<Action>,
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("label_types", &self.label_types)
            .field("editor_mode", &self.editor_mode)
            .field("storage", &self.storage.is_some())
            .field("layout", &self.layout.is_some())
            .field("settings", &self.settings)
            .field("follow_ups", &self.follow_ups)
            .finish()
    }
}

impl CommandContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_layout(mut self, layout: LayoutAdapter) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_settings(mut self, settings: CommandSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn storage(&self) -> Result<Arc<dyn Storage>, CommandError> {
        self.storage
            .clone()
            .ok_or(CommandError::MissingCollaborator("storage"))
    }

    pub fn layout_adapter(&self) -> Result<LayoutAdapter, CommandError> {
        self.layout
            .clone()
            .ok_or(CommandError::MissingCollaborator("layout engine"))
    }

    pub fn settings(&self) -> &CommandSettings {
        &self.settings
    }

    /// Queues an action to be dispatched after the current command succeeds.
    pub fn queue(&mut self, action: Action) {
        self.follow_ups.push(action);
    }

    pub fn take_follow_ups(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.follow_ups)
    }
}

/// A reversible unit of model mutation.
#[async_trait]
pub trait Command: Send {
    fn kind(&self) -> CommandKind;

    async fn execute(
        &mut self,
        model: &DiagramModel,
        ctx: &mut CommandContext,
    ) -> Result<Execution, CommandError>;

    fn undo(
        &mut self,
        model: &DiagramModel,
        _ctx: &mut CommandContext,
    ) -> Result<DiagramModel, CommandError> {
        Ok(model.clone())
    }

    fn redo(
        &mut self,
        model: &DiagramModel,
        _ctx: &mut CommandContext,
    ) -> Result<DiagramModel, CommandError> {
        Ok(model.clone())
    }

    /// Kind of a future action the stack must observe before dispatching anything else queued
    /// after this command.
    fn blocks_until(&self) -> Option<CommandKind> {
        None
    }
}

/// Before/after snapshots kept by commands that undo by restoring the previous tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotMemo {
    pub before: ModelSnapshot,
    pub after: ModelSnapshot,
}

impl SnapshotMemo {
    pub fn new(before: &DiagramModel, after: &DiagramModel) -> Self {
        Self {
            before: before.snapshot(),
            after: after.snapshot(),
        }
    }
}

pub type CommandFactory = fn(Action) -> Box<dyn Command>;

/// Maps action kinds to the factories building their commands.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    factories: HashMap<CommandKind, CommandFactory>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in command. Undo and redo are handled by the stack itself.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in [
            CommandKind::CreateNode,
            CommandKind::CreatePort,
            CommandKind::CreateEdge,
            CommandKind::DeleteElements,
            CommandKind::EditText,
            CommandKind::Move,
            CommandKind::AssignLabel,
            CommandKind::UnassignLabel,
        ] {
            registry.register(kind, |action| Box::new(EditCommand::new(action)));
        }
        for kind in [
            CommandKind::Select,
            CommandKind::SetViewport,
            CommandKind::BringToFront,
            CommandKind::FitToView,
            CommandKind::Center,
            CommandKind::BoundsMeasured,
        ] {
            registry.register(kind, |action| Box::new(ViewCommand::new(action)));
        }
        registry.register(CommandKind::Load, |_| {
            Box::new(LoadCommand::new(LoadSource::Storage))
        });
        registry.register(CommandKind::LoadDefault, |_| {
            Box::new(LoadCommand::new(LoadSource::BuiltIn))
        });
        registry.register(CommandKind::Save, |action| {
            let file_name = match action {
                Action::Save { file_name } => file_name,
                _ => None,
            };
            Box::new(SaveCommand::new(file_name))
        });
        registry.register(CommandKind::Layout, |_| Box::new(LayoutCommand::new()));
        registry
    }

    pub fn register(&mut self, kind: CommandKind, factory: CommandFactory) {
        self.factories.insert(kind, factory);
    }

    pub fn contains(&self, kind: CommandKind) -> bool {
        self.factories.contains_key(&kind)
    }

    pub fn create(&self, action: Action) -> Option<Box<dyn Command>> {
        let factory = self.factories.get(&action.kind())?;
        Some(factory(action))
    }
}

#[cfg(test)]
mod tests;
