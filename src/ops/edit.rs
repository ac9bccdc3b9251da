// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Structural edits. All of them undo by restoring the before-snapshot.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use super::{Action, Command, CommandContext, CommandError, CommandKind, Execution, SnapshotMemo};
use crate::model::{
    DiagramModel, Element, ElementId, ElementKind, Feature, LabelAssignment, PortKind,
    DERIVED_SEPARATOR,
};
use crate::sync::{logical_owner, synchronize, SyncMode};

#[derive(Debug)]
pub struct EditCommand {
    action: Action,
    memo: Option<SnapshotMemo>,
}

impl EditCommand {
    pub fn new(action: Action) -> Self {
        Self { action, memo: None }
    }

    fn memo(&self) -> Result<&SnapshotMemo, CommandError> {
        self.memo
            .as_ref()
            .ok_or(CommandError::NotExecuted(self.action.kind()))
    }
}

#[async_trait]
impl Command for EditCommand {
    fn kind(&self) -> CommandKind {
        self.action.kind()
    }

    async fn execute(
        &mut self,
        model: &DiagramModel,
        ctx: &mut CommandContext,
    ) -> Result<Execution, CommandError> {
        let mut next = model.clone();
        apply(&mut next, &self.action, ctx)?;
        resync(&mut next);
        self.memo = Some(SnapshotMemo::new(model, &next));
        debug!(kind = %self.action.kind(), "edit applied");
        Ok(Execution::Applied(next))
    }

    fn undo(
        &mut self,
        model: &DiagramModel,
        _ctx: &mut CommandContext,
    ) -> Result<DiagramModel, CommandError> {
        Ok(DiagramModel::rehydrate(&self.memo()?.before, model)?)
    }

    fn redo(
        &mut self,
        model: &DiagramModel,
        _ctx: &mut CommandContext,
    ) -> Result<DiagramModel, CommandError> {
        Ok(DiagramModel::rehydrate(&self.memo()?.after, model)?)
    }
}

/// New elements need a fresh id outside the derived namespace; a derived id cloned from the
/// tree would otherwise outlive its owner and block recreating it.
fn ensure_absent(model: &DiagramModel, id: &ElementId) -> Result<(), CommandError> {
    if id.as_str().contains(DERIVED_SEPARATOR) {
        return Err(CommandError::InvalidEdit(format!("{id} is a derived id")));
    }
    if model.find(id.as_str()).is_some() {
        return Err(CommandError::AlreadyExists(id.to_string()));
    }
    Ok(())
}

fn find_mut<'a>(model: &'a mut DiagramModel, id: &ElementId) -> Result<&'a mut Element, CommandError> {
    model
        .find_mut(id.as_str())
        .ok_or_else(|| CommandError::NotFound(id.to_string()))
}

fn node_mut<'a>(model: &'a mut DiagramModel, id: &ElementId) -> Result<&'a mut Element, CommandError> {
    let element = find_mut(model, id)?;
    if !element.kind().is_node() {
        return Err(CommandError::InvalidEdit(format!("{id} is not a node")));
    }
    Ok(element)
}

fn apply(
    model: &mut DiagramModel,
    action: &Action,
    ctx: &CommandContext,
) -> Result<(), CommandError> {
    match action {
        Action::CreateNode {
            id,
            kind,
            position,
            size,
            text,
        } => {
            ensure_absent(model, id)?;
            let mut node = Element::node(id.clone(), *kind, *position, text.clone());
            node.set_size(*size);
            model.root_mut().children_mut().push(node);
        }
        Action::CreatePort {
            id,
            kind,
            node_id,
            position,
        } => {
            ensure_absent(model, id)?;
            let node = node_mut(model, node_id)?;
            node.children_mut()
                .push(Element::port(id.clone(), *kind, *position));
        }
        Action::CreateEdge {
            id,
            source_id,
            target_id,
            text,
        } => {
            ensure_absent(model, id)?;
            for endpoint in [source_id, target_id] {
                let element = model
                    .find(endpoint.as_str())
                    .ok_or_else(|| CommandError::NotFound(endpoint.to_string()))?;
                if !element.has_feature(Feature::Connectable) && !element.kind().is_node() {
                    return Err(CommandError::InvalidEdit(format!(
                        "{endpoint} cannot be connected"
                    )));
                }
            }
            let mut edge = Element::edge(id.clone(), source_id.clone(), target_id.clone());
            edge.set_text(text.clone());
            model.root_mut().children_mut().push(edge);
        }
        Action::DeleteElements { ids } => delete(model, ids)?,
        Action::EditText { element_id, text } => {
            let owner_id = logical_owner(model.root(), element_id.as_str())
                .map(|owner| owner.id().clone())
                .ok_or_else(|| CommandError::NotFound(element_id.to_string()))?;
            let owner = find_mut(model, &owner_id)?;
            match owner.kind() {
                ElementKind::Node(_) | ElementKind::Edge(_) => owner.set_text(Some(text.clone())),
                ElementKind::Port(PortKind::Output) => owner.set_behavior(Some(text.clone())),
                ElementKind::Port(PortKind::Input)
                | ElementKind::Graph
                | ElementKind::DerivedLabel(_) => {
                    return Err(CommandError::InvalidEdit(format!(
                        "{owner_id} has no editable text"
                    )));
                }
            }
        }
        Action::Move { moves } => {
            for step in moves {
                let element = find_mut(model, &step.element_id)?;
                if !element.has_feature(Feature::Movable) {
                    return Err(CommandError::InvalidEdit(format!(
                        "{} cannot be moved",
                        step.element_id
                    )));
                }
                element.set_position(Some(step.to));
            }
        }
        Action::AssignLabel {
            node_id,
            assignment,
        } => {
            if !ctx.label_types.contains_value(
                assignment.label_type_id(),
                assignment.label_type_value_id(),
            ) {
                return Err(CommandError::InvalidEdit(format!(
                    "unknown label {}/{}",
                    assignment.label_type_id(),
                    assignment.label_type_value_id()
                )));
            }
            let node = node_mut(model, node_id)?;
            if node.labels().contains(assignment) {
                return Err(CommandError::InvalidEdit(format!(
                    "{node_id} already carries {}",
                    describe(assignment)
                )));
            }
            node.labels_mut().push(assignment.clone());
        }
        Action::UnassignLabel {
            node_id,
            assignment,
        } => {
            let node = node_mut(model, node_id)?;
            let Some(index) = node.labels().iter().position(|a| a == assignment) else {
                return Err(CommandError::InvalidEdit(format!(
                    "{node_id} does not carry {}",
                    describe(assignment)
                )));
            };
            node.labels_mut().remove(index);
        }
        other => {
            return Err(CommandError::InvalidEdit(format!(
                "{} is not a structural edit",
                other.kind()
            )));
        }
    }
    Ok(())
}

fn describe(assignment: &LabelAssignment) -> String {
    format!(
        "{}/{}",
        assignment.label_type_id(),
        assignment.label_type_value_id()
    )
}

/// Removes `ids` and everything that can no longer exist without them: owned children go with
/// their owner, edges go with either endpoint.
fn delete(model: &mut DiagramModel, ids: &[ElementId]) -> Result<(), CommandError> {
    for id in ids {
        if id == model.root().id() {
            return Err(CommandError::InvalidEdit(
                "the diagram root cannot be deleted".to_owned(),
            ));
        }
        let element = model
            .find(id.as_str())
            .ok_or_else(|| CommandError::NotFound(id.to_string()))?;
        if !element.has_feature(Feature::Deletable) {
            return Err(CommandError::InvalidEdit(format!("{id} cannot be deleted")));
        }
        model.root_mut().remove_descendant(id.as_str());
    }

    loop {
        let present: HashSet<String> = model
            .root()
            .descendants()
            .into_iter()
            .map(|e| e.id().to_string())
            .collect();
        let dangling: Vec<ElementId> = model
            .root()
            .descendants()
            .into_iter()
            .filter(|e| e.kind().is_edge())
            .filter(|edge| {
                [edge.source_id(), edge.target_id()]
                    .into_iter()
                    .any(|end| end.map_or(true, |id| !present.contains(id.as_str())))
            })
            .map(|edge| edge.id().clone())
            .collect();
        if dangling.is_empty() {
            break;
        }
        for id in dangling {
            debug!(edge = %id, "removing edge with deleted endpoint");
            model.root_mut().remove_descendant(id.as_str());
        }
    }

    let remaining: HashSet<ElementId> = model
        .root()
        .descendants()
        .into_iter()
        .map(|e| e.id().clone())
        .collect();
    model.selection_mut().retain(|id| remaining.contains(id));
    Ok(())
}

/// Regenerates derived children after an edit, keeping measured bounds of those that survive.
fn resync(model: &mut DiagramModel) {
    let measured: Vec<_> = model
        .root()
        .descendants()
        .into_iter()
        .filter(|e| e.kind().is_derived())
        .filter_map(|e| e.dynamic_bounds().map(|b| (e.id().clone(), b)))
        .collect();
    let materialized = synchronize(model.root(), SyncMode::Materialize);
    *model.root_mut() = materialized;
    for (id, bounds) in measured {
        if let Some(element) = model.find_mut(id.as_str()) {
            element.set_dynamic_bounds(Some(bounds));
        }
    }
}
