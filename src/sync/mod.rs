// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Dynamic children synchronization.
//!
//! Some children exist only so the renderer has something to draw and edit in place: the name
//! label of a node, the text label of an edge, the behavior label of an output port. They are
//! fully derived from their owner, so they are inserted when a model is instantiated
//! ([`SyncMode::Materialize`]) and removed again before anything is persisted or snapshotted
//! ([`SyncMode::Strip`]).

use crate::model::{DerivedLabelKind, Element, ElementKind, PortKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Materialize,
    Strip,
}

pub const LABEL_SUFFIX: &str = "label";
pub const BEHAVIOR_SUFFIX: &str = "behavior";

/// Returns a copy of `tree` with derived children regenerated or removed.
///
/// Existing derived children are always dropped first, so materializing twice never duplicates
/// them and stale label text is replaced by the owner's current value.
pub fn synchronize(tree: &Element, mode: SyncMode) -> Element {
    let mut out = tree.clone();
    synchronize_in_place(&mut out, mode);
    out
}

fn synchronize_in_place(element: &mut Element, mode: SyncMode) {
    element.children_mut().retain(|child| !child.kind().is_derived());
    for child in element.children_mut().iter_mut() {
        synchronize_in_place(child, mode);
    }
    if mode == SyncMode::Materialize {
        if let Some(derived) = derived_child(element) {
            element.children_mut().insert(0, derived);
        }
    }
}

fn derived_child(owner: &Element) -> Option<Element> {
    let (suffix, kind, text) = match owner.kind() {
        ElementKind::Node(_) => (LABEL_SUFFIX, DerivedLabelKind::NodeText, owner.text()),
        ElementKind::Edge(_) => (LABEL_SUFFIX, DerivedLabelKind::EdgeText, owner.text()),
        ElementKind::Port(PortKind::Output) => (
            BEHAVIOR_SUFFIX,
            DerivedLabelKind::PortBehavior,
            owner.behavior(),
        ),
        ElementKind::Port(PortKind::Input)
        | ElementKind::Graph
        | ElementKind::DerivedLabel(_) => return None,
    };
    Some(
        Element::new(owner.id().with_suffix(suffix), ElementKind::DerivedLabel(kind))
            .with_text(text.unwrap_or_default()),
    )
}

/// Resolves an id to the element whose logical field it mirrors: the owner for a derived label,
/// the element itself otherwise.
pub fn logical_owner<'a>(tree: &'a Element, id: &str) -> Option<&'a Element> {
    let element = tree.find(id)?;
    if element.kind().is_derived() {
        tree.parent_of(id)
    } else {
        Some(element)
    }
}
