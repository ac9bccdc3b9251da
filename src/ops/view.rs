// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Cosmetic commands: selection, viewport, z-order and measurement. None of them enter history.

use async_trait::async_trait;
use tracing::debug;

use super::{Action, Command, CommandContext, CommandError, CommandKind, ElementBounds, Execution};
use crate::model::{Bounds, DiagramModel, Element, ElementId, Feature, Point, Viewport};

#[derive(Debug)]
pub struct ViewCommand {
    action: Action,
}

impl ViewCommand {
    pub fn new(action: Action) -> Self {
        Self { action }
    }
}

#[async_trait]
impl Command for ViewCommand {
    fn kind(&self) -> CommandKind {
        self.action.kind()
    }

    async fn execute(
        &mut self,
        model: &DiagramModel,
        ctx: &mut CommandContext,
    ) -> Result<Execution, CommandError> {
        let mut next = model.clone();
        match &self.action {
            Action::Select { ids, deselect_all } => {
                if *deselect_all {
                    next.selection_mut().clear();
                }
                for id in ids {
                    match model.find(id.as_str()) {
                        Some(element) if element.has_feature(Feature::Selectable) => {
                            next.selection_mut().insert(id.clone());
                        }
                        _ => debug!(element = %id, "ignoring unselectable element"),
                    }
                }
            }
            Action::SetViewport { viewport } => {
                if !(viewport.zoom.is_finite() && viewport.zoom > 0.0) {
                    return Err(CommandError::InvalidEdit(format!(
                        "zoom must be positive, got {}",
                        viewport.zoom
                    )));
                }
                next.set_viewport(*viewport);
            }
            Action::BringToFront { ids } => {
                for id in ids {
                    if !bring_to_front(next.root_mut(), id.as_str()) {
                        debug!(element = %id, "bring-to-front target not found");
                    }
                }
            }
            Action::FitToView {
                element_ids,
                padding,
                max_zoom,
            } => {
                let settings = ctx.settings();
                let padding = padding.unwrap_or(settings.fit_padding);
                let max_zoom = max_zoom.unwrap_or(settings.fit_max_zoom);
                if let Some(viewport) = fit_viewport(model, element_ids, padding, max_zoom) {
                    next.set_viewport(viewport);
                }
            }
            Action::Center { element_ids } => {
                if let Some(viewport) = center_viewport(model, element_ids) {
                    next.set_viewport(viewport);
                }
            }
            Action::BoundsMeasured { canvas, elements } => {
                next.set_canvas_bounds(Some(*canvas));
                for ElementBounds { element_id, bounds } in elements {
                    match next.find_mut(element_id.as_str()) {
                        Some(element) => element.set_dynamic_bounds(Some(*bounds)),
                        None => debug!(element = %element_id, "measured element not in model"),
                    }
                }
            }
            other => {
                return Err(CommandError::InvalidEdit(format!(
                    "{} is not a view command",
                    other.kind()
                )));
            }
        }
        Ok(Execution::Applied(next))
    }
}

fn bring_to_front(element: &mut Element, id: &str) -> bool {
    let children = element.children_mut();
    if let Some(index) = children.iter().position(|c| c.id().as_str() == id) {
        let child = children.remove(index);
        children.push(child);
        return true;
    }
    children.iter_mut().any(|child| bring_to_front(child, id))
}

fn known_canvas(model: &DiagramModel) -> Option<Bounds> {
    model.canvas_bounds().filter(|canvas| !canvas.is_empty())
}

/// Viewport showing `ids` (or the whole diagram) centered in the canvas, zoomed to fit inside
/// `padding` and never beyond `max_zoom`. `None` while the canvas has not been measured.
fn fit_viewport(
    model: &DiagramModel,
    ids: &[ElementId],
    padding: f64,
    max_zoom: f64,
) -> Option<Viewport> {
    let canvas = known_canvas(model)?;
    let bounds = model.diagram_bounds(ids)?;
    let fit = |available: f64, extent: f64| {
        if extent > 0.0 {
            (available - 2.0 * padding) / extent
        } else {
            max_zoom
        }
    };
    let zoom = fit(canvas.width, bounds.width)
        .min(fit(canvas.height, bounds.height))
        .min(max_zoom);
    if !(zoom.is_finite() && zoom > 0.0) {
        debug!(zoom, "canvas too small to fit diagram");
        return None;
    }
    Some(Viewport {
        scroll: scroll_for(bounds.center(), canvas, zoom),
        zoom,
    })
}

fn center_viewport(model: &DiagramModel, ids: &[ElementId]) -> Option<Viewport> {
    let canvas = known_canvas(model)?;
    let bounds = model.diagram_bounds(ids)?;
    let zoom = model.viewport().zoom;
    Some(Viewport {
        scroll: scroll_for(bounds.center(), canvas, zoom),
        zoom,
    })
}

fn scroll_for(center: Point, canvas: Bounds, zoom: f64) -> Point {
    Point::new(
        center.x - canvas.width / (2.0 * zoom),
        center.y - canvas.height / (2.0 * zoom),
    )
}

/// Builds the measurement a renderer would report if every element rendered at its declared size.
/// Hosts without a renderer dispatch this to open the bounds-measured gate.
pub fn measure_declared_bounds(model: &DiagramModel, canvas: Bounds) -> Action {
    let elements = model
        .root()
        .descendants()
        .into_iter()
        .filter_map(|element| {
            let size = element.size()?;
            let position = element.position().unwrap_or(Point::ORIGIN);
            Some(ElementBounds {
                element_id: element.id().clone(),
                bounds: Bounds::from_parts(position, size),
            })
        })
        .collect();
    Action::BoundsMeasured { canvas, elements }
}
