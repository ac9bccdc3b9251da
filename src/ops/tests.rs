// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::{
    measure_declared_bounds, Action, Command, CommandContext, CommandError, CommandKind,
    CommandRegistry, EditCommand, ElementBounds, ElementMove, Execution, LayoutCommand,
    LoadCommand, LoadSource, SaveCommand, ViewCommand,
};
use crate::layout::{LayoutAdapter, SugiyamaEngine};
use crate::model::fixtures::{derived, eid, location_label_type, order_flow_materialized};
use crate::model::{
    Bounds, DiagramModel, EditorMode, ElementId, LabelAssignment, LabelTypeId, LabelValueId, NodeKind,
    Point, PortKind, Viewport,
};
use crate::store::{parse_document, MemoryStorage, Picked};

#[fixture]
fn model() -> DiagramModel {
    DiagramModel::new(order_flow_materialized()).expect("model")
}

#[fixture]
fn ctx() -> CommandContext {
    let mut ctx = CommandContext::new();
    ctx.label_types.register(location_label_type());
    ctx
}

fn applied(execution: Execution) -> DiagramModel {
    match execution {
        Execution::Applied(model) => model,
        other => panic!("expected applied execution, got {other:?}"),
    }
}

async fn run(
    command: &mut dyn Command,
    model: &DiagramModel,
    ctx: &mut CommandContext,
) -> Result<DiagramModel, CommandError> {
    command.execute(model, ctx).await.map(applied)
}

fn label(type_id: &str, value_id: &str) -> LabelAssignment {
    LabelAssignment::new(
        LabelTypeId::new(type_id).expect("label type id"),
        LabelValueId::new(value_id).expect("label value id"),
    )
}

fn with_canvas(mut model: DiagramModel, width: f64, height: f64) -> DiagramModel {
    model.set_canvas_bounds(Some(Bounds::new(0.0, 0.0, width, height)));
    model
}

#[test]
fn only_structural_and_persistence_kinds_record_history() {
    let recorded = [
        CommandKind::CreateNode,
        CommandKind::CreatePort,
        CommandKind::CreateEdge,
        CommandKind::DeleteElements,
        CommandKind::EditText,
        CommandKind::Move,
        CommandKind::AssignLabel,
        CommandKind::UnassignLabel,
        CommandKind::Load,
        CommandKind::LoadDefault,
        CommandKind::Save,
        CommandKind::Layout,
    ];
    let cosmetic = [
        CommandKind::Select,
        CommandKind::SetViewport,
        CommandKind::BringToFront,
        CommandKind::FitToView,
        CommandKind::Center,
        CommandKind::BoundsMeasured,
        CommandKind::Undo,
        CommandKind::Redo,
    ];
    assert!(recorded.iter().all(|kind| kind.records_history()));
    assert!(cosmetic.iter().all(|kind| !kind.records_history()));
}

#[test]
fn default_registry_covers_everything_but_undo_and_redo() {
    let registry = CommandRegistry::with_defaults();
    for action in [
        Action::Load,
        Action::LoadDefault,
        Action::Layout,
        Action::Save { file_name: None },
        Action::fit_whole_diagram(),
        Action::DeleteElements { ids: Vec::new() },
    ] {
        let kind = action.kind();
        let command = registry.create(action).expect("registered command");
        assert_eq!(command.kind(), kind);
    }
    assert!(!registry.contains(CommandKind::Undo));
    assert!(!registry.contains(CommandKind::Redo));
    assert!(registry.create(Action::Undo).is_none());
}

#[test]
fn load_blocks_until_bounds_are_measured() {
    let load = LoadCommand::new(LoadSource::Storage);
    assert_eq!(load.blocks_until(), Some(CommandKind::BoundsMeasured));
    assert_eq!(LayoutCommand::new().blocks_until(), None);
}

#[rstest]
#[tokio::test]
async fn create_node_materializes_its_label_and_undo_removes_it(
    model: DiagramModel,
    mut ctx: CommandContext,
) {
    let mut command = EditCommand::new(Action::CreateNode {
        id: eid("audit"),
        kind: NodeKind::Function,
        position: Point::new(600.0, 40.0),
        size: None,
        text: "Audit".to_owned(),
    });
    let next = run(&mut command, &model, &mut ctx).await.expect("create");
    assert!(next.find("audit").is_some());
    assert_eq!(
        next.find("audit#label").and_then(|label| label.text()),
        Some("Audit")
    );

    let undone = command.undo(&next, &mut ctx).expect("undo");
    assert!(undone.find("audit").is_none());
    assert_eq!(undone.snapshot(), model.snapshot());

    let redone = command.redo(&undone, &mut ctx).expect("redo");
    assert_eq!(redone.snapshot(), next.snapshot());
}

#[rstest]
#[tokio::test]
async fn label_like_node_ids_do_not_block_their_prefix(
    model: DiagramModel,
    mut ctx: CommandContext,
) {
    let create = |id: &str| {
        EditCommand::new(Action::CreateNode {
            id: eid(id),
            kind: NodeKind::Function,
            position: Point::new(600.0, 40.0),
            size: None,
            text: id.to_owned(),
        })
    };
    let first = run(&mut create("x-label"), &model, &mut ctx)
        .await
        .expect("create x-label");
    let second = run(&mut create("x"), &first, &mut ctx)
        .await
        .expect("create x");

    assert_eq!(second.find("x-label").and_then(|e| e.text()), Some("x-label"));
    assert_eq!(second.find("x#label").and_then(|e| e.text()), Some("x"));
    assert!(second.find("x-label#label").is_some());
}

#[rstest]
#[tokio::test]
async fn create_refuses_derived_ids(model: DiagramModel, mut ctx: CommandContext) {
    let mut command = EditCommand::new(Action::CreateNode {
        id: derived("audit", "label"),
        kind: NodeKind::Function,
        position: Point::ORIGIN,
        size: None,
        text: String::new(),
    });
    let err = run(&mut command, &model, &mut ctx)
        .await
        .expect_err("derived id");
    assert!(matches!(err, CommandError::InvalidEdit(_)));
}

#[rstest]
#[tokio::test]
async fn create_rejects_existing_ids(model: DiagramModel, mut ctx: CommandContext) {
    let mut command = EditCommand::new(Action::CreateNode {
        id: eid("process"),
        kind: NodeKind::Storage,
        position: Point::ORIGIN,
        size: None,
        text: String::new(),
    });
    let err = run(&mut command, &model, &mut ctx)
        .await
        .expect_err("duplicate id");
    assert!(matches!(err, CommandError::AlreadyExists(id) if id == "process"));
}

#[rstest]
#[tokio::test]
async fn ports_attach_to_nodes_only(model: DiagramModel, mut ctx: CommandContext) {
    let mut on_edge = EditCommand::new(Action::CreatePort {
        id: eid("bad-port"),
        kind: PortKind::Input,
        node_id: eid("e1"),
        position: Point::ORIGIN,
    });
    let err = run(&mut on_edge, &model, &mut ctx)
        .await
        .expect_err("port on edge");
    assert!(matches!(err, CommandError::InvalidEdit(_)));

    let mut on_node = EditCommand::new(Action::CreatePort {
        id: eid("orders-out"),
        kind: PortKind::Output,
        node_id: eid("orders"),
        position: Point::new(95.0, 20.0),
    });
    let next = run(&mut on_node, &model, &mut ctx).await.expect("port");
    let orders = next.find("orders").expect("orders");
    assert!(orders.children().iter().any(|c| c.id().as_str() == "orders-out"));
    assert!(next.find("orders-out#behavior").is_some());
}

#[rstest]
#[tokio::test]
async fn create_edge_requires_existing_endpoints(model: DiagramModel, mut ctx: CommandContext) {
    let mut command = EditCommand::new(Action::CreateEdge {
        id: eid("e3"),
        source_id: eid("orders-in"),
        target_id: eid("nowhere"),
        text: None,
    });
    let err = run(&mut command, &model, &mut ctx)
        .await
        .expect_err("dangling endpoint");
    assert!(matches!(err, CommandError::NotFound(id) if id == "nowhere"));
}

#[rstest]
#[tokio::test]
async fn deleting_a_node_cascades_to_its_ports_and_edges(
    mut model: DiagramModel,
    mut ctx: CommandContext,
) {
    model.selection_mut().insert(eid("process"));
    model.selection_mut().insert(eid("customer"));

    let mut command = EditCommand::new(Action::DeleteElements {
        ids: vec![eid("process")],
    });
    let next = run(&mut command, &model, &mut ctx).await.expect("delete");

    for gone in ["process", "process-in", "process-out", "e1", "e2", "e1#label"] {
        assert!(next.find(gone).is_none(), "{gone} should be gone");
    }
    assert!(next.find("customer-out").is_some());
    assert!(next.find("orders-in").is_some());
    assert_eq!(next.selection().iter().collect::<Vec<_>>(), vec![&eid("customer")]);

    let undone = command.undo(&next, &mut ctx).expect("undo");
    assert_eq!(undone.snapshot(), model.snapshot());
}

#[rstest]
#[case::root(eid("root"))]
#[case::derived_label(derived("process", "label"))]
#[tokio::test]
async fn undeletable_elements_are_refused(
    model: DiagramModel,
    mut ctx: CommandContext,
    #[case] id: ElementId,
) {
    let mut command = EditCommand::new(Action::DeleteElements { ids: vec![id] });
    let err = run(&mut command, &model, &mut ctx)
        .await
        .expect_err("refused");
    assert!(matches!(err, CommandError::InvalidEdit(_)));
}

#[rstest]
#[tokio::test]
async fn editing_a_derived_label_updates_its_owner(model: DiagramModel, mut ctx: CommandContext) {
    let mut rename = EditCommand::new(Action::EditText {
        element_id: derived("process", "label"),
        text: "Check order".to_owned(),
    });
    let next = run(&mut rename, &model, &mut ctx).await.expect("rename");
    assert_eq!(next.find("process").and_then(|e| e.text()), Some("Check order"));
    assert_eq!(
        next.find("process#label").and_then(|e| e.text()),
        Some("Check order")
    );

    let mut behavior = EditCommand::new(Action::EditText {
        element_id: derived("process-out", "behavior"),
        text: "set Checked = TRUE".to_owned(),
    });
    let next = run(&mut behavior, &next, &mut ctx).await.expect("behavior");
    assert_eq!(
        next.find("process-out").and_then(|e| e.behavior()),
        Some("set Checked = TRUE")
    );
    assert_eq!(
        next.find("process-out#behavior").and_then(|e| e.text()),
        Some("set Checked = TRUE")
    );
}

#[rstest]
#[tokio::test]
async fn input_ports_have_no_editable_text(model: DiagramModel, mut ctx: CommandContext) {
    let mut command = EditCommand::new(Action::EditText {
        element_id: eid("process-in"),
        text: "x".to_owned(),
    });
    let err = run(&mut command, &model, &mut ctx)
        .await
        .expect_err("input port text");
    assert!(matches!(err, CommandError::InvalidEdit(_)));
}

#[rstest]
#[tokio::test]
async fn move_changes_position_of_movable_elements_only(
    model: DiagramModel,
    mut ctx: CommandContext,
) {
    let mut command = EditCommand::new(Action::Move {
        moves: vec![ElementMove {
            element_id: eid("orders"),
            to: Point::new(420.0, 140.0),
        }],
    });
    let next = run(&mut command, &model, &mut ctx).await.expect("move");
    assert_eq!(
        next.find("orders").and_then(|e| e.position()),
        Some(Point::new(420.0, 140.0))
    );

    let mut edge_move = EditCommand::new(Action::Move {
        moves: vec![ElementMove {
            element_id: eid("e1"),
            to: Point::ORIGIN,
        }],
    });
    let err = run(&mut edge_move, &model, &mut ctx)
        .await
        .expect_err("edges are not movable");
    assert!(matches!(err, CommandError::InvalidEdit(_)));
}

#[rstest]
#[tokio::test]
async fn label_assignment_is_validated_against_the_registry(
    model: DiagramModel,
    mut ctx: CommandContext,
) {
    let mut assign = EditCommand::new(Action::AssignLabel {
        node_id: eid("process"),
        assignment: label("location", "on-prem"),
    });
    let next = run(&mut assign, &model, &mut ctx).await.expect("assign");
    assert_eq!(
        next.find("process").map(|e| e.labels().to_vec()),
        Some(vec![label("location", "on-prem")])
    );

    let mut again = EditCommand::new(Action::AssignLabel {
        node_id: eid("process"),
        assignment: label("location", "on-prem"),
    });
    assert!(run(&mut again, &next, &mut ctx).await.is_err());

    let mut unknown = EditCommand::new(Action::AssignLabel {
        node_id: eid("process"),
        assignment: label("location", "mars"),
    });
    assert!(run(&mut unknown, &model, &mut ctx).await.is_err());

    let mut unassign = EditCommand::new(Action::UnassignLabel {
        node_id: eid("customer"),
        assignment: label("location", "cloud"),
    });
    let next = run(&mut unassign, &model, &mut ctx).await.expect("unassign");
    assert!(next.find("customer").map_or(false, |e| e.labels().is_empty()));
}

#[rstest]
#[tokio::test]
async fn select_skips_unselectable_elements(model: DiagramModel, mut ctx: CommandContext) {
    let mut command = ViewCommand::new(Action::Select {
        ids: vec![eid("process"), derived("process", "label")],
        deselect_all: true,
    });
    let next = run(&mut command, &model, &mut ctx).await.expect("select");
    assert_eq!(next.selection().iter().collect::<Vec<_>>(), vec![&eid("process")]);
}

#[rstest]
#[tokio::test]
async fn set_viewport_rejects_non_positive_zoom(model: DiagramModel, mut ctx: CommandContext) {
    let mut command = ViewCommand::new(Action::SetViewport {
        viewport: Viewport {
            scroll: Point::ORIGIN,
            zoom: 0.0,
        },
    });
    assert!(run(&mut command, &model, &mut ctx).await.is_err());
}

#[rstest]
#[tokio::test]
async fn bring_to_front_moves_element_to_the_end(model: DiagramModel, mut ctx: CommandContext) {
    let mut command = ViewCommand::new(Action::BringToFront {
        ids: vec![eid("customer")],
    });
    let next = run(&mut command, &model, &mut ctx).await.expect("front");
    let last = next.root().children().last().expect("children");
    assert_eq!(last.id().as_str(), "customer");
    assert_eq!(next.root().children().len(), model.root().children().len());
}

#[rstest]
#[tokio::test]
async fn fit_to_view_centers_the_diagram_capped_at_max_zoom(
    model: DiagramModel,
    mut ctx: CommandContext,
) {
    let model = with_canvas(model, 600.0, 400.0);
    let mut command = ViewCommand::new(Action::fit_whole_diagram());
    let next = run(&mut command, &model, &mut ctx).await.expect("fit");

    // Diagram spans (20, 40) .. (500, 90), centered at (260, 65).
    let viewport = next.viewport();
    assert_eq!(viewport.zoom, 1.0);
    assert_eq!(viewport.scroll, Point::new(-40.0, -135.0));
}

#[rstest]
#[tokio::test]
async fn fit_to_view_shrinks_to_fit_inside_padding(model: DiagramModel, mut ctx: CommandContext) {
    let model = with_canvas(model, 300.0, 200.0);
    let mut command = ViewCommand::new(Action::fit_whole_diagram());
    let next = run(&mut command, &model, &mut ctx).await.expect("fit");

    let viewport = next.viewport();
    let expected = (300.0 - 40.0) / 480.0;
    assert!((viewport.zoom - expected).abs() < 1e-9);
    let center_x = viewport.scroll.x + 300.0 / (2.0 * viewport.zoom);
    assert!((center_x - 260.0).abs() < 1e-9);
}

#[rstest]
#[tokio::test]
async fn fit_without_measured_canvas_keeps_the_viewport(
    model: DiagramModel,
    mut ctx: CommandContext,
) {
    let mut command = ViewCommand::new(Action::fit_whole_diagram());
    let next = run(&mut command, &model, &mut ctx).await.expect("fit");
    assert_eq!(next.viewport(), model.viewport());
}

#[rstest]
#[tokio::test]
async fn center_keeps_zoom(model: DiagramModel, mut ctx: CommandContext) {
    let mut model = with_canvas(model, 600.0, 400.0);
    model.set_viewport(Viewport {
        scroll: Point::ORIGIN,
        zoom: 2.0,
    });
    let mut command = ViewCommand::new(Action::Center {
        element_ids: vec![eid("customer")],
    });
    let next = run(&mut command, &model, &mut ctx).await.expect("center");
    assert_eq!(next.viewport().zoom, 2.0);
    // Customer is centered at (70, 65).
    assert_eq!(next.viewport().scroll, Point::new(70.0 - 150.0, 65.0 - 100.0));
}

#[rstest]
#[tokio::test]
async fn bounds_measured_records_canvas_and_ignores_unknown_ids(
    model: DiagramModel,
    mut ctx: CommandContext,
) {
    let canvas = Bounds::new(0.0, 0.0, 800.0, 600.0);
    let mut command = ViewCommand::new(Action::BoundsMeasured {
        canvas,
        elements: vec![
            ElementBounds {
                element_id: derived("process", "label"),
                bounds: Bounds::new(0.0, 0.0, 90.0, 18.0),
            },
            ElementBounds {
                element_id: eid("ghost"),
                bounds: Bounds::new(0.0, 0.0, 1.0, 1.0),
            },
        ],
    });
    let next = run(&mut command, &model, &mut ctx).await.expect("measure");
    assert_eq!(next.canvas_bounds(), Some(canvas));
    assert_eq!(
        next.find("process#label").and_then(|e| e.dynamic_bounds()),
        Some(Bounds::new(0.0, 0.0, 90.0, 18.0))
    );
    assert_eq!(next.snapshot(), model.snapshot());
}

#[rstest]
fn declared_bounds_cover_every_sized_element(model: DiagramModel) {
    let Action::BoundsMeasured { canvas, elements } =
        measure_declared_bounds(&model, Bounds::new(0.0, 0.0, 1280.0, 800.0))
    else {
        panic!("expected bounds-measured action");
    };
    assert_eq!(canvas.width, 1280.0);
    let process_in = elements
        .iter()
        .find(|measured| measured.element_id.as_str() == "process-in")
        .expect("process-in measured");
    assert_eq!(process_in.bounds, Bounds::new(-5.0, 20.0, 10.0, 10.0));
    assert!(elements.iter().all(|m| m.element_id.as_str() != "root"));
}

#[rstest]
#[tokio::test]
async fn load_default_replaces_model_and_label_types(mut ctx: CommandContext) {
    let empty = DiagramModel::empty();
    let mut command = LoadCommand::new(LoadSource::BuiltIn);
    let next = run(&mut command, &empty, &mut ctx).await.expect("load");

    assert!(next.find("validate").is_some());
    assert_eq!(ctx.label_types.len(), 2);
    assert_eq!(ctx.take_follow_ups(), vec![Action::fit_whole_diagram()]);

    let undone = command.undo(&next, &mut ctx).expect("undo");
    assert_eq!(undone.snapshot(), empty.snapshot());
    assert_eq!(ctx.label_types.len(), 1);

    let redone = command.redo(&undone, &mut ctx).expect("redo");
    assert_eq!(redone.snapshot(), next.snapshot());
    assert_eq!(ctx.label_types.len(), 2);
}

#[tokio::test]
async fn load_queues_layout_when_nodes_lack_positions() {
    let storage = Arc::new(MemoryStorage::with_document(
        r#"{
          "model": {
            "type": "graph",
            "id": "root",
            "children": [{ "type": "node:function", "id": "a", "text": "A" }]
          },
          "editorMode": "readonly"
        }"#,
    ));
    let mut ctx = CommandContext::new().with_storage(storage.clone());
    let mut command = LoadCommand::new(LoadSource::Storage);
    run(&mut command, &DiagramModel::empty(), &mut ctx)
        .await
        .expect("load");

    assert_eq!(
        ctx.take_follow_ups(),
        vec![Action::Layout, Action::fit_whole_diagram()]
    );
    assert_eq!(ctx.editor_mode.current(), EditorMode::ReadOnly);
    assert_eq!(storage.pick_count(), 1);
}

#[rstest]
#[tokio::test]
async fn cancelled_pick_aborts_without_touching_context(ctx: CommandContext) {
    let storage = Arc::new(MemoryStorage::new());
    storage.push_pick(Picked::Aborted);
    let mut ctx = ctx.with_storage(storage);
    let mut command = LoadCommand::new(LoadSource::Storage);

    let outcome = command
        .execute(&DiagramModel::empty(), &mut ctx)
        .await
        .expect("aborted load is not an error");
    assert_eq!(outcome, Execution::Aborted);
    assert_eq!(ctx.label_types.len(), 1);
    assert!(ctx.take_follow_ups().is_empty());
}

#[tokio::test]
async fn malformed_document_is_reported() {
    let mut ctx =
        CommandContext::new().with_storage(Arc::new(MemoryStorage::with_document("{ not json")));
    let mut command = LoadCommand::new(LoadSource::Storage);
    let err = run(&mut command, &DiagramModel::empty(), &mut ctx)
        .await
        .expect_err("malformed");
    assert!(matches!(err, CommandError::MalformedDocument(_)));
    assert!(ctx.take_follow_ups().is_empty());
}

#[tokio::test]
async fn load_without_storage_names_the_missing_collaborator() {
    let mut ctx = CommandContext::new();
    let mut command = LoadCommand::new(LoadSource::Storage);
    let err = run(&mut command, &DiagramModel::empty(), &mut ctx)
        .await
        .expect_err("no storage");
    assert!(matches!(err, CommandError::MissingCollaborator("storage")));
}

#[rstest]
#[tokio::test]
async fn save_writes_a_loadable_document(model: DiagramModel, ctx: CommandContext) {
    let storage = Arc::new(MemoryStorage::new());
    let mut ctx = ctx.with_storage(storage.clone());
    let mut command = SaveCommand::new(None);
    let next = run(&mut command, &model, &mut ctx).await.expect("save");
    assert_eq!(next, model);

    let written = storage.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].0, "diagram.json");
    let text = String::from_utf8(written[0].1.clone()).expect("utf8");
    let loaded = parse_document(&text).expect("reload");
    assert_eq!(loaded.model.snapshot(), model.snapshot());
    assert_eq!(loaded.label_types, vec![location_label_type()]);
}

#[rstest]
#[tokio::test]
async fn layout_is_skipped_in_read_only_mode(model: DiagramModel, mut ctx: CommandContext) {
    ctx.editor_mode.set(EditorMode::ReadOnly);
    let mut command = LayoutCommand::new();
    let outcome = command.execute(&model, &mut ctx).await.expect("layout");
    assert_eq!(outcome, Execution::Skipped);
}

#[rstest]
#[tokio::test]
async fn layout_undo_restores_previous_positions(model: DiagramModel, ctx: CommandContext) {
    let mut ctx = ctx.with_layout(LayoutAdapter::new(Arc::new(SugiyamaEngine::default())));
    let mut command = LayoutCommand::new();
    let next = run(&mut command, &model, &mut ctx).await.expect("layout");

    let undone = command.undo(&next, &mut ctx).expect("undo");
    assert_eq!(undone.snapshot(), model.snapshot());
    let redone = command.redo(&undone, &mut ctx).expect("redo");
    assert_eq!(redone.snapshot(), next.snapshot());
}

#[test]
fn undo_before_execute_is_an_error() {
    let mut ctx = CommandContext::new();
    let mut command = LayoutCommand::new();
    let err = command
        .undo(&DiagramModel::empty(), &mut ctx)
        .expect_err("not executed");
    assert!(matches!(err, CommandError::NotExecuted(CommandKind::Layout)));
}
