// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};
use tokio::sync::broadcast;

use super::{
    CommandStack, DispatchError, DispatchOutcome, StackEvent, StackHandle, StackOptions,
};
use crate::layout::{LayoutAdapter, LayoutEngine, LayoutError, LayoutGraph};
use crate::model::fixtures::{eid, location_label_type, order_flow_materialized};
use crate::model::{Bounds, DiagramModel, NodeKind, Point, Viewport};
use crate::ops::{
    measure_declared_bounds, Action, CommandContext, CommandError, CommandKind, CommandRegistry,
    ElementMove,
};
use crate::store::{MemoryStorage, Picked};

const CANVAS: Bounds = Bounds {
    x: 0.0,
    y: 0.0,
    width: 1280.0,
    height: 800.0,
};

/// Lines nodes up left to right, 200 units apart, starting at (20, 20). Every further call
/// drops the row 10 units lower, so a recomputed layout never equals an earlier one.
#[derive(Default)]
struct RowEngine {
    calls: AtomicUsize,
}

impl LayoutEngine for RowEngine {
    fn compute(&self, mut graph: LayoutGraph) -> Result<LayoutGraph, LayoutError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let y = 20.0 + 10.0 * call as f64;
        for (i, node) in graph.nodes.iter_mut().enumerate() {
            node.position = Some(Point::new(20.0 + 200.0 * i as f64, y));
        }
        Ok(graph)
    }
}

#[fixture]
fn storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

fn spawn_stack(storage: Arc<MemoryStorage>, options: StackOptions) -> StackHandle {
    spawn_with_engine(storage, Arc::new(RowEngine::default()), options)
}

fn spawn_with_engine(
    storage: Arc<MemoryStorage>,
    engine: Arc<RowEngine>,
    options: StackOptions,
) -> StackHandle {
    let mut context = CommandContext::new()
        .with_storage(storage)
        .with_layout(LayoutAdapter::new(engine));
    context.label_types.register(location_label_type());
    let model = DiagramModel::new(order_flow_materialized()).expect("model");
    CommandStack::new(model, context, CommandRegistry::with_defaults(), options).spawn()
}

/// Collects events until `last` arrives.
async fn events_until(
    events: &mut broadcast::Receiver<StackEvent>,
    last: &StackEvent,
) -> Vec<StackEvent> {
    let mut seen = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("event");
            let done = &event == last;
            seen.push(event);
            if done {
                break;
            }
        }
    })
    .await
    .expect("event arrived in time");
    seen
}

#[rstest]
#[tokio::test]
async fn panning_is_not_undoable(storage: Arc<MemoryStorage>) {
    let stack = spawn_stack(storage, StackOptions::default());
    let panned = Viewport {
        scroll: Point::new(100.0, 50.0),
        zoom: 1.5,
    };

    let outcome = stack
        .dispatch(Action::SetViewport { viewport: panned })
        .await
        .expect("pan");
    assert_eq!(
        outcome,
        DispatchOutcome::Executed {
            kind: CommandKind::SetViewport,
            recorded: false
        }
    );
    assert_eq!(stack.undo().await.expect("undo"), DispatchOutcome::NothingToUndo);

    let state = stack.state().await.expect("state");
    assert_eq!(state.model.viewport(), panned);
    assert_eq!(state.undo_depth, 0);
}

#[rstest]
#[tokio::test]
async fn undo_removes_exactly_the_created_node(storage: Arc<MemoryStorage>) {
    let stack = spawn_stack(storage, StackOptions::default());
    let before = stack.state().await.expect("state").model;

    stack
        .dispatch(Action::CreateNode {
            id: eid("audit"),
            kind: NodeKind::Storage,
            position: Point::new(600.0, 40.0),
            size: None,
            text: "Audit log".to_owned(),
        })
        .await
        .expect("create");
    assert_eq!(
        stack.undo().await.expect("undo"),
        DispatchOutcome::Undone {
            kind: CommandKind::CreateNode
        }
    );

    let after = stack.state().await.expect("state");
    assert_eq!(after.model.snapshot(), before.snapshot());
    assert_eq!(after.redo_depth, 1);

    assert_eq!(
        stack.redo().await.expect("redo"),
        DispatchOutcome::Redone {
            kind: CommandKind::CreateNode
        }
    );
    let redone = stack.state().await.expect("state");
    assert!(redone.model.find("audit").is_some());
    assert_eq!(redone.undo_depth, 1);
}

#[rstest]
#[tokio::test]
async fn undo_then_redo_walks_history_symmetrically(storage: Arc<MemoryStorage>) {
    let stack = spawn_stack(storage, StackOptions::default());
    let initial = stack.state().await.expect("state").model.snapshot();

    stack
        .dispatch_all(vec![
            Action::Move {
                moves: vec![ElementMove {
                    element_id: eid("orders"),
                    to: Point::new(400.0, 200.0),
                }],
            },
            Action::EditText {
                element_id: eid("e2"),
                text: "store".to_owned(),
            },
        ])
        .await
        .expect("edits");
    let edited = stack.state().await.expect("state").model.snapshot();

    stack.undo().await.expect("undo text");
    stack.undo().await.expect("undo move");
    assert_eq!(stack.state().await.expect("state").model.snapshot(), initial);
    assert_eq!(stack.undo().await.expect("undo"), DispatchOutcome::NothingToUndo);

    stack.redo().await.expect("redo move");
    stack.redo().await.expect("redo text");
    let state = stack.state().await.expect("state");
    assert_eq!(state.model.snapshot(), edited);
    assert_eq!(state.redo_depth, 0);
}

#[rstest]
#[tokio::test]
async fn new_edit_discards_redo(storage: Arc<MemoryStorage>) {
    let stack = spawn_stack(storage, StackOptions::default());
    let edit = |text: &str| Action::EditText {
        element_id: eid("process"),
        text: text.to_owned(),
    };
    stack.dispatch(edit("one")).await.expect("edit");
    stack.undo().await.expect("undo");
    stack.dispatch(edit("two")).await.expect("edit");
    assert_eq!(stack.redo().await.expect("redo"), DispatchOutcome::NothingToRedo);
}

#[rstest]
#[tokio::test]
async fn aborted_load_changes_nothing(storage: Arc<MemoryStorage>) {
    storage.push_pick(Picked::Aborted);
    let stack = spawn_stack(storage.clone(), StackOptions::default());
    let before = stack.state().await.expect("state");

    assert_eq!(
        stack.dispatch(Action::Load).await.expect("load"),
        DispatchOutcome::Aborted
    );
    assert_eq!(stack.state().await.expect("state"), before);
    assert_eq!(storage.pick_count(), 1);
}

#[rstest]
#[tokio::test]
async fn failed_load_leaves_state_untouched(storage: Arc<MemoryStorage>) {
    storage.push_pick(Picked::Document(
        r#"{ "model": { "type": "node:function", "id": "n" } }"#.to_owned(),
    ));
    let stack = spawn_stack(storage, StackOptions::default());
    let mut events = stack.subscribe();
    let before = stack.state().await.expect("state");

    let err = stack.dispatch(Action::Load).await.expect_err("not a graph");
    assert!(matches!(
        err,
        DispatchError::Command(CommandError::MalformedDocument(_))
    ));
    assert_eq!(stack.state().await.expect("state"), before);
    assert!(matches!(
        events.try_recv(),
        Ok(StackEvent::Failed {
            kind: CommandKind::Load,
            ..
        })
    ));
}

#[rstest]
#[tokio::test]
async fn actions_after_load_wait_for_bounds(storage: Arc<MemoryStorage>) {
    let stack = spawn_stack(storage, StackOptions::default());
    let mut events = stack.subscribe();

    let pending = tokio::spawn({
        let stack = stack.clone();
        async move {
            stack
                .dispatch_all(vec![
                    Action::LoadDefault,
                    Action::Center {
                        element_ids: vec![eid("validate")],
                    },
                ])
                .await
        }
    });

    let held = StackEvent::Held {
        kind: CommandKind::Center,
    };
    let before_bounds = events_until(&mut events, &held).await;
    assert_eq!(
        before_bounds,
        vec![
            StackEvent::Executed {
                kind: CommandKind::LoadDefault,
                recorded: true
            },
            StackEvent::GateClosed {
                until: CommandKind::BoundsMeasured
            },
            StackEvent::Held {
                kind: CommandKind::FitToView
            },
            held,
        ]
    );

    let state = stack.state().await.expect("state");
    assert!(state.gate_closed);
    assert_eq!(state.held, 2);

    stack
        .dispatch(measure_declared_bounds(&state.model, CANVAS))
        .await
        .expect("bounds");
    let outcomes = pending.await.expect("join").expect("dispatch");
    assert_eq!(
        outcomes.last(),
        Some(&DispatchOutcome::Executed {
            kind: CommandKind::Center,
            recorded: false
        })
    );

    let centered = StackEvent::Executed {
        kind: CommandKind::Center,
        recorded: false,
    };
    let after_bounds = events_until(&mut events, &centered).await;
    assert_eq!(
        after_bounds,
        vec![
            StackEvent::Executed {
                kind: CommandKind::BoundsMeasured,
                recorded: false
            },
            StackEvent::Released { count: 2 },
            StackEvent::Executed {
                kind: CommandKind::FitToView,
                recorded: false
            },
            centered,
        ]
    );

    let state = stack.state().await.expect("state");
    assert!(!state.gate_closed);
    assert_eq!(state.undo_depth, 1);
    assert_eq!(state.label_types.len(), 2);
}

#[rstest]
#[tokio::test]
async fn actions_queued_before_a_gating_load_still_run(storage: Arc<MemoryStorage>) {
    let stack = spawn_stack(storage, StackOptions::default());
    let mut events = stack.subscribe();

    stack.post(Action::LoadDefault).expect("first load");
    let fit_held = StackEvent::Held {
        kind: CommandKind::FitToView,
    };
    events_until(&mut events, &fit_held).await;

    stack.post(Action::LoadDefault).expect("second load");
    stack
        .post(Action::Select {
            ids: vec![eid("validate")],
            deselect_all: true,
        })
        .expect("select");
    let select_held = StackEvent::Held {
        kind: CommandKind::Select,
    };
    events_until(&mut events, &select_held).await;

    let state = stack.state().await.expect("state");
    assert_eq!(state.held, 3);
    stack
        .post(measure_declared_bounds(&state.model, CANVAS))
        .expect("bounds");

    let selected = StackEvent::Executed {
        kind: CommandKind::Select,
        recorded: false,
    };
    let after_bounds = events_until(&mut events, &selected).await;
    assert_eq!(
        after_bounds,
        vec![
            StackEvent::Executed {
                kind: CommandKind::BoundsMeasured,
                recorded: false
            },
            StackEvent::Released { count: 3 },
            StackEvent::Executed {
                kind: CommandKind::FitToView,
                recorded: false
            },
            StackEvent::Executed {
                kind: CommandKind::LoadDefault,
                recorded: true
            },
            StackEvent::GateClosed {
                until: CommandKind::BoundsMeasured
            },
            fit_held,
            selected,
        ]
    );

    let state = stack.state().await.expect("state");
    assert!(state.gate_closed);
    assert_eq!(state.held, 1);
    assert!(state.model.selection().contains(&eid("validate")));
}

#[rstest]
#[tokio::test]
async fn unpositioned_load_runs_layout_once_then_fits(storage: Arc<MemoryStorage>) {
    storage.push_pick(Picked::Document(
        r#"{
          "model": {
            "type": "graph",
            "id": "root",
            "children": [
              { "type": "node:function", "id": "a", "text": "A" },
              { "type": "node:storage", "id": "b", "text": "B" }
            ]
          }
        }"#
        .to_owned(),
    ));
    let engine = Arc::new(RowEngine::default());
    let stack = spawn_with_engine(storage, engine.clone(), StackOptions::default());
    let mut events = stack.subscribe();

    stack.dispatch(Action::Load).await.expect("load");
    let loaded = stack.state().await.expect("state");
    assert!(loaded.model.has_unpositioned_nodes());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);

    stack
        .dispatch(measure_declared_bounds(&loaded.model, CANVAS))
        .await
        .expect("bounds");
    let fitted = StackEvent::Executed {
        kind: CommandKind::FitToView,
        recorded: false,
    };
    let seen = events_until(&mut events, &fitted).await;
    let executed: Vec<_> = seen
        .iter()
        .filter_map(|event| match event {
            StackEvent::Executed { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    assert_eq!(
        executed,
        vec![
            CommandKind::Load,
            CommandKind::BoundsMeasured,
            CommandKind::Layout,
            CommandKind::FitToView,
        ]
    );

    let state = stack.state().await.expect("state");
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    assert!(!state.model.has_unpositioned_nodes());
    assert_eq!(
        state.model.find("b").and_then(|node| node.position()),
        Some(Point::new(220.0, 20.0))
    );
    assert_eq!(state.undo_depth, 2);
}

#[rstest]
#[tokio::test]
async fn layout_redo_replays_the_first_result(storage: Arc<MemoryStorage>) {
    let engine = Arc::new(RowEngine::default());
    let stack = spawn_with_engine(storage, engine.clone(), StackOptions::default());
    let before = stack.state().await.expect("state").model;

    stack.dispatch(Action::Layout).await.expect("layout");
    let laid_out = stack.state().await.expect("state").model;
    assert_eq!(
        laid_out.find("process").and_then(|n| n.position()),
        Some(Point::new(220.0, 20.0))
    );

    assert_eq!(
        stack.undo().await.expect("undo"),
        DispatchOutcome::Undone {
            kind: CommandKind::Layout
        }
    );
    assert_eq!(stack.state().await.expect("state").model.snapshot(), before.snapshot());

    assert_eq!(
        stack.redo().await.expect("redo"),
        DispatchOutcome::Redone {
            kind: CommandKind::Layout
        }
    );
    let redone = stack.state().await.expect("state").model;
    assert_eq!(redone.snapshot(), laid_out.snapshot());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn closed_gate_times_out_and_releases(storage: Arc<MemoryStorage>) {
    let stack = spawn_stack(
        storage,
        StackOptions {
            gate_timeout: Duration::from_millis(1000),
            ..StackOptions::default()
        },
    );
    let mut events = stack.subscribe();

    stack.dispatch(Action::LoadDefault).await.expect("load");
    stack
        .post(Action::Center {
            element_ids: Vec::new(),
        })
        .expect("post");
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let state = stack.state().await.expect("state");
    assert!(!state.gate_closed);
    assert_eq!(state.held, 0);

    let mut timed_out = false;
    while let Ok(event) = events.try_recv() {
        if event == (StackEvent::GateTimedOut { held: 2 }) {
            timed_out = true;
        }
    }
    assert!(timed_out);
}

#[tokio::test]
async fn unregistered_kinds_are_reported() {
    let stack = CommandStack::new(
        DiagramModel::empty(),
        CommandContext::new(),
        CommandRegistry::new(),
        StackOptions::default(),
    )
    .spawn();
    let err = stack.dispatch(Action::Layout).await.expect_err("no factory");
    assert!(matches!(
        err,
        DispatchError::NoCommandRegistered(CommandKind::Layout)
    ));
}

#[rstest]
#[tokio::test]
async fn history_is_bounded(storage: Arc<MemoryStorage>) {
    let stack = spawn_stack(
        storage,
        StackOptions {
            history_limit: 2,
            ..StackOptions::default()
        },
    );
    for x in [10.0, 20.0, 30.0] {
        stack
            .dispatch(Action::Move {
                moves: vec![ElementMove {
                    element_id: eid("customer"),
                    to: Point::new(x, 40.0),
                }],
            })
            .await
            .expect("move");
    }
    assert_eq!(stack.state().await.expect("state").undo_depth, 2);
}

#[rstest]
#[tokio::test]
async fn save_is_recorded_but_leaves_the_model_alone(storage: Arc<MemoryStorage>) {
    let stack = spawn_stack(storage.clone(), StackOptions::default());
    let before = stack.state().await.expect("state").model;

    let outcome = stack
        .dispatch(Action::Save {
            file_name: Some("orders.json".to_owned()),
        })
        .await
        .expect("save");
    assert_eq!(
        outcome,
        DispatchOutcome::Executed {
            kind: CommandKind::Save,
            recorded: true
        }
    );
    assert_eq!(storage.written()[0].0, "orders.json");

    stack.undo().await.expect("undo");
    assert_eq!(stack.state().await.expect("state").model, before);
}

#[rstest]
#[tokio::test]
async fn dropped_handles_close_the_stack(storage: Arc<MemoryStorage>) {
    let stack = spawn_stack(storage, StackOptions::default());
    let mut events = stack.subscribe();
    stack
        .post(Action::SetViewport {
            viewport: Viewport::default(),
        })
        .expect("post");
    drop(stack);

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event in time")
        .expect("event");
    assert_eq!(
        event,
        StackEvent::Executed {
            kind: CommandKind::SetViewport,
            recorded: false
        }
    );
}
