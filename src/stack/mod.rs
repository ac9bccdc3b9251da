// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The command stack: the single owner of the current model.
//!
//! Actions arrive through a [`StackHandle`] and run strictly one at a time on a spawned task.
//! A command may close the dispatch gate until an action of a given kind arrives; everything
//! else queued meanwhile is held and released, in order, once that action has run or the gate
//! times out.

pub mod history;

use std::collections::VecDeque;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, warn};

use crate::model::{DiagramModel, EditorMode, LabelTypeRegistry};
use crate::ops::{Action, CommandContext, CommandError, CommandKind, CommandRegistry, Execution};

pub use history::History;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackOptions {
    pub history_limit: usize,
    /// How long the gate stays closed when the awaited action never arrives.
    pub gate_timeout: Duration,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            history_limit: 128,
            gate_timeout: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Executed { kind: CommandKind, recorded: bool },
    Aborted,
    Skipped,
    NothingToUndo,
    NothingToRedo,
    Undone { kind: CommandKind },
    Redone { kind: CommandKind },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("no command registered for {0}")]
    NoCommandRegistered(CommandKind),
    #[error("command stack is no longer running")]
    StackClosed,
}

/// Broadcast to subscribers as the stack works through its queue.
#[derive(Debug, Clone, PartialEq)]
pub enum StackEvent {
    Executed { kind: CommandKind, recorded: bool },
    Aborted { kind: CommandKind },
    Skipped { kind: CommandKind },
    Held { kind: CommandKind },
    Released { count: usize },
    GateClosed { until: CommandKind },
    GateTimedOut { held: usize },
    Undone { kind: CommandKind },
    Redone { kind: CommandKind },
    Failed { kind: CommandKind, message: String },
}

/// Point-in-time copy of everything the stack owns.
#[derive(Debug, Clone, PartialEq)]
pub struct StackState {
    pub model: DiagramModel,
    pub label_types: LabelTypeRegistry,
    pub editor_mode: EditorMode,
    pub undo_depth: usize,
    pub redo_depth: usize,
    pub gate_closed: bool,
    pub held: usize,
}

type Reply = oneshot::Sender<Result<DispatchOutcome, DispatchError>>;

struct Envelope {
    action: Action,
    reply: Option<Reply>,
}

enum Message {
    Dispatch(Envelope),
    Inspect(oneshot::Sender<StackState>),
}

#[derive(Debug, Clone, Copy)]
struct DispatchGate {
    until: CommandKind,
    deadline: Instant,
}

pub struct CommandStack {
    model: DiagramModel,
    context: CommandContext,
    registry: CommandRegistry,
    history: History,
    options: StackOptions,
    gate: Option<DispatchGate>,
    ready: VecDeque<Envelope>,
    held: VecDeque<Envelope>,
    events: broadcast::Sender<StackEvent>,
}

impl CommandStack {
    pub fn new(
        model: DiagramModel,
        context: CommandContext,
        registry: CommandRegistry,
        options: StackOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            model,
            context,
            registry,
            history: History::new(options.history_limit),
            options,
            gate: None,
            ready: VecDeque::new(),
            held: VecDeque::new(),
            events,
        }
    }

    /// Moves the stack onto its own task. Must be called within a tokio runtime.
    pub fn spawn(self) -> StackHandle {
        let (inbox, receiver) = mpsc::unbounded_channel();
        let events = self.events.clone();
        tokio::spawn(self.run(receiver));
        StackHandle { inbox, events }
    }

    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Message>) {
        loop {
            if let Some(envelope) = self.ready.pop_front() {
                self.process(envelope).await;
                continue;
            }

            let deadline = self.gate.map(|gate| gate.deadline);
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(Message::Dispatch(envelope)) => self.admit(envelope),
                    Some(Message::Inspect(reply)) => {
                        let _ = reply.send(self.state());
                    }
                    None => break,
                },
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.gate_timed_out();
                }
            }
        }

        // Every handle is gone; finish whatever is still queued.
        loop {
            if self.gate.take().is_some() {
                self.release_held();
            }
            let Some(envelope) = self.ready.pop_front() else {
                break;
            };
            self.process(envelope).await;
        }
        debug!("command stack stopped");
    }

    fn state(&self) -> StackState {
        StackState {
            model: self.model.clone(),
            label_types: self.context.label_types.clone(),
            editor_mode: self.context.editor_mode.current(),
            undo_depth: self.history.undo_depth(),
            redo_depth: self.history.redo_depth(),
            gate_closed: self.gate.is_some(),
            held: self.held.len(),
        }
    }

    fn emit(&self, event: StackEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn is_held_back(&self, kind: CommandKind) -> bool {
        self.gate.is_some_and(|gate| gate.until != kind)
    }

    fn admit(&mut self, envelope: Envelope) {
        let kind = envelope.action.kind();
        if self.is_held_back(kind) {
            debug!(%kind, "holding action until gate opens");
            self.held.push_back(envelope);
            self.emit(StackEvent::Held { kind });
        } else {
            self.ready.push_back(envelope);
        }
    }

    async fn process(&mut self, envelope: Envelope) {
        let Envelope { action, reply } = envelope;
        let kind = action.kind();
        let opens_gate = self.gate.is_some_and(|gate| gate.until == kind);
        if opens_gate {
            self.gate = None;
        }

        let result = self.execute(action).await;

        if opens_gate {
            self.release_held();
        }
        if let Some(reply) = reply {
            let _ = reply.send(result);
        }
    }

    /// Holds actions admitted from now on. Whatever is already in `ready` was queued before the
    /// gating command finished and still runs in order.
    fn close_gate(&mut self, until: CommandKind) {
        self.gate = Some(DispatchGate {
            until,
            deadline: Instant::now() + self.options.gate_timeout,
        });
        debug!(%until, "dispatch gate closed");
        self.emit(StackEvent::GateClosed { until });
    }

    /// Puts held actions back in front of the ready queue, keeping their order. Actions still
    /// blocked by a newly closed gate stay held.
    fn release_held(&mut self) {
        if self.held.is_empty() {
            return;
        }
        let held = std::mem::take(&mut self.held);
        let mut count = 0;
        for envelope in held.into_iter().rev() {
            if self.is_held_back(envelope.action.kind()) {
                self.held.push_front(envelope);
            } else {
                self.ready.push_front(envelope);
                count += 1;
            }
        }
        debug!(count, "released held actions");
        self.emit(StackEvent::Released { count });
    }

    fn gate_timed_out(&mut self) {
        let Some(gate) = self.gate.take() else {
            return;
        };
        let held = self.held.len();
        warn!(until = %gate.until, held, "dispatch gate timed out; releasing held actions");
        self.emit(StackEvent::GateTimedOut { held });
        self.release_held();
    }

    async fn execute(&mut self, action: Action) -> Result<DispatchOutcome, DispatchError> {
        let kind = action.kind();
        match kind {
            CommandKind::Undo => return self.undo(),
            CommandKind::Redo => return self.redo(),
            _ => {}
        }

        let Some(mut command) = self.registry.create(action) else {
            warn!(%kind, "no command registered");
            self.emit(StackEvent::Failed {
                kind,
                message: "no command registered".to_owned(),
            });
            return Err(DispatchError::NoCommandRegistered(kind));
        };

        let label_types = self.context.label_types.clone();
        let editor_mode = self.context.editor_mode.current();
        let result = command
            .execute(&self.model, &mut self.context)
            .await
            .and_then(|execution| match execution {
                Execution::Applied(model) => Ok(Execution::Applied(validated(model)?)),
                other => Ok(other),
            });

        match result {
            Err(err) => {
                self.context.label_types = label_types;
                self.context.editor_mode.set(editor_mode);
                self.context.take_follow_ups();
                error!(%kind, error = %err, "command failed");
                self.emit(StackEvent::Failed {
                    kind,
                    message: err.to_string(),
                });
                Err(err.into())
            }
            Ok(Execution::Aborted) => {
                self.context.take_follow_ups();
                debug!(%kind, "command aborted");
                self.emit(StackEvent::Aborted { kind });
                Ok(DispatchOutcome::Aborted)
            }
            Ok(Execution::Skipped) => {
                self.context.take_follow_ups();
                debug!(%kind, "command skipped");
                self.emit(StackEvent::Skipped { kind });
                Ok(DispatchOutcome::Skipped)
            }
            Ok(Execution::Applied(model)) => {
                self.model = model;
                let recorded = kind.records_history();
                let blocks_until = command.blocks_until();
                if recorded {
                    self.history.push(command);
                }
                debug!(%kind, recorded, "command executed");
                self.emit(StackEvent::Executed { kind, recorded });

                if let Some(until) = blocks_until {
                    self.close_gate(until);
                }
                for action in self.context.take_follow_ups() {
                    self.admit(Envelope {
                        action,
                        reply: None,
                    });
                }
                Ok(DispatchOutcome::Executed { kind, recorded })
            }
        }
    }

    fn undo(&mut self) -> Result<DispatchOutcome, DispatchError> {
        let Some(mut command) = self.history.pop_undo() else {
            debug!("nothing to undo");
            return Ok(DispatchOutcome::NothingToUndo);
        };
        let kind = command.kind();
        let label_types = self.context.label_types.clone();
        let editor_mode = self.context.editor_mode.current();

        match command
            .undo(&self.model, &mut self.context)
            .and_then(validated)
        {
            Ok(model) => {
                self.model = model;
                self.history.push_redo(command);
                self.emit(StackEvent::Undone { kind });
                Ok(DispatchOutcome::Undone { kind })
            }
            Err(err) => {
                self.history.restore_undo(command);
                self.context.label_types = label_types;
                self.context.editor_mode.set(editor_mode);
                error!(%kind, error = %err, "undo failed");
                self.emit(StackEvent::Failed {
                    kind: CommandKind::Undo,
                    message: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    fn redo(&mut self) -> Result<DispatchOutcome, DispatchError> {
        let Some(mut command) = self.history.pop_redo() else {
            debug!("nothing to redo");
            return Ok(DispatchOutcome::NothingToRedo);
        };
        let kind = command.kind();
        let label_types = self.context.label_types.clone();
        let editor_mode = self.context.editor_mode.current();

        match command
            .redo(&self.model, &mut self.context)
            .and_then(validated)
        {
            Ok(model) => {
                self.model = model;
                self.history.restore_undo(command);
                self.emit(StackEvent::Redone { kind });
                Ok(DispatchOutcome::Redone { kind })
            }
            Err(err) => {
                self.history.push_redo(command);
                self.context.label_types = label_types;
                self.context.editor_mode.set(editor_mode);
                error!(%kind, error = %err, "redo failed");
                self.emit(StackEvent::Failed {
                    kind: CommandKind::Redo,
                    message: err.to_string(),
                });
                Err(err.into())
            }
        }
    }
}

fn validated(model: DiagramModel) -> Result<DiagramModel, CommandError> {
    model.validate()?;
    Ok(model)
}

/// Cloneable front door to a spawned [`CommandStack`].
#[derive(Debug, Clone)]
pub struct StackHandle {
    inbox: mpsc::UnboundedSender<Message>,
    events: broadcast::Sender<StackEvent>,
}

impl StackHandle {
    /// Dispatches `action` and waits until it has run. Held actions resolve once released.
    pub async fn dispatch(&self, action: Action) -> Result<DispatchOutcome, DispatchError> {
        let (reply, outcome) = oneshot::channel();
        self.inbox
            .send(Message::Dispatch(Envelope {
                action,
                reply: Some(reply),
            }))
            .map_err(|_| DispatchError::StackClosed)?;
        outcome.await.map_err(|_| DispatchError::StackClosed)?
    }

    /// Dispatches each action after the previous one has run, stopping at the first error.
    pub async fn dispatch_all(
        &self,
        actions: Vec<Action>,
    ) -> Result<Vec<DispatchOutcome>, DispatchError> {
        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            outcomes.push(self.dispatch(action).await?);
        }
        Ok(outcomes)
    }

    /// Queues `action` without waiting for it.
    pub fn post(&self, action: Action) -> Result<(), DispatchError> {
        self.inbox
            .send(Message::Dispatch(Envelope {
                action,
                reply: None,
            }))
            .map_err(|_| DispatchError::StackClosed)
    }

    pub async fn undo(&self) -> Result<DispatchOutcome, DispatchError> {
        self.dispatch(Action::Undo).await
    }

    pub async fn redo(&self) -> Result<DispatchOutcome, DispatchError> {
        self.dispatch(Action::Redo).await
    }

    /// Snapshot of the stack once every ready action queued ahead of this request has run.
    /// Held actions do not delay it.
    pub async fn state(&self) -> Result<StackState, DispatchError> {
        let (reply, state) = oneshot::channel();
        self.inbox
            .send(Message::Inspect(reply))
            .map_err(|_| DispatchError::StackClosed)?;
        state.await.map_err(|_| DispatchError::StackClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StackEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests;
