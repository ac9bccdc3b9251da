// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::VecDeque;
use std::fmt;

use crate::ops::Command;

/// Bounded undo stack with a redo stack that is cleared whenever new work is recorded.
pub struct History {
    undo: VecDeque<Box<dyn Command>>,
    redo: Vec<Box<dyn Command>>,
    limit: usize,
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("undo", &self.undo.len())
            .field("redo", &self.redo.len())
            .field("limit", &self.limit)
            .finish()
    }
}

impl History {
    /// A limit of zero keeps nothing.
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn push(&mut self, command: Box<dyn Command>) {
        self.redo.clear();
        if self.limit == 0 {
            return;
        }
        while self.undo.len() >= self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(command);
    }

    pub fn pop_undo(&mut self) -> Option<Box<dyn Command>> {
        self.undo.pop_back()
    }

    /// Puts a command back after a failed undo without touching redo.
    pub fn restore_undo(&mut self, command: Box<dyn Command>) {
        self.undo.push_back(command);
    }

    pub fn pop_redo(&mut self) -> Option<Box<dyn Command>> {
        self.redo.pop()
    }

    pub fn push_redo(&mut self, command: Box<dyn Command>) {
        self.redo.push(command);
    }
}
