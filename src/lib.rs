// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! dfd-pipeline: the state-mutation pipeline behind a data-flow-diagram editor.
//!
//! Every change to a diagram is an [`ops::Action`] dispatched through the [`stack`], which owns
//! the current [`model::DiagramModel`], keeps undo/redo history, and defers work that must wait
//! for the renderer. Documents round-trip through [`store`]; automatic arrangement lives in
//! [`layout`]; [`sync`] keeps derived text labels in step with the elements they describe.

pub mod config;
pub mod layout;
pub mod model;
pub mod ops;
pub mod stack;
pub mod store;
pub mod sync;
