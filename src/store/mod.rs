// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-DfdPipeline-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of dfd-pipeline and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Serialization boundary.
//!
//! Converts the model plus its label types and editor mode into the persisted document format
//! and back, and defines the storage collaborators documents are read from and written to.

pub mod default_diagram;
pub mod document;
pub mod storage;

pub use default_diagram::DEFAULT_DOCUMENT;
pub use document::{
    document_schema, parse_document, preprocess_schema, preprocess_snapshot, serialize_document,
    DocumentError, LoadedDocument, TRANSIENT_KEYS,
};
pub use storage::{
    DialogEvent, DialogHost, DialogPicker, DialogTimings, FsStorage, MemoryStorage, Picked, Storage,
    StorageError,
};
