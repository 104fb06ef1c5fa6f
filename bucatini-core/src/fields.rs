// Copyright 2025 Bucatini Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! Typed accessors over loosely-structured oplog documents.
//!
//! Oplog entries are semi-structured BSON: a field may be absent, or present
//! with an unexpected type, and neither case is fatal. These helpers return
//! `Option` so callers can treat "absent or mistyped" uniformly instead of
//! sprinkling dynamic casts through the dispatch path.

use bson::{Bson, Document, Timestamp};

/// Returns the string value of `key`, or `None` when absent or mistyped.
#[must_use]
pub fn str_field<'a>(doc: &'a Document, key: &str) -> Option<&'a str> {
    doc.get_str(key).ok()
}

/// Returns the embedded document under `key`, or `None` when absent or mistyped.
#[must_use]
pub fn document_field<'a>(doc: &'a Document, key: &str) -> Option<&'a Document> {
    doc.get_document(key).ok()
}

/// Returns the logical timestamp under `key`, or `None` when absent or mistyped.
#[must_use]
pub fn timestamp_field(doc: &Document, key: &str) -> Option<Timestamp> {
    doc.get_timestamp(key).ok()
}

/// Depth-first lookup of `key` anywhere inside a nested BSON value.
///
/// Reference markers (`$ref`/`$id`/`$db`) can appear at an arbitrary depth
/// inside an operation document. The search visits embedded documents and
/// arrays; a top-level match wins over a nested one.
#[must_use]
pub fn find_value<'a>(value: &'a Bson, key: &str) -> Option<&'a Bson> {
    match value {
        Bson::Document(doc) => {
            if let Some(found) = doc.get(key) {
                return Some(found);
            }
            doc.values().find_map(|nested| find_value(nested, key))
        }
        Bson::Array(items) => items.iter().find_map(|nested| find_value(nested, key)),
        _ => None,
    }
}
