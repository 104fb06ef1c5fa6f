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

//! Cross-collection document references.
//!
//! A [`DocumentReference`] points at one document by database, collection,
//! and identifier. It is built either directly from an event's namespace and
//! the document's own `_id`, or resolved from an embedded `$ref`/`$id`/`$db`
//! marker found anywhere inside an operation document.

use crate::fields;
use bson::Bson;
use serde::{Deserialize, Serialize};

/// A pointer to one document, possibly in another collection or database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReference {
    /// Database owning the referenced document.
    #[serde(rename = "$db")]
    pub database: String,

    /// Collection holding the referenced document.
    #[serde(rename = "$ref")]
    pub collection: String,

    /// Identifier of the referenced document. Opaque; any BSON value a
    /// collection uses as `_id` is acceptable.
    #[serde(rename = "$id")]
    pub id: Bson,
}

impl DocumentReference {
    /// Creates a reference from already-known parts.
    pub fn new(database: impl Into<String>, collection: impl Into<String>, id: Bson) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            id,
        }
    }

    /// Resolves an embedded reference marker from an arbitrarily nested value.
    ///
    /// Both `$id` and `$ref` must be present ([`fields::find_value`] searches
    /// nested documents and arrays); `$ref` must be a string. A `$db` string
    /// overrides `default_database`, which otherwise names the namespace's
    /// owning database.
    ///
    /// Returns `None` when either required key is missing or mistyped —
    /// callers treat this as "no reference available", not an error.
    #[must_use]
    pub fn resolve(value: &Bson, default_database: &str) -> Option<Self> {
        let id = fields::find_value(value, "$id")?.clone();

        let collection = match fields::find_value(value, "$ref") {
            Some(Bson::String(collection)) => collection.clone(),
            _ => return None,
        };

        let database = match fields::find_value(value, "$db") {
            Some(Bson::String(database)) => database.clone(),
            _ => default_database.to_string(),
        };

        Some(Self {
            database,
            collection,
            id,
        })
    }
}
