//! Storage collaborator contract.
//!
//! Route handlers in an application usually answer from a relational
//! store. This module only fixes the shape of that collaborator: three
//! async operations over positional parameters, with rows as JSON objects.
//! No engine ships with the crate.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResult {
    /// Row id assigned by the last insert.
    pub last_insert_id: i64,
}

// ============================================================================
// Storage
// ============================================================================

/// Async relational store.
///
/// Every failure surfaces as [`Error::Storage`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Runs `query` and returns every row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the query fails.
    async fn fetch_all(&self, query: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Runs `query` and returns the first row, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the query fails.
    async fn fetch_first(&self, query: &str, params: &[Value]) -> Result<Option<Row>>;

    /// Runs a write statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the statement fails.
    async fn execute_statement(&self, query: &str, params: &[Value]) -> Result<ExecuteResult>;
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Reads column `name` from `row` as `T`.
///
/// # Errors
///
/// Returns [`Error::Storage`] if the column is missing or has the wrong type.
pub fn column<T: DeserializeOwned>(row: &Row, name: &str) -> Result<T> {
    let value = row
        .get(name)
        .ok_or_else(|| Error::storage(format!("Missing column {name:?}")))?;

    T::deserialize(value).map_err(|e| Error::storage(format!("Column {name:?}: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
