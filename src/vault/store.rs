//! The credential store: save, get, list, delete and test connection
//! profiles keyed by project and connection name.
//!
//! `CredentialStore` keeps no state between calls.  Every operation
//! loads the whole document, works on it in memory and, if it mutated
//! anything, writes the whole document back.  All of that happens while
//! holding one mutex, so callers sharing a store cannot interleave a
//! read-modify-write and lose each other's updates.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::VaultConfig;
use crate::crypto::{decrypt, encrypt, EncryptionKey};
use crate::errors::{Missing, Result, VaultError};

use super::format::{self, Projects};
use super::record::{
    ConnectionRecord, ConnectionSummary, ConnectionView, DeleteConfirmation, NewConnection,
    SavedSummary, TestReport, DECRYPTION_ERROR_SENTINEL, TEST_DISCLAIMER,
};

/// Handle on the persisted project -> connection -> record mapping.
pub struct CredentialStore {
    /// Path to the JSON document on disk.
    path: PathBuf,

    /// Key used for every password encrypt/decrypt.
    key: EncryptionKey,

    /// Serializes whole operations (load through write).
    lock: Mutex<()>,
}

impl CredentialStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Build a store over the document at `path`.
    ///
    /// Nothing is read or created until the first operation; an absent
    /// document is a valid empty store.
    pub fn new(path: impl Into<PathBuf>, key: EncryptionKey) -> Self {
        Self {
            path: path.into(),
            key,
            lock: Mutex::new(()),
        }
    }

    /// Build a store from the startup configuration.
    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(config.store_path.clone(), config.key.clone())
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Create or overwrite the record at (`project`, `connection`).
    ///
    /// Overwriting keeps the original `created_at` and refreshes
    /// `updated_at`.
    pub fn save(&self, project: &str, connection: &str, input: NewConnection) -> Result<SavedSummary> {
        validate_name("project_name", project)?;
        validate_name("connection_name", connection)?;

        let _guard = self.lock();
        let mut projects = self.load()?;

        let password_encrypted = encrypt(&self.key, &input.password)?;
        let now = Utc::now();

        let bucket = projects.entry(project.to_string()).or_default();
        let created_at = bucket
            .get(connection)
            .map_or(now, |existing| existing.created_at);
        let existed = bucket.contains_key(connection);

        let record = ConnectionRecord {
            host: input.host,
            port: input.port,
            database_name: input.database_name,
            username: input.username,
            password_encrypted,
            connection_type: input.connection_type,
            ssl_enabled: input.ssl_enabled,
            is_readonly: input.is_readonly,
            additional_params: input.additional_params,
            created_at,
            updated_at: now,
        };

        let summary = SavedSummary {
            project_name: project.to_string(),
            connection_name: connection.to_string(),
            host: record.host.clone(),
            port: record.port,
            database_name: record.database_name.clone(),
            connection_type: record.connection_type,
            is_readonly: record.is_readonly,
        };

        bucket.insert(connection.to_string(), record);
        self.persist(&projects)?;

        info!(
            project,
            connection,
            updated = existed,
            "saved connection"
        );
        Ok(summary)
    }

    /// Fetch one connection.
    ///
    /// With `include_password`, the password is decrypted; if that
    /// fails the field holds `[DECRYPTION_ERROR]` and everything else
    /// is still returned.
    pub fn get(&self, project: &str, connection: &str, include_password: bool) -> Result<ConnectionView> {
        let _guard = self.lock();
        let projects = self.load()?;
        let record = locate(&projects, project, connection)?;

        let password = if include_password {
            match decrypt(&self.key, &record.password_encrypted) {
                Ok(plain) => Some(plain),
                Err(VaultError::DecryptionFailed) => {
                    warn!(project, connection, "stored password could not be decrypted");
                    Some(DECRYPTION_ERROR_SENTINEL.to_string())
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        debug!(project, connection, include_password, "fetched connection");

        Ok(ConnectionView {
            project_name: project.to_string(),
            connection_name: connection.to_string(),
            host: record.host.clone(),
            port: record.port,
            database_name: record.database_name.clone(),
            username: record.username.clone(),
            password,
            connection_type: record.connection_type,
            ssl_enabled: record.ssl_enabled,
            is_readonly: record.is_readonly,
            additional_params: record.additional_params.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Summaries for one project, or for every project when `project`
    /// is `None`.  An unknown project yields an empty list.
    ///
    /// Rows are ordered by project name, then connection name.
    pub fn list(&self, project: Option<&str>) -> Result<Vec<ConnectionSummary>> {
        let _guard = self.lock();
        let projects = self.load()?;

        let rows: Vec<ConnectionSummary> = projects
            .iter()
            .filter(|(name, _)| project.map_or(true, |wanted| wanted == name.as_str()))
            .flat_map(|(project_name, connections)| {
                connections
                    .iter()
                    .map(move |(conn_name, record)| record.summary(project_name, conn_name))
            })
            .collect();

        debug!(?project, count = rows.len(), "listed connections");
        Ok(rows)
    }

    /// Remove one connection, and its project if it was the last one.
    pub fn delete(&self, project: &str, connection: &str) -> Result<DeleteConfirmation> {
        let _guard = self.lock();
        let mut projects = self.load()?;

        // Same not-found rules as `get`.
        locate(&projects, project, connection)?;

        let mut project_removed = false;
        if let Some(bucket) = projects.get_mut(project) {
            bucket.remove(connection);
            if bucket.is_empty() {
                projects.remove(project);
                project_removed = true;
            }
        }

        self.persist(&projects)?;

        info!(project, connection, project_removed, "deleted connection");
        Ok(DeleteConfirmation {
            project_name: project.to_string(),
            connection_name: connection.to_string(),
            project_removed,
        })
    }

    /// Check that a record exists and is structurally sound.
    ///
    /// Never contacts the database and never decrypts the password.
    pub fn test(&self, project: &str, connection: &str) -> Result<TestReport> {
        let _guard = self.lock();
        let projects = self.load()?;
        let record = locate(&projects, project, connection)?;

        let issues = record.structural_issues();
        debug!(project, connection, issues = issues.len(), "tested connection");

        Ok(TestReport {
            project_name: project.to_string(),
            connection_name: connection.to_string(),
            host: record.host.clone(),
            port: record.port,
            database_name: record.database_name.clone(),
            connection_type: record.connection_type,
            ssl_enabled: record.ssl_enabled,
            well_formed: issues.is_empty(),
            issues,
            live_check_performed: false,
            note: TEST_DISCLAIMER.to_string(),
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the store document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// The guarded data is `()`, so a poisoned lock carries no broken
    /// state and is simply taken over.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(&self) -> Result<Projects> {
        format::read_store(&self.path)
    }

    fn persist(&self, projects: &Projects) -> Result<()> {
        format::write_store(&self.path, projects)
    }
}

/// Find a record, distinguishing an unknown project from an unknown
/// connection inside a known project.
fn locate<'a>(projects: &'a Projects, project: &str, connection: &str) -> Result<&'a ConnectionRecord> {
    let bucket = projects
        .get(project)
        .ok_or_else(|| VaultError::NotFound(Missing::Project(project.to_string())))?;

    bucket.get(connection).ok_or_else(|| {
        VaultError::NotFound(Missing::Connection {
            project: project.to_string(),
            connection: connection.to_string(),
        })
    })
}

/// Project and connection names are opaque, but must not be blank.
fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VaultError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}
