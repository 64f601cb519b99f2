//! libSQL backend: async `AuraBackend` implementation.
//!
//! Supports local file and in-memory databases. Conditional writes are
//! single statements guarded by `version`, so they are atomic without an
//! explicit transaction. Deleted subjects keep their row with `deleted = 1`
//! so the version keeps counting up.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::aura::{AuraState, SubjectId, SubjectKind};
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{AuraBackend, AuraRecord, AuraSlot, CasOutcome};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Aura database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests and ephemeral runs).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    /// Open `path`, treating `:memory:` as an in-memory database.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        if path == ":memory:" {
            Self::new_memory().await
        } else {
            Self::new_local(Path::new(path)).await
        }
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn channel_from_db(value: i64) -> Result<u8, DatabaseError> {
    u8::try_from(value)
        .map_err(|_| DatabaseError::Serialization(format!("channel value {value} out of range")))
}

/// Map a libsql Row to an AuraRecord.
///
/// Column order matches AURA_COLUMNS:
/// 0:subject_type, 1:subject_id, 2:r, 3:g, 4:b, 5:version, 6:updated_at
fn row_to_record(row: &libsql::Row) -> Result<AuraRecord, DatabaseError> {
    let parse = |e: libsql::Error| DatabaseError::Query(format!("aura row parse: {e}"));

    let kind_str: String = row.get(0).map_err(parse)?;
    let kind = SubjectKind::parse(&kind_str)
        .ok_or_else(|| DatabaseError::Serialization(format!("unknown subject type '{kind_str}'")))?;
    let id: String = row.get(1).map_err(parse)?;
    let r: i64 = row.get(2).map_err(parse)?;
    let g: i64 = row.get(3).map_err(parse)?;
    let b: i64 = row.get(4).map_err(parse)?;
    let version: i64 = row.get(5).map_err(parse)?;
    let updated_str: String = row.get(6).map_err(parse)?;

    Ok(AuraRecord {
        subject: SubjectId { kind, id },
        state: AuraState::new(channel_from_db(r)?, channel_from_db(g)?, channel_from_db(b)?),
        version: u64::try_from(version)
            .map_err(|_| DatabaseError::Serialization(format!("negative version {version}")))?,
        updated_at: parse_datetime(&updated_str),
    })
}

fn version_to_db(version: u64) -> Result<i64, DatabaseError> {
    i64::try_from(version)
        .map_err(|_| DatabaseError::Serialization(format!("version {version} overflows i64")))
}

// ── Trait implementation ────────────────────────────────────────────

const AURA_COLUMNS: &str = "subject_type, subject_id, r, g, b, version, updated_at";

#[async_trait]
impl AuraBackend for LibSqlBackend {
    fn name(&self) -> &str {
        "libsql"
    }

    async fn load(&self, subject: &SubjectId) -> Result<Option<AuraRecord>, DatabaseError> {
        match self.load_slot(subject).await? {
            AuraSlot::Live(record) => Ok(Some(record)),
            AuraSlot::Vacant { .. } => Ok(None),
        }
    }

    async fn load_slot(&self, subject: &SubjectId) -> Result<AuraSlot, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {AURA_COLUMNS}, deleted FROM auras WHERE subject_type = ?1 AND subject_id = ?2"
                ),
                params![subject.kind.as_str(), subject.id.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load_aura: {e}")))?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(AuraSlot::Vacant { version: 0 }),
            Err(e) => return Err(DatabaseError::Query(format!("load_aura: {e}"))),
        };

        let record = row_to_record(&row)?;
        let deleted: i64 = row
            .get(7)
            .map_err(|e| DatabaseError::Query(format!("aura row parse: {e}")))?;
        if deleted != 0 {
            Ok(AuraSlot::Vacant {
                version: record.version,
            })
        } else {
            Ok(AuraSlot::Live(record))
        }
    }

    async fn compare_and_swap(
        &self,
        subject: &SubjectId,
        expected_version: u64,
        state: AuraState,
    ) -> Result<CasOutcome, DatabaseError> {
        let conn = self.conn();
        let now = Utc::now();
        let next_version = expected_version + 1;
        let next_db = version_to_db(next_version)?;
        let expected_db = version_to_db(expected_version)?;

        let affected = if expected_version == 0 {
            conn.execute(
                "INSERT INTO auras (subject_type, subject_id, r, g, b, version, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (subject_type, subject_id) DO NOTHING",
                params![
                    subject.kind.as_str(),
                    subject.id.as_str(),
                    i64::from(state.r),
                    i64::from(state.g),
                    i64::from(state.b),
                    next_db,
                    now.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_aura: {e}")))?
        } else {
            // Matches vacant slots too: writing one revives it.
            conn.execute(
                "UPDATE auras SET r = ?1, g = ?2, b = ?3, version = ?4, updated_at = ?5, deleted = 0
                 WHERE subject_type = ?6 AND subject_id = ?7 AND version = ?8",
                params![
                    i64::from(state.r),
                    i64::from(state.g),
                    i64::from(state.b),
                    next_db,
                    now.to_rfc3339(),
                    subject.kind.as_str(),
                    subject.id.as_str(),
                    expected_db,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_aura: {e}")))?
        };

        if affected == 0 {
            debug!(subject = %subject, expected_version, "Aura version mismatch");
            return Ok(CasOutcome::Conflict);
        }

        Ok(CasOutcome::Committed(AuraRecord {
            subject: subject.clone(),
            state,
            version: next_version,
            updated_at: now,
        }))
    }

    async fn insert_if_absent(
        &self,
        subject: &SubjectId,
        state: AuraState,
    ) -> Result<AuraRecord, DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO auras (subject_type, subject_id, r, g, b, version, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
                 ON CONFLICT (subject_type, subject_id) DO UPDATE SET
                     r = excluded.r, g = excluded.g, b = excluded.b,
                     version = auras.version + 1,
                     updated_at = excluded.updated_at,
                     deleted = 0
                 WHERE auras.deleted != 0",
                params![
                    subject.kind.as_str(),
                    subject.id.as_str(),
                    i64::from(state.r),
                    i64::from(state.g),
                    i64::from(state.b),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_if_absent: {e}")))?;

        self.load(subject).await?.ok_or_else(|| {
            DatabaseError::Query(format!("insert_if_absent: {subject} missing after insert"))
        })
    }

    async fn delete(&self, subject: &SubjectId) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "UPDATE auras SET deleted = 1, version = version + 1, updated_at = ?1
                 WHERE subject_type = ?2 AND subject_id = ?3 AND deleted = 0",
                params![
                    Utc::now().to_rfc3339(),
                    subject.kind.as_str(),
                    subject.id.as_str()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_aura: {e}")))?;
        Ok(count > 0)
    }

    async fn list(&self, kind: SubjectKind) -> Result<Vec<AuraRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {AURA_COLUMNS} FROM auras WHERE subject_type = ?1 AND deleted = 0 ORDER BY subject_id"
                ),
                params![kind.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_auras: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_auras: {e}")))?
        {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }
}
