use crate::domain::ports::SessionStore;
use crate::domain::session::PaymentSession;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding sessions keyed by session id.
pub const CF_SESSIONS: &str = "sessions";

/// Persistent session store backed by RocksDB.
///
/// Sessions are stored as JSON. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbSessionStore {
    db: Arc<DB>,
}

impl RocksDbSessionStore {
    /// Opens or creates the database at `path`, creating the sessions column
    /// family if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_sessions = ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_sessions])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn sessions_cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_SESSIONS)
            .ok_or_else(|| PaymentError::Storage("sessions column family not found".to_string()))
    }
}

#[async_trait]
impl SessionStore for RocksDbSessionStore {
    async fn store(&self, session: PaymentSession) -> Result<()> {
        let cf = self.sessions_cf()?;
        let value = serde_json::to_vec(&session)?;
        self.db.put_cf(cf, session.id().as_bytes(), value)?;
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<PaymentSession>> {
        let cf = self.sessions_cf()?;
        match self.db.get_cf(cf, session_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn all(&self) -> Result<Vec<PaymentSession>> {
        let cf = self.sessions_cf()?;
        let mut sessions = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            sessions.push(serde_json::from_slice(&value)?);
        }
        Ok(sessions)
    }
}
