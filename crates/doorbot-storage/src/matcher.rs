use crate::error::StorageResult;
use crate::store::RecordStore;
use doorbot_core::{EntryCode, MembershipRecord};
use tracing::{debug, warn};

/// Resolves entry codes against the current record snapshot.
///
/// Every lookup re-reads the store. Records are scanned in snapshot order and
/// the first one that admits the code wins; two credential rows sharing a
/// six-character prefix therefore resolve to whichever comes first.
#[derive(Debug, Clone)]
pub struct Matcher<S> {
    store: S,
}

impl<S: RecordStore> Matcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Find the record admitting `code`.
    ///
    /// An unreadable or unparsable snapshot is logged and reported as no
    /// match, the same as a scan that finds nothing.
    pub async fn find(&self, code: &EntryCode) -> Option<MembershipRecord> {
        match self.lookup(code).await {
            Ok(found) => found,
            Err(e) => {
                warn!(action = "CHECKMEMBERS", mode = %code.mode(), "record lookup failed: {}", e);
                None
            }
        }
    }

    /// Like [`find`](Self::find), but reports store failures.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the snapshot cannot be read or parsed.
    pub async fn lookup(&self, code: &EntryCode) -> StorageResult<Option<MembershipRecord>> {
        let records = self.store.read_records().await?;
        let found = scan(&records, code).cloned();
        debug!(
            action = "CHECKMEMBERS",
            records = records.len(),
            matched = found.is_some(),
            "scanned membership snapshot"
        );
        Ok(found)
    }
}

/// First record in `records` admitting `code`.
pub fn scan<'a>(records: &'a [MembershipRecord], code: &EntryCode) -> Option<&'a MembershipRecord> {
    records.iter().find(|record| record.admits(code))
}
