//! Per-request handle to the in-flight audit record

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::AuditError;
use crate::record::AuditRecord;

/// Cloneable reference to the record being assembled for the current request.
///
/// The middleware inserts a handle into the request extensions before the
/// handler runs; handlers extract it with `axum::Extension<AuditHandle>` and
/// customize the record through an [`Overlay`](crate::Overlay) or
/// [`update`](AuditHandle::update). Once the record has been emitted the
/// handle is empty and every mutation fails with
/// [`AuditError::NoActiveRecord`].
#[derive(Debug, Clone)]
pub struct AuditHandle {
    slot: Arc<Mutex<Option<AuditRecord>>>,
}

impl AuditHandle {
    pub(crate) fn new(record: AuditRecord) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(record))),
        }
    }

    /// Run `f` against the in-flight record.
    pub fn update(&self, f: impl FnOnce(&mut AuditRecord)) -> Result<(), AuditError> {
        match self.lock().as_mut() {
            Some(record) => {
                f(record);
                Ok(())
            },
            None => Err(AuditError::NoActiveRecord),
        }
    }

    /// Clone of the current record, if one is still active.
    pub fn snapshot(&self) -> Option<AuditRecord> {
        self.lock().clone()
    }

    /// Remove the record for finalization. Applications through the handle
    /// fail with `NoActiveRecord` from this point on.
    pub(crate) fn take(&self) -> Option<AuditRecord> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<AuditRecord>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
