//! Handler-driven overrides for the in-flight audit record

use crate::error::AuditError;
use crate::handle::AuditHandle;
use crate::record::AuditRecord;

/// Accumulator of field overrides layered onto the captured record.
///
/// Every setter is typed and chainable, so a handler can override several
/// fields in one expression:
///
/// ```
/// use axum_audit::Overlay;
///
/// let overlay = Overlay::new().result("OK").user_id(42).ext1("tenant-a");
/// ```
///
/// Overlay fields always win over auto-captured values; applying an overlay
/// more than once is last-write-wins. An overlay with no fields set applies
/// as a no-op.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    condition: Option<String>,
    result: Option<String>,
    user_id: Option<i64>,
    ext1: Option<String>,
    ext2: Option<String>,
    ext_int1: Option<i64>,
    ext_int2: Option<i64>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn ext1(mut self, ext1: impl Into<String>) -> Self {
        self.ext1 = Some(ext1.into());
        self
    }

    pub fn ext2(mut self, ext2: impl Into<String>) -> Self {
        self.ext2 = Some(ext2.into());
        self
    }

    pub fn ext_int1(mut self, ext_int1: i64) -> Self {
        self.ext_int1 = Some(ext_int1);
        self
    }

    pub fn ext_int2(mut self, ext_int2: i64) -> Self {
        self.ext_int2 = Some(ext_int2);
        self
    }

    /// Write every populated field onto `record`, overwriting whatever
    /// capture or a prior application set. Unset fields are left untouched.
    pub fn apply_to(&self, record: &mut AuditRecord) {
        if let Some(condition) = &self.condition {
            record.condition = condition.clone();
        }
        if let Some(result) = &self.result {
            record.result = result.clone();
        }
        if let Some(user_id) = self.user_id {
            record.user_id = Some(user_id);
        }
        if let Some(ext1) = &self.ext1 {
            record.ext1 = ext1.clone();
        }
        if let Some(ext2) = &self.ext2 {
            record.ext2 = ext2.clone();
        }
        if let Some(ext_int1) = self.ext_int1 {
            record.ext_int1 = ext_int1;
        }
        if let Some(ext_int2) = self.ext_int2 {
            record.ext_int2 = ext_int2;
        }
    }

    /// Apply this overlay to the record bound to the current request.
    ///
    /// Fails with [`AuditError::NoActiveRecord`] if the record has already
    /// been emitted. Callers are expected to log and ignore the error rather
    /// than fail the request over it.
    pub fn apply(&self, handle: &AuditHandle) -> Result<(), AuditError> {
        handle.update(|record| self.apply_to(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overlay_is_noop() {
        let mut record = AuditRecord {
            condition: "x=1".to_string(),
            result: "hello".to_string(),
            ..AuditRecord::default()
        };

        Overlay::new().apply_to(&mut record);
        assert_eq!(record.condition, "x=1");
        assert_eq!(record.result, "hello");
        assert_eq!(record.user_id, None);
    }

    #[test]
    fn test_overlay_overwrites_captured_fields() {
        let mut record = AuditRecord {
            condition: "captured".to_string(),
            result: "captured".to_string(),
            ..AuditRecord::default()
        };

        Overlay::new()
            .condition("overridden")
            .result("OK")
            .user_id(42)
            .ext1("a")
            .ext2("b")
            .ext_int1(1)
            .ext_int2(2)
            .apply_to(&mut record);

        assert_eq!(record.condition, "overridden");
        assert_eq!(record.result, "OK");
        assert_eq!(record.user_id, Some(42));
        assert_eq!(record.ext1, "a");
        assert_eq!(record.ext2, "b");
        assert_eq!(record.ext_int1, 1);
        assert_eq!(record.ext_int2, 2);
    }

    #[test]
    fn test_last_application_wins() {
        let mut record = AuditRecord::default();

        Overlay::new().result("first").apply_to(&mut record);
        Overlay::new().result("second").apply_to(&mut record);
        assert_eq!(record.result, "second");
    }

    #[test]
    fn test_apply_through_handle() {
        let handle = AuditHandle::new(AuditRecord::default());
        Overlay::new().user_id(7).apply(&handle).unwrap();
        assert_eq!(handle.snapshot().unwrap().user_id, Some(7));
    }

    #[test]
    fn test_apply_after_emission_fails() {
        let handle = AuditHandle::new(AuditRecord::default());
        let _ = handle.take();
        assert_eq!(
            Overlay::new().result("late").apply(&handle),
            Err(AuditError::NoActiveRecord)
        );
    }
}
