// Error reporter: every negative reader result passes through here exactly once.
use std::cell::RefCell;

/// One failing reader call: the operation that failed, the raw result code,
/// and the message drained from the call's error context.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub operation: &'static str,
    pub code: i32,
    pub message: String,
}

/// Collects diagnostics for the duration of a session. The pipeline is
/// single-threaded, so interior mutability is a `RefCell`.
#[derive(Debug, Default)]
pub struct Reporter {
    entries: RefCell<Vec<Diagnostic>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, operation: &'static str, code: i32, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(operation, code, message = %message, "reader call failed");
        self.entries.borrow_mut().push(Diagnostic {
            operation,
            code,
            message,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::Reporter;

    #[test]
    fn diagnostics_accumulate_in_order() {
        let reporter = Reporter::new();
        assert!(reporter.is_empty());

        reporter.report("file_open", -1, "open failed");
        reporter.report("table_get_record", -9, "record missing");

        let entries = reporter.diagnostics();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation, "file_open");
        assert_eq!(entries[0].code, -1);
        assert_eq!(entries[1].operation, "table_get_record");
        assert_eq!(entries[1].message, "record missing");
    }
}
