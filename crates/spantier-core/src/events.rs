//! Structured allocator lifecycle records.
//!
//! The core does not log through a process-global logger; each allocator
//! front end owns an [`EventLog`] and appends structured records as
//! decisions are made. Callers inspect or drain the records for
//! diagnostics, tests, and postmortems.

/// Allocator lifecycle log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured allocator lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierLogRecord {
    /// Monotonic decision/event id within one log.
    pub decision_id: u64,
    /// Correlation id for this lifecycle record.
    pub trace_id: String,
    /// Severity level.
    pub level: TierLogLevel,
    /// Component that emitted the record (`span` or `tier`).
    pub component: &'static str,
    /// Event kind (`alloc`, `free`, `create`, ...).
    pub event: &'static str,
    /// Address involved in the event, when one exists.
    pub addr: Option<usize>,
    /// Page count or byte size involved in the event.
    pub amount: Option<usize>,
    /// Buddy order involved in the event.
    pub order: Option<usize>,
    /// Machine-readable outcome label.
    pub outcome: &'static str,
    /// Free-form details for debugging.
    pub details: String,
    /// Snapshot: free pages in the backing reservation.
    pub free_pages: usize,
    /// Snapshot: used pages in the backing reservation.
    pub used_pages: usize,
}

/// Append-only lifecycle log owned by one allocator instance.
#[derive(Debug)]
pub struct EventLog {
    component: &'static str,
    next_decision_id: u64,
    records: Vec<TierLogRecord>,
}

impl EventLog {
    /// Creates an empty log for the named component.
    #[must_use]
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            next_decision_id: 1,
            records: Vec::new(),
        }
    }

    /// Appends one lifecycle record.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        level: TierLogLevel,
        event: &'static str,
        addr: Option<usize>,
        amount: Option<usize>,
        order: Option<usize>,
        outcome: &'static str,
        details: impl Into<String>,
        free_pages: usize,
        used_pages: usize,
    ) {
        let decision_id = self.next_decision_id;
        self.next_decision_id = self.next_decision_id.wrapping_add(1);
        let trace_id = format!("{}::{}::{:016x}", self.component, event, decision_id);
        self.records.push(TierLogRecord {
            decision_id,
            trace_id,
            level,
            component: self.component,
            event,
            addr,
            amount,
            order,
            outcome,
            details: details.into(),
            free_pages,
            used_pages,
        });
    }

    /// Returns a view of the accumulated records.
    #[must_use]
    pub fn records(&self) -> &[TierLogRecord] {
        &self.records
    }

    /// Drains the accumulated records.
    pub fn drain(&mut self) -> Vec<TierLogRecord> {
        std::mem::take(&mut self.records)
    }
}
