/// Ticket handed out when a load starts; ordered by issue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// Latest fetched list plus the last load error.
///
/// Loads may overlap. A result is applied only if its ticket is newer than the
/// one applied last, so a slow stale response never overwrites a fresher one.
#[derive(Debug, Clone)]
pub struct Lister<T> {
    items: Vec<T>,
    error: Option<String>,
    issued: u64,
    applied: u64,
}

impl<T> Default for Lister<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            error: None,
            issued: 0,
            applied: 0,
        }
    }
}

impl<T> Lister<T> {
    pub fn begin(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket(self.issued)
    }

    /// Returns `false` when the result was stale and dropped.
    pub fn apply(&mut self, ticket: LoadTicket, outcome: Result<Vec<T>, String>) -> bool {
        if ticket.0 <= self.applied {
            return false;
        }
        self.applied = ticket.0;
        match outcome {
            Ok(items) => {
                self.items = items;
                self.error = None;
            }
            Err(message) => self.error = Some(message),
        }
        true
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
