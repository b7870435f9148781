use super::CursorId;

/// The outcome of a single scan round-trip: the token for the next call and
/// the items the server returned, in reply order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanIteration<T> {
    cursor_id: CursorId,
    items: Vec<T>,
}

impl<T> ScanIteration<T> {
    /// Pair a returned token with its batch.
    pub fn new(cursor_id: CursorId, items: Vec<T>) -> Self {
        Self { cursor_id, items }
    }

    /// Token to send on the next round-trip.
    pub fn cursor_id(&self) -> &CursorId {
        &self.cursor_id
    }

    /// Items of this round.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// `true` if the server returned no items this round. Says nothing about
    /// whether the scan is finished.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Split into token and batch.
    pub fn into_parts(self) -> (CursorId, Vec<T>) {
        (self.cursor_id, self.items)
    }
}
