use chrono::Utc;
use shared::domain::ProductId;
use uuid::Uuid;

/// Source of fresh product ids.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> ProductId;
}

impl<T: IdGenerator + ?Sized> IdGenerator for Box<T> {
    fn next_id(&mut self) -> ProductId {
        (**self).next_id()
    }
}

/// Millisecond timestamps, bumped so that two calls within the same
/// millisecond still get distinct, increasing ids.
#[derive(Debug, Default)]
pub struct ClockIds {
    last: i64,
}

impl ClockIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for ClockIds {
    fn next_id(&mut self) -> ProductId {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        ProductId(self.last.to_string())
    }
}

/// Deterministic counter ids.
#[derive(Debug)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> ProductId {
        let id = self.next;
        self.next += 1;
        ProductId(id.to_string())
    }
}

#[derive(Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> ProductId {
        ProductId(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_ids_strictly_increase_under_rapid_calls() {
        let mut ids = ClockIds::new();
        let values: Vec<i64> = (0..1_000)
            .map(|_| ids.next_id().0.parse().expect("numeric id"))
            .collect();
        assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn sequential_ids_count_from_start() {
        let mut ids = SequentialIds::starting_at(41);
        assert_eq!(ids.next_id(), ProductId::new("41"));
        assert_eq!(ids.next_id(), ProductId::new("42"));
    }

    #[test]
    fn uuid_ids_differ() {
        let mut ids = UuidIds;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
