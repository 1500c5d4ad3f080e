//! Identifier generation for new entries.

use uuid::Uuid;

/// Issues UUIDv7 identifiers that sort in issue order.
///
/// UUIDv7 only orders by millisecond; ids minted in the same millisecond,
/// or after the wall clock stepped backwards, fall back to `last + 1`.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: Option<Uuid>,
}

impl IdGenerator {
    /// Start after the largest UUID among `existing`. Non-UUID ids are ignored.
    pub fn seeded<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        let last = existing
            .into_iter()
            .filter_map(|id| Uuid::parse_str(id).ok())
            .max();
        Self { last }
    }

    pub fn next_id(&mut self) -> Uuid {
        let fresh = Uuid::now_v7();
        let id = match self.last {
            Some(last) if fresh <= last => Uuid::from_u128(last.as_u128().wrapping_add(1)),
            _ => fresh,
        };
        self.last = Some(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_strictly_increase() {
        let mut ids = IdGenerator::default();
        let mut prev = ids.next_id();
        for _ in 0..10_000 {
            let next = ids.next_id();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn seeded_generator_stays_above_existing() {
        let future = Uuid::from_u128(u128::MAX - 10).to_string();
        let mut ids = IdGenerator::seeded([future.as_str(), "not-a-uuid"]);
        let next = ids.next_id();
        assert!(next.to_string() > future);
    }

    #[test]
    fn fresh_ids_are_version_7() {
        let mut ids = IdGenerator::default();
        assert_eq!(ids.next_id().get_version_num(), 7);
    }
}
