use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Clock, GeneratedGreeting};

/// Fixed messages returned by [`GreetingGenerator::list`], in order.
pub const GENERATED_MESSAGES: [&str; 2] = ["Olá, Rust!", "Observabilidade com tracing"];

/// In-memory greeting source backing the `/api/v1/greetings` variant.
///
/// Nothing is stored. Every call hands out fresh ids from a monotonically
/// increasing counter shared by all callers, so `list` regenerates its
/// records (and consumes ids) on each call. Ids start at 1 and are never
/// reused while the process lives.
pub struct GreetingGenerator<C: Clock> {
    clock: C,
    counter: AtomicU64,
}

impl<C: Clock> GreetingGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            counter: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> u64 {
        // Uniqueness is all callers rely on; no ordering with other memory.
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn generate(&self, message: String) -> GeneratedGreeting {
        GeneratedGreeting {
            id: self.next_id(),
            message,
            timestamp: self.clock.now(),
        }
    }

    /// Generate the two fixed greetings with new ids.
    pub fn list(&self) -> Vec<GeneratedGreeting> {
        GENERATED_MESSAGES
            .iter()
            .map(|m| self.generate((*m).to_string()))
            .collect()
    }

    /// Generate a single greeting carrying `message`.
    pub fn create<S: Into<String>>(&self, message: S) -> GeneratedGreeting {
        self.generate(message.into())
    }

    /// Look up `id` among a freshly generated [`list`](Self::list).
    ///
    /// The list is regenerated for every lookup, negative ids included, so
    /// ids returned by earlier calls are already behind the counter and
    /// normally miss.
    pub fn find_by_id(&self, id: i64) -> Option<GeneratedGreeting> {
        let candidates = self.list();
        let id = u64::try_from(id).ok()?;
        candidates.into_iter().find(|g| g.id == id)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    struct TestClock;
    impl Clock for TestClock {
        fn now(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
        }
    }

    #[test]
    fn list_returns_fixed_messages_with_increasing_ids() {
        let gen = GreetingGenerator::new(TestClock);
        let items = gen.list();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, 1);
        assert_eq!(items[1].id, 2);
        assert_eq!(items[0].message, GENERATED_MESSAGES[0]);
        assert_eq!(items[1].message, GENERATED_MESSAGES[1]);
        assert_eq!(items[0].timestamp, TestClock.now());
    }

    #[test]
    fn consecutive_lists_never_overlap() {
        let gen = GreetingGenerator::new(TestClock);
        let first: HashSet<u64> = gen.list().into_iter().map(|g| g.id).collect();
        let second: HashSet<u64> = gen.list().into_iter().map(|g| g.id).collect();
        assert!(first.is_disjoint(&second));
        assert_eq!(gen.issued(), 4);
    }

    #[test]
    fn create_uses_next_counter_value() {
        let gen = GreetingGenerator::new(TestClock);
        let _ = gen.list();
        let g = gen.create("hi there");
        assert_eq!(g.id, 3);
        assert_eq!(g.message, "hi there");
    }

    #[test]
    fn find_by_id_regenerates_and_misses_old_ids() {
        let gen = GreetingGenerator::new(TestClock);
        let old = gen.list();
        assert!(gen.find_by_id(old[0].id as i64).is_none());
        // The lookup itself consumed ids 3 and 4; the next list yields 5 and 6.
        assert_eq!(gen.issued(), 4);
        assert_eq!(gen.find_by_id(5).map(|g| g.id), Some(5));
    }

    #[test]
    fn find_by_negative_id_misses_but_still_consumes_ids() {
        let gen = GreetingGenerator::new(TestClock);
        assert!(gen.find_by_id(-1).is_none());
        assert_eq!(gen.issued(), 2);
    }

    #[test]
    fn concurrent_callers_get_distinct_ids() {
        let gen = Arc::new(GreetingGenerator::new(TestClock));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gen = Arc::clone(&gen);
                std::thread::spawn(move || {
                    (0..100).map(|_| gen.create("x").id).collect::<Vec<_>>()
                })
            })
            .collect();
        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
