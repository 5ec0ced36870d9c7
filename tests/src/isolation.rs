use std::sync::atomic::{AtomicU32, Ordering};

/// Generates unique schema and database names for test isolation.
///
/// Each test gets a name of the form `test_{process_id}_{test_counter}`, so
/// tests running in parallel, within or across processes, never share
/// tables.
#[derive(Debug, Clone)]
pub struct TestIsolation {
    process_id: u32,
    test_counter: u32,
}

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

impl TestIsolation {
    pub fn new() -> Self {
        Self {
            process_id: std::process::id(),
            test_counter: TEST_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Schema (PostgreSQL) or database (MongoDB) owned by this test.
    pub fn namespace(&self) -> String {
        format!("test_{}_{}", self.process_id, self.test_counter)
    }
}

impl Default for TestIsolation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_are_unique() {
        let first = TestIsolation::new().namespace();
        let second = TestIsolation::new().namespace();

        assert_ne!(first, second);
        assert!(first.starts_with("test_"));

        let parts: Vec<&str> = first.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<u32>().is_ok());
        assert!(parts[2].parse::<u32>().is_ok());
    }
}
