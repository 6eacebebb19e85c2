//! Local Store Tests
//!
//! Exercises the in-memory store against the `LocalStore` contract: tagged lookups,
//! overwrite semantics and safety under concurrent writers.

#[cfg(test)]
mod tests {
    use crate::store::LocalStore;
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;

    // ============================================================
    // LOOKUP TESTS
    // ============================================================

    #[test]
    fn test_get_missing_key_is_not_found() {
        let store = MemoryStore::new();

        let result = store.get("nothing-here");
        assert_eq!(result, Ok(None), "A missing key is Ok(None), not an error");
    }

    #[test]
    fn test_put_then_get() {
        let store = MemoryStore::new();

        store.put("color", "blue").unwrap();

        assert_eq!(store.get("color").unwrap(), Some("blue".to_string()));
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_put_overwrites_existing_value() {
        let store = MemoryStore::new();

        store.put("color", "blue").unwrap();
        store.put("color", "green").unwrap();

        assert_eq!(store.get("color").unwrap(), Some("green".to_string()));
        assert_eq!(store.len(), 1, "Overwrite must not create a second entry");
    }

    #[test]
    fn test_same_put_twice_is_idempotent() {
        let store = MemoryStore::new();

        store.put("k", "v").unwrap();
        let first = store.snapshot();
        store.put("k", "v").unwrap();
        let second = store.snapshot();

        assert_eq!(first, second);
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
    }

    // ============================================================
    // CONCURRENCY TESTS
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_on_distinct_keys() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();

        for worker in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..100 {
                    let key = format!("w{}-k{}", worker, i);
                    store.put(&key, &format!("value-{}", i)).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 800);
        assert_eq!(store.get("w3-k42").unwrap(), Some("value-42".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_on_same_key_leave_one_of_the_values() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();

        for worker in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put("shared", &format!("from-{}", worker)).unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let value = store.get("shared").unwrap().unwrap();
        assert!(value.starts_with("from-"), "Unexpected value {}", value);
        assert_eq!(store.len(), 1);
    }
}
