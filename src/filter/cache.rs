//! Compile-once memoization for filters.
//!
//! Hot paths tend to ask for the same handful of filter sources over and
//! over. The cache hands out shared pointers to already-compiled filters
//! and performs at most one compile per distinct source string.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use super::ElementFilter;
use super::error::ParseError;

static GLOBAL: Lazy<FilterCache> = Lazy::new(FilterCache::new);

/// Compile `source` through the process-wide cache.
pub fn compile_cached(source: &str) -> Result<Arc<ElementFilter>, ParseError> {
    GLOBAL.get_or_compile(source)
}

/// A thread-safe memo table from filter source text to compiled filters.
#[derive(Debug, Default)]
pub struct FilterCache {
    compiled: RwLock<HashMap<String, Arc<ElementFilter>>>,
}

impl FilterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the compiled filter for `source`, compiling it on first use.
    ///
    /// Compilation happens under the write lock, so concurrent callers
    /// asking for the same new source trigger one compile. Parse errors
    /// are returned to the caller and never cached.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<ElementFilter>, ParseError> {
        if let Some(filter) = self.compiled.read().unwrap().get(source) {
            return Ok(Arc::clone(filter));
        }
        let mut compiled = self.compiled.write().unwrap();
        // a racing caller may have compiled it while we waited
        if let Some(filter) = compiled.get(source) {
            return Ok(Arc::clone(filter));
        }
        tracing::debug!("compiling filter: {}", source);
        let filter = Arc::new(ElementFilter::parse(source)?);
        compiled.insert(source.to_string(), Arc::clone(&filter));
        Ok(filter)
    }

    /// Number of distinct compiled filters held.
    pub fn len(&self) -> usize {
        self.compiled.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn repeated_lookups_share_one_compiled_filter() {
        let cache = FilterCache::new();
        let first = cache.get_or_compile("nodes with entrance").unwrap();
        let second = cache.get_or_compile("nodes with entrance").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.get_or_compile("ways with highway").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn parse_errors_are_returned_and_never_cached() {
        let cache = FilterCache::new();
        assert!(cache.get_or_compile("nodes with (a or b").is_err());
        assert!(cache.get_or_compile("nodes with (a or b").is_err());
        assert!(cache.is_empty());

        cache.get_or_compile("nodes with a").unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_lookups_compile_once() {
        let cache = FilterCache::new();
        let compiled: Vec<_> = thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.get_or_compile("ways with building and height > 10")))
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().unwrap().unwrap())
                .collect()
        });
        assert_eq!(cache.len(), 1);
        for filter in &compiled[1..] {
            assert!(Arc::ptr_eq(&compiled[0], filter));
        }
    }

    #[test]
    fn global_cache_memoizes_across_calls() {
        let first = compile_cached("relations with route = bicycle").unwrap();
        let second = compile_cached("relations with route = bicycle").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
