/// Hands out element ids for accessibility wiring.
///
/// Each allocator owns its counter; a host that needs ids unique across
/// several views shares one allocator between them.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    prefix: String,
    next: u64,
}

impl IdAllocator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    /// Ids for global search inputs: `grid-search-bar-0`, `grid-search-bar-1`, ...
    pub fn search_bars() -> Self {
        Self::new("grid-search-bar")
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::search_bars()
    }
}
