use std::collections::HashMap;

/// Owns GPU resources and hands out opaque `u64` handles to them.
/// Handles start at 1; 0 is never a valid handle.
pub struct HandleStore<T> {
    items: HashMap<u64, T>,
    next: u64,
}

impl<T> HandleStore<T> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            next: 1,
        }
    }

    pub fn insert(&mut self, item: T) -> u64 {
        let handle = self.next;
        self.next += 1;
        self.items.insert(handle, item);
        handle
    }

    pub fn get(&self, handle: u64) -> Option<&T> {
        self.items.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for HandleStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
