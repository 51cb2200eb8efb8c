//! Per-session address id cache

use ahash::AHashMap;

/// Maps small integer ids to address text so repeated references don't have to
/// carry or re-render their addresses.
///
/// Ids start at 1 and increase monotonically until [`ExcelAddressCache::clear`].
#[derive(Debug, Default)]
pub struct ExcelAddressCache {
    next_id: u32,
    by_id: AHashMap<u32, String>,
    by_address: AHashMap<String, u32>,
}

impl ExcelAddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next id
    pub fn get_new_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Register an address, returning its id. Known addresses keep their id.
    pub fn add(&mut self, address: impl Into<String>) -> u32 {
        let address = address.into();
        if let Some(id) = self.by_address.get(&address) {
            return *id;
        }
        let id = self.get_new_id();
        self.by_id.insert(id, address.clone());
        self.by_address.insert(address, id);
        id
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Forget every address and restart numbering at 1
    pub fn clear(&mut self) {
        self.next_id = 0;
        self.by_id.clear();
        self.by_address.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase_from_one() {
        let mut cache = ExcelAddressCache::new();
        assert_eq!(cache.get_new_id(), 1);
        assert_eq!(cache.get_new_id(), 2);
        assert_eq!(cache.get_new_id(), 3);
    }

    #[test]
    fn test_clear_resets_numbering() {
        let mut cache = ExcelAddressCache::new();
        cache.add("Sheet1!A1");
        cache.add("Sheet1!B2");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get_new_id(), 1);
    }

    #[test]
    fn test_add_reuses_ids() {
        let mut cache = ExcelAddressCache::new();
        let a = cache.add("Sheet1!A1");
        let b = cache.add("Sheet1!B1");
        assert_eq!(cache.add("Sheet1!A1"), a);
        assert_ne!(a, b);
        assert_eq!(cache.get(b), Some("Sheet1!B1"));
        assert_eq!(cache.get(99), None);
    }
}
