use std::collections::BTreeMap;

pub type ItemCounts = BTreeMap<String, u32>;

/// Item-type counters. Entries never linger at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    items: ItemCounts,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counts(counts: &ItemCounts) -> Self {
        let mut inventory = Self::new();
        inventory.add(counts);
        inventory
    }

    pub fn count(&self, item: &str) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    pub fn has(&self, requirements: &ItemCounts) -> bool {
        requirements
            .iter()
            .all(|(item, qty)| self.count(item) >= *qty)
    }

    pub fn add(&mut self, delta: &ItemCounts) {
        for (item, qty) in delta {
            if *qty == 0 {
                continue;
            }
            let entry = self.items.entry(item.clone()).or_insert(0);
            *entry = entry.saturating_add(*qty);
        }
    }

    pub fn add_one(&mut self, item: &str, qty: u32) {
        self.add(&ItemCounts::from([(item.to_string(), qty)]))
    }

    /// All-or-nothing: nothing is deducted unless every requirement is met.
    pub fn remove(&mut self, requirements: &ItemCounts) -> bool {
        if !self.has(requirements) {
            return false;
        }
        for (item, qty) in requirements {
            if *qty == 0 {
                continue;
            }
            let remaining = self.count(item).saturating_sub(*qty);
            if remaining == 0 {
                self.items.remove(item);
            } else {
                self.items.insert(item.clone(), remaining);
            }
        }
        true
    }

    pub fn remove_one(&mut self, item: &str, qty: u32) -> bool {
        self.remove(&ItemCounts::from([(item.to_string(), qty)]))
    }

    pub fn snapshot(&self) -> ItemCounts {
        self.items.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(item, qty)| (item.as_str(), *qty))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
