use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::Category;

/// Per-category match counts, ordered by first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTally {
    counts: Vec<(Category, usize)>,
}

impl CategoryTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, category: Category) {
        self.add(category, 1);
    }

    pub fn add(&mut self, category: Category, n: usize) {
        match self.counts.iter_mut().find(|(c, _)| *c == category) {
            Some((_, count)) => *count += n,
            None => self.counts.push((category, n)),
        }
    }

    /// Adds `other`'s counts; categories new to `self` go to the end.
    pub fn merge(&mut self, other: &CategoryTally) {
        for (category, n) in &other.counts {
            self.add(*category, *n);
        }
    }

    pub fn get(&self, category: Category) -> usize {
        self.counts
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        self.counts.iter().copied()
    }

    /// `"LABEL: n"` pairs joined by `", "`; empty when nothing was counted.
    pub fn summary(&self) -> String {
        self.counts
            .iter()
            .map(|(category, n)| format!("{category}: {n}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Serialize for CategoryTally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (category, n) in &self.counts {
            map.serialize_entry(category.as_str(), n)?;
        }
        map.end()
    }
}
