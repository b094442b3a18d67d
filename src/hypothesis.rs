use std::collections::HashMap;

// the table is exported as one numeric array per hypothesis
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{PierreError, Result};

// ------------- Hypothesis -------------
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    name: String,
    history: Vec<f64>, // prior first, then one posterior per evidence block
}
impl Hypothesis {
    pub fn new(name: String, prior: f64) -> Self {
        Self {
            name,
            history: vec![prior],
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn history(&self) -> &[f64] {
        &self.history
    }
    pub fn prior(&self) -> f64 {
        self.history[0]
    }
    pub fn latest(&self) -> f64 {
        self.history[self.history.len() - 1]
    }
}

// ------------- HypothesisTable -------------
/// Probability history per named hypothesis, kept in declaration order.
///
/// Once a round of updates has been normalized, the entries at each index sum to 1
/// across all hypotheses.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HypothesisTable {
    kept: Vec<Hypothesis>,
    lookup: HashMap<String, usize>,
}
impl HypothesisTable {
    pub fn new() -> Self {
        Self::default()
    }
    /// Adds a hypothesis with its first (prior) entry.
    pub fn declare(&mut self, name: &str, prior: f64) -> Result<()> {
        if self.lookup.contains_key(name) {
            return Err(PierreError::DuplicateHypothesis(name.to_string()));
        }
        self.lookup.insert(name.to_string(), self.kept.len());
        self.kept.push(Hypothesis::new(name.to_string(), prior));
        Ok(())
    }
    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }
    pub fn get(&self, name: &str) -> Option<&Hypothesis> {
        self.lookup.get(name).map(|&i| &self.kept[i])
    }
    /// Most recent entry of `name`.
    pub fn latest(&self, name: &str) -> Result<f64> {
        self.get(name)
            .map(Hypothesis::latest)
            .ok_or_else(|| PierreError::UnknownHypothesis(name.to_string()))
    }
    pub fn append(&mut self, name: &str, value: f64) -> Result<()> {
        let index = *self
            .lookup
            .get(name)
            .ok_or_else(|| PierreError::UnknownHypothesis(name.to_string()))?;
        self.kept[index].history.push(value);
        Ok(())
    }
    /// Divides the entries at `index` (the latest entry of each hypothesis when `None`)
    /// by their sum, and returns the sum as it was before dividing.
    pub fn normalize(&mut self, index: Option<usize>) -> Result<f64> {
        let positions = self
            .kept
            .iter()
            .map(|h| match index {
                None => Ok(h.history.len() - 1),
                Some(i) if i < h.history.len() => Ok(i),
                Some(i) => Err(PierreError::Invariant(format!(
                    "hypothesis '{}' has no entry {i}",
                    h.name
                ))),
            })
            .collect::<Result<Vec<usize>>>()?;
        let total: f64 = self
            .kept
            .iter()
            .zip(&positions)
            .map(|(h, &i)| h.history[i])
            .sum();
        if total == 0.0 || !total.is_finite() {
            return Err(PierreError::DegenerateDistribution(total));
        }
        for (h, &i) in self.kept.iter_mut().zip(&positions) {
            h.history[i] /= total;
        }
        Ok(total)
    }
    /// Number of entries every hypothesis has, if they all have the same number.
    pub fn depth(&self) -> Option<usize> {
        let first = self.kept.first()?.history.len();
        self.kept
            .iter()
            .all(|h| h.history.len() == first)
            .then_some(first)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Hypothesis> {
        self.kept.iter()
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kept.iter().map(Hypothesis::name)
    }
}

impl Serialize for HypothesisTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.kept.len()))?;
        for h in &self.kept {
            map.serialize_entry(&h.name, &h.history)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_returns_the_pre_division_total() {
        let mut table = HypothesisTable::new();
        table.declare("A", 3.0).unwrap();
        table.declare("B", 1.0).unwrap();
        assert_eq!(table.normalize(None).unwrap(), 4.0);
        assert_eq!(table.latest("A").unwrap(), 0.75);
        assert_eq!(table.latest("B").unwrap(), 0.25);
    }

    #[test]
    fn normalize_at_an_explicit_index() {
        let mut table = HypothesisTable::new();
        table.declare("A", 1.0).unwrap();
        table.declare("B", 1.0).unwrap();
        table.append("A", 0.5).unwrap();
        table.append("B", 0.5).unwrap();
        assert_eq!(table.normalize(Some(0)).unwrap(), 2.0);
        assert_eq!(table.get("A").unwrap().history(), &[0.5, 0.5]);
        assert!(matches!(table.normalize(Some(2)), Err(PierreError::Invariant(_))));
    }

    #[test]
    fn zero_total_is_degenerate() {
        let mut table = HypothesisTable::new();
        table.declare("A", 0.0).unwrap();
        assert!(matches!(table.normalize(None), Err(PierreError::DegenerateDistribution(t)) if t == 0.0));
        assert!(matches!(HypothesisTable::new().normalize(None), Err(PierreError::DegenerateDistribution(_))));
    }

    #[test]
    fn declare_twice_and_unknown_names() {
        let mut table = HypothesisTable::new();
        table.declare("A", 1.0).unwrap();
        assert!(matches!(table.declare("A", 1.0), Err(PierreError::DuplicateHypothesis(_))));
        assert!(matches!(table.append("B", 1.0), Err(PierreError::UnknownHypothesis(_))));
        assert!(matches!(table.latest("B"), Err(PierreError::UnknownHypothesis(_))));
    }

    #[test]
    fn depth_tracks_aligned_histories() {
        let mut table = HypothesisTable::new();
        assert_eq!(table.depth(), None);
        table.declare("A", 0.5).unwrap();
        table.declare("B", 0.5).unwrap();
        assert_eq!(table.depth(), Some(1));
        table.append("A", 0.1).unwrap();
        assert_eq!(table.depth(), None);
    }
}
