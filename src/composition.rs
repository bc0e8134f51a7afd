//! Atomic composition of a single chemical species: a sorted map of element
//! symbols to atom counts plus an optional net ionic charge. The charge lives
//! in its own typed slot, so it can never collide with an element symbol.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A chemical element symbol: one ASCII uppercase letter optionally followed
/// by one ASCII lowercase letter ("H", "Na", "Cl").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementSymbol(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{0}' is not a valid element symbol")]
pub struct InvalidSymbol(pub String);

impl ElementSymbol {
    pub fn new(symbol: &str) -> Result<Self, InvalidSymbol> {
        let mut chars = symbol.chars();
        let valid = match (chars.next(), chars.next(), chars.next()) {
            (Some(first), None, _) => first.is_ascii_uppercase(),
            (Some(first), Some(second), None) => {
                first.is_ascii_uppercase() && second.is_ascii_lowercase()
            }
            _ => false,
        };
        if valid {
            Ok(Self(symbol.to_string()))
        } else {
            Err(InvalidSymbol(symbol.to_string()))
        }
    }

    /// Constructor for callers that already hold validated letters, such as
    /// the formula scanner.
    pub(crate) fn from_letters(upper: char, lower: Option<char>) -> Self {
        debug_assert!(upper.is_ascii_uppercase());
        debug_assert!(lower.is_none_or(|c| c.is_ascii_lowercase()));
        let mut s = String::with_capacity(2);
        s.push(upper);
        if let Some(lower) = lower {
            s.push(lower);
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ElementSymbol {
    type Err = InvalidSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Element counts (and optional net charge) of one parsed species.
///
/// Counts are kept in a BTreeMap so that iteration order, and therefore the
/// row order of any matrix assembled from several compositions, is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    /// Atom count per element symbol.
    pub elements: BTreeMap<ElementSymbol, u32>,
    /// Net ionic charge if the formula carried a charge suffix. `None` means
    /// "no charge written", which is distinct from an explicit zero.
    pub charge: Option<i64>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.charge.is_none()
    }

    pub fn count(&self, element: &ElementSymbol) -> u32 {
        self.elements.get(element).copied().unwrap_or(0)
    }

    pub fn add_element(&mut self, element: ElementSymbol, count: u32) {
        let slot = self.elements.entry(element).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Merges `other` into `self` with every count (and any charge) scaled by
    /// `factor`. This is what a parenthesized group multiplier does.
    pub fn merge_scaled(&mut self, other: &Composition, factor: u32) {
        for (element, count) in &other.elements {
            let slot = self.elements.entry(element.clone()).or_insert(0);
            *slot = slot.saturating_add(count.saturating_mul(factor));
        }
        if let Some(charge) = other.charge {
            let scaled = charge * i64::from(factor);
            self.charge = Some(self.charge.unwrap_or(0) + scaled);
        }
    }
}

/// Label of one stoichiometry matrix row: a chemical element, or the net
/// charge when charge balancing is enabled. `Charge` sorts after every
/// element, so the charge row always comes last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RowLabel {
    Element(ElementSymbol),
    Charge,
}

impl fmt::Display for RowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowLabel::Element(symbol) => write!(f, "{}", symbol),
            RowLabel::Charge => f.write_str("charge"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_validation() {
        assert!(ElementSymbol::new("H").is_ok());
        assert!(ElementSymbol::new("Na").is_ok());
        assert!(ElementSymbol::new("").is_err());
        assert!(ElementSymbol::new("na").is_err());
        assert!(ElementSymbol::new("NA").is_err());
        assert!(ElementSymbol::new("Nab").is_err());
        assert!(ElementSymbol::new("1a").is_err());
    }

    #[test]
    fn test_merge_scaled() {
        let mut outer = Composition::new();
        outer.add_element(ElementSymbol::new("Fe").unwrap(), 2);

        let mut group = Composition::new();
        group.add_element(ElementSymbol::new("S").unwrap(), 1);
        group.add_element(ElementSymbol::new("O").unwrap(), 4);

        outer.merge_scaled(&group, 3);
        assert_eq!(outer.count(&ElementSymbol::new("Fe").unwrap()), 2);
        assert_eq!(outer.count(&ElementSymbol::new("S").unwrap()), 3);
        assert_eq!(outer.count(&ElementSymbol::new("O").unwrap()), 12);
        assert_eq!(outer.charge, None);
    }

    #[test]
    fn test_merge_scaled_charge() {
        let mut acc = Composition::new();
        let mut ion = Composition::new();
        ion.charge = Some(-2);
        acc.merge_scaled(&ion, 3);
        assert_eq!(acc.charge, Some(-6));
    }

    #[test]
    fn test_charge_row_sorts_last() {
        let mut labels = vec![
            RowLabel::Charge,
            RowLabel::Element(ElementSymbol::new("O").unwrap()),
            RowLabel::Element(ElementSymbol::new("H").unwrap()),
        ];
        labels.sort();
        assert_eq!(labels.last(), Some(&RowLabel::Charge));
    }
}
