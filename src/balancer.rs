//! Top level balancing API. Wires the formula parser, the matrix builder and
//! the exact nullspace solver together, rejects solutions that are not
//! strictly positive, and offers the per-element tally the caller uses to
//! double-check the result independently of the elimination.

use crate::composition::{Composition, RowLabel};
use crate::formula_parser::ParseError;
use crate::rational_solver::{SolveError, nullspace_vector};
use crate::stoichiometry::StoichMatrix;
use log::info;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("could not parse species '{species}': {source}")]
    Formula {
        species: String,
        #[source]
        source: ParseError,
    },
    #[error("an equation needs at least one reactant and one product")]
    MissingSpecies,
    #[error("equation must contain '->', '=' or a unicode arrow between the two sides")]
    MissingArrow,
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error("no strictly positive integer coefficients balance this equation")]
    NonPositiveSolution,
}

/// A successfully balanced reaction: one positive integer coefficient per
/// species, reactants first, in input order. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct BalancedReaction {
    /// Species formulas in coefficient order.
    pub species: Vec<String>,
    /// Smallest positive integer coefficients, one per species.
    pub coefficients: Vec<BigInt>,
    /// How many leading entries belong to the reactant side.
    pub n_reactants: usize,
    /// Parsed composition of each species, kept for the tally self-check.
    #[serde(skip)]
    pub compositions: Vec<Composition>,
    /// Row labels of the matrix the coefficients were solved against.
    #[serde(skip)]
    pub rows: Vec<RowLabel>,
}

impl BalancedReaction {
    pub fn reactant_coefficients(&self) -> &[BigInt] {
        &self.coefficients[..self.n_reactants]
    }

    pub fn product_coefficients(&self) -> &[BigInt] {
        &self.coefficients[self.n_reactants..]
    }

    /// Recomputes the per-element (and, in charge mode, net charge) totals of
    /// each side from the parsed compositions and the solved coefficients.
    /// This deliberately does not reuse any solver state.
    pub fn tally(&self) -> (BTreeMap<RowLabel, BigInt>, BTreeMap<RowLabel, BigInt>) {
        let zeroed: BTreeMap<RowLabel, BigInt> = self
            .rows
            .iter()
            .cloned()
            .map(|label| (label, BigInt::zero()))
            .collect();
        let mut left = zeroed.clone();
        let mut right = zeroed;
        for (index, (composition, coefficient)) in
            self.compositions.iter().zip(&self.coefficients).enumerate()
        {
            let side = if index < self.n_reactants {
                &mut left
            } else {
                &mut right
            };
            for (element, count) in &composition.elements {
                if let Some(total) = side.get_mut(&RowLabel::Element(element.clone())) {
                    *total += BigInt::from(*count) * coefficient;
                }
            }
            if let Some(charge) = composition.charge {
                if let Some(total) = side.get_mut(&RowLabel::Charge) {
                    *total += BigInt::from(charge) * coefficient;
                }
            }
        }
        (left, right)
    }

    /// True when both sides agree on every tallied row, in exact integer
    /// arithmetic.
    pub fn is_exactly_balanced(&self) -> bool {
        let (left, right) = self.tally();
        left == right
    }

    /// Renders the balanced equation, omitting unit coefficients:
    /// `2H2 + O2 -> 2H2O`.
    pub fn equation_string(&self) -> String {
        let render = |species: &[String], coefficients: &[BigInt]| {
            species
                .iter()
                .zip(coefficients)
                .map(|(formula, coefficient)| {
                    if coefficient.is_one() {
                        formula.clone()
                    } else {
                        format!("{coefficient}{formula}")
                    }
                })
                .collect::<Vec<_>>()
                .join(" + ")
        };
        format!(
            "{} -> {}",
            render(
                &self.species[..self.n_reactants],
                self.reactant_coefficients()
            ),
            render(&self.species[self.n_reactants..], self.product_coefficients())
        )
    }

    /// Tally rendered as a table, one row per element (plus charge when it
    /// was balanced), with left and right totals side by side.
    pub fn tally_table(&self) -> Table {
        let (left, right) = self.tally();
        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new("component"),
            Cell::new("reactants"),
            Cell::new("products"),
            Cell::new("balanced"),
        ]));
        for label in &self.rows {
            let l = &left[label];
            let r = &right[label];
            table.add_row(Row::new(vec![
                Cell::new(&label.to_string()),
                Cell::new(&l.to_string()),
                Cell::new(&r.to_string()),
                Cell::new(if l == r { "yes" } else { "NO" }),
            ]));
        }
        table
    }

    pub fn pretty_print(&self) {
        println!("{}", self.equation_string());
        self.tally_table().printstd();
    }
}

/// Balances a reaction given as reactant and product formula lists.
///
/// ```
/// let balanced = chembal::balance_reaction(
///     &["H2".to_string(), "O2".to_string()],
///     &["H2O".to_string()],
///     false,
/// )
/// .unwrap();
/// assert_eq!(balanced.equation_string(), "2H2 + O2 -> 2H2O");
/// ```
pub fn balance_reaction(
    reactants: &[String],
    products: &[String],
    include_charge: bool,
) -> Result<BalancedReaction, BalanceError> {
    if reactants.is_empty() || products.is_empty() {
        return Err(BalanceError::MissingSpecies);
    }
    let stoich = StoichMatrix::build(reactants, products, include_charge)?;
    let coefficients = nullspace_vector(&stoich.a)?;
    if coefficients.iter().any(|c| !c.is_positive()) {
        return Err(BalanceError::NonPositiveSolution);
    }
    info!(
        "balanced {} species over {} constraint rows",
        stoich.species.len(),
        stoich.rows.len()
    );
    Ok(BalancedReaction {
        species: stoich.species,
        coefficients,
        n_reactants: stoich.n_reactants,
        compositions: stoich.compositions,
        rows: stoich.rows,
    })
}

/// Balances an equation written on one line, such as
/// `"C3H8 + O2 -> CO2 + H2O"`.
pub fn balance_equation(
    input: &str,
    include_charge: bool,
) -> Result<BalancedReaction, BalanceError> {
    let (reactants, products) = split_equation(input)?;
    balance_reaction(&reactants, &products, include_charge)
}

/// Splits a one-line equation into reactant and product formula lists.
/// The two sides are separated by `->`, `=` or a unicode arrow; species are
/// separated by `+` signs that are not part of a trailing charge suffix.
pub fn split_equation(input: &str) -> Result<(Vec<String>, Vec<String>), BalanceError> {
    let normalized = input.replace('→', "->").replace('⇌', "->");
    let (left, right) = if let Some(idx) = normalized.find("->") {
        (&normalized[..idx], &normalized[idx + 2..])
    } else if let Some(idx) = normalized.find('=') {
        (&normalized[..idx], &normalized[idx + 1..])
    } else {
        return Err(BalanceError::MissingArrow);
    };
    Ok((split_species(left), split_species(right)))
}

fn split_species(side: &str) -> Vec<String> {
    let mut species = Vec::new();
    let mut current = String::new();
    let mut in_charge_suffix = false;
    for ch in side.chars() {
        match ch {
            '^' => {
                in_charge_suffix = true;
                current.push(ch);
            }
            '0'..='9' if in_charge_suffix => current.push(ch),
            '+' | '-' if in_charge_suffix => {
                in_charge_suffix = false;
                current.push(ch);
            }
            '+' => flush_species(&mut species, &mut current),
            _ => {
                in_charge_suffix = false;
                current.push(ch);
            }
        }
    }
    flush_species(&mut species, &mut current);
    species
}

fn flush_species(out: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_integer::Integer;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn as_i64(x: &[BigInt]) -> Vec<i64> {
        x.iter().map(|v| i64::try_from(v).unwrap()).collect()
    }

    fn assert_balances(
        reactants: &[&str],
        products: &[&str],
        include_charge: bool,
        expected: &[i64],
    ) {
        let balanced =
            balance_reaction(&strings(reactants), &strings(products), include_charge).unwrap();
        assert_eq!(as_i64(&balanced.coefficients), expected);
        assert!(balanced.is_exactly_balanced());
        let mut gcd = BigInt::zero();
        for c in &balanced.coefficients {
            gcd = gcd.gcd(c);
        }
        assert!(gcd.is_one());
    }

    #[test]
    fn test_water_formation() {
        assert_balances(&["H2", "O2"], &["H2O"], false, &[2, 1, 2]);
    }

    #[test]
    fn test_propane_combustion() {
        assert_balances(&["C3H8", "O2"], &["CO2", "H2O"], false, &[1, 5, 3, 4]);
    }

    #[test]
    fn test_iron_oxide_formation() {
        assert_balances(&["Fe", "O2"], &["Fe2O3"], false, &[4, 3, 2]);
    }

    #[test]
    fn test_permanganate_disproportionation() {
        assert_balances(
            &["KMnO4"],
            &["K2MnO4", "MnO2", "O2"],
            false,
            &[2, 1, 1, 1],
        );
    }

    #[test]
    fn test_hydrate_decomposition() {
        assert_balances(&["CuSO4·5H2O"], &["CuSO4", "H2O"], false, &[1, 1, 5]);
    }

    #[test]
    fn test_ionic_precipitation_with_charge_row() {
        assert_balances(&["Ag^+", "Cl^-"], &["AgCl"], true, &[1, 1, 1]);
        assert_balances(&["Ba^2+", "SO4^2-"], &["BaSO4"], true, &[1, 1, 1]);
    }

    #[test]
    fn test_impossible_reaction_is_rejected() {
        let err = balance_reaction(&strings(&["H2"]), &strings(&["O2"]), false).unwrap_err();
        assert_eq!(err, BalanceError::NonPositiveSolution);
    }

    #[test]
    fn test_empty_sides_are_rejected() {
        let err = balance_reaction(&[], &strings(&["H2O"]), false).unwrap_err();
        assert_eq!(err, BalanceError::MissingSpecies);
        let err = balance_reaction(&strings(&["H2"]), &[], false).unwrap_err();
        assert_eq!(err, BalanceError::MissingSpecies);
    }

    #[test]
    fn test_parse_failure_is_reported_with_species() {
        let err =
            balance_reaction(&strings(&["Fe(SO4"]), &strings(&["H2O"]), false).unwrap_err();
        match err {
            BalanceError::Formula { species, source } => {
                assert_eq!(species, "Fe(SO4");
                assert_eq!(source, ParseError::UnmatchedParenthesis { pos: 2 });
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_equation_string_omits_unit_coefficients() {
        let balanced =
            balance_reaction(&strings(&["C3H8", "O2"]), &strings(&["CO2", "H2O"]), false)
                .unwrap();
        assert_eq!(balanced.equation_string(), "C3H8 + 5O2 -> 3CO2 + 4H2O");
    }

    #[test]
    fn test_balance_equation_from_one_line() {
        let balanced = balance_equation("C3H8 + O2 -> CO2 + H2O", false).unwrap();
        assert_eq!(as_i64(&balanced.coefficients), vec![1, 5, 3, 4]);

        let balanced = balance_equation("Fe + O2 = Fe2O3", false).unwrap();
        assert_eq!(as_i64(&balanced.coefficients), vec![4, 3, 2]);
    }

    #[test]
    fn test_split_equation_respects_charge_suffixes() {
        let (reactants, products) = split_equation("Ag^+ + Cl^- -> AgCl").unwrap();
        assert_eq!(reactants, strings(&["Ag^+", "Cl^-"]));
        assert_eq!(products, strings(&["AgCl"]));
    }

    #[test]
    fn test_split_equation_without_arrow() {
        assert_eq!(
            split_equation("H2 O2 H2O").unwrap_err(),
            BalanceError::MissingArrow
        );
    }

    #[test]
    fn test_tally_reports_both_sides() {
        let balanced =
            balance_reaction(&strings(&["H2", "O2"]), &strings(&["H2O"]), false).unwrap();
        let (left, right) = balanced.tally();
        let h = RowLabel::Element(crate::composition::ElementSymbol::new("H").unwrap());
        let o = RowLabel::Element(crate::composition::ElementSymbol::new("O").unwrap());
        assert_eq!(left[&h], BigInt::from(4));
        assert_eq!(left[&o], BigInt::from(2));
        assert_eq!(left, right);
    }

    #[test]
    fn test_coefficient_sides() {
        let balanced =
            balance_reaction(&strings(&["H2", "O2"]), &strings(&["H2O"]), false).unwrap();
        assert_eq!(as_i64(balanced.reactant_coefficients()), vec![2, 1]);
        assert_eq!(as_i64(balanced.product_coefficients()), vec![2]);
    }
}
