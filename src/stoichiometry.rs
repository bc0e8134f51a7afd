//! Assembles the stoichiometry matrix of a reaction. Rows are the element
//! symbols observed across all species (sorted), with one extra charge row
//! when charge balancing is requested and at least one species is an ion.
//! Columns are the species, reactants first, and product columns carry the
//! negated counts so that any balancing coefficient vector lies in the right
//! nullspace of the matrix.

use crate::balancer::BalanceError;
use crate::composition::{Composition, RowLabel};
use crate::formula_parser::parse_formula;
use log::debug;
use nalgebra::DMatrix;
use std::collections::BTreeSet;

/// Stoichiometry matrix plus the labels needed to interpret it.
#[derive(Debug, Clone)]
pub struct StoichMatrix {
    /// Element/charge rows by species columns; product columns are negated.
    pub a: DMatrix<i64>,
    /// Row labels, in matrix row order.
    pub rows: Vec<RowLabel>,
    /// Species formulas, in matrix column order (reactants then products).
    pub species: Vec<String>,
    /// Parsed composition of each species, in column order.
    pub compositions: Vec<Composition>,
    /// How many leading columns are reactants.
    pub n_reactants: usize,
}

impl StoichMatrix {
    /// Parses every species once and fills the matrix. A species that fails
    /// to parse aborts the build and names the offender.
    pub fn build(
        reactants: &[String],
        products: &[String],
        include_charge: bool,
    ) -> Result<Self, BalanceError> {
        let species: Vec<String> = reactants.iter().chain(products.iter()).cloned().collect();
        let mut compositions = Vec::with_capacity(species.len());
        for formula in &species {
            let composition =
                parse_formula(formula).map_err(|source| BalanceError::Formula {
                    species: formula.clone(),
                    source,
                })?;
            compositions.push(composition);
        }

        let mut element_union = BTreeSet::new();
        for composition in &compositions {
            element_union.extend(composition.elements.keys().cloned());
        }
        let mut rows: Vec<RowLabel> = element_union.into_iter().map(RowLabel::Element).collect();
        if include_charge && compositions.iter().any(|c| c.charge.is_some()) {
            rows.push(RowLabel::Charge);
        }

        let mut a = DMatrix::<i64>::zeros(rows.len(), species.len());
        for (col, composition) in compositions.iter().enumerate() {
            let sign: i64 = if col < reactants.len() { 1 } else { -1 };
            for (row, label) in rows.iter().enumerate() {
                let value = match label {
                    RowLabel::Element(element) => i64::from(composition.count(element)),
                    RowLabel::Charge => composition.charge.unwrap_or(0),
                };
                a[(row, col)] = sign * value;
            }
        }
        debug!(
            "stoichiometry matrix: {} rows x {} species ({} reactants)",
            rows.len(),
            species.len(),
            reactants.len()
        );

        Ok(Self {
            a,
            rows,
            species,
            compositions,
            n_reactants: reactants.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::ElementSymbol;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_water_formation_matrix() {
        let m = StoichMatrix::build(&strings(&["H2", "O2"]), &strings(&["H2O"]), false).unwrap();
        // Rows sorted: H then O. Product column negated.
        assert_eq!(
            m.rows,
            vec![
                RowLabel::Element(ElementSymbol::new("H").unwrap()),
                RowLabel::Element(ElementSymbol::new("O").unwrap()),
            ]
        );
        assert_eq!(m.species, strings(&["H2", "O2", "H2O"]));
        assert_eq!(m.n_reactants, 2);
        let expected = DMatrix::from_row_slice(2, 3, &[2, 0, -2, 0, 2, -1]);
        assert_eq!(m.a, expected);
    }

    #[test]
    fn test_charge_row_only_when_requested() {
        let reactants = strings(&["Ag^+", "Cl^-"]);
        let products = strings(&["AgCl"]);

        let without = StoichMatrix::build(&reactants, &products, false).unwrap();
        assert!(!without.rows.contains(&RowLabel::Charge));

        let with = StoichMatrix::build(&reactants, &products, true).unwrap();
        assert_eq!(with.rows.last(), Some(&RowLabel::Charge));
        // Charge row: +1 for Ag^+, -1 for Cl^-, product AgCl is neutral.
        let charge_row = with.a.nrows() - 1;
        assert_eq!(with.a[(charge_row, 0)], 1);
        assert_eq!(with.a[(charge_row, 1)], -1);
        assert_eq!(with.a[(charge_row, 2)], 0);
    }

    #[test]
    fn test_charge_row_absent_for_neutral_species() {
        let m =
            StoichMatrix::build(&strings(&["H2", "O2"]), &strings(&["H2O"]), true).unwrap();
        assert!(!m.rows.contains(&RowLabel::Charge));
    }

    #[test]
    fn test_parse_failure_names_the_species() {
        let err = StoichMatrix::build(&strings(&["H2", "Fe(SO4"]), &strings(&["H2O"]), false)
            .unwrap_err();
        match err {
            BalanceError::Formula { species, .. } => assert_eq!(species, "Fe(SO4"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
