//! Molar mass from a fixed atomic-mass table. This is display-boundary
//! arithmetic: the only place in the crate where floating point appears.

use crate::composition::{Composition, ElementSymbol};
use crate::formula_parser::{ParseError, parse_formula};
use thiserror::Error;

// Element symbols with their standard atomic masses, g/mol.
struct AtomicMass {
    symbol: &'static str,
    mass: f64,
}

const ATOMIC_MASSES: &[AtomicMass] = &[
    AtomicMass { symbol: "H", mass: 1.008 },
    AtomicMass { symbol: "He", mass: 4.0026 },
    AtomicMass { symbol: "Li", mass: 6.94 },
    AtomicMass { symbol: "Be", mass: 9.0122 },
    AtomicMass { symbol: "B", mass: 10.81 },
    AtomicMass { symbol: "C", mass: 12.011 },
    AtomicMass { symbol: "N", mass: 14.007 },
    AtomicMass { symbol: "O", mass: 15.999 },
    AtomicMass { symbol: "F", mass: 18.998 },
    AtomicMass { symbol: "Ne", mass: 20.18 },
    AtomicMass { symbol: "Na", mass: 22.99 },
    AtomicMass { symbol: "Mg", mass: 24.305 },
    AtomicMass { symbol: "Al", mass: 26.98 },
    AtomicMass { symbol: "Si", mass: 28.085 },
    AtomicMass { symbol: "P", mass: 30.974 },
    AtomicMass { symbol: "S", mass: 32.065 },
    AtomicMass { symbol: "Cl", mass: 35.45 },
    AtomicMass { symbol: "Ar", mass: 39.948 },
    AtomicMass { symbol: "K", mass: 39.102 },
    AtomicMass { symbol: "Ca", mass: 40.08 },
    AtomicMass { symbol: "Sc", mass: 44.9559 },
    AtomicMass { symbol: "Ti", mass: 47.867 },
    AtomicMass { symbol: "V", mass: 50.9415 },
    AtomicMass { symbol: "Cr", mass: 51.9961 },
    AtomicMass { symbol: "Mn", mass: 54.938 },
    AtomicMass { symbol: "Fe", mass: 55.845 },
    AtomicMass { symbol: "Co", mass: 58.933 },
    AtomicMass { symbol: "Ni", mass: 58.69 },
    AtomicMass { symbol: "Cu", mass: 63.546 },
    AtomicMass { symbol: "Zn", mass: 65.38 },
    AtomicMass { symbol: "Ga", mass: 69.723 },
    AtomicMass { symbol: "Ge", mass: 72.64 },
    AtomicMass { symbol: "As", mass: 74.9216 },
    AtomicMass { symbol: "Se", mass: 78.96 },
    AtomicMass { symbol: "Br", mass: 79.904 },
    AtomicMass { symbol: "Kr", mass: 83.798 },
    AtomicMass { symbol: "Rb", mass: 85.4678 },
    AtomicMass { symbol: "Sr", mass: 87.62 },
    AtomicMass { symbol: "Y", mass: 88.9059 },
    AtomicMass { symbol: "Zr", mass: 91.224 },
    AtomicMass { symbol: "Nb", mass: 92.9064 },
    AtomicMass { symbol: "Mo", mass: 95.94 },
    AtomicMass { symbol: "Tc", mass: 98.0 },
    AtomicMass { symbol: "Ru", mass: 101.07 },
    AtomicMass { symbol: "Ag", mass: 107.868 },
    AtomicMass { symbol: "Cd", mass: 112.414 },
    AtomicMass { symbol: "Sn", mass: 118.71 },
    AtomicMass { symbol: "Sb", mass: 121.76 },
    AtomicMass { symbol: "I", mass: 126.904 },
    AtomicMass { symbol: "Xe", mass: 131.293 },
    AtomicMass { symbol: "Cs", mass: 132.905 },
    AtomicMass { symbol: "Ba", mass: 137.327 },
    AtomicMass { symbol: "W", mass: 183.84 },
    AtomicMass { symbol: "Pt", mass: 195.084 },
    AtomicMass { symbol: "Au", mass: 196.967 },
    AtomicMass { symbol: "Hg", mass: 200.592 },
    AtomicMass { symbol: "Pb", mass: 207.2 },
    AtomicMass { symbol: "Bi", mass: 208.98 },
    AtomicMass { symbol: "U", mass: 238.029 },
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MolarMassError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("no tabulated atomic mass for element '{0}'")]
    UnknownElement(ElementSymbol),
}

/// Looks up the tabulated atomic mass of one element.
pub fn atomic_mass(symbol: &ElementSymbol) -> Option<f64> {
    ATOMIC_MASSES
        .iter()
        .find(|entry| entry.symbol == symbol.as_str())
        .map(|entry| entry.mass)
}

/// Molar mass of a parsed composition. The charge, if any, is ignored; the
/// mass of missing electrons is far below the table's precision.
pub fn molar_mass(composition: &Composition) -> Result<f64, MolarMassError> {
    let mut total = 0.0;
    for (element, count) in &composition.elements {
        let mass = atomic_mass(element)
            .ok_or_else(|| MolarMassError::UnknownElement(element.clone()))?;
        total += mass * f64::from(*count);
    }
    Ok(total)
}

/// Parses a formula and computes its molar mass in one step.
pub fn calculate_molar_mass(formula: &str) -> Result<f64, MolarMassError> {
    let composition = parse_formula(formula)?;
    molar_mass(&composition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_simple_formulas() {
        assert_relative_eq!(calculate_molar_mass("H2O").unwrap(), 18.015, epsilon = 1e-2);
        assert_relative_eq!(calculate_molar_mass("NaCl").unwrap(), 58.44, epsilon = 1e-2);
    }

    #[test]
    fn test_parenthesized_formula() {
        assert_relative_eq!(
            calculate_molar_mass("Ca(NO3)2").unwrap(),
            164.093,
            epsilon = 1e-2
        );
    }

    #[test]
    fn test_hydrate_formula() {
        assert_relative_eq!(
            calculate_molar_mass("CuSO4·5H2O").unwrap(),
            249.68,
            epsilon = 1e-2
        );
    }

    #[test]
    fn test_charge_does_not_change_mass() {
        let neutral = calculate_molar_mass("SO4").unwrap();
        let ion = calculate_molar_mass("SO4^2-").unwrap();
        assert_relative_eq!(neutral, ion);
    }

    #[test]
    fn test_unknown_element() {
        let err = calculate_molar_mass("Og2").unwrap_err();
        assert_eq!(
            err,
            MolarMassError::UnknownElement(ElementSymbol::new("Og").unwrap())
        );
    }

    #[test]
    fn test_parse_errors_propagate() {
        assert!(matches!(
            calculate_molar_mass("Fe(SO4").unwrap_err(),
            MolarMassError::Parse(_)
        ));
    }
}
