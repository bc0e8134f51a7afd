//! # Formula parser
//!
//! ## Aim
//! Turns a chemical formula string like `Fe2(SO4)3`, `CuSO4*5H2O` or `SO4^2-`
//! into a [`Composition`]. Handles nested parentheses, hydrate fragments
//! joined by a middle dot `·`, an asterisk `*`, or a literal period before a
//! trailing water group, and an optional trailing ionic charge suffix.
//!
//! ## How it works
//! - the optional charge suffix `^<digits>?<+|->` is matched and stripped
//!   from the end of the whole string first;
//! - the rest is split into fragments at hydrate separators;
//! - a fragment of the exact shape `<digits>H2O` is expanded directly
//!   (n waters contribute 2n hydrogen and n oxygen);
//! - every other fragment goes through a recursive-descent parse over an
//!   immutable character cursor with one lookahead character. Multipliers are
//!   consumed greedily as a maximal digit run.
//!
//! Charge sign convention: `^n+` contributes `+n` to the charge, `^n-`
//! contributes `-n`. The stoichiometry matrix uses the same signed value for
//! its charge row, so the convention holds across the whole pipeline.
//!
//! ## Usage
//! ```
//! use chembal::formula_parser::parse_formula;
//!
//! let water = parse_formula("H2O").unwrap();
//! assert_eq!(water.elements.len(), 2);
//! let sulfate = parse_formula("SO4^2-").unwrap();
//! assert_eq!(sulfate.charge, Some(-2));
//! ```

use crate::composition::{Composition, ElementSymbol};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Trailing ionic charge suffix, magnitude optional: `^2-`, `^+`.
static CHARGE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^([0-9]+)?([+-])$").unwrap());

/// A whole hydrate fragment: `5H2O`, `H2O`.
static HYDRATE_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]*)H2O$").unwrap());

/// Errors produced while parsing a formula. Positions are character indices
/// into the formula with whitespace removed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedCharacter { ch: char, pos: usize },
    #[error("unmatched opening parenthesis at position {pos}")]
    UnmatchedParenthesis { pos: usize },
    #[error("malformed charge suffix in '{formula}'")]
    MalformedChargeSuffix { formula: String },
}

/// Parses a formula string into its atomic composition.
///
/// The empty string parses to an empty composition, and a bare charge suffix
/// such as `^2-` is legal and yields a composition with no atoms.
pub fn parse_formula(formula: &str) -> Result<Composition, ParseError> {
    let stripped: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
    let mut composition = Composition::new();

    // Charge suffix comes off the end of the whole string, before any
    // fragment splitting.
    let core: &str = match CHARGE_SUFFIX.captures(&stripped) {
        Some(caps) => {
            let magnitude: i64 = match caps.get(1) {
                Some(digits) => digits.as_str().parse().map_err(|_| {
                    ParseError::MalformedChargeSuffix {
                        formula: stripped.clone(),
                    }
                })?,
                None => 1,
            };
            composition.charge = Some(if &caps[2] == "+" { magnitude } else { -magnitude });
            &stripped[..caps.get(0).map_or(0, |m| m.start())]
        }
        None => &stripped,
    };
    if core.contains('^') {
        return Err(ParseError::MalformedChargeSuffix {
            formula: stripped.clone(),
        });
    }

    let chars: Vec<char> = core.chars().collect();
    for (offset, fragment) in split_fragments(&chars) {
        if fragment.is_empty() {
            continue;
        }
        let text: String = fragment.iter().collect();
        if let Some(caps) = HYDRATE_FRAGMENT.captures(&text) {
            let waters: u32 = if caps[1].is_empty() {
                1
            } else {
                caps[1].parse().map_err(|_| ParseError::UnexpectedCharacter {
                    ch: fragment[0],
                    pos: offset,
                })?
            };
            composition.add_element(ElementSymbol::from_letters('H', None), waters.saturating_mul(2));
            composition.add_element(ElementSymbol::from_letters('O', None), waters);
        } else {
            let mut cursor = Cursor {
                chars: fragment,
                pos: 0,
                base: offset,
            };
            let parsed = parse_group(&mut cursor, 0)?;
            composition.merge_scaled(&parsed, 1);
        }
    }

    debug!("parsed '{}' -> {:?}", formula, composition);
    Ok(composition)
}

/// Splits the charge-free core into hydrate fragments, keeping each
/// fragment's character offset for error reporting. A period only separates
/// when everything after it is a trailing water group.
fn split_fragments(chars: &[char]) -> Vec<(usize, &[char])> {
    let mut fragments = Vec::new();
    let mut start = 0;
    for (i, &ch) in chars.iter().enumerate() {
        let separates = match ch {
            '·' | '*' => true,
            '.' => {
                let tail: String = chars[i + 1..].iter().collect();
                HYDRATE_FRAGMENT.is_match(&tail)
            }
            _ => false,
        };
        if separates {
            fragments.push((start, &chars[start..i]));
            start = i + 1;
        }
    }
    fragments.push((start, &chars[start..]));
    fragments
}

/// Character cursor over one fragment. `base` is the fragment's offset in
/// the original string so reported positions stay absolute.
struct Cursor<'a> {
    chars: &'a [char],
    pos: usize,
    base: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn at(&self) -> usize {
        self.base + self.pos
    }

    /// Consumes a maximal digit run; absence of digits means 1. A run too
    /// long for u32 is rejected as malformed.
    fn read_number(&mut self) -> Result<u32, ParseError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(1);
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits.parse().map_err(|_| ParseError::UnexpectedCharacter {
            ch: self.chars[start],
            pos: self.base + start,
        })
    }

    /// Consumes an element symbol: one uppercase letter plus an optional
    /// lowercase one. The caller has already seen the uppercase letter.
    fn read_symbol(&mut self) -> ElementSymbol {
        let upper = self.bump().unwrap_or_default();
        let lower = match self.peek() {
            Some(c) if c.is_ascii_lowercase() => {
                self.bump();
                Some(c)
            }
            _ => None,
        };
        ElementSymbol::from_letters(upper, lower)
    }
}

/// One parenthesis level. Returns when the fragment ends or, below the top
/// level, when a closing parenthesis is next (left for the caller to eat).
fn parse_group(cursor: &mut Cursor<'_>, depth: usize) -> Result<Composition, ParseError> {
    let mut out = Composition::new();
    while let Some(ch) = cursor.peek() {
        match ch {
            '(' => {
                let inner = parse_parenthesized(cursor, depth)?;
                let multiplier = cursor.read_number()?;
                out.merge_scaled(&inner, multiplier);
            }
            ')' => {
                if depth == 0 {
                    return Err(ParseError::UnexpectedCharacter {
                        ch,
                        pos: cursor.at(),
                    });
                }
                break;
            }
            '0'..='9' => {
                // A leading digit run multiplies the unit right after it:
                // 2(OH) doubles the group, 5H2O (outside the hydrate
                // shorthand) multiplies only the H.
                let run_start = cursor.at();
                let multiplier = cursor.read_number()?;
                match cursor.peek() {
                    Some('(') => {
                        let inner = parse_parenthesized(cursor, depth)?;
                        out.merge_scaled(&inner, multiplier);
                    }
                    Some(c) if c.is_ascii_uppercase() => {
                        let symbol = cursor.read_symbol();
                        let count = cursor.read_number()?;
                        out.add_element(symbol, count.saturating_mul(multiplier));
                    }
                    Some(c) => {
                        return Err(ParseError::UnexpectedCharacter {
                            ch: c,
                            pos: cursor.at(),
                        });
                    }
                    None => {
                        return Err(ParseError::UnexpectedCharacter {
                            ch,
                            pos: run_start,
                        });
                    }
                }
            }
            c if c.is_ascii_uppercase() => {
                let symbol = cursor.read_symbol();
                let count = cursor.read_number()?;
                out.add_element(symbol, count);
            }
            other => {
                return Err(ParseError::UnexpectedCharacter {
                    ch: other,
                    pos: cursor.at(),
                });
            }
        }
    }
    Ok(out)
}

/// Consumes `( expr )` and returns the inner composition, unscaled.
fn parse_parenthesized(cursor: &mut Cursor<'_>, depth: usize) -> Result<Composition, ParseError> {
    let open_at = cursor.at();
    cursor.bump();
    let inner = parse_group(cursor, depth + 1)?;
    match cursor.peek() {
        Some(')') => {
            cursor.bump();
            Ok(inner)
        }
        _ => Err(ParseError::UnmatchedParenthesis { pos: open_at }),
    }
}
