//! Dotted-numeric version parsing and comparison.
//!
//! Published script versions use a small grammar: one to four
//! dot-separated non-negative integer components, e.g. `"1"`, `"1.2"`,
//! `"1.2.3.4"`. There is no pre-release syntax; strings like `"1.2-beta"`
//! are invalid rather than "less than 1.2". Operands of different lengths
//! compare as if the shorter one were padded with trailing zeros, so
//! `"1.2"` and `"1.2.0.0"` are equal.
//!
//! [`ScriptVersion`] is the parsed form and implements the padded ordering
//! through `Ord`/`Eq`. [`compare`] is the string-level convenience used when
//! both operands arrive as text.
//!
//! # Examples
//!
//! ```rust
//! use std::cmp::Ordering;
//! use evergreen::version::compare;
//!
//! # fn example() -> Result<(), evergreen::core::UpdateError> {
//! assert_eq!(compare("1.9", "1.10")?, Ordering::Less);
//! assert_eq!(compare("1.2", "1.2.0.0")?, Ordering::Equal);
//! assert_eq!(compare("2", "1.9.9.9")?, Ordering::Greater);
//!
//! // Pre-release suffixes are a validation error, not a lenient comparison.
//! assert!(compare("1.2-beta", "1.0").is_err());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::cmp::Ordering;
use std::fmt;

use crate::core::UpdateError;

/// A parsed dotted-numeric version.
///
/// Holds between one and four numeric components in manifest order. Equality
/// and ordering are padded: missing trailing components count as zero, so
/// `"1.2"` and `"1.2.0"` parse to equal values.
#[derive(Debug, Clone)]
pub struct ScriptVersion {
    components: Vec<u64>,
}

impl ScriptVersion {
    /// Maximum number of dot-separated components the grammar accepts.
    pub const MAX_COMPONENTS: usize = 4;

    /// Parse a version string, tagging failures with the parameter name.
    ///
    /// `param` names the value in the caller's contract (`"a"`,
    /// `"current_version"`, ...) and is carried into
    /// [`UpdateError::Validation`] so diagnostics can say *which* version
    /// string was malformed.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Validation`] when `input` is empty, has more
    /// than four components, or contains anything but ASCII digits between
    /// the dots.
    pub fn parse(param: &str, input: &str) -> Result<Self, UpdateError> {
        let invalid = || UpdateError::Validation {
            param: param.to_string(),
            value: input.to_string(),
        };

        let mut components = Vec::new();
        for part in input.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let value: u64 = part.parse().map_err(|_| invalid())?;
            components.push(value);
        }
        if components.len() > Self::MAX_COMPONENTS {
            return Err(invalid());
        }

        Ok(Self { components })
    }

    /// The numeric components in order, without padding.
    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl fmt::Display for ScriptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{component}")?;
            first = false;
        }
        Ok(())
    }
}

impl Ord for ScriptVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let left = self.components.get(i).copied().unwrap_or(0);
            let right = other.components.get(i).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => continue,
                decided => return decided,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ScriptVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScriptVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScriptVersion {}

/// Compare two version strings as a total order.
///
/// Returns [`Ordering::Less`], [`Ordering::Equal`], or [`Ordering::Greater`]
/// for `a` relative to `b`. Both operands must match the dotted-numeric
/// grammar; the error names the offending parameter (`"a"` or `"b"`).
///
/// # Errors
///
/// Returns [`UpdateError::Validation`] when either operand fails the grammar.
pub fn compare(a: &str, b: &str) -> Result<Ordering, UpdateError> {
    let left = ScriptVersion::parse("a", a)?;
    let right = ScriptVersion::parse("b", b)?;
    Ok(left.cmp(&right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antisymmetry_and_identity() {
        let pairs = [
            ("1", "2"),
            ("1.2", "1.3"),
            ("1.2.3", "1.2.4"),
            ("1.2.3.4", "1.2.3.5"),
            ("0.9", "1"),
            ("3.4.5", "3.4.5"),
        ];
        for (a, b) in pairs {
            assert_eq!(
                compare(a, b).unwrap(),
                compare(b, a).unwrap().reverse(),
                "compare({a}, {b}) is not antisymmetric"
            );
            assert_eq!(compare(a, a).unwrap(), Ordering::Equal);
            assert_eq!(compare(b, b).unwrap(), Ordering::Equal);
        }
    }

    #[test]
    fn padding_equivalence() {
        assert_eq!(compare("1.2", "1.2.0.0").unwrap(), Ordering::Equal);
        assert_eq!(compare("1", "1.0.0").unwrap(), Ordering::Equal);
        assert_eq!(compare("1.0.0.1", "1").unwrap(), Ordering::Greater);
    }

    #[test]
    fn numeric_not_lexicographic() {
        assert_eq!(compare("1.9", "1.10").unwrap(), Ordering::Less);
        assert_eq!(compare("0.100", "0.99").unwrap(), Ordering::Greater);
    }

    #[test]
    fn first_difference_decides() {
        assert_eq!(compare("2.0.0", "1.9.9").unwrap(), Ordering::Greater);
        assert_eq!(compare("1.2.3", "1.3.0").unwrap(), Ordering::Less);
    }

    #[test]
    fn rejects_prerelease_suffixes() {
        let err = compare("1.2-beta", "1.0").unwrap_err();
        match err {
            UpdateError::Validation { param, value } => {
                assert_eq!(param, "a");
                assert_eq!(value, "1.2-beta");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_strings() {
        for bad in ["", ".", "1.", ".1", "1..2", "v1.2", "1.2.3.4.5", "1.2 ", "1.+2"] {
            assert!(
                compare(bad, "1").is_err(),
                "expected \"{bad}\" to fail validation"
            );
        }
    }

    #[test]
    fn names_the_second_parameter_too() {
        let err = compare("1.0", "nope").unwrap_err();
        match err {
            UpdateError::Validation { param, .. } => assert_eq!(param, "b"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn parsed_versions_order_and_display() {
        let a = ScriptVersion::parse("a", "1.2").unwrap();
        let b = ScriptVersion::parse("b", "1.2.0.0").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "1.2");
        assert_eq!(a.components(), &[1, 2]);

        let newer = ScriptVersion::parse("a", "1.2.0.1").unwrap();
        assert!(newer > a);
    }
}
