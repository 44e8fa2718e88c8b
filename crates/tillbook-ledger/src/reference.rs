//! Resolving user-typed references to sales, orders and lay-byes.
//!
//! A short all-digit reference (`1`, `2`, `12`) is a 1-based position in
//! the list the user last saw. Anything else is a full id or an id prefix
//! of at least [`MIN_PREFIX_LEN`] characters.

use tillbook_core::{CoreError, ValidationError};

use crate::error::LedgerResult;

pub const MIN_PREFIX_LEN: usize = 4;

/// A parsed reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    /// 1-based position in a recent list.
    Index(usize),
    /// Full id or unique prefix.
    Id(&'a str),
}

impl<'a> Reference<'a> {
    pub fn parse(raw: &'a str) -> LedgerResult<Self> {
        let raw = raw.trim().trim_start_matches('#');
        if raw.is_empty() {
            return Err(ValidationError::Required {
                field: "reference".to_string(),
            }
            .into());
        }

        if raw.len() < MIN_PREFIX_LEN {
            if raw.chars().all(|c| c.is_ascii_digit()) {
                return match raw.parse::<usize>() {
                    Ok(n) if n >= 1 => Ok(Reference::Index(n)),
                    _ => Err(ValidationError::MustBePositive {
                        field: "number".to_string(),
                    }
                    .into()),
                };
            }
            return Err(ValidationError::InvalidFormat {
                field: "reference".to_string(),
                reason: format!(
                    "use a list number or at least {MIN_PREFIX_LEN} characters of the id"
                ),
            }
            .into());
        }

        Ok(Reference::Id(raw))
    }
}

/// Picks the `index`-th (1-based) entry of a recent list.
pub fn pick_index<T>(
    mut list: Vec<T>,
    index: usize,
    entity: &'static str,
    hint: &str,
) -> LedgerResult<T> {
    if index == 0 || index > list.len() {
        return Err(CoreError::not_found_with_hint(entity, format!("#{index}"), hint).into());
    }
    Ok(list.swap_remove(index - 1))
}

/// Picks the single prefix match, preferring an exact id.
pub fn pick_unique<T>(
    mut matches: Vec<T>,
    id_of: impl Fn(&T) -> &str,
    reference: &str,
    entity: &'static str,
    hint: &str,
) -> LedgerResult<T> {
    if let Some(pos) = matches.iter().position(|m| id_of(m) == reference) {
        return Ok(matches.swap_remove(pos));
    }
    match matches.len() {
        0 => Err(CoreError::not_found_with_hint(entity, reference, hint).into()),
        1 => Ok(matches.swap_remove(0)),
        _ => Err(ValidationError::InvalidFormat {
            field: "reference".to_string(),
            reason: format!("'{reference}' matches more than one {entity}, type more of the id"),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;

    #[test]
    fn test_parse_index_and_prefix() {
        assert_eq!(Reference::parse("2").unwrap(), Reference::Index(2));
        assert_eq!(Reference::parse("#3").unwrap(), Reference::Index(3));
        assert_eq!(Reference::parse("ab12cd").unwrap(), Reference::Id("ab12cd"));
        // Four digits is already an id prefix
        assert_eq!(Reference::parse("1234").unwrap(), Reference::Id("1234"));
        assert!(Reference::parse("0").is_err());
        assert!(Reference::parse("ab").is_err());
        assert!(Reference::parse("  ").is_err());
    }

    #[test]
    fn test_pick_index_bounds() {
        assert_eq!(pick_index(vec!["a", "b"], 2, "Sale", "sales").unwrap(), "b");
        let err = pick_index(vec!["a"], 3, "Sale", "sales").unwrap_err();
        assert!(matches!(err, LedgerError::Business(CoreError::NotFound { .. })));
    }

    #[test]
    fn test_pick_unique_rejects_ambiguity() {
        let ids = vec!["abcd1".to_string(), "abcd2".to_string()];
        assert!(pick_unique(ids.clone(), |s| s.as_str(), "abcd", "Order", "orders").is_err());
        assert_eq!(
            pick_unique(ids, |s| s.as_str(), "abcd2", "Order", "orders").unwrap(),
            "abcd2"
        );
    }
}
