//! Runtime configuration for the billing services.

use std::str::FromStr;

use glassbill_auth::resolver::DEFAULT_ANONYMOUS_PRINCIPALS;

pub const NUMBERING_MAX_ATTEMPTS_VAR: &str = "GLASSBILL_NUMBERING_MAX_ATTEMPTS";
pub const WRITE_MAX_ATTEMPTS_VAR: &str = "GLASSBILL_WRITE_MAX_ATTEMPTS";
pub const ANONYMOUS_PRINCIPALS_VAR: &str = "GLASSBILL_ANONYMOUS_PRINCIPALS";

const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingConfig {
    /// Attempts at claiming a document number before `NumberingConflict`.
    pub numbering_max_attempts: u32,
    /// Attempts at an optimistic write (payment, confirm, reject, delete)
    /// before the conflict is surfaced.
    pub write_max_attempts: u32,
    /// Principal names treated as "not logged in".
    pub anonymous_principals: Vec<String>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            numbering_max_attempts: DEFAULT_MAX_ATTEMPTS,
            write_max_attempts: DEFAULT_MAX_ATTEMPTS,
            anonymous_principals: DEFAULT_ANONYMOUS_PRINCIPALS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl BillingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or unparsable values fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let anonymous_principals = lookup(ANONYMOUS_PRINCIPALS_VAR)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|names| !names.is_empty())
            .unwrap_or(defaults.anonymous_principals);

        Self {
            numbering_max_attempts: positive(
                &lookup,
                NUMBERING_MAX_ATTEMPTS_VAR,
                defaults.numbering_max_attempts,
            ),
            write_max_attempts: positive(&lookup, WRITE_MAX_ATTEMPTS_VAR, defaults.write_max_attempts),
            anonymous_principals,
        }
    }
}

fn positive(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match u32::from_str(raw.trim()) {
        Ok(n) if n > 0 => n,
        _ => {
            tracing::warn!(key, value = %raw, default, "invalid config value; using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(BillingConfig::from_lookup(lookup(&[])), BillingConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = BillingConfig::from_lookup(lookup(&[
            (NUMBERING_MAX_ATTEMPTS_VAR, "12"),
            (WRITE_MAX_ATTEMPTS_VAR, " 3 "),
            (ANONYMOUS_PRINCIPALS_VAR, "anonymousUser, visitor ,"),
        ]));

        assert_eq!(config.numbering_max_attempts, 12);
        assert_eq!(config.write_max_attempts, 3);
        assert_eq!(config.anonymous_principals, vec!["anonymousUser", "visitor"]);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = BillingConfig::from_lookup(lookup(&[
            (NUMBERING_MAX_ATTEMPTS_VAR, "0"),
            (WRITE_MAX_ATTEMPTS_VAR, "many"),
            (ANONYMOUS_PRINCIPALS_VAR, " , "),
        ]));

        assert_eq!(config, BillingConfig::default());
    }
}
