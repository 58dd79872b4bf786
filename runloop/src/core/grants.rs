//! Grant list validation and comparison.

use std::collections::BTreeSet;

use jsonschema::Draft;
use serde_json::Value;

const GRANT_LIST_SCHEMA: &str = include_str!("../../schemas/grant_list.schema.json");

/// Validate a rewritten grant list object (`{"allow": [...]}`).
///
/// Returns the grants in their original order, or every schema violation.
pub fn validate_grant_list(candidate: &Value) -> Result<Vec<String>, Vec<String>> {
    let schema: Value = serde_json::from_str(GRANT_LIST_SCHEMA)
        .map_err(|err| vec![format!("parse grant list schema: {err}")])?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| vec![format!("compile grant list schema: {err}")])?;
    let messages: Vec<String> = compiled
        .iter_errors(candidate)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(messages);
    }
    let grants = candidate["allow"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    Ok(grants)
}

/// Grants in `proposed` that `current` lacks, deduplicated, in proposal order.
pub fn missing_grants(current: &[String], proposed: &[String]) -> Vec<String> {
    let have: BTreeSet<&str> = current.iter().map(String::as_str).collect();
    let mut seen = BTreeSet::new();
    proposed
        .iter()
        .map(|grant| grant.trim())
        .filter(|grant| !grant.is_empty() && !have.contains(grant) && seen.insert(*grant))
        .map(str::to_string)
        .collect()
}

/// Order-insensitive equality of two grant lists.
pub fn same_grants(a: &[String], b: &[String]) -> bool {
    let a: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn accepts_well_formed_list() {
        let grants = validate_grant_list(&json!({"allow": ["Bash(git:*)", "Read"]}))
            .expect("valid list");
        assert_eq!(grants, strings(&["Bash(git:*)", "Read"]));
    }

    #[test]
    fn rejects_malformed_lists() {
        for candidate in [
            json!({"allow": "git"}),
            json!({"allow": ["git", ""]}),
            json!({"allow": ["git", "  "]}),
            json!({"allow": ["git", "git"]}),
            json!({"allow": ["git", 3]}),
            json!({"grants": ["git"]}),
            json!(["git"]),
        ] {
            let errors = validate_grant_list(&candidate).unwrap_err();
            assert!(!errors.is_empty(), "{candidate}");
        }
    }

    #[test]
    fn padded_grants_are_rejected() {
        for candidate in [
            json!({"allow": ["git", " git"]}),
            json!({"allow": ["npm "]}),
            json!({"allow": ["Bash(ls)\n"]}),
        ] {
            assert!(validate_grant_list(&candidate).is_err(), "{candidate}");
        }
        let grants = validate_grant_list(&json!({"allow": ["R", "Bash(npm run build)"]}))
            .expect("inner spaces are fine");
        assert_eq!(grants, strings(&["R", "Bash(npm run build)"]));
    }

    #[test]
    fn missing_skips_present_and_duplicates() {
        let current = strings(&["git", "npm"]);
        let proposed = strings(&["npm", "cargo", " cargo ", "", "just"]);
        assert_eq!(
            missing_grants(&current, &proposed),
            strings(&["cargo", "just"])
        );
    }

    #[test]
    fn same_grants_ignores_order() {
        assert!(same_grants(&strings(&["git", "npm"]), &strings(&["npm", "git"])));
        assert!(!same_grants(&strings(&["git"]), &strings(&["git", "npm"])));
    }
}
