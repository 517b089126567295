//! Sensitive environment filtering
//!
//! Subprocesses inherit the host environment minus anything that smells
//! like a credential or belongs to the gateway's own configuration
//! namespace. Matching is on the uppercased variable name: an exact
//! blocklist, configured prefixes, and credential-suffix substrings.

use std::collections::HashMap;

/// Exact-match blocklist
const BLOCKED_ENV_VARS: &[&str] = &[
    "AUTH_KEY",
    "ENCRYPTION_KEY",
    "DATABASE_PASSWORD",
    "DB_PASSWORD",
    "MYSQL_PASSWORD",
    "POSTGRES_PASSWORD",
    "REDIS_PASSWORD",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AZURE_CLIENT_SECRET",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "GITHUB_PAT",
    "PRIVATE_KEY",
    "SECRET_KEY",
    "SESSION_SECRET",
    "JWT_SECRET",
];

/// Gateway-internal configuration prefixes
const BLOCKED_PREFIXES: &[&str] = &["TOOLGATE_", "INTERNAL_"];

/// Credential-style name fragments
const BLOCKED_SUBSTRINGS: &[&str] = &["_KEY", "_SECRET", "_TOKEN", "_PASSWORD", "_CREDENTIAL"];

/// Whether a variable name is safe to pass through
fn is_safe_env_name(name: &str) -> bool {
    let upper = name.to_uppercase();
    if BLOCKED_ENV_VARS.contains(&upper.as_str()) {
        return false;
    }
    if BLOCKED_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        return false;
    }
    if BLOCKED_SUBSTRINGS.iter().any(|s| upper.contains(s)) {
        return false;
    }
    true
}

/// Filter `NAME=value` pairs, dropping sensitive names
pub fn filter_sensitive_env_vars(env: &[String]) -> Vec<String> {
    env.iter()
        .filter(|entry| {
            let name = entry.split('=').next().unwrap_or(entry);
            is_safe_env_name(name)
        })
        .cloned()
        .collect()
}

/// Filtered host environment plus caller-supplied pairs. The extras come
/// from the service record and are trusted: they are applied after the
/// filter and may carry the secrets the backend itself needs.
pub fn get_safe_env_for_mcp(extra: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = std::env::vars()
        .filter(|(name, _)| is_safe_env_name(name))
        .collect();
    for (name, value) in extra {
        out.retain(|(existing, _)| existing != name);
        out.push((name.clone(), value.clone()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_example() {
        let input: Vec<String> = [
            "AUTH_KEY=x",
            "PATH=/bin",
            "TOOLGATE_FOO=1",
            "MY_TOKEN=z",
            "OK=1",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let filtered = filter_sensitive_env_vars(&input);
        assert_eq!(filtered, vec!["PATH=/bin".to_string(), "OK=1".to_string()]);
    }

    #[test]
    fn test_case_insensitive() {
        let input: Vec<String> = ["auth_key=x", "my_secret=y", "Home=/root"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let filtered = filter_sensitive_env_vars(&input);
        assert_eq!(filtered, vec!["Home=/root".to_string()]);
    }

    #[test]
    fn test_extra_vars_are_trusted() {
        let mut extra = HashMap::new();
        extra.insert("EXA_API_KEY".to_string(), "k".to_string());
        let env = get_safe_env_for_mcp(&extra);
        // The extra credential passes through even though its name would be
        // filtered from the host environment
        assert!(env.iter().any(|(n, v)| n == "EXA_API_KEY" && v == "k"));
        assert!(!env.iter().any(|(n, _)| n == "ENCRYPTION_KEY"));
    }
}
