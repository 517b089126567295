//! Service naming rules

use toolgate_core::GatewayError;
use toolgate_storage::ServiceRepository;

/// Suffix attempts before falling back to a timestamp
const MAX_SUFFIX: u32 = 100;

/// Find a free variant of `base`: `base`, `base-2`, … `base-100`, and as
/// the last resort `base-{nano_ts_mod_1e6}`. Never errors on collisions.
pub async fn unique_service_name(
    services: &ServiceRepository,
    base: &str,
) -> Result<String, GatewayError> {
    if !services.name_exists(base).await? {
        return Ok(base.to_string());
    }
    for suffix in 2..=MAX_SUFFIX {
        let candidate = format!("{}-{}", base, suffix);
        if !services.name_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64 + d.as_secs() * 1_000_000_000)
        .unwrap_or(0);
    Ok(format!("{}-{}", base, nanos % 1_000_000))
}

/// Sanitise an imported server name into a valid short name: every run of
/// disallowed characters becomes one `-`, and a name that does not start
/// with a letter gets an `mcp-` prefix.
pub fn sanitize_import_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        } else {
            last_dash = true;
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() {
        return "mcp-server".to_string();
    }
    if !out.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return format!("mcp-{}", out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_import_name("My Server"), "My-Server");
        assert_eq!(sanitize_import_name("a//b..c"), "a-b-c");
        assert_eq!(sanitize_import_name("clean_name"), "clean_name");
    }

    #[test]
    fn test_sanitize_collapses_runs() {
        assert_eq!(sanitize_import_name("a  -  b"), "a-b");
        assert_eq!(sanitize_import_name("x---y"), "x-y");
    }

    #[test]
    fn test_sanitize_non_letter_lead() {
        assert_eq!(sanitize_import_name("9lives"), "mcp-9lives");
        assert_eq!(sanitize_import_name("@scope/pkg"), "scope-pkg");
        assert_eq!(sanitize_import_name("***"), "mcp-server");
    }
}
