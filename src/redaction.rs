use once_cell::sync::Lazy;
use regex::Regex;

static CREDENTIAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(key|api_key|access_token|token|sig)=([^&\s]+)").expect("valid regex"),
        Regex::new(r"(?i)\b(bearer)\s+([A-Za-z0-9_\-\.~\+/]+=*)").expect("valid regex"),
        Regex::new(r"\b(AIza)[0-9A-Za-z_\-]{35}\b").expect("valid regex"),
    ]
});

pub fn redact(input: &str) -> String {
    let mut result = input.to_string();
    for pattern in CREDENTIAL_PATTERNS.iter() {
        if !pattern.is_match(&result) {
            continue;
        }
        result = pattern
            .replace_all(&result, |caps: &regex::Captures<'_>| {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or("secret");
                if name.eq_ignore_ascii_case("bearer") {
                    format!("{name} [REDACTED]")
                } else if name == "AIza" {
                    "[REDACTED_API_KEY]".to_string()
                } else {
                    format!("{name}=[REDACTED]")
                }
            })
            .to_string();
    }
    result
}
