//! Markup sanitization for free-text request fields
//!
//! Removes `<script>` blocks, `javascript:` URLs and inline event-handler
//! prefixes (`onclick=`) from user-supplied strings, then trims them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script>").expect("valid regex"));
static JAVASCRIPT_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript:").expect("valid regex"));
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)on\w+\s*=").expect("valid regex"));

/// Sanitize one string
pub fn sanitize_text(text: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(text, "");
    let text = JAVASCRIPT_SCHEME.replace_all(&text, "");
    let text = EVENT_HANDLER.replace_all(&text, "");
    text.trim().to_string()
}

/// Sanitize every top-level string field of a JSON object in place.
///
/// Nested values and non-object documents are left untouched. Returns the
/// number of fields whose value changed.
pub fn sanitize_json_fields(value: &mut Value) -> usize {
    let Value::Object(fields) = value else {
        return 0;
    };

    let mut changed = 0;
    for field in fields.values_mut() {
        if let Value::String(text) = field {
            let clean = sanitize_text(text);
            if clean != *text {
                *text = clean;
                changed += 1;
            }
        }
    }
    changed
}
