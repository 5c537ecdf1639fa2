use reqwest::Url;
use serde_json::Value;

/// Joins a base URL and an absolute path without doubling the separator.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// POLi is inconsistent about whether codes are numbers or strings. Both are rendered as plain text.
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Extracts the gateway session token from a `NavigateURL`. POLi echoes this token back on the return URL and in
/// nudge notifications.
pub fn navigate_url_token(navigate_url: &str) -> Option<String> {
    let url = Url::parse(navigate_url).ok()?;
    let token = url.query_pairs().find(|(k, _)| k.eq_ignore_ascii_case("token")).map(|(_, v)| v.into_owned());
    token
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn urls() {
        assert_eq!(join_url("https://a.com/", "/api/v2"), "https://a.com/api/v2");
        assert_eq!(join_url("https://a.com", "api/v2"), "https://a.com/api/v2");
    }

    #[test]
    fn tokens_from_navigate_url() {
        let url = "https://txn.apac.paywithpoli.com/?Token=uL2a7tbJ2y%2b2IVzBX3BqJlEwgiZzOX7A";
        assert_eq!(navigate_url_token(url).as_deref(), Some("uL2a7tbJ2y+2IVzBX3BqJlEwgiZzOX7A"));
        assert_eq!(navigate_url_token("https://pay/x"), None);
        assert_eq!(navigate_url_token("not a url"), None);
    }

    #[test]
    fn text_values() {
        assert_eq!(value_as_text(&json!("E1")), Some("E1".to_string()));
        assert_eq!(value_as_text(&json!(14050)), Some("14050".to_string()));
        assert_eq!(value_as_text(&Value::Null), None);
    }
}
