//! Response classification for RobotEvents API replies
//!
//! The upstream API does not return 401 for a key it has stopped honoring.
//! A rejected or throttled key gets a 200 whose body is the HTML login
//! page, so auth failure has to be sniffed out of an apparently successful
//! response. 429 is the only honest signal and wins over any body check.

/// Markers that identify an HTML document rather than a JSON payload.
///
/// The login page is a full HTML document; genuine API responses are JSON
/// and never contain either marker.
const HTML_MARKERS: &[&str] = &["<html", "<!doctype"];

/// True when the body looks like an HTML document, whatever its content.
///
/// Used on bodies that failed JSON parsing: an HTML document in place of a
/// JSON payload means the key was redirected, even without the login word.
pub fn is_html_document(body: &str) -> bool {
    let lower = body.to_lowercase();
    HTML_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Detect the upstream login page masquerading as an API response.
///
/// The body must look like an HTML document and mention a login. Both
/// checks run on a lowercased copy, so tag and word casing do not matter.
/// A JSON body that happens to contain the word "login" is not a login
/// page.
pub fn is_login_page(body: &str) -> bool {
    let lower = body.to_lowercase();
    HTML_MARKERS.iter().any(|marker| lower.contains(marker)) && lower.contains("login")
}

/// What one HTTP exchange means for the credential that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx with a real payload. The key is healthy.
    Success,
    /// The body is the login page, whatever the status. The key must
    /// rotate out.
    AuthRejected,
    /// 429. Wait out Retry-After on the same key; no rotation.
    RateLimited,
    /// Any other failure status. Not a credential problem.
    Failed,
}

/// Classify a response by HTTP status and body.
///
/// 429 classifies as rate limited before the body is inspected. Every
/// other status dispatches to [`is_login_page`]: a login page is an auth
/// rejection whether it arrives with a 200 or an error status. What
/// remains is a plain success or a plain upstream failure.
pub fn classify_response(status: u16, body: &str) -> ResponseClass {
    match status {
        429 => ResponseClass::RateLimited,
        _ if is_login_page(body) => ResponseClass::AuthRejected,
        200..=299 => ResponseClass::Success,
        _ => ResponseClass::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_with_html_tag() {
        let body = r#"<html><head><title>Login - RobotEvents</title></head></html>"#;
        assert!(is_login_page(body));
    }

    #[test]
    fn login_page_with_doctype() {
        let body = "<!DOCTYPE html>\n<body><form action=\"/login\"></form></body>";
        assert!(is_login_page(body));
    }

    #[test]
    fn login_page_case_insensitive() {
        let body = "<HTML><BODY>PLEASE LOGIN TO CONTINUE</BODY></HTML>";
        assert!(is_login_page(body));
    }

    #[test]
    fn json_mentioning_login_is_not_a_login_page() {
        let body = r#"{"data":[],"meta":{"note":"login required for private events"}}"#;
        assert!(!is_login_page(body));
    }

    #[test]
    fn html_without_login_is_not_a_login_page() {
        let body = "<html><body>Scheduled maintenance in progress</body></html>";
        assert!(!is_login_page(body));
    }

    #[test]
    fn empty_body_is_not_a_login_page() {
        assert!(!is_login_page(""));
    }

    #[test]
    fn classify_429_rate_limited() {
        assert_eq!(
            classify_response(429, "Too Many Requests"),
            ResponseClass::RateLimited
        );
    }

    #[test]
    fn classify_429_wins_over_login_body() {
        let body = "<html><body>login</body></html>";
        assert_eq!(classify_response(429, body), ResponseClass::RateLimited);
    }

    #[test]
    fn classify_200_json_success() {
        let body = r#"{"data":[{"id":1}],"meta":{"current_page":1}}"#;
        assert_eq!(classify_response(200, body), ResponseClass::Success);
    }

    #[test]
    fn classify_200_login_page_auth_rejected() {
        let body = "<html><title>Login</title></html>";
        assert_eq!(classify_response(200, body), ResponseClass::AuthRejected);
    }

    #[test]
    fn classify_201_success() {
        assert_eq!(classify_response(201, "{}"), ResponseClass::Success);
    }

    #[test]
    fn classify_404_failed() {
        assert_eq!(classify_response(404, "Not Found"), ResponseClass::Failed);
    }

    #[test]
    fn classify_500_failed() {
        assert_eq!(
            classify_response(500, "Internal Server Error"),
            ResponseClass::Failed
        );
    }

    #[test]
    fn classify_error_status_with_login_body_auth_rejected() {
        let body = "<html><body>Please login to continue</body></html>";
        assert_eq!(classify_response(403, body), ResponseClass::AuthRejected);
    }

    #[test]
    fn html_without_login_is_a_document_but_not_a_login_page() {
        let body = "<!doctype html><body>Service unavailable</body>";
        assert!(is_html_document(body));
        assert!(!is_login_page(body));
    }

    #[test]
    fn json_is_not_an_html_document() {
        assert!(!is_html_document(r#"{"data":[]}"#));
    }
}
