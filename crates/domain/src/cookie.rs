//! Cookie model and `Set-Cookie` parsing.
//!
//! Cookies are parsed one per `Set-Cookie` line and kept in header order.
//! Duplicate names are not collapsed; [`find_by_name`] returns the first
//! occurrence.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CookieParseError;

/// A single cookie received from a response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value (may be empty).
    pub value: String,
    /// `Domain` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// `Path` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Raw `Expires` attribute text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    /// `Max-Age` attribute in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    /// Secure flag.
    #[serde(default)]
    pub secure: bool,
    /// HttpOnly flag.
    #[serde(default)]
    pub http_only: bool,
    /// `SameSite` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

impl Cookie {
    /// Create a cookie with only a name and value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Set the path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set HttpOnly flag.
    #[must_use]
    pub const fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set Secure flag.
    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Parse a single `Set-Cookie` header value.
    ///
    /// The first `;`-separated segment is `name=value`. Remaining segments
    /// are attributes matched case-insensitively; unknown attributes and
    /// unparsable attribute values are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is empty, has no `=` in its first
    /// segment, or names an empty cookie.
    pub fn parse(line: &str) -> Result<Self, CookieParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CookieParseError::Empty);
        }

        let mut segments = line.split(';');
        let pair = segments.next().unwrap_or_default();
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| CookieParseError::MissingSeparator(pair.trim().to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CookieParseError::EmptyName(line.to_string()));
        }

        let mut cookie = Self::new(name, value.trim());

        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (attr, val) = match segment.split_once('=') {
                Some((attr, val)) => (attr.trim(), Some(val.trim())),
                None => (segment, None),
            };

            match (attr.to_ascii_lowercase().as_str(), val) {
                ("domain", Some(val)) => cookie.domain = Some(val.to_string()),
                ("path", Some(val)) => cookie.path = Some(val.to_string()),
                ("expires", Some(val)) => cookie.expires = Some(val.to_string()),
                ("max-age", Some(val)) => {
                    if let Ok(secs) = val.parse::<i64>() {
                        cookie.max_age = Some(secs);
                    }
                }
                ("samesite", Some(val)) => {
                    if let Some(same_site) = SameSite::parse(val) {
                        cookie.same_site = Some(same_site);
                    }
                }
                ("secure", _) => cookie.secure = true,
                ("httponly", _) => cookie.http_only = true,
                _ => {}
            }
        }

        Ok(cookie)
    }

    /// Interpret the raw `Expires` text as a UTC timestamp.
    ///
    /// Accepts RFC 2822/1123, RFC 850 and asctime layouts.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.expires.as_deref()?.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        let without_zone = raw.trim_end_matches(" GMT").trim_end_matches(" UTC");
        [
            "%a, %d-%b-%Y %H:%M:%S",
            "%A, %d-%b-%y %H:%M:%S",
            "%a %b %e %H:%M:%S %Y",
            "%a, %d %b %Y %H:%M:%S",
        ]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(without_zone, fmt).ok())
        .map(|naive| naive.and_utc())
    }

    /// Format for a `Cookie` request header.
    #[must_use]
    pub fn to_cookie_header(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// SameSite attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// Sent with all requests.
    None,
    /// Sent with top-level navigations.
    Lax,
    /// First-party context only.
    Strict,
}

impl SameSite {
    /// Case-insensitive parse; unknown values yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "lax" => Some(Self::Lax),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }

    /// Get the canonical attribute spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Lax => "Lax",
            Self::Strict => "Strict",
        }
    }
}

/// Parse every `Set-Cookie` line, skipping malformed ones.
///
/// Returns the well-formed cookies in header order together with the
/// errors for the lines that were skipped.
#[must_use]
pub fn parse_set_cookie_headers<'a, I>(lines: I) -> (Vec<Cookie>, Vec<CookieParseError>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut cookies = Vec::new();
    let mut skipped = Vec::new();
    for line in lines {
        match Cookie::parse(line) {
            Ok(cookie) => cookies.push(cookie),
            Err(err) => skipped.push(err),
        }
    }
    (cookies, skipped)
}

/// Find the first cookie with the given name.
#[must_use]
pub fn find_by_name<'a>(cookies: &'a [Cookie], name: &str) -> Option<&'a Cookie> {
    cookies.iter().find(|c| c.name == name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_session_cookie() {
        let cookie = Cookie::parse("JSESSIONID=ABC123; Path=/; HttpOnly").unwrap();
        assert_eq!(
            cookie,
            Cookie::new("JSESSIONID", "ABC123")
                .with_path("/")
                .with_http_only(true)
        );
    }

    #[test]
    fn test_parse_all_attributes() {
        let cookie = Cookie::parse(
            "sid=xyz; Domain=example.com; Path=/api; Expires=Wed, 21 Oct 2026 07:28:00 GMT; \
             Max-Age=3600; Secure; HttpOnly; SameSite=Strict",
        )
        .unwrap();

        assert_eq!(cookie.name, "sid");
        assert_eq!(cookie.value, "xyz");
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.path.as_deref(), Some("/api"));
        assert_eq!(cookie.expires.as_deref(), Some("Wed, 21 Oct 2026 07:28:00 GMT"));
        assert_eq!(cookie.max_age, Some(3600));
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site, Some(SameSite::Strict));
    }

    #[test]
    fn test_attributes_are_case_insensitive() {
        let cookie = Cookie::parse("a=1; pAtH=/x; SECURE; httponly; max-AGE=5").unwrap();
        assert_eq!(cookie.path.as_deref(), Some("/x"));
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.max_age, Some(5));
    }

    #[test]
    fn test_empty_value_allowed() {
        let cookie = Cookie::parse("deleted=; Max-Age=0").unwrap();
        assert_eq!(cookie.value, "");
        assert_eq!(cookie.max_age, Some(0));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let cookie = Cookie::parse("token=a=b==").unwrap();
        assert_eq!(cookie.value, "a=b==");
    }

    #[test]
    fn test_unknown_attributes_ignored() {
        let cookie = Cookie::parse("a=1; Priority=High; Partitioned; SameSite=Weird").unwrap();
        assert_eq!(cookie, Cookie::new("a", "1"));
    }

    #[test]
    fn test_invalid_max_age_ignored() {
        let cookie = Cookie::parse("a=1; Max-Age=soon").unwrap();
        assert_eq!(cookie.max_age, None);
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(Cookie::parse("   "), Err(CookieParseError::Empty));
        assert!(matches!(
            Cookie::parse("novalue; Path=/"),
            Err(CookieParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            Cookie::parse("=orphan"),
            Err(CookieParseError::EmptyName(_))
        ));
    }

    #[test]
    fn test_parse_headers_skips_malformed() {
        let (cookies, skipped) =
            parse_set_cookie_headers(["a=1", "garbage", "b=2; Secure"]);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "a");
        assert_eq!(cookies[1].name, "b");
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_find_by_name_first_wins() {
        let (cookies, _) = parse_set_cookie_headers(["dup=first", "other=x", "dup=second"]);
        assert_eq!(cookies.len(), 3);
        assert_eq!(find_by_name(&cookies, "dup").unwrap().value, "first");
        assert!(find_by_name(&cookies, "missing").is_none());
    }

    #[test]
    fn test_expires_at_formats() {
        let rfc1123 = Cookie::parse("a=1; Expires=Wed, 21 Oct 2026 07:28:00 GMT").unwrap();
        let at = rfc1123.expires_at().unwrap();
        assert_eq!((at.year(), at.month(), at.day()), (2026, 10, 21));
        assert_eq!(at.hour(), 7);

        let netscape = Cookie::parse("a=1; Expires=Wed, 21-Oct-2026 07:28:00 GMT").unwrap();
        assert_eq!(netscape.expires_at(), Some(at));

        let bogus = Cookie::parse("a=1; Expires=tomorrow").unwrap();
        assert_eq!(bogus.expires_at(), None);
    }

    #[test]
    fn test_cookie_header() {
        assert_eq!(Cookie::new("session", "abc123").to_cookie_header(), "session=abc123");
    }
}
