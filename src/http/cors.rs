use crate::error::{AppError, Result};

pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
pub const MAX_AGE: &str = "Access-Control-Max-Age";

const METHODS: &str = "GET, POST, OPTIONS";
const HEADERS: &str = "Content-Type, X-Requested-With, Authorization";
const MAX_AGE_SECS: &str = "3600";

/// What to send as `Access-Control-Allow-Origin` when the request origin is not allow-listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginFallback {
    Wildcard,
    Omit,
}

impl OriginFallback {
    pub(crate) fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wildcard" | "*" => Ok(OriginFallback::Wildcard),
            "omit" | "none" => Ok(OriginFallback::Omit),
            other => Err(AppError::Config(format!(
                "CORS_FALLBACK must be 'wildcard' or 'omit', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    fallback: OriginFallback,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>, fallback: OriginFallback) -> Self {
        Self { allowed_origins, fallback }
    }

    /// Exact match, or any origin when the list itself contains `*`.
    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin || o == "*")
    }

    pub fn fallback(&self) -> OriginFallback {
        self.fallback
    }

    /// Headers attached to every response, preflight or not.
    pub fn headers_for(&self, origin: Option<&str>) -> Vec<(&'static str, String)> {
        let mut headers = Vec::with_capacity(4);
        match origin.filter(|o| self.allows(o)) {
            Some(origin) => headers.push((ALLOW_ORIGIN, origin.to_string())),
            None => {
                if self.fallback == OriginFallback::Wildcard {
                    headers.push((ALLOW_ORIGIN, "*".to_string()));
                }
            }
        }
        headers.push((ALLOW_METHODS, METHODS.to_string()));
        headers.push((ALLOW_HEADERS, HEADERS.to_string()));
        headers.push((MAX_AGE, MAX_AGE_SECS.to_string()));
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(fallback: OriginFallback) -> CorsPolicy {
        CorsPolicy::new(vec!["http://localhost:5173".into()], fallback)
    }

    fn origin_header<'a>(headers: &'a [(&'static str, String)]) -> Option<&'a str> {
        headers.iter().find(|(k, _)| *k == ALLOW_ORIGIN).map(|(_, v)| v.as_str())
    }

    #[test]
    fn listed_origin_is_echoed() {
        let headers = policy(OriginFallback::Wildcard).headers_for(Some("http://localhost:5173"));
        assert_eq!(origin_header(&headers), Some("http://localhost:5173"));
    }

    #[test]
    fn unlisted_origin_falls_back() {
        let wildcard = policy(OriginFallback::Wildcard).headers_for(Some("https://evil.example"));
        assert_eq!(origin_header(&wildcard), Some("*"));

        let omitted = policy(OriginFallback::Omit).headers_for(Some("https://evil.example"));
        assert_eq!(origin_header(&omitted), None);

        let no_origin = policy(OriginFallback::Wildcard).headers_for(None);
        assert_eq!(origin_header(&no_origin), Some("*"));
    }

    #[test]
    fn star_in_allow_list_echoes_anything() {
        let policy = CorsPolicy::new(vec!["*".into()], OriginFallback::Omit);
        let headers = policy.headers_for(Some("https://app.example"));
        assert_eq!(origin_header(&headers), Some("https://app.example"));
    }

    #[test]
    fn fixed_headers_always_present() {
        let headers = policy(OriginFallback::Omit).headers_for(None);
        let names: Vec<&str> = headers.iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec![ALLOW_METHODS, ALLOW_HEADERS, MAX_AGE]);
        assert!(headers.contains(&(MAX_AGE, "3600".to_string())));
    }
}
