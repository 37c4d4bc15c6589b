// src/errors.rs

use ethers::providers::ProviderError;
use thiserror::Error;

/// Error taxonomy shared by every tool and resource handler.
///
/// Validation and not-found messages are user-visible verbatim; upstream
/// messages pass through [`sanitize_upstream`] before leaving the server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream RPC error: {0}")]
    Upstream(String),

    #[error("logic error: {0}")]
    Logic(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl ServerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ServerError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ServerError::NotFound(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        ServerError::Upstream(sanitize_upstream(&msg.into()))
    }

    pub fn logic(msg: impl Into<String>) -> Self {
        ServerError::Logic(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        ServerError::Unsupported(msg.into())
    }
}

impl From<ProviderError> for ServerError {
    fn from(err: ProviderError) -> Self {
        ServerError::upstream(err.to_string())
    }
}

/// Strip credential-bearing material from an upstream error message before
/// it reaches a client: query strings on embedded URLs and bearer tokens.
pub fn sanitize_upstream(msg: &str) -> String {
    let mut out = String::with_capacity(msg.len());
    let mut rest = msg;
    while let Some(pos) = rest.find("http") {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);
        let end = tail
            .find(|c: char| c.is_whitespace() || c == '"' || c == '\'')
            .unwrap_or(tail.len());
        let (url, after) = tail.split_at(end);
        match url.split_once('?') {
            Some((base, _)) => out.push_str(base),
            None => out.push_str(url),
        }
        rest = after;
    }
    out.push_str(rest);

    // Bearer <token> -> Bearer [redacted]
    let mut sanitized = String::with_capacity(out.len());
    let mut remaining = out.as_str();
    while let Some(pos) = remaining.find("Bearer ") {
        let (head, tail) = remaining.split_at(pos + "Bearer ".len());
        sanitized.push_str(head);
        sanitized.push_str("[redacted]");
        remaining = tail
            .find(|c: char| c.is_whitespace())
            .map(|i| &tail[i..])
            .unwrap_or("");
    }
    sanitized.push_str(remaining);
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_url_query_strings() {
        let msg = "request to https://rpc.example.com/v1?apikey=secret123 failed";
        let clean = sanitize_upstream(msg);
        assert!(clean.contains("https://rpc.example.com/v1"));
        assert!(!clean.contains("secret123"));
    }

    #[test]
    fn sanitize_redacts_bearer_tokens() {
        let msg = "401 Unauthorized: Bearer eyJhbGciOi rejected";
        let clean = sanitize_upstream(msg);
        assert!(!clean.contains("eyJhbGciOi"));
        assert!(clean.contains("Bearer [redacted]"));
    }

    #[test]
    fn sanitize_leaves_plain_messages_alone() {
        let msg = "connection refused";
        assert_eq!(sanitize_upstream(msg), msg);
    }
}
