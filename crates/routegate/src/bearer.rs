//! Bearer token extraction (RFC 6750 §2.1)

use http::HeaderMap;
use http::header::AUTHORIZATION;
use routegate_auth::MalformedToken;

/// Extract the bearer token from the `Authorization` header
///
/// The scheme is matched case-insensitively. A header that is absent or blank
/// yields [`MalformedToken::Missing`]; any other shape (wrong scheme, no token,
/// trailing parts, non-ASCII bytes) yields [`MalformedToken::InvalidHeader`].
///
/// ```rust
/// use http::HeaderMap;
/// use routegate::bearer_token;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("authorization", "bearer abc.def.ghi".parse().unwrap());
/// assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
/// ```
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, MalformedToken> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Err(MalformedToken::Missing);
    };
    let value = value.to_str().map_err(|_| MalformedToken::InvalidHeader)?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (None, _, _) => Err(MalformedToken::Missing),
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(MalformedToken::InvalidHeader),
    }
}
