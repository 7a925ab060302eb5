//! Permission scope checks
//!
//! Scopes are matched by exact, case-sensitive string containment. There are no
//! wildcards and no hierarchy: `write:items` does not imply `read:items`.

use crate::claims::Claims;

/// Whether `claims` grants every scope in `required`
///
/// Order and duplicates on either side are irrelevant. An empty `required` list
/// always authorizes.
///
/// ```rust
/// use routegate_auth::{Claims, scope};
/// use serde_json::json;
///
/// let payload = json!({"permissions": ["read:items", "write:items"]});
/// let claims = Claims::from_payload(payload.as_object().unwrap().clone(), "permissions");
///
/// assert!(scope::authorize(&claims, &["write:items"]));
/// assert!(!scope::authorize(&claims, &["delete:items"]));
/// assert!(scope::authorize::<&str>(&claims, &[]));
/// ```
pub fn authorize<S: AsRef<str>>(claims: &Claims, required: &[S]) -> bool {
    required
        .iter()
        .all(|scope| claims.has_permission(scope.as_ref()))
}

/// The required scopes that `claims` does not grant, in `required` order
pub fn missing_scopes<'a, S: AsRef<str>>(claims: &Claims, required: &'a [S]) -> Vec<&'a str> {
    let mut missing: Vec<&str> = Vec::new();
    for scope in required {
        let scope = scope.as_ref();
        if !claims.has_permission(scope) && !missing.contains(&scope) {
            missing.push(scope);
        }
    }
    missing
}
