//! Tenant resolution middleware: turns the `x-tenant-id` header into a
//! [`TenantContext`] attached to the request, or rejects the request before
//! any handler runs.

use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::context::TenantContext;
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

/// Header carrying the tenant identifier on every data-plane request.
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `:name` — matches any single segment.
    Param,
    /// `*` — matches the rest of the path, including nothing. Always the
    /// last segment; parsing drops anything written after it.
    Wildcard,
}

/// One exemption rule: an optional method (None matches all methods) and a
/// path pattern such as `/auth/get-tenant-id/:subdomain` or `/hospitals/*`.
#[derive(Clone, Debug)]
pub struct ExemptRule {
    method: Option<Method>,
    segments: Vec<Segment>,
}

impl ExemptRule {
    fn parse(method: Option<Method>, pattern: &str) -> Self {
        let mut segments = Vec::new();
        for s in pattern.split('/').filter(|s| !s.is_empty()) {
            if s == "*" {
                // A wildcard swallows the rest of the path, so segments
                // written after it are unreachable and dropped here.
                segments.push(Segment::Wildcard);
                break;
            } else if s.starts_with(':') {
                segments.push(Segment::Param);
            } else {
                segments.push(Segment::Literal(s.to_string()));
            }
        }
        ExemptRule { method, segments }
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        if let Some(ref m) = self.method {
            if m != method {
                return false;
            }
        }
        let mut actual = path.split('/').filter(|s| !s.is_empty());
        for segment in &self.segments {
            match segment {
                Segment::Wildcard => return true,
                Segment::Param => {
                    if actual.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(lit) => {
                    if actual.next() != Some(lit.as_str()) {
                        return false;
                    }
                }
            }
        }
        actual.next().is_none()
    }
}

/// Routes excluded from tenant resolution. Control-plane endpoints either
/// create the tenant the middleware would try to resolve (registration, the
/// slug-to-id lookup) or manage tenants above the data plane (the hospitals
/// group), so they never carry a tenant header.
#[derive(Clone, Debug, Default)]
pub struct ExemptRoutes {
    rules: Vec<ExemptRule>,
}

impl ExemptRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exempt `pattern` for one specific method.
    pub fn exempt(mut self, method: Method, pattern: &str) -> Self {
        self.rules.push(ExemptRule::parse(Some(method), pattern));
        self
    }

    /// Exempt `pattern` for all methods.
    pub fn exempt_all(mut self, pattern: &str) -> Self {
        self.rules.push(ExemptRule::parse(None, pattern));
        self
    }

    pub fn is_exempt(&self, method: &Method, path: &str) -> bool {
        self.rules.iter().any(|r| r.matches(method, path))
    }
}

/// Exemptions for the routes this application serves.
pub fn default_exemptions() -> ExemptRoutes {
    ExemptRoutes::new()
        .exempt(Method::POST, "/auth/register-hospital")
        .exempt(Method::GET, "/auth/get-tenant-id/:subdomain")
        .exempt_all("/hospitals/*")
        .exempt(Method::GET, "/health")
        .exempt(Method::GET, "/version")
}

/// Per-request gate. Exempt routes pass straight through; everything else
/// must carry a resolvable `x-tenant-id`, whose connection is attached to the
/// request as a [`TenantContext`].
pub async fn resolve_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state
        .exemptions
        .is_exempt(request.method(), request.uri().path())
    {
        return Ok(next.run(request).await);
    }

    let tenant_id = request
        .headers()
        .get(TENANT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Tenant ID is required".into()))?
        .to_string();

    let tenant = state
        .directory
        .find_by_tenant_id(&tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".into()))?;

    let conn = state.pool.get_connection(&tenant.database_uri).await?;
    request.extensions_mut().insert(TenantContext::new(conn));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_specific_rule_only_matches_that_method() {
        let routes = ExemptRoutes::new().exempt(Method::POST, "/auth/register-hospital");
        assert!(routes.is_exempt(&Method::POST, "/auth/register-hospital"));
        assert!(!routes.is_exempt(&Method::GET, "/auth/register-hospital"));
        assert!(!routes.is_exempt(&Method::POST, "/auth/register-admin"));
    }

    #[test]
    fn param_segment_matches_any_value() {
        let routes = ExemptRoutes::new().exempt(Method::GET, "/auth/get-tenant-id/:subdomain");
        assert!(routes.is_exempt(&Method::GET, "/auth/get-tenant-id/acme-general-hospital"));
        assert!(!routes.is_exempt(&Method::GET, "/auth/get-tenant-id"));
        assert!(!routes.is_exempt(&Method::GET, "/auth/get-tenant-id/a/b"));
    }

    #[test]
    fn wildcard_rule_matches_the_whole_group_for_all_methods() {
        let routes = ExemptRoutes::new().exempt_all("/hospitals/*");
        assert!(routes.is_exempt(&Method::PATCH, "/hospitals/66a1"));
        assert!(routes.is_exempt(&Method::DELETE, "/hospitals/66a1/66b2"));
        assert!(routes.is_exempt(&Method::GET, "/hospitals"));
        assert!(!routes.is_exempt(&Method::GET, "/users"));
    }

    #[test]
    fn segments_after_a_wildcard_are_dropped_at_parse_time() {
        let routes = ExemptRoutes::new().exempt(Method::GET, "/a/*/b");
        // The rule is normalized to `/a/*`.
        assert!(routes.is_exempt(&Method::GET, "/a/x/b"));
        assert!(routes.is_exempt(&Method::GET, "/a/anything"));
        assert!(routes.is_exempt(&Method::GET, "/a"));
        assert!(!routes.is_exempt(&Method::GET, "/z/x/b"));
        assert!(!routes.is_exempt(&Method::GET, "/users"));
    }

    #[test]
    fn trailing_slashes_and_empty_segments_are_ignored() {
        let routes = ExemptRoutes::new().exempt(Method::GET, "/health");
        assert!(routes.is_exempt(&Method::GET, "/health/"));
        assert!(routes.is_exempt(&Method::GET, "//health"));
    }
}
