//! Static route table mapping request paths to upstream services.

use crate::config::Upstreams;

/// One upstream reachable under a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Label used in logs and the `route` metric dimension.
    pub name: &'static str,
    pub prefix: &'static str,
    pub upstream: String,
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target<'a> {
    pub route: &'a Route,
    /// Path to request on the upstream.
    pub path: String,
}

impl Target<'_> {
    /// Full upstream URL, carrying `query` when present.
    pub fn url(&self, query: Option<&str>) -> String {
        match query {
            Some(q) => format!("{}{}?{q}", self.route.upstream, self.path),
            None => format!("{}{}", self.route.upstream, self.path),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

const HEALTH_PREFIX: &str = "/health/";

impl RouteTable {
    pub fn new(upstreams: &Upstreams) -> Self {
        let route = |name, prefix, upstream: &String| Route {
            name,
            prefix,
            upstream: upstream.trim_end_matches('/').to_string(),
        };
        Self {
            routes: vec![
                route("auth", "/api/auth", &upstreams.auth),
                route("profile", "/api/profiles", &upstreams.profile),
                route("reservation", "/api/reservations", &upstreams.reservation),
                route("stall", "/api/stalls", &upstreams.stall),
                route("notification", "/api/notifications", &upstreams.notification),
            ],
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Resolves `path` to its upstream. The first matching prefix wins.
    ///
    /// A prefix matches on whole segments, so `/api/stalls` covers
    /// `/api/stalls/A1` but not `/api/stallsx`. `/health/{name}` is sent to
    /// the named service's `/health`.
    pub fn resolve(&self, path: &str) -> Option<Target<'_>> {
        if let Some(name) = path.strip_prefix(HEALTH_PREFIX) {
            let name = name.trim_end_matches('/');
            return self
                .routes
                .iter()
                .find(|r| r.name == name)
                .map(|route| Target {
                    route,
                    path: "/health".to_string(),
                });
        }

        self.routes
            .iter()
            .find(|r| matches_prefix(path, r.prefix))
            .map(|route| Target {
                route,
                path: path.to_string(),
            })
    }
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
