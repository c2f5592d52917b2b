use crate::session::Role;

/// Access level of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Role(Role),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
}

#[derive(Debug, Clone)]
struct Route {
    pattern: String,
    segments: Vec<Segment>,
    /// Pattern ended in `/*`.
    prefix: bool,
    access: Access,
}

impl Route {
    fn parse(pattern: &str, access: Access) -> Self {
        let (body, prefix) = match pattern.strip_suffix("/*") {
            Some(body) => (body, true),
            None => (pattern, false),
        };
        let segments = split(body)
            .map(|s| {
                if s.starts_with(':') {
                    Segment::Param
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self {
            pattern: pattern.to_string(),
            segments,
            prefix,
            access,
        }
    }

    fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = split(path).collect();
        if parts.len() < self.segments.len() || (!self.prefix && parts.len() > self.segments.len())
        {
            return false;
        }
        self.segments
            .iter()
            .zip(&parts)
            .all(|(segment, part)| match segment {
                Segment::Param => true,
                Segment::Literal(literal) => literal == part,
            })
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Path patterns and their access levels.
///
/// Patterns use `:name` for one segment and a trailing `/*` for any suffix.
/// The first matching route wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[must_use]
    pub fn empty() -> Self {
        Self { routes: Vec::new() }
    }

    #[must_use]
    pub fn route(mut self, pattern: &str, access: Access) -> Self {
        self.routes.push(Route::parse(pattern, access));
        self
    }

    /// Access level for `path`. Query string and fragment are ignored.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<Access> {
        self.matching(path).map(|route| route.access)
    }

    /// Pattern that matched `path`.
    #[must_use]
    pub fn pattern_for(&self, path: &str) -> Option<&str> {
        self.matching(path).map(|route| route.pattern.as_str())
    }

    fn matching(&self, path: &str) -> Option<&Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        self.routes.iter().find(|route| route.matches(path))
    }
}

impl Default for RouteTable {
    /// The booking front end's routes.
    fn default() -> Self {
        Self::empty()
            .route("/", Access::Public)
            .route("/login", Access::Public)
            .route("/register", Access::Public)
            .route("/forgot-password", Access::Public)
            .route("/payment/*", Access::Public)
            .route("/flights", Access::Authenticated)
            .route("/flights/:flightId/seats", Access::Authenticated)
            .route("/profile", Access::Authenticated)
            .route("/bookings", Access::Authenticated)
            .route("/booking-confirmation/:bookingId", Access::Authenticated)
            .route("/admin/*", Access::Role(Role::Admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routes() {
        let table = RouteTable::default();
        assert_eq!(table.resolve("/"), Some(Access::Public));
        assert_eq!(table.resolve("/payment/result/17"), Some(Access::Public));
        assert_eq!(table.resolve("/flights"), Some(Access::Authenticated));
        assert_eq!(table.resolve("/flights/9/seats"), Some(Access::Authenticated));
        assert_eq!(
            table.resolve("/booking-confirmation/55?paid=1"),
            Some(Access::Authenticated)
        );
        assert_eq!(table.resolve("/admin"), Some(Access::Role(Role::Admin)));
        assert_eq!(
            table.resolve("/admin/reports/revenue"),
            Some(Access::Role(Role::Admin))
        );
    }

    #[test]
    fn test_unknown_paths() {
        let table = RouteTable::default();
        assert_eq!(table.resolve("/flights/9"), None);
        assert_eq!(table.resolve("/nowhere"), None);
        assert_eq!(table.pattern_for("/flights/9/seats"), Some("/flights/:flightId/seats"));
    }
}
