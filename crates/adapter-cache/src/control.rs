//! Cache-Control directive parsing.

use std::fmt;
use std::str::FromStr;

/// Directive name for stale-while-revalidate.
pub const STALE_WHILE_REVALIDATE: &str = "stale-while-revalidate";

/// A single Cache-Control directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Lowercase directive name.
    pub name: String,
    /// Directive argument, if any.
    pub value: Option<String>,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// Ordered list of Cache-Control directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    directives: Vec<Directive>,
}

impl CacheControl {
    /// Parse a header value. Empty segments are ignored; names are lowercased.
    pub fn parse(value: &str) -> Self {
        let directives = value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((name, value)) => Directive {
                    name: name.trim().to_ascii_lowercase(),
                    value: Some(value.trim().trim_matches('"').to_string()),
                },
                None => Directive {
                    name: part.to_ascii_lowercase(),
                    value: None,
                },
            })
            .collect();
        Self { directives }
    }

    /// Check whether a directive is present.
    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Look up a directive. `Some(None)` means present without a value.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.find(name).map(|d| d.value.as_deref())
    }

    /// Numeric value of a directive, when present and parseable.
    pub fn seconds(&self, name: &str) -> Option<u64> {
        self.get(name).flatten().and_then(|v| v.parse().ok())
    }

    pub fn max_age(&self) -> Option<u64> {
        self.seconds("max-age")
    }

    pub fn s_maxage(&self) -> Option<u64> {
        self.seconds("s-maxage")
    }

    /// Shared-cache lifetime: `s-maxage`, falling back to `max-age`.
    pub fn shared_max_age(&self) -> Option<u64> {
        self.s_maxage().or_else(|| self.max_age())
    }

    /// Check whether staleness is tolerated (stale-while-revalidate present).
    pub fn allows_stale(&self) -> bool {
        self.has(STALE_WHILE_REVALIDATE)
    }

    /// Set a directive, replacing it in place or appending it.
    pub fn set(&mut self, name: &str, value: Option<String>) {
        let name = name.to_ascii_lowercase();
        match self.directives.iter_mut().find(|d| d.name == name) {
            Some(directive) => directive.value = value,
            None => self.directives.push(Directive { name, value }),
        }
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    fn find(&self, name: &str) -> Option<&Directive> {
        self.directives
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CacheControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.directives.iter().map(|d| d.to_string()).collect();
        f.write_str(&parts.join(", "))
    }
}

impl FromStr for CacheControl {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
