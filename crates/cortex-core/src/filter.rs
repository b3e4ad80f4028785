//! Address-prefix access control for client-originated messages

/// Namespaces browsers may address on the engine by default
pub const DEFAULT_ALLOWED_PREFIXES: &[&str] = &[
    "/golem/",
    "/brahma/",
    "/chronos/",
    "/daemon/",
    "/moirai/",
    "/genesis/",
    "/arbor/",
    "/serpens/",
    "/scriptorium/",
];

/// True iff `address` starts with one of the `whitelist` prefixes
pub fn is_allowed<S: AsRef<str>>(address: &str, whitelist: &[S]) -> bool {
    whitelist
        .iter()
        .any(|prefix| address.starts_with(prefix.as_ref()))
}

/// Fixed whitelist of address prefixes.
///
/// An empty filter allows nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessFilter {
    prefixes: Vec<String>,
}

impl AccessFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Filter with [`DEFAULT_ALLOWED_PREFIXES`]
    pub fn standard() -> Self {
        Self::new(DEFAULT_ALLOWED_PREFIXES.iter().copied())
    }

    pub fn is_allowed(&self, address: &str) -> bool {
        is_allowed(address, &self.prefixes)
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}
