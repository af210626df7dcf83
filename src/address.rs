//! Sender, reply-to and recipient addresses.

use crate::error::PostageError;
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An email address with an optional display name.
///
/// PostageApp takes addresses as plain strings, so an `Address` is mostly a
/// way to build `Name <email>` strings without hand-formatting them.
///
/// # Examples
///
/// ```
/// use postageapp::Address;
///
/// let addr: Address = "ops@example.com".into();
/// assert_eq!(addr.formatted(), "ops@example.com");
///
/// let addr: Address = ("Ops Team", "ops@example.com").into();
/// assert_eq!(addr.formatted(), "Ops Team <ops@example.com>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Optional display name (e.g., "Ops Team")
    pub name: Option<String>,
    /// Email address (e.g., "ops@example.com")
    pub email: String,
}

impl Address {
    /// Create an address from a bare email without strict validation.
    ///
    /// Obviously broken input (empty, no `@`) is logged at warn level.
    pub fn new(email: impl Into<String>) -> Self {
        let email = email.into();
        warn_if_suspicious(&email);
        Self { name: None, email }
    }

    /// Create an address with a display name without strict validation.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        warn_if_suspicious(&email);
        Self {
            name: Some(name.into()),
            email,
        }
    }

    /// Parse and validate a bare email address.
    ///
    /// ```
    /// use postageapp::Address;
    ///
    /// assert!(Address::parse("user@example.com").is_ok());
    /// assert!(Address::parse("not-an-email").is_err());
    /// ```
    pub fn parse(email: &str) -> Result<Self, PostageError> {
        if !EmailAddress::is_valid(email) {
            return Err(PostageError::InvalidAddress(format!(
                "'{}' is not a valid email address",
                email
            )));
        }

        Ok(Self {
            name: None,
            email: email.to_string(),
        })
    }

    /// Parse either `email` or `Name <email>`, validating the email part.
    ///
    /// ```
    /// use postageapp::Address;
    ///
    /// let addr = Address::parse_formatted("Jane Doe <jane@example.com>").unwrap();
    /// assert_eq!(addr.name.as_deref(), Some("Jane Doe"));
    /// assert_eq!(addr.email, "jane@example.com");
    /// ```
    pub fn parse_formatted(input: &str) -> Result<Self, PostageError> {
        let input = input.trim();
        let Some(stripped) = input.strip_suffix('>') else {
            return Self::parse(input);
        };
        let Some((name, email)) = stripped.rsplit_once('<') else {
            return Err(PostageError::InvalidAddress(format!(
                "'{}' has an unbalanced '>'",
                input
            )));
        };

        let mut addr = Self::parse(email.trim())?;
        let name = name.trim().trim_matches('"').trim();
        if !name.is_empty() {
            addr.name = Some(name.to_string());
        }
        Ok(addr)
    }

    /// Format as "Name <email>" or just "email" if no name.
    pub fn formatted(&self) -> String {
        match &self.name {
            Some(name) if name.is_empty() => self.email.clone(),
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

fn warn_if_suspicious(email: &str) {
    if email.is_empty() || !email.contains('@') {
        tracing::warn!(
            email = %email,
            "Address looks invalid. Use Address::parse() for strict validation."
        );
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl From<&str> for Address {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<String> for Address {
    fn from(email: String) -> Self {
        Self::new(email)
    }
}

impl From<(&str, &str)> for Address {
    fn from((name, email): (&str, &str)) -> Self {
        Self::with_name(name, email)
    }
}

impl From<(String, String)> for Address {
    fn from((name, email): (String, String)) -> Self {
        Self::with_name(name, email)
    }
}

/// Trait for types that can be used as a sender or reply-to address.
///
/// ```rust
/// use postageapp::{Address, ToAddress};
///
/// struct Team {
///     label: String,
///     inbox: String,
/// }
///
/// impl ToAddress for Team {
///     fn to_address(&self) -> Address {
///         Address::with_name(&self.label, &self.inbox)
///     }
/// }
/// ```
pub trait ToAddress {
    fn to_address(&self) -> Address;
}

impl<T: ToAddress + ?Sized> ToAddress for &T {
    fn to_address(&self) -> Address {
        (*self).to_address()
    }
}

impl ToAddress for Address {
    fn to_address(&self) -> Address {
        self.clone()
    }
}

impl ToAddress for str {
    fn to_address(&self) -> Address {
        Address::new(self)
    }
}

impl ToAddress for String {
    fn to_address(&self) -> Address {
        Address::new(self)
    }
}

impl<N: AsRef<str>, E: AsRef<str>> ToAddress for (N, E) {
    fn to_address(&self) -> Address {
        Address::with_name(self.0.as_ref(), self.1.as_ref())
    }
}
