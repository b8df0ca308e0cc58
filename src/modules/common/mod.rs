// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct Addr {
    /// The optional display name associated with the email address (e.g., "John Doe").
    /// If `None`, no display name is specified.
    pub name: Option<String>,
    /// The optional email address (e.g., "john.doe@example.com").
    /// If `None`, the address is unavailable, though typically at least one of `name` or `address` is provided.
    pub address: Option<String>,
}

impl Addr {
    pub fn parse(s: &str) -> Self {
        let re = Regex::new(r#"(?:(?P<name>.*)\s*)?<(?P<email>[^<>]+)>"#).unwrap();
        if let Some(caps) = re.captures(s) {
            let name: Option<String> = caps.name("name").map(|m| m.as_str().trim().into());
            let email: Option<String> = caps.name("email").map(|m| m.as_str().trim().into());
            Addr {
                name: name.filter(|n| !n.is_empty()),
                address: email,
            }
        } else {
            let s_trimmed = s.trim();
            Addr {
                name: None,
                address: if s_trimmed.is_empty() {
                    None
                } else {
                    Some(s_trimmed.into())
                },
            }
        }
    }

    /// The bare address lowered for comparisons against the allow-list,
    /// or an empty string when no address could be parsed.
    pub fn bare_address(&self) -> String {
        self.address
            .as_deref()
            .map(|a| a.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// The domain part of the address, empty when absent.
    pub fn domain(&self) -> String {
        let bare = self.bare_address();
        match bare.rsplit_once('@') {
            Some((_, domain)) => domain.to_string(),
            None => String::new(),
        }
    }
}

impl std::fmt::Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.name, &self.address) {
            (Some(name), Some(address)) => write!(f, "{} <{}>", name, address),
            (None, Some(address)) => write!(f, "<{}>", address),
            (Some(name), None) => write!(f, "{}", name),
            (None, None) => write!(f, ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Addr;

    #[test]
    fn parses_display_name_form() {
        let addr = Addr::parse("Marisa Doe <Marisa@oetraining.com>");
        assert_eq!(addr.name.as_deref(), Some("Marisa Doe"));
        assert_eq!(addr.bare_address(), "marisa@oetraining.com");
        assert_eq!(addr.domain(), "oetraining.com");
    }

    #[test]
    fn parses_bare_address() {
        let addr = Addr::parse("user@example.com");
        assert_eq!(addr.name, None);
        assert_eq!(addr.bare_address(), "user@example.com");
    }

    #[test]
    fn empty_input_has_no_address() {
        let addr = Addr::parse("");
        assert_eq!(addr.bare_address(), "");
        assert_eq!(addr.domain(), "");
    }
}
