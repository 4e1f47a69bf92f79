//! XMPP addresses (`node@domain/resource`).
//!
//! Parsing follows the RFC 7622 shape rules: the resource is everything
//! after the first `/`, the node everything before the first `@` of what
//! remains. Normalization here is ASCII case folding plus the length and
//! forbidden-character checks; full precis profiles are out of scope.

use std::fmt;
use std::net::Ipv6Addr;

use bitflags::bitflags;
use thiserror::Error;

const MAX_PART_LEN: usize = 1023;

/// Bytes never allowed in a localpart.
const FORBIDDEN_LOCALPART: &[u8] = b"\"&'/:<>@";

#[derive(Debug, Error)]
pub enum JidError {
    #[error("jid: empty localpart")]
    EmptyLocalpart,

    #[error("jid: localpart exceeds {MAX_PART_LEN} bytes")]
    LocalpartTooLong,

    #[error("jid: localpart contains forbidden character {0:?}")]
    ForbiddenLocalpart(char),

    #[error("jid: invalid domainpart")]
    InvalidDomain,

    #[error("jid: invalid IPv6 literal in domainpart")]
    InvalidIpv6,

    #[error("jid: empty resourcepart")]
    EmptyResource,

    #[error("jid: resourcepart exceeds {MAX_PART_LEN} bytes")]
    ResourceTooLong,

    #[error("jid: resourcepart contains '@'")]
    InvalidResource,
}

bitflags! {
    /// Which parts participate in a [`Jid::matches_with_options`] check.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MatchingOptions: u8 {
        const NODE = 1;
        const DOMAIN = 2;
        const RESOURCE = 4;
        const BARE = Self::NODE.bits() | Self::DOMAIN.bits();
        const FULL = Self::NODE.bits() | Self::DOMAIN.bits() | Self::RESOURCE.bits();
    }
}

/// An XMPP address. All parts may be empty; an empty JID renders as "".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Jid {
    node: String,
    domain: String,
    resource: String,
}

impl Jid {
    /// Build a JID from its parts, applying normalization and validation
    /// unless `skip_normalization` is set.
    pub fn new(
        node: &str,
        domain: &str,
        resource: &str,
        skip_normalization: bool,
    ) -> Result<Jid, JidError> {
        if skip_normalization {
            return Ok(Jid {
                node: node.to_string(),
                domain: domain.to_string(),
                resource: resource.to_string(),
            });
        }
        Ok(Jid {
            node: normalize_node(node)?,
            domain: normalize_domain(domain)?,
            resource: validate_resource(resource)?,
        })
    }

    /// Parse a JID string. An empty string parses to the empty JID.
    pub fn parse(s: &str, skip_normalization: bool) -> Result<Jid, JidError> {
        if s.is_empty() {
            return Ok(Jid::default());
        }
        let (rest, resource) = match s.find('/') {
            Some(slash) => {
                let resource = &s[slash + 1..];
                if resource.is_empty() {
                    return Err(JidError::EmptyResource);
                }
                (&s[..slash], resource)
            }
            None => (s, ""),
        };
        let (node, domain) = match rest.find('@') {
            Some(0) => return Err(JidError::EmptyLocalpart),
            Some(at) => (&rest[..at], &rest[at + 1..]),
            None => ("", rest),
        };
        // A trailing dot on the domain is dropped before validation.
        let domain = domain.strip_suffix('.').unwrap_or(domain);
        Jid::new(node, domain, resource, skip_normalization)
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The bare form: same node and domain, no resource.
    pub fn to_bare(&self) -> Jid {
        Jid {
            node: self.node.clone(),
            domain: self.domain.clone(),
            resource: String::new(),
        }
    }

    /// A domain-only JID.
    pub fn is_server(&self) -> bool {
        self.node.is_empty() && self.resource.is_empty() && !self.domain.is_empty()
    }

    /// Node and domain, no resource.
    pub fn is_bare(&self) -> bool {
        !self.node.is_empty() && !self.domain.is_empty() && self.resource.is_empty()
    }

    /// Domain and resource present, node optional.
    pub fn is_full(&self) -> bool {
        !self.domain.is_empty() && !self.resource.is_empty()
    }

    pub fn is_full_with_user(&self) -> bool {
        !self.node.is_empty() && self.is_full()
    }

    pub fn is_full_with_server(&self) -> bool {
        self.node.is_empty() && self.is_full()
    }

    /// Full equality: node, domain and resource all match.
    pub fn matches(&self, other: &Jid) -> bool {
        self.matches_with_options(other, MatchingOptions::FULL)
    }

    pub fn matches_with_options(&self, other: &Jid, options: MatchingOptions) -> bool {
        if options.contains(MatchingOptions::NODE) && self.node != other.node {
            return false;
        }
        if options.contains(MatchingOptions::DOMAIN) && self.domain != other.domain {
            return false;
        }
        if options.contains(MatchingOptions::RESOURCE) && self.resource != other.resource {
            return false;
        }
        true
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.node.is_empty() {
            write!(f, "{}@", self.node)?;
        }
        f.write_str(&self.domain)?;
        if !self.resource.is_empty() {
            write!(f, "/{}", self.resource)?;
        }
        Ok(())
    }
}

fn normalize_node(node: &str) -> Result<String, JidError> {
    if node.is_empty() {
        return Ok(String::new());
    }
    if node.len() > MAX_PART_LEN {
        return Err(JidError::LocalpartTooLong);
    }
    for b in node.bytes() {
        if FORBIDDEN_LOCALPART.contains(&b) {
            return Err(JidError::ForbiddenLocalpart(b as char));
        }
    }
    Ok(node.to_ascii_lowercase())
}

fn normalize_domain(domain: &str) -> Result<String, JidError> {
    if domain.is_empty() || domain.len() > MAX_PART_LEN {
        return Err(JidError::InvalidDomain);
    }
    // Bracketed IPv6 literals must parse, and must actually be IPv6.
    if let Some(inner) = domain
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        let addr: Ipv6Addr = inner.parse().map_err(|_| JidError::InvalidIpv6)?;
        if addr.to_ipv4().is_some() {
            return Err(JidError::InvalidIpv6);
        }
        return Ok(domain.to_ascii_lowercase());
    }
    Ok(domain.to_ascii_lowercase())
}

fn validate_resource(resource: &str) -> Result<String, JidError> {
    if resource.len() > MAX_PART_LEN {
        return Err(JidError::ResourceTooLong);
    }
    if resource.contains('@') {
        return Err(JidError::InvalidResource);
    }
    Ok(resource.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_jid() {
        let jid = Jid::parse("ortuman@jackal.im/balcony", false).unwrap();
        assert_eq!(jid.node(), "ortuman");
        assert_eq!(jid.domain(), "jackal.im");
        assert_eq!(jid.resource(), "balcony");
        assert!(jid.is_full_with_user());
        assert_eq!(jid.to_string(), "ortuman@jackal.im/balcony");
    }

    #[test]
    fn parses_server_and_bare_forms() {
        let server = Jid::parse("jackal.im", false).unwrap();
        assert!(server.is_server());
        let bare = Jid::parse("ortuman@jackal.im", false).unwrap();
        assert!(bare.is_bare());
        let full_server = Jid::parse("jackal.im/stream", false).unwrap();
        assert!(full_server.is_full_with_server());
    }

    #[test]
    fn empty_string_is_the_empty_jid() {
        let jid = Jid::parse("", false).unwrap();
        assert_eq!(jid, Jid::default());
        assert_eq!(jid.to_string(), "");
    }

    #[test]
    fn case_folds_node_and_domain_only() {
        let jid = Jid::parse("Ortuman@Jackal.IM/Balcony", false).unwrap();
        assert_eq!(jid.to_string(), "ortuman@jackal.im/Balcony");
    }

    #[test]
    fn trailing_domain_dot_is_stripped() {
        let jid = Jid::parse("ortuman@jackal.im.", false).unwrap();
        assert_eq!(jid.domain(), "jackal.im");
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(
            Jid::parse("@jackal.im", false),
            Err(JidError::EmptyLocalpart)
        ));
        assert!(matches!(
            Jid::parse("ortuman@jackal.im/", false),
            Err(JidError::EmptyResource)
        ));
        assert!(matches!(
            Jid::parse("ort:uman@jackal.im", false),
            Err(JidError::ForbiddenLocalpart(_))
        ));
        assert!(matches!(
            Jid::parse("user@jackal.im/res@ource", false),
            Err(JidError::InvalidResource)
        ));
    }

    #[test]
    fn bracketed_ipv6_domains() {
        assert!(Jid::parse("user@[2001:db8::1]", false).is_ok());
        assert!(matches!(
            Jid::parse("user@[not-an-address]", false),
            Err(JidError::InvalidIpv6)
        ));
        assert!(matches!(
            Jid::parse("user@[::ffff:192.0.2.1]", false),
            Err(JidError::InvalidIpv6)
        ));
    }

    #[test]
    fn skip_normalization_keeps_input_verbatim() {
        let jid = Jid::parse("Ortuman@Jackal.IM", true).unwrap();
        assert_eq!(jid.node(), "Ortuman");
        assert_eq!(jid.domain(), "Jackal.IM");
    }

    #[test]
    fn matching_options() {
        let a = Jid::parse("ortuman@jackal.im/balcony", false).unwrap();
        let b = Jid::parse("ortuman@jackal.im/yard", false).unwrap();
        assert!(a.matches_with_options(&b, MatchingOptions::BARE));
        assert!(!a.matches(&b));
        assert!(a.matches(&a.clone()));
    }
}
