//! Grammar and shape predicates for Kubernetes field values.
//!
//! Every predicate returns `bool` and treats an absent value as valid, so a
//! resource validator can run all of them and record one message per failure.
//! The `*_MSG` constants are the rule descriptions appended to a field path in
//! those messages.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::modules::{ModuleError, ModuleResult};

static ALNUM_EXT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("Invalid key regex"));

static DNS_SUBDOMAIN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9.-]+$").expect("Invalid DNS subdomain regex"));

static DNS_LABEL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("Invalid DNS label regex"));

static C_IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid C identifier regex"));

static QUANTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?[0-9.]+)([eEinumkKMGTP]*[-+]?[0-9]*)$").expect("Invalid quantity regex")
});

pub const DNS_SUBDOMAIN_MSG: &str = "should be a lowercase DNS-1123 subdomain. It must consist of \
    lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric \
    character.";

pub const DNS_SUBDOMAIN_WILDCARD_MSG: &str = "should be a DNS-1123 subdomain or wildcard DNS-1123 \
    subdomain. It starts with optional prefix '*.' followed by a valid DNS subdomain, which must \
    consist of lower case alphanumeric characters, '-' or '.' and end with an alphanumeric \
    character";

pub const DNS_LABEL_1123_MSG: &str = "should be a lowercase DNS-1123 Label Name. It must not be \
    longer then 63 characters, must consist of lower case alphanumeric characters or '-' and must \
    start and end with an alphanumeric character";

pub const DNS_LABEL_1035_MSG: &str = "should be a lowercase DNS-1135 Label Name. It must not be \
    longer then 63 characters, must consist of lower case alphanumeric characters or '-' must \
    start with alphabetic character and end with an alphanumeric character.";

/// Unqualified "DNS label" means the RFC 1123 grammar.
pub const DNS_LABEL_MSG: &str = DNS_LABEL_1123_MSG;

pub const IANA_SVC_NAME_MSG: &str = "should be a valid IANA_SVC_NAME : An alphanumeric (a-z, and \
    0-9) string, with a maximum length of 15 characters, with the '-' character allowed anywhere \
    except the first or the last character or adjacent to another '-' character, it must contain \
    at least a (a-z) character";

pub const C_IDENTIFIER_MSG: &str = "should be a a valid C_IDENTIFIER. It must start with \
    alphabetic character or '_', followed by a string of alphanumeric characters or '_'";

pub const URL_PATH_MSG: &str = "should be URL path (RFC 3986). It must start with '/', must not \
    contain '//', '/./', '/../' and must not end with '/..', '/.'";

pub const PORT_MSG: &str = "should be a valid port number, 0 < x < 65536";

pub const IP_ADDRESS_MSG: &str = "should be a valid IPv4 or IPv6 address";

pub const IPV4_ADDRESS_MSG: &str = "should be a valid IPv4 address";

pub const IPV6_ADDRESS_MSG: &str = "should be a valid IPv6 address";

pub const IP_RANGE_MSG: &str = "should be a valid IPv4 (e.g. '143.231.0.0/16') or IPv6 (e.g. \
    2001:db8:abcd:0012::0/64) IP range (CIDR block)";

fn alnum_ends(value: &str) -> bool {
    let first = value.chars().next();
    let last = value.chars().last();
    matches!((first, last), (Some(f), Some(l)) if f.is_ascii_alphanumeric() && l.is_ascii_alphanumeric())
}

/// ConfigMap and Secret keys: alphanumerics, `-`, `_` or `.`.
pub fn alnum_ext(key: &str) -> bool {
    ALNUM_EXT_REGEX.is_match(key)
}

/// DNS subdomain name (RFC 1123).
pub fn dns_subdomain(value: Option<&str>) -> bool {
    match value {
        None | Some("") => true,
        Some(v) => v.len() <= 253 && DNS_SUBDOMAIN_REGEX.is_match(v) && alnum_ends(v),
    }
}

/// DNS subdomain with an optional `*.` prefix. A bare `*` is rejected.
pub fn dns_subdomain_wildcard(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => match v.strip_prefix("*.") {
            Some(rest) => !rest.is_empty() && dns_subdomain(Some(rest)),
            None => dns_subdomain(Some(v)),
        },
    }
}

/// DNS label name (RFC 1123).
pub fn dns_label_1123(value: Option<&str>) -> bool {
    match value {
        None | Some("") => true,
        Some(v) => v.len() <= 63 && DNS_LABEL_REGEX.is_match(v) && alnum_ends(v),
    }
}

/// DNS label name (RFC 1035): an RFC 1123 label starting with a letter.
pub fn dns_label_1035(value: Option<&str>) -> bool {
    match value {
        None | Some("") => true,
        Some(v) => {
            dns_label_1123(Some(v)) && v.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        }
    }
}

/// Alias of [`dns_label_1123`].
pub fn dns_label(value: Option<&str>) -> bool {
    dns_label_1123(value)
}

/// Named port (RFC 6335 IANA_SVC_NAME).
pub fn iana_svc_name(value: Option<&str>) -> bool {
    match value {
        None | Some("") => true,
        Some(v) => {
            v.len() <= 15
                && DNS_LABEL_REGEX.is_match(v)
                && alnum_ends(v)
                && !v.contains("--")
                && v.chars().any(|c| c.is_ascii_lowercase())
        }
    }
}

/// C identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn c_identifier(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => C_IDENTIFIER_REGEX.is_match(v),
    }
}

/// Path part of a URL (RFC 3986) as accepted by Ingress rules.
pub fn url_path(path: Option<&str>) -> bool {
    const INVALID_SEQUENCES: [&str; 5] = ["//", "/./", "/../", "%2f", "%2F"];
    const INVALID_SUFFIXES: [&str; 2] = ["/..", "/."];

    let Some(path) = path else {
        return true;
    };
    path.starts_with('/')
        && !INVALID_SEQUENCES.iter().any(|seq| path.contains(seq))
        && !INVALID_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// Every value of the map is a string.
///
/// JSON object keys are always strings, so only the values need checking.
/// Anything that is present but not a map fails.
pub fn string_string_dict(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.values().all(Value::is_string),
        Some(_) => false,
    }
}

/// Every value of the map is a standard Base64 string.
pub fn string_byte_dict(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map
            .values()
            .all(|v| v.as_str().is_some_and(Base64::validate)),
        Some(_) => false,
    }
}

/// Kubernetes resource quantity, e.g. `5Gi`, `100m`, `0.1`.
pub fn quantity(value: &str) -> bool {
    QUANTITY_REGEX.is_match(value)
}

/// Every value of the map is a quantity string.
pub fn string_quantity_dict(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.values().all(|v| v.as_str().is_some_and(quantity)),
        Some(_) => false,
    }
}

/// Port number, `0 < x < 65536`.
pub fn port(value: Option<i64>) -> bool {
    match value {
        None => true,
        Some(x) => 0 < x && x < 65536,
    }
}

/// Port check over a raw definition value: absent is valid, non-integers are not.
pub fn port_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(v) => v.as_i64().is_some_and(|x| port(Some(x))),
    }
}

pub fn ip_address(address: Option<&str>) -> bool {
    address.map_or(true, |a| a.parse::<IpAddr>().is_ok())
}

pub fn ipv4_address(address: Option<&str>) -> bool {
    address.map_or(true, |a| a.parse::<Ipv4Addr>().is_ok())
}

pub fn ipv6_address(address: Option<&str>) -> bool {
    address.map_or(true, |a| a.parse::<Ipv6Addr>().is_ok())
}

/// CIDR block. Host bits may be set and a bare address counts as a full-length prefix.
/// IPv4 networks may also give the prefix as a netmask (`255.0.0.0`) or a
/// hostmask (`0.255.255.255`).
pub fn ip_range(range: Option<&str>) -> bool {
    let Some(range) = range else {
        return true;
    };
    match range.split_once('/') {
        None => range.parse::<IpAddr>().is_ok(),
        Some((address, prefix)) => {
            let Ok(address) = address.parse::<IpAddr>() else {
                return false;
            };
            if address.is_ipv4() && prefix.contains('.') {
                return prefix.parse::<Ipv4Addr>().is_ok_and(|mask| ipv4_mask(mask));
            }
            if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
                return false;
            }
            let max = if address.is_ipv4() { 32 } else { 128 };
            prefix.parse::<u8>().is_ok_and(|p| p <= max)
        }
    }
}

/// Contiguous netmask (leading ones) or hostmask (leading zeros).
fn ipv4_mask(mask: Ipv4Addr) -> bool {
    let bits = u32::from(mask);
    let contiguous = |m: u32| m.leading_ones() + m.trailing_zeros() >= 32;
    contiguous(bits) || contiguous(!bits)
}

/// Standard Base64 over ASCII text.
pub struct Base64;

impl Base64 {
    pub fn encode(message: &str) -> String {
        STANDARD.encode(message.as_bytes())
    }

    pub fn decode(message: &str) -> ModuleResult<String> {
        let bytes = STANDARD
            .decode(message.as_bytes())
            .map_err(|e| ModuleError::ParseError(format!("invalid base64: {}", e)))?;
        if !bytes.is_ascii() {
            return Err(ModuleError::ParseError(
                "base64 payload is not ASCII text".to_string(),
            ));
        }
        String::from_utf8(bytes)
            .map_err(|e| ModuleError::ParseError(format!("base64 payload is not text: {}", e)))
    }

    /// True when `message` decodes to ASCII text and re-encodes to itself.
    pub fn validate(message: &str) -> bool {
        Self::decode(message).is_ok_and(|text| Self::encode(&text) == message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alnum_ext() {
        assert!(alnum_ext("foo-bar"));
        assert!(alnum_ext("Foo.Bar-foo_bar"));
        assert!(!alnum_ext("#foo+bar"));
        assert!(!alnum_ext(""));
    }

    #[test]
    fn test_absent_is_valid() {
        assert!(dns_subdomain(None));
        assert!(dns_subdomain(Some("")));
        assert!(dns_label_1035(None));
        assert!(iana_svc_name(None));
        assert!(url_path(None));
        assert!(port(None));
        assert!(ip_range(None));
        assert!(string_string_dict(None));
    }

    #[test]
    fn test_wildcard_prefix() {
        assert!(dns_subdomain_wildcard(Some("*.foo.bar.com")));
        assert!(!dns_subdomain_wildcard(Some("*")));
        assert!(!dns_subdomain_wildcard(Some("*.")));
        assert!(!dns_subdomain_wildcard(Some("foo.*.com")));
    }

    #[test]
    fn test_url_path() {
        assert!(url_path(Some("/")));
        assert!(url_path(Some("/foo/bar")));
        assert!(!url_path(Some("foo")));
        assert!(!url_path(Some("")));
        assert!(!url_path(Some("/foo//bar")));
        assert!(!url_path(Some("/foo/./bar")));
        assert!(!url_path(Some("/foo%2Fbar")));
        assert!(!url_path(Some("/foo/..")));
        assert!(!url_path(Some("/foo/.")));
    }

    #[test]
    fn test_port_value() {
        assert!(port_value(Some(&json!(80))));
        assert!(!port_value(Some(&json!("80"))));
        assert!(!port_value(Some(&json!(0))));
        assert!(port_value(Some(&Value::Null)));
    }

    #[test]
    fn test_ip_range_without_prefix() {
        assert!(ip_range(Some("10.0.0.1")));
        assert!(ip_range(Some("10.0.0.1/8")));
        assert!(!ip_range(Some("10.0.0.1/")));
        assert!(!ip_range(Some("10.0.0.1/+8")));
    }

    #[test]
    fn test_ip_range_masks() {
        assert!(ip_range(Some("10.0.0.0/255.0.0.0")));
        assert!(ip_range(Some("10.0.0.0/0.255.255.255")));
        assert!(ip_range(Some("10.0.0.0/0.0.0.0")));
        assert!(!ip_range(Some("10.0.0.0/255.0.255.0")));
        assert!(!ip_range(Some("2001:db8::/255.0.0.0")));
    }

    #[test]
    fn test_string_dicts_reject_non_maps() {
        assert!(!string_string_dict(Some(&json!(["a"]))));
        assert!(!string_byte_dict(Some(&json!("YmFy"))));
        assert!(!string_quantity_dict(Some(&json!(5))));
    }

    #[test]
    fn test_base64_round_trip() {
        assert_eq!(Base64::encode("postgres"), "cG9zdGdyZXM=");
        assert_eq!(Base64::decode("cG9zdGdyZXM=").unwrap(), "postgres");
        assert!(Base64::decode("not-base64!").is_err());
        assert!(Base64::decode("/w==").is_err());
        assert!(!Base64::validate("/w=="));
    }
}
