//! Fuzz target for the field grammar predicates.
//!
//! Every predicate must return for any input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sodalite_k8s::modules::k8s::marshalling::IntOrString;
use sodalite_k8s::modules::k8s::validators::{self, Base64};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let _ = validators::alnum_ext(input);
    let _ = validators::dns_subdomain(Some(input));
    let _ = validators::dns_subdomain_wildcard(Some(input));
    let _ = validators::dns_label_1123(Some(input));
    let _ = validators::dns_label_1035(Some(input));
    let _ = validators::iana_svc_name(Some(input));
    let _ = validators::c_identifier(Some(input));
    let _ = validators::url_path(Some(input));
    let _ = validators::quantity(input);
    let _ = validators::ip_address(Some(input));
    let _ = validators::ip_range(Some(input));
    let _ = IntOrString::unmarshal(Some(input));

    if Base64::validate(input) {
        // A canonical encoding re-encodes to itself.
        if let Ok(text) = Base64::decode(input) {
            assert_eq!(Base64::encode(&text), input);
        }
    }
});
