// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! The capability matcher: `can_handle`, specificity ordering, and
//! best-match selection among candidate cap URNs.

use cb_urn::{is_wildcard_value, CapUrn, MediaUrn};

/// `true` iff `provider` can satisfy `request`.
///
/// For every tag key present in `request`, either:
/// - `provider` lacks the key and `request`'s value at that key is
///   wildcard, or
/// - `provider` has the key with the same value, or
/// - `provider`'s value at that key is wildcard.
///
/// `provider` may carry additional keys not present in `request`; they
/// never prevent a match. `in`/`out` values are compared as media URNs
/// (an empty media URN on the provider side matches any concrete media
/// URN on the request side).
#[must_use]
pub fn can_handle(provider: &CapUrn, request: &CapUrn) -> bool {
    for (key, request_value) in request.as_tagged().tags() {
        match provider.get(key) {
            None => {
                if !is_wildcard_value(key, request_value) {
                    return false;
                }
            }
            Some(provider_value) => {
                if is_wildcard_value(key, provider_value) {
                    continue;
                }
                if !values_match(key, provider_value, request_value) {
                    return false;
                }
            }
        }
    }
    true
}

fn values_match(key: &str, provider_value: &str, request_value: &str) -> bool {
    if key == "in" || key == "out" {
        if let (Ok(p), Ok(r)) = (MediaUrn::parse(provider_value), MediaUrn::parse(request_value)) {
            return p == r;
        }
    }
    provider_value == request_value
}

/// `true` iff `a` is strictly more specific than `b` by tag count.
///
/// This does not resolve ties; it is a plain specificity comparison. Use
/// [`compare_candidates`] when a total, deterministic order is needed.
#[must_use]
pub fn is_more_specific(a: &CapUrn, b: &CapUrn) -> bool {
    a.specificity() > b.specificity()
}

/// Total, deterministic ordering over candidate URNs: by specificity
/// descending, ties broken by canonical-string lexicographic order.
///
/// Returns [`std::cmp::Ordering::Less`] when `a` should sort *before* `b`
/// (i.e. `a` is considered "more specific or equal, then lexicographically
/// earlier").
#[must_use]
pub fn compare_candidates(a: &CapUrn, b: &CapUrn) -> std::cmp::Ordering {
    b.specificity()
        .cmp(&a.specificity())
        .then_with(|| a.to_string().cmp(&b.to_string()))
}

/// Select the best match for `request` among `candidates`.
///
/// Filters by [`can_handle`], then picks the most specific candidate; ties
/// are broken by original position in `candidates` (earlier wins), not by
/// canonical string — registration order is load-bearing for the registry
/// tie-break described in the spec (S2).
#[must_use]
pub fn find_best_match<'a>(candidates: &'a [CapUrn], request: &CapUrn) -> Option<&'a CapUrn> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| can_handle(c, request))
        .max_by(|(i_a, a), (i_b, b)| {
            a.specificity()
                .cmp(&b.specificity())
                .then_with(|| i_b.cmp(i_a))
        })
        .map(|(_, c)| c)
}
