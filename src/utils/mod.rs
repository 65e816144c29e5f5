use ipnet::{Ipv4AddrRange, Ipv4Net};
use std::collections::BTreeMap;

/// Shortest prefix length `expand_public_prefixes` will enumerate
pub const MIN_EXPANDED_PREFIX_LEN: u8 = 16;

/// Validate a hostname.
/// Allows alphanumeric, hyphens, dots, and underscores. No path separators or shell metacharacters.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

/// Validate a site slug (e.g. "ch3", "ny5")
pub fn is_valid_site(site: &str) -> bool {
    !site.is_empty()
        && site.len() <= 50
        && site.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// NetBox slug for a software version, e.g. "17.3R3.10" -> "17-3R3-10"
pub fn platform_slug(version: &str) -> String {
    version
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' })
        .collect()
}

/// Expand every prefix into its individual addresses, each keyed as
/// "address/parent-mask" and carrying the parent's description.
///
/// All addresses of the range are produced, network and broadcast included.
/// Prefixes that fail to parse, have host bits set or are shorter than
/// `MIN_EXPANDED_PREFIX_LEN` are skipped with a warning.
pub fn expand_public_prefixes(prefixes: &BTreeMap<String, Option<String>>) -> BTreeMap<String, Option<String>> {
    let mut expanded = BTreeMap::new();

    for (prefix, description) in prefixes {
        let net: Ipv4Net = match prefix.trim().parse() {
            Ok(net) => net,
            Err(e) => {
                tracing::warn!("Skipping public prefix '{}': {}", prefix, e);
                continue;
            }
        };
        if net.trunc() != net {
            tracing::warn!("Skipping public prefix '{}': host bits set", prefix);
            continue;
        }
        if net.prefix_len() < MIN_EXPANDED_PREFIX_LEN {
            tracing::warn!("Skipping public prefix '{}': shorter than /{}", prefix, MIN_EXPANDED_PREFIX_LEN);
            continue;
        }

        for addr in Ipv4AddrRange::new(net.network(), net.broadcast()) {
            expanded.insert(format!("{}/{}", addr, net.prefix_len()), description.clone());
        }
    }

    expanded
}
