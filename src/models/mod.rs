mod devices;
mod entities;
mod reports;

pub use devices::*;
pub use entities::*;
pub use reports::*;

/// NetBox interface tags that describe the port speed
pub mod speed_tag {
    use regex_lite::Regex;
    use std::sync::OnceLock;

    pub const GBPS_1: &str = "1Gbps";
    pub const NONE: &str = "None";

    /// Speed words Junos reports without a rate
    const WORDS: &[&str] = &["Auto", "Unspecified", NONE];

    /// Whether a NetBox tag carries a speed: a rate such as `100mbps`,
    /// `100 Mbps` or `80Gbps`, or one of the rateless speed words.
    pub fn is_speed(tag: &str) -> bool {
        static RATE: OnceLock<Option<Regex>> = OnceLock::new();
        WORDS.contains(&tag)
            || RATE
                .get_or_init(|| Regex::new(r"^\d+(\.\d+)?\s?[GMm]bps$").ok())
                .as_ref()
                .is_some_and(|re| re.is_match(tag))
    }
}

/// NetBox interface type values used when creating ports
pub mod interface_type {
    pub const SFP: &str = "1000base-x-sfp";
    pub const SFP_PLUS: &str = "10gbase-x-sfpp";
    pub const LAG: &str = "lag";
}
