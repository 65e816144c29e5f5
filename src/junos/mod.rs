//! Juniper device access: NETCONF transport, RPC decoding and the
//! `DeviceSource` built on them.

pub mod netconf;
pub mod rpc;
pub mod source;

pub use source::JunosSource;
