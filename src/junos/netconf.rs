//! Minimal NETCONF 1.0 client over an SSH subsystem.
//!
//! Everything here is blocking; callers run it inside `spawn_blocking`.

use anyhow::{anyhow, Context, Result};
use regex_lite::Regex;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::OnceLock;
use std::time::Duration;

const DELIMITER: &[u8] = b"]]>]]>";

const CLIENT_HELLO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <capabilities>
    <capability>urn:ietf:params:netconf:base:1.0</capability>
  </capabilities>
</hello>"#;

/// Keyboard-interactive prompt handler that always responds with the password
struct PasswordPrompt {
    password: String,
}

impl ssh2::KeyboardInteractivePrompt for PasswordPrompt {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.password.clone()).collect()
    }
}

/// Connection parameters for one device
#[derive(Debug, Clone)]
pub struct NetconfParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub timeout_secs: u64,
}

/// Create an SSH session and authenticate with password + keyboard-interactive.
fn ssh_connect(params: &NetconfParams) -> Result<ssh2::Session> {
    let addr = (params.host.as_str(), params.port)
        .to_socket_addrs()
        .with_context(|| format!("Cannot resolve {}", params.host))?
        .next()
        .ok_or_else(|| anyhow!("No address for {}", params.host))?;
    let timeout = Duration::from_secs(params.timeout_secs);
    let tcp = TcpStream::connect_timeout(&addr, timeout).with_context(|| format!("TCP connection to {} failed", addr))?;

    tcp.set_read_timeout(Some(timeout)).ok();
    tcp.set_write_timeout(Some(timeout)).ok();

    let mut session = ssh2::Session::new().context("Failed to create SSH session")?;
    session.set_tcp_stream(tcp);
    session.set_timeout(u32::try_from(params.timeout_secs.saturating_mul(1000)).unwrap_or(u32::MAX));
    session.handshake().context("SSH handshake failed")?;

    // Try password auth first
    match session.userauth_password(&params.user, &params.pass) {
        Ok(_) if session.authenticated() => return Ok(session),
        _ => {}
    }

    let mut prompter = PasswordPrompt {
        password: params.pass.clone(),
    };
    let _ = session.userauth_keyboard_interactive(&params.user, &mut prompter);

    if session.authenticated() {
        Ok(session)
    } else {
        Err(anyhow!("SSH authentication failed: all methods exhausted"))
    }
}

/// Largest reply accepted from a device
const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Read from `reader` until the end-of-message delimiter and return the
/// message without it.
pub(crate) fn read_message<R: Read>(reader: &mut R) -> Result<String> {
    read_message_limited(reader, MAX_MESSAGE_BYTES)
}

fn read_message_limited<R: Read>(reader: &mut R, limit: usize) -> Result<String> {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).context("NETCONF read failed")?;
        if n == 0 {
            return Err(anyhow!("NETCONF session closed by device"));
        }
        // the delimiter may straddle two reads
        let from = buf.len().saturating_sub(DELIMITER.len() - 1);
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_delimiter(&buf[from..]) {
            buf.truncate(from + pos);
            return String::from_utf8(buf).context("NETCONF reply is not UTF-8");
        }
        if buf.len() > limit {
            return Err(anyhow!("NETCONF reply exceeds {} bytes", limit));
        }
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(DELIMITER.len()).position(|w| w == DELIMITER)
}

fn pattern(cell: &'static OnceLock<Option<Regex>>, re: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(re).ok()).as_ref()
}

fn rpc_error_blocks() -> Option<&'static Regex> {
    static BLOCK: OnceLock<Option<Regex>> = OnceLock::new();
    pattern(&BLOCK, r"(?s)<rpc-error>(.*?)</rpc-error>")
}

/// An `<rpc-error>` element of a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RpcError {
    pub severity: String,
    pub message: String,
}

impl RpcError {
    /// Junos attaches warnings to replies that still carry valid data
    pub fn is_fatal(&self) -> bool {
        self.severity != "warning"
    }
}

pub(crate) fn rpc_errors(reply: &str) -> Vec<RpcError> {
    static SEVERITY: OnceLock<Option<Regex>> = OnceLock::new();
    static MESSAGE: OnceLock<Option<Regex>> = OnceLock::new();
    if !reply.contains("<rpc-error") {
        return Vec::new();
    }
    let (Some(blocks), Some(severity), Some(message)) = (
        rpc_error_blocks(),
        pattern(&SEVERITY, r"(?s)<error-severity[^>]*>(.*?)</error-severity>"),
        pattern(&MESSAGE, r"(?s)<error-message[^>]*>(.*?)</error-message>"),
    ) else {
        return Vec::new();
    };

    let capture = |re: &Regex, block: &str| {
        re.captures(block)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    };
    blocks
        .captures_iter(reply)
        .filter_map(|c| c.get(1))
        .map(|block| RpcError {
            severity: capture(severity, block.as_str()).unwrap_or_else(|| "error".to_string()),
            message: capture(message, block.as_str()).unwrap_or_else(|| "unspecified rpc-error".to_string()),
        })
        .collect()
}

/// Message of the first `<rpc-error>` with error severity, if any
pub(crate) fn rpc_error(reply: &str) -> Option<String> {
    rpc_errors(reply)
        .into_iter()
        .find(RpcError::is_fatal)
        .map(|e| e.message)
}

/// The reply with its warning elements cut out
fn without_rpc_errors(reply: &str) -> String {
    match rpc_error_blocks() {
        Some(re) => re.replace_all(reply, "").into_owned(),
        None => reply.to_string(),
    }
}

/// Body of an `<rpc-reply>` element issued with `format="json"`
pub(crate) fn reply_json(reply: &str) -> Result<serde_json::Value> {
    let start = reply
        .find("<rpc-reply")
        .and_then(|i| reply[i..].find('>').map(|j| i + j + 1))
        .ok_or_else(|| anyhow!("Missing <rpc-reply> in device response"))?;
    let end = reply
        .rfind("</rpc-reply>")
        .ok_or_else(|| anyhow!("Unterminated <rpc-reply> in device response"))?;
    if end < start {
        return Err(anyhow!("Malformed <rpc-reply> in device response"));
    }
    let body = reply[start..end].trim();
    serde_json::from_str(body).context("Device reply is not JSON")
}

/// An open NETCONF session
pub struct NetconfSession {
    _session: ssh2::Session,
    channel: ssh2::Channel,
    message_id: u64,
}

impl NetconfSession {
    pub fn connect(params: &NetconfParams) -> Result<Self> {
        let session = ssh_connect(params)?;
        let mut channel = session.channel_session().context("Failed to open channel")?;
        channel
            .subsystem("netconf")
            .context("Device refused the netconf subsystem")?;

        // Server hello first, then ours
        read_message(&mut channel)?;
        channel.write_all(CLIENT_HELLO.as_bytes())?;
        channel.write_all(DELIMITER)?;
        channel.flush()?;

        Ok(Self {
            _session: session,
            channel,
            message_id: 0,
        })
    }

    /// Send one RPC and return the raw reply
    pub fn rpc(&mut self, body: &str) -> Result<String> {
        self.message_id += 1;
        let request = format!(
            r#"<rpc message-id="{}" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">{}</rpc>"#,
            self.message_id, body
        );
        self.channel.write_all(request.as_bytes())?;
        self.channel.write_all(DELIMITER)?;
        self.channel.flush()?;

        let reply = read_message(&mut self.channel)?;
        let errors = rpc_errors(&reply);
        if errors.is_empty() {
            return Ok(reply);
        }
        if let Some(message) = rpc_error(&reply) {
            return Err(anyhow!("rpc-error: {}", message));
        }
        for warning in &errors {
            tracing::warn!("rpc-error warning from device: {}", warning.message);
        }
        Ok(without_rpc_errors(&reply))
    }

    /// Send one RPC and decode its JSON body
    pub fn rpc_json(&mut self, body: &str) -> Result<serde_json::Value> {
        let reply = self.rpc(body)?;
        reply_json(&reply)
    }

    pub fn close(mut self) {
        let _ = self.rpc("<close-session/>");
        let _ = self.channel.send_eof();
        let _ = self.channel.wait_close();
    }
}
