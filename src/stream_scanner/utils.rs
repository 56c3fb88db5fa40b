//! Utilities for StreamScanner

use crate::error::{Error, Result};
use std::net::Ipv4Addr;

/// Validate a scan target
///
/// Accepts any well-formed IPv4 address except loopback and multicast.
pub fn validate_ipv4(ip: &str) -> Result<Ipv4Addr> {
    let addr: Ipv4Addr = ip
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("Invalid IPv4 address: {}", ip)))?;

    if addr.is_loopback() {
        return Err(Error::Validation(format!("Loopback address not allowed: {}", ip)));
    }
    if addr.is_multicast() {
        return Err(Error::Validation(format!("Multicast address not allowed: {}", ip)));
    }

    Ok(addr)
}

/// `user:pass@` userinfo, or empty when no user is given
pub fn userinfo(user: &str, pass: &str) -> String {
    match (user.is_empty(), pass.is_empty()) {
        (true, _) => String::new(),
        (false, true) => format!("{}@", urlencoding::encode(user)),
        (false, false) => format!(
            "{}:{}@",
            urlencoding::encode(user),
            urlencoding::encode(pass)
        ),
    }
}

/// Expand a known-source template (`{user}`, `{pass}`, `{ip}`)
pub fn expand_template(template: &str, ip: Ipv4Addr, user: &str, pass: &str) -> String {
    template
        .replace("{user}", &urlencoding::encode(user))
        .replace("{pass}", &urlencoding::encode(pass))
        .replace("{ip}", &ip.to_string())
}
