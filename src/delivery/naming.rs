//! Maildir filenames for delivered objects
//!
//! A delivered object is named `{mtime}.{name}.{host}` where `mtime` is the
//! object's last-modified time in unix seconds, `name` is the key with the
//! listing prefix removed and `host` is the first label of the local hostname.

use crate::error::{DeliveryError, Result};
use chrono::{DateTime, Utc};
use std::borrow::Cow;

/// Separator between the listing prefix and the message name in a key
pub const KEY_SEPARATOR: char = '/';

/// Characters octal-escaped in message names
const RESERVED: [char; 2] = [KEY_SEPARATOR, '\\'];

/// Short local host label used as the last filename component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity(String);

impl HostIdentity {
    /// Take the first label of a fully qualified name
    pub fn from_fqdn(fqdn: &str) -> Self {
        let short = fqdn.split('.').next().unwrap_or_default();
        Self(escape(short, &['/', ':', '\\']).into_owned())
    }

    /// Look up the machine's hostname
    pub fn local() -> std::io::Result<Self> {
        let fqdn = hostname::get()?;
        Ok(Self::from_fqdn(&fqdn.to_string_lossy()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Strip `prefix/` from a key, leaving the message name
pub fn message_name<'a>(key: &'a str, prefix: &str) -> Result<&'a str> {
    key.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| DeliveryError::InvalidKey {
            key: key.to_string(),
            prefix: prefix.to_string(),
        })
}

/// Filename an object is delivered under
pub fn maildir_filename(
    key: &str,
    prefix: &str,
    last_modified: DateTime<Utc>,
    host: &HostIdentity,
) -> Result<String> {
    let name = message_name(key, prefix)?;

    Ok(format!(
        "{}.{}.{}",
        last_modified.timestamp(),
        escape(name, &RESERVED),
        host.as_str()
    ))
}

/// Octal-escape characters that cannot appear in a single path component
fn escape<'a>(value: &'a str, reserved: &[char]) -> Cow<'a, str> {
    if !value.contains(reserved) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if reserved.contains(&c) {
            escaped.push_str(&format!("\\{:03o}", c as u32));
        } else {
            escaped.push(c);
        }
    }
    Cow::Owned(escaped)
}
