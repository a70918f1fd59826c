//! Raw gateway identifier handling.
//!
//! The gateway emits chat addresses in several shapes: plain
//! (`5551234@s.whatsapp.net`), device-multiplexed (`5551234:14@s.whatsapp.net`)
//! and routed (`"A in B"`, where A is the sending device and B the chat the
//! message landed in). Everything downstream works with the canonical form:
//! device suffix stripped, one side of the routing annotation selected.

const ROUTING_SEPARATOR: &str = " in ";

/// Whether a raw identifier carries the `"A in B"` routing annotation.
pub fn is_routed(raw: &str) -> bool {
    raw.contains(ROUTING_SEPARATOR)
}

/// Strip the `:<device>` suffix from an identifier while keeping its domain,
/// e.g. `"5551234:14@s.whatsapp.net"` → `"5551234@s.whatsapp.net"`.
/// Identifiers without both `:` and `@` pass through unchanged.
pub fn cleanup(identifier: &str) -> String {
    if identifier.contains(':') && identifier.contains('@') {
        let number = identifier.split(':').next().unwrap_or(identifier);
        let suffix = identifier.rsplit('@').next().unwrap_or("");
        return format!("{}@{}", number, suffix);
    }
    identifier.to_string()
}

/// Canonical identifier for the sending side: the segment before `" in "`
/// when the routing annotation is present, the whole identifier otherwise.
pub fn from_side(raw: &str) -> String {
    if raw.trim().is_empty() {
        return raw.to_string();
    }
    if let Some((before, _)) = raw.split_once(ROUTING_SEPARATOR) {
        return cleanup(before);
    }
    cleanup(raw)
}

/// Canonical identifier for the receiving side: the segment after `" in "`,
/// falling back to the segment before it when the after-side is empty.
pub fn to_side(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    if let Some((before, after)) = raw.split_once(ROUTING_SEPARATOR) {
        let cleaned = cleanup(after);
        if !cleaned.is_empty() {
            return cleaned;
        }
        return cleanup(before);
    }
    cleanup(raw)
}

/// Digits-only phone number from any identifier shape. Strips the domain
/// suffix, any device suffix, then every non-digit character. Returns an
/// empty string on blank input — never fails.
pub fn extract_number(identifier: &str) -> String {
    if identifier.trim().is_empty() {
        return String::new();
    }
    let without_domain = identifier.split('@').next().unwrap_or(identifier);
    let without_device = without_domain.split(':').next().unwrap_or(without_domain);
    without_device.chars().filter(char::is_ascii_digit).collect()
}
