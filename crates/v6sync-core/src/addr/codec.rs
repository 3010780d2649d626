// # IPv6 Codec
//
// Conversion between IPv6 text and the fixed 16-byte network-order form.
//
// Only plain hextet notation is accepted. Embedded IPv4 tails
// (`::ffff:1.2.3.4`) and zone identifiers (`fe80::1%eth0`) are rejected.
//
// Serialization follows the RFC 5952 compression rule: the longest run of two
// or more zero hextets becomes `::`, the earliest run wins a tie, and hextets
// are printed as lowercase hex without leading zeros.

use super::{Ipv6Bytes, SuffixBytes, SUFFIX_LEN};
use crate::error::{Error, Result};

/// Number of hextets in a full address
const HEXTETS: usize = 8;

/// The zero-run compression marker
const MARKER: &str = "::";

/// Token sequences on either side of the compression marker.
///
/// `right` is `None` when the text has no marker at all.
struct Tokens {
    left: Vec<u16>,
    right: Option<Vec<u16>>,
}

impl Tokens {
    fn explicit_hextets(&self) -> usize {
        self.left.len() + self.right.as_ref().map_or(0, Vec::len)
    }
}

/// Parse IPv6 text into its 16-byte form.
///
/// # Errors
///
/// [`Error::InvalidAddress`] for embedded IPv4 or scoped forms, more than one
/// `::`, tokens that are not 1–4 hex digits, or a hextet count other than 8.
///
/// # Example
///
/// ```
/// use v6sync_core::addr::codec;
///
/// let bytes = codec::parse("2001:db8::1").unwrap();
/// assert_eq!(&bytes[..4], &[0x20, 0x01, 0x0d, 0xb8]);
/// assert_eq!(bytes[15], 1);
/// ```
pub fn parse(text: &str) -> Result<Ipv6Bytes> {
    let tokens = split(text)?;
    let explicit = tokens.explicit_hextets();

    let mut hextets = [0u16; HEXTETS];
    match &tokens.right {
        None if explicit != HEXTETS => {
            return Err(Error::invalid_address(
                text,
                format!("expected 8 hextets, found {explicit}"),
            ));
        }
        Some(_) if explicit > HEXTETS => {
            return Err(Error::invalid_address(
                text,
                format!("{explicit} hextets do not fit in an address"),
            ));
        }
        _ => {}
    }

    hextets[..tokens.left.len()].copy_from_slice(&tokens.left);
    if let Some(right) = &tokens.right {
        hextets[HEXTETS - right.len()..].copy_from_slice(right);
    }

    let mut bytes = [0u8; 16];
    write_hextets(&mut bytes, &hextets);
    Ok(bytes)
}

/// Render 16 bytes as canonical compressed IPv6 text.
///
/// # Example
///
/// ```
/// use v6sync_core::addr::codec;
///
/// let mut bytes = [0u8; 16];
/// assert_eq!(codec::serialize(&bytes), "::");
///
/// bytes[15] = 1;
/// assert_eq!(codec::serialize(&bytes), "::1");
/// ```
pub fn serialize(bytes: &Ipv6Bytes) -> String {
    let hextets: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    match longest_zero_run(&hextets) {
        Some((start, len)) => format!(
            "{}{MARKER}{}",
            join(&hextets[..start]),
            join(&hextets[start + len..])
        ),
        None => join(&hextets),
    }
}

/// Parse a partial address (a suffix) into exactly 9 bytes.
///
/// The text is split exactly like a full address, but the zero padding
/// implied by `::` fills a 9-byte budget instead of 16. Without a marker the
/// tokens are taken as the leading bytes and the padding goes at the end.
/// Empty text yields 9 zero bytes.
///
/// # Errors
///
/// - [`Error::SuffixTooLarge`] when the explicit hextets need more than 9 bytes
/// - [`Error::InvalidAddress`] for malformed tokens (same rules as [`parse`])
///
/// # Example
///
/// ```
/// use v6sync_core::addr::codec;
///
/// assert_eq!(codec::parse_partial("::1").unwrap(), [0, 0, 0, 0, 0, 0, 0, 0, 1]);
/// assert!(codec::parse_partial("de:ad:be:ef::1").is_err());
/// ```
pub fn parse_partial(text: &str) -> Result<SuffixBytes> {
    let tokens = split(text)?;
    let needed = tokens.explicit_hextets() * 2;
    if needed > SUFFIX_LEN {
        return Err(Error::suffix_too_large(text, needed));
    }

    let mut bytes = [0u8; SUFFIX_LEN];
    write_hextets(&mut bytes[..tokens.left.len() * 2], &tokens.left);
    if let Some(right) = &tokens.right {
        write_hextets(&mut bytes[SUFFIX_LEN - right.len() * 2..], right);
    }
    Ok(bytes)
}

/// Split text around the (single) compression marker and parse each token.
fn split(text: &str) -> Result<Tokens> {
    if text.contains('.') {
        return Err(Error::invalid_address(text, "embedded IPv4 is not supported"));
    }
    if text.contains('%') {
        return Err(Error::invalid_address(text, "scoped addresses are not supported"));
    }
    if text.matches(MARKER).count() > 1 {
        return Err(Error::invalid_address(text, "more than one '::'"));
    }

    match text.split_once(MARKER) {
        Some((left, right)) => Ok(Tokens {
            left: hextets(text, left)?,
            right: Some(hextets(text, right)?),
        }),
        None => Ok(Tokens {
            left: hextets(text, text)?,
            right: None,
        }),
    }
}

/// Parse a colon-separated run of hextets. An empty run has no tokens.
fn hextets(text: &str, run: &str) -> Result<Vec<u16>> {
    if run.is_empty() {
        return Ok(Vec::new());
    }

    run.split(':')
        .map(|token| {
            let well_formed = (1..=4).contains(&token.len())
                && token.bytes().all(|b| b.is_ascii_hexdigit());
            if !well_formed {
                return Err(Error::invalid_address(
                    text,
                    format!("'{token}' is not 1-4 hex digits"),
                ));
            }
            u16::from_str_radix(token, 16)
                .map_err(|e| Error::invalid_address(text, e.to_string()))
        })
        .collect()
}

/// Write hextets big-endian into `out`, which must hold exactly two bytes per hextet.
fn write_hextets(out: &mut [u8], hextets: &[u16]) {
    for (chunk, hextet) in out.chunks_exact_mut(2).zip(hextets) {
        chunk.copy_from_slice(&hextet.to_be_bytes());
    }
}

/// Find the longest run (length >= 2) of zero hextets; earliest wins ties.
fn longest_zero_run(hextets: &[u16]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut current: Option<(usize, usize)> = None;

    for (index, &hextet) in hextets.iter().enumerate() {
        if hextet != 0 {
            current = None;
            continue;
        }

        let (start, len) = match current {
            Some((start, len)) => (start, len + 1),
            None => (index, 1),
        };
        current = Some((start, len));

        if len >= 2 && best.is_none_or(|(_, best_len)| len > best_len) {
            best = Some((start, len));
        }
    }

    best
}

fn join(hextets: &[u16]) -> String {
    hextets
        .iter()
        .map(|h| format!("{h:x}"))
        .collect::<Vec<_>>()
        .join(":")
}
