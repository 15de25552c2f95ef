//! Boundary string helpers: deterministic, pure, worth preserving
//! bit-exactly. Not delegated to an external crate, since the output
//! formats below (lower-case hex digits, `U&"..."` escaping, a specific
//! cache discipline) are exact contracts rather than "some reasonable
//! case-folding" — there is no ecosystem crate to defer to here.

use crate::error::DmlError;
use parking_lot::Mutex;
use std::sync::OnceLock;

// ---------------------------------------------------------------------
// Case mapping with a bounded short-cache
// ---------------------------------------------------------------------

const CACHE_SLOTS: usize = 256;
const MAX_CACHED_CODE_UNITS: usize = 64;

#[derive(Clone)]
struct CaseCacheEntry {
    hash: u64,
    original: String,
    mapped: String,
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

type CaseCache = Mutex<Vec<Option<CaseCacheEntry>>>;

fn upper_cache() -> &'static CaseCache {
    static CACHE: OnceLock<CaseCache> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(vec![None; CACHE_SLOTS]))
}

fn lower_cache() -> &'static CaseCache {
    static CACHE: OnceLock<CaseCache> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(vec![None; CACHE_SLOTS]))
}

fn cached_case_map(
    s: &str,
    cache: &CaseCache,
    compute: impl Fn(&str) -> String,
) -> String {
    if s.chars().count() > MAX_CACHED_CODE_UNITS {
        return compute(s);
    }

    let hash = fnv1a(s);
    let slot = (hash as usize) % CACHE_SLOTS;

    if let Some(entry) = cache.lock()[slot].as_ref()
        && entry.hash == hash
        && entry.original == s
    {
        return entry.mapped.clone();
    }

    let mapped = compute(s);
    // Last-writer-wins on slot collision; whole-cache eviction under memory
    // pressure is the caller's concern, not this per-entry slot write.
    cache.lock()[slot] = Some(CaseCacheEntry {
        hash,
        original: s.to_string(),
        mapped: mapped.clone(),
    });
    mapped
}

/// English-locale-equivalent upper-casing, short-cached for latency.
/// Cache hit/miss is unobservable — the bounded cache never changes the
/// result, only how fast it is produced.
#[must_use]
pub fn to_upper_english(s: &str) -> String {
    cached_case_map(s, upper_cache(), |s| s.to_uppercase())
}

#[must_use]
pub fn to_lower_english(s: &str) -> String {
    cached_case_map(s, lower_cache(), |s| s.to_lowercase())
}

// ---------------------------------------------------------------------
// Hex encode / decode
// ---------------------------------------------------------------------

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Odd length → `FormatError`; invalid digit → `FormatError`.
pub fn hex_decode(s: &str) -> Result<Vec<u8>, DmlError> {
    if s.len() % 2 != 0 {
        return Err(DmlError::format_error("odd-length hex string", s, s.len()));
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 2);
    let mut i = 0;
    while i < bytes.len() {
        let hi = hex_digit(bytes[i])
            .ok_or_else(|| DmlError::format_error("invalid hex digit", s, i))?;
        let lo = hex_digit(bytes[i + 1])
            .ok_or_else(|| DmlError::format_error("invalid hex digit", s, i + 1))?;
        out.push((hi << 4) | lo);
        i += 2;
    }
    Ok(out)
}

// ---------------------------------------------------------------------
// SQL identifier / literal quoting and Unicode literal decode
// ---------------------------------------------------------------------

const DEFAULT_ESCAPE: char = '\\';

fn needs_unicode_form(s: &str) -> bool {
    s.chars().any(|c| {
        let cp = c as u32;
        !(0x20..0x7F).contains(&cp)
    })
}

fn unicode_literal(s: &str, delim: char, escape: char) -> String {
    let mut out = String::from("U&");
    out.push(delim);
    for ch in s.chars() {
        let cp = ch as u32;
        if ch == escape {
            out.push(escape);
            out.push(escape);
        } else if ch == delim {
            out.push(delim);
            out.push(delim);
        } else if (0x20..0x7F).contains(&cp) {
            out.push(ch);
        } else if cp <= 0xFFFF {
            out.push_str(&format!("{escape}{cp:04x}"));
        } else {
            out.push_str(&format!("{escape}+{cp:06x}"));
        }
    }
    out.push(delim);
    out
}

fn plain_quote(s: &str, delim: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for ch in s.chars() {
        if ch == delim {
            out.push(delim);
        }
        out.push(ch);
    }
    out.push(delim);
    out
}

/// Enclose in `delim` (`"` or `'`); embedded delimiters are doubled; if any
/// code point is outside `[0x20, 0x7F)`, switch to Unicode-literal form
/// `U&"..."` with `\xxxx` for BMP code points and `\+xxxxxx` for
/// supplementary ones.
#[must_use]
pub fn quote(s: &str, delim: char) -> String {
    if needs_unicode_form(s) {
        unicode_literal(s, delim, DEFAULT_ESCAPE)
    } else {
        plain_quote(s, delim)
    }
}

#[must_use]
pub fn quote_identifier(s: &str) -> String {
    quote(s, '"')
}

#[must_use]
pub fn quote_literal(s: &str) -> String {
    quote(s, '\'')
}

fn decode_plain(inner: &str, delim: char, full: &str) -> Result<String, DmlError> {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == delim {
            if chars.peek() == Some(&delim) {
                chars.next();
                out.push(delim);
            } else {
                return Err(DmlError::format_error(
                    "unescaped delimiter inside quoted text",
                    full,
                    0,
                ));
            }
        } else {
            out.push(ch);
        }
    }
    Ok(out)
}

fn decode_unicode(inner: &str, delim: char, escape: char, full: &str) -> Result<String, DmlError> {
    let mut out = String::new();
    let chars: Vec<char> = inner.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch == escape {
            if chars.get(i + 1) == Some(&escape) {
                out.push(escape);
                i += 2;
                continue;
            }
            let (digits_len, offset) = if chars.get(i + 1) == Some(&'+') {
                (6, 2)
            } else {
                (4, 1)
            };
            let start = i + offset;
            let end = start + digits_len;
            if end > chars.len() {
                return Err(DmlError::format_error(
                    "truncated unicode escape",
                    full,
                    start,
                ));
            }
            let digits: String = chars[start..end].iter().collect();
            let cp = u32::from_str_radix(&digits, 16).map_err(|_| {
                DmlError::format_error("invalid unicode escape digit", full, start)
            })?;
            let decoded = char::from_u32(cp)
                .ok_or_else(|| DmlError::format_error("invalid code point", full, start))?;
            out.push(decoded);
            i = end;
        } else if ch == delim {
            if chars.get(i + 1) == Some(&delim) {
                out.push(delim);
                i += 2;
            } else {
                return Err(DmlError::format_error(
                    "unescaped delimiter inside quoted text",
                    full,
                    i,
                ));
            }
        } else {
            out.push(ch);
            i += 1;
        }
    }
    Ok(out)
}

/// Reverse `quote`/`unicode_literal`, auto-detecting the `U&` prefix.
pub fn unquote(quoted: &str) -> Result<String, DmlError> {
    if let Some(rest) = quoted.strip_prefix("U&") {
        let mut chars = rest.chars();
        let delim = chars
            .next()
            .ok_or_else(|| DmlError::format_error("empty unicode literal", quoted, 2))?;
        let rest2 = chars.as_str();
        let inner = rest2
            .strip_suffix(delim)
            .ok_or_else(|| DmlError::format_error("missing closing delimiter", quoted, quoted.len()))?;
        decode_unicode(inner, delim, DEFAULT_ESCAPE, quoted)
    } else {
        let mut chars = quoted.chars();
        let delim = chars
            .next()
            .ok_or_else(|| DmlError::format_error("empty quoted text", quoted, 0))?;
        let rest = chars.as_str();
        let inner = rest
            .strip_suffix(delim)
            .ok_or_else(|| DmlError::format_error("missing closing delimiter", quoted, quoted.len()))?;
        decode_plain(inner, delim, quoted)
    }
}

// ---------------------------------------------------------------------
// XML text escape
// ---------------------------------------------------------------------

/// `<`, `>`, `&`, `'` (as `&#39;`), `"` become entity refs; other characters
/// below `0x20` or above `0x7F` become `&#xHH;`.
#[must_use]
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            c if (c as u32) < 0x20 || (c as u32) > 0x7F => {
                out.push_str(&format!("&#x{:X};", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}
