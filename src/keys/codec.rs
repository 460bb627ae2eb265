//! Reversible escape codecs for hierarchical key parts.
//!
//! A part may contain any character; before joining parts with a divider,
//! each character in the illegal set is rewritten to a two-character token
//! beginning with `$`. Two codecs exist and must stay distinct: the full
//! table escapes all seven reserved characters, the legacy field-path table
//! omits the `.` entry. Saved filters and URLs persist these encodings, so
//! the tables cannot be merged or reordered.

/// One escape table: `(illegal character, token letter)` pairs. The encoded
/// form of an illegal character is `$` followed by its token letter.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    table: &'static [(char, char)],
}

/// Full table, used by schema paths: `$ / & } ~ , .`
pub const FULL: Codec = Codec {
    table: &[
        ('$', 'D'),
        ('/', 'S'),
        ('&', 'A'),
        ('}', 'B'),
        ('~', 'T'),
        (',', 'C'),
        ('.', 'P'),
    ],
};

/// Legacy six-entry table used by field paths; `.` passes through unescaped.
pub const LEGACY_FIELD: Codec = Codec {
    table: &[
        ('$', 'D'),
        ('/', 'S'),
        ('&', 'A'),
        ('}', 'B'),
        ('~', 'T'),
        (',', 'C'),
    ],
};

impl Codec {
    fn token_for(&self, ch: char) -> Option<char> {
        self.table.iter().find(|(c, _)| *c == ch).map(|(_, t)| *t)
    }

    fn char_for(&self, token: char) -> Option<char> {
        self.table.iter().find(|(_, t)| *t == token).map(|(c, _)| *c)
    }

    pub fn is_illegal(&self, ch: char) -> bool {
        self.token_for(ch).is_some()
    }

    /// Escapes every illegal character in `part` to its two-character token.
    pub fn encode_part(&self, part: &str) -> String {
        let mut out = String::with_capacity(part.len());
        for ch in part.chars() {
            match self.token_for(ch) {
                Some(token) => {
                    out.push('$');
                    out.push(token);
                }
                None => out.push(ch),
            }
        }
        out
    }

    /// Reverses [`encode_part`]. A `$` that does not begin a recognized
    /// token is an ordinary literal character; decoding never fails.
    ///
    /// [`encode_part`]: Codec::encode_part
    pub fn decode_part(&self, part: &str) -> String {
        let mut out = String::with_capacity(part.len());
        let mut chars = part.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '$' {
                if let Some(original) = chars.peek().copied().and_then(|t| self.char_for(t)) {
                    out.push(original);
                    chars.next();
                    continue;
                }
            }
            out.push(ch);
        }
        out
    }

    /// Conservative heuristic: does `s`, split on `divider`, contain an
    /// illegal character that is not already part of a valid token?
    ///
    /// A `true` result means the string must be encoded before it can be
    /// treated as a flattened key; a `false` result does not prove the
    /// string was produced by [`encode_part`].
    ///
    /// [`encode_part`]: Codec::encode_part
    pub fn needs_encoding(&self, s: &str, divider: char) -> bool {
        for segment in s.split(divider) {
            let mut chars = segment.chars().peekable();
            while let Some(ch) = chars.next() {
                if !self.is_illegal(ch) {
                    continue;
                }
                if ch == '$' {
                    match chars.peek().copied().and_then(|t| self.char_for(t)) {
                        Some(_) => {
                            chars.next();
                            continue;
                        }
                        None => return true,
                    }
                }
                return true;
            }
        }
        false
    }
}

/// Percent-encodes `s` for URL embedding. Unreserved characters
/// (RFC 3986 section 2.3) pass through; everything else is `%XX` per byte.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*byte as char)
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
        }
    }
    out
}
