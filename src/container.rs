//! The compressed-patch envelope shared by C5 and C6 (spec §3
//! "Compressed patch layout"): the `~` magic line, `@<id> <content>`
//! dictionary entries, the `$` separator, and the parametric-string
//! grammar used inside rewritten command payloads.
//!
//! Shaped after a frame envelope (`frame/header.rs`: magic + variable-length
//! preamble + body) the way `SPEC_FULL.md` §1 describes.

use crate::base58;
use ahash::AHashMap;

pub const MAGIC: &str = "~";
pub const SEPARATOR: &str = "$";

/// `true` iff `patch`'s first line is the magic `~` marker (spec §8
/// testable property #4).
pub fn is_compressed(patch: &[String]) -> bool {
    patch.first().map(|l| l.as_str() == MAGIC).unwrap_or(false)
}

/// The `~` / dictionary / `$` / body structure of a compressed patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Dictionary content, in ascending-id order (entry `i` has id
    /// `encode_dictionary_id(i)`).
    pub dictionary: Vec<String>,
    pub body: Vec<String>,
}

/// Splits a compressed patch into its dictionary and body. Returns
/// `None` if `patch` isn't compressed (caller should skip decompression
/// — spec §4.6 step 1).
///
/// Tolerates legacy patches with no `$` separator (spec §4.6 step 2):
/// the first line that isn't a well-formed `@<id> <content>` entry ends
/// the dictionary, whether or not it's literally `$`.
pub fn split_envelope(patch: &[String]) -> Option<Envelope> {
    if !is_compressed(patch) {
        return None;
    }
    let mut dictionary = Vec::new();
    let mut i = 1;
    while i < patch.len() {
        let line = &patch[i];
        if line == SEPARATOR {
            i += 1;
            break;
        }
        if let Some(content) = parse_dictionary_line(line) {
            dictionary.push(content.to_string());
            i += 1;
        } else {
            break;
        }
    }
    Some(Envelope { dictionary, body: patch[i..].to_vec() })
}

/// Parses one `@<id> <content>` line, returning its content if the line
/// is addressed with the id that its position in the (so-far-collected)
/// dictionary would assign. The caller tracks position; this function
/// only validates the `@` + id-shaped prefix, since ids are assigned
/// purely by ascending position (spec §3 "addressed in ascending length
/// order").
fn parse_dictionary_line(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('@')?;
    let space = rest.find(' ')?;
    let (id, content) = rest.split_at(space);
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(&content[1..])
}

/// Renders the envelope back to wire lines.
pub fn render_envelope(dictionary: &[String], body: &[String]) -> Vec<String> {
    let mut lines = Vec::with_capacity(dictionary.len() + body.len() + 2);
    lines.push(MAGIC.to_string());
    for (i, content) in dictionary.iter().enumerate() {
        lines.push(format!("@{} {}", encode_dictionary_id(i), content));
    }
    lines.push(SEPARATOR.to_string());
    lines.extend(body.iter().cloned());
    lines
}

/// Dictionary id for position `index` (0-based): plain decimal digits
/// for the first ten entries, Base58 thereafter (spec §3, §4.5 Pass 3).
///
/// These two ranges never collide: decimal digits `0`-`9` are not valid
/// Base58 characters (the alphabet starts at `1` and never emits `0`),
/// and for `index` in `10..58` the Base58 alphabet's positions past the
/// leading nine digits are all letters, so a single-character id is
/// unambiguously either "low decimal" (length 1, `0`-`9`) or "Base58"
/// (length 1, a letter) — see [`decode_dictionary_id`].
pub fn encode_dictionary_id(index: usize) -> String {
    if index < 10 {
        index.to_string()
    } else {
        base58::encode(index as u64)
    }
}

/// Inverse of [`encode_dictionary_id`].
pub fn decode_dictionary_id(id: &str) -> Option<usize> {
    if id.len() == 1 && id.chars().next().unwrap().is_ascii_digit() {
        return id.parse().ok();
    }
    base58::decode(id).ok().map(|v| v as usize)
}

/// Tab-weighted length (spec §3, §9): each `\t` counts as 2, every other
/// character counts as 1.
pub fn tab_weighted_length(s: &str) -> usize {
    s.chars().map(|c| if c == '\t' { 2 } else { 1 }).sum()
}

/// The dictionary half of a compressed patch's envelope: ordered entries
/// plus a reverse lookup for the compressor.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<String>,
    index_of: AHashMap<String, usize>,
}

impl Dictionary {
    pub fn new(entries: Vec<String>) -> Self {
        let index_of = entries.iter().enumerate().map(|(i, e)| (e.clone(), i)).collect();
        Dictionary { entries, index_of }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn id_of(&self, content: &str) -> Option<usize> {
        self.index_of.get(content).copied()
    }

    pub fn content_of(&self, id: usize) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }
}

/// One element of a parametric string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParametricPart {
    /// A `@<id>` reference.
    Ref(usize),
    /// A `#<len> <literal>` escaped literal run. Never empty — empty
    /// literal runs are omitted entirely when rendering.
    Literal(String),
}

/// Renders a sequence of parts to the wire form. Literal runs always
/// carry their explicit tab-weighted length (spec §9, mandatory — the
/// content may contain `@`/`#`/digits that would otherwise be ambiguous).
pub fn render_parametric(parts: &[ParametricPart]) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            ParametricPart::Ref(id) => {
                out.push('@');
                out.push_str(&encode_dictionary_id(*id));
            }
            ParametricPart::Literal(lit) if !lit.is_empty() => {
                out.push('#');
                out.push_str(&base58::encode(tab_weighted_length(lit) as u64));
                out.push(' ');
                out.push_str(lit);
            }
            ParametricPart::Literal(_) => {}
        }
    }
    out
}

/// Whether `payload` is a parametric/simple string (vs. a pure literal
/// stored verbatim). Per spec §3: "An otherwise-pure literal string (no
/// `@` or `#` markers) is stored verbatim" — so the presence of a
/// leading `@` or `#` is exactly the parametric marker.
pub fn looks_parametric(payload: &str) -> bool {
    matches!(payload.chars().next(), Some('@') | Some('#'))
}

/// Parses a parametric payload into its parts, resolving `@<id>`
/// references against `dictionary` (already-decoded content, in id
/// order). Unknown ids are left as a literal `@<id>` token, per spec §7
/// "Dictionary error: ... leave the token literally in the output".
pub fn parse_parametric(payload: &str, dictionary: &[String]) -> String {
    let id_of: AHashMap<usize, &str> =
        dictionary.iter().enumerate().map(|(i, c)| (i, c.as_str())).collect();

    let chars: Vec<char> = payload.chars().collect();
    let mut out = String::new();
    let mut pos = 0usize;
    while pos < chars.len() {
        match chars[pos] {
            '@' => {
                pos += 1;
                let start = pos;
                while pos < chars.len() && chars[pos] != '@' && chars[pos] != '#' {
                    pos += 1;
                }
                let id_token: String = chars[start..pos].iter().collect();
                match decode_dictionary_id(&id_token).and_then(|id| id_of.get(&id)) {
                    Some(content) => out.push_str(content),
                    None => {
                        out.push('@');
                        out.push_str(&id_token);
                    }
                }
            }
            '#' => {
                pos += 1;
                let len_start = pos;
                while pos < chars.len() && chars[pos] != ' ' {
                    pos += 1;
                }
                let len_token: String = chars[len_start..pos].iter().collect();
                let declared_len = base58::decode(&len_token).unwrap_or(0) as usize;
                if pos < chars.len() {
                    pos += 1; // consume the single separating space
                }
                let mut consumed = 0usize;
                let content_start = pos;
                while pos < chars.len() && consumed < declared_len {
                    consumed += if chars[pos] == '\t' { 2 } else { 1 };
                    pos += 1;
                }
                out.extend(&chars[content_start..pos]);
            }
            c => {
                out.push(c);
                pos += 1;
            }
        }
    }
    out
}
