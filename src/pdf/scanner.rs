//! Pattern-based text recovery straight from PDF bytes.
//!
//! No PDF parser is involved: the scanner looks for text-showing operands,
//! uncompressed content streams, loose string literals, object streams and
//! ToUnicode CMaps, pools everything that decodes to printable text, and
//! scrubs the leftovers of PDF syntax. It always produces a string.

use regex::Regex;
use regex::bytes::Regex as BytesRegex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Returned when the document was readable but yielded almost no text.
pub const LIMITED_PLACEHOLDER: &str = "[PDF content available but text extraction was limited]";
/// Returned by the scanner-only extractor when the document could not be fetched.
pub const FAILED_PLACEHOLDER: &str = "[PDF content extraction failed]";

const MAX_OUTPUT_CHARS: usize = 500_000;
const MIN_USEFUL_CHARS: usize = 50;
const STREAM_SAMPLE_LEN: usize = 1000;
const STREAM_HEADER_LOOKBACK: usize = 512;
const MIN_STREAM_PRINTABLE: f64 = 0.30;
const MIN_PRINTABLE_RATIO: f64 = 0.80;
const MIN_ALNUM_RATIO: f64 = 0.30;

const SKIPPED_FILTERS: [&[u8]; 8] = [
    b"/DCTDecode",
    b"/FlateDecode",
    b"/LZWDecode",
    b"/ASCII85Decode",
    b"/ASCIIHexDecode",
    b"/JPXDecode",
    b"/CCITTFaxDecode",
    b"/JBIG2Decode",
];

const SYNTAX_TOKENS: [&str; 18] = [
    "endobj",
    "endstream",
    "startxref",
    "xref",
    "trailer",
    "obj",
    "BT",
    "ET",
    "Tf",
    "Td",
    "TD",
    "Tm",
    "Tj",
    "TJ",
    "T*",
    "g",
    "rg",
    "RG",
];

static TEXT_BLOCK: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"(?s-u)\bBT\b(.*?)\bET\b").unwrap());

static CONTENT_STREAM: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"(?s-u)\bstream\r?\n(.*?)\bendstream\b").unwrap());

static OBJECT_STREAM: LazyLock<BytesRegex> = LazyLock::new(|| {
    BytesRegex::new(r"(?s-u)\d+\s+\d+\s+obj\s*(<<.*?>>)\s*stream\r?\n(.*?)\bendstream\b").unwrap()
});

static TO_UNICODE: LazyLock<BytesRegex> = LazyLock::new(|| {
    BytesRegex::new(r"(?s-u)/ToUnicode\s*<<.*?>>\s*stream(.*?)\bendstream\b").unwrap()
});

static BFCHAR_BLOCK: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"(?s-u)beginbfchar(.*?)endbfchar").unwrap());

static BFCHAR_PAIR: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"(?-u)<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>").unwrap());

static LITERAL: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"(?s-u)\(((?:[^()\\]|\\.)+)\)").unwrap());

static LITERAL_ANY: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"(?s-u)\(((?:[^()\\]|\\.)*)\)").unwrap());

static LITERAL_LONG: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"(?s-u)\(([^()]{10,})\)").unwrap());

static LITERAL_PERMISSIVE: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"(?s-u)\(((?:[^()\\]|\\.){3,})\)").unwrap());

static HEX: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"(?-u)<([0-9A-Fa-f\s]+)>").unwrap());

static HEX_PERMISSIVE: LazyLock<BytesRegex> =
    LazyLock::new(|| BytesRegex::new(r"(?-u)<([0-9A-Fa-f]{6,})>").unwrap());

static METADATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)adobe|pdf|acrobat|uuid:|\d+\s+\d+\s+obj|endobj|xref|trailer|%%EOF").unwrap()
});

static CID_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(cid:\d+\)").unwrap());

static NUMERIC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?(?:\d+\.?\d*|\.\d+)$").unwrap());

static NAME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[A-Za-z][A-Za-z0-9+]*$").unwrap());

static HYPHEN_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w)- (\w)").unwrap());

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\. ([A-Z])").unwrap());

/// Scans raw PDF bytes for text. Never fails; falls back to
/// [`LIMITED_PLACEHOLDER`] when nothing useful is found.
pub fn scan(pdf: &[u8]) -> String {
    let mut pool = Pool::default();
    scan_text_blocks(pdf, &mut pool);
    scan_content_streams(pdf, &mut pool);
    scan_standalone_strings(pdf, &mut pool);
    scan_object_streams(pdf, &mut pool);
    scan_cmaps(pdf, &mut pool);

    let pooled = pool.len();
    let text = clean_text(&pool.join());
    if text.chars().count() >= MIN_USEFUL_CHARS {
        debug!(pooled, chars = text.len(), "byte scan recovered text");
        return truncate_chars(text, MAX_OUTPUT_CHARS);
    }

    let permissive = clean_text(&extract_all_possible_text(pdf));
    if permissive.chars().count() >= MIN_USEFUL_CHARS {
        debug!(pooled, "byte scan needed the permissive pass");
        return truncate_chars(permissive, MAX_OUTPUT_CHARS);
    }

    debug!(pooled, "byte scan found no usable text");
    LIMITED_PLACEHOLDER.to_string()
}

/// Insertion-ordered, de-duplicated candidate strings.
#[derive(Default)]
struct Pool {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl Pool {
    fn push(&mut self, candidate: String) {
        let trimmed = candidate.trim();
        if trimmed.chars().count() <= 1 || self.seen.contains(trimmed) {
            return;
        }
        self.seen.insert(trimmed.to_string());
        self.items.push(trimmed.to_string());
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn join(&self) -> String {
        self.items.join(" ")
    }
}

fn scan_text_blocks(pdf: &[u8], pool: &mut Pool) {
    for caps in TEXT_BLOCK.captures_iter(pdf) {
        if let Some(block) = caps.get(1) {
            collect_strings(block.as_bytes(), &LITERAL, pool);
        }
    }
}

fn scan_content_streams(pdf: &[u8], pool: &mut Pool) {
    for caps in CONTENT_STREAM.captures_iter(pdf) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let header = stream_header(pdf, whole.start());
        if stream_is_textual(header, body.as_bytes()) {
            collect_strings(body.as_bytes(), &LITERAL, pool);
        }
    }
}

fn scan_standalone_strings(pdf: &[u8], pool: &mut Pool) {
    for caps in LITERAL_LONG.captures_iter(pdf) {
        let Some(raw) = caps.get(1) else { continue };
        let text = decode_literal(raw.as_bytes());
        if looks_like_text(&text) && !METADATA.is_match(&text) {
            pool.push(text);
        }
    }
}

fn scan_object_streams(pdf: &[u8], pool: &mut Pool) {
    for caps in OBJECT_STREAM.captures_iter(pdf) {
        let (Some(dict), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if declares_skipped_filter(dict.as_bytes()) {
            continue;
        }
        collect_strings(body.as_bytes(), &LITERAL_ANY, pool);
    }
}

fn scan_cmaps(pdf: &[u8], pool: &mut Pool) {
    for text in cmap_strings(pdf) {
        if is_acceptable(&text) {
            pool.push(text);
        }
    }
}

/// Unicode targets of every `beginbfchar` mapping inside ToUnicode streams,
/// one string per mapping block.
fn cmap_strings(pdf: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    for stream in TO_UNICODE.captures_iter(pdf) {
        let Some(body) = stream.get(1) else { continue };
        for block in BFCHAR_BLOCK.captures_iter(body.as_bytes()) {
            let Some(pairs) = block.get(1) else { continue };
            let text: String = BFCHAR_PAIR
                .captures_iter(pairs.as_bytes())
                .filter_map(|pair| pair.get(2))
                .filter_map(|target| std::str::from_utf8(target.as_bytes()).ok())
                .filter_map(|hex| u32::from_str_radix(hex, 16).ok())
                .filter_map(char::from_u32)
                .collect();
            if !text.is_empty() {
                out.push(text);
            }
        }
    }
    out
}

/// Literal and hex strings of `body` that decode to mostly printable text.
fn collect_strings(body: &[u8], literal: &BytesRegex, pool: &mut Pool) {
    for caps in literal.captures_iter(body) {
        if let Some(raw) = caps.get(1) {
            let text = decode_literal(raw.as_bytes());
            if is_acceptable(&text) {
                pool.push(text);
            }
        }
    }
    for caps in HEX.captures_iter(body) {
        if let Some(raw) = caps.get(1) {
            let text = decode_hex(raw.as_bytes());
            if is_acceptable(&text) {
                pool.push(text);
            }
        }
    }
}

/// The stream dictionary preceding a `stream` keyword at `start`.
fn stream_header(pdf: &[u8], start: usize) -> &[u8] {
    let window = &pdf[start.saturating_sub(STREAM_HEADER_LOOKBACK)..start];
    let after = [b"endstream".as_slice(), b"endobj".as_slice()]
        .iter()
        .filter_map(|marker| rfind(window, marker).map(|pos| pos + marker.len()))
        .max()
        .unwrap_or(0);
    &window[after..]
}

fn declares_skipped_filter(header: &[u8]) -> bool {
    SKIPPED_FILTERS
        .iter()
        .any(|filter| find(header, filter).is_some())
}

fn stream_is_textual(header: &[u8], body: &[u8]) -> bool {
    if declares_skipped_filter(header) {
        return false;
    }
    let sample = &body[..body.len().min(STREAM_SAMPLE_LEN)];
    if sample.is_empty() {
        return false;
    }
    let printable = sample
        .iter()
        .filter(|&&b| matches!(b, 32..=126 | b'\t' | b'\n' | b'\r'))
        .count();
    printable as f64 / sample.len() as f64 >= MIN_STREAM_PRINTABLE
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Decodes the body of a `( … )` string literal.
fn decode_literal(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let byte = raw[i];
        i += 1;
        if byte != b'\\' {
            out.push(char::from(byte));
            continue;
        }
        let Some(&next) = raw.get(i) else { break };
        match next {
            b'0'..=b'7' => {
                let mut value: u32 = 0;
                let mut digits = 0;
                while digits < 3 && i < raw.len() && matches!(raw[i], b'0'..=b'7') {
                    value = value * 8 + u32::from(raw[i] - b'0');
                    i += 1;
                    digits += 1;
                }
                // High-order overflow is ignored.
                out.push(char::from((value & 0xFF) as u8));
                continue;
            }
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'b' => out.push('\u{08}'),
            b'f' => out.push('\u{0C}'),
            b'\r' => {
                // Line continuation.
                if raw.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => {}
            other => out.push(char::from(other)),
        }
        i += 1;
    }
    out
}

/// Decodes the body of a `< … >` hex string, keeping printable ASCII only.
fn decode_hex(raw: &[u8]) -> String {
    let mut digits: Vec<u8> = raw
        .iter()
        .copied()
        .filter(u8::is_ascii_hexdigit)
        .collect();
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }
    digits
        .chunks(2)
        .filter_map(|pair| {
            let hi = char::from(pair[0]).to_digit(16)?;
            let lo = char::from(pair[1]).to_digit(16)?;
            let byte = (hi * 16 + lo) as u8;
            matches!(byte, 32..=126 | b'\t' | b'\n' | b'\r').then_some(char::from(byte))
        })
        .collect()
}

fn is_printable(c: char) -> bool {
    matches!(c, ' '..='~' | '\t' | '\n' | '\r') || (c >= '\u{A0}' && c.is_alphabetic())
}

fn printable_ratio(text: &str) -> f64 {
    let (total, printable) = text.chars().fold((0usize, 0usize), |(t, p), c| {
        (t + 1, p + usize::from(is_printable(c)))
    });
    if total == 0 {
        return 0.0;
    }
    printable as f64 / total as f64
}

fn alnum_ratio(text: &str) -> f64 {
    let (total, alnum) = text.chars().fold((0usize, 0usize), |(t, a), c| {
        (t + 1, a + usize::from(c.is_alphanumeric()))
    });
    if total == 0 {
        return 0.0;
    }
    alnum as f64 / total as f64
}

fn is_acceptable(text: &str) -> bool {
    !text.trim().is_empty() && printable_ratio(text) > MIN_PRINTABLE_RATIO
}

fn looks_like_text(text: &str) -> bool {
    is_acceptable(text) && text.chars().any(char::is_alphabetic)
}

/// Last-resort pass: every string literal of 3+ characters and every hex
/// string of 6+ digits that is at least 30% alphanumeric.
fn extract_all_possible_text(pdf: &[u8]) -> String {
    let mut pool = Pool::default();
    for caps in LITERAL_PERMISSIVE.captures_iter(pdf) {
        if let Some(raw) = caps.get(1) {
            let text = decode_literal(raw.as_bytes());
            if alnum_ratio(&text) >= MIN_ALNUM_RATIO {
                pool.push(text);
            }
        }
    }
    for caps in HEX_PERMISSIVE.captures_iter(pdf) {
        if let Some(raw) = caps.get(1) {
            let text = decode_hex(raw.as_bytes());
            if alnum_ratio(&text) >= MIN_ALNUM_RATIO {
                pool.push(text);
            }
        }
    }
    pool.join()
}

/// Scrubs pooled text: drops control characters, CID markers and leftover
/// PDF syntax, collapses whitespace, rejoins hyphenated words and breaks
/// paragraphs after sentences.
pub fn clean_text(text: &str) -> String {
    let without_cids = CID_MARKER.replace_all(text, " ");
    let visible: String = without_cids
        .chars()
        .filter(|c| c.is_whitespace() || !c.is_control())
        .collect();

    let joined = visible
        .split_whitespace()
        .filter(|token| !is_syntax_token(token))
        .collect::<Vec<_>>()
        .join(" ");

    let merged = HYPHEN_SPLIT.replace_all(&joined, "$1$2");
    let paragraphs = SENTENCE_BREAK.replace_all(&merged, ".\n\n$1");
    paragraphs.trim().to_string()
}

fn is_syntax_token(token: &str) -> bool {
    SYNTAX_TOKENS.contains(&token) || NUMERIC_TOKEN.is_match(token) || NAME_TOKEN.is_match(token)
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}
