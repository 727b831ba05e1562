use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

/// Inline cue markup such as `<c>`, `</c>` or `<00:00:01.200>`
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

const TIMING_MARKER: &str = "-->";
const HEADER_TOKEN: &str = "WEBVTT";

/// Raw caption track, one entry per line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    lines: Vec<String>,
}

impl SubtitleDocument {
    /// Split a WebVTT document into lines
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Collapse the caption track into plain text.
    ///
    /// Cue indices, timing lines, the header and markup are dropped. A line is kept only the
    /// first time it is seen anywhere in the document, so rolling auto-caption windows collapse
    /// to a single copy. Repeated phrases far apart in the video are dropped as well.
    /// Stray `<` and `>` left after tag removal are deleted so joined lines never form a tag.
    pub fn normalize(&self) -> PlainTranscript {
        let mut seen: HashSet<String> = HashSet::new();
        let mut accepted: Vec<String> = Vec::new();

        for raw in &self.lines {
            let line = raw.trim();
            if is_structural(line) {
                continue;
            }

            let stripped = TAG_PATTERN.replace_all(line, "").replace(['<', '>'], "");
            let text = stripped.trim();
            if is_structural(text) || text.chars().count() <= 1 {
                continue;
            }

            if seen.insert(text.to_string()) {
                accepted.push(text.to_string());
            }
        }

        PlainTranscript(accepted.join(" "))
    }
}

/// Lines that carry cue structure rather than spoken text
fn is_structural(line: &str) -> bool {
    line.is_empty()
        || line.contains(TIMING_MARKER)
        || line.chars().all(|c| c.is_ascii_digit())
        || line.starts_with(HEADER_TOKEN)
}

/// Deduplicated caption text, ready for translation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlainTranscript(String);

impl PlainTranscript {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PlainTranscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PlainTranscript> for String {
    fn from(transcript: PlainTranscript) -> Self {
        transcript.0
    }
}

/// Clean a raw WebVTT document into plain text. Empty input yields an empty transcript.
pub fn normalize_vtt(content: &str) -> PlainTranscript {
    if content.is_empty() {
        return PlainTranscript::default();
    }
    SubtitleDocument::parse(content).normalize()
}
