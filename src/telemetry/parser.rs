// Telemetry frame parser for Roboteq query history output
//
// Frame format (one line per reporting period, CR terminated):
//   DH?12:13?400:-400\r
//   ^ ^ ^     ^
//   | | |     record separator, one record per registered query
//   | | value separator inside a record
//   | group tag separator
//   frame tag, starts a group payload

use tracing::{debug, warn};

use crate::config::{GroupTag, QueryGroup};
use crate::messages::{ChannelValues, StringReading};

/// Retained bytes without a terminator are released past this size
pub const MAX_PENDING: usize = 4096;

/// Conditions that skip part of a tick; never fatal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryDiagnostic {
    #[error("Garbage data on serial: unknown group tag {tag:?}")]
    UnknownGroupTag { tag: String },

    #[error("Group {group}: {expected} sinks registered but {found} records received")]
    FieldCountMismatch {
        group: GroupTag,
        expected: usize,
        found: usize,
    },

    #[error("Group {group} record {index}: invalid value {token:?}")]
    InvalidValue {
        group: GroupTag,
        index: usize,
        token: String,
    },

    #[error("Group {group} record {index} has no registered sink ({sink:?})")]
    UnregisteredSink {
        group: GroupTag,
        index: usize,
        sink: Option<String>,
    },

    #[error("No terminator within {bytes} pending bytes, releasing them unframed")]
    PendingOverflow { bytes: usize },
}

/// Delimiter set; differs between controller firmware versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub frame_tag: char,
    pub tag_separator: char,
    pub record_separators: Vec<char>,
    pub value_separators: Vec<char>,
    /// Removed everywhere before tokenizing
    pub stripped: Vec<char>,
    pub terminator: u8,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            frame_tag: 'D',
            tag_separator: '?',
            record_separators: vec!['?', '_'],
            value_separators: vec![':', ';'],
            stripped: vec!['\r', '+'],
            terminator: b'\r',
        }
    }
}

/// Lexical units of the telemetry stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Text before the first frame tag (acks, echoes, line noise)
    Noise(&'a str),
    /// A frame tag opened a new group payload
    GroupStart,
    /// Group tag between the frame tag and the tag separator
    Tag(&'a str),
    /// One query's field list
    Record(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Noise,
    Tag,
    Records,
}

/// Split a normalized stream into tokens
pub fn tokenize<'a>(input: &'a str, delimiters: &Delimiters) -> Vec<Token<'a>> {
    let mut tokens = Vec::new();
    let mut state = LexState::Noise;
    let mut start = 0;

    let flush = |tokens: &mut Vec<Token<'a>>, state: LexState, text: &'a str| {
        let text = text.trim();
        match state {
            LexState::Noise if !text.is_empty() => tokens.push(Token::Noise(text)),
            LexState::Tag => tokens.push(Token::Tag(text)),
            LexState::Records if !text.is_empty() => tokens.push(Token::Record(text)),
            _ => {}
        }
    };

    for (i, ch) in input.char_indices() {
        let next = i + ch.len_utf8();
        // Inside records a frame tag only counts when a known group tag follows
        if ch == delimiters.frame_tag
            && (state != LexState::Records || opens_group(&input[next..], delimiters))
        {
            flush(&mut tokens, state, &input[start..i]);
            tokens.push(Token::GroupStart);
            state = LexState::Tag;
            start = next;
        } else if state == LexState::Tag && ch == delimiters.tag_separator {
            flush(&mut tokens, state, &input[start..i]);
            state = LexState::Records;
            start = next;
        } else if state == LexState::Records && delimiters.record_separators.contains(&ch) {
            flush(&mut tokens, state, &input[start..i]);
            start = next;
        }
    }
    flush(&mut tokens, state, &input[start..]);

    tokens
}

fn opens_group(rest: &str, delimiters: &Delimiters) -> bool {
    rest.split_once(delimiters.tag_separator)
        .is_some_and(|(tag, _)| GroupTag::from_tag(tag.trim()).is_some())
}

/// One decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading {
    Values(ChannelValues),
    Text(StringReading),
}

/// Records of one group payload, index-aligned with the group's sinks.
/// `None` marks a record that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedGroup {
    pub tag: GroupTag,
    pub records: Vec<Option<Reading>>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseOutput {
    pub groups: Vec<DecodedGroup>,
    pub diagnostics: Vec<TelemetryDiagnostic>,
}

pub struct FrameParser {
    delimiters: Delimiters,
    /// Registered sink count per group, indexed like `GroupTag::ALL`
    sink_counts: [usize; 3],
}

impl FrameParser {
    pub fn new(groups: &[QueryGroup]) -> Self {
        Self::with_delimiters(groups, Delimiters::default())
    }

    pub fn with_delimiters(groups: &[QueryGroup], delimiters: Delimiters) -> Self {
        let mut sink_counts = [0; 3];
        for group in groups {
            sink_counts[group_index(group.tag)] = group.sinks.len();
        }
        Self {
            delimiters,
            sink_counts,
        }
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// Remove carriage returns and continuation markers
    pub fn normalize(&self, raw: &str) -> String {
        raw.chars()
            .filter(|c| !self.delimiters.stripped.contains(c))
            .collect()
    }

    pub fn parse(&self, raw: &str) -> ParseOutput {
        let normalized = self.normalize(raw);
        let mut output = ParseOutput::default();
        // Group currently being filled; None while skipping a bad payload
        let mut current: Option<DecodedGroup> = None;
        let mut skipping = false;

        for token in tokenize(&normalized, &self.delimiters) {
            match token {
                Token::Noise(text) => debug!("Ignoring unframed serial data: {:?}", text),
                Token::GroupStart => {
                    self.finish(current.take(), &mut output);
                    skipping = false;
                }
                Token::Tag(tag) => match GroupTag::from_tag(tag) {
                    Some(tag) => {
                        current = Some(DecodedGroup {
                            tag,
                            records: Vec::new(),
                        })
                    }
                    None => {
                        let diagnostic = TelemetryDiagnostic::UnknownGroupTag {
                            tag: tag.to_string(),
                        };
                        warn!("{}", diagnostic);
                        output.diagnostics.push(diagnostic);
                        skipping = true;
                    }
                },
                Token::Record(text) => {
                    if skipping {
                        continue;
                    }
                    if let Some(group) = current.as_mut() {
                        let index = group.records.len();
                        let record = self.decode_record(group.tag, index, text, &mut output);
                        group.records.push(record);
                    }
                }
            }
        }
        self.finish(current, &mut output);

        output
    }

    fn decode_record(
        &self,
        tag: GroupTag,
        index: usize,
        text: &str,
        output: &mut ParseOutput,
    ) -> Option<Reading> {
        if !tag.is_numeric() {
            return Some(Reading::Text(StringReading {
                data: text.to_string(),
            }));
        }

        let mut fields = Vec::new();
        for token in text
            .split(|c| self.delimiters.value_separators.contains(&c))
            .map(str::trim)
        {
            match token.parse::<i32>() {
                Ok(value) => fields.push(value),
                Err(_) => {
                    let diagnostic = TelemetryDiagnostic::InvalidValue {
                        group: tag,
                        index,
                        token: token.to_string(),
                    };
                    warn!("{}", diagnostic);
                    output.diagnostics.push(diagnostic);
                    return None;
                }
            }
        }
        Some(Reading::Values(ChannelValues::from_fields(fields)))
    }

    fn finish(&self, group: Option<DecodedGroup>, output: &mut ParseOutput) {
        let Some(group) = group else {
            return;
        };

        let expected = self.sink_counts[group_index(group.tag)];
        if group.records.len() < expected {
            let diagnostic = TelemetryDiagnostic::FieldCountMismatch {
                group: group.tag,
                expected,
                found: group.records.len(),
            };
            warn!("{}", diagnostic);
            output.diagnostics.push(diagnostic);
        }
        output.groups.push(group);
    }
}

fn group_index(tag: GroupTag) -> usize {
    match tag {
        GroupTag::High => 0,
        GroupTag::Low => 1,
        GroupTag::General => 2,
    }
}

/// Holds back a trailing partial frame until its terminator arrives
pub struct FrameAssembler {
    pending: Vec<u8>,
    terminator: u8,
    max_pending: usize,
}

impl FrameAssembler {
    pub fn new(terminator: u8) -> Self {
        Self::with_limit(terminator, MAX_PENDING)
    }

    pub fn with_limit(terminator: u8, max_pending: usize) -> Self {
        Self {
            pending: Vec::new(),
            terminator,
            max_pending,
        }
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Append drained bytes and return every complete frame seen so far
    pub fn push(&mut self, bytes: &[u8]) -> (Vec<u8>, Option<TelemetryDiagnostic>) {
        self.pending.extend_from_slice(bytes);

        let mut complete = match self.pending.iter().rposition(|&b| b == self.terminator) {
            Some(end) => self.pending.drain(..=end).collect(),
            None => Vec::new(),
        };

        if self.pending.len() > self.max_pending {
            let diagnostic = TelemetryDiagnostic::PendingOverflow {
                bytes: self.pending.len(),
            };
            warn!("{}", diagnostic);
            complete.append(&mut self.pending);
            return (complete, Some(diagnostic));
        }

        (complete, None)
    }
}
