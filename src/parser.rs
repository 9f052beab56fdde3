//! Streaming tokenizer for InfluxDB Line Protocol.
//!
//! The parser is a single-pass state machine that pulls characters from a
//! [`CharSource`] and produces one [`Point`] per line. Malformed lines are
//! isolated: by default the parser discards everything up to the next newline
//! and carries on with the following line.

use std::io::{BufReader, Read};

use tracing::{debug, warn};

use crate::config::{ErrorMode, ParserConfig};
use crate::error::{Error, Result};
use crate::source::{CharSource, ReaderSource, StrSource};
use crate::types::{Point, PointBuilder};
use crate::value::FieldValue;

/// Characters a backslash turns into literals inside a measurement.
const MEASUREMENT_ESCAPES: &[char] = &[',', ' '];
/// Characters a backslash turns into literals inside tag keys, tag values and field keys.
const KEY_ESCAPES: &[char] = &[',', ' ', '='];
/// Characters a backslash turns into literals inside a quoted string value.
const STRING_ESCAPES: &[char] = &['"'];

/// Internal state of the tokenizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Start of a line.
    Beginning,
    /// Inside a `#` comment.
    Comment,
    Measurement,
    MeasurementEscape,
    TagKey,
    TagKeyEscape,
    TagValue,
    TagValueEscape,
    /// Absorbing spaces between the tag set and the field set.
    FieldKeySeparator,
    FieldKey,
    FieldKeyEscape,
    /// First character of a field value decides quoted vs. bare.
    FieldValue,
    StringFieldValue,
    StringFieldValueEscape,
    NonStringFieldValue,
    /// Absorbing spaces between the field set and the timestamp.
    TimestampSeparator,
    Timestamp,
    /// Discarding the rest of a malformed line.
    ErrorInLine,
    /// A point is complete.
    End,
    /// End of input, no point.
    Eos,
    /// Fail-fast abort.
    Error,
}

impl State {
    fn is_terminal(self) -> bool {
        matches!(self, State::End | State::Eos | State::Error)
    }
}

/// Streaming parser for InfluxDB Line Protocol.
///
/// This parser reads characters from a [`CharSource`] and yields `Point`s one
/// at a time, without loading the entire input into memory. It can be driven
/// either through the probe/take pair [`has_next`](Self::has_next) /
/// [`next_point`](Self::next_point) or as an [`Iterator`].
///
/// # Example
///
/// ```
/// use lineproto_stream::LineProtocolParser;
///
/// let mut parser = LineProtocolParser::from_text(
///     "weather,location=us-midwest temperature=82 1465839830100400200",
/// );
/// while parser.has_next().unwrap() {
///     let point = parser.next_point().unwrap();
///     assert_eq!(point.measurement(), "weather");
/// }
/// ```
#[derive(Debug)]
pub struct LineProtocolParser<S> {
    source: S,
    config: ParserConfig,
    key: String,
    value: String,
    builder: PointBuilder,
    next_point: Option<Point>,
    /// Newlines consumed so far.
    line: u64,
    /// Line on which the record being parsed started.
    record_line: u64,
    skipped: u64,
    failure: Option<Error>,
    done: bool,
}

impl<'a> LineProtocolParser<StrSource<'a>> {
    /// Create a parser over in-memory text.
    pub fn from_text(text: &'a str) -> Self {
        Self::new(StrSource::new(text))
    }
}

impl<R: Read> LineProtocolParser<ReaderSource<BufReader<R>>> {
    /// Create a parser over a byte stream containing UTF-8 text.
    pub fn from_reader(reader: R) -> Self {
        Self::new(ReaderSource::new(BufReader::new(reader)))
    }
}

impl<S: CharSource> LineProtocolParser<S> {
    /// Create a parser with the default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, ParserConfig::default())
    }

    /// Create a parser with a custom configuration.
    pub fn with_config(source: S, config: ParserConfig) -> Self {
        Self {
            source,
            config,
            key: String::new(),
            value: String::new(),
            builder: PointBuilder::new(),
            next_point: None,
            line: 0,
            record_line: 1,
            skipped: 0,
            failure: None,
            done: false,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Number of complete lines consumed so far.
    pub fn line_number(&self) -> u64 {
        self.line
    }

    /// Number of malformed lines discarded so far.
    pub fn skipped_lines(&self) -> u64 {
        self.skipped
    }

    /// Give back the character source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Parse the next point and cache it.
    ///
    /// Returns:
    /// - `Ok(true)` - A point is ready for [`next_point`](Self::next_point)
    /// - `Ok(false)` - End of input (or the parser already failed)
    /// - `Err(e)` - Source error, or a malformed line in fail-fast mode
    ///
    /// Calling this again before taking the cached point does not consume input.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.next_point.is_some() {
            return Ok(true);
        }
        self.next_point = self.advance()?;
        Ok(self.next_point.is_some())
    }

    /// Take the point cached by the last successful [`has_next`](Self::has_next).
    pub fn next_point(&mut self) -> Result<Point> {
        self.next_point.take().ok_or(Error::NoSuchElement)
    }

    /// Parse the next point, fusing the parser on end of input or error.
    fn advance(&mut self) -> Result<Option<Point>> {
        if self.done {
            return Ok(None);
        }
        match self.parse_next() {
            Ok(Some(point)) => Ok(Some(point)),
            Ok(None) => {
                self.done = true;
                debug!(
                    lines = self.line,
                    skipped = self.skipped,
                    "end of line protocol input"
                );
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                debug!(error = %e, "line protocol parsing aborted");
                Err(e)
            }
        }
    }

    /// Run the state machine over exactly one record.
    fn parse_next(&mut self) -> Result<Option<Point>> {
        self.reset_line();

        let mut state = State::Beginning;
        while !state.is_terminal() {
            state = self.step(state)?;
        }

        match state {
            State::End => self.builder.build().map(Some),
            State::Error => Err(self.failure.take().unwrap_or_else(|| Error::Syntax {
                line: self.record_line,
                message: "malformed line".to_string(),
            })),
            _ => Ok(None),
        }
    }

    /// Single transition of the state machine.
    fn step(&mut self, state: State) -> Result<State> {
        let c = match state {
            // These states decide without reading.
            State::ErrorInLine if self.config.error_mode == ErrorMode::FailFast => {
                return Ok(State::Error);
            }
            State::End | State::Eos | State::Error => return Ok(state),
            _ => self.read()?,
        };

        let next = match (state, c) {
            (State::Beginning, None) => State::Eos,
            (State::Beginning, Some(c)) => match c {
                '#' => State::Comment,
                '\n' => State::Beginning,
                _ => {
                    self.record_line = self.line + 1;
                    if c == ',' || c == ' ' {
                        self.reject(Some(c), format!("line starts with '{}'", c))
                    } else {
                        self.unread(c);
                        State::Measurement
                    }
                }
            },

            (State::Comment, None) => State::Eos,
            (State::Comment, Some('\n')) => State::Beginning,
            (State::Comment, Some(_)) => State::Comment,

            (State::Measurement, None) => self.end_of_input(),
            (State::Measurement, Some(c)) => match c {
                '\\' => State::MeasurementEscape,
                '\n' => self.reject(Some(c), "newline in measurement"),
                ',' | ' ' => {
                    if self.key.is_empty() {
                        self.reject(Some(c), "empty measurement")
                    } else {
                        self.builder.set_measurement(self.key.as_str());
                        self.key.clear();
                        if c == ',' {
                            State::TagKey
                        } else {
                            State::FieldKeySeparator
                        }
                    }
                }
                _ => {
                    self.key.push(c);
                    State::Measurement
                }
            },
            (State::MeasurementEscape, None) => self.end_of_input(),
            (State::MeasurementEscape, Some('\n')) => {
                self.reject(Some('\n'), "escape before newline in measurement")
            }
            (State::MeasurementEscape, Some(c)) => {
                push_escaped(&mut self.key, c, MEASUREMENT_ESCAPES);
                State::Measurement
            }

            (State::TagKey, None) => self.end_of_input(),
            (State::TagKey, Some(c)) => match c {
                '\\' => State::TagKeyEscape,
                '\n' => self.reject(Some(c), "newline in tag key"),
                ',' | ' ' => self.reject(Some(c), format!("tag key '{}' has no value", self.key)),
                '=' if self.key.is_empty() => self.reject(Some(c), "empty tag key"),
                '=' => State::TagValue,
                _ => {
                    self.key.push(c);
                    State::TagKey
                }
            },
            (State::TagKeyEscape, None) => self.end_of_input(),
            (State::TagKeyEscape, Some('\n')) => {
                self.reject(Some('\n'), "escape before newline in tag key")
            }
            (State::TagKeyEscape, Some(c)) => {
                push_escaped(&mut self.key, c, KEY_ESCAPES);
                State::TagKey
            }

            (State::TagValue, None) => self.end_of_input(),
            (State::TagValue, Some(c)) => match c {
                '\\' => State::TagValueEscape,
                '\n' => self.reject(Some(c), "newline in tag value"),
                '=' => self.reject(Some(c), "unescaped '=' in tag value"),
                ',' | ' ' => match self.builder.add_tag(self.key.as_str(), self.value.as_str()) {
                    Ok(()) => {
                        self.key.clear();
                        self.value.clear();
                        if c == ',' {
                            State::TagKey
                        } else {
                            State::FieldKeySeparator
                        }
                    }
                    Err(e) => self.reject(Some(c), e.to_string()),
                },
                _ => {
                    self.value.push(c);
                    State::TagValue
                }
            },
            (State::TagValueEscape, None) => self.end_of_input(),
            (State::TagValueEscape, Some('\n')) => {
                self.reject(Some('\n'), "escape before newline in tag value")
            }
            (State::TagValueEscape, Some(c)) => {
                push_escaped(&mut self.value, c, KEY_ESCAPES);
                State::TagValue
            }

            (State::FieldKeySeparator, None) => self.end_of_input(),
            (State::FieldKeySeparator, Some(' ')) => State::FieldKeySeparator,
            (State::FieldKeySeparator, Some('\n')) => self.reject(Some('\n'), "missing field set"),
            (State::FieldKeySeparator, Some(c)) => {
                self.unread(c);
                State::FieldKey
            }

            (State::FieldKey, None) => self.end_of_input(),
            (State::FieldKey, Some(c)) => match c {
                '\\' => State::FieldKeyEscape,
                '\n' => self.reject(Some(c), "newline in field key"),
                ',' | ' ' => self.reject(Some(c), format!("field key '{}' has no value", self.key)),
                '=' if self.key.is_empty() => self.reject(Some(c), "empty field key"),
                '=' => State::FieldValue,
                _ => {
                    self.key.push(c);
                    State::FieldKey
                }
            },
            (State::FieldKeyEscape, None) => self.end_of_input(),
            (State::FieldKeyEscape, Some('\n')) => {
                self.reject(Some('\n'), "escape before newline in field key")
            }
            (State::FieldKeyEscape, Some(c)) => {
                push_escaped(&mut self.key, c, KEY_ESCAPES);
                State::FieldKey
            }

            (State::FieldValue, None) => self.end_of_input(),
            (State::FieldValue, Some(c)) => match c {
                '"' => State::StringFieldValue,
                '\n' | ',' | ' ' => {
                    self.reject(Some(c), format!("field '{}' has an empty value", self.key))
                }
                _ => {
                    self.unread(c);
                    State::NonStringFieldValue
                }
            },

            (State::StringFieldValue, None) => self.end_of_input(),
            (State::StringFieldValue, Some('\\')) => State::StringFieldValueEscape,
            (State::StringFieldValue, Some('"')) => {
                let value = FieldValue::String(self.value.clone());
                match self.commit_field(value) {
                    Some(rejected) => rejected,
                    None => self.after_string_value()?,
                }
            }
            (State::StringFieldValue, Some(c)) => {
                self.value.push(c);
                State::StringFieldValue
            }
            (State::StringFieldValueEscape, None) => self.end_of_input(),
            (State::StringFieldValueEscape, Some(c)) => {
                push_escaped(&mut self.value, c, STRING_ESCAPES);
                State::StringFieldValue
            }

            (State::NonStringFieldValue, c @ (None | Some(',' | ' ' | '\n'))) => {
                let parsed = coerce_field_value(&self.value, &self.key, self.record_line);
                let committed = match parsed {
                    Ok(value) => self.commit_field(value),
                    Err(e) => Some(self.reject(c, e)),
                };
                match (committed, c) {
                    (Some(rejected), _) => rejected,
                    (None, Some(',')) => State::FieldKey,
                    (None, Some(' ')) => State::TimestampSeparator,
                    (None, _) => State::End,
                }
            }
            (State::NonStringFieldValue, Some(c)) => {
                self.value.push(c);
                State::NonStringFieldValue
            }

            (State::TimestampSeparator, None | Some('\n')) => State::End,
            (State::TimestampSeparator, Some(' ')) => State::TimestampSeparator,
            (State::TimestampSeparator, Some(c)) => {
                self.unread(c);
                State::Timestamp
            }

            (State::Timestamp, c @ (None | Some('\n'))) => {
                match parse_timestamp(&self.value, self.record_line) {
                    Ok(ts) => {
                        self.builder.set_timestamp(ts);
                        self.value.clear();
                        State::End
                    }
                    Err(e) => self.reject(c, e),
                }
            }
            (State::Timestamp, Some(c)) => {
                self.value.push(c);
                State::Timestamp
            }

            (State::ErrorInLine, None) => {
                self.skip_line();
                State::Eos
            }
            (State::ErrorInLine, Some('\n')) => {
                self.skip_line();
                self.reset_line();
                State::Beginning
            }
            (State::ErrorInLine, Some(_)) => State::ErrorInLine,

            (State::End | State::Eos | State::Error, _) => state,
        };

        Ok(next)
    }

    /// Look at the character following a closing quote.
    fn after_string_value(&mut self) -> Result<State> {
        let next = match self.read()? {
            None | Some('\n') => State::End,
            Some(',') => State::FieldKey,
            Some(' ') => State::TimestampSeparator,
            Some(c) => self.reject(
                Some(c),
                format!("unexpected '{}' after string value", c),
            ),
        };
        Ok(next)
    }

    /// Add the current key with `value` to the point, clearing the scratch
    /// buffers. Returns the error state if the builder refuses the field.
    fn commit_field(&mut self, value: FieldValue) -> Option<State> {
        let result = self.builder.add_field(self.key.as_str(), value);
        self.key.clear();
        self.value.clear();
        result.err().map(|e| self.reject(None, e))
    }

    /// End of input in the middle of a record: a clean end of the last point
    /// if one field is already committed, otherwise a clean end of stream.
    fn end_of_input(&self) -> State {
        if self.builder.has_fields() {
            State::End
        } else {
            State::Eos
        }
    }

    /// Record a line-level error and switch to recovery.
    ///
    /// A rejected newline is pushed back so recovery stops at this line's end.
    fn reject(&mut self, c: Option<char>, reason: impl Into<LineError>) -> State {
        if c == Some('\n') {
            self.unread('\n');
        }
        self.failure = Some(match reason.into() {
            LineError::Message(message) => Error::Syntax {
                line: self.record_line,
                message,
            },
            LineError::Value(e) => e,
        });
        State::ErrorInLine
    }

    /// Account for a discarded line.
    fn skip_line(&mut self) {
        self.skipped += 1;
        if let Some(error) = self.failure.take() {
            warn!(line = self.record_line, error = %error, "skipping malformed line");
        }
    }

    /// Clear all per-line state.
    fn reset_line(&mut self) {
        self.key.clear();
        self.value.clear();
        self.builder.reset();
        self.failure = None;
        self.record_line = self.line + 1;
    }

    fn read(&mut self) -> Result<Option<char>> {
        let c = self.source.read_char()?;
        if c == Some('\n') {
            self.line += 1;
        }
        Ok(c)
    }

    fn unread(&mut self, c: char) {
        if c == '\n' {
            self.line -= 1;
        }
        self.source.unread(c);
    }
}

impl<S: CharSource> Iterator for LineProtocolParser<S> {
    type Item = Result<Point>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(point) = self.next_point.take() {
            return Some(Ok(point));
        }
        self.advance().transpose()
    }
}

/// Reason a line was rejected.
enum LineError {
    Message(String),
    Value(Error),
}

impl From<&str> for LineError {
    fn from(s: &str) -> Self {
        LineError::Message(s.to_string())
    }
}

impl From<String> for LineError {
    fn from(s: String) -> Self {
        LineError::Message(s)
    }
}

impl From<Error> for LineError {
    fn from(e: Error) -> Self {
        LineError::Value(e)
    }
}

/// Append an escaped character: listed characters become literals, anything
/// else keeps its backslash.
fn push_escaped(buf: &mut String, c: char, literals: &[char]) {
    if !literals.contains(&c) {
        buf.push('\\');
    }
    buf.push(c);
}

/// Convert the raw text of an unquoted field value into a typed value.
fn coerce_field_value(raw: &str, key: &str, line: u64) -> Result<FieldValue> {
    match raw {
        "t" | "T" | "true" | "True" | "TRUE" => return Ok(FieldValue::Boolean(true)),
        "f" | "F" | "false" | "False" | "FALSE" => return Ok(FieldValue::Boolean(false)),
        _ => {}
    }

    if let Some(digits) = raw.strip_suffix('i') {
        let v = digits.parse::<i64>().map_err(|e| Error::Parse {
            message: format!(
                "Invalid integer '{}' for field '{}' on line {}: {}",
                raw, key, line, e
            ),
        })?;
        return Ok(FieldValue::Integer(v));
    }

    let v = raw.parse::<f64>().map_err(|e| Error::Parse {
        message: format!(
            "Invalid float '{}' for field '{}' on line {}: {}",
            raw, key, line, e
        ),
    })?;
    if !v.is_finite() {
        return Err(Error::Parse {
            message: format!(
                "Non-finite float '{}' for field '{}' on line {}",
                raw, key, line
            ),
        });
    }
    Ok(FieldValue::from(v))
}

/// Parse the raw digit run of a timestamp.
fn parse_timestamp(raw: &str, line: u64) -> Result<i64> {
    raw.parse::<i64>().map_err(|e| Error::Parse {
        message: format!("Invalid timestamp '{}' on line {}: {}", raw, line, e),
    })
}
