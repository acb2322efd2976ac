/*!
 * File codecs: turn a file into an ordered list of translatable strings and
 * write translated strings back in the same places.
 *
 * - `MsgArrCodec`: PHP language tables made of `$msg_arr['key'] = 'value';` lines
 * - `PlainLinesCodec`: one string per non-blank line
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::errors::FileError;

/// Extracts translatable strings and rewrites a file with their translations
pub trait FileCodec: Send + Sync {
    /// Short codec name for logs
    fn name(&self) -> &str;

    /// Ordered strings to translate
    fn extract(&self, contents: &[u8]) -> Result<Vec<String>, FileError>;

    /// File contents with the strings replaced, in extraction order
    fn rewrite(&self, contents: &[u8], strings: &[String]) -> Result<Vec<u8>, FileError>;
}

fn decode(contents: &[u8]) -> Result<&str, FileError> {
    std::str::from_utf8(contents).map_err(|e| FileError::Encoding(e.to_string()))
}

/// Split a line into its content and its line ending (`\n`, `\r\n` or none)
fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

fn check_count(expected: usize, actual: usize) -> Result<(), FileError> {
    if expected != actual {
        return Err(FileError::StringCountMismatch { expected, actual });
    }
    Ok(())
}

static SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(\s*\$msg_arr\[.*?\]\s*=\s*')((?:[^'\\]|\\.)*)(';\s*;?\s*)$"#).unwrap()
});

static DOUBLE_QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(\s*\$msg_arr\[.*?\]\s*=\s*")((?:[^"\\]|\\.)*)(";?\s*;?\s*)$"#).unwrap()
});

/// Quote style of a PHP string literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
}

impl Quote {
    /// PHP literal body -> natural text
    fn unescape(self, raw: &str) -> String {
        match self {
            Quote::Single => raw.replace("\\'", "'").replace("\\\\", "\\"),
            Quote::Double => raw.replace("\\\"", "\""),
        }
    }

    /// Natural text -> PHP literal body
    fn escape(self, text: &str) -> String {
        match self {
            Quote::Single => text.replace('\\', "\\\\").replace('\'', "\\'"),
            Quote::Double => text.replace('"', "\\\""),
        }
    }
}

/// Codec for PHP `$msg_arr[...]` language tables
///
/// Lines that are not a single- or double-quoted assignment are copied
/// verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgArrCodec;

impl MsgArrCodec {
    fn match_line(body: &str) -> Option<(Captures<'_>, Quote)> {
        SINGLE_QUOTED
            .captures(body)
            .map(|caps| (caps, Quote::Single))
            .or_else(|| DOUBLE_QUOTED.captures(body).map(|caps| (caps, Quote::Double)))
    }
}

impl FileCodec for MsgArrCodec {
    fn name(&self) -> &str {
        "php"
    }

    fn extract(&self, contents: &[u8]) -> Result<Vec<String>, FileError> {
        let text = decode(contents)?;
        Ok(text
            .split_inclusive('\n')
            .filter_map(|line| {
                let (body, _) = split_line_ending(line);
                Self::match_line(body).map(|(caps, quote)| quote.unescape(&caps[2]))
            })
            .collect())
    }

    fn rewrite(&self, contents: &[u8], strings: &[String]) -> Result<Vec<u8>, FileError> {
        let text = decode(contents)?;
        let mut output = String::with_capacity(text.len());
        let mut next = strings.iter();
        let mut used = 0;

        for line in text.split_inclusive('\n') {
            let (body, ending) = split_line_ending(line);
            match Self::match_line(body) {
                Some((caps, quote)) => {
                    let Some(translated) = next.next() else {
                        // Count the remaining matches for the error report
                        let expected = self.extract(contents)?.len();
                        return Err(FileError::StringCountMismatch { expected, actual: strings.len() });
                    };
                    used += 1;
                    output.push_str(&caps[1]);
                    output.push_str(&quote.escape(translated));
                    output.push_str(&caps[3]);
                    output.push_str(ending);
                }
                None => output.push_str(line),
            }
        }

        check_count(used, strings.len())?;
        Ok(output.into_bytes())
    }
}

/// Codec treating every non-blank line as one string
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainLinesCodec;

impl FileCodec for PlainLinesCodec {
    fn name(&self) -> &str {
        "lines"
    }

    fn extract(&self, contents: &[u8]) -> Result<Vec<String>, FileError> {
        let text = decode(contents)?;
        Ok(text
            .split_inclusive('\n')
            .map(|line| split_line_ending(line).0)
            .filter(|body| !body.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    fn rewrite(&self, contents: &[u8], strings: &[String]) -> Result<Vec<u8>, FileError> {
        let text = decode(contents)?;
        let expected = self.extract(contents)?.len();
        check_count(expected, strings.len())?;

        let mut output = String::with_capacity(text.len());
        let mut next = strings.iter();
        for line in text.split_inclusive('\n') {
            let (body, ending) = split_line_ending(line);
            if body.trim().is_empty() {
                output.push_str(line);
                continue;
            }
            if let Some(translated) = next.next() {
                output.push_str(translated);
                output.push_str(ending);
            }
        }
        Ok(output.into_bytes())
    }
}
