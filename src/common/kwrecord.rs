//! Parse and compose the 80 characters keyword record grammar:
//! * keyword in columns 1 to 8;
//! * value indicator `= ` in columns 9 and 10;
//! * value from column 11, possibly followed by a `/` and a comment.
//!
//! Commentary keywords (`COMMENT`, `HISTORY`) carry free text from column 9, internal and
//! leading spacing kept. The blank keyword carries a trimmed comment.

use std::{borrow::Cow, fmt};

use log::warn;

use crate::{
  common::{
    COMMENT, COMMENT_MARKER, END, HISTORY, KW_LEN, KW_RANGE, QUOTE, RECORD_LEN, VALUE_INDICATOR,
    VC_RANGE, VI_RANGE, is_commentary, is_valid_keyword, record::Record,
  },
  error::{
    Error, new_commentary_with_value_err, new_empty_kw_err, new_invalid_kw_char_err,
    new_kw_too_long_err, new_non_ascii_record_err, new_record_overflow_err,
    new_value_expected_err,
  },
};

/// Separator between a value and its comment.
const VALUE_COMMENT_SEPARATOR: &str = " / ";
/// Separator starting the comment of a keyword having no value.
const NO_VALUE_COMMENT_SEPARATOR: &str = "/ ";

/// A parsed (or composed) keyword record, together with its verbatim 80 characters.
#[derive(Clone, PartialEq)]
pub struct HeaderRecord {
  /// Upper case, trimmed, at most 8 characters in `[0-9A-Z_-]`. Empty for blank keyword records.
  keyword: String,
  /// Trimmed value text, quotes included for string values.
  value: Option<String>,
  comment: Option<String>,
  record: Record,
}

impl HeaderRecord {
  /// Parse a raw keyword record.
  ///
  /// # Errors
  /// * the record contains non-ASCII bytes;
  /// * the keyword contains characters out of `[0-9A-Z_-]`;
  /// * a value indicator is followed by a comment but no value.
  pub fn parse(record: &Record) -> Result<Self, Error> {
    let bytes = record.encode();
    let text = std::str::from_utf8(bytes)
      .ok()
      .filter(|s| s.is_ascii())
      .ok_or_else(|| new_non_ascii_record_err(bytes))?;

    // Blank keyword comment, e.g. `   / some text`
    if let Some(tail) = text.trim_start().strip_prefix(COMMENT_MARKER) {
      return Ok(Self {
        keyword: String::new(),
        value: None,
        comment: Some(String::from(tail.trim())),
        record: record.clone(),
      });
    }

    let keyword = text[KW_RANGE].trim();
    if !is_valid_keyword(keyword) {
      return Err(new_invalid_kw_char_err(keyword).kwr_context(bytes));
    }
    let remainder = &text[KW_LEN..];

    let (value, comment) = if is_commentary(keyword) {
      // Internal spacing of free text is significant.
      (None, non_empty(remainder.trim_end()))
    } else if keyword.is_empty() || &bytes[VI_RANGE] != VALUE_INDICATOR {
      let remainder = remainder.trim();
      let comment = match remainder.strip_prefix(COMMENT_MARKER) {
        Some(comment) => Some(comment.trim()),
        None => non_empty(remainder),
      };
      (None, comment)
    } else {
      let (value, comment) = split_value_comment(&text[VC_RANGE]);
      let value = value.trim();
      match (value.is_empty(), comment) {
        (true, Some(_)) => return Err(new_value_expected_err(keyword, bytes)),
        (true, None) => (None, None),
        (false, comment) => (Some(value), comment.map(str::trim)),
      }
    };

    Ok(Self {
      keyword: String::from(keyword),
      value: value.map(String::from),
      comment: comment.map(String::from),
      record: record.clone(),
    })
  }

  /// Compose a new keyword record.
  /// The keyword is upper cased; the value (if any) follows `= ` from column 9;
  /// the comment (if any) follows ` / ` after a value, `/ ` without a value, and
  /// starts at column 9 for commentary keywords.
  /// A too long comment is truncated.
  ///
  /// # Errors
  /// * empty, too long or invalid keyword;
  /// * value for a commentary keyword, or empty value;
  /// * non ASCII value or comment;
  /// * keyword plus value longer than 80 characters.
  pub fn create(keyword: &str, value: Option<&str>, comment: Option<&str>) -> Result<Self, Error> {
    let keyword = check_keyword(keyword)?;
    let value = value.map(str::trim);
    for text in value.iter().chain(comment.iter()) {
      if !text.is_ascii() {
        return Err(new_non_ascii_record_err(text.as_bytes()));
      }
    }

    let mut text = format!("{:<8}", keyword);
    let (separator, comment) = if is_commentary(&keyword) {
      if value.is_some() {
        return Err(new_commentary_with_value_err(&keyword));
      }
      ("", comment.map(str::trim_end).and_then(non_empty))
    } else {
      if let Some(value) = value {
        if value.is_empty() {
          return Err(new_value_expected_err(&keyword, keyword.as_bytes()));
        }
        text.push_str(bytes2str(VALUE_INDICATOR));
        text.push_str(value);
        if text.len() > RECORD_LEN {
          return Err(new_record_overflow_err(&keyword, text.len()));
        }
      }
      let separator = if value.is_some() {
        VALUE_COMMENT_SEPARATOR
      } else {
        NO_VALUE_COMMENT_SEPARATOR
      };
      (separator, comment.map(str::trim))
    };

    let comment = match comment {
      Some(comment) => {
        let head_len = text.len() + separator.len();
        if head_len > RECORD_LEN {
          return Err(new_record_overflow_err(&keyword, head_len + comment.len()));
        }
        let available = RECORD_LEN - head_len;
        let comment = if comment.len() > available {
          let truncated = comment[..available].trim_end();
          warn!(
            "Comment of keyword '{}' truncated to '{}'.",
            keyword, truncated
          );
          truncated
        } else {
          comment
        };
        text.push_str(separator);
        text.push_str(comment);
        Some(String::from(comment))
      }
      None => None,
    };

    let record = Record::from_text(&text)?;
    Ok(Self {
      keyword,
      value: value.map(String::from),
      comment,
      record,
    })
  }

  /// The keyword only record `END`.
  pub fn end() -> Self {
    Self::keyword_only(END)
  }

  /// A record made of 80 spaces.
  pub fn blank() -> Self {
    Self {
      keyword: String::new(),
      value: None,
      comment: None,
      record: Record::blank(),
    }
  }

  pub fn comment(text: &str) -> Result<Self, Error> {
    Self::create(COMMENT, None, Some(text))
  }

  pub fn history(text: &str) -> Result<Self, Error> {
    Self::create(HISTORY, None, Some(text))
  }

  /// Logical value, `T` or `F`.
  pub fn logical(keyword: &str, value: bool, comment: Option<&str>) -> Result<Self, Error> {
    Self::create(keyword, Some(if value { "T" } else { "F" }), comment)
  }

  pub fn integer(keyword: &str, value: i64, comment: Option<&str>) -> Result<Self, Error> {
    Self::create(keyword, Some(value.to_string().as_str()), comment)
  }

  /// Real value, always written with a decimal point or an exponent.
  pub fn real(keyword: &str, value: f64, comment: Option<&str>) -> Result<Self, Error> {
    let value = format!("{:?}", value).to_uppercase();
    Self::create(keyword, Some(value.as_str()), comment)
  }

  /// String value, enclosed in single quotes, inner single quotes being doubled.
  pub fn string(keyword: &str, value: &str, comment: Option<&str>) -> Result<Self, Error> {
    let quoted = format!("{}{}{}", QUOTE, value.replace(QUOTE, "''"), QUOTE);
    Self::create(keyword, Some(quoted.as_str()), comment)
  }

  /// # Warning
  /// Internal use only, for known valid keywords.
  fn keyword_only(keyword: &'static str) -> Self {
    let mut bytes = [b' '; RECORD_LEN];
    bytes[..keyword.len()].copy_from_slice(keyword.as_bytes());
    Self {
      keyword: String::from(keyword),
      value: None,
      comment: None,
      record: Record::from_array(bytes),
    }
  }

  pub fn keyword(&self) -> &str {
    &self.keyword
  }

  pub fn value(&self) -> Option<&str> {
    self.value.as_deref()
  }

  pub fn comment_text(&self) -> Option<&str> {
    self.comment.as_deref()
  }

  /// The value if any, else the comment.
  pub fn value_or_comment(&self) -> Option<&str> {
    self.value().or_else(|| self.comment_text())
  }

  pub fn record(&self) -> &Record {
    &self.record
  }

  /// The verbatim 80 characters.
  pub fn text(&self) -> Cow<'_, str> {
    self.record.text()
  }

  pub fn is_end(&self) -> bool {
    self.keyword == END
  }

  pub fn is_commentary(&self) -> bool {
    is_commentary(&self.keyword)
  }

  pub fn is_blank(&self) -> bool {
    self.keyword.is_empty()
  }
}

impl TryFrom<&Record> for HeaderRecord {
  type Error = Error;

  fn try_from(record: &Record) -> Result<Self, Self::Error> {
    Self::parse(record)
  }
}

impl fmt::Display for HeaderRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.record.fmt(f)
  }
}

impl fmt::Debug for HeaderRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HeaderRecord")
      .field("keyword", &self.keyword)
      .field("value", &self.value)
      .field("comment", &self.comment)
      .finish()
  }
}

/// Check the keyword to be written and returns its upper cased version.
fn check_keyword(keyword: &str) -> Result<String, Error> {
  if keyword.trim().is_empty() {
    return Err(new_empty_kw_err());
  }
  let keyword = keyword.to_ascii_uppercase();
  if keyword.len() > KW_LEN {
    Err(new_kw_too_long_err(&keyword))
  } else if !is_valid_keyword(&keyword) {
    Err(new_invalid_kw_char_err(&keyword))
  } else {
    Ok(keyword)
  }
}

/// Split the value field on the first comment marker located outside a quoted string.
fn split_value_comment(field: &str) -> (&str, Option<&str>) {
  let mut in_string = false;
  for (i, c) in field.char_indices() {
    match c {
      // A doubled quote inside a string toggles twice.
      QUOTE => in_string = !in_string,
      COMMENT_MARKER if !in_string => return (&field[..i], Some(&field[i + 1..])),
      _ => {}
    }
  }
  (field, None)
}

fn non_empty(s: &str) -> Option<&str> {
  if s.is_empty() { None } else { Some(s) }
}

fn bytes2str(bytes: &[u8]) -> &str {
  std::str::from_utf8(bytes).unwrap_or_default()
}
