//! Declarative binding of header records onto typed structures.
//!
//! Each bindable type provides a static table of [`FieldBinding`]s: the field name, the
//! candidate keywords (in priority order), whether the field is a scalar or a collection,
//! and the function converting and storing a raw value into the field.
//! If a field declares no candidate keyword, its upper cased name is used.
//!
//! Matching records are visited in header order. A scalar field takes the first one, a
//! collection field takes them all. The value of a record is used, or its comment if it
//! has no value. A conversion failure leaves the field untouched and is reported as a
//! [`BindDiagnostic`], the binding of the other fields goes on.

use log::warn;

use crate::{
  common::{QUOTE, keywords::bitpix::BitPix, kwrecord::HeaderRecord},
  error::{Error, new_unexpected_value},
  hdu::header::Header,
};

/// A type whose fields can be populated from a [`Header`].
pub trait BindKeywords: Default + Sized + 'static {
  const FIELDS: &'static [FieldBinding<Self>];
}

/// Convert a raw keyword value (or comment) into a typed value.
pub trait FromKeywordValue: Sized {
  fn from_keyword_value(raw: &str) -> Result<Self, Error>;
}

/// Convert and store the given raw value in a scalar field.
pub fn assign<V: FromKeywordValue>(field: &mut V, raw: &str) -> Result<(), Error> {
  V::from_keyword_value(raw).map(|v| *field = v)
}

/// Convert and append the given raw value to a collection field.
pub fn push<V: FromKeywordValue>(field: &mut Vec<V>, raw: &str) -> Result<(), Error> {
  V::from_keyword_value(raw).map(|v| field.push(v))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeywordMatch {
  /// The keyword itself.
  Exact(&'static str),
  /// `PREFIXn` with `n` a positive integer, e.g. `NAXISn`.
  Indexed(&'static str),
}

/// A candidate source keyword, with its priority (lower first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordSource {
  matcher: KeywordMatch,
  priority: u16,
}

impl KeywordSource {
  pub const fn new(keyword: &'static str, priority: u16) -> Self {
    Self {
      matcher: KeywordMatch::Exact(keyword),
      priority,
    }
  }

  /// Matches all keywords made of the given prefix followed by a positive integer.
  pub const fn indexed(prefix: &'static str, priority: u16) -> Self {
    Self {
      matcher: KeywordMatch::Indexed(prefix),
      priority,
    }
  }

  pub fn priority(&self) -> u16 {
    self.priority
  }

  pub fn matches(&self, keyword: &str) -> bool {
    match self.matcher {
      KeywordMatch::Exact(kw) => kw == keyword,
      KeywordMatch::Indexed(prefix) => keyword
        .strip_prefix(prefix)
        .and_then(|n| n.parse::<u16>().ok().filter(|n| *n > 0))
        .is_some(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Scalar,
  Collection,
}

/// Converts a raw value and stores it in the field of `T`.
pub type Assign<T> = fn(&mut T, &str) -> Result<(), Error>;

/// Describes how a field of `T` is populated.
pub struct FieldBinding<T> {
  field: &'static str,
  sources: &'static [KeywordSource],
  kind: FieldKind,
  assign: Assign<T>,
}

impl<T> FieldBinding<T> {
  pub const fn scalar(
    field: &'static str,
    sources: &'static [KeywordSource],
    assign: Assign<T>,
  ) -> Self {
    Self {
      field,
      sources,
      kind: FieldKind::Scalar,
      assign,
    }
  }

  pub const fn collection(
    field: &'static str,
    sources: &'static [KeywordSource],
    assign: Assign<T>,
  ) -> Self {
    Self {
      field,
      sources,
      kind: FieldKind::Collection,
      assign,
    }
  }

  pub fn field(&self) -> &'static str {
    self.field
  }

  pub fn kind(&self) -> FieldKind {
    self.kind
  }

  fn candidates(&self) -> Candidates {
    if self.sources.is_empty() {
      Candidates::FieldName(self.field.to_ascii_uppercase())
    } else {
      let mut sources = self.sources.to_vec();
      sources.sort_by_key(KeywordSource::priority);
      Candidates::Declared(sources)
    }
  }
}

enum Candidates {
  Declared(Vec<KeywordSource>),
  FieldName(String),
}

impl Candidates {
  fn matches(&self, keyword: &str) -> bool {
    match self {
      Self::Declared(sources) => sources.iter().any(|s| s.matches(keyword)),
      Self::FieldName(name) => name == keyword,
    }
  }
}

/// A non fatal conversion failure.
#[derive(Debug, Clone, PartialEq)]
pub struct BindDiagnostic {
  pub field: &'static str,
  pub keyword: String,
  pub raw: String,
  pub message: String,
}

/// Result of a binding: the populated value plus the conversion failures.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound<T> {
  pub value: T,
  pub diagnostics: Vec<BindDiagnostic>,
}

impl<T> Bound<T> {
  pub fn into_value(self) -> T {
    self.value
  }

  /// `true` if all conversions succeeded.
  pub fn is_clean(&self) -> bool {
    self.diagnostics.is_empty()
  }
}

/// Populate a new `T` from the records of the given header.
pub fn bind<T: BindKeywords>(header: &Header) -> Bound<T> {
  let mut value = T::default();
  let mut diagnostics = Vec::new();
  for binding in T::FIELDS {
    let candidates = binding.candidates();
    let mut matching = header.iter().filter(|r| candidates.matches(r.keyword()));
    let selected: Vec<&HeaderRecord> = match binding.kind {
      FieldKind::Scalar => matching.next().into_iter().collect(),
      FieldKind::Collection => matching.collect(),
    };
    for record in selected {
      let raw = record.value_or_comment().unwrap_or_default();
      if let Err(e) = (binding.assign)(&mut value, raw) {
        warn!(
          "Field '{}' not bound from keyword '{}' (value: '{}'): {}",
          binding.field,
          record.keyword(),
          raw,
          e
        );
        diagnostics.push(BindDiagnostic {
          field: binding.field,
          keyword: String::from(record.keyword()),
          raw: String::from(raw),
          message: e.to_string(),
        });
      }
    }
  }
  Bound { value, diagnostics }
}

// Converters

/// FITS logical: only `T` is true.
impl FromKeywordValue for bool {
  fn from_keyword_value(raw: &str) -> Result<Self, Error> {
    Ok(raw == "T")
  }
}

/// Strip one layer of surrounding quotes. Trailing spaces inside the quotes are not significant.
impl FromKeywordValue for String {
  fn from_keyword_value(raw: &str) -> Result<Self, Error> {
    let unquoted = raw
      .strip_prefix(QUOTE)
      .and_then(|s| s.strip_suffix(QUOTE))
      .map(str::trim_end)
      .unwrap_or(raw);
    Ok(String::from(unquoted))
  }
}

macro_rules! impl_from_keyword_value_int {
  ($($t:ty),*) => {
    $(
      impl FromKeywordValue for $t {
        fn from_keyword_value(raw: &str) -> Result<Self, Error> {
          raw
            .trim()
            .parse::<$t>()
            .map_err(|_| new_unexpected_value(stringify!($t), raw))
        }
      }
    )*
  };
}

impl_from_keyword_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

macro_rules! impl_from_keyword_value_real {
  ($($t:ty),*) => {
    $(
      /// Accepts the FITS `D` exponent.
      impl FromKeywordValue for $t {
        fn from_keyword_value(raw: &str) -> Result<Self, Error> {
          raw
            .trim()
            .replace(['D', 'd'], "E")
            .parse::<$t>()
            .map_err(|_| new_unexpected_value(stringify!($t), raw))
        }
      }
    )*
  };
}

impl_from_keyword_value_real!(f32, f64);

impl FromKeywordValue for BitPix {
  fn from_keyword_value(raw: &str) -> Result<Self, Error> {
    i64::from_keyword_value(raw).and_then(BitPix::from_value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Default, PartialEq)]
  struct Axes {
    lengths: Vec<u32>,
  }

  impl BindKeywords for Axes {
    const FIELDS: &'static [FieldBinding<Self>] = &[FieldBinding::collection(
      "lengths",
      &[KeywordSource::new("NAXIS1", 1), KeywordSource::new("NAXIS2", 2)],
      |a: &mut Axes, raw: &str| push(&mut a.lengths, raw),
    )];
  }

  #[derive(Debug, Default, PartialEq)]
  struct Observation {
    object: String,
    exptime: f64,
    simple: bool,
    bitpix: i16,
    history: Vec<String>,
  }

  impl BindKeywords for Observation {
    const FIELDS: &'static [FieldBinding<Self>] = &[
      FieldBinding::scalar("object", &[], |o: &mut Observation, raw: &str| {
        assign(&mut o.object, raw)
      }),
      FieldBinding::scalar(
        "exptime",
        &[KeywordSource::new("EXPOSURE", 2), KeywordSource::new("EXPTIME", 1)],
        |o: &mut Observation, raw: &str| assign(&mut o.exptime, raw),
      ),
      FieldBinding::scalar("simple", &[], |o: &mut Observation, raw: &str| {
        assign(&mut o.simple, raw)
      }),
      FieldBinding::scalar("bitpix", &[], |o: &mut Observation, raw: &str| {
        assign(&mut o.bitpix, raw)
      }),
      FieldBinding::collection("history", &[], |o: &mut Observation, raw: &str| {
        push(&mut o.history, raw)
      }),
    ];
  }

  fn header(records: &[(&str, Option<&str>, Option<&str>)]) -> Header {
    records
      .iter()
      .map(|(k, v, c)| HeaderRecord::create(k, *v, *c).unwrap())
      .collect()
  }

  #[test]
  fn test_bind_collection() {
    let h = header(&[
      ("SIMPLE", Some("T"), None),
      ("NAXIS1", Some("16"), None),
      ("NAXIS2", Some("16"), None),
    ]);
    let bound = bind::<Axes>(&h);
    assert!(bound.is_clean());
    assert_eq!(bound.value.lengths, vec![16, 16]);
  }

  #[test]
  fn test_bind_header_order() {
    // Header order prevails over the priority order.
    let h = header(&[("NAXIS2", Some("3"), None), ("NAXIS1", Some("7"), None)]);
    assert_eq!(bind::<Axes>(&h).value.lengths, vec![3, 7]);

    let h = header(&[
      ("EXPOSURE", Some("10.0"), None),
      ("EXPTIME", Some("20.0"), None),
    ]);
    assert_eq!(bind::<Observation>(&h).value.exptime, 10.0);
  }

  #[test]
  fn test_bind_scalars() {
    let h = header(&[
      ("SIMPLE", Some("T"), None),
      ("BITPIX", Some("-32"), None),
      ("OBJECT", Some("'M31     '"), Some("Andromeda")),
      ("EXPTIME", Some("1.5D2"), None),
      ("HISTORY", None, Some("first")),
      ("HISTORY", None, Some("second")),
    ]);
    let bound = bind::<Observation>(&h);
    assert!(bound.is_clean());
    assert_eq!(
      bound.value,
      Observation {
        object: String::from("M31"),
        exptime: 150.0,
        simple: true,
        bitpix: -32,
        history: vec![String::from("first"), String::from("second")],
      }
    );
  }

  #[test]
  fn test_bind_conversion_failure() {
    let h = header(&[
      ("SIMPLE", Some("F"), None),
      ("BITPIX", Some("'abc'"), None),
      ("EXPTIME", Some("2.0"), None),
    ]);
    let bound = bind::<Observation>(&h);
    assert!(!bound.value.simple);
    assert_eq!(bound.value.bitpix, 0);
    assert_eq!(bound.value.exptime, 2.0);
    assert_eq!(bound.diagnostics.len(), 1);
    assert_eq!(bound.diagnostics[0].field, "bitpix");
    assert_eq!(bound.diagnostics[0].keyword, "BITPIX");
  }

  #[test]
  fn test_bind_idempotent() {
    let h = header(&[
      ("OBJECT", Some("'NGC 1'"), None),
      ("HISTORY", None, Some("a")),
      ("EXPTIME", Some("3"), None),
    ]);
    assert_eq!(bind::<Observation>(&h), bind::<Observation>(&h));
  }

  #[test]
  fn test_indexed_source() {
    let s = KeywordSource::indexed("NAXIS", 1);
    assert!(s.matches("NAXIS1"));
    assert!(s.matches("NAXIS999"));
    assert!(!s.matches("NAXIS"));
    assert!(!s.matches("NAXIS0"));
    assert!(!s.matches("NAXISA"));
  }

  #[test]
  fn test_converters() {
    assert!(bool::from_keyword_value("T").unwrap());
    assert!(!bool::from_keyword_value("F").unwrap());
    assert!(!bool::from_keyword_value("true").unwrap());
    assert_eq!(String::from_keyword_value("'x'").unwrap(), "x");
    assert_eq!(String::from_keyword_value("''x''").unwrap(), "'x'");
    assert_eq!(String::from_keyword_value("plain").unwrap(), "plain");
    assert_eq!(u16::from_keyword_value("+2").unwrap(), 2);
    assert!(u16::from_keyword_value("-2").is_err());
    assert_eq!(f64::from_keyword_value("-1.0E-2").unwrap(), -0.01);
    assert_eq!(BitPix::from_keyword_value("16").unwrap(), BitPix::I16);
    assert!(BitPix::from_keyword_value("7").is_err());
  }
}
