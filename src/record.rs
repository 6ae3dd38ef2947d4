//! Parsed records.
//!
//! A [`Record`] is one logical row: an ordered list of optional fields. An
//! absent field (`None`, written as nothing between two separators) is
//! distinct from an empty one (`Some("")`, written as `""`).
//!
//! When headers are in use every record shares the same frozen header list
//! and fields can be looked up by name. Duplicate header names are allowed;
//! name lookups resolve to the first occurrence.
//!
//! ```rust
//! use csv_stream::{parse_str, Headers, ParseOptions};
//!
//! let records = parse_str(
//!     "id,name\n1,Alice\n",
//!     ParseOptions::new().with_headers(Headers::FirstRow),
//! )
//! .unwrap();
//!
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].get_by_header("name"), Some("Alice"));
//! ```

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// Shared, immutable header names.
pub type HeaderList = Arc<[Option<String>]>;

/// One row of delimited text.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<Option<String>>,
    headers: Option<HeaderList>,
    header_row: bool,
    line: usize,
    raw_fields: Option<Vec<Option<String>>>,
}

impl Record {
    /// Creates a header-less record.
    ///
    /// ```rust
    /// use csv_stream::Record;
    ///
    /// let record = Record::new(vec![Some("a".to_string()), None]);
    /// assert_eq!(record.len(), 2);
    /// assert_eq!(record.get(0), Some("a"));
    /// assert_eq!(record.get(1), None);
    /// ```
    #[must_use]
    pub fn new(fields: Vec<Option<String>>) -> Self {
        Record {
            fields,
            ..Default::default()
        }
    }

    pub(crate) fn parsed(
        fields: Vec<Option<String>>,
        headers: Option<HeaderList>,
        line: usize,
        raw_fields: Option<Vec<Option<String>>>,
    ) -> Self {
        Record {
            fields,
            headers,
            header_row: false,
            line,
            raw_fields,
        }
    }

    pub(crate) fn header_row(
        headers: HeaderList,
        fields: Vec<Option<String>>,
        line: usize,
        raw_fields: Option<Vec<Option<String>>>,
    ) -> Self {
        Record {
            fields,
            headers: Some(headers),
            header_row: true,
            line,
            raw_fields,
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[Option<String>] {
        &self.fields
    }

    #[must_use]
    pub fn into_fields(self) -> Vec<Option<String>> {
        self.fields
    }

    /// The field at `index`; `None` when absent or out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).and_then(|field| field.as_deref())
    }

    /// The field under the first header named `name`.
    #[must_use]
    pub fn get_by_header(&self, name: &str) -> Option<&str> {
        let headers = self.headers.as_ref()?;
        let index = headers
            .iter()
            .position(|header| header.as_deref() == Some(name))?;
        self.get(index)
    }

    #[must_use]
    pub fn headers(&self) -> Option<&[Option<String>]> {
        self.headers.as_deref()
    }

    /// `true` for the header row itself (only yielded with `return_headers`).
    #[must_use]
    pub fn is_header_row(&self) -> bool {
        self.header_row
    }

    /// Line number of the record in the input; `0` for records built by hand.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// The fields exactly as parsed, present when `unconverted_fields` is set.
    #[must_use]
    pub fn raw_fields(&self) -> Option<&[Option<String>]> {
        self.raw_fields.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.fields.iter().map(|field| field.as_deref())
    }

    /// Header name → field, in header order. A duplicated name keeps its
    /// first field, an absent header name maps to `""`, and fields without a
    /// header are left out. Empty for header-less records.
    ///
    /// ```rust
    /// use csv_stream::{parse_str, Headers, ParseOptions};
    ///
    /// let records = parse_str(
    ///     "a,b,a\n1,2,3\n",
    ///     ParseOptions::new().with_headers(Headers::FirstRow),
    /// )
    /// .unwrap();
    /// let map = records[0].to_map();
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(map["a"].as_deref(), Some("1"));
    /// ```
    #[must_use]
    pub fn to_map(&self) -> IndexMap<String, Option<String>> {
        let mut map = IndexMap::new();
        if let Some(headers) = &self.headers {
            for (index, header) in headers.iter().enumerate() {
                let key = header.clone().unwrap_or_default();
                let value = self.fields.get(index).cloned().flatten();
                map.entry(key).or_insert(value);
            }
        }
        map
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a Option<String>;
    type IntoIter = std::slice::Iter<'a, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Header-less records serialize as a sequence, records with headers as a
/// map (see [`Record::to_map`]).
impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.headers.is_some() && !self.header_row {
            let map = self.to_map();
            let mut state = serializer.serialize_map(Some(map.len()))?;
            for (key, value) in &map {
                state.serialize_entry(key, value)?;
            }
            state.end()
        } else {
            let mut seq = serializer.serialize_seq(Some(self.fields.len()))?;
            for field in &self.fields {
                seq.serialize_element(field)?;
            }
            seq.end()
        }
    }
}
