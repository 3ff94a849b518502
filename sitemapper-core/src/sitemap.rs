//! Sitemap item editing: multi-key sorting, validated field edits, the
//! working-state file format and the final XML document.

use crate::error::{ProjectError, SortError, ValidationError};
use chrono::{Datelike, NaiveDate};
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use sitemapper_scanner::{ChangeFreq, SitemapItem};
use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

const FIELD_SEPARATOR: &str = "||";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Url,
    Lastmod,
    Changefreq,
    Priority,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Url => "url",
            SortField::Lastmod => "lastmod",
            SortField::Changefreq => "changefreq",
            SortField::Priority => "priority",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(SortField::Url),
            "lastmod" => Ok(SortField::Lastmod),
            "changefreq" => Ok(SortField::Changefreq),
            "priority" => Ok(SortField::Priority),
            other => Err(SortError::UnknownField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// Ordered sort keys, primary key first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec(pub Vec<SortKey>);

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec(vec![SortKey::ascending(SortField::Url)])
    }
}

impl SortSpec {
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `field;0|1` entries joined by `||`, 1 meaning descending.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|key| format!("{};{}", key.field, u8::from(key.descending)))
            .collect::<Vec<_>>()
            .join(FIELD_SEPARATOR)
    }

    pub fn decode(line: &str) -> Result<Self, SortError> {
        let mut keys = Vec::new();
        for entry in line.split(FIELD_SEPARATOR).filter(|e| !e.is_empty()) {
            let (field, direction) = entry
                .split_once(';')
                .ok_or_else(|| SortError::UnknownDirection(entry.to_string()))?;
            let descending = match direction {
                "0" => false,
                "1" => true,
                other => return Err(SortError::UnknownDirection(other.to_string())),
            };
            keys.push(SortKey {
                field: field.parse()?,
                descending,
            });
        }
        Ok(SortSpec(keys))
    }
}

fn numeric_priority(item: &SitemapItem) -> Result<Option<f64>, SortError> {
    if item.priority.is_empty() {
        return Ok(None);
    }
    match item.priority.parse::<f64>() {
        Ok(p) if p.is_finite() => Ok(Some(p)),
        _ => Err(SortError::MalformedPriority {
            url: item.url.clone(),
            priority: item.priority.clone(),
        }),
    }
}

fn compare_field(field: SortField, a: &SitemapItem, b: &SitemapItem) -> Ordering {
    match field {
        SortField::Url => a.url.cmp(&b.url),
        SortField::Lastmod => a.lastmod.cmp(&b.lastmod),
        SortField::Changefreq => a.changefreq.as_str().cmp(b.changefreq.as_str()),
        // Priorities were checked before the sort started
        SortField::Priority => {
            let pa = a.priority.parse::<f64>().ok();
            let pb = b.priority.parse::<f64>().ok();
            pa.partial_cmp(&pb).unwrap_or(Ordering::Equal)
        }
    }
}

/// Sort `items` by `spec`.
///
/// Equivalent to successive stable sorts from the lowest key up to the
/// primary one. Priority compares numerically, with empty priorities first.
/// On error `items` is left untouched.
pub fn sort_items(items: &mut Vec<SitemapItem>, spec: &SortSpec) -> Result<(), SortError> {
    if spec.keys().iter().any(|key| key.field == SortField::Priority) {
        for item in items.iter() {
            numeric_priority(item)?;
        }
    }

    let mut sorted = items.clone();
    sorted.sort_by(|a, b| {
        for key in spec.keys() {
            let ordering = compare_field(key.field, a, b);
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    *items = sorted;
    Ok(())
}

/// A validated value for one of the editable item fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Lastmod(String),
    Changefreq(ChangeFreq),
    Priority(String),
}

impl FieldEdit {
    pub fn apply(self, item: &mut SitemapItem) {
        match self {
            FieldEdit::Lastmod(value) => item.lastmod = value,
            FieldEdit::Changefreq(value) => item.changefreq = value,
            FieldEdit::Priority(value) => item.priority = value,
        }
    }
}

/// Check a user-supplied value for `field`. Empty `lastmod` and `priority`
/// values clear the field.
pub fn validate_field(field: &str, value: &str) -> Result<FieldEdit, ValidationError> {
    match field {
        "lastmod" => validate_lastmod(value).map(FieldEdit::Lastmod),
        "changefreq" => value
            .parse::<ChangeFreq>()
            .map(FieldEdit::Changefreq)
            .map_err(|_| ValidationError::Changefreq(value.to_string())),
        "priority" => validate_priority(value).map(FieldEdit::Priority),
        other => Err(ValidationError::UnknownField(other.to_string())),
    }
}

fn validate_lastmod(value: &str) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Ok(String::new());
    }

    let invalid = || ValidationError::Lastmod(value.to_string());
    let well_formed = value.len() == 10
        && value
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(invalid());
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    if date.year() <= 1900 {
        return Err(invalid());
    }
    Ok(value.to_string())
}

fn validate_priority(value: &str) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Ok(String::new());
    }
    match value.parse::<f64>() {
        Ok(p) if (0.0..=1.0).contains(&p) => Ok(value.to_string()),
        _ => Err(ValidationError::Priority(value.to_string())),
    }
}

/// The editable sitemap: items plus the sort they were last ordered by.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkingState {
    pub sort: SortSpec,
    pub items: Vec<SitemapItem>,
}

impl WorkingState {
    /// Items from a fresh build, ordered by the default sort.
    pub fn from_build(mut items: Vec<SitemapItem>) -> Result<Self, SortError> {
        let sort = SortSpec::default();
        sort_items(&mut items, &sort)?;
        Ok(Self { sort, items })
    }

    /// Reorder the items. Neither the items nor the stored sort change on
    /// failure.
    pub fn sort(&mut self, spec: SortSpec) -> Result<(), SortError> {
        sort_items(&mut self.items, &spec)?;
        self.sort = spec;
        Ok(())
    }

    pub fn edit(&mut self, url: &str, field: &str, value: &str) -> Result<&SitemapItem, ProjectError> {
        let edit = validate_field(field, value)?;
        let item = self
            .items
            .iter_mut()
            .find(|item| item.url == url)
            .ok_or_else(|| ProjectError::UnknownItem(url.to_string()))?;
        edit.apply(item);
        Ok(item)
    }

    /// Line 1 is the sort spec (possibly empty), then one
    /// `url||lastmod||changefreq||priority` line per item.
    pub fn encode(&self) -> String {
        let mut out = self.sort.encode();
        out.push('\n');
        for item in &self.items {
            out.push_str(
                &[
                    item.url.as_str(),
                    item.lastmod.as_str(),
                    item.changefreq.as_str(),
                    item.priority.as_str(),
                ]
                .join(FIELD_SEPARATOR),
            );
            out.push('\n');
        }
        out
    }

    pub fn decode(content: &str) -> Result<Self, ProjectError> {
        let mut lines = content.lines().enumerate();

        let sort = match lines.next() {
            Some((_, line)) => SortSpec::decode(line).map_err(|e| ProjectError::MalformedState {
                line: 1,
                reason: e.to_string(),
            })?,
            None => SortSpec(Vec::new()),
        };

        let mut items = Vec::new();
        for (index, line) in lines {
            if line.is_empty() {
                continue;
            }
            let malformed = |reason: String| ProjectError::MalformedState {
                line: index + 1,
                reason,
            };

            // Only the URL may itself contain the separator
            let mut parts: Vec<&str> = line.rsplitn(4, FIELD_SEPARATOR).collect();
            parts.reverse();
            let &[url, lastmod, changefreq, priority] = parts.as_slice() else {
                return Err(malformed(format!("expected 4 fields, found {}", parts.len())));
            };

            items.push(SitemapItem {
                url: url.to_string(),
                lastmod: lastmod.to_string(),
                changefreq: changefreq.parse().map_err(malformed)?,
                priority: priority.to_string(),
            });
        }

        Ok(Self { sort, items })
    }
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(escape(text))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}

/// Render the final `sitemap.xml`. Empty optional fields are omitted.
pub fn render_xml(items: &[SitemapItem]) -> io::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NAMESPACE)]),
    ))?;

    for item in items {
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        write_text_element(&mut writer, "loc", &item.url)?;
        if !item.lastmod.is_empty() {
            write_text_element(&mut writer, "lastmod", &item.lastmod)?;
        }
        if item.changefreq != ChangeFreq::Unset {
            write_text_element(&mut writer, "changefreq", item.changefreq.as_str())?;
        }
        if !item.priority.is_empty() {
            write_text_element(&mut writer, "priority", &item.priority)?;
        }
        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;

    let mut xml = writer.into_inner();
    xml.push(b'\n');
    String::from_utf8(xml).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
