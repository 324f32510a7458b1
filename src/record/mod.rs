use std::{collections::BTreeSet, fmt};

use biblatex::{Bibliography, Entry};
use serde_json::json;

use crate::{
    error::{Error, Result},
    highwire::TagMap,
};

pub mod author;
pub mod date;

pub use author::{Author, split_authors};
pub use date::{DateParts, normalize_date};

/// The citation category a record was classified as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Shape {
    Journal,
    Conference,
    Preprint,
    #[default]
    Unclassified,
}

impl Shape {
    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Journal => "journal",
            Shape::Conference => "conference",
            Shape::Preprint => "preprint",
            Shape::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalInfo {
    pub journal: String,
    pub abbreviation: String,
    pub volume: String,
    pub issue: String,
    pub first_page: String,
    /// Empty when the source gave no last page.
    pub last_page: String,
}

impl JournalInfo {
    /// `first` or `first--last`.
    pub fn pages(&self) -> String {
        if self.last_page.is_empty() {
            self.first_page.clone()
        } else {
            format!("{}--{}", self.first_page, self.last_page)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConferenceInfo {
    pub conference: String,
    pub abbreviation: String,
    pub location: String,
    pub proceedings: String,
    pub paper_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprintInfo {
    /// arXiv identifier, e.g. `2008.01234`.
    pub id: String,
    pub pdf_url: String,
}

/// Shape-specific fields. Only the variant matching the shape exists, so fields of
/// different shapes can never be mixed on one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Venue {
    Journal(JournalInfo),
    Conference(ConferenceInfo),
    Preprint(PreprintInfo),
    #[default]
    Unclassified,
}

impl Venue {
    pub fn shape(&self) -> Shape {
        match self {
            Venue::Journal(_) => Shape::Journal,
            Venue::Conference(_) => Shape::Conference,
            Venue::Preprint(_) => Shape::Preprint,
            Venue::Unclassified => Shape::Unclassified,
        }
    }
}

/// Journal records carry a normalised date; conference records keep the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PublicationDate {
    Parts(DateParts),
    Raw(String),
    #[default]
    Unknown,
}

impl PublicationDate {
    /// Best-effort numeric form, used for exports.
    pub fn to_iso(&self) -> Option<String> {
        match self {
            PublicationDate::Parts(p) => Some(p.to_iso()),
            PublicationDate::Raw(r) => normalize_date(r).ok().map(|p| p.to_iso()),
            PublicationDate::Unknown => None,
        }
    }
}

impl fmt::Display for PublicationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicationDate::Parts(p) => fmt::Display::fmt(p, f),
            PublicationDate::Raw(r) => f.write_str(r),
            PublicationDate::Unknown => Ok(()),
        }
    }
}

/// One or many tags, as accepted by [`CitationRecord::add_tags`] and
/// [`CitationRecord::remove_tags`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagInput {
    One(String),
    Many(Vec<String>),
}

impl TagInput {
    fn into_vec(self) -> Vec<String> {
        match self {
            TagInput::One(t) => vec![t],
            TagInput::Many(ts) => ts,
        }
    }
}

impl From<&str> for TagInput {
    fn from(t: &str) -> Self {
        TagInput::One(t.to_string())
    }
}

impl From<String> for TagInput {
    fn from(t: String) -> Self {
        TagInput::One(t)
    }
}

impl From<Vec<String>> for TagInput {
    fn from(ts: Vec<String>) -> Self {
        TagInput::Many(ts)
    }
}

impl From<Vec<&str>> for TagInput {
    fn from(ts: Vec<&str>) -> Self {
        TagInput::Many(ts.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for TagInput {
    fn from(ts: &[&str]) -> Self {
        TagInput::Many(ts.iter().map(|t| t.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TagInput {
    fn from(ts: [&str; N]) -> Self {
        TagInput::Many(ts.iter().map(|t| t.to_string()).collect())
    }
}

/// A single article's citation data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationRecord {
    name: String,
    pub title: String,
    pub authors: Vec<Author>,
    pub publisher: String,
    pub pub_date: PublicationDate,
    pub doi: String,
    pub venue: Venue,
    tags: BTreeSet<String>,
    pdf_name: String,
    pub library_path: String,
    /// The tag mapping the record was built from.
    pub source: TagMap,
}

impl CitationRecord {
    /// An unclassified record with every field empty.
    pub fn new(name: impl Into<String>) -> Self {
        CitationRecord {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.venue.shape()
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn pdf_name(&self) -> &str {
        &self.pdf_name
    }

    pub fn journal(&self) -> Option<&JournalInfo> {
        match &self.venue {
            Venue::Journal(j) => Some(j),
            _ => None,
        }
    }

    pub fn conference(&self) -> Option<&ConferenceInfo> {
        match &self.venue {
            Venue::Conference(c) => Some(c),
            _ => None,
        }
    }

    pub fn preprint(&self) -> Option<&PreprintInfo> {
        match &self.venue {
            Venue::Preprint(p) => Some(p),
            _ => None,
        }
    }

    pub(crate) fn set_tags(&mut self, tags: BTreeSet<String>) {
        self.tags = tags;
    }

    /// Insert one or many tags. Blank tags are rejected and nothing is inserted.
    pub fn add_tags(&mut self, tags: impl Into<TagInput>) -> Result<()> {
        let tags = tags.into().into_vec();
        if let Some(bad) = tags.iter().find(|t| t.trim().is_empty()) {
            return Err(Error::InvalidTagInput(format!(
                "tags must be non-blank strings, got {bad:?}"
            )));
        }
        self.tags.extend(tags);
        Ok(())
    }

    /// Remove one or many tags, in order.
    ///
    /// Stops at the first tag that is not present and reports it; tags removed before
    /// that point stay removed.
    pub fn remove_tags(&mut self, tags: impl Into<TagInput>) -> Result<()> {
        for tag in tags.into().into_vec() {
            if !self.tags.remove(&tag) {
                return Err(Error::TagNotFound(tag));
            }
        }
        Ok(())
    }

    pub fn set_pdf_name(&mut self, name: impl Into<String>) {
        self.pdf_name = name.into();
    }

    /// `First [Middle ]Last and First [Middle ]Last ...`
    pub fn author_list(&self) -> String {
        self.authors
            .iter()
            .map(Author::to_string)
            .collect::<Vec<_>>()
            .join(" and ")
    }

    /// Plain labelled citation block. Only journal records have one.
    pub fn render_citation_string(&self) -> Option<String> {
        let Venue::Journal(j) = &self.venue else {
            return None;
        };
        let (year, month) = match &self.pub_date {
            PublicationDate::Parts(p) => (p.year.as_str(), p.month.as_str()),
            _ => ("", ""),
        };
        let items = [
            format!("@article{{{}", self.name),
            format!("\tauthor  = \"{}\"", self.author_list()),
            format!("\ttitle   = \"{}\"", self.title),
            format!("\tyear    = \"{year}\""),
            format!("\tmonth   = \"{month}\""),
            format!("\tjournal = \"{}\"", j.journal),
            format!("\tvolume  = \"{}\"", j.volume),
            format!("\tnumber  = \"{}\"", j.issue),
            format!("\tpages   = \"{}\"", j.pages()),
        ];
        Some(items.join(",\n") + "\n}")
    }

    /// BibLaTeX entry keyed by the record name.
    pub fn to_biblatex(&self) -> Result<Entry> {
        let mut fields: Vec<(&str, String)> = Vec::new();
        fields.push(("title", self.title.clone()));
        if !self.authors.is_empty() {
            fields.push(("author", self.author_list()));
        }
        if let Some(d) = self.pub_date.to_iso() {
            fields.push(("date", d));
        }

        let entry_ty = match &self.venue {
            Venue::Journal(j) => {
                fields.push(("journaltitle", j.journal.clone()));
                if j.abbreviation != j.journal {
                    fields.push(("shortjournal", j.abbreviation.clone()));
                }
                fields.push(("volume", j.volume.clone()));
                fields.push(("number", j.issue.clone()));
                fields.push(("pages", j.pages()));
                "@article"
            }
            Venue::Conference(c) => {
                fields.push(("booktitle", c.proceedings.clone()));
                fields.push(("eventtitle", c.conference.clone()));
                fields.push(("venue", c.location.clone()));
                fields.push(("number", c.paper_number.clone()));
                "@inproceedings"
            }
            Venue::Preprint(p) => {
                fields.push(("eprinttype", "arXiv".to_string()));
                fields.push(("eprint", p.id.clone()));
                fields.push(("url", p.pdf_url.clone()));
                "@online"
            }
            Venue::Unclassified => {
                return Err(Error::Export(format!(
                    "record `{}` has no citation shape",
                    self.name
                )));
            }
        };
        fields.push(("publisher", self.publisher.clone()));
        fields.push(("doi", self.doi.clone()));
        if !self.tags.is_empty() {
            fields.push((
                "keywords",
                self.tags.iter().cloned().collect::<Vec<_>>().join(", "),
            ));
        }

        let mut out = String::new();
        out.push_str(entry_ty);
        out.push('{');
        out.push_str(&self.name);
        out.push_str(",\n");
        for (k, v) in fields.into_iter().filter(|(_, v)| !v.is_empty()) {
            out.push_str("    ");
            out.push_str(k);
            out.push_str(" = {");
            out.push_str(&escape_braces(&v));
            out.push_str("},\n");
        }
        out.push_str("}\n");

        let bib = Bibliography::parse(&out)
            .map_err(|e| Error::Export(format!("failed to parse constructed BibLaTeX: {e}")))?;
        bib.iter()
            .next()
            .cloned()
            .ok_or_else(|| Error::Export(format!("no entry built for `{}`", self.name)))
    }

    /// Snapshot of the record for machine consumption.
    pub fn to_json(&self) -> serde_json::Value {
        let venue = match &self.venue {
            Venue::Journal(j) => json!({
                "journal": j.journal,
                "abbreviation": j.abbreviation,
                "volume": j.volume,
                "issue": j.issue,
                "first_page": j.first_page,
                "last_page": j.last_page,
            }),
            Venue::Conference(c) => json!({
                "conference": c.conference,
                "abbreviation": c.abbreviation,
                "location": c.location,
                "proceedings": c.proceedings,
                "paper_number": c.paper_number,
            }),
            Venue::Preprint(p) => json!({
                "arxiv_id": p.id,
                "pdf_url": p.pdf_url,
            }),
            Venue::Unclassified => serde_json::Value::Null,
        };
        let pub_date = match &self.pub_date {
            PublicationDate::Parts(p) => json!({ "year": p.year, "month": p.month, "day": p.day }),
            PublicationDate::Raw(r) => json!(r),
            PublicationDate::Unknown => serde_json::Value::Null,
        };
        json!({
            "name": self.name,
            "shape": self.shape().as_str(),
            "title": self.title,
            "authors": self.authors.iter().map(|a| json!({
                "first": a.first,
                "middle": a.middle,
                "last": a.last,
            })).collect::<Vec<_>>(),
            "publisher": self.publisher,
            "pub_date": pub_date,
            "date_label": self.pub_date.to_string(),
            "doi": self.doi,
            "venue": venue,
            "tags": self.tags,
            "pdf_name": self.pdf_name,
            "library_path": self.library_path,
        })
    }
}

fn escape_braces(s: &str) -> String {
    s.replace('{', "\\{").replace('}', "\\}")
}
