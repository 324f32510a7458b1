use std::collections::BTreeSet;

use crate::{
    error::{AttemptFailure, Error, FieldProblem, Result},
    highwire::{AUTHOR_TAG, TagMap, TagValue},
    record::{
        Author, CitationRecord, ConferenceInfo, JournalInfo, PreprintInfo, PublicationDate,
        Shape, Venue, normalize_date, split_authors,
    },
    report::{Reporter, TracingReporter},
};

/// Fields every shape needs.
struct Common {
    title: String,
    authors: Vec<Author>,
}

/// Everything a successful attempt contributes beyond the common fields.
struct Classified {
    venue: Venue,
    publisher: String,
    doi: String,
    pub_date: PublicationDate,
}

type Attempt = fn(&TagMap) -> std::result::Result<Classified, FieldProblem>;

/// Classification attempts in priority order. The first that succeeds decides the shape.
static ATTEMPTS: &[(Shape, Attempt)] = &[
    (Shape::Journal, as_journal),
    (Shape::Conference, as_conference),
    (Shape::Preprint, as_preprint),
];

/// Classify `map` with the default `tracing` reporter.
pub fn classify_from_mapping<I, S>(map: TagMap, name: &str, tags: I) -> Result<CitationRecord>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    classify(map, name, tags, &TracingReporter)
}

/// Build a [`CitationRecord`] named `name` from an extracted tag mapping.
///
/// Tries journal, then conference, then preprint; the record only ever holds the fields of
/// the shape that matched. Fails with [`Error::InsufficientMetadata`] when none does.
pub fn classify<I, S>(
    map: TagMap,
    name: &str,
    tags: I,
    reporter: &dyn Reporter,
) -> Result<CitationRecord>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let insufficient = |failures: Vec<AttemptFailure>| Error::InsufficientMetadata {
        name: name.to_string(),
        failures,
    };
    let all_fail = |problem: FieldProblem| {
        ATTEMPTS
            .iter()
            .map(|(shape, _)| AttemptFailure {
                shape: *shape,
                problem: problem.clone(),
            })
            .collect::<Vec<_>>()
    };

    if map.is_empty() {
        return Err(insufficient(all_fail(FieldProblem::Empty)));
    }
    let common = common_fields(&map).map_err(|p| insufficient(all_fail(p)))?;

    let mut failures = Vec::new();
    let mut found = None;
    for (shape, attempt) in ATTEMPTS {
        match attempt(&map) {
            Ok(c) => {
                found = Some(c);
                break;
            }
            Err(problem) => failures.push(AttemptFailure {
                shape: *shape,
                problem,
            }),
        }
    }
    let Some(classified) = found else {
        return Err(insufficient(failures));
    };

    let mut record = CitationRecord::new(name);
    record.title = common.title;
    record.authors = common.authors;
    record.venue = classified.venue;
    record.publisher = classified.publisher;
    record.doi = classified.doi;
    record.pub_date = classified.pub_date;
    record.set_tags(tags.into_iter().map(Into::into).collect::<BTreeSet<_>>());
    record.source = map;

    reporter.shape_detected(name, record.shape());
    Ok(record)
}

fn common_fields(map: &TagMap) -> std::result::Result<Common, FieldProblem> {
    let title = required(map, "title")?;
    let raw_authors = match map.get(AUTHOR_TAG) {
        None => return Err(FieldProblem::Missing(AUTHOR_TAG)),
        Some(TagValue::Single(s)) => vec![s.clone()],
        Some(TagValue::List(v)) => v.clone(),
    };
    if raw_authors.is_empty() {
        return Err(FieldProblem::Missing(AUTHOR_TAG));
    }
    let authors = split_authors(&raw_authors).map_err(|e| FieldProblem::Invalid {
        field: AUTHOR_TAG,
        reason: e.to_string(),
    })?;
    Ok(Common { title, authors })
}

fn as_journal(map: &TagMap) -> std::result::Result<Classified, FieldProblem> {
    let journal = required(map, "journal_title")?;
    let volume = required(map, "volume")?;
    let issue = required(map, "issue")?;
    let publisher = required(map, "publisher")?;
    let doi = required(map, "doi")?;
    let first_page = required(map, "firstpage")?;
    let raw_date = required(map, "publication_date")?;
    let date = normalize_date(&raw_date).map_err(|e| FieldProblem::Invalid {
        field: "publication_date",
        reason: e.to_string(),
    })?;
    let last_page = optional(map, "lastpage")?;
    let abbreviation = match optional(map, "journal_abbrev")? {
        a if a.is_empty() => journal.clone(),
        a => a,
    };

    Ok(Classified {
        venue: Venue::Journal(JournalInfo {
            journal,
            abbreviation,
            volume,
            issue,
            first_page,
            last_page,
        }),
        publisher,
        doi,
        pub_date: PublicationDate::Parts(date),
    })
}

fn as_conference(map: &TagMap) -> std::result::Result<Classified, FieldProblem> {
    let conference = required(map, "conference_title")?;
    let location = required(map, "location")?;
    let proceedings = required(map, "proceedings")?;
    let publisher = required(map, "publisher")?;
    let doi = required(map, "doi")?;
    let raw_date = required(map, "publication_date")?;
    let abbreviation = optional(map, "conference_abbreviation")?;
    let paper_number = optional(map, "firstpage")?;

    Ok(Classified {
        venue: Venue::Conference(ConferenceInfo {
            conference,
            abbreviation,
            location,
            proceedings,
            paper_number,
        }),
        publisher,
        doi,
        pub_date: PublicationDate::Raw(raw_date),
    })
}

fn as_preprint(map: &TagMap) -> std::result::Result<Classified, FieldProblem> {
    let id = required(map, "arxiv_id")?;
    let pdf_url = required(map, "pdf_url")?;

    Ok(Classified {
        venue: Venue::Preprint(PreprintInfo { id, pdf_url }),
        publisher: String::new(),
        doi: String::new(),
        pub_date: PublicationDate::Unknown,
    })
}

fn required(map: &TagMap, tag: &'static str) -> std::result::Result<String, FieldProblem> {
    match map.get(tag) {
        Some(TagValue::Single(s)) => Ok(s.clone()),
        Some(TagValue::List(_)) => Err(FieldProblem::NotScalar(tag)),
        None => Err(FieldProblem::Missing(tag)),
    }
}

/// Absent tags read as empty; a list where a scalar belongs still fails the attempt.
fn optional(map: &TagMap, tag: &'static str) -> std::result::Result<String, FieldProblem> {
    match required(map, tag) {
        Err(FieldProblem::Missing(_)) => Ok(String::new()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        record::DateParts,
        report::{
            NullReporter,
            testing::{Notice, Recorder},
        },
    };

    fn journal_map() -> TagMap {
        TagMap::new()
            .with("title", "Optical vortices")
            .with("author", vec!["Jane Q Doe", "Jane Q Doe", "Bob Lee"])
            .with("journal_title", "Optics Express")
            .with("volume", "28")
            .with("issue", "16")
            .with("publisher", "Optica")
            .with("doi", "10.1364/OE.1.000001")
            .with("firstpage", "23100")
            .with("lastpage", "23110")
            .with("publication_date", "2020/08/06")
    }

    fn conference_map() -> TagMap {
        TagMap::new()
            .with("title", "Fast things")
            .with("author", vec!["Ann Bee"])
            .with("conference_title", "Conference on Lasers")
            .with("conference_abbreviation", "CLEO")
            .with("location", "San Jose")
            .with("proceedings", "CLEO 2020 Proceedings")
            .with("publisher", "Optica")
            .with("doi", "10.1364/CLEO.2020.1")
            .with("firstpage", "SM1A.1")
            .with("publication_date", "2020/05/10")
    }

    #[test]
    fn journal_is_detected() {
        let rec = Recorder::default();
        let record = classify(journal_map(), "doe2020", ["optics"], &rec).unwrap();
        assert_eq!(record.shape(), Shape::Journal);
        assert_eq!(record.name(), "doe2020");
        assert_eq!(record.title, "Optical vortices");
        assert_eq!(
            record.authors,
            vec![Author::new("Jane", "Q", "Doe"), Author::new("Bob", "", "Lee")]
        );
        assert_eq!(
            record.pub_date,
            PublicationDate::Parts(DateParts::new("2020", "Aug.", "06"))
        );
        let j = record.journal().unwrap();
        assert_eq!(j.journal, "Optics Express");
        assert_eq!(j.abbreviation, "Optics Express");
        assert_eq!(j.pages(), "23100--23110");
        assert_eq!(record.publisher, "Optica");
        assert_eq!(record.doi, "10.1364/OE.1.000001");
        assert!(record.tags().contains("optics"));
        assert_eq!(record.source, journal_map());
        assert_eq!(
            rec.notices(),
            vec![Notice::Shape("doe2020".to_string(), Shape::Journal)]
        );
    }

    #[test]
    fn journal_abbreviation_is_used_when_present() {
        let map = journal_map().with("journal_abbrev", "Opt. Express");
        let record = classify(map, "x", Vec::<String>::new(), &NullReporter).unwrap();
        assert_eq!(record.journal().unwrap().abbreviation, "Opt. Express");
    }

    #[test]
    fn last_page_is_optional() {
        let mut map = journal_map();
        map.remove("lastpage");
        let record = classify(map, "x", Vec::<String>::new(), &NullReporter).unwrap();
        assert_eq!(record.journal().unwrap().pages(), "23100");
    }

    #[test]
    fn conference_when_journal_fields_missing() {
        let mut map = conference_map();
        // journal fields present except `volume`; none of them may leak
        map.insert("journal_title", "Should not appear");
        map.insert("issue", "3");
        let record = classify(map, "bee2020", Vec::<String>::new(), &NullReporter).unwrap();
        assert_eq!(record.shape(), Shape::Conference);
        assert!(record.journal().is_none());
        let c = record.conference().unwrap();
        assert_eq!(c.conference, "Conference on Lasers");
        assert_eq!(c.abbreviation, "CLEO");
        assert_eq!(c.paper_number, "SM1A.1");
        assert_eq!(record.pub_date, PublicationDate::Raw("2020/05/10".to_string()));
    }

    #[test]
    fn bad_journal_date_falls_through_to_conference() {
        let mut map = conference_map();
        for (k, v) in [("journal_title", "J"), ("volume", "1"), ("issue", "2")] {
            map.insert(k, v);
        }
        map.insert("publication_date", "spring");
        let record = classify(map, "x", Vec::<String>::new(), &NullReporter).unwrap();
        assert_eq!(record.shape(), Shape::Conference);
        assert_eq!(record.pub_date, PublicationDate::Raw("spring".to_string()));
    }

    #[test]
    fn preprint_is_last_resort() {
        let map = TagMap::new()
            .with("title", "Attention")
            .with("author", vec!["Ann Bee", "Cy Dee"])
            .with("arxiv_id", "1706.03762")
            .with("pdf_url", "https://arxiv.org/pdf/1706.03762")
            .with("publication_date", "2017/06/12");
        let record = classify(map, "bee2017", Vec::<String>::new(), &NullReporter).unwrap();
        assert_eq!(record.shape(), Shape::Preprint);
        let p = record.preprint().unwrap();
        assert_eq!(p.id, "1706.03762");
        assert_eq!(p.pdf_url, "https://arxiv.org/pdf/1706.03762");
        assert_eq!(record.pub_date, PublicationDate::Unknown);
    }

    #[test]
    fn nothing_matches() {
        let map = TagMap::new()
            .with("title", "T")
            .with("author", vec!["Ann Bee"]);
        let err = classify(map, "x", Vec::<String>::new(), &NullReporter).unwrap_err();
        let Error::InsufficientMetadata { name, failures } = err else {
            panic!("expected InsufficientMetadata");
        };
        assert_eq!(name, "x");
        assert_eq!(
            failures,
            vec![
                AttemptFailure {
                    shape: Shape::Journal,
                    problem: FieldProblem::Missing("journal_title"),
                },
                AttemptFailure {
                    shape: Shape::Conference,
                    problem: FieldProblem::Missing("conference_title"),
                },
                AttemptFailure {
                    shape: Shape::Preprint,
                    problem: FieldProblem::Missing("arxiv_id"),
                },
            ]
        );
    }

    #[test]
    fn empty_mapping_is_insufficient() {
        let err = classify(TagMap::new(), "x", Vec::<String>::new(), &NullReporter).unwrap_err();
        assert!(matches!(err, Error::InsufficientMetadata { .. }));
        assert!(err.to_string().contains("no tags"));
    }

    #[test]
    fn malformed_author_blocks_every_shape() {
        let map = journal_map().with("author", vec!["Cher"]);
        let err = classify(map, "x", Vec::<String>::new(), &NullReporter).unwrap_err();
        let Error::InsufficientMetadata { failures, .. } = err else {
            panic!("expected InsufficientMetadata");
        };
        assert_eq!(failures.len(), 3);
        assert!(
            failures
                .iter()
                .all(|f| matches!(f.problem, FieldProblem::Invalid { field: "author", .. }))
        );
    }

    #[test]
    fn list_where_scalar_belongs_fails_the_attempt() {
        let map = journal_map().with("volume", vec!["1", "2"]);
        let err = classify(map, "x", Vec::<String>::new(), &NullReporter).unwrap_err();
        let Error::InsufficientMetadata { failures, .. } = err else {
            panic!("expected InsufficientMetadata");
        };
        assert_eq!(failures[0].problem, FieldProblem::NotScalar("volume"));
    }

    #[test]
    fn default_tags_are_fresh_per_call() {
        let mut first =
            classify(journal_map(), "a", Vec::<String>::new(), &NullReporter).unwrap();
        first.add_tags("mine").unwrap();
        let second = classify(journal_map(), "b", Vec::<String>::new(), &NullReporter).unwrap();
        assert!(second.tags().is_empty());
    }

    #[test]
    fn journal_property_over_generated_fields() {
        proptest::proptest!(|(
            volume in "[0-9]{1,3}",
            issue in "[0-9]{1,2}",
            page in "[0-9]{1,5}",
            title in "[A-Za-z ]{1,40}",
        )| {
            let map = journal_map()
                .with("volume", volume.as_str())
                .with("issue", issue.as_str())
                .with("firstpage", page.as_str())
                .with("title", title.as_str());
            let record = classify(map, "p", Vec::<String>::new(), &NullReporter).unwrap();
            proptest::prop_assert_eq!(record.shape(), Shape::Journal);
            let j = record.journal().unwrap();
            proptest::prop_assert_eq!(&j.volume, &volume);
            proptest::prop_assert_eq!(&j.issue, &issue);
            proptest::prop_assert_eq!(&j.first_page, &page);
            proptest::prop_assert_eq!(&record.title, &title);
        })
    }
}
