use std::{collections::HashSet, fmt};

use crate::error::{Error, Result};

/// One author, split into the three name slots bibliography styles expect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Author {
    pub first: String,
    /// Empty when the source gave only two name tokens.
    pub middle: String,
    pub last: String,
}

impl Author {
    pub fn new(first: impl Into<String>, middle: impl Into<String>, last: impl Into<String>) -> Self {
        Author {
            first: first.into(),
            middle: middle.into(),
            last: last.into(),
        }
    }

    /// Split `"first [middle ...] last"` on whitespace.
    ///
    /// Only the first interior token is kept as the middle name, so
    /// `"Maria Anna Sofia Lopez"` becomes `("Maria", "Anna", "Lopez")`.
    pub fn parse(raw: &str) -> Result<Self> {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        match tokens.as_slice() {
            [first, interior @ .., last] => Ok(Author::new(
                *first,
                interior.first().copied().unwrap_or_default(),
                *last,
            )),
            _ => Err(Error::MalformedAuthorName(raw.to_string())),
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.first)?;
        if !self.middle.is_empty() {
            write!(f, " {}", self.middle)?;
        }
        write!(f, " {}", self.last)
    }
}

/// Split every raw name and drop exact repeats, keeping the first occurrence of each.
pub fn split_authors<I, S>(names: I) -> Result<Vec<Author>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut authors = names
        .into_iter()
        .map(|n| Author::parse(n.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    dedup_in_place(&mut authors);
    Ok(authors)
}

fn dedup_in_place(v: &mut Vec<Author>) {
    let mut seen = HashSet::new();
    v.retain(|a| seen.insert(a.clone()));
}
