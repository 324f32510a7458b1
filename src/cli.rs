use std::{fmt, fs, path::PathBuf, str::FromStr};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build citation records from article pages or saved HTML files
    Fetch {
        #[arg(value_name = "SRC", required = true)]
        from: Vec<Source>,

        /// Citation key; defaults to the file stem or the last URL path segment
        #[arg(short, long)]
        name: Option<String>,

        /// Tag to attach to every record (repeatable)
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Name of the locally held PDF for the record
        #[arg(long, value_name = "FILE")]
        pdf: Option<String>,

        #[arg(short, long, value_enum, default_value_t = Format::Citation)]
        format: Format,

        /// Overall HTTP timeout in seconds
        #[arg(long, value_name = "SECS", default_value_t = 15)]
        timeout: u64,

        /// User-Agent for the retry after a refused request
        #[arg(long, value_name = "UA")]
        user_agent: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Labelled citation block (journal articles only)
    Citation,
    Biblatex,
    Json,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Where an article page comes from, which can either be
///
/// - a saved HTML file, or
/// - a URL to fetch.
pub enum Source {
    File(PathBuf),
    Url(String),
}

impl Source {
    /// Default citation key for this source.
    pub fn default_name(&self) -> String {
        let raw = match self {
            Source::File(p) => p
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Source::Url(u) => url::Url::parse(u)
                .ok()
                .and_then(|u| {
                    u.path_segments()
                        .and_then(|mut segs| segs.rfind(|s| !s.is_empty()).map(str::to_string))
                        .or_else(|| u.host_str().map(str::to_string))
                })
                .unwrap_or_default(),
        };
        if raw.is_empty() { "ref".to_string() } else { raw }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(p) => write!(f, "{}", p.display()),
            Source::Url(u) => f.write_str(u),
        }
    }
}

impl FromStr for Source {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Anything that resolves to an existing path is a saved page; the rest is fetched.
        if let Ok(path) = fs::canonicalize(s) {
            Ok(Source::File(path))
        } else {
            Ok(Source::Url(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn from_str_identifies_existing_file() {
        let tmp = NamedTempFile::new().expect("tmp file");
        let path = tmp.path().to_path_buf();
        let src = Source::from_str(path.to_str().unwrap()).expect("parse");
        match src {
            Source::File(p) => {
                let can = std::fs::canonicalize(&path).unwrap();
                assert_eq!(p, can);
            }
            _ => panic!("expected file source"),
        }
    }

    #[test]
    fn from_str_falls_back_to_url() {
        proptest::proptest!(|(s in "[A-Za-z0-9._-]{1,32}")| {
            let path = PathBuf::from(&s);
            proptest::prop_assume!(!path.exists());
            let src = Source::from_str(&s).expect("parse");
            match src {
                Source::Url(u) => proptest::prop_assert_eq!(u, s),
                Source::File(_) => proptest::prop_assert!(false, "should not be a file"),
            }
        })
    }

    #[test]
    fn default_names() {
        assert_eq!(
            Source::File(PathBuf::from("/lib/doe2020.html")).default_name(),
            "doe2020"
        );
        assert_eq!(
            Source::Url("https://arxiv.org/abs/1706.03762/".to_string()).default_name(),
            "1706.03762"
        );
        assert_eq!(
            Source::Url("https://example.org".to_string()).default_name(),
            "example.org"
        );
        assert_eq!(Source::Url("::".to_string()).default_name(), "ref");
    }

    #[test]
    fn cli_parses_fetch_options() {
        let cli = Cli::try_parse_from([
            "citegrab", "fetch", "https://example.org/a", "-t", "x", "-t", "y", "-f", "json",
        ])
        .unwrap();
        let Command::Fetch {
            from, tags, format, ..
        } = cli.command;
        assert_eq!(from, vec![Source::Url("https://example.org/a".to_string())]);
        assert_eq!(tags, vec!["x", "y"]);
        assert_eq!(format, Format::Json);
    }
}
