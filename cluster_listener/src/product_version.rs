use std::{cmp::Ordering, fmt, str::FromStr};

/// Build version reported by a cluster node through its build version attribute.
///
/// Accepts plain releases (`2.7.0`), staged releases (`2.8.0-SNAPSHOT`) and the full build form
/// nodes usually report (`2.7.0#20181130-sha1:256ae401`, or dashed as `2.7.0-20181130-256ae401`).
///
/// Ordering only looks at the numeric release and the revision timestamp. The stage and the
/// commit hash are carried for display but never decide which node is older.
#[derive(Clone, Debug)]
pub struct ProductVersion {
    major: u32,
    minor: u32,
    maintenance: u32,
    stage: String,
    revision_timestamp: u64,
    revision_hash: Option<String>,
}

impl ProductVersion {
    pub fn new(major: u32, minor: u32, maintenance: u32) -> Self {
        Self {
            major,
            minor,
            maintenance,
            stage: String::default(),
            revision_timestamp: 0,
            revision_hash: None,
        }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn maintenance(&self) -> u32 {
        self.maintenance
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn revision_timestamp(&self) -> u64 {
        self.revision_timestamp
    }

    pub fn revision_hash(&self) -> Option<&str> {
        self.revision_hash.as_deref()
    }

    fn ordering_key(&self) -> (u32, u32, u32, u64) {
        (
            self.major,
            self.minor,
            self.maintenance,
            self.revision_timestamp,
        )
    }
}

impl PartialEq for ProductVersion {
    fn eq(&self, other: &Self) -> bool {
        self.ordering_key() == other.ordering_key()
    }
}

impl Eq for ProductVersion {}

impl PartialOrd for ProductVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProductVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordering_key().cmp(&other.ordering_key())
    }
}

impl FromStr for ProductVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let (release, revision) = match input.split_once('#') {
            Some((release, revision)) => (release, Some(revision)),
            None => (input, None),
        };

        let (numbers, suffix) = match release.split_once('-') {
            Some((numbers, suffix)) => (numbers, suffix),
            None => (release, ""),
        };
        let (stage, dashed_revision) = split_stage(suffix);
        let revision = revision.or(dashed_revision);

        let mut parts = numbers.split('.');
        let major = release_component(parts.next(), input)?;
        let minor = release_component(parts.next(), input)?;
        let maintenance = release_component(parts.next(), input)?;
        if parts.next().is_some() {
            return Err(VersionParseError::Malformed(input.to_string()));
        }

        let (revision_timestamp, revision_hash) = match revision {
            Some(revision) => parse_revision(revision, input)?,
            None => (0, None),
        };

        Ok(Self {
            major,
            minor,
            maintenance,
            stage: stage.to_string(),
            revision_timestamp,
            revision_hash,
        })
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.maintenance)?;
        if !self.stage.is_empty() {
            write!(f, "-{}", self.stage)?;
        }
        if self.revision_timestamp > 0 {
            write!(f, "#{}", self.revision_timestamp)?;
            if let Some(hash) = &self.revision_hash {
                write!(f, "-sha1:{}", hash)?;
            }
        }
        Ok(())
    }
}

fn release_component(part: Option<&str>, input: &str) -> Result<u32, VersionParseError> {
    part.filter(|p| !p.is_empty())
        .and_then(|p| p.parse::<u32>().ok())
        .ok_or_else(|| VersionParseError::Malformed(input.to_string()))
}

/// Splits what follows the release numbers into the stage and an inline revision, the first
/// all-digit segment starting the revision: `SNAPSHOT`, `20181130-256ae401`,
/// `rc1-20181130-256ae401`.
fn split_stage(suffix: &str) -> (&str, Option<&str>) {
    let mut offset = 0;
    for segment in suffix.split('-') {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            let stage = suffix[..offset].trim_end_matches('-');
            return (stage, Some(&suffix[offset..]));
        }
        offset += segment.len() + 1;
    }
    (suffix, None)
}

/// Parses the `20181130-sha1:256ae401` part following the `#`, or the `20181130-256ae401` tail of
/// the dashed form.
fn parse_revision(revision: &str, input: &str) -> Result<(u64, Option<String>), VersionParseError> {
    let (timestamp, hash) = match revision.split_once('-') {
        Some((timestamp, hash)) => (timestamp, Some(hash)),
        None => (revision, None),
    };

    let timestamp = timestamp
        .parse::<u64>()
        .map_err(|_| VersionParseError::Malformed(input.to_string()))?;

    let hash = hash
        .map(|h| h.strip_prefix("sha1:").unwrap_or(h))
        .filter(|h| !h.is_empty())
        .map(str::to_string);

    Ok((timestamp, hash))
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("Version string is empty")]
    Empty,
    #[error("Version string `{0}` is not a valid product version")]
    Malformed(String),
}
