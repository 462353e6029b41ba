//! OAI-PMH verbs

use std::fmt;
use std::str::FromStr;

/// The protocol verbs this repository answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Identify,
    ListRecords,
    GetRecord,
    ListIdentifiers,
    ListMetadataFormats,
}

impl Verb {
    pub const ALL: [Verb; 5] = [
        Verb::Identify,
        Verb::ListRecords,
        Verb::GetRecord,
        Verb::ListIdentifiers,
        Verb::ListMetadataFormats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Identify => "Identify",
            Verb::ListRecords => "ListRecords",
            Verb::GetRecord => "GetRecord",
            Verb::ListIdentifiers => "ListIdentifiers",
            Verb::ListMetadataFormats => "ListMetadataFormats",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized verb name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVerb(pub String);

impl FromStr for Verb {
    type Err = UnknownVerb;

    /// Verb names are case-sensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| UnknownVerb(s.to_string()))
    }
}
