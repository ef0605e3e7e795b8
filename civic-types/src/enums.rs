use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollAnswer {
    Yes,
    No,
}

impl PollAnswer {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollAnswer::Yes => "Yes",
            PollAnswer::No => "No",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" => Some(PollAnswer::Yes),
            "no" | "n" => Some(PollAnswer::No),
            _ => None,
        }
    }
}

/// Party a profile leans towards. The empty string on the wire means "not set".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PoliticalAlignment {
    National,
    Labour,
    Independent,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl PoliticalAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoliticalAlignment::National => "National",
            PoliticalAlignment::Labour => "Labour",
            PoliticalAlignment::Independent => "Independent",
            PoliticalAlignment::Unspecified => "",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "National" => Some(PoliticalAlignment::National),
            "Labour" => Some(PoliticalAlignment::Labour),
            "Independent" => Some(PoliticalAlignment::Independent),
            "" => Some(PoliticalAlignment::Unspecified),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PoliticalAlignment::Unspecified => "Not specified",
            other => other.as_str(),
        }
    }
}
