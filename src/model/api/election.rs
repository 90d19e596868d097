use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{election::ElectionStatus, ElectionId, OptionId},
    db::{Election, ElectionOption, NewElection, NewElectionOption},
};

/// Longest permitted election name or option title, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Check a name or title is non-blank and not too long.
fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_argument(format!("{field} must not be blank")));
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::invalid_argument(format!(
            "{field} must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// An election specification, as submitted by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl TryFrom<ElectionSpec> for NewElection {
    type Error = Error;

    /// Validate the request and build a new draft election from it.
    fn try_from(spec: ElectionSpec) -> Result<Self> {
        validate_name("Election name", &spec.name)?;
        if spec.end_time < spec.start_time {
            return Err(Error::invalid_argument(
                "Election end time must not be before its start time",
            ));
        }
        Ok(Self::new(
            spec.name,
            spec.description,
            spec.start_time,
            spec.end_time,
        ))
    }
}

/// An option specification, as submitted by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSpec {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: Option<i32>,
}

impl OptionSpec {
    /// Validate the request and build a new option for the given election.
    pub fn into_option(self, election_id: ElectionId) -> Result<NewElectionOption> {
        validate_name("Option title", &self.title)?;
        Ok(NewElectionOption::new(
            election_id,
            self.title,
            self.description,
            self.display_order,
        ))
    }
}

/// An API-friendly option description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDescription {
    pub id: OptionId,
    pub title: String,
    pub description: Option<String>,
    pub display_order: i32,
}

impl From<ElectionOption> for OptionDescription {
    fn from(option: ElectionOption) -> Self {
        Self {
            id: option.id,
            title: option.option.title,
            description: option.option.description,
            display_order: option.option.display_order,
        }
    }
}

/// An API-friendly election description, including its options in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: ElectionId,
    pub name: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ElectionStatus,
    /// Whether the election is accepting votes at the time of the response.
    pub active: bool,
    pub options: Vec<OptionDescription>,
}

impl ElectionDescription {
    pub fn new(election: Election, options: Vec<ElectionOption>) -> Self {
        let active = election.is_active();
        Self {
            id: election.id,
            name: election.election.name,
            description: election.election.description,
            start_time: election.election.start_time,
            end_time: election.election.end_time,
            status: election.election.status,
            active,
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn valid_spec_becomes_draft() {
        let election = NewElection::try_from(ElectionSpec::example()).unwrap();
        assert_eq!(election.status, ElectionStatus::Draft);
        assert_eq!(election.name, "Student council");
    }

    #[test]
    fn blank_name_rejected() {
        let spec = ElectionSpec {
            name: "   ".to_string(),
            ..ElectionSpec::example()
        };
        assert!(matches!(
            NewElection::try_from(spec),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn long_name_rejected() {
        let spec = ElectionSpec {
            name: "x".repeat(MAX_NAME_LENGTH + 1),
            ..ElectionSpec::example()
        };
        assert!(matches!(
            NewElection::try_from(spec),
            Err(Error::InvalidArgument(_))
        ));

        let spec = ElectionSpec {
            name: "x".repeat(MAX_NAME_LENGTH),
            ..ElectionSpec::example()
        };
        assert!(NewElection::try_from(spec).is_ok());
    }

    #[test]
    fn end_before_start_rejected() {
        let example = ElectionSpec::example();
        let spec = ElectionSpec {
            end_time: example.start_time - Duration::seconds(1),
            ..example
        };
        assert!(matches!(
            NewElection::try_from(spec),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn instantaneous_window_allowed() {
        let example = ElectionSpec::example();
        let spec = ElectionSpec {
            end_time: example.start_time,
            ..example
        };
        assert!(NewElection::try_from(spec).is_ok());
    }

    #[test]
    fn option_display_order_defaults_to_zero() {
        let spec = OptionSpec {
            display_order: None,
            ..OptionSpec::example1()
        };
        let option = spec.into_option(5).unwrap();
        assert_eq!(option.display_order, 0);
        assert_eq!(option.election_id, 5);
    }

    #[test]
    fn blank_option_title_rejected() {
        let spec = OptionSpec {
            title: String::new(),
            ..OptionSpec::example1()
        };
        assert!(matches!(spec.into_option(1), Err(Error::InvalidArgument(_))));
    }
}
