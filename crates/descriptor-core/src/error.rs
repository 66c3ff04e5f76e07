//! Fatal errors of a description run

use crate::design::HostError;

/// Errors that abort a run
#[derive(Debug, Clone, thiserror::Error)]
pub enum DescriptorError {
    #[error("There is no grounded component")]
    NoGroundedComponent,

    #[error("Link '{name}' named by {context} is not part of the description")]
    UnknownLink { context: String, name: String },

    #[error("Occurrence '{name}' named by {context} was not found")]
    OccurrenceNotFound { context: String, name: String },

    #[error("Joint '{joint}' is in unexpected health state {state}: {message}")]
    UnexpectedJointHealth {
        joint: String,
        state: String,
        message: String,
    },

    #[error("Joint '{joint}' has unknown type ordinal {ordinal}")]
    UnknownJointType { joint: String, ordinal: u32 },

    #[error("Non-fixed joint '{joint}' does not have an origin")]
    MissingJointOrigin { joint: String },

    #[error(
        "Occurrences {occurrence_one} and {occurrence_two} of non-fixed joint '{joint}' do not have \
         the same origin: {origin_one:?} vs {origin_two:?}. Reset the joint to its home position \
         before exporting"
    )]
    IncoincidentOrigins {
        joint: String,
        occurrence_one: String,
        origin_one: [f64; 3],
        occurrence_two: String,
        origin_two: [f64; 3],
    },

    #[error("Not all components were included in the export. {}", unreachable_message(.unconnected, .unreachable))]
    Unreachable {
        unconnected: Vec<String>,
        unreachable: Vec<String>,
    },

    #[error("Host query failed: {0}")]
    Host(#[from] HostError),
}

/// Result type for description runs
pub type DescriptorResult<T> = Result<T, DescriptorError>;

fn unreachable_message(unconnected: &[String], unreachable: &[String]) -> String {
    let mut parts = Vec::new();
    if !unconnected.is_empty() {
        parts.push(format!(
            "Not a part of any joint or rigid group: {}.",
            unconnected.join(", ")
        ));
    }
    if !unreachable.is_empty() {
        parts.push(format!(
            "Unreachable from the grounded component via joints and links: {}.",
            unreachable.join(", ")
        ));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_lists_every_name() {
        let err = DescriptorError::Unreachable {
            unconnected: vec!["bolt:1".to_string(), "nut:1".to_string()],
            unreachable: vec!["arm:2".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("Not a part of any joint or rigid group: bolt:1, nut:1."));
        assert!(message.contains("Unreachable from the grounded component"));
        assert!(message.contains("arm:2"));
    }

    #[test]
    fn test_incoincident_names_both_occurrences() {
        let err = DescriptorError::IncoincidentOrigins {
            joint: "Rev1".to_string(),
            occurrence_one: "a:1".to_string(),
            origin_one: [0.0, 0.0, 0.0],
            occurrence_two: "b:1".to_string(),
            origin_two: [0.0, 0.0, 0.01],
        };
        let message = err.to_string();
        assert!(message.contains("a:1"));
        assert!(message.contains("b:1"));
        assert!(message.contains("0.01"));
    }
}
