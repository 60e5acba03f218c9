// Identity-in-text encoding for consensus polls.
//
// Telegram gives bots no way to attach custom metadata to a poll, so the
// target's user id travels inside the visible question, wrapped in a
// bracket pair. Decoding is strict: anything that is not a bracketed
// non-negative integer is rejected instead of banning whatever fragment
// happened to be in there.

use super::consensus_service::ConsensusError;

const OPEN_DELIMITER: char = '[';
const CLOSE_DELIMITER: char = ']';

/// Build the poll question for a vote against `target_user_id`.
///
/// The id is the last bracketed token, so a display name that itself
/// contains brackets cannot shadow it.
pub fn encode_question(target_user_id: u64, display_name: &str) -> String {
    format!(
        "Is {} [{}] a swindler we should remove?",
        display_name, target_user_id
    )
}

/// Extract the target user id from a poll question.
pub fn decode_user_id(question: &str) -> Result<u64, ConsensusError> {
    let start = question.rfind(OPEN_DELIMITER).ok_or_else(|| {
        ConsensusError::MalformedPollIdentity("question has no opening bracket".to_string())
    })?;

    let end = question[start..].find(CLOSE_DELIMITER).ok_or_else(|| {
        ConsensusError::MalformedPollIdentity("question has no closing bracket".to_string())
    })? + start;

    let payload = &question[start + 1..end];
    payload.parse::<u64>().map_err(|_| {
        ConsensusError::MalformedPollIdentity(format!("not a user id: {:?}", payload))
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_is_identity() {
        for id in [0u64, 1, 42, 370_884_641, u64::MAX] {
            let question = encode_question(id, "Sam");
            assert_eq!(decode_user_id(&question).unwrap(), id);
        }
    }

    #[test]
    fn test_bracketed_display_name_does_not_shadow_the_id() {
        let question = encode_question(777, "[mod] Sam");
        assert_eq!(decode_user_id(&question).unwrap(), 777);
    }

    #[test]
    fn test_question_without_brackets_is_rejected() {
        let err = decode_user_id("should we ban Sam?").unwrap_err();
        assert!(matches!(err, ConsensusError::MalformedPollIdentity(_)));
    }

    #[test]
    fn test_unclosed_bracket_is_rejected() {
        let err = decode_user_id("should we ban Sam [123").unwrap_err();
        assert!(matches!(err, ConsensusError::MalformedPollIdentity(_)));
    }

    #[test]
    fn test_non_numeric_payload_is_rejected() {
        for question in [
            "should we ban [Sam]?",
            "should we ban [12a4]?",
            "should we ban [-5]?",
            "should we ban []?",
        ] {
            let err = decode_user_id(question).unwrap_err();
            assert!(
                matches!(err, ConsensusError::MalformedPollIdentity(_)),
                "{} should be rejected",
                question
            );
        }
    }

    #[test]
    fn test_unicode_display_name_round_trips() {
        let question = encode_question(555, "Олександр 🦀");
        assert_eq!(decode_user_id(&question).unwrap(), 555);
    }
}
