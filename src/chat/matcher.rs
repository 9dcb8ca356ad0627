//! Session matching for incoming error contexts.

use super::model::ErrorContext;

/// Whether two error contexts belong to the same conversation.
///
/// Only the node name and the error message are compared, exactly. Two
/// different failures on one node that share a message collapse into a
/// single session.
pub fn is_same_session(a: &ErrorContext, b: &ErrorContext) -> bool {
    a.node.name == b.node.name && a.error.message == b.error.message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_node_and_message_match() {
        let a = ErrorContext::new("Set1", "Bad input");
        let b = ErrorContext::new("Set1", "Bad input");
        assert!(is_same_session(&a, &b));
    }

    #[test]
    fn other_fields_are_ignored() {
        let a = ErrorContext::new("Set1", "Bad input");
        let mut b = ErrorContext::new("Set1", "Bad input");
        b.error.name = "OtherError".into();
        b.error.stack = Some("at line 1".into());
        b.error.line_number = Some(7);
        b.error.error_type = Some("runtime".into());
        b.node
            .details
            .insert("typeVersion".into(), serde_json::json!(2));
        assert!(is_same_session(&a, &b));
    }

    #[test]
    fn different_node_or_message_do_not_match() {
        let a = ErrorContext::new("Set1", "Bad input");
        assert!(!is_same_session(&a, &ErrorContext::new("Set2", "Bad input")));
        assert!(!is_same_session(&a, &ErrorContext::new("Set1", "bad input")));
        assert!(!is_same_session(&a, &ErrorContext::new("Set1", "Bad input ")));
    }
}
