//! Scalar code mappings between wire tokens and store codes.
//!
//! Out-of-range coded values fail at this boundary; nothing downstream
//! re-validates them.

use dovetail_core::{ConvertError, ConvertResult};
use dovetail_rfc::ical::core::{Component, Property};

/// Validates the wire PRIORITY range (0..=9 per RFC 5545 §3.8.1.9).
///
/// ## Errors
/// `InvalidArgument` for values outside the defined range.
pub fn validate_priority(priority: i32) -> ConvertResult<i32> {
    if (0..=9).contains(&priority) {
        Ok(priority)
    } else {
        Err(ConvertError::InvalidArgument(format!(
            "PRIORITY {priority} out of range 0..=9"
        )))
    }
}

/// Validates the wire PERCENT-COMPLETE range (0..=100).
///
/// ## Errors
/// `InvalidArgument` for values outside the defined range.
pub fn validate_percent(percent: i32) -> ConvertResult<i32> {
    if (0..=100).contains(&percent) {
        Ok(percent)
    } else {
        Err(ConvertError::InvalidArgument(format!(
            "PERCENT-COMPLETE {percent} out of range 0..=100"
        )))
    }
}

/// Store sensitivity → CLASS token.
///
/// Codes: 0 none, 1 personal, 2 private, 3 confidential.
#[must_use]
pub const fn sensitivity_to_class(sensitivity: i32) -> &'static str {
    match sensitivity {
        1 | 2 => "PRIVATE",
        3 => "CONFIDENTIAL",
        _ => "PUBLIC",
    }
}

/// CLASS token → store sensitivity.
#[must_use]
pub fn class_to_sensitivity(class: &str) -> i32 {
    match class.to_ascii_uppercase().as_str() {
        "PRIVATE" => 2,
        "CONFIDENTIAL" => 3,
        _ => 0,
    }
}

/// iCalendar PRIORITY (1 highest .. 9 lowest, 0 undefined) → store
/// importance (0 low, 1 normal, 2 high).
#[must_use]
pub const fn priority_to_importance(priority: i32) -> i32 {
    match priority {
        1..=4 => 2,
        6..=9 => 0,
        _ => 1,
    }
}

/// Store importance → iCalendar PRIORITY.
#[must_use]
pub const fn importance_to_priority(importance: i32) -> i32 {
    match importance {
        2 => 1,
        0 => 9,
        _ => 5,
    }
}

/// Busy status codes: 0 free, 1 tentative, 2 busy, 3 out of office.
///
/// Reads X-MICROSOFT-CDO-BUSYSTATUS when present, falling back to
/// TRANSP.
#[must_use]
pub fn busy_status_from_component(component: &Component) -> i32 {
    if let Some(status) = component
        .get_property("X-MICROSOFT-CDO-BUSYSTATUS")
        .and_then(Property::as_text)
    {
        return busy_status_code(status);
    }

    match component
        .get_property("TRANSP")
        .and_then(Property::as_text)
    {
        Some(transp) if transp.eq_ignore_ascii_case("TRANSPARENT") => 0,
        _ => 2,
    }
}

/// Busy status token → code.
#[must_use]
pub fn busy_status_code(token: &str) -> i32 {
    match token.to_ascii_uppercase().as_str() {
        "FREE" => 0,
        "TENTATIVE" => 1,
        "OOF" => 3,
        _ => 2,
    }
}

/// Busy status code → token.
#[must_use]
pub const fn busy_status_token(code: i32) -> &'static str {
    match code {
        0 => "FREE",
        1 => "TENTATIVE",
        3 => "OOF",
        _ => "BUSY",
    }
}

/// Task STATUS token → store task status
/// (0 not started, 1 in progress, 2 complete, 4 deferred).
#[must_use]
pub fn task_status_code(token: &str) -> i32 {
    match token.to_ascii_uppercase().as_str() {
        "IN-PROCESS" => 1,
        "COMPLETED" => 2,
        "CANCELLED" => 4,
        _ => 0,
    }
}

/// Store task status → STATUS token.
#[must_use]
pub const fn task_status_token(code: i32) -> &'static str {
    match code {
        1 => "IN-PROCESS",
        2 => "COMPLETED",
        4 => "CANCELLED",
        _ => "NEEDS-ACTION",
    }
}

/// Meeting status code from the payload METHOD and attendee presence:
/// 0 plain appointment, 1 meeting, 3 received request, 5 cancelled.
#[must_use]
pub fn meeting_status(method: Option<&str>, has_attendees: bool) -> i32 {
    match method {
        Some("CANCEL") => 5,
        Some("REQUEST") => 3,
        _ if has_attendees => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitivity_class_round_trip() {
        assert_eq!(class_to_sensitivity(sensitivity_to_class(0)), 0);
        assert_eq!(class_to_sensitivity(sensitivity_to_class(2)), 2);
        assert_eq!(class_to_sensitivity(sensitivity_to_class(3)), 3);
        // Personal narrows to private
        assert_eq!(class_to_sensitivity(sensitivity_to_class(1)), 2);
    }

    #[test]
    fn priority_importance_mapping() {
        assert_eq!(priority_to_importance(1), 2);
        assert_eq!(priority_to_importance(5), 1);
        assert_eq!(priority_to_importance(0), 1);
        assert_eq!(priority_to_importance(9), 0);
        assert_eq!(importance_to_priority(2), 1);
        assert_eq!(importance_to_priority(1), 5);
        assert_eq!(importance_to_priority(0), 9);
    }

    #[test]
    fn busy_status_tokens() {
        assert_eq!(busy_status_code("oof"), 3);
        assert_eq!(busy_status_token(busy_status_code("TENTATIVE")), "TENTATIVE");
        assert_eq!(busy_status_code("ANYTHING"), 2);
    }

    #[test]
    fn meeting_status_from_method() {
        assert_eq!(meeting_status(Some("REQUEST"), true), 3);
        assert_eq!(meeting_status(Some("CANCEL"), true), 5);
        assert_eq!(meeting_status(None, true), 1);
        assert_eq!(meeting_status(None, false), 0);
    }

    #[test]
    fn task_status_round_trip() {
        for code in [0, 1, 2, 4] {
            assert_eq!(task_status_code(task_status_token(code)), code);
        }
    }

    #[test]
    fn range_validation() {
        assert!(validate_priority(9).is_ok());
        assert!(matches!(
            validate_priority(12),
            Err(ConvertError::InvalidArgument(_))
        ));
        assert!(validate_percent(100).is_ok());
        assert!(matches!(
            validate_percent(-1),
            Err(ConvertError::InvalidArgument(_))
        ));
    }
}
