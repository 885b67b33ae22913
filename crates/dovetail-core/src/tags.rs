//! Store tag namespace.
//!
//! Tags are plain `u32` identifiers, unique within one bag. The numbering
//! follows the store's historical ranges: common message tags below
//! `0x4000`, contact tags in the `0x3Axx` block, task tags in `0x81xx`,
//! appointment tags in `0x82xx`, reminder tags in `0x85xx`, and series
//! identity tags in `0x86xx`. Existing persisted data depends on these
//! values; do not renumber.

// Common message tags
pub const MESSAGE_CLASS: u32 = 0x001A;
pub const IMPORTANCE: u32 = 0x0017;
pub const SENSITIVITY: u32 = 0x0036;
pub const SUBJECT: u32 = 0x0037;
pub const BODY: u32 = 0x1000;
pub const CREATION_TIME: u32 = 0x3007;
pub const LAST_MODIFICATION_TIME: u32 = 0x3008;
pub const DISPLAY_NAME: u32 = 0x3001;
pub const CATEGORIES: u32 = 0x85C0;

// Contact tags
pub const GIVEN_NAME: u32 = 0x3A06;
pub const SURNAME: u32 = 0x3A11;
pub const MIDDLE_NAME: u32 = 0x3A44;
pub const GENERATION: u32 = 0x3A05;
pub const DISPLAY_NAME_PREFIX: u32 = 0x3A45;
pub const JOB_TITLE: u32 = 0x3A17;
pub const COMPANY_NAME: u32 = 0x3A16;
pub const BIRTHDAY: u32 = 0x3A42;
pub const BUSINESS_PHONE: u32 = 0x3A08;
pub const HOME_PHONE: u32 = 0x3A09;
pub const MOBILE_PHONE: u32 = 0x3A1C;
pub const NOTE: u32 = 0x3A4F;
pub const EMAIL_1: u32 = 0x80A0;
pub const EMAIL_2: u32 = 0x80A1;
pub const EMAIL_3: u32 = 0x80A2;
pub const HOME_ADDRESS: u32 = 0x801A;
pub const BUSINESS_ADDRESS: u32 = 0x801B;
pub const CONTACT_UID: u32 = 0x80D8;
pub const PHOTO: u32 = 0x80E0;

// Task tags
pub const TASK_STATUS: u32 = 0x8101;
pub const TASK_PERCENT_COMPLETE: u32 = 0x8102;
pub const TASK_START_DATE: u32 = 0x8104;
pub const TASK_DUE_DATE: u32 = 0x8105;
pub const TASK_DATE_COMPLETED: u32 = 0x810F;
pub const TASK_RECURRENCE_STATE: u32 = 0x8116;
pub const TASK_IS_RECURRING: u32 = 0x8126;
pub const TASK_COMPLETE: u32 = 0x811C;

// Appointment tags
pub const APPT_BUSY_STATUS: u32 = 0x8205;
pub const APPT_LOCATION: u32 = 0x8208;
pub const APPT_START_WHOLE: u32 = 0x820D;
pub const APPT_END_WHOLE: u32 = 0x820E;
pub const APPT_DURATION: u32 = 0x8213;
pub const APPT_LABEL: u32 = 0x8214;
pub const APPT_ALL_DAY: u32 = 0x8215;
pub const APPT_RECURRENCE_STATE: u32 = 0x8216;
pub const APPT_MEETING_STATUS: u32 = 0x8217;
pub const APPT_RESPONSE_STATUS: u32 = 0x8218;
pub const APPT_RECURRING: u32 = 0x8223;
pub const APPT_INTENDED_BUSY_STATUS: u32 = 0x8224;
pub const APPT_RECURRENCE_PATTERN: u32 = 0x8232;
pub const APPT_TIMEZONE_STRUCT: u32 = 0x8233;
pub const APPT_TIMEZONE_DESC: u32 = 0x8234;
pub const APPT_CLIP_START: u32 = 0x8235;
pub const APPT_CLIP_END: u32 = 0x8236;
pub const APPT_COUNTER_PROPOSAL: u32 = 0x8257;

// Reminder tags
pub const REMINDER_DELTA: u32 = 0x8501;
pub const REMINDER_TIME: u32 = 0x8502;
pub const REMINDER_SET: u32 = 0x8503;
pub const REMINDER_SNOOZE_TIME: u32 = 0x8560;
pub const REMINDER_ACK_TIME: u32 = 0x8561;

// Series identity tags
pub const GLOBAL_ID: u32 = 0x8601;
pub const CLEAN_GLOBAL_ID: u32 = 0x8602;
pub const IS_EXCEPTION: u32 = 0x8603;
pub const EXCEPTION_REPLACE_TIME: u32 = 0x8604;

/// Returns a short human-readable name for a tag, for logs and debugging.
#[must_use]
pub fn name(tag: u32) -> &'static str {
    match tag {
        MESSAGE_CLASS => "MESSAGE_CLASS",
        SUBJECT => "SUBJECT",
        BODY => "BODY",
        APPT_START_WHOLE => "APPT_START_WHOLE",
        APPT_END_WHOLE => "APPT_END_WHOLE",
        APPT_RECURRENCE_STATE => "APPT_RECURRENCE_STATE",
        APPT_RECURRING => "APPT_RECURRING",
        GLOBAL_ID => "GLOBAL_ID",
        CLEAN_GLOBAL_ID => "CLEAN_GLOBAL_ID",
        REMINDER_SET => "REMINDER_SET",
        REMINDER_DELTA => "REMINDER_DELTA",
        TASK_RECURRENCE_STATE => "TASK_RECURRENCE_STATE",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appointment_range() {
        assert!((0x8200..0x8300).contains(&APPT_RECURRENCE_STATE));
        assert!((0x8200..0x8300).contains(&APPT_START_WHOLE));
    }

    #[test]
    fn tag_names() {
        assert_eq!(name(SUBJECT), "SUBJECT");
        assert_eq!(name(0x7FFF_FFFF), "?");
    }
}
