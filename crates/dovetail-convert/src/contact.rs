//! Contact (vCard) conversion: the thin peer of the calendar engine.
//!
//! Shares only the property bag model with the calendar path; there is
//! no recurrence, timezone, or identity machinery here.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use dovetail_core::{ConvertError, ConvertResult, PropValue, PropertyBag, tags};
use dovetail_rfc::ical::core::Parameter;
use dovetail_rfc::vcard::{Address, StructuredName, Vcard, VcardProperty};

/// Converts a vCard into a contact property bag.
///
/// ## Errors
/// `CorruptData` if an inline PHOTO fails Base64 decoding.
#[tracing::instrument(skip(card))]
pub fn vcard_to_bag(card: &Vcard) -> ConvertResult<PropertyBag> {
    let mut bag = PropertyBag::new();
    bag.set(
        tags::MESSAGE_CLASS,
        PropValue::String("IPM.Contact".to_string()),
    );

    if let Some(fn_value) = card.formatted_name() {
        bag.set(tags::DISPLAY_NAME, PropValue::String(fn_value.to_string()));
    }
    if let Some(name) = card.structured_name() {
        set_string(&mut bag, tags::SURNAME, &name.family);
        set_string(&mut bag, tags::GIVEN_NAME, &name.given);
        set_string(&mut bag, tags::MIDDLE_NAME, &name.additional);
        set_string(&mut bag, tags::DISPLAY_NAME_PREFIX, &name.prefix);
        set_string(&mut bag, tags::GENERATION, &name.suffix);
    }

    for (prop, tag) in card
        .get_all("EMAIL")
        .into_iter()
        .zip([tags::EMAIL_1, tags::EMAIL_2, tags::EMAIL_3])
    {
        bag.set(tag, PropValue::String(prop.value.clone()));
    }

    for phone in card.get_all("TEL") {
        let tag = if phone.has_type("CELL") {
            tags::MOBILE_PHONE
        } else if phone.has_type("HOME") {
            tags::HOME_PHONE
        } else {
            tags::BUSINESS_PHONE
        };
        if !bag.contains(tag) {
            bag.set(tag, PropValue::String(phone.value.clone()));
        }
    }

    for adr in card.get_all("ADR") {
        let tag = if adr.has_type("HOME") {
            tags::HOME_ADDRESS
        } else {
            tags::BUSINESS_ADDRESS
        };
        let parsed = Address::parse(&adr.value);
        let display = [
            parsed.street.as_str(),
            parsed.locality.as_str(),
            parsed.region.as_str(),
            parsed.postal_code.as_str(),
            parsed.country.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
        set_string(&mut bag, tag, &display);
    }

    if let Some(org) = card.get("ORG") {
        let company = org.components().first().cloned().unwrap_or_default();
        set_string(&mut bag, tags::COMPANY_NAME, &company);
    }
    if let Some(title) = card.get("TITLE") {
        set_string(&mut bag, tags::JOB_TITLE, &title.value);
    }
    if let Some(note) = card.get("NOTE") {
        set_string(&mut bag, tags::NOTE, &note.value);
    }
    if let Some(uid) = card.get("UID") {
        set_string(&mut bag, tags::CONTACT_UID, &uid.value);
    }

    if let Some(bday) = card.get("BDAY")
        && let Some(date) = parse_bday(&bday.value)
    {
        bag.set(tags::BIRTHDAY, PropValue::SysTime(date));
    }

    if let Some(photo) = card.get("PHOTO") {
        let encoded = photo.value.replace(['\r', '\n'], "");
        let bytes = STANDARD.decode(encoded.as_bytes()).map_err(|e| {
            ConvertError::CorruptData(format!("PHOTO is not valid Base64: {e}"))
        })?;
        bag.set(tags::PHOTO, PropValue::Binary(bytes));
    }

    Ok(bag)
}

/// Converts a contact property bag back into a vCard.
#[must_use]
pub fn bag_to_vcard(bag: &PropertyBag) -> Vcard {
    let mut card = Vcard::new();

    if let Some(display) = bag.string(tags::DISPLAY_NAME) {
        card.add_property(VcardProperty::new("FN", display));
    }

    let name = StructuredName {
        family: bag.string(tags::SURNAME).unwrap_or_default().to_string(),
        given: bag.string(tags::GIVEN_NAME).unwrap_or_default().to_string(),
        additional: bag.string(tags::MIDDLE_NAME).unwrap_or_default().to_string(),
        prefix: bag
            .string(tags::DISPLAY_NAME_PREFIX)
            .unwrap_or_default()
            .to_string(),
        suffix: bag.string(tags::GENERATION).unwrap_or_default().to_string(),
    };
    if name != StructuredName::default() {
        card.add_property(VcardProperty::new("N", name.to_value()));
    }

    for tag in [tags::EMAIL_1, tags::EMAIL_2, tags::EMAIL_3] {
        if let Some(email) = bag.string(tag) {
            let mut prop = VcardProperty::new("EMAIL", email);
            prop.params
                .push(Parameter::new("TYPE", "INTERNET"));
            card.add_property(prop);
        }
    }

    for (tag, type_token) in [
        (tags::BUSINESS_PHONE, "WORK"),
        (tags::HOME_PHONE, "HOME"),
        (tags::MOBILE_PHONE, "CELL"),
    ] {
        if let Some(number) = bag.string(tag) {
            let mut prop = VcardProperty::new("TEL", number);
            prop.params.push(Parameter::new("TYPE", type_token));
            card.add_property(prop);
        }
    }

    if let Some(company) = bag.string(tags::COMPANY_NAME) {
        card.add_property(VcardProperty::new("ORG", company));
    }
    if let Some(title) = bag.string(tags::JOB_TITLE) {
        card.add_property(VcardProperty::new("TITLE", title));
    }
    if let Some(note) = bag.string(tags::NOTE) {
        card.add_property(VcardProperty::new("NOTE", note));
    }
    if let Some(uid) = bag.string(tags::CONTACT_UID) {
        card.add_property(VcardProperty::new("UID", uid));
    }
    if let Some(birthday) = bag.systime(tags::BIRTHDAY) {
        card.add_property(VcardProperty::new(
            "BDAY",
            birthday.format("%Y-%m-%d").to_string(),
        ));
    }
    if let Some(photo) = bag.binary(tags::PHOTO) {
        let mut prop = VcardProperty::new("PHOTO", STANDARD.encode(photo));
        prop.params.push(Parameter::new("ENCODING", "b"));
        card.add_property(prop);
    }

    card
}

fn set_string(bag: &mut PropertyBag, tag: u32, value: &str) {
    if !value.is_empty() {
        bag.set(tag, PropValue::String(value.to_string()));
    }
}

/// BDAY appears as `1985-04-12` or `19850412`.
fn parse_bday(value: &str) -> Option<DateTime<Utc>> {
    let date = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| chrono::NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()?;
    Some(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0)?,
        Utc,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dovetail_rfc::vcard::parse;

    const CARD: &str = "\
BEGIN:VCARD\r\n\
VERSION:3.0\r\n\
FN:Dr. Jane Q. Doe PhD\r\n\
N:Doe;Jane;Q.;Dr.;PhD\r\n\
EMAIL;TYPE=INTERNET:jane@example.com\r\n\
EMAIL;TYPE=INTERNET:jane@home.example\r\n\
TEL;TYPE=WORK,VOICE:+1-555-0100\r\n\
TEL;TYPE=CELL:+1-555-0199\r\n\
ADR;TYPE=WORK:;;123 Main St;Springfield;IL;62704;USA\r\n\
ORG:Example Corp;Engineering\r\n\
TITLE:Staff Engineer\r\n\
BDAY:1985-04-12\r\n\
NOTE:Met at the conference\r\n\
UID:contact-1@example.com\r\n\
END:VCARD\r\n";

    #[test]
    fn full_card_maps_to_contact_tags() {
        let card = parse(CARD).unwrap();
        let bag = vcard_to_bag(&card).unwrap();

        assert_eq!(bag.string(tags::DISPLAY_NAME), Some("Dr. Jane Q. Doe PhD"));
        assert_eq!(bag.string(tags::SURNAME), Some("Doe"));
        assert_eq!(bag.string(tags::GIVEN_NAME), Some("Jane"));
        assert_eq!(bag.string(tags::EMAIL_1), Some("jane@example.com"));
        assert_eq!(bag.string(tags::EMAIL_2), Some("jane@home.example"));
        assert_eq!(bag.string(tags::BUSINESS_PHONE), Some("+1-555-0100"));
        assert_eq!(bag.string(tags::MOBILE_PHONE), Some("+1-555-0199"));
        assert_eq!(bag.string(tags::COMPANY_NAME), Some("Example Corp"));
        assert_eq!(bag.string(tags::JOB_TITLE), Some("Staff Engineer"));
        assert!(bag.string(tags::BUSINESS_ADDRESS).unwrap().contains("Springfield"));
        assert!(bag.systime(tags::BIRTHDAY).is_some());
    }

    #[test]
    fn fn_n_round_trip() {
        let card = parse(CARD).unwrap();
        let bag = vcard_to_bag(&card).unwrap();
        let emitted = bag_to_vcard(&bag);

        assert_eq!(emitted.formatted_name(), Some("Dr. Jane Q. Doe PhD"));
        let name = emitted.structured_name().unwrap();
        assert_eq!(name.family, "Doe");
        assert_eq!(name.given, "Jane");
        assert_eq!(name.prefix, "Dr.");
    }

    #[test]
    fn photo_base64_round_trip() {
        let mut card = Vcard::new();
        card.add_property(VcardProperty::new("FN", "P"));
        card.add_property(VcardProperty::new("PHOTO", STANDARD.encode(b"fakejpeg")));

        let bag = vcard_to_bag(&card).unwrap();
        assert_eq!(bag.binary(tags::PHOTO), Some(&b"fakejpeg"[..]));

        let emitted = bag_to_vcard(&bag);
        assert_eq!(emitted.get("PHOTO").unwrap().value, STANDARD.encode(b"fakejpeg"));
    }

    #[test]
    fn corrupt_photo_is_corrupt_data() {
        let mut card = Vcard::new();
        card.add_property(VcardProperty::new("PHOTO", "!!not-base64!!"));
        assert!(matches!(
            vcard_to_bag(&card),
            Err(ConvertError::CorruptData(_))
        ));
    }
}
