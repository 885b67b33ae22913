//! Persisted recurrence-state blobs.
//!
//! Two fixed little-endian layouts exist, selected by item kind, both
//! version-discriminated so the persisted form can evolve without
//! breaking existing data. Re-encoding a decoded blob yields the
//! byte-identical buffer.
//!
//! Calendar layout (magic `DVCR`, version 1):
//!
//! | field                     | size                 |
//! |---------------------------|----------------------|
//! | magic                     | 4                    |
//! | version                   | u16                  |
//! | frequency code            | u8                   |
//! | interval                  | u32                  |
//! | weekday bitmask           | u8                   |
//! | week number (0 = none)    | u8                   |
//! | day of month              | u8                   |
//! | month                     | u8                   |
//! | first day of week         | u8                   |
//! | end type code             | u8                   |
//! | occurrence count          | u32                  |
//! | start date (unix seconds) | i64                  |
//! | end date (unix seconds)   | i64                  |
//! | start time offset minutes | u32                  |
//! | end time offset minutes   | u32                  |
//! | deleted occurrences       | u32 n, n × i64       |
//! | modified occurrence bases | u32 n, n × i64       |
//! | pattern summary           | u16 len, UTF-8 bytes |
//!
//! Task layout (magic `DVTR`, version 1) is the same without the time
//! offsets and the modified-occurrence table; tasks recur by date only.

use chrono::{DateTime, NaiveDateTime};
use dovetail_core::{ConvertError, ConvertResult};
use dovetail_rfc::ical::core::Weekday;

use super::descriptor::{
    ModifiedOccurrence, PatternFrequency, RecurrenceDescriptor, RecurrenceEnd, WeekNumber,
};
use crate::item::ItemKind;

const CALENDAR_MAGIC: [u8; 4] = *b"DVCR";
const TASK_MAGIC: [u8; 4] = *b"DVTR";
const BLOB_VERSION: u16 = 1;

/// Encodes a descriptor into the persisted blob for the given item kind.
#[must_use]
pub fn encode_state(desc: &RecurrenceDescriptor, kind: ItemKind) -> Vec<u8> {
    let mut out = Vec::with_capacity(96 + desc.summary.len());

    match kind {
        ItemKind::Event => out.extend_from_slice(&CALENDAR_MAGIC),
        ItemKind::Task => out.extend_from_slice(&TASK_MAGIC),
    }
    out.extend_from_slice(&BLOB_VERSION.to_le_bytes());
    out.push(desc.frequency.code());
    out.extend_from_slice(&desc.interval.to_le_bytes());
    out.push(desc.week_days);
    out.push(desc.week_number.map_or(0, WeekNumber::index));
    out.push(desc.day_of_month);
    out.push(desc.month);
    out.push(desc.first_day_of_week.number());
    out.push(desc.end.code());
    out.extend_from_slice(&desc.count.to_le_bytes());
    out.extend_from_slice(&timestamp(desc.start_date).to_le_bytes());
    out.extend_from_slice(&timestamp(desc.end_date).to_le_bytes());

    if kind == ItemKind::Event {
        out.extend_from_slice(&desc.start_time_offset_minutes.to_le_bytes());
        out.extend_from_slice(&desc.end_time_offset_minutes.to_le_bytes());
    }

    put_timestamp_list(&mut out, desc.deleted_occurrences.iter().copied());

    if kind == ItemKind::Event {
        put_timestamp_list(&mut out, desc.modified_occurrences.iter().map(|m| m.base));
    }

    let summary = desc.summary.as_bytes();
    #[expect(clippy::cast_possible_truncation, reason = "summary length bounded below u16::MAX")]
    let len = summary.len().min(usize::from(u16::MAX)) as u16;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&summary[..usize::from(len)]);

    out
}

/// Decodes a persisted blob back into a descriptor.
///
/// ## Errors
/// Returns `NotFound` for a truncated or malformed buffer (wrong magic,
/// unknown version, out-of-range codes); the caller treats the item as
/// non-recurring.
pub fn decode_state(bytes: &[u8], kind: ItemKind) -> ConvertResult<RecurrenceDescriptor> {
    let mut cur = Cursor::new(bytes);

    let magic = cur.take(4)?;
    let expected = match kind {
        ItemKind::Event => CALENDAR_MAGIC,
        ItemKind::Task => TASK_MAGIC,
    };
    if magic != expected {
        return Err(not_found("recurrence blob magic mismatch"));
    }

    let version = cur.u16()?;
    if version != BLOB_VERSION {
        return Err(not_found(&format!(
            "unknown recurrence blob version {version}"
        )));
    }

    let frequency = PatternFrequency::from_code(cur.u8()?)
        .ok_or_else(|| not_found("invalid frequency code"))?;
    let interval = cur.u32()?;
    let week_days = cur.u8()?;
    let week_number = match cur.u8()? {
        0 => None,
        idx => Some(WeekNumber::from_index(idx).ok_or_else(|| not_found("invalid week number"))?),
    };
    let day_of_month = cur.u8()?;
    let month = cur.u8()?;
    let first_day_of_week = Weekday::from_number(cur.u8()?);
    let end_code = cur.u8()?;
    let count = cur.u32()?;
    let start_date = datetime(cur.i64()?)?;
    let end_date = datetime(cur.i64()?)?;

    let (start_offset, end_offset) = if kind == ItemKind::Event {
        (cur.u32()?, cur.u32()?)
    } else {
        (0, 0)
    };

    let deleted = take_timestamp_list(&mut cur)?;

    let modified: Vec<ModifiedOccurrence> = if kind == ItemKind::Event {
        take_timestamp_list(&mut cur)?
            .into_iter()
            .map(|base| ModifiedOccurrence {
                base,
                start: base,
                end: base,
                ..ModifiedOccurrence::default()
            })
            .collect()
    } else {
        Vec::new()
    };

    let summary_len = usize::from(cur.u16()?);
    let summary = String::from_utf8(cur.take(summary_len)?.to_vec())
        .map_err(|_| not_found("pattern summary is not UTF-8"))?;

    let end = match end_code {
        0 => RecurrenceEnd::Never,
        1 => RecurrenceEnd::AfterCount(count),
        2 => RecurrenceEnd::OnDate(end_date),
        other => return Err(not_found(&format!("invalid end type {other}"))),
    };

    Ok(RecurrenceDescriptor {
        frequency,
        interval,
        week_days,
        week_number,
        day_of_month,
        month,
        first_day_of_week,
        end,
        count,
        end_date,
        start_date,
        start_time_offset_minutes: start_offset,
        end_time_offset_minutes: end_offset,
        deleted_occurrences: deleted,
        modified_occurrences: modified,
        summary,
    })
}

fn not_found(context: &str) -> ConvertError {
    ConvertError::NotFound(format!("recurrence blob: {context}"))
}

fn timestamp(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

fn datetime(secs: i64) -> ConvertResult<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| not_found("timestamp out of range"))
}

fn put_timestamp_list(out: &mut Vec<u8>, items: impl ExactSizeIterator<Item = NaiveDateTime>) {
    #[expect(clippy::cast_possible_truncation, reason = "list lengths are tiny")]
    let len = items.len() as u32;
    out.extend_from_slice(&len.to_le_bytes());
    for item in items {
        out.extend_from_slice(&timestamp(item).to_le_bytes());
    }
}

fn take_timestamp_list(cur: &mut Cursor<'_>) -> ConvertResult<Vec<NaiveDateTime>> {
    let len = cur.u32()?;
    // A length beyond the remaining bytes is certainly damage
    if u64::from(len) * 8 > cur.remaining() as u64 {
        return Err(not_found("list length exceeds buffer"));
    }
    (0..len).map(|_| datetime(cur.i64()?)).collect()
}

/// Little-endian read cursor with truncation checks.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> ConvertResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(not_found("buffer truncated"));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> ConvertResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> ConvertResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> ConvertResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i64(&mut self) -> ConvertResult<i64> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::descriptor::weekday_bit;
    use chrono::NaiveDate;

    fn sample_desc() -> RecurrenceDescriptor {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut desc = RecurrenceDescriptor::new(PatternFrequency::Weekly, start);
        desc.interval = 2;
        desc.week_days = weekday_bit(Weekday::Monday) | weekday_bit(Weekday::Friday);
        desc.end = RecurrenceEnd::AfterCount(8);
        desc.count = 8;
        desc.end_date = NaiveDate::from_ymd_opt(2026, 4, 24)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        desc.start_time_offset_minutes = 540;
        desc.end_time_offset_minutes = 600;
        desc.deleted_occurrences.push(
            NaiveDate::from_ymd_opt(2026, 3, 16)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        );
        desc.summary = desc.pattern_summary();
        desc
    }

    #[test]
    fn calendar_blob_round_trip() {
        let desc = sample_desc();
        let bytes = encode_state(&desc, ItemKind::Event);
        let decoded = decode_state(&bytes, ItemKind::Event).unwrap();
        assert_eq!(decoded, desc);
    }

    #[test]
    fn reencoding_is_byte_identical() {
        let desc = sample_desc();
        let bytes = encode_state(&desc, ItemKind::Event);
        let decoded = decode_state(&bytes, ItemKind::Event).unwrap();
        assert_eq!(encode_state(&decoded, ItemKind::Event), bytes);
    }

    #[test]
    fn task_blob_round_trip() {
        let mut desc = sample_desc();
        // Tasks carry no time offsets or modified occurrences
        desc.start_time_offset_minutes = 0;
        desc.end_time_offset_minutes = 0;
        let bytes = encode_state(&desc, ItemKind::Task);
        let decoded = decode_state(&bytes, ItemKind::Task).unwrap();
        assert_eq!(decoded, desc);
        assert_eq!(encode_state(&decoded, ItemKind::Task), bytes);
    }

    #[test]
    fn task_and_calendar_layouts_differ() {
        let desc = sample_desc();
        let event_bytes = encode_state(&desc, ItemKind::Event);
        let task_bytes = encode_state(&desc, ItemKind::Task);
        assert_ne!(event_bytes, task_bytes);
        // Decoding with the wrong kind fails on the magic
        assert!(matches!(
            decode_state(&event_bytes, ItemKind::Task),
            Err(ConvertError::NotFound(_))
        ));
    }

    #[test]
    fn truncated_blob_is_not_found() {
        let desc = sample_desc();
        let bytes = encode_state(&desc, ItemKind::Event);
        for cut in [0, 3, 10, bytes.len() - 1] {
            assert!(matches!(
                decode_state(&bytes[..cut], ItemKind::Event),
                Err(ConvertError::NotFound(_))
            ));
        }
    }

    #[test]
    fn unknown_version_is_not_found() {
        let desc = sample_desc();
        let mut bytes = encode_state(&desc, ItemKind::Event);
        bytes[4] = 0xFF;
        assert!(matches!(
            decode_state(&bytes, ItemKind::Event),
            Err(ConvertError::NotFound(_))
        ));
    }

    #[test]
    fn oversized_list_length_is_not_found() {
        let desc = sample_desc();
        let mut bytes = encode_state(&desc, ItemKind::Event);
        // Deleted-occurrence count lives right after the fixed header
        // (4+2+1+4+1+1+1+1+1+1+4+8+8+4+4 = 45 bytes in)
        bytes[45] = 0xFF;
        bytes[46] = 0xFF;
        assert!(matches!(
            decode_state(&bytes, ItemKind::Event),
            Err(ConvertError::NotFound(_))
        ));
    }

    #[test]
    fn modified_bases_survive_round_trip() {
        let mut desc = sample_desc();
        desc.add_modified_occurrence(ModifiedOccurrence {
            base: NaiveDate::from_ymd_opt(2026, 3, 30)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            ..ModifiedOccurrence::default()
        });
        let bytes = encode_state(&desc, ItemKind::Event);
        let decoded = decode_state(&bytes, ItemKind::Event).unwrap();
        assert_eq!(decoded.modified_occurrences.len(), 1);
        assert_eq!(
            decoded.modified_occurrences[0].base,
            desc.modified_occurrences[0].base
        );
    }
}
