//! Global identifier codec: the binary series identity.
//!
//! Fixed layout, 40 bytes of header plus trailing data:
//!
//! | field                    | size |
//! |--------------------------|------|
//! | signature                | 16   |
//! | instance date (YH YL M D)| 4    |
//! | creation time (unix, LE) | 8    |
//! | reserved (zero)          | 8    |
//! | trailing length (LE u32) | 4    |
//! | trailing data            | n    |
//!
//! Store-originated identifiers carry the signature and their own
//! trailing payload. Third-party UIDs are wrapped verbatim as trailing
//! data behind a `vCal-Uid` marker so they survive a full round trip.
//! Every series produces the pair (global, clean): the clean variant has
//! the instance date zeroed so all occurrences share one series key.

use chrono::{DateTime, Datelike, Utc};
use dovetail_core::{ConvertError, ConvertResult};

/// Signature marking a store-originated identifier.
pub const GLOBAL_ID_SIGNATURE: [u8; 16] = [
    0x04, 0x00, 0x00, 0x00, 0x82, 0x00, 0xE0, 0x00, 0x74, 0xC5, 0xB7, 0x10, 0x1A, 0x82, 0xE0,
    0x08,
];

/// Marker introducing a wrapped third-party UID in the trailing data.
const THIRD_PARTY_MARKER: &[u8; 12] = b"vCal-Uid\x01\x00\x00\x00";

const HEADER_LEN: usize = 40;

/// Instance date of an exception, zero for the base series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstanceDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl InstanceDate {
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.year == 0 && self.month == 0 && self.day == 0
    }

    /// The instance date of an occurrence, from its recurrence-identity
    /// timestamp.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "calendar fields are small")]
    pub fn from_utc_date(dt: DateTime<Utc>) -> Self {
        Self {
            year: dt.year().clamp(0, i32::from(u16::MAX)) as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
        }
    }
}

/// The payload an identifier carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalIdData {
    /// Store-originated opaque payload.
    Native(Vec<u8>),
    /// A wrapped third-party UID string.
    ThirdParty(String),
}

/// A decoded global identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalId {
    pub instance_date: InstanceDate,
    /// Creation timestamp, unix seconds; zero when unknown.
    pub creation_time: i64,
    pub data: GlobalIdData,
}

impl GlobalId {
    /// Wraps a wire UID. A UID that is the hex form of a store-originated
    /// identifier decodes back into it; anything else is carried as a
    /// third-party UID.
    #[must_use]
    pub fn from_uid(uid: &str, creation_time: Option<DateTime<Utc>>) -> Self {
        if let Some(decoded) = try_decode_hex_uid(uid) {
            return decoded;
        }
        Self {
            instance_date: InstanceDate::default(),
            creation_time: creation_time.map_or(0, |t| t.timestamp()),
            data: GlobalIdData::ThirdParty(uid.to_string()),
        }
    }

    /// The wire UID form: uppercase hex of the encoded identifier.
    #[must_use]
    pub fn to_uid(&self) -> String {
        hex::encode_upper(self.encode())
    }

    /// A copy stamped with an exception's instance date.
    #[must_use]
    pub fn with_instance_date(&self, date: InstanceDate) -> Self {
        Self {
            instance_date: date,
            ..self.clone()
        }
    }

    /// The clean variant: instance date forced to zero, the stable
    /// series key shared by every occurrence.
    #[must_use]
    pub fn clean(&self) -> Self {
        self.with_instance_date(InstanceDate::default())
    }

    /// Encodes into the fixed binary layout.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let trailing: Vec<u8> = match &self.data {
            GlobalIdData::Native(bytes) => bytes.clone(),
            GlobalIdData::ThirdParty(uid) => {
                let mut wrapped =
                    Vec::with_capacity(THIRD_PARTY_MARKER.len() + uid.len() + 1);
                wrapped.extend_from_slice(THIRD_PARTY_MARKER);
                wrapped.extend_from_slice(uid.as_bytes());
                wrapped.push(0);
                wrapped
            }
        };

        let mut out = Vec::with_capacity(HEADER_LEN + trailing.len());
        out.extend_from_slice(&GLOBAL_ID_SIGNATURE);
        out.extend_from_slice(&self.instance_date.year.to_be_bytes());
        out.push(self.instance_date.month);
        out.push(self.instance_date.day);
        out.extend_from_slice(&self.creation_time.to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
        #[expect(clippy::cast_possible_truncation, reason = "UIDs are far below u32::MAX")]
        let len = trailing.len() as u32;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&trailing);
        out
    }

    /// Decodes the fixed binary layout.
    ///
    /// ## Errors
    /// `CorruptData` on truncation, bad signature, or a trailing length
    /// that disagrees with the buffer.
    pub fn decode(bytes: &[u8]) -> ConvertResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(ConvertError::CorruptData(format!(
                "global id too short: {} bytes",
                bytes.len()
            )));
        }
        if bytes[..16] != GLOBAL_ID_SIGNATURE {
            return Err(ConvertError::CorruptData(
                "global id signature mismatch".to_string(),
            ));
        }

        let instance_date = InstanceDate {
            year: u16::from_be_bytes([bytes[16], bytes[17]]),
            month: bytes[18],
            day: bytes[19],
        };
        let creation_time = i64::from_le_bytes([
            bytes[20], bytes[21], bytes[22], bytes[23], bytes[24], bytes[25], bytes[26],
            bytes[27],
        ]);
        let trailing_len =
            u32::from_le_bytes([bytes[36], bytes[37], bytes[38], bytes[39]]) as usize;

        let trailing = &bytes[HEADER_LEN..];
        if trailing.len() != trailing_len {
            return Err(ConvertError::CorruptData(format!(
                "global id trailing length {trailing_len} disagrees with buffer {}",
                trailing.len()
            )));
        }

        let data = if let Some(wrapped) = trailing.strip_prefix(THIRD_PARTY_MARKER) {
            let uid_bytes = wrapped.strip_suffix(&[0]).unwrap_or(wrapped);
            let uid = String::from_utf8(uid_bytes.to_vec()).map_err(|_| {
                ConvertError::CorruptData("third-party uid is not UTF-8".to_string())
            })?;
            GlobalIdData::ThirdParty(uid)
        } else {
            GlobalIdData::Native(trailing.to_vec())
        };

        Ok(Self {
            instance_date,
            creation_time,
            data,
        })
    }
}

/// Attempts to read a wire UID as the hex form of an encoded identifier.
fn try_decode_hex_uid(uid: &str) -> Option<GlobalId> {
    if uid.len() < HEADER_LEN * 2 || uid.len() % 2 != 0 {
        return None;
    }
    let bytes = hex::decode(uid).ok()?;
    GlobalId::decode(&bytes).ok()
}
