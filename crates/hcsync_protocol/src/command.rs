//! Server-originated push commands.

use crate::error::{ProtocolError, ProtocolResult};
use crate::record::HealthRecord;
use crate::record_type::RecordType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `op` tag of an insert command.
pub const OP_INSERT: &str = "PUSH";

/// `op` tag of a delete command.
pub const OP_DELETE: &str = "DEL";

/// A raw push message as delivered by the messaging channel.
///
/// `data` is itself a JSON-encoded string: an array of records for
/// [`OP_INSERT`], or `{recordType, uuids}` for [`OP_DELETE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Operation tag.
    pub op: String,
    /// JSON-encoded payload.
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletePayload {
    record_type: String,
    uuids: Vec<String>,
}

impl PushMessage {
    /// Builds an insert message for `records`, tagging each with
    /// `record_type`.
    pub fn insert(record_type: RecordType, records: Vec<HealthRecord>) -> ProtocolResult<Self> {
        let tagged: Vec<HealthRecord> = records
            .into_iter()
            .map(|mut r| {
                r.set_record_type(record_type);
                r
            })
            .collect();
        Ok(Self {
            op: OP_INSERT.into(),
            data: serde_json::to_string(&tagged)?,
        })
    }

    /// Builds a delete message.
    pub fn delete(record_type: RecordType, uuids: Vec<String>) -> ProtocolResult<Self> {
        let payload = DeletePayload {
            record_type: record_type.to_string(),
            uuids,
        };
        Ok(Self {
            op: OP_DELETE.into(),
            data: serde_json::to_string(&payload)?,
        })
    }

    /// Best-effort extraction of the record type a message targets.
    ///
    /// Used to label failure alerts when full decoding fails.
    pub fn record_type_hint(&self) -> Option<String> {
        let value: Value = serde_json::from_str(&self.data).ok()?;
        let tagged = match &value {
            Value::Array(items) => items.first()?,
            other => other,
        };
        tagged
            .get("recordType")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// A decoded push command.
#[derive(Debug, Clone, PartialEq)]
pub enum PushCommand {
    /// Write records into the local store.
    Insert {
        /// Target type, taken from the first record.
        record_type: RecordType,
        /// Records to write.
        records: Vec<HealthRecord>,
    },
    /// Remove records by identifier, locally and remotely.
    Delete {
        /// Target type.
        record_type: RecordType,
        /// Identifiers to remove.
        uuids: Vec<String>,
    },
}

impl PushCommand {
    /// Decodes a raw push message.
    pub fn decode(message: &PushMessage) -> ProtocolResult<Self> {
        match message.op.as_str() {
            OP_INSERT => Self::decode_insert(&message.data),
            OP_DELETE => Self::decode_delete(&message.data),
            other => Err(ProtocolError::UnknownOp(other.to_string())),
        }
    }

    fn decode_insert(data: &str) -> ProtocolResult<Self> {
        let values: Vec<Value> = serde_json::from_str(data)?;
        let first = values.first().ok_or(ProtocolError::EmptyInsert)?;
        let record_type: RecordType = first
            .get("recordType")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingRecordType)?
            .parse()?;

        let records = values
            .into_iter()
            .map(HealthRecord::from_value)
            .collect::<ProtocolResult<Vec<_>>>()?;

        Ok(PushCommand::Insert {
            record_type,
            records,
        })
    }

    fn decode_delete(data: &str) -> ProtocolResult<Self> {
        let payload: DeletePayload = serde_json::from_str(data)?;
        Ok(PushCommand::Delete {
            record_type: payload.record_type.parse()?,
            uuids: payload.uuids,
        })
    }

    /// Returns the record type the command targets.
    pub fn record_type(&self) -> RecordType {
        match self {
            PushCommand::Insert { record_type, .. } | PushCommand::Delete { record_type, .. } => {
                *record_type
            }
        }
    }
}
