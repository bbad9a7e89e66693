//! Canonical health record types.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! record_types {
    ($($variant:ident),+ $(,)?) => {
        /// A canonical health record type.
        ///
        /// The declaration order is the order in which a sync pass visits
        /// the types.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum RecordType {
            $(
                #[allow(missing_docs)]
                $variant,
            )+
        }

        impl RecordType {
            /// Every record type, in sync order.
            pub const ALL: &'static [RecordType] = &[$(RecordType::$variant),+];

            /// Returns the canonical (PascalCase) name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(RecordType::$variant => stringify!($variant),)+
                }
            }
        }
    };
}

record_types! {
    ActiveCaloriesBurned,
    BasalBodyTemperature,
    BloodGlucose,
    BloodPressure,
    BasalMetabolicRate,
    BodyFat,
    BodyTemperature,
    BoneMass,
    CyclingPedalingCadence,
    CervicalMucus,
    ExerciseSession,
    Distance,
    ElevationGained,
    FloorsClimbed,
    HeartRate,
    Height,
    Hydration,
    LeanBodyMass,
    MenstruationFlow,
    MenstruationPeriod,
    Nutrition,
    OvulationTest,
    OxygenSaturation,
    Power,
    RespiratoryRate,
    RestingHeartRate,
    SleepSession,
    Speed,
    Steps,
    StepsCadence,
    TotalCaloriesBurned,
    Vo2Max,
    Weight,
    WheelchairPushes,
}

impl RecordType {
    /// Returns true if the store's bulk listing omits fields the server
    /// needs, so each record must be read individually before upload.
    pub fn requires_detail(&self) -> bool {
        matches!(
            self,
            RecordType::SleepSession | RecordType::Speed | RecordType::HeartRate
        )
    }

    /// Returns the read and write permissions for this type.
    pub fn permissions(&self) -> [Permission; 2] {
        [
            Permission::new(AccessType::Read, *self),
            Permission::new(AccessType::Write, *self),
        ]
    }

    /// Returns every permission the gateway needs (read and write for all
    /// types).
    pub fn all_permissions() -> Vec<Permission> {
        Self::ALL.iter().flat_map(|t| t.permissions()).collect()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = ProtocolError;

    /// Parses a record type name, ignoring ASCII case.
    ///
    /// The server addresses collections with a lower-cased first letter
    /// (`steps`, `heartRate`), so both spellings resolve.
    fn from_str(s: &str) -> ProtocolResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolError::UnknownRecordType(s.to_string()))
    }
}

impl TryFrom<String> for RecordType {
    type Error = ProtocolError;

    fn try_from(value: String) -> ProtocolResult<Self> {
        value.parse()
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

/// Kind of access a permission grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Read records of the type.
    Read,
    /// Insert or delete records of the type.
    Write,
}

/// A single access grant on a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Access kind.
    pub access_type: AccessType,
    /// Record type the access applies to.
    pub record_type: RecordType,
}

impl Permission {
    /// Creates a permission.
    pub fn new(access_type: AccessType, record_type: RecordType) -> Self {
        Self {
            access_type,
            record_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_set_has_34_types() {
        assert_eq!(RecordType::ALL.len(), 34);
        assert_eq!(RecordType::ALL[0], RecordType::ActiveCaloriesBurned);
        assert_eq!(RecordType::ALL[33], RecordType::WheelchairPushes);
    }

    #[test]
    fn detail_required_types() {
        let detail: Vec<_> = RecordType::ALL
            .iter()
            .filter(|t| t.requires_detail())
            .collect();
        assert_eq!(
            detail,
            vec![
                &RecordType::HeartRate,
                &RecordType::SleepSession,
                &RecordType::Speed
            ]
        );
    }

    #[test]
    fn parse_ignores_case() {
        assert_eq!("Steps".parse::<RecordType>().unwrap(), RecordType::Steps);
        assert_eq!(
            "heartRate".parse::<RecordType>().unwrap(),
            RecordType::HeartRate
        );
        assert_eq!("VO2MAX".parse::<RecordType>().unwrap(), RecordType::Vo2Max);
        assert!(matches!(
            "Mood".parse::<RecordType>(),
            Err(ProtocolError::UnknownRecordType(_))
        ));
    }

    #[test]
    fn serde_uses_canonical_name() {
        let json = serde_json::to_string(&RecordType::SleepSession).unwrap();
        assert_eq!(json, "\"SleepSession\"");
        let parsed: RecordType = serde_json::from_str("\"sleepSession\"").unwrap();
        assert_eq!(parsed, RecordType::SleepSession);
        assert!(serde_json::from_str::<RecordType>("\"Unknown\"").is_err());
    }

    #[test]
    fn full_permission_set() {
        let all = RecordType::all_permissions();
        assert_eq!(all.len(), 68);
        assert!(all.contains(&Permission::new(AccessType::Write, RecordType::Steps)));
    }
}
