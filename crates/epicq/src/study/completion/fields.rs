use serde::{Deserialize, Serialize};

use crate::study::hospital::{HospitalBasicInfo, HospitalContact, HospitalDetails};

/// Every entry of the hospital form checklist, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    HospitalName,
    Province,
    City,
    ParticipatedLasos,
    NumberOfBeds,
    NumberOfOperatingRooms,
    NumberOfIcuBeds,
    AverageWeeklySurgeries,
    FinancingType,
    PreopClinic,
    ResidencyProgram,
    RapidResponseTeam,
    EthicsCommittee,
    UniversityAffiliated,
    CoordinatorName,
    CoordinatorEmail,
    CoordinatorPhone,
    CoordinatorSpecialty,
}

impl FieldKey {
    pub const fn ordered() -> [Self; 18] {
        [
            Self::HospitalName,
            Self::Province,
            Self::City,
            Self::ParticipatedLasos,
            Self::NumberOfBeds,
            Self::NumberOfOperatingRooms,
            Self::NumberOfIcuBeds,
            Self::AverageWeeklySurgeries,
            Self::FinancingType,
            Self::PreopClinic,
            Self::ResidencyProgram,
            Self::RapidResponseTeam,
            Self::EthicsCommittee,
            Self::UniversityAffiliated,
            Self::CoordinatorName,
            Self::CoordinatorEmail,
            Self::CoordinatorPhone,
            Self::CoordinatorSpecialty,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::HospitalName => "Nombre del Hospital",
            Self::Province => "Provincia",
            Self::City => "Ciudad",
            Self::ParticipatedLasos => "Participación en LASOS",
            Self::NumberOfBeds => "Número de Camas",
            Self::NumberOfOperatingRooms => "Número de Quirófanos",
            Self::NumberOfIcuBeds => "Camas de UCI",
            Self::AverageWeeklySurgeries => "Cirugías Semanales Promedio",
            Self::FinancingType => "Tipo de Financiamiento",
            Self::PreopClinic => "Consultorio Prequirúrgico",
            Self::ResidencyProgram => "Programa de Residencia",
            Self::RapidResponseTeam => "Equipo de Respuesta Rápida",
            Self::EthicsCommittee => "Comité de Ética",
            Self::UniversityAffiliated => "Afiliación Universitaria",
            Self::CoordinatorName => "Nombre del Coordinador",
            Self::CoordinatorEmail => "Email del Coordinador",
            Self::CoordinatorPhone => "Teléfono del Coordinador",
            Self::CoordinatorSpecialty => "Especialidad del Coordinador",
        }
    }
}

/// Typed answer behind a checklist entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(Option<String>),
    Number(Option<u32>),
    Flag(Option<bool>),
}

impl FieldValue {
    /// A flag only counts once it has been answered either way; text must be non-empty.
    pub fn is_complete(&self) -> bool {
        match self {
            FieldValue::Text(value) => value.as_deref().is_some_and(|text| !text.is_empty()),
            FieldValue::Number(value) => value.is_some(),
            FieldValue::Flag(value) => value.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HospitalFormField {
    pub key: FieldKey,
    pub label: &'static str,
    pub value: FieldValue,
    pub required: bool,
}

impl HospitalFormField {
    pub fn is_complete(&self) -> bool {
        self.value.is_complete()
    }
}

/// Reads the raw answer for `key` out of the three source records.
pub(crate) fn field_value(
    key: FieldKey,
    basic: &HospitalBasicInfo,
    details: Option<&HospitalDetails>,
    contact: Option<&HospitalContact>,
) -> FieldValue {
    let text = |value: Option<&String>| FieldValue::Text(value.cloned());

    match key {
        FieldKey::HospitalName => text(basic.name.as_ref()),
        FieldKey::Province => text(basic.province.as_ref()),
        FieldKey::City => text(basic.city.as_ref()),
        FieldKey::ParticipatedLasos => FieldValue::Flag(basic.participated_lasos),
        FieldKey::NumberOfBeds => FieldValue::Number(details.and_then(|d| d.number_of_beds)),
        FieldKey::NumberOfOperatingRooms => {
            FieldValue::Number(details.and_then(|d| d.number_of_operating_rooms))
        }
        FieldKey::NumberOfIcuBeds => FieldValue::Number(details.and_then(|d| d.number_of_icu_beds)),
        FieldKey::AverageWeeklySurgeries => {
            FieldValue::Number(details.and_then(|d| d.average_weekly_surgeries))
        }
        FieldKey::FinancingType => text(details.and_then(|d| d.financing_type.as_ref())),
        FieldKey::PreopClinic => text(details.and_then(|d| d.has_preop_clinic.as_ref())),
        FieldKey::ResidencyProgram => {
            FieldValue::Flag(details.and_then(|d| d.has_residency_program))
        }
        FieldKey::RapidResponseTeam => {
            FieldValue::Flag(details.and_then(|d| d.has_rapid_response_team))
        }
        FieldKey::EthicsCommittee => FieldValue::Flag(details.and_then(|d| d.has_ethics_committee)),
        FieldKey::UniversityAffiliated => {
            FieldValue::Flag(details.and_then(|d| d.university_affiliated))
        }
        FieldKey::CoordinatorName => text(contact.and_then(|c| c.name.as_ref())),
        FieldKey::CoordinatorEmail => text(contact.and_then(|c| c.email.as_ref())),
        FieldKey::CoordinatorPhone => text(contact.and_then(|c| c.phone.as_ref())),
        FieldKey::CoordinatorSpecialty => text(contact.and_then(|c| c.specialty.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_distinguish_unanswered_from_false() {
        assert!(!FieldValue::Flag(None).is_complete());
        assert!(FieldValue::Flag(Some(false)).is_complete());
        assert!(FieldValue::Flag(Some(true)).is_complete());
    }

    #[test]
    fn empty_text_is_missing_but_zero_is_an_answer() {
        assert!(!FieldValue::Text(Some(String::new())).is_complete());
        assert!(!FieldValue::Text(None).is_complete());
        assert!(FieldValue::Text(Some("public".to_string())).is_complete());
        assert!(FieldValue::Number(Some(0)).is_complete());
        assert!(!FieldValue::Number(None).is_complete());
    }

    #[test]
    fn ordered_keys_are_unique() {
        let keys = FieldKey::ordered();
        let unique: std::collections::BTreeSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }
}
