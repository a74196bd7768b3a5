//! Transitions only `human_donor` went through.

use record_upgrade::{
    transform, upgrade_step, Record, StepError, StepRegistry, UpgradeContext, UpgradeError,
};
use serde_json::{json, Value};

use crate::vocab;

/// Placeholder for diabetes fields that were recorded as `null`.
const NOT_APPLICABLE: &str = "N/A";

pub(crate) fn register(registry: &mut StepRegistry) -> Result<(), UpgradeError> {
    register_drop_health_status_history(registry)?;
    register_pluralize_ethnicity(registry)?;
    register_parents_to_related_donors(registry)?;
    register_pluralize_donor_identifier(registry)?;
    register_schema_bridge(registry)?;
    register_stringify_diabetes_fields(registry)?;
    register_weigh_genetic_ethnicities(registry)?;
    register_refresh_terminology(registry)?;
    register_merge_glucose_therapy(registry)?;
    register_biological_sex_to_genetic_sex(registry)?;
    register_close_vocabularies(registry)?;
    Ok(())
}

#[upgrade_step(human_donor(from = 2, to = 3))]
fn drop_health_status_history(
    value: &mut Record,
    _ctx: &dyn UpgradeContext,
) -> Result<(), StepError> {
    transform::remove_field(value, "health_status_history");
    Ok(())
}

#[upgrade_step(human_donor(from = 3, to = 4))]
fn pluralize_ethnicity(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    transform::rename_field(value, "ethnicity", "ethnicities");
    Ok(())
}

#[upgrade_step(human_donor(from = 7, to = 8))]
fn parents_to_related_donors(
    value: &mut Record,
    _ctx: &dyn UpgradeContext,
) -> Result<(), StepError> {
    transform::wrap_scalars(value, "parents", "related_donors", |donor| {
        json!({"donor": donor, "relationship_type": "parent"})
    })?;
    Ok(())
}

#[upgrade_step(human_donor(from = 9, to = 10))]
fn pluralize_donor_identifier(
    value: &mut Record,
    _ctx: &dyn UpgradeContext,
) -> Result<(), StepError> {
    transform::rename_field(value, "human_donor_identifier", "human_donor_identifiers");
    Ok(())
}

/// Versions 13 and 14 store the same shape.
#[upgrade_step(human_donor(from = 13, to = 14))]
fn schema_bridge(_value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    Ok(())
}

#[upgrade_step(human_donor(from = 14, to = 15))]
fn stringify_diabetes_fields(
    value: &mut Record,
    _ctx: &dyn UpgradeContext,
) -> Result<(), StepError> {
    transform::coerce_bool_to_str(
        value,
        "family_history_of_diabetes",
        "true",
        "false",
        NOT_APPLICABLE,
    );
    // Booleans were stored as numbers here and read back as words.
    transform::coerce_bool_to_str(value, "diabetes_duration", "True", "False", NOT_APPLICABLE);
    transform::coerce_number_to_str(value, "diabetes_duration", NOT_APPLICABLE);
    transform::ensure_array(value, "other_tissues_available");
    transform::ensure_array(value, "diabetes_status");
    Ok(())
}

/// Plain ethnicity names become `{ethnicity, percentage: 100}`.
#[upgrade_step(human_donor(from = 15, to = 16))]
fn weigh_genetic_ethnicities(
    value: &mut Record,
    _ctx: &dyn UpgradeContext,
) -> Result<(), StepError> {
    transform::wrap_scalars(value, "genetic_ethnicities", "genetic_ethnicities", |ethnicity| {
        json!({"ethnicity": ethnicity, "percentage": 100})
    })?;
    Ok(())
}

#[upgrade_step(human_donor(from = 16, to = 17))]
fn refresh_terminology(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    transform::remap_field(value, "t1d_stage", &vocab::T1D_STAGE_LEVELS)?;
    transform::remap_field(
        value,
        "diabetes_status_description",
        &vocab::DIABETES_STATUS_TERMS,
    )?;
    if matches!(value.get("ethnicities"), Some(Value::Array(_))) {
        transform::remap_array(value, "ethnicities", &vocab::ETHNICITY_TERMS)?;
    }
    transform::remap_field(value, "donation_type", &vocab::DONATION_TYPE_NAMES)?;
    Ok(())
}

/// The misspelled `glucose_loweing_theraphy` list is folded into
/// `other_theraphy`.
#[upgrade_step(human_donor(from = 17, to = 18))]
fn merge_glucose_therapy(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    transform::merge_into_array(value, "glucose_loweing_theraphy", "other_theraphy");
    Ok(())
}

#[upgrade_step(human_donor(from = 19, to = 20))]
fn biological_sex_to_genetic_sex(
    value: &mut Record,
    _ctx: &dyn UpgradeContext,
) -> Result<(), StepError> {
    transform::rename_field(value, "biological_sex", "genetic_sex");
    Ok(())
}

/// Every enumerated field is forced into its closed vocabulary; anything
/// unrecognised becomes the field's fallback term.
#[upgrade_step(human_donor(from = 20, to = 21))]
fn close_vocabularies(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    let fields: [(&str, &transform::EnumRemap); 6] = [
        ("family_history_of_diabetes", &vocab::FAMILY_HISTORY),
        ("donation_type", &vocab::DONATION_TYPE),
        ("gender", &vocab::SEX),
        ("genetic_sex", &vocab::SEX),
        ("diabetes_status_description", &vocab::DIABETES_STATUS),
        ("t1d_stage", &vocab::T1D_STAGE),
    ];
    for (field, remap) in fields {
        transform::remap_field(value, field, remap)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use record_upgrade::{NoContext, UpgradeStep};

    use super::*;

    fn apply(step: &dyn UpgradeStep, value: Value) -> Result<Value, StepError> {
        let record = value.as_object().cloned().unwrap();
        step.apply(record, &NoContext).map(Value::Object)
    }

    #[test]
    fn parents_become_related_donors() {
        let out = apply(
            &ParentsToRelatedDonorsStep,
            json!({"parents": ["/human-donors/IGVFDO0001AAAA/"], "lab": "/labs/x/"}),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({
                "lab": "/labs/x/",
                "related_donors": [
                    {"donor": "/human-donors/IGVFDO0001AAAA/", "relationship_type": "parent"}
                ]
            })
        );
    }

    #[test]
    fn diabetes_fields_become_strings() {
        let out = apply(
            &StringifyDiabetesFieldsStep,
            json!({
                "family_history_of_diabetes": true,
                "diabetes_duration": 12,
                "diabetes_status": "type 1"
            }),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({
                "family_history_of_diabetes": "true",
                "diabetes_duration": "12",
                "diabetes_status": [],
                "other_tissues_available": []
            })
        );

        let nulls = apply(
            &StringifyDiabetesFieldsStep,
            json!({"family_history_of_diabetes": null, "diabetes_duration": null}),
        )
        .unwrap();
        assert_eq!(nulls["family_history_of_diabetes"], json!("N/A"));
        assert_eq!(nulls["diabetes_duration"], json!("N/A"));

        let flags = apply(&StringifyDiabetesFieldsStep, json!({"diabetes_duration": true})).unwrap();
        assert_eq!(flags["diabetes_duration"], json!("True"));
        let flags = apply(&StringifyDiabetesFieldsStep, json!({"diabetes_duration": false})).unwrap();
        assert_eq!(flags["diabetes_duration"], json!("False"));
    }

    #[test]
    fn genetic_ethnicities_get_percentages() {
        let out = apply(
            &WeighGeneticEthnicitiesStep,
            json!({"genetic_ethnicities": ["Asian", {"ethnicity": "White", "percentage": 40}]}),
        )
        .unwrap();
        assert_eq!(
            out["genetic_ethnicities"],
            json!([
                {"ethnicity": "Asian", "percentage": 100},
                {"ethnicity": "White", "percentage": 40}
            ])
        );
    }

    #[test]
    fn terminology_refresh_keeps_unknown_values() {
        let out = apply(
            &RefreshTerminologyStep,
            json!({
                "t1d_stage": "Stage 1: Two or more autoantibodies, normal glucose metabolism",
                "diabetes_status_description": "non-diabetic",
                "ethnicities": ["Caucasian", "Asian"],
                "donation_type": "DBD"
            }),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({
                "t1d_stage": "Stage 1: Two or more autoantibodies, normal glucose metabolism level",
                "diabetes_status_description": "control without diabetes",
                "ethnicities": ["White", "Asian"],
                "donation_type": "Donation after Brain Death"
            })
        );

        let unknown = json!({"donation_type": "XYZ", "ethnicities": "Caucasian"});
        assert_eq!(apply(&RefreshTerminologyStep, unknown.clone()).unwrap(), unknown);
    }

    #[test]
    fn glucose_therapy_merged() {
        let out = apply(
            &MergeGlucoseTherapyStep,
            json!({"glucose_loweing_theraphy": ["insulin", "metformin", ""], "other_theraphy": ["metformin"]}),
        )
        .unwrap();
        assert_eq!(out, json!({"other_theraphy": ["metformin", "insulin"]}));
    }

    #[test]
    fn vocabularies_closed_with_fallback() {
        let out = apply(
            &CloseVocabulariesStep,
            json!({
                "family_history_of_diabetes": "true",
                "donation_type": "Natural Death Donation",
                "gender": "female",
                "genetic_sex": "unknown",
                "diabetes_status_description": "control without diabetes",
                "t1d_stage": "something else"
            }),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({
                "family_history_of_diabetes": "TRUE",
                "donation_type": "Natural death donation",
                "gender": "Female",
                "genetic_sex": "-",
                "diabetes_status_description": "Control Without Diabetes",
                "t1d_stage": "No sufficient information to derive"
            })
        );
    }

    #[test]
    fn vocabulary_step_is_idempotent() {
        let input = json!({
            "family_history_of_diabetes": false,
            "donation_type": "MAD",
            "gender": "OTHER",
            "t1d_stage": null
        });
        let once = apply(&CloseVocabulariesStep, input).unwrap();
        let twice = apply(&CloseVocabulariesStep, once.clone()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once["family_history_of_diabetes"], json!("FALSE"));
        assert_eq!(once["t1d_stage"], json!("No sufficient information to derive"));
    }

    #[test]
    fn renames() {
        assert_eq!(
            apply(&PluralizeEthnicityStep, json!({"ethnicity": ["Asian"]})).unwrap(),
            json!({"ethnicities": ["Asian"]})
        );
        assert_eq!(
            apply(&PluralizeDonorIdentifierStep, json!({"human_donor_identifier": ["d1"]})).unwrap(),
            json!({"human_donor_identifiers": ["d1"]})
        );
        assert_eq!(
            apply(&BiologicalSexToGeneticSexStep, json!({"biological_sex": "male"})).unwrap(),
            json!({"genetic_sex": "male"})
        );
        assert_eq!(
            apply(&DropHealthStatusHistoryStep, json!({"health_status_history": []})).unwrap(),
            json!({})
        );
        assert_eq!(apply(&SchemaBridgeStep, json!({"a": 1})).unwrap(), json!({"a": 1}));
    }
}
