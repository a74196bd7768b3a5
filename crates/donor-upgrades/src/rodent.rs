//! Transitions only `rodent_donor` went through.

use record_upgrade::{
    transform, upgrade_step, Record, StepError, StepRegistry, UpgradeContext, UpgradeError,
};
use serde_json::Value;

use crate::shared::list_to_notes;

pub(crate) fn register(registry: &mut StepRegistry) -> Result<(), UpgradeError> {
    register_default_individual_rodent(registry)?;
    register_parents_to_notes(registry)?;
    register_pluralize_source(registry)?;
    Ok(())
}

#[upgrade_step(rodent_donor(from = 4, to = 5))]
fn default_individual_rodent(
    value: &mut Record,
    _ctx: &dyn UpgradeContext,
) -> Result<(), StepError> {
    transform::ensure_default(value, "individual_rodent", Value::Bool(false));
    Ok(())
}

/// Rodent parents were never linkable donors; they survive as notes.
#[upgrade_step(rodent_donor(from = 6, to = 7))]
fn parents_to_notes(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    list_to_notes(value, "parents")
}

#[upgrade_step(rodent_donor(from = 9, to = 10))]
fn pluralize_source(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    let Some(source) = transform::remove_field(value, "source") else {
        return Ok(());
    };
    let sources = match source {
        Value::Array(items) => items,
        single => vec![single],
    };
    value.insert("sources".into(), Value::Array(sources));
    Ok(())
}

#[cfg(test)]
mod tests {
    use record_upgrade::{NoContext, UpgradeStep};
    use serde_json::json;

    use super::*;

    fn apply(step: &dyn UpgradeStep, value: Value) -> Result<Value, StepError> {
        let record = value.as_object().cloned().unwrap();
        step.apply(record, &NoContext).map(Value::Object)
    }

    #[test]
    fn individual_rodent_defaults_to_false() {
        assert_eq!(
            apply(&DefaultIndividualRodentStep, json!({})).unwrap(),
            json!({"individual_rodent": false})
        );
        assert_eq!(
            apply(&DefaultIndividualRodentStep, json!({"individual_rodent": true})).unwrap(),
            json!({"individual_rodent": true})
        );
    }

    #[test]
    fn parents_become_notes_without_prior_notes() {
        let out = apply(
            &ParentsToNotesStep,
            json!({"parents": ["/rodent-donors/A/", "/rodent-donors/B/"]}),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({"notes": "parents: /rodent-donors/A/  parents: /rodent-donors/B/"})
        );
    }

    #[test]
    fn parents_append_to_existing_notes() {
        let out = apply(
            &ParentsToNotesStep,
            json!({"parents": ["/rodent-donors/A/"], "notes": "Bred in house."}),
        )
        .unwrap();
        assert_eq!(
            out["notes"],
            json!("Bred in house.  parents: /rodent-donors/A/")
        );
    }

    #[test]
    fn parents_must_be_a_list() {
        assert!(matches!(
            apply(&ParentsToNotesStep, json!({"parents": "/rodent-donors/A/"})),
            Err(StepError::UnexpectedType { expected: "array", .. })
        ));
    }

    #[test]
    fn source_becomes_sources() {
        assert_eq!(
            apply(&PluralizeSourceStep, json!({"source": "/sources/jax/"})).unwrap(),
            json!({"sources": ["/sources/jax/"]})
        );
        assert_eq!(apply(&PluralizeSourceStep, json!({})).unwrap(), json!({}));
    }
}
