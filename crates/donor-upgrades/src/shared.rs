//! Transitions both donor types went through, each registered once under
//! the human and the rodent version number.

use record_upgrade::{
    get_str, transform, upgrade_step, Record, StepError, StepRegistry, UpgradeContext,
    UpgradeError,
};
use serde_json::Value;

use crate::{BACKFILLED_RELEASE_TIMESTAMP, NOTE_SEPARATOR};

/// Link lists that used to be stored even when empty.
const OPTIONAL_LISTS: &[&str] = &[
    "parents",
    "external_resources",
    "aliases",
    "collections",
    "alternate_accessions",
    "documents",
    "references",
];

const ACCESSION_PREFIX_LEN: usize = 6;

pub(crate) fn register(registry: &mut StepRegistry) -> Result<(), UpgradeError> {
    register_drop_empty_lists(registry)?;
    register_pad_accession(registry)?;
    register_drop_external_resources(registry)?;
    register_traits_to_notes(registry)?;
    register_virtual_default(registry)?;
    register_references_to_publication_identifiers(registry)?;
    register_drop_blank_description(registry)?;
    register_backfill_release_timestamp(registry)?;
    register_sex_to_gender(registry)?;
    Ok(())
}

#[upgrade_step(human_donor(from = 1, to = 2), rodent_donor(from = 1, to = 2))]
fn drop_empty_lists(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    for key in OPTIONAL_LISTS {
        transform::remove_if_empty(value, key);
    }
    Ok(())
}

/// Accessions grew by two characters: a `0` after the six-character prefix
/// and a trailing `A`.
#[upgrade_step(human_donor(from = 4, to = 5), rodent_donor(from = 2, to = 3))]
fn pad_accession(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    let Some(accession) = get_str(value, "accession")? else {
        return Ok(());
    };
    let split = match accession.char_indices().nth(ACCESSION_PREFIX_LEN) {
        Some((at, _)) => at,
        None if accession.chars().count() == ACCESSION_PREFIX_LEN => accession.len(),
        None => {
            return Err(StepError::Invalid(format!(
                "accession `{accession}` is shorter than its {ACCESSION_PREFIX_LEN}-character prefix"
            )))
        }
    };
    let (prefix, suffix) = accession.split_at(split);
    let padded = format!("{prefix}0{suffix}A");
    value.insert("accession".into(), Value::String(padded));
    Ok(())
}

#[upgrade_step(human_donor(from = 5, to = 6), rodent_donor(from = 3, to = 4))]
fn drop_external_resources(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    transform::remove_field(value, "external_resources");
    Ok(())
}

#[upgrade_step(human_donor(from = 6, to = 7), rodent_donor(from = 5, to = 6))]
fn traits_to_notes(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    list_to_notes(value, "traits")
}

/// `virtual` gained a schema default; stored records need no change.
#[upgrade_step(human_donor(from = 8, to = 9), rodent_donor(from = 7, to = 8))]
fn virtual_default(_value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    Ok(())
}

#[upgrade_step(human_donor(from = 10, to = 11), rodent_donor(from = 8, to = 9))]
fn references_to_publication_identifiers(
    value: &mut Record,
    _ctx: &dyn UpgradeContext,
) -> Result<(), StepError> {
    transform::rename_field(value, "references", "publication_identifiers");
    Ok(())
}

#[upgrade_step(human_donor(from = 11, to = 12), rodent_donor(from = 10, to = 11))]
fn drop_blank_description(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    transform::remove_if_blank(value, "description");
    Ok(())
}

/// Published records that predate `release_timestamp` get a fixed one, and a
/// note saying so.
#[upgrade_step(human_donor(from = 12, to = 13), rodent_donor(from = 11, to = 12))]
fn backfill_release_timestamp(
    value: &mut Record,
    _ctx: &dyn UpgradeContext,
) -> Result<(), StepError> {
    let published = matches!(
        get_str(value, "status")?,
        Some("released" | "archived" | "revoked")
    );
    if !published || value.contains_key("release_timestamp") {
        return Ok(());
    }
    value.insert(
        "release_timestamp".into(),
        Value::String(BACKFILLED_RELEASE_TIMESTAMP.to_string()),
    );
    let note =
        format!("This object's release_timestamp has been set to {BACKFILLED_RELEASE_TIMESTAMP}");
    transform::append_note_once(value, "notes", &note, NOTE_SEPARATOR)?;
    Ok(())
}

#[upgrade_step(human_donor(from = 18, to = 19), rodent_donor(from = 12, to = 13))]
fn sex_to_gender(value: &mut Record, _ctx: &dyn UpgradeContext) -> Result<(), StepError> {
    transform::rename_field(value, "sex", "gender");
    Ok(())
}

/// Fold a retired list field into `notes` as `"{field}: {item}"` fragments.
pub(crate) fn list_to_notes(value: &mut Record, field: &str) -> Result<(), StepError> {
    let Some(items) = transform::remove_field(value, field) else {
        return Ok(());
    };
    let items = match items {
        Value::Array(items) => items,
        other => {
            return Err(StepError::UnexpectedType {
                field: field.to_string(),
                expected: "array",
                found: record_upgrade::kind_of(&other),
            })
        }
    };
    for item in &items {
        let text = match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        transform::append_note(value, "notes", &format!("{field}: {text}"), NOTE_SEPARATOR)?;
    }
    Ok(())
}
