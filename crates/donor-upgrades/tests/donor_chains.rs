//! End-to-end upgrades of donor records through the registered chains.

use donor_upgrades::{
    catalog, registry, BACKFILLED_RELEASE_TIMESTAMP, HUMAN_DONOR, HUMAN_DONOR_VERSION,
    RODENT_DONOR, RODENT_DONOR_VERSION,
};
use proptest::prelude::*;
use record_upgrade::{NoContext, Record, UpgradeError, UpgradeStep, Upgrader};
use serde_json::{json, Value};

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn upgrader() -> Upgrader {
    Upgrader::new(registry().unwrap())
}

const RELEASE_NOTE: &str = "This object's release_timestamp has been set to 2024-03-06T12:34:56Z";

#[test]
fn released_record_gets_timestamp_and_note() {
    let out = upgrader()
        .upgrade(HUMAN_DONOR, &record(json!({"status": "released"})), 12, 13, &NoContext)
        .unwrap();

    assert_eq!(out.applied_count(), 1);
    assert_eq!(
        Value::Object(out.record),
        json!({
            "status": "released",
            "release_timestamp": BACKFILLED_RELEASE_TIMESTAMP,
            "notes": RELEASE_NOTE
        })
    );
}

#[test]
fn rerunning_the_derivation_does_not_duplicate_the_note() {
    let upgrader = upgrader();
    let step = upgrader.registry().lookup(RODENT_DONOR, 11).unwrap();

    let once = step
        .apply(record(json!({"status": "revoked", "notes": "x"})), &NoContext)
        .unwrap();
    let mut stripped = once.clone();
    stripped.remove("release_timestamp");
    let twice = step.apply(stripped, &NoContext).unwrap();

    assert_eq!(twice["notes"], json!(format!("x  {RELEASE_NOTE}")));
    assert_eq!(twice["notes"], once["notes"]);
}

#[test]
fn parents_reshaped_into_related_donors() {
    let out = upgrader()
        .upgrade(
            HUMAN_DONOR,
            &record(json!({"parents": ["/donor/1", "/donor/2"]})),
            7,
            8,
            &NoContext,
        )
        .unwrap();

    assert_eq!(
        Value::Object(out.record),
        json!({"related_donors": [
            {"donor": "/donor/1", "relationship_type": "parent"},
            {"donor": "/donor/2", "relationship_type": "parent"}
        ]})
    );
}

#[test]
fn traits_sharing_a_prefix_are_all_kept() {
    let out = upgrader()
        .upgrade(
            HUMAN_DONOR,
            &record(json!({"traits": ["/phenotypes/10", "/phenotypes/1"]})),
            6,
            7,
            &NoContext,
        )
        .unwrap();
    assert_eq!(
        Value::Object(out.record),
        json!({"notes": "traits: /phenotypes/10  traits: /phenotypes/1"})
    );
}

#[test]
fn rodent_parents_and_traits_accumulate() {
    let out = upgrader()
        .upgrade(
            RODENT_DONOR,
            &record(json!({
                "notes": "see traits: obese-ish",
                "traits": ["obese"],
                "parents": ["/rodent-donors/A/", "/rodent-donors/A/"]
            })),
            5,
            7,
            &NoContext,
        )
        .unwrap();
    assert_eq!(
        out.record["notes"],
        json!("see traits: obese-ish  traits: obese  parents: /rodent-donors/A/  parents: /rodent-donors/A/")
    );
}

#[test]
fn human_donor_full_chain() {
    let v1 = record(json!({
        "accession": "IGVFDO123AAA",
        "status": "released",
        "aliases": [],
        "documents": [],
        "ethnicity": ["Caucasian"],
        "health_status_history": [{"health_description": "healthy"}],
        "external_resources": [{"resource_name": "x"}],
        "traits": ["/phenotypes/1"],
        "parents": ["/human-donors/IGVFDO0001AAAA/"],
        "human_donor_identifier": ["donor-1"],
        "references": ["PMID:123"],
        "description": "",
        "family_history_of_diabetes": true,
        "diabetes_duration": 7,
        "genetic_ethnicities": ["Asian"],
        "donation_type": "DCD",
        "glucose_loweing_theraphy": ["insulin"],
        "sex": "female",
        "biological_sex": "FEMALE",
        "t1d_stage": "At-risk: Single or transient autoantibody, normal glucose"
    }));

    let out = upgrader()
        .upgrade_to_current(HUMAN_DONOR, &v1, 1, &catalog(), &NoContext)
        .unwrap();

    assert_eq!(out.version, HUMAN_DONOR_VERSION);
    assert_eq!(out.applied_count() as u32, HUMAN_DONOR_VERSION - 1);
    assert_eq!(
        Value::Object(out.record),
        json!({
            "accession": "IGVFDO0123AAAA",
            "status": "released",
            "ethnicities": ["White"],
            "notes": format!("traits: /phenotypes/1  {RELEASE_NOTE}"),
            "related_donors": [
                {"donor": "/human-donors/IGVFDO0001AAAA/", "relationship_type": "parent"}
            ],
            "human_donor_identifiers": ["donor-1"],
            "publication_identifiers": ["PMID:123"],
            "release_timestamp": BACKFILLED_RELEASE_TIMESTAMP,
            "family_history_of_diabetes": "TRUE",
            "diabetes_duration": "7",
            "other_tissues_available": [],
            "diabetes_status": [],
            "genetic_ethnicities": [{"ethnicity": "Asian", "percentage": 100}],
            "donation_type": "Donation after circulatory death",
            "other_theraphy": ["insulin"],
            "gender": "Female",
            "genetic_sex": "Female",
            "t1d_stage": "At-risk: single or transient autoantibody, normal glucose level"
        })
    );
}

#[test]
fn rodent_donor_full_chain() {
    let v1 = record(json!({
        "accession": "IGVFDO555RRR",
        "status": "archived",
        "collections": [],
        "external_resources": [],
        "traits": ["/phenotypes/9"],
        "parents": ["/rodent-donors/A/"],
        "references": ["PMID:9"],
        "source": "/sources/jax/",
        "description": "",
        "sex": "male"
    }));

    let out = upgrader()
        .upgrade_to_current(RODENT_DONOR, &v1, 1, &catalog(), &NoContext)
        .unwrap();

    assert_eq!(out.version, RODENT_DONOR_VERSION);
    assert_eq!(
        Value::Object(out.record),
        json!({
            "accession": "IGVFDO0555RRRA",
            "status": "archived",
            "individual_rodent": false,
            "notes": format!("traits: /phenotypes/9  parents: /rodent-donors/A/  {RELEASE_NOTE}"),
            "publication_identifiers": ["PMID:9"],
            "sources": ["/sources/jax/"],
            "release_timestamp": BACKFILLED_RELEASE_TIMESTAMP,
            "gender": "male"
        })
    );
}

#[test]
fn current_records_are_untouched() {
    let rec = record(json!({"gender": "whatever"}));
    let out = upgrader()
        .upgrade(HUMAN_DONOR, &rec, HUMAN_DONOR_VERSION, HUMAN_DONOR_VERSION, &NoContext)
        .unwrap();
    assert_eq!(out.record, rec);
    assert_eq!(out.applied_count(), 0);
}

#[test]
fn rodent_chain_stops_at_its_own_current_version() {
    let err = upgrader()
        .upgrade(RODENT_DONOR, &Record::new(), 12, 14, &NoContext)
        .unwrap_err();
    assert_eq!(
        err,
        UpgradeError::MissingStep {
            type_name: RODENT_DONOR.into(),
            version: 13,
        }
    );
}

#[test]
fn malformed_record_failure_is_attributed() {
    let err = upgrader()
        .upgrade(
            HUMAN_DONOR,
            &record(json!({"accession": 42})),
            1,
            HUMAN_DONOR_VERSION,
            &NoContext,
        )
        .unwrap_err();
    assert_eq!(err.type_name(), HUMAN_DONOR);
    assert_eq!(err.version(), Some(4));
    assert!(err.to_string().contains("pad_accession"));
}

fn vocabulary_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[A-Za-z /-]{0,12}".prop_map(Value::String),
        Just(json!("Male")),
        Just(json!("DBD")),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn closed_vocabularies_hold_after_upgrade(
        family in vocabulary_value(),
        gender in vocabulary_value(),
        donation in vocabulary_value(),
    ) {
        let v20 = record(json!({
            "family_history_of_diabetes": family,
            "gender": gender,
            "donation_type": donation
        }));
        let out = upgrader().upgrade(HUMAN_DONOR, &v20, 20, 21, &NoContext).unwrap();

        let family = out.record["family_history_of_diabetes"].as_str().unwrap().to_string();
        prop_assert!(["TRUE", "FALSE", "-"].contains(&family.as_str()));
        let gender = out.record["gender"].as_str().unwrap().to_string();
        prop_assert!(["Male", "Female", "Other", "-"].contains(&gender.as_str()));

        let again = upgrader().upgrade(HUMAN_DONOR, &out.record, 20, 21, &NoContext).unwrap();
        prop_assert_eq!(again.record, out.record);
    }
}
