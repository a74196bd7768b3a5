//! Controlled vocabularies of human donor fields and the tables that move
//! older values into them.

use record_upgrade::transform::EnumRemap;

/// Value for anything a closed vocabulary cannot place.
pub const UNSPECIFIED: &str = "-";

/// `t1d_stage` fallback in the closed vocabulary.
pub const T1D_STAGE_UNKNOWN: &str = "No sufficient information to derive";

// Terminology refresh at human v16. Open vocabularies: unknown values pass.

/// `t1d_stage` gains "level" wording.
pub const T1D_STAGE_LEVELS: EnumRemap = EnumRemap::new(&[
    (
        "At-risk: Single or transient autoantibody, normal glucose",
        "At-risk: Single or transient autoantibody, normal glucose level",
    ),
    (
        "Stage 1: Two or more autoantibodies, normal glucose metabolism",
        "Stage 1: Two or more autoantibodies, normal glucose metabolism level",
    ),
    (
        "Stage 2: Two or more autoantibodies, dysglycemia (e.g. HbA1c ≥ 5.7%)",
        "Stage 2: Two or more autoantibodies, dysglycemia (e.g., HbA1c ≥ 5.7%)",
    ),
]);

/// `diabetes_status_description` renamed terms.
pub const DIABETES_STATUS_TERMS: EnumRemap = EnumRemap::new(&[
    ("alström syndrome", "Alström syndrome"),
    ("cystic fibrosis diabetes", "cystic fibrosis-related diabetes"),
    ("non-diabetic", "control without diabetes"),
]);

/// `ethnicities` items.
pub const ETHNICITY_TERMS: EnumRemap = EnumRemap::new(&[("Caucasian", "White")]);

/// `donation_type` abbreviations spelled out.
pub const DONATION_TYPE_NAMES: EnumRemap = EnumRemap::new(&[
    ("DCD", "Donation after Circulatory Death"),
    ("DBD", "Donation after Brain Death"),
    ("NDD", "Natural Death Donation"),
    ("MAD", "Medical Assistance in Dying"),
]);

// Closed vocabularies from human v21 on.

/// `family_history_of_diabetes`.
pub const FAMILY_HISTORY: EnumRemap = EnumRemap::new(&[
    ("true", "TRUE"),
    ("false", "FALSE"),
    ("na", UNSPECIFIED),
    ("n/a", UNSPECIFIED),
    ("unknown", UNSPECIFIED),
    ("", UNSPECIFIED),
])
.vocabulary(&["TRUE", "FALSE", UNSPECIFIED])
.fallback(UNSPECIFIED)
.case_insensitive();

/// `donation_type`.
pub const DONATION_TYPE: EnumRemap = EnumRemap::new(&[
    ("Donation after Circulatory Death", "Donation after circulatory death"),
    ("Donation after Brain Death", "Donation after brain death"),
    ("Natural Death Donation", "Natural death donation"),
    ("Medical Assistance in Dying", "Medical assistance in dying"),
    ("DCD", "Donation after circulatory death"),
    ("DBD", "Donation after brain death"),
    ("NDD", "Natural death donation"),
    ("MAD", "Medical assistance in dying"),
])
.vocabulary(&[
    "Donation after brain death",
    "Donation after circulatory death",
    "Natural death donation",
    "Medical assistance in dying",
    UNSPECIFIED,
])
.fallback(UNSPECIFIED);

/// `gender` and `genetic_sex`.
pub const SEX: EnumRemap = EnumRemap::new(&[("male", "Male"), ("female", "Female"), ("other", "Other")])
    .vocabulary(&["Male", "Female", "Other", UNSPECIFIED])
    .fallback(UNSPECIFIED)
    .case_insensitive();

/// `diabetes_status_description`.
pub const DIABETES_STATUS: EnumRemap = EnumRemap::new(&[
    ("type 1 diabetes", "Type 1 Diabetes"),
    ("type 2 diabetes", "Type 2 Diabetes"),
    ("control without diabetes", "Control Without Diabetes"),
    ("diabetes unspecified", "Diabetes Unspecified"),
    ("monogenic diabetes", "Monogenic Diabetes"),
    ("gestational diabetes", "Gestational Diabetes"),
    ("cystic fibrosis-related diabetes", "Cystic Fibrosis-Related Diabetes"),
    ("cystic fibrosis diabetes", "Cystic Fibrosis-Related Diabetes"),
    ("maturity onset diabetes of the young (mody)", "Monogenic Diabetes"),
    ("non-diabetic", "Control Without Diabetes"),
])
.vocabulary(&[
    "Type 1 Diabetes",
    "Type 2 Diabetes",
    "Control Without Diabetes",
    "Diabetes Unspecified",
    "Monogenic Diabetes",
    "Gestational Diabetes",
    "Cystic Fibrosis-Related Diabetes",
    UNSPECIFIED,
])
.fallback(UNSPECIFIED)
.case_insensitive();

/// `t1d_stage`.
pub const T1D_STAGE: EnumRemap = EnumRemap::new(&[
    (
        "Stage 1: Two or more autoantibodies, normal glucose metabolism level",
        "Stage 1: two or more autoantibodies, normal glucose metabolism level",
    ),
    (
        "Stage 2: Two or more autoantibodies, dysglycemia (e.g., HbA1c ≥ 5.7%)",
        "Stage 2: two or more autoantibodies, dysglycemia (e.g., HbA1c ≥ 5.7%)",
    ),
    (
        "Stage 3: One or more autoantibodies and diagnostic hyperglycemia or T1D diagnosis",
        "Stage 3: one or more autoantibodies and diagnostic hyperglycemia or T1D diagnosis",
    ),
    (
        "At-risk: Single or transient autoantibody, normal glucose level",
        "At-risk: single or transient autoantibody, normal glucose level",
    ),
    (
        "At-risk: Single or transient autoantibody, normal glucose",
        "At-risk: single or transient autoantibody, normal glucose level",
    ),
    ("no sufficient information to derive", T1D_STAGE_UNKNOWN),
    ("no_stage", "normal glucose level"),
])
.vocabulary(&[
    "Stage 1: two or more autoantibodies, normal glucose metabolism level",
    "Stage 2: two or more autoantibodies, dysglycemia (e.g., HbA1c ≥ 5.7%)",
    "Stage 3: one or more autoantibodies and diagnostic hyperglycemia or T1D diagnosis",
    T1D_STAGE_UNKNOWN,
    "Conflicting diabetes evidence",
    "At-risk: single or transient autoantibody, normal glucose level",
    "normal glucose level",
])
.fallback(T1D_STAGE_UNKNOWN);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_vocabularies_fall_back() {
        assert_eq!(FAMILY_HISTORY.remap("True"), "TRUE");
        assert_eq!(FAMILY_HISTORY.remap("N/A"), UNSPECIFIED);
        assert_eq!(FAMILY_HISTORY.remap("maybe"), UNSPECIFIED);
        assert_eq!(SEX.remap("FEMALE"), "Female");
        assert_eq!(SEX.remap("M"), UNSPECIFIED);
        assert_eq!(DONATION_TYPE.remap("DCD"), "Donation after circulatory death");
        // Case-sensitive: the lower-case abbreviation is not a known term.
        assert_eq!(DONATION_TYPE.remap("dcd"), UNSPECIFIED);
        assert_eq!(DIABETES_STATUS.remap("Non-Diabetic"), "Control Without Diabetes");
        assert_eq!(T1D_STAGE.remap("stage 4"), T1D_STAGE_UNKNOWN);
        assert_eq!(T1D_STAGE.remap("no_stage"), "normal glucose level");
    }

    #[test]
    fn closed_remaps_are_idempotent() {
        let inputs = [
            "", "true", "FALSE", "n/a", "male", "Other", "DBD", "MAD", "Natural Death Donation",
            "type 2 diabetes", "maturity onset diabetes of the young (mody)", "no_stage",
            "At-risk: Single or transient autoantibody, normal glucose",
            "Conflicting diabetes evidence", "garbage",
        ];
        for remap in [FAMILY_HISTORY, DONATION_TYPE, SEX, DIABETES_STATUS, T1D_STAGE] {
            for input in inputs {
                let once = remap.remap(input);
                assert_eq!(remap.remap(once), once, "{input:?} -> {once:?}");
            }
        }
    }

    #[test]
    fn open_vocabularies_pass_unknowns() {
        assert_eq!(ETHNICITY_TERMS.remap("Caucasian"), "White");
        assert_eq!(ETHNICITY_TERMS.remap("Asian"), "Asian");
        assert_eq!(DONATION_TYPE_NAMES.remap("DBD"), "Donation after Brain Death");
        assert_eq!(DONATION_TYPE_NAMES.remap("other"), "other");
        assert_eq!(DIABETES_STATUS_TERMS.remap("non-diabetic"), "control without diabetes");
        assert_eq!(T1D_STAGE_LEVELS.remap("Stage 3"), "Stage 3");
    }
}
