//! Small HPO/OMIM excerpt shared by the unit tests.

use std::sync::Arc;

use phenotips_vocabulary::{Vocabulary, VocabularyTerm, SYMPTOM_PROPERTY};

pub fn phenotypes() -> Arc<Vocabulary> {
    let mut gait = VocabularyTerm::new("HP:0002066", "Gait ataxia")
        .with_parent("HP:0001251")
        .with_synonym("Ataxic gait");
    gait.alt_ids.push("HP:0001600".into());
    let mut retired =
        VocabularyTerm::new("HP:0000003", "Old ataxia term").with_property("replaced_by", "HP:0001251");
    retired.obsolete = true;

    Arc::new(Vocabulary::new(
        "hpo",
        vec![
            VocabularyTerm::new("HP:0000001", "All"),
            VocabularyTerm::new("HP:0000118", "Phenotypic abnormality").with_parent("HP:0000001"),
            VocabularyTerm::new("HP:0000707", "Abnormality of the nervous system")
                .with_parent("HP:0000118"),
            VocabularyTerm::new("HP:0001251", "Ataxia").with_parent("HP:0000707"),
            gait,
            VocabularyTerm::new("HP:0001250", "Seizure").with_parent("HP:0000707"),
            VocabularyTerm::new("HP:0000478", "Abnormality of the eye").with_parent("HP:0000118"),
            VocabularyTerm::new("HP:0000518", "Cataract").with_parent("HP:0000478"),
            VocabularyTerm::new("HP:0001166", "Arachnodactyly").with_parent("HP:0000118"),
            VocabularyTerm::new("HP:0000098", "Tall stature").with_parent("HP:0000118"),
            retired,
        ],
    ))
}

fn disease(id: &str, name: &str, symptoms: &[&str]) -> VocabularyTerm {
    symptoms.iter().fold(VocabularyTerm::new(id, name), |term, symptom| {
        term.with_property(SYMPTOM_PROPERTY, *symptom)
    })
}

pub fn diseases() -> Arc<Vocabulary> {
    Arc::new(Vocabulary::new(
        "omim",
        vec![
            disease("OMIM:208900", "Ataxia-telangiectasia", &["HP:0002066"]),
            disease(
                "OMIM:154700",
                "Marfan syndrome",
                &["HP:0001166", "HP:0000098", "HP:0000518"],
            ),
            disease("OMIM:606353", "Epilepsy with ataxia", &["HP:0001250", "HP:0001251"]),
            disease("OMIM:100001", "Cataract, juvenile", &["HP:0000518"]),
            disease("OMIM:100000", "Cataract, congenital", &["HP:0000518"]),
        ],
    ))
}
