use std::{fs, path::Path};

use indexmap::IndexMap;

use crate::{
    error::VocabularyError,
    term::{TermId, VocabularyTerm, SYMPTOM_PROPERTY},
};

const DISEASE_ID: usize = 0;
const DISEASE_NAME: usize = 1;
const QUALIFIER: usize = 2;
const HPO_ID: usize = 3;
const ASPECT: usize = 10;

/// Loads disease terms from a `phenotype.hpoa` file.
pub fn load_hpoa(path: impl AsRef<Path>) -> Result<Vec<VocabularyTerm>, VocabularyError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| VocabularyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_hpoa(&raw)
}

/// Parses tab-separated HPO annotations into one disease term per `database_id`.
///
/// Each disease term lists its phenotypes under [`SYMPTOM_PROPERTY`], in file order
/// and without duplicates. Negated (`NOT`) rows and rows whose aspect is not `P`
/// (inheritance, onset, clinical modifiers) are skipped. Diseases appear in the
/// order they were first seen.
pub fn parse_hpoa(input: &str) -> Result<Vec<VocabularyTerm>, VocabularyError> {
    let mut diseases: IndexMap<String, VocabularyTerm> = IndexMap::new();

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() || line.starts_with('#') || line.starts_with("database_id") {
            continue;
        }
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() <= HPO_ID {
            return Err(VocabularyError::parse(
                line_no,
                format!("expected at least {} tab-separated columns", HPO_ID + 1),
            ));
        }
        if columns[QUALIFIER].trim().eq_ignore_ascii_case("NOT") {
            continue;
        }
        if columns.get(ASPECT).is_some_and(|aspect| aspect.trim() != "P") {
            continue;
        }
        let disease_id = TermId::parse(columns[DISEASE_ID])
            .map_err(|err| VocabularyError::parse(line_no, err.to_string()))?;
        let phenotype = TermId::parse(columns[HPO_ID])
            .map_err(|err| VocabularyError::parse(line_no, err.to_string()))?;

        diseases
            .entry(disease_id.to_string())
            .or_insert_with(|| {
                VocabularyTerm::new(disease_id.as_str(), columns[DISEASE_NAME].trim())
            })
            .push_property(SYMPTOM_PROPERTY, phenotype.as_str());
    }

    Ok(diseases.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "#description: \"HPO annotations for rare diseases\"\n\
#date: 2024-04-19\n\
database_id\tdisease_name\tqualifier\thpo_id\treference\tevidence\tonset\tfrequency\tsex\tmodifier\taspect\tbiocuration\n\
OMIM:154700\tMarfan syndrome\t\tHP:0001166\tPMID:1\tPCS\t\t\t\t\tP\tHPO:skoehler\n\
OMIM:154700\tMarfan syndrome\t\tHP:0000006\tPMID:1\tPCS\t\t\t\t\tI\tHPO:skoehler\n\
OMIM:154700\tMarfan syndrome\tNOT\tHP:0002066\tPMID:1\tPCS\t\t\t\t\tP\tHPO:skoehler\n\
ORPHA:558\tMarfan syndrome\t\tHP:0001166\tORPHA:558\tTAS\t\tHP:0040281\t\t\tP\tORPHA:orphadata\n\
OMIM:154700\tMarfan syndrome\t\tHP:0001166\tPMID:2\tPCS\t\t\t\t\tP\tHPO:skoehler\n\
OMIM:154700\tMarfan syndrome\t\tHP:0001519\tPMID:1\tPCS\t\t\t\t\tP\tHPO:skoehler\n";

    #[test]
    fn groups_positive_phenotype_rows_by_disease() {
        let diseases = parse_hpoa(SAMPLE).unwrap();
        assert_eq!(diseases.len(), 2);
        assert_eq!(diseases[0].id, "OMIM:154700");
        assert_eq!(diseases[0].name, "Marfan syndrome");
        assert_eq!(
            diseases[0].values(SYMPTOM_PROPERTY),
            ["HP:0001166".to_string(), "HP:0001519".to_string()]
        );
        assert_eq!(diseases[1].id, "ORPHA:558");
    }

    #[test]
    fn reports_short_rows() {
        let err = parse_hpoa("OMIM:1\tname\n").unwrap_err();
        assert!(matches!(err, VocabularyError::Parse { line: 1, .. }));
    }
}
