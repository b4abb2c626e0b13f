use std::{fs, path::Path};

use crate::{
    error::VocabularyError,
    term::{TermId, VocabularyTerm},
};

/// Loads every `[Term]` stanza from an OBO 1.2/1.4 file.
pub fn load_obo(path: impl AsRef<Path>) -> Result<Vec<VocabularyTerm>, VocabularyError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| VocabularyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_obo(&raw)
}

/// Parses OBO text. Header lines and non-term stanzas (`[Typedef]`, `[Instance]`) are skipped.
pub fn parse_obo(input: &str) -> Result<Vec<VocabularyTerm>, VocabularyError> {
    let mut terms = Vec::new();
    let mut current: Option<StanzaBuilder> = None;
    let mut in_term = false;

    for (idx, raw_line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('!') {
            continue;
        }
        if line.starts_with('[') {
            if let Some(builder) = current.take() {
                terms.push(builder.finish()?);
            }
            in_term = line == "[Term]";
            if in_term {
                current = Some(StanzaBuilder::new(line_no));
            }
            continue;
        }
        if !in_term {
            continue;
        }
        let Some((tag, value)) = line.split_once(':') else {
            return Err(VocabularyError::parse(line_no, format!("expected `tag: value`, got `{line}`")));
        };
        if let Some(builder) = current.as_mut() {
            builder.apply(tag.trim(), value.trim(), line_no)?;
        }
    }
    if let Some(builder) = current.take() {
        terms.push(builder.finish()?);
    }
    Ok(terms)
}

struct StanzaBuilder {
    started_at: usize,
    term: VocabularyTerm,
}

impl StanzaBuilder {
    fn new(started_at: usize) -> Self {
        Self {
            started_at,
            term: VocabularyTerm::new(String::new(), String::new()),
        }
    }

    fn apply(&mut self, tag: &str, value: &str, line_no: usize) -> Result<(), VocabularyError> {
        match tag {
            "id" => self.term.id = checked_id(value, line_no)?,
            "name" => self.term.name = value.to_string(),
            "def" => self.term.definition = quoted(value).or_else(|| Some(value.to_string())),
            "synonym" => {
                if let Some(text) = quoted(value) {
                    self.term.synonyms.push(text);
                }
            }
            "is_a" => {
                let parent = strip_comment(value);
                self.term.parents.push(checked_id(parent, line_no)?);
            }
            "alt_id" => {
                let alt = strip_comment(value);
                self.term.alt_ids.push(checked_id(alt, line_no)?);
            }
            "is_obsolete" => self.term.obsolete = value.eq_ignore_ascii_case("true"),
            "replaced_by" | "consider" | "xref" | "subset" => {
                self.term.push_property(tag, strip_comment(value));
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<VocabularyTerm, VocabularyError> {
        if self.term.id.is_empty() {
            return Err(VocabularyError::parse(
                self.started_at,
                "[Term] stanza without an id",
            ));
        }
        Ok(self.term)
    }
}

fn checked_id(value: &str, line_no: usize) -> Result<String, VocabularyError> {
    TermId::parse(value)
        .map(String::from)
        .map_err(|err| VocabularyError::parse(line_no, err.to_string()))
}

/// Drops trailing `! comment` and any `{qualifiers}`.
fn strip_comment(value: &str) -> &str {
    let value = value.split(" !").next().unwrap_or(value);
    value.split(" {").next().unwrap_or(value).trim()
}

/// Extracts the first double-quoted string, honouring backslash escapes.
fn quoted(value: &str) -> Option<String> {
    let rest = value.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '"' => return Some(out),
            other => out.push(other),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"format-version: 1.2
ontology: hp

[Term]
id: HP:0000118
name: Phenotypic abnormality

[Term]
id: HP:0002066
name: Gait ataxia
alt_id: HP:0001600
def: "A type of ataxia characterized by the \"impairment\" of walking." [HPO:probinson]
synonym: "Ataxic gait" EXACT []
synonym: "Unsteady gait" RELATED []
xref: UMLS:C0751837
is_a: HP:0000118 ! Phenotypic abnormality

[Typedef]
id: part_of
name: part of

[Term]
id: HP:0000001
name: obsolete thing
is_obsolete: true
replaced_by: HP:0002066
"#;

    #[test]
    fn parses_term_stanzas() {
        let terms = parse_obo(SAMPLE).unwrap();
        assert_eq!(terms.len(), 3);
        let gait = &terms[1];
        assert_eq!(gait.id, "HP:0002066");
        assert_eq!(gait.parents, vec!["HP:0000118".to_string()]);
        assert_eq!(gait.alt_ids, vec!["HP:0001600".to_string()]);
        assert_eq!(gait.synonyms, vec!["Ataxic gait", "Unsteady gait"]);
        assert_eq!(
            gait.definition.as_deref(),
            Some("A type of ataxia characterized by the \"impairment\" of walking.")
        );
        assert_eq!(gait.values("xref"), ["UMLS:C0751837".to_string()]);
        assert!(terms[2].obsolete);
        assert_eq!(terms[2].values("replaced_by"), ["HP:0002066".to_string()]);
    }

    #[test]
    fn rejects_stanza_without_id() {
        let err = parse_obo("[Term]\nname: nameless\n").unwrap_err();
        assert!(matches!(err, VocabularyError::Parse { line: 1, .. }));
    }

    #[test]
    fn rejects_malformed_parent() {
        let err = parse_obo("[Term]\nid: HP:1\nis_a: nonsense\n").unwrap_err();
        assert!(matches!(err, VocabularyError::Parse { line: 3, .. }));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hp.obo");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load_obo(&path).unwrap().len(), 3);
        assert!(matches!(
            load_obo(dir.path().join("missing.obo")),
            Err(VocabularyError::Io { .. })
        ));
    }
}
