//! Search term construction and user input validation.

pub const FAMILY_FIELD: &str = "[Protein Family]";
pub const ORGANISM_FIELD: &str = "[Organism]";

/// Characters allowed in search fields and output names besides ASCII
/// letters and digits.
const ACCEPTED_SPECIALS: [char; 3] = [' ', '.', '-'];

/// User-supplied search parameters.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SearchQuery {
    pub protein_family: String,
    pub taxon: String,
    pub exclude_predicted: bool,
    pub exclude_partial: bool,
}

impl SearchQuery {
    /// Validates both fields: non-blank and restricted to the accepted
    /// character set.
    pub fn new(protein_family: &str, taxon: &str) -> anyhow::Result<Self> {
        for (label, value) in [("protein family", protein_family), ("taxonomic group", taxon)] {
            if value.trim().is_empty() {
                anyhow::bail!("The {} field was left blank", label);
            }
            if !is_valid_input(value) {
                anyhow::bail!("Special characters are not allowed in the {}: {}", label, value);
            }
        }
        Ok(Self {
            protein_family: protein_family.trim().to_string(),
            taxon: taxon.trim().to_string(),
            exclude_predicted: false,
            exclude_partial: false,
        })
    }

    /// Entrez query string.
    pub fn term(&self) -> String {
        let mut term = format!(
            "{} {} AND {} {}",
            self.taxon, ORGANISM_FIELD, self.protein_family, FAMILY_FIELD
        );
        if self.exclude_predicted {
            term.push_str(" NOT predicted NOT hypothetical");
        }
        if self.exclude_partial {
            term.push_str(" NOT partial");
        }
        term
    }
}

/// True when every character is an ASCII letter, digit, space, `.` or `-`.
pub fn is_valid_input(input: &str) -> bool {
    input
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || ACCEPTED_SPECIALS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_layout() {
        let mut q = SearchQuery::new("glucose-6-phosphatase", "Aves").unwrap();
        assert_eq!(
            q.term(),
            "Aves [Organism] AND glucose-6-phosphatase [Protein Family]"
        );

        q.exclude_predicted = true;
        q.exclude_partial = true;
        assert_eq!(
            q.term(),
            "Aves [Organism] AND glucose-6-phosphatase [Protein Family] NOT predicted NOT hypothetical NOT partial"
        );
    }

    #[test]
    fn test_input_validation() {
        assert!(is_valid_input("ABC transporter 1.2"));
        assert!(!is_valid_input("kinase; rm -rf"));
        assert!(!is_valid_input("\"quoted\""));
        assert!(SearchQuery::new("  ", "Aves").is_err());
        assert!(SearchQuery::new("kinase", "Aves|Mammalia").is_err());
    }
}
