//! `[[FIELD]]` placeholder substitution over WordprocessingML.
//!
//! Word often splits typed text across several runs, so a placeholder can
//! arrive as `[[NO</w:t></w:r><w:r><w:t>ME]]`. The pattern tolerates tags
//! between and inside the delimiters and the whole match, tags included, is
//! replaced. The tags Word inserts there always close one run and open the
//! next, so dropping them leaves the XML balanced.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?:<[^>]*>)*\[((?:[^\[\]<]|<[^>]*>)*?)\](?:<[^>]*>)*\]")
        .unwrap_or_else(|e| panic!("placeholder pattern must compile: {e}"))
});

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^>]*>").unwrap_or_else(|e| panic!("tag pattern must compile: {e}"))
});

static SIGNATURE_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ASSINATURA(?:_\d+)?$")
        .unwrap_or_else(|e| panic!("signature pattern must compile: {e}"))
});

/// Whether `name` is left in place for the signing step.
pub fn is_signature_slot(name: &str) -> bool {
    SIGNATURE_SLOT.is_match(name)
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '))
}

/// Escapes text for XML and HTML bodies; the apostrophe uses a numeric
/// reference so HTML4 mail clients read it too.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Substitutes `values` into `xml`.
///
/// Known fields receive their XML-escaped value. Unresolved `ASSINATURA` and
/// `ASSINATURA_n` slots are kept as a single-run `[[NAME]]`; every other
/// unresolved placeholder is blanked. Bracketed text that is not a field name
/// is left untouched.
pub fn render(xml: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(xml, |caps: &Captures<'_>| {
            let name = TAG.replace_all(&caps[1], "");
            let name = name.trim();

            if !is_field_name(name) {
                return caps[0].to_string();
            }

            match values.get(name) {
                Some(value) => escape_xml(value),
                None if is_signature_slot(name) => format!("[[{name}]]"),
                None => String::new(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_simple_placeholder() {
        let xml = "<w:t>Cliente: [[NOME]]</w:t>";
        assert_eq!(
            render(xml, &values(&[("NOME", "Maria Silva")])),
            "<w:t>Cliente: Maria Silva</w:t>"
        );
    }

    #[test]
    fn replaces_placeholder_split_across_runs() {
        let xml = "<w:r><w:t>[[NO</w:t></w:r><w:r><w:t>ME]]</w:t></w:r>";
        assert_eq!(
            render(xml, &values(&[("NOME", "Ana")])),
            "<w:r><w:t>Ana</w:t></w:r>"
        );
    }

    #[test]
    fn replaces_placeholder_with_split_delimiters() {
        let xml = "<w:t>[</w:t><w:t>[ CPF ]</w:t><w:t>]</w:t>";
        assert_eq!(
            render(xml, &values(&[("CPF", "123.456.789-00")])),
            "<w:t>123.456.789-00</w:t>"
        );
    }

    #[test]
    fn escapes_values() {
        assert_eq!(
            render("[[EMPRESA]]", &values(&[("EMPRESA", "Souza & Filhos <Ltda>")])),
            "Souza &amp; Filhos &lt;Ltda&gt;"
        );
    }

    #[test]
    fn keeps_signature_slots_and_blanks_unknown_fields() {
        let xml = "<w:t>[[ASSINATURA]] [[ASSINATURA_2]] [[OBS]]</w:t>";
        assert_eq!(
            render(xml, &HashMap::new()),
            "<w:t>[[ASSINATURA]] [[ASSINATURA_2]] </w:t>"
        );
    }

    #[test]
    fn normalizes_split_signature_slot() {
        let xml = "<w:t>[[ASSIN</w:t></w:r><w:r><w:t>ATURA_3]]</w:t>";
        assert_eq!(render(xml, &HashMap::new()), "<w:t>[[ASSINATURA_3]]</w:t>");
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(render("[[nome]]", &values(&[("NOME", "Ana")])), "");
    }

    #[test]
    fn leaves_non_field_brackets_alone() {
        let xml = "<w:t>[[a/b]] and [[]]</w:t>";
        assert_eq!(render(xml, &HashMap::new()), xml);
    }
}
