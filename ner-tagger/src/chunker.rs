//! # Chunker BIO
//!
//! Converte as labels por token em entidades. É um decodificador guloso da
//! esquerda para a direita com três heurísticas herdadas do corpus de treino:
//!
//! - um token com a **mesma tag POS** da parte anterior continua a entidade
//!   (mesmo com label `O`);
//! - um número (`CD`) logo após uma parte que não é `O` continua a entidade;
//! - uma entidade de **2 tokens** que contém `B-PERSON` é sempre `PERSON`.
//!
//! ```text
//! Pierre/NNP/B-PERSON  Vinken/NNP/I-PERSON  ,/,/O
//! └──────────── PERSON ─────────────┘
//! ```
//!
//! Entidades ainda abertas no fim da entrada são descartadas.

use serde::{Deserialize, Serialize};

use crate::tokenizer::Token;

/// Entidade reconhecida.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Texto dos tokens unidos por espaço (ex: "Pierre Vinken").
    pub text: String,
    /// Categoria (ex: "PERSON", "GPE").
    pub label: String,
    /// Índice do primeiro token.
    pub start_token: usize,
    /// Índice do último token (inclusivo).
    pub end_token: usize,
    /// Posição de byte inicial no texto original.
    pub start: usize,
    /// Posição de byte final no texto original.
    pub end: usize,
}

/// Agrupa tokens classificados (com `tag` e `label`) em entidades.
pub fn chunk(tokens: &[Token]) -> Vec<EntitySpan> {
    let mut entities = Vec::new();
    let mut end = String::new();
    let mut parts: Vec<&Token> = Vec::new();

    for token in tokens {
        let label = token.label.as_str();
        let opens = (label != "O" && label != end)
            || parts.last().is_some_and(|prev| token.tag == prev.tag)
            || parts
                .last()
                .is_some_and(|prev| token.tag == "CD" && prev.label != "O");

        if opens {
            end = label.replacen('B', "I", 1);
            parts.push(token);
        } else if (label == "O" && !end.is_empty()) || label == end {
            if label != "O" {
                parts.push(token);
            }
            if let Some(entity) = coalesce(&parts) {
                entities.push(entity);
            }
            end.clear();
            parts.clear();
        }
    }
    entities
}

/// Junta as partes de uma entidade.
pub fn coalesce(parts: &[&Token]) -> Option<EntitySpan> {
    let (first, last) = (parts.first()?, parts.last()?);
    let labels: Vec<&str> = parts.iter().map(|t| t.label.as_str()).collect();
    let text = parts
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Some(EntitySpan {
        text,
        label: resolve_label(&labels).to_string(),
        start_token: first.index,
        end_token: last.index,
        start: first.start,
        end: last.end,
    })
}

/// Categoria de uma entidade a partir das labels BIO de suas partes.
pub fn resolve_label<'a>(labels: &[&'a str]) -> &'a str {
    if labels.len() == 2 && labels.contains(&"B-PERSON") {
        return "PERSON";
    }
    let Some(&first) = labels.first() else {
        return "";
    };
    first.split_once('-').map_or(first, |(_, category)| category)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(parts: &[(&str, &str, &str)]) -> Vec<Token> {
        let words: Vec<&str> = parts.iter().map(|p| p.0).collect();
        let mut tokens = Token::from_words(&words);
        for (token, (_, tag, label)) in tokens.iter_mut().zip(parts) {
            token.tag = tag.to_string();
            token.label = label.to_string();
        }
        tokens
    }

    #[test]
    fn test_person_entity() {
        let toks = tokens(&[("Pierre", "NNP", "B-PERSON"), ("Vinken", "NNP", "I-PERSON"), (",", ",", "O")]);
        let entities = chunk(&toks);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "Pierre Vinken");
        assert_eq!(entities[0].label, "PERSON");
        assert_eq!((entities[0].start_token, entities[0].end_token), (0, 1));
        assert_eq!((entities[0].start, entities[0].end), (0, 13));
    }

    #[test]
    fn test_two_token_person_precedence() {
        assert_eq!(resolve_label(&["B-PERSON", "I-ORG"]), "PERSON");
        assert_eq!(resolve_label(&["B-GPE", "B-PERSON"]), "PERSON");
        assert_eq!(resolve_label(&["B-PERSON", "I-PERSON", "I-PERSON"]), "PERSON");
        assert_eq!(resolve_label(&["B-ORG", "I-ORG", "B-PERSON"]), "ORG");
        assert_eq!(resolve_label(&["O"]), "O");
    }

    #[test]
    fn test_same_pos_continues_entity() {
        // "Co" tem label O, mas a mesma tag NNP mantém a entidade aberta
        let toks = tokens(&[
            ("Elsevier", "NNP", "B-ORG"),
            ("Co", "NNP", "O"),
            ("said", "VBD", "O"),
        ]);
        let entities = chunk(&toks);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "Elsevier Co");
        assert_eq!(entities[0].label, "ORG");
    }

    #[test]
    fn test_cardinal_continues_entity() {
        let toks = tokens(&[
            ("Windows", "NNP", "B-PRODUCT"),
            ("10", "CD", "O"),
            ("is", "VBZ", "O"),
        ]);
        let entities = chunk(&toks);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "Windows 10");
        assert_eq!(entities[0].label, "PRODUCT");
    }

    #[test]
    fn test_closing_continuation_label_is_included() {
        // I-GPE após B-GPE fecha a entidade incluindo o token
        let toks = tokens(&[("New", "NNP", "B-GPE"), ("York", "NN", "I-GPE"), ("is", "VBZ", "O")]);
        let entities = chunk(&toks);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "New York");
        assert_eq!(entities[0].label, "GPE");
    }

    #[test]
    fn test_open_entity_at_end_is_dropped() {
        let toks = tokens(&[("He", "PRP", "O"), ("met", "VBD", "O"), ("Smith", "NNP", "B-PERSON")]);
        assert!(chunk(&toks).is_empty());
    }

    #[test]
    fn test_no_entities() {
        let toks = tokens(&[("the", "DT", "O"), ("board", "NN", "O")]);
        assert!(chunk(&toks).is_empty());
        assert!(chunk(&[]).is_empty());
    }
}
