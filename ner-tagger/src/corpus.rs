//! # Corpus de Treino NER
//!
//! Converte registros anotados (texto + spans com offsets em caracteres) em
//! exemplos `(features, label)` para o GIS.
//!
//! ## Alinhamento dos spans
//!
//! Os offsets vêm de ferramentas de anotação e nem sempre caem nas fronteiras
//! dos tokens. Por isso o alinhamento acontece num espaço **sem espaços em
//! branco**: os offsets são corrigidos com [`adjust_pos`] e cada token ocupa
//! `len(chars)` posições consecutivas. Todo token que sobrepõe o span recebe a
//! label; o primeiro recebe `B-`, os seguintes `I-`.
//!
//! Registros rejeitados (`accept = false`) geram apenas exemplos `O`.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::features::{self, Lexicon, NerFeatures};
use crate::perceptron::PerceptronTagger;
use crate::tokenizer::{Token, Tokenizer};

/// Entidade anotada externamente, em offsets de caracteres sobre o texto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledEntity {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// Texto com suas entidades anotadas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityContext {
    /// `false` para anotações rejeitadas pelo revisor.
    pub accept: bool,
    pub spans: Vec<LabeledEntity>,
    pub text: String,
}

/// Um exemplo de treino: as 17 features de um token e sua label BIO verdadeira.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub features: NerFeatures,
    pub label: String,
}

/// Remove do par `(start, end)` os espaços em branco que o precedem.
pub fn adjust_pos(text: &str, start: usize, end: usize) -> (usize, usize) {
    let mut left = 0;
    let mut right = 0;
    for (index, c) in text.chars().enumerate() {
        if index >= end {
            break;
        }
        if c.is_whitespace() {
            if index < start {
                left += 1;
            }
            right += 1;
        }
    }
    (start - left, end - right)
}

/// Labels BIO de cada token segundo os spans do registro.
pub fn assign_labels(tokens: &[Token], entity: &EntityContext) -> Vec<String> {
    let mut labels = vec!["O".to_string(); tokens.len()];
    if !entity.accept {
        return labels;
    }

    for span in &entity.spans {
        let (start, end) = adjust_pos(&entity.text, span.start, span.end);
        let mut index = 0;
        let mut inside = false;
        for (i, token) in tokens.iter().enumerate() {
            let len = token.text.chars().count();
            if len > 0 && index < end && index + len > start {
                let prefix = if inside { "I" } else { "B" };
                labels[i] = format!("{prefix}-{}", span.label);
                inside = true;
            }
            index += len;
        }
    }
    labels
}

/// Tokeniza, etiqueta e extrai os exemplos de todos os registros.
///
/// O histórico de labels usado nas features é o anotado, não o previsto.
pub fn make_corpus(
    records: &[EntityContext],
    tagger: &PerceptronTagger,
    tokenizer: &dyn Tokenizer,
    lexicon: &Lexicon,
) -> Vec<LabeledExample> {
    let mut corpus = Vec::new();
    for record in records {
        let mut tokens = tokenizer.tokenize(&record.text);
        tagger.tag(&mut tokens);
        let labels = assign_labels(&tokens, record);
        corpus.extend(extract_examples(&tokens, &labels, lexicon));
    }
    corpus
}

/// Um exemplo por token, com `labels` servindo de histórico.
pub fn extract_examples(tokens: &[Token], labels: &[String], lexicon: &Lexicon) -> Vec<LabeledExample> {
    (0..tokens.len())
        .map(|i| LabeledExample {
            features: features::ner_features(i, tokens, labels, lexicon),
            label: labels[i].clone(),
        })
        .collect()
}

/// Registro no formato JSONL exportado pelo Prodigy.
#[derive(Debug, Deserialize)]
struct ProdigyRecord {
    text: String,
    #[serde(default)]
    spans: Vec<LabeledEntity>,
    #[serde(default = "default_answer")]
    answer: String,
}

fn default_answer() -> String {
    "accept".to_string()
}

/// Lê anotações Prodigy (uma por linha). `answer != "accept"` vira registro rejeitado.
pub fn read_prodigy_jsonl(text: &str) -> Result<Vec<EntityContext>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| -> Result<EntityContext> {
            let record: ProdigyRecord = serde_json::from_str(line)?;
            Ok(EntityContext {
                accept: record.answer == "accept",
                spans: record.spans,
                text: record.text,
            })
        })
        .collect()
}
