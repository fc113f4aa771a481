//! # Vocabulário de Features Conjuntas
//!
//! O MaxEnt não pesa features isoladas: cada peso pertence a um par
//! `(feature, label)`. A chave conjunta é a string `"{nome}-{valor}-{label}"`
//! e recebe um índice denso na ordem em que foi vista pela primeira vez.
//!
//! ## Cardinalidade
//!
//! O GIS exige que todo exemplo some a mesma massa de features ($C$). Como nem
//! todas as features conjuntas disparam, a codificação GIS adiciona uma
//! feature de correção no índice `len()` com valor `C - disparadas`.

use std::collections::{HashMap, HashSet};

use crate::corpus::LabeledExample;
use crate::error::{NerError, Result};
use crate::features::{NerFeatures, NER_FEATURE_NAMES};

/// Entrada esparsa de uma codificação: `valor` no índice `index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedValue {
    pub index: usize,
    pub value: f64,
}

/// Mapeamento chave conjunta → índice, mais as labels conhecidas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVocabulary {
    mapping: HashMap<String, usize>,
    /// `keys[i]` é a chave do índice `i`.
    keys: Vec<String>,
    labels: Vec<String>,
    cardinality: usize,
}

/// Escreve `"{nome}-{valor}-{label}"` no buffer reaproveitado.
pub fn joint_key<'a>(buf: &'a mut String, name: &str, value: &str, label: &str) -> &'a str {
    buf.clear();
    buf.push_str(name);
    buf.push('-');
    buf.push_str(value);
    buf.push('-');
    buf.push_str(label);
    buf
}

impl FeatureVocabulary {
    /// Varre os exemplos uma vez, registrando as triplas com a label verdadeira.
    pub fn build(examples: &[LabeledExample]) -> Self {
        let mut vocab = Self::default();
        let mut seen_labels = HashSet::new();
        let mut buf = String::new();

        for example in examples {
            if seen_labels.insert(example.label.as_str()) {
                vocab.labels.push(example.label.clone());
            }
            for (name, value) in NER_FEATURE_NAMES.iter().zip(&example.features) {
                vocab.register(joint_key(&mut buf, name, value, &example.label));
            }
        }
        vocab.cardinality = vocab.compute_cardinality();
        vocab
    }

    /// Reconstrói um vocabulário persistido. Os índices precisam ser `0..n`.
    pub fn from_parts(mapping: HashMap<String, usize>, labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(NerError::invalid_model("lista de labels vazia"));
        }
        let mut keys = vec![None; mapping.len()];
        for (key, &index) in &mapping {
            match keys.get_mut(index) {
                Some(slot) if slot.is_none() => *slot = Some(key.clone()),
                _ => {
                    return Err(NerError::invalid_model(format!(
                        "índice {index} da chave '{key}' fora de 0..{} ou repetido",
                        mapping.len()
                    )))
                }
            }
        }
        let keys = keys.into_iter().flatten().collect();
        let mut vocab = Self {
            mapping,
            keys,
            labels,
            cardinality: 0,
        };
        vocab.cardinality = vocab.compute_cardinality();
        Ok(vocab)
    }

    /// Registra uma chave; se já existe, devolve o índice antigo.
    pub fn register(&mut self, key: &str) -> usize {
        if let Some(&index) = self.mapping.get(key) {
            return index;
        }
        let index = self.keys.len();
        self.mapping.insert(key.to_string(), index);
        self.keys.push(key.to_string());
        index
    }

    fn compute_cardinality(&self) -> usize {
        let prefixes: HashSet<&str> = self
            .keys
            .iter()
            .filter_map(|key| key.split('-').next())
            .collect();
        prefixes.len() + 1
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.mapping.get(key).copied()
    }

    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    pub fn mapping(&self) -> &HashMap<String, usize> {
        &self.mapping
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Número de features conjuntas (sem a de correção).
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Indicador 1 para cada slot cuja chave conjunta é conhecida.
    pub fn encode(&self, features: &NerFeatures, label: &str, buf: &mut String) -> Vec<EncodedValue> {
        NER_FEATURE_NAMES
            .iter()
            .zip(features)
            .filter_map(|(name, value)| self.index_of(joint_key(buf, name, value, label)))
            .map(|index| EncodedValue { index, value: 1.0 })
            .collect()
    }

    /// Como [`encode`](Self::encode), mais a feature de correção no índice `len()`.
    pub fn encode_gis(&self, features: &NerFeatures, label: &str, buf: &mut String) -> Vec<EncodedValue> {
        let mut encoding = self.encode(features, label, buf);
        let fired: f64 = encoding.iter().map(|e| e.value).sum();
        encoding.push(EncodedValue {
            index: self.len(),
            value: self.cardinality as f64 - fired,
        });
        encoding
    }
}
