//! # Maximum Entropy para NER
//!
//! Classificador log-linear sobre features conjuntas `(feature, label)`.
//! Diferente do Averaged Perceptron, os pesos aqui estão em **escala log2**:
//! o score de uma label é $\sum_i w_i \cdot f_i(x, y)$ e a probabilidade é
//!
//! $$ P(y|x) = \frac{2^{score(x, y)}}{\sum_{y'} 2^{score(x, y')}} $$
//!
//! ## Aritmética em espaço log
//!
//! A normalização nunca sai do espaço log: somamos com [`add_logs`], que
//! ignora diferenças abaixo de $\log_2(10^{-30})$. Pesos $-\infty$ (features
//! nunca vistas no treino) são absorvidos, e se toda a massa sumir a
//! distribuição vira uniforme. Nenhum caminho produz `NaN`.

use tracing::info;

use crate::chunker::{self, EntitySpan};
use crate::config::GisConfig;
use crate::corpus::{self, EntityContext};
use crate::error::{NerError, Result};
use crate::features::{self, Lexicon, NerFeatures};
use crate::gis::GisTrainer;
use crate::perceptron::PerceptronTagger;
use crate::tokenizer::{Token, Tokenizer};
use crate::vocabulary::{EncodedValue, FeatureVocabulary};

/// Diferença mínima (em log2) que ainda altera uma soma: $\log_2(10^{-30})$.
pub const MAX_LOG_DIFF: f64 = -99.657_842_846_620_87;

/// $\log_2(2^x + 2^y)$ sem sair do espaço log.
pub fn add_logs(x: f64, y: f64) -> f64 {
    if x == f64::NEG_INFINITY {
        return y;
    }
    if y == f64::NEG_INFINITY {
        return x;
    }
    if x < y + MAX_LOG_DIFF {
        y
    } else if y < x + MAX_LOG_DIFF {
        x
    } else {
        let base = x.min(y);
        base + ((x - base).exp2() + (y - base).exp2()).log2()
    }
}

/// Soma de uma lista em espaço log. Lista vazia → $-\infty$.
pub fn sum_logs(logs: &[f64]) -> f64 {
    logs.iter().fold(f64::NEG_INFINITY, |acc, &x| add_logs(acc, x))
}

/// Score linear de uma codificação. Entradas com valor zero não contribuem,
/// mesmo quando o peso é $-\infty$.
pub(crate) fn score(weights: &[f64], encoding: &[EncodedValue]) -> f64 {
    encoding
        .iter()
        .filter(|e| e.value != 0.0)
        .map(|e| weights[e.index] * e.value)
        .sum()
}

/// Distribuição de probabilidade sobre as labels, guardada em log2.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbDist<'a> {
    labels: &'a [String],
    log_probs: Vec<f64>,
}

impl<'a> ProbDist<'a> {
    /// Normaliza scores log2 (um por label, na ordem de `labels`).
    pub fn from_log_scores(labels: &'a [String], scores: Vec<f64>) -> Self {
        let total = sum_logs(&scores);
        // também cobre NaN
        let log_probs = if total > f64::NEG_INFINITY && total.is_finite() {
            scores.into_iter().map(|s| s - total).collect()
        } else {
            let uniform = -(labels.len() as f64).log2();
            vec![uniform; labels.len()]
        };
        Self { labels, log_probs }
    }

    pub fn log_prob(&self, label: &str) -> f64 {
        self.labels
            .iter()
            .position(|l| l == label)
            .map_or(f64::NEG_INFINITY, |i| self.log_probs[i])
    }

    pub fn prob(&self, label: &str) -> f64 {
        self.log_prob(label).exp2()
    }

    /// Pares `(label, log2 prob)` na ordem das labels.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + '_ {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.log_probs.iter().copied())
    }

    /// Label mais provável; empate → primeira.
    pub fn max(&self) -> &'a str {
        let labels: &'a [String] = self.labels;
        let mut best = 0;
        for (i, &lp) in self.log_probs.iter().enumerate() {
            if lp > self.log_probs[best] {
                best = i;
            }
        }
        &labels[best]
    }
}

/// Classificador MaxEnt treinado: vocabulário + vetor de pesos.
///
/// Somente leitura na inferência. O buffer das chaves conjuntas é sempre do
/// chamador, então uma instância pode ser compartilhada entre threads.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxEntClassifier {
    vocab: FeatureVocabulary,
    /// `len() == vocab.len() + 1`; o último é o peso da feature de correção.
    weights: Vec<f64>,
}

impl MaxEntClassifier {
    pub fn new(vocab: FeatureVocabulary, weights: Vec<f64>) -> Result<Self> {
        if vocab.labels().is_empty() {
            return Err(NerError::invalid_model("classificador sem labels"));
        }
        if weights.len() != vocab.len() + 1 {
            return Err(NerError::invalid_model(format!(
                "{} pesos para {} features conjuntas (esperado {})",
                weights.len(),
                vocab.len(),
                vocab.len() + 1
            )));
        }
        Ok(Self { vocab, weights })
    }

    pub fn vocabulary(&self) -> &FeatureVocabulary {
        &self.vocab
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn labels(&self) -> &[String] {
        self.vocab.labels()
    }

    /// Score log2 de uma label com a codificação simples.
    pub fn score(&self, features: &NerFeatures, label: &str, buf: &mut String) -> f64 {
        score(&self.weights, &self.vocab.encode(features, label, buf))
    }

    /// Predição dura: arg-max do score; empate → primeira label.
    pub fn classify_features(&self, features: &NerFeatures, buf: &mut String) -> &str {
        let labels = self.vocab.labels();
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (i, label) in labels.iter().enumerate() {
            let s = self.score(features, label, buf);
            if s > best_score {
                best_score = s;
                best = i;
            }
        }
        &labels[best]
    }

    /// Distribuição completa, usando a codificação GIS.
    pub fn prob_classify(&self, features: &NerFeatures, buf: &mut String) -> ProbDist<'_> {
        let scores = self
            .vocab
            .labels()
            .iter()
            .map(|label| score(&self.weights, &self.vocab.encode_gis(features, label, buf)))
            .collect();
        ProbDist::from_log_scores(self.vocab.labels(), scores)
    }
}

/// Extrator de entidades: MaxEnt + léxico + chunker BIO.
#[derive(Debug, Clone)]
pub struct EntityExtracter {
    model: MaxEntClassifier,
    lexicon: Lexicon,
}

impl EntityExtracter {
    pub fn new(model: MaxEntClassifier, lexicon: Lexicon) -> Self {
        Self { model, lexicon }
    }

    pub fn model(&self) -> &MaxEntClassifier {
        &self.model
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Atribui `token.label` a tokens já com tag POS.
    ///
    /// Sequencial: a label prevista para o token `i` entra nas features de `i + 1`.
    pub fn classify(&self, tokens: &mut [Token]) {
        let mut history: Vec<String> = Vec::with_capacity(tokens.len());
        let mut buf = String::new();
        for i in 0..tokens.len() {
            let feats = features::ner_features(i, tokens, &history, &self.lexicon);
            let label = self.model.classify_features(&feats, &mut buf).to_string();
            tokens[i].label = label.clone();
            history.push(label);
        }
    }

    /// Agrupa tokens já classificados em entidades.
    pub fn chunk(&self, tokens: &[Token]) -> Vec<EntitySpan> {
        chunker::chunk(tokens)
    }

    /// Treina um extrator a partir de registros anotados.
    pub fn train(
        records: &[EntityContext],
        tagger: &PerceptronTagger,
        tokenizer: &dyn Tokenizer,
        config: &GisConfig,
    ) -> Result<Self> {
        let lexicon = Lexicon::english();
        let examples = corpus::make_corpus(records, tagger, tokenizer, &lexicon);
        info!(
            records = records.len(),
            examples = examples.len(),
            "corpus NER montado"
        );
        let model = GisTrainer::new(*config).train(&examples)?;
        Ok(Self::new(model, lexicon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::LabeledExample;
    use crate::features::NONE_FEAT;

    fn example(word: &str, label: &str) -> LabeledExample {
        let mut features: NerFeatures = std::array::from_fn(|_| NONE_FEAT.to_string());
        features[13] = word.to_string();
        LabeledExample {
            features,
            label: label.to_string(),
        }
    }

    fn classifier() -> MaxEntClassifier {
        let vocab = FeatureVocabulary::build(&[example("Pierre", "B-PERSON"), example("board", "O")]);
        let mut weights = vec![0.0; vocab.len() + 1];
        weights[vocab.index_of("word-Pierre-B-PERSON").unwrap()] = 3.0;
        weights[vocab.index_of("word-board-O").unwrap()] = 2.0;
        MaxEntClassifier::new(vocab, weights).unwrap()
    }

    #[test]
    fn test_add_logs_matches_direct_formula() {
        for (x, y) in [(0.0, 1.0), (-3.5, 2.25), (10.0, 10.0)] {
            let expected = (2f64.powf(x) + 2f64.powf(y)).log2();
            assert!((add_logs(x, y) - expected).abs() < 1e-12);
            assert_eq!(add_logs(x, y), add_logs(y, x));
        }
    }

    #[test]
    fn test_add_logs_beyond_floor_returns_max() {
        assert_eq!(add_logs(0.0, -150.0), 0.0);
        assert_eq!(add_logs(-150.0, 0.0), 0.0);
        assert_eq!(add_logs(f64::NEG_INFINITY, -3.0), -3.0);
        assert_eq!(add_logs(f64::NEG_INFINITY, f64::NEG_INFINITY), f64::NEG_INFINITY);
    }

    #[test]
    fn test_sum_logs() {
        assert_eq!(sum_logs(&[]), f64::NEG_INFINITY);
        assert!((sum_logs(&[1.0, 1.0, 2.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_classify_picks_highest_score() {
        let model = classifier();
        let mut buf = String::new();
        assert_eq!(model.classify_features(&example("Pierre", "?").features, &mut buf), "B-PERSON");
        assert_eq!(model.classify_features(&example("board", "?").features, &mut buf), "O");
    }

    #[test]
    fn test_unknown_features_tie_to_first_label() {
        let vocab = FeatureVocabulary::build(&[example("a", "B-GPE"), example("b", "O")]);
        let weights = vec![0.0; vocab.len() + 1];
        let model = MaxEntClassifier::new(vocab, weights).unwrap();
        let mut features: NerFeatures = std::array::from_fn(|i| format!("nunca-visto-{i}"));
        features[0] = "x".to_string();
        let mut buf = String::new();
        assert_eq!(model.classify_features(&features, &mut buf), "B-GPE");
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = classifier();
        let mut buf = String::new();
        for word in ["Pierre", "board", "desconhecida"] {
            let dist = model.prob_classify(&example(word, "?").features, &mut buf);
            let total: f64 = model.labels().iter().map(|l| dist.prob(l)).sum();
            assert!((total - 1.0).abs() < 1e-9, "{word}: {total}");
        }
        let dist = model.prob_classify(&example("Pierre", "?").features, &mut buf);
        assert_eq!(dist.max(), "B-PERSON");
    }

    #[test]
    fn test_all_mass_lost_falls_back_to_uniform() {
        let vocab = FeatureVocabulary::build(&[example("a", "B-GPE"), example("b", "O")]);
        let weights = vec![f64::NEG_INFINITY; vocab.len() + 1];
        let model = MaxEntClassifier::new(vocab, weights).unwrap();
        let mut buf = String::new();
        let dist = model.prob_classify(&example("a", "?").features, &mut buf);
        for (_, lp) in dist.iter() {
            assert!(!lp.is_nan());
        }
        assert!((dist.prob("B-GPE") - 0.5).abs() < 1e-12);
        assert!((dist.prob("O") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_weight_length_validated() {
        let vocab = FeatureVocabulary::build(&[example("a", "O")]);
        let err = MaxEntClassifier::new(vocab, vec![0.0]).unwrap_err();
        assert!(matches!(err, NerError::InvalidModel(_)));
    }
}
