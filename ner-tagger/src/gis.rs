//! # Generalized Iterative Scaling (GIS)
//!
//! Ajusta os pesos do [`MaxEntClassifier`] até que a contagem **esperada** de
//! cada feature conjunta se aproxime da contagem **empírica**:
//!
//! $$ w_i \leftarrow w_i + \frac{\log_2 E_{emp}[f_i] - \log_2 E_{est}[f_i]}{C} $$
//!
//! onde $C$ é a cardinalidade (massa constante de features por exemplo,
//! garantida pela feature de correção).
//!
//! ## Paralelismo
//!
//! Cada rodada divide os exemplos em blocos de tamanho fixo ([`CHUNK_SIZE`])
//! e processa os blocos com `rayon`. Cada bloco tem seu próprio buffer de
//! chaves e seu vetor parcial; os parciais são somados na ordem dos blocos,
//! então duas execuções produzem pesos idênticos bit a bit.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::GisConfig;
use crate::corpus::LabeledExample;
use crate::error::{NerError, Result};
use crate::maxent::{self, MaxEntClassifier, ProbDist};
use crate::vocabulary::FeatureVocabulary;

/// Número de exemplos por tarefa paralela.
pub const CHUNK_SIZE: usize = 256;

/// Treinador GIS com número fixo de rodadas (sem teste de convergência).
#[derive(Debug, Clone, Copy, Default)]
pub struct GisTrainer {
    config: GisConfig,
}

impl GisTrainer {
    pub fn new(config: GisConfig) -> Self {
        Self { config }
    }

    /// Monta o vocabulário a partir dos exemplos e treina.
    pub fn train(&self, examples: &[LabeledExample]) -> Result<MaxEntClassifier> {
        self.fit(FeatureVocabulary::build(examples), examples, |_, _| {})
    }

    /// Treina sobre um vocabulário já montado.
    ///
    /// `on_round(rodada, pesos)` é chamado ao fim de cada rodada.
    pub fn fit<F>(
        &self,
        vocab: FeatureVocabulary,
        examples: &[LabeledExample],
        mut on_round: F,
    ) -> Result<MaxEntClassifier>
    where
        F: FnMut(usize, &[f64]),
    {
        if examples.is_empty() || vocab.labels().is_empty() {
            return Err(NerError::config("corpus de treino vazio"));
        }
        let cardinality = vocab.cardinality() as f64;
        let empirical = empirical_counts(&vocab, examples);
        let log_empirical: Vec<f64> = empirical.iter().map(|c| c.log2()).collect();
        let unattested: Vec<bool> = empirical.iter().map(|&c| c == 0.0).collect();

        // log2(0) = -inf: índices não atestados já começam fixados
        let mut weights = log_empirical.clone();

        info!(
            examples = examples.len(),
            features = vocab.len(),
            labels = vocab.labels().len(),
            cardinality = vocab.cardinality(),
            rounds = self.config.rounds,
            "treinando MaxEnt com GIS"
        );

        for round in 0..self.config.rounds {
            let (estimated, log_likelihood) = estimate_counts(&vocab, &weights, examples);

            for (i, weight) in weights.iter_mut().enumerate() {
                let est = if unattested[i] {
                    estimated[i] + 1.0
                } else {
                    estimated[i]
                };
                if est > 0.0 {
                    *weight += (log_empirical[i] - est.log2()) / cardinality;
                }
            }

            debug!(
                round,
                log_likelihood = log_likelihood / examples.len() as f64,
                "rodada GIS"
            );
            on_round(round, &weights);
        }

        MaxEntClassifier::new(vocab, weights)
    }
}

/// Contagem empírica: codificação GIS de cada exemplo com a label verdadeira.
fn empirical_counts(vocab: &FeatureVocabulary, examples: &[LabeledExample]) -> Vec<f64> {
    let mut counts = vec![0.0; vocab.len() + 1];
    let mut buf = String::new();
    for example in examples {
        for e in vocab.encode_gis(&example.features, &example.label, &mut buf) {
            counts[e.index] += e.value;
        }
    }
    counts
}

/// Contagem esperada sob os pesos atuais e log-verossimilhança total (log2).
fn estimate_counts(
    vocab: &FeatureVocabulary,
    weights: &[f64],
    examples: &[LabeledExample],
) -> (Vec<f64>, f64) {
    let size = weights.len();
    let partials: Vec<(Vec<f64>, f64)> = examples
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| {
            let mut counts = vec![0.0; size];
            let mut log_likelihood = 0.0;
            let mut buf = String::new();

            for example in chunk {
                let encodings: Vec<_> = vocab
                    .labels()
                    .iter()
                    .map(|label| vocab.encode_gis(&example.features, label, &mut buf))
                    .collect();
                let scores = encodings
                    .iter()
                    .map(|encoding| maxent::score(weights, encoding))
                    .collect();
                let dist = ProbDist::from_log_scores(vocab.labels(), scores);
                log_likelihood += dist.log_prob(&example.label);

                for ((_, log_prob), encoding) in dist.iter().zip(&encodings) {
                    let prob = log_prob.exp2();
                    for e in encoding {
                        counts[e.index] += prob * e.value;
                    }
                }
            }
            (counts, log_likelihood)
        })
        .collect();

    let mut total = vec![0.0; size];
    let mut log_likelihood = 0.0;
    for (counts, ll) in partials {
        for (t, c) in total.iter_mut().zip(counts) {
            *t += c;
        }
        log_likelihood += ll;
    }
    (total, log_likelihood)
}
