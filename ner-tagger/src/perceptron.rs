//! # Averaged Perceptron para POS Tagging
//!
//! Tagger gramatical "rápido e preciso" no estilo do TextBlob: um classificador
//! linear multiclasse sobre as 14 features de [`crate::features::pos_features`],
//! decodificado da esquerda para a direita.
//!
//! ## Ordem de decisão por token
//!
//! 1. `-` literal → `-`
//! 2. emoticon → `SYM`
//! 3. começa com `@` → `NN`
//! 4. marcador vazio do Treebank (`0`, `*`, `*T*-1`...) → `-NONE-`
//! 5. abreviação congelada (`-LRB-`, `-RRB-`...) → a própria palavra
//! 6. palavra memorizada no dicionário de tags
//! 7. arg-max do score linear (empates → primeira classe da lista)
//!
//! As duas tags previstas anteriormente entram nas features do token seguinte,
//! então o tagging de uma sentença é estritamente sequencial.

use std::collections::HashMap;
use std::sync::LazyLock;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PerceptronConfig;
use crate::error::{NerError, Result};
use crate::features::{self, PosFeatures, START};
use crate::tokenizer::{is_emoticon, Token};

static NONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:0|\*[\w?]\*|\*\-\d{1,3}|\*[A-Z]+\*\-\d{1,3}|\*)$").expect("regex válida")
});
static KEEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\-[A-Z]{3}\-$").expect("regex válida"));

/// Palavras vistas ao menos este número de vezes podem ser memorizadas.
const TAG_MAP_MIN_COUNT: usize = 20;
/// ... desde que a tag mais frequente cubra esta fração das ocorrências.
const TAG_MAP_MIN_RATIO: f64 = 0.97;

/// Modelo linear treinado: pesos densos por feature, um valor por classe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AveragedPerceptron {
    /// `feature -> [peso da classe 0, peso da classe 1, ...]`.
    weights: HashMap<String, Vec<f64>>,
    /// Palavras de alta confiança: `palavra -> tag`.
    tag_map: HashMap<String, String>,
    /// Classes na ordem das colunas de `weights`.
    classes: Vec<String>,
}

impl AveragedPerceptron {
    /// Monta o modelo validando o formato da tabela de pesos.
    pub fn new(
        weights: HashMap<String, Vec<f64>>,
        tag_map: HashMap<String, String>,
        classes: Vec<String>,
    ) -> Result<Self> {
        if classes.is_empty() {
            return Err(NerError::invalid_model("lista de classes vazia"));
        }
        if let Some((feature, row)) = weights.iter().find(|(_, row)| row.len() != classes.len()) {
            return Err(NerError::invalid_model(format!(
                "feature '{feature}' tem {} pesos para {} classes",
                row.len(),
                classes.len()
            )));
        }
        Ok(Self {
            weights,
            tag_map,
            classes,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn tag_map(&self) -> &HashMap<String, String> {
        &self.tag_map
    }

    pub fn weights(&self) -> &HashMap<String, Vec<f64>> {
        &self.weights
    }

    /// Classe de maior score; features ausentes contribuem zero.
    pub fn predict(&self, features: &PosFeatures) -> &str {
        let mut scores = vec![0.0; self.classes.len()];
        for feature in features {
            if let Some(row) = self.weights.get(feature) {
                for (score, weight) in scores.iter_mut().zip(row) {
                    *score += weight;
                }
            }
        }
        &self.classes[argmax(&scores)]
    }
}

/// Índice do maior valor; em empate vence o primeiro.
fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, &score) in scores.iter().enumerate() {
        if score > best_score {
            best_score = score;
            best = i;
        }
    }
    best
}

/// Tagger POS sobre um [`AveragedPerceptron`].
#[derive(Debug, Clone)]
pub struct PerceptronTagger {
    model: AveragedPerceptron,
}

impl PerceptronTagger {
    pub fn new(model: AveragedPerceptron) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &AveragedPerceptron {
        &self.model
    }

    /// Atribui `token.tag` a cada token, da esquerda para a direita.
    pub fn tag(&self, tokens: &mut [Token]) {
        let context = features::pos_context(tokens);
        let mut p1 = START[0].to_string();
        let mut p2 = START[1].to_string();

        for i in 0..tokens.len() {
            let tag = self.tag_word(i, &context, &tokens[i].text, &p1, &p2);
            tokens[i].tag = tag.clone();
            p2 = std::mem::replace(&mut p1, tag);
        }
    }

    fn tag_word(&self, i: usize, context: &[String], word: &str, p1: &str, p2: &str) -> String {
        if word == "-" {
            "-".to_string()
        } else if is_emoticon(word) {
            "SYM".to_string()
        } else if word.starts_with('@') {
            "NN".to_string()
        } else if NONE_RE.is_match(word) {
            "-NONE-".to_string()
        } else if KEEP_RE.is_match(word) {
            word.to_string()
        } else if let Some(tag) = self.model.tag_map.get(word) {
            tag.clone()
        } else {
            self.model
                .predict(&features::pos_features(i, context, word, p1, p2))
                .to_string()
        }
    }

    /// Treina um tagger a partir de sentenças anotadas.
    ///
    /// 1. Monta a lista de classes e o dicionário de palavras não ambíguas.
    /// 2. Para cada época, prediz as palavras fora do dicionário e, em caso de
    ///    erro, promove a tag correta e penaliza a prevista.
    /// 3. Embaralha as sentenças entre épocas (semente fixa → determinístico).
    /// 4. Substitui os pesos pelas médias (Lazy Averaging).
    pub fn train(sentences: &[TaggedSentence], config: &PerceptronConfig) -> Result<Self> {
        let (classes, tag_map) = collect_classes_and_tag_map(sentences);
        if classes.is_empty() {
            return Err(NerError::config("corpus POS sem nenhuma tag"));
        }
        info!(
            sentences = sentences.len(),
            classes = classes.len(),
            memorized = tag_map.len(),
            "treinando tagger POS"
        );

        let mut trainer = LazyAverager::new(classes.clone());
        let mut order: Vec<usize> = (0..sentences.len()).collect();
        let mut rng = StdRng::seed_from_u64(config.seed);

        for epoch in 0..config.iterations {
            let mut correct = 0usize;
            let mut total = 0usize;

            for &s in &order {
                let sentence = &sentences[s];
                let tokens = Token::from_words(&sentence.words);
                let context = features::pos_context(&tokens);
                let mut p1 = START[0].to_string();
                let mut p2 = START[1].to_string();

                for (i, word) in sentence.words.iter().enumerate() {
                    let guess = match tag_map.get(word) {
                        Some(tag) => tag.clone(),
                        None => {
                            let feats = features::pos_features(i, &context, word, &p1, &p2);
                            let guess = trainer.predict(&feats).to_string();
                            trainer.update(&sentence.tags[i], &guess, &feats);
                            guess
                        }
                    };
                    if guess == sentence.tags[i] {
                        correct += 1;
                    }
                    total += 1;
                    p2 = std::mem::replace(&mut p1, guess);
                }
            }

            debug!(
                epoch,
                accuracy = correct as f64 / total.max(1) as f64,
                "época do perceptron"
            );
            order.shuffle(&mut rng);
        }

        let weights = trainer.average();
        Ok(Self::new(AveragedPerceptron::new(weights, tag_map, classes)?))
    }
}

/// Sentença anotada para treino: palavras e tags alinhadas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedSentence {
    pub words: Vec<String>,
    pub tags: Vec<String>,
}

/// Lê texto no formato `palavra|TAG palavra|TAG`, uma sentença por linha.
///
/// Pares sem separador são ignorados.
pub fn read_tagged(text: &str, sep: &str) -> Vec<TaggedSentence> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (words, tags) = line
                .split_whitespace()
                .filter_map(|pair| pair.rsplit_once(sep))
                .map(|(word, tag)| (word.to_string(), tag.to_string()))
                .unzip();
            TaggedSentence { words, tags }
        })
        .collect()
}

/// Classes em ordem de primeira aparição e dicionário de palavras não ambíguas.
fn collect_classes_and_tag_map(sentences: &[TaggedSentence]) -> (Vec<String>, HashMap<String, String>) {
    let mut classes: Vec<String> = Vec::new();
    let mut counts: HashMap<&str, HashMap<&str, usize>> = HashMap::new();

    for sentence in sentences {
        for (word, tag) in sentence.words.iter().zip(&sentence.tags) {
            *counts.entry(word).or_default().entry(tag).or_insert(0) += 1;
            if !classes.iter().any(|c| c == tag) {
                classes.push(tag.clone());
            }
        }
    }

    let mut tag_map = HashMap::new();
    for (word, freqs) in counts {
        let n: usize = freqs.values().sum();
        // maior contagem; empate resolvido pela ordem alfabética da tag
        let Some((tag, mode)) = freqs
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        else {
            continue;
        };
        if n >= TAG_MAP_MIN_COUNT && mode as f64 / n as f64 >= TAG_MAP_MIN_RATIO {
            tag_map.insert(word.to_string(), tag.to_string());
        }
    }

    (classes, tag_map)
}

/// Estatísticas de uma feature durante o treino.
#[derive(Debug, Clone)]
struct FeatureStats {
    /// Pesos atuais $w$ por classe.
    weights: Vec<f64>,
    /// Soma acumulada $\sum w_t$ até `stamps`.
    totals: Vec<f64>,
    /// Último passo em que cada peso mudou.
    stamps: Vec<usize>,
}

/// Acumulador do treino com **Lazy Averaging**.
///
/// Calcular a média real a cada passo seria $O(N \cdot T)$. Aqui a soma de um
/// peso só é atualizada quando ele muda: `total += (passo - último_passo) * w`.
struct LazyAverager {
    classes: Vec<String>,
    class_index: HashMap<String, usize>,
    features: HashMap<String, FeatureStats>,
    /// Número de predições feitas até agora.
    instances: usize,
}

impl LazyAverager {
    fn new(classes: Vec<String>) -> Self {
        let class_index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self {
            classes,
            class_index,
            features: HashMap::new(),
            instances: 0,
        }
    }

    fn predict(&self, features: &PosFeatures) -> &str {
        let mut scores = vec![0.0; self.classes.len()];
        for feature in features {
            if let Some(stats) = self.features.get(feature) {
                for (score, weight) in scores.iter_mut().zip(&stats.weights) {
                    *score += weight;
                }
            }
        }
        &self.classes[argmax(&scores)]
    }

    /// $w_{correto} \mathrel{+}= 1$, $w_{previsto} \mathrel{-}= 1$ para cada feature ativa.
    fn update(&mut self, truth: &str, guess: &str, features: &PosFeatures) {
        self.instances += 1;
        if truth == guess {
            return;
        }
        let (Some(&t), Some(&g)) = (self.class_index.get(truth), self.class_index.get(guess)) else {
            return;
        };
        let n = self.classes.len();
        for feature in features {
            let stats = self
                .features
                .entry(feature.clone())
                .or_insert_with(|| FeatureStats {
                    weights: vec![0.0; n],
                    totals: vec![0.0; n],
                    stamps: vec![0; n],
                });
            update_feature(stats, t, 1.0, self.instances);
            update_feature(stats, g, -1.0, self.instances);
        }
    }

    /// Fecha as somas até o último passo e devolve as médias (3 casas decimais).
    fn average(self) -> HashMap<String, Vec<f64>> {
        let instances = self.instances.max(1) as f64;
        let mut averaged = HashMap::with_capacity(self.features.len());

        for (feature, stats) in self.features {
            let row: Vec<f64> = stats
                .weights
                .iter()
                .zip(&stats.totals)
                .zip(&stats.stamps)
                .map(|((&w, &total), &stamp)| {
                    let total = total + (self.instances - stamp) as f64 * w;
                    (total / instances * 1000.0).round() / 1000.0
                })
                .collect();
            if row.iter().any(|&w| w != 0.0) {
                averaged.insert(feature, row);
            }
        }
        averaged
    }
}

fn update_feature(stats: &mut FeatureStats, class: usize, delta: f64, step: usize) {
    // o peso antigo vigorou desde o último update até agora
    stats.totals[class] += (step - stats.stamps[class]) as f64 * stats.weights[class];
    stats.stamps[class] = step;
    stats.weights[class] += delta;
}
