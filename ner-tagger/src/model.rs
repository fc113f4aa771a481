//! # Modelo Persistido
//!
//! Um [`Model`] agrega o tagger POS e o extrator de entidades. No disco cada
//! componente vive num subdiretório fixo, com um JSON por estrutura:
//!
//! ```text
//! <dir>/
//! ├── AveragedPerceptron/
//! │   ├── weights.json   feature -> [peso por classe]
//! │   ├── tags.json      palavra -> tag memorizada
//! │   └── classes.json   [classe]
//! └── Maxent/
//!     ├── labels.json    [label]
//!     ├── mapping.json   chave conjunta -> índice
//!     └── weights.json   [peso] (null = -inf)
//! ```
//!
//! A carga é tudo ou nada: qualquer arquivo ausente, JSON inválido ou formato
//! inconsistente aborta a construção.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::config::TrainingConfig;
use crate::corpus::EntityContext;
use crate::error::{NerError, Result};
use crate::features::Lexicon;
use crate::maxent::{EntityExtracter, MaxEntClassifier};
use crate::perceptron::{AveragedPerceptron, PerceptronTagger};
use crate::tokenizer::Tokenizer;
use crate::vocabulary::FeatureVocabulary;

pub const PERCEPTRON_DIR: &str = "AveragedPerceptron";
pub const MAXENT_DIR: &str = "Maxent";

/// Tagger POS + extrator de entidades.
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    tagger: PerceptronTagger,
    extracter: EntityExtracter,
}

impl Model {
    pub fn new(name: impl Into<String>, tagger: PerceptronTagger, extracter: EntityExtracter) -> Self {
        Self {
            name: name.into(),
            tagger,
            extracter,
        }
    }

    pub fn tagger(&self) -> &PerceptronTagger {
        &self.tagger
    }

    pub fn extracter(&self) -> &EntityExtracter {
        &self.extracter
    }

    /// Carrega um modelo gravado por [`write`](Self::write).
    ///
    /// O nome do modelo é o nome do diretório.
    pub fn from_disk(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let tagger = load_tagger(path)?;
        let classifier = load_classifier(path)?;
        info!(
            model = %name,
            classes = tagger.model().classes().len(),
            labels = classifier.labels().len(),
            features = classifier.vocabulary().len(),
            "modelo carregado"
        );
        Ok(Self::new(name, tagger, EntityExtracter::new(classifier, Lexicon::english())))
    }

    /// Procura em `root` o primeiro diretório chamado `name` (busca em
    /// profundidade, em ordem lexical) e o carrega com [`from_disk`](Self::from_disk).
    pub fn find_in(root: impl AsRef<Path>, name: &str) -> Result<Self> {
        let root = root.as_ref();
        match find_dir(root, name)? {
            Some(dir) => Self::from_disk(dir),
            None => Err(NerError::MissingAsset {
                path: root.join(name),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        }
    }

    /// Grava os dois componentes em `path`, criando os diretórios necessários.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        write_tagger(path, &self.tagger)?;
        write_classifier(path, self.extracter.model())?;
        info!(model = %self.name, path = %path.display(), "modelo gravado");
        Ok(())
    }

    /// Treina um novo extrator sobre registros anotados, usando `tagger` para
    /// etiquetar o texto.
    pub fn from_data(
        name: impl Into<String>,
        tagger: PerceptronTagger,
        records: &[EntityContext],
        tokenizer: &dyn Tokenizer,
        config: &TrainingConfig,
    ) -> Result<Self> {
        config.validate()?;
        let extracter = EntityExtracter::train(records, &tagger, tokenizer, &config.gis)?;
        Ok(Self::new(name, tagger, extracter))
    }
}

/// Carrega apenas o tagger POS de `<dir>/AveragedPerceptron`.
pub fn load_tagger(dir: impl AsRef<Path>) -> Result<PerceptronTagger> {
    let dir = dir.as_ref().join(PERCEPTRON_DIR);
    let weights: HashMap<String, Vec<f64>> = read_asset(&dir.join("weights.json"))?;
    let tags: HashMap<String, String> = read_asset(&dir.join("tags.json"))?;
    let classes: Vec<String> = read_asset(&dir.join("classes.json"))?;
    Ok(PerceptronTagger::new(AveragedPerceptron::new(weights, tags, classes)?))
}

pub fn write_tagger(dir: impl AsRef<Path>, tagger: &PerceptronTagger) -> Result<()> {
    let dir = dir.as_ref().join(PERCEPTRON_DIR);
    fs::create_dir_all(&dir)?;
    let model = tagger.model();
    let weights: BTreeMap<_, _> = model.weights().iter().collect();
    let tags: BTreeMap<_, _> = model.tag_map().iter().collect();
    write_asset(&dir.join("weights.json"), &weights)?;
    write_asset(&dir.join("tags.json"), &tags)?;
    write_asset(&dir.join("classes.json"), &model.classes())
}

/// Carrega apenas o classificador MaxEnt de `<dir>/Maxent`.
pub fn load_classifier(dir: impl AsRef<Path>) -> Result<MaxEntClassifier> {
    let dir = dir.as_ref().join(MAXENT_DIR);
    let labels: Vec<String> = read_asset(&dir.join("labels.json"))?;
    let mapping: HashMap<String, usize> = read_asset(&dir.join("mapping.json"))?;
    let weights: Vec<Option<f64>> = read_asset(&dir.join("weights.json"))?;

    let vocab = FeatureVocabulary::from_parts(mapping, labels)?;
    let weights = weights
        .into_iter()
        .map(|w| w.unwrap_or(f64::NEG_INFINITY))
        .collect();
    MaxEntClassifier::new(vocab, weights)
}

pub fn write_classifier(dir: impl AsRef<Path>, classifier: &MaxEntClassifier) -> Result<()> {
    let dir = dir.as_ref().join(MAXENT_DIR);
    fs::create_dir_all(&dir)?;
    let vocab = classifier.vocabulary();
    let mapping: BTreeMap<_, _> = vocab.mapping().iter().collect();
    // JSON não representa -inf
    let weights: Vec<Option<f64>> = classifier
        .weights()
        .iter()
        .map(|&w| w.is_finite().then_some(w))
        .collect();
    write_asset(&dir.join("labels.json"), &vocab.labels())?;
    write_asset(&dir.join("mapping.json"), &mapping)?;
    write_asset(&dir.join("weights.json"), &weights)
}

fn find_dir(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    if dir.file_name().is_some_and(|n| n == name) {
        return Ok(Some(dir.to_path_buf()));
    }
    let entries = fs::read_dir(dir).map_err(|source| NerError::MissingAsset {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut children: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    children.sort();

    for child in children {
        if let Some(found) = find_dir(&child, name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn read_asset<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|source| NerError::MissingAsset {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| NerError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn write_asset<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::LabeledExample;
    use crate::features::{NerFeatures, NONE_FEAT};

    fn classifier() -> MaxEntClassifier {
        let mut features: NerFeatures = std::array::from_fn(|_| NONE_FEAT.to_string());
        features[13] = "Pierre".to_string();
        let mut vocab = FeatureVocabulary::build(&[LabeledExample {
            features,
            label: "B-PERSON".to_string(),
        }]);
        vocab.register("word-fantasma-O");
        let mut weights: Vec<f64> = (0..vocab.len() + 1).map(|i| i as f64 * 0.25).collect();
        weights[vocab.len() - 1] = f64::NEG_INFINITY;
        MaxEntClassifier::new(vocab, weights).unwrap()
    }

    #[test]
    fn test_classifier_round_trip_keeps_negative_infinity() {
        let dir = tempfile::tempdir().unwrap();
        let original = classifier();
        write_classifier(dir.path(), &original).unwrap();

        let raw = fs::read_to_string(dir.path().join(MAXENT_DIR).join("weights.json")).unwrap();
        assert!(raw.contains("null"));

        let loaded = load_classifier(dir.path()).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_classifier(dir.path(), &classifier()).unwrap();
        fs::remove_file(dir.path().join(MAXENT_DIR).join("mapping.json")).unwrap();
        let err = load_classifier(dir.path()).unwrap_err();
        assert!(matches!(err, NerError::MissingAsset { .. }));
    }

    #[test]
    fn test_malformed_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_classifier(dir.path(), &classifier()).unwrap();
        fs::write(dir.path().join(MAXENT_DIR).join("labels.json"), "{\"O\": 1}").unwrap();
        let err = load_classifier(dir.path()).unwrap_err();
        assert!(matches!(err, NerError::Decode { .. }));
    }

    #[test]
    fn test_truncated_weights_fail() {
        let dir = tempfile::tempdir().unwrap();
        write_classifier(dir.path(), &classifier()).unwrap();
        fs::write(dir.path().join(MAXENT_DIR).join("weights.json"), "[0.0, null]").unwrap();
        let err = load_classifier(dir.path()).unwrap_err();
        assert!(matches!(err, NerError::InvalidModel(_)));
    }

    #[test]
    fn test_find_model_in_tree() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("zoo/a/outro")).unwrap();
        let tagger = PerceptronTagger::new(
            AveragedPerceptron::new(HashMap::new(), HashMap::new(), vec!["NN".to_string()]).unwrap(),
        );
        let model = Model::new("x", tagger, EntityExtracter::new(classifier(), Lexicon::english()));
        model.write(root.path().join("zoo/b/PRODUCT")).unwrap();

        let found = Model::find_in(root.path(), "PRODUCT").unwrap();
        assert_eq!(found.name, "PRODUCT");
        assert_eq!(found.extracter().model(), model.extracter().model());

        let err = Model::find_in(root.path(), "GPE").unwrap_err();
        assert!(matches!(err, NerError::MissingAsset { .. }));
    }

    #[test]
    fn test_tagger_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let weights = HashMap::from([("bias".to_string(), vec![0.5, -0.25])]);
        let tags = HashMap::from([("the".to_string(), "DT".to_string())]);
        let classes = vec!["NN".to_string(), "DT".to_string()];
        let tagger = PerceptronTagger::new(AveragedPerceptron::new(weights, tags, classes).unwrap());

        write_tagger(dir.path(), &tagger).unwrap();
        let loaded = load_tagger(dir.path()).unwrap();
        assert_eq!(loaded.model().classes(), tagger.model().classes());
        assert_eq!(loaded.model().tag_map(), tagger.model().tag_map());
        assert_eq!(loaded.model().weights(), tagger.model().weights());
    }
}
