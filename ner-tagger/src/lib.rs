//! # ner-tagger — POS Tagging e Reconhecimento de Entidades Nomeadas
//!
//! Pipeline estatístico em dois estágios para textos em inglês:
//!
//! 1.  **Tokenização** ([`tokenizer`]): o texto vira uma sequência de [`Token`]s com offsets.
//! 2.  **POS Tagging** ([`perceptron`]): um Averaged Perceptron atribui a classe
//!     gramatical de cada token, da esquerda para a direita.
//! 3.  **Classificação NER** ([`maxent`]): um classificador de Entropia Máxima,
//!     treinado por GIS ([`gis`]), atribui uma label BIO a cada token.
//! 4.  **Chunking** ([`chunker`]): as labels BIO viram [`EntitySpan`]s.
//!
//! ## Exemplo de Uso
//!
//! ```rust,no_run
//! use ner_tagger::{Model, NerPipeline};
//!
//! // Diretório com AveragedPerceptron/ e Maxent/
//! let model = Model::from_disk("models/PRODUCT")?;
//! let pipeline = NerPipeline::new(model);
//!
//! let (tokens, entities) = pipeline.analyze("Windows 10 is an operating system");
//! for token in &tokens {
//!     println!("{}/{}/{}", token.text, token.tag, token.label);
//! }
//! for entity in entities {
//!     println!("Entidade: {} ({})", entity.text, entity.label);
//! }
//! # Ok::<(), ner_tagger::NerError>(())
//! ```
//!
//! ## Treinamento
//!
//! - [`PerceptronTagger::train`] aprende um tagger a partir de texto `palavra|TAG`.
//! - [`Model::from_data`] treina um extrator a partir de registros [`EntityContext`]
//!   (texto + spans anotados), etiquetando o texto com um tagger existente.
//!
//! ## Módulos Principais
//!
//! - [`features`]: as 14 features POS e as 17 features NER.
//! - [`vocabulary`]: mapeamento das features conjuntas `(feature, label)` para índices.
//! - [`corpus`]: alinhamento dos spans anotados com os tokens.
//! - [`model`]: leitura e escrita dos modelos em JSON.
//! - [`config`]: parâmetros de treino.

pub mod chunker;
pub mod config;
pub mod corpus;
pub mod error;
pub mod features;
pub mod gis;
pub mod maxent;
pub mod model;
pub mod perceptron;
pub mod pipeline;
pub mod tokenizer;
pub mod vocabulary;

pub use chunker::EntitySpan;
pub use config::{GisConfig, PerceptronConfig, TrainingConfig};
pub use corpus::{EntityContext, LabeledEntity};
pub use error::{NerError, Result};
pub use maxent::{EntityExtracter, MaxEntClassifier};
pub use model::Model;
pub use perceptron::{AveragedPerceptron, PerceptronTagger, TaggedSentence};
pub use pipeline::NerPipeline;
pub use tokenizer::{IterTokenizer, Token, TokenTester, Tokenizer};
