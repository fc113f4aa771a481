//! # Pipeline de Inferência
//!
//! Orquestra os estágios sobre um [`Model`] carregado:
//!
//! ```text
//! texto ─► Tokenizer ─► PerceptronTagger ─► EntityExtracter ─► chunker ─► EntitySpan
//!            (tokens)      (token.tag)         (token.label)
//! ```
//!
//! Os tokens são do chamador e cada estágio escreve o seu campo no lugar.
//! O pipeline não guarda estado mutável, então pode ser compartilhado entre
//! threads (`&NerPipeline` é `Send + Sync`).

use crate::chunker::EntitySpan;
use crate::model::Model;
use crate::tokenizer::{IterTokenizer, Token, Tokenizer};

pub struct NerPipeline {
    model: Model,
    tokenizer: Box<dyn Tokenizer + Send + Sync>,
}

impl NerPipeline {
    /// Pipeline com o [`IterTokenizer`] padrão.
    pub fn new(model: Model) -> Self {
        Self::with_tokenizer(model, IterTokenizer::new())
    }

    pub fn with_tokenizer(model: Model, tokenizer: impl Tokenizer + Send + Sync + 'static) -> Self {
        Self {
            model,
            tokenizer: Box::new(tokenizer),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Tokeniza e etiqueta (POS).
    pub fn tag(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);
        self.model.tagger().tag(&mut tokens);
        tokens
    }

    /// Etiqueta, classifica e agrupa tokens vindos de outro tokenizador.
    pub fn analyze_tokens(&self, tokens: &mut [Token]) -> Vec<EntitySpan> {
        self.model.tagger().tag(tokens);
        let extracter = self.model.extracter();
        extracter.classify(tokens);
        extracter.chunk(tokens)
    }

    /// Executa o pipeline completo sobre um texto.
    pub fn analyze(&self, text: &str) -> (Vec<Token>, Vec<EntitySpan>) {
        let mut tokens = self.tokenizer.tokenize(text);
        let entities = self.analyze_tokens(&mut tokens);
        (tokens, entities)
    }
}
