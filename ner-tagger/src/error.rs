//! # Erros do crate
//!
//! Falhas só existem em dois momentos: ao **carregar** um modelo do disco
//! (fatal, a construção é abortada) e ao **gravar** ou **configurar**.
//! Na inferência nada falha: features desconhecidas contribuem zero e
//! distribuições degeneradas caem para a uniforme.

use std::path::PathBuf;

use thiserror::Error;

/// Resultado padrão das operações do crate.
pub type Result<T> = std::result::Result<T, NerError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NerError {
    /// Arquivo obrigatório ausente ou ilegível.
    #[error("asset ausente: {path}: {source}")]
    MissingAsset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Conteúdo serializado que não é JSON válido para o tipo esperado.
    #[error("falha ao decodificar {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON válido, mas com formato inconsistente (ex: tamanhos divergentes).
    #[error("modelo inválido: {0}")]
    InvalidModel(String),

    /// Configuração de treino inválida.
    #[error("configuração inválida: {0}")]
    Config(String),

    #[error("erro de IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("erro de serialização: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl NerError {
    pub(crate) fn invalid_model(msg: impl Into<String>) -> Self {
        NerError::InvalidModel(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        NerError::Config(msg.into())
    }
}
