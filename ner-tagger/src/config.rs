//! # Configuração de Treinamento
//!
//! Parâmetros dos dois treinadores. Todos têm valores padrão, então um JSON
//! vazio (`{}`) é uma configuração válida.
//!
//! ```json
//! {
//!   "gis": { "rounds": 100 },
//!   "perceptron": { "iterations": 5, "seed": 42 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NerError, Result};

/// Configuração completa de treino.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub gis: GisConfig,
    pub perceptron: PerceptronConfig,
}

/// Parâmetros do Generalized Iterative Scaling.
///
/// Não há critério de convergência: o laço roda exatamente `rounds` rodadas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GisConfig {
    pub rounds: usize,
}

impl Default for GisConfig {
    fn default() -> Self {
        Self { rounds: 100 }
    }
}

/// Parâmetros do treino do Averaged Perceptron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptronConfig {
    /// Número de épocas (passadas completas pelo corpus).
    pub iterations: usize,
    /// Semente do embaralhamento entre épocas.
    pub seed: u64,
}

impl Default for PerceptronConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    /// Lê a configuração de uma string JSON e valida.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Lê a configuração de um arquivo JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| NerError::MissingAsset {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| NerError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gis.rounds == 0 {
            return Err(NerError::config("gis.rounds deve ser maior que zero"));
        }
        if self.perceptron.iterations == 0 {
            return Err(NerError::config(
                "perceptron.iterations deve ser maior que zero",
            ));
        }
        Ok(())
    }
}
