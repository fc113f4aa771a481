//! # Tokenização
//!
//! O pipeline recebe tokens prontos de um colaborador externo. Este módulo
//! define o contrato ([`Tokenizer`], [`TokenTester`]) e o tipo [`Token`],
//! além de uma implementação padrão ([`IterTokenizer`]) para inglês.
//!
//! ## Algoritmo do `IterTokenizer`
//!
//! 1. Normaliza aspas tipográficas (`“ ” ‘ ’ &rsquo;`) preservando os offsets originais.
//! 2. Divide o texto por espaços em branco.
//! 3. Cada pedaço é quebrado iterativamente:
//!    - casos especiais (emoticons, abreviações como `U.S.`, `Mr.`) ficam intactos;
//!    - prefixos (`$`, `(`, `"`, `[`) viram tokens próprios;
//!    - contrações (`'ll`, `'s`, `n't`...) são separadas;
//!    - sufixos de pontuação (`,`, `)`, `.`...) são destacados do final.
//!
//! ```rust
//! use ner_tagger::tokenizer::{IterTokenizer, Tokenizer};
//!
//! let tokens = IterTokenizer::new().tokenize("They'll pay $100.");
//! let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(texts, ["They", "'ll", "pay", "$", "100", "."]);
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Um token extraído do texto original.
///
/// Além do texto e da posição, o token carrega os campos mutáveis que cada
/// estágio do pipeline preenche **no lugar**: `tag` (classe gramatical, escrita
/// pelo tagger POS) e `label` (rótulo BIO, escrito pelo classificador NER).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// O texto do token (ex: "Vinken", ",", "'ll").
    pub text: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Índice sequencial do token na lista (0, 1, 2...).
    pub index: usize,
    /// Classe gramatical Penn Treebank (ex: "NNP"). Vazia antes do tagging.
    pub tag: String,
    /// Rótulo BIO (ex: "B-PERSON", "O"). Vazio antes da classificação.
    pub label: String,
}

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Monta tokens a partir de palavras já separadas, como se estivessem
    /// unidas por um espaço simples.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Vec<Token> {
        let mut offset = 0;
        words
            .iter()
            .enumerate()
            .map(|(index, word)| {
                let text = word.as_ref();
                let token = Token {
                    text: text.to_string(),
                    start: offset,
                    end: offset + text.len(),
                    index,
                    ..Token::default()
                };
                offset += text.len() + 1;
                token
            })
            .collect()
    }
}

/// Capacidade: transformar texto em uma sequência ordenada de tokens.
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

/// Capacidade: decidir se um pedaço de texto é indivisível.
///
/// Implementada automaticamente para closures `Fn(&str) -> bool`.
pub trait TokenTester {
    fn is_unsplittable(&self, token: &str) -> bool;
}

impl<F> TokenTester for F
where
    F: Fn(&str) -> bool,
{
    fn is_unsplittable(&self, token: &str) -> bool {
        self(token)
    }
}

/// Abreviações com pontos (`U.S.`, `e.g.`) ou títulos curtos (`Mr.`, `Dec.`).
static SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z]\.){2,}$|^[A-Z][a-z]{1,2}\.$").expect("regex válida")
});

const CONTRACTIONS: &[&str] = &["'ll", "'s", "'re", "'m", "n't"];
const SUFFIXES: &[&str] = &[",", ")", "\"", "]", "!", ";", ".", "?", ":", "'"];
const PREFIXES: &[&str] = &["$", "(", "\"", "["];
const REPLACEMENTS: &[(&str, &str)] = &[
    ("\u{201c}", "\""),
    ("\u{201d}", "\""),
    ("\u{2018}", "'"),
    ("\u{2019}", "'"),
    ("&rsquo;", "'"),
];

/// Emoticons reconhecidos como tokens indivisíveis.
///
/// O tagger POS usa a mesma lista para atribuir `SYM`.
pub const EMOTICONS: &[&str] = &[
    "(-8", "(-;", "(-_-)", "(._.)", "(:", "(=", "(o:", "(¬_¬)", "(ಠ_ಠ)",
    "(╯°□°）╯︵┻━┻", "-__-", "8-)", "8-D", "8D", ":(", ":((", ":(((", ":()",
    ":)))", ":-)", ":-))", ":-)))", ":-*", ":-/", ":-X", ":-]", ":-o", ":-p",
    ":-x", ":-|", ":-}", ":0", ":3", ":P", ":]", ":`(", ":`)", ":`-(", ":o",
    ":o)", "=(", "=)", "=D", "=|", "@_@", "O.o", "O_o", "V_V", "XDD", "[-:",
    "^___^", "o_0", "o_O", "o_o", "v_v", "xD", "xDD", "¯\\(ツ)/¯",
];

pub fn is_emoticon(word: &str) -> bool {
    EMOTICONS.contains(&word)
}

/// Descarta afixos vazios: eles casariam com qualquer token sem encurtá-lo.
fn non_empty<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Vec<String> {
    items
        .into_iter()
        .map(Into::into)
        .filter(|s: &String| !s.is_empty())
        .collect()
}

/// Tokenizador iterativo padrão.
pub struct IterTokenizer {
    emoticons: HashSet<String>,
    contractions: Vec<String>,
    split_cases: Vec<String>,
    prefixes: Vec<String>,
    suffixes: Vec<String>,
    replacements: Vec<(String, String)>,
    special: Regex,
    tester: Option<Box<dyn TokenTester + Send + Sync>>,
}

impl IterTokenizer {
    pub fn new() -> Self {
        Self {
            emoticons: EMOTICONS.iter().map(|e| e.to_string()).collect(),
            contractions: non_empty(CONTRACTIONS.iter().copied()),
            split_cases: Vec::new(),
            prefixes: non_empty(PREFIXES.iter().copied()),
            suffixes: non_empty(SUFFIXES.iter().copied()),
            replacements: REPLACEMENTS
                .iter()
                .map(|&(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            special: SPECIAL_RE.clone(),
            tester: None,
        }
    }

    /// Injeta um teste extra de indivisibilidade (ex: hashtags, URLs).
    pub fn with_unsplittable(mut self, tester: impl TokenTester + Send + Sync + 'static) -> Self {
        self.tester = Some(Box::new(tester));
        self
    }

    pub fn with_emoticons<S: Into<String>>(mut self, emoticons: impl IntoIterator<Item = S>) -> Self {
        self.emoticons = emoticons.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prefixes<S: Into<String>>(mut self, prefixes: impl IntoIterator<Item = S>) -> Self {
        self.prefixes = non_empty(prefixes);
        self
    }

    pub fn with_suffixes<S: Into<String>>(mut self, suffixes: impl IntoIterator<Item = S>) -> Self {
        self.suffixes = non_empty(suffixes);
        self
    }

    pub fn with_contractions<S: Into<String>>(mut self, contractions: impl IntoIterator<Item = S>) -> Self {
        self.contractions = non_empty(contractions);
        self
    }

    /// Pontos de quebra extras, testados antes das contrações.
    ///
    /// Com `["("]`, `amount($)` vira `[amount, (, $, )]`.
    pub fn with_split_cases<S: Into<String>>(mut self, cases: impl IntoIterator<Item = S>) -> Self {
        self.split_cases = non_empty(cases);
        self
    }

    /// Substitui a regex de casos especiais (abreviações por padrão).
    pub fn with_special_re(mut self, special: Regex) -> Self {
        self.special = special;
        self
    }

    /// Substitui a normalização aplicada antes da divisão.
    ///
    /// Os pares `(de, para)` são testados em ordem em cada posição; o primeiro
    /// que casar vence. Os offsets dos tokens continuam apontando para o texto
    /// de entrada.
    pub fn with_sanitizer<F, T>(mut self, replacements: impl IntoIterator<Item = (F, T)>) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        self.replacements = replacements
            .into_iter()
            .map(|(from, to)| (from.into(), to.into()))
            .filter(|(from, _)| !from.is_empty())
            .collect();
        self
    }

    fn is_special(&self, token: &str) -> bool {
        self.emoticons.contains(token)
            || self.special.is_match(token)
            || self
                .tester
                .as_ref()
                .is_some_and(|tester| tester.is_unsplittable(token))
    }

    /// Comprimento (em bytes) do primeiro prefixo que casa, deixando algo depois dele.
    fn prefix_len(&self, token: &str) -> Option<usize> {
        self.prefixes
            .iter()
            .find(|p| !p.is_empty() && token.len() > p.len() && token.starts_with(p.as_str()))
            .map(String::len)
    }

    fn suffix_len(&self, token: &str) -> Option<usize> {
        self.suffixes
            .iter()
            .find(|s| !s.is_empty() && token.len() > s.len() && token.ends_with(s.as_str()))
            .map(String::len)
    }

    /// Posição (em bytes) do primeiro ponto de quebra encontrado após o início.
    fn split_index(&self, token: &str) -> Option<usize> {
        // `to_ascii_lowercase` preserva o comprimento em bytes
        let lower = token.to_ascii_lowercase();
        self.split_cases
            .iter()
            .chain(&self.contractions)
            .find_map(|c| {
                lower
                    .find(c.as_str())
                    .filter(|&idx| idx > 0 && token.len() > c.len())
            })
    }

    /// Quebra um pedaço sem espaços. `offset` é a posição do pedaço no texto normalizado.
    fn split_chunk(&self, chunk: &str, offset: usize) -> Vec<(String, usize, usize)> {
        let mut tokens = Vec::new();
        let mut suffixes = Vec::new();
        let mut rest = chunk;
        let mut start = offset;

        while !rest.is_empty() {
            if self.is_special(rest) {
                tokens.push((rest.to_string(), start, start + rest.len()));
                break;
            }
            let before = rest.len();
            if let Some(len) = self.prefix_len(rest) {
                // $100 -> [$, 100]
                tokens.push((rest[..len].to_string(), start, start + len));
                rest = &rest[len..];
                start += len;
            } else if let Some(idx) = self.split_index(rest) {
                // they'll -> [they, 'll]; don't -> [do, n't]
                tokens.push((rest[..idx].to_string(), start, start + idx));
                rest = &rest[idx..];
                start += idx;
            } else if let Some(len) = self.suffix_len(rest) {
                // Well) -> [Well, )]
                let cut = rest.len() - len;
                suffixes.push((rest[cut..].to_string(), start + cut, start + rest.len()));
                rest = &rest[..cut];
            } else {
                tokens.push((rest.to_string(), start, start + rest.len()));
                break;
            }
            if rest.len() == before {
                tokens.push((rest.to_string(), start, start + rest.len()));
                break;
            }
        }

        suffixes.reverse();
        tokens.extend(suffixes);
        tokens
    }

    /// Aplica as substituições.
    ///
    /// Retorna o texto limpo e, para cada byte dele (mais o fim), o offset
    /// correspondente no texto de entrada.
    fn sanitize(&self, text: &str) -> (String, Vec<usize>) {
        let mut clean = String::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);
        let mut pos = 0;

        while let Some(ch) = text[pos..].chars().next() {
            let hit = self
                .replacements
                .iter()
                .find(|(from, _)| text[pos..].starts_with(from.as_str()));
            let (piece, consumed) = match hit {
                Some((from, to)) => (to.as_str(), from.len()),
                None => (&text[pos..pos + ch.len_utf8()], ch.len_utf8()),
            };
            offsets.extend(std::iter::repeat(pos).take(piece.len()));
            clean.push_str(piece);
            pos += consumed;
        }
        offsets.push(text.len());

        (clean, offsets)
    }
}

impl Default for IterTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for IterTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let (clean, offsets) = self.sanitize(text);
        let mut tokens = Vec::new();
        let mut chunk_start: Option<usize> = None;

        let flush = |tokens: &mut Vec<Token>, from: usize, to: usize| {
            for (piece, start, end) in self.split_chunk(&clean[from..to], from) {
                if piece.trim().is_empty() {
                    continue;
                }
                tokens.push(Token {
                    text: piece,
                    start: offsets[start],
                    end: offsets[end],
                    index: tokens.len(),
                    ..Token::default()
                });
            }
        };

        for (pos, ch) in clean.char_indices() {
            if ch.is_whitespace() {
                if let Some(from) = chunk_start.take() {
                    flush(&mut tokens, from, pos);
                }
            } else if chunk_start.is_none() {
                chunk_start = Some(pos);
            }
        }
        if let Some(from) = chunk_start {
            flush(&mut tokens, from, clean.len());
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_tokenize_basic_sentence() {
        let tokens = IterTokenizer::new().tokenize("Pierre Vinken, 61 years old, will join the board.");
        assert_eq!(
            texts(&tokens),
            ["Pierre", "Vinken", ",", "61", "years", "old", ",", "will", "join", "the", "board", "."]
        );
        for (i, token) in tokens.iter().enumerate() {
            assert_eq!(token.index, i);
        }
    }

    #[test]
    fn test_offsets_point_into_original_text() {
        let text = "“Hello” world";
        let tokens = IterTokenizer::new().tokenize(text);
        assert_eq!(texts(&tokens), ["\"", "Hello", "\"", "world"]);
        assert_eq!(&text[tokens[1].start..tokens[1].end], "Hello");
        assert_eq!(&text[tokens[3].start..tokens[3].end], "world");
    }

    #[test]
    fn test_contractions_and_abbreviations() {
        let tokens = IterTokenizer::new().tokenize("I don't live in the U.S. now");
        assert_eq!(texts(&tokens), ["I", "do", "n't", "live", "in", "the", "U.S.", "now"]);
    }

    #[test]
    fn test_emoticons_are_kept() {
        let tokens = IterTokenizer::new().tokenize("great :-) thanks");
        assert_eq!(texts(&tokens), ["great", ":-)", "thanks"]);
    }

    #[test]
    fn test_custom_unsplittable() {
        let tokenizer = IterTokenizer::new().with_unsplittable(|t: &str| t.starts_with('#'));
        let tokens = tokenizer.tokenize("#hello, world");
        assert_eq!(texts(&tokens), ["#hello,", "world"]);
    }

    #[test]
    fn test_custom_multichar_affixes() {
        let tokenizer = IterTokenizer::new()
            .with_prefixes(["US$"])
            .with_suffixes(["..."]);
        let tokens = tokenizer.tokenize("US$5 wait...");
        assert_eq!(texts(&tokens), ["US$", "5", "wait", "..."]);
    }

    #[test]
    fn test_empty_affixes_are_ignored() {
        let tokenizer = IterTokenizer::new()
            .with_prefixes([""])
            .with_suffixes(["", "!"])
            .with_contractions([""])
            .with_split_cases([""]);
        let tokens = tokenizer.tokenize("hi there!");
        assert_eq!(texts(&tokens), ["hi", "there", "!"]);
    }

    #[test]
    fn test_split_cases_before_contractions() {
        let tokens = IterTokenizer::new().with_split_cases(["("]).tokenize("amount($)");
        assert_eq!(texts(&tokens), ["amount", "(", "$", ")"]);
    }

    #[test]
    fn test_custom_special_regex() {
        let tokenizer = IterTokenizer::new().with_special_re(Regex::new(r"^:\w+:$").unwrap());
        let tokens = tokenizer.tokenize("e.g. :smile:");
        // a regex padrão deixaria "e.g." intacto
        assert_eq!(texts(&tokens), ["e.g", ".", ":smile:"]);
    }

    #[test]
    fn test_custom_sanitizer_keeps_offsets() {
        let text = "``Hi\u{2019}";
        let tokens = IterTokenizer::new().with_sanitizer([("``", "\"")]).tokenize(text);
        // aspas tipográficas não são mais normalizadas
        assert_eq!(texts(&tokens), ["\"", "Hi\u{2019}"]);
        assert_eq!((tokens[0].start, tokens[0].end), (0, 2));
        assert_eq!(&text[tokens[1].start..tokens[1].end], "Hi\u{2019}");
    }

    #[test]
    fn test_from_words_offsets() {
        let tokens = Token::from_words(&["Windows", "10"]);
        assert_eq!(tokens[1].start, 8);
        assert_eq!(tokens[1].end, 10);
        assert_eq!(tokens[1].index, 1);
    }
}
