//! # Engenharia de Features
//!
//! Os dois modelos do pipeline recebem tuplas de tamanho **fixo**: cada posição
//! (slot) tem um nome e um valor textual. Nada de mapas esparsos aqui: a ordem
//! dos slots é parte do contrato, porque o vocabulário do MaxEnt e a tabela de
//! pesos do perceptron são indexados por ela.
//!
//! ## Features POS (14 slots)
//!
//! Calculadas sobre um contexto com duas sentinelas de cada lado
//! (`-START-`, `-START2-` ... `-END-`, `-END2-`) e as duas tags previstas antes:
//!
//! | # | Feature | # | Feature |
//! |---|---------|---|---------|
//! | 0 | `bias` | 7 | `i-1 tag+i word` |
//! | 1 | `i suffix` | 8 | `i-1 word` |
//! | 2 | `i pref1` | 9 | `i-1 suffix` |
//! | 3 | `i-1 tag` | 10 | `i-2 word` |
//! | 4 | `i-2 tag` | 11 | `i+1 word` |
//! | 5 | `i tag+i-2 tag` | 12 | `i+1 suffix` |
//! | 6 | `i word` | 13 | `i+2 word` |
//!
//! ## Features NER (17 slots)
//!
//! Ver [`NER_FEATURE_NAMES`]. Tokens de borda usam a sentinela [`NONE_FEAT`]
//! no lugar do contexto indisponível.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::tokenizer::Token;

/// Número de slots da tupla POS.
pub const POS_FEATURE_COUNT: usize = 14;
/// Número de slots da tupla NER.
pub const NER_FEATURE_COUNT: usize = 17;

pub type PosFeatures = [String; POS_FEATURE_COUNT];
pub type NerFeatures = [String; NER_FEATURE_COUNT];

/// Sentinelas de início de sentença (tags e contexto).
pub const START: [&str; 2] = ["-START-", "-START2-"];
/// Sentinelas de fim de sentença.
pub const END: [&str; 2] = ["-END-", "-END2-"];

/// Valor usado quando o contexto não existe (primeiro/último token).
pub const NONE_FEAT: &str = "None";

/// Nomes dos slots NER, na ordem da tupla.
pub const NER_FEATURE_NAMES: [&str; NER_FEATURE_COUNT] = [
    "bias",
    "en-wordlist",
    "nextpos",
    "nextword",
    "pos",
    "pos+prevtag",
    "prefix3",
    "prevpos",
    "prevtag",
    "prevword",
    "shape",
    "shape+prevtag",
    "suffix3",
    "word",
    "word+nextpos",
    "word.lower",
    "wordlen",
];

/// Lista de palavras básicas do inglês.
///
/// Alimenta o slot `en-wordlist`: palavras muito comuns raramente são
/// entidades, mesmo quando capitalizadas no início da frase.
#[derive(Debug, Clone)]
pub struct Lexicon {
    words: HashSet<String>,
}

impl Lexicon {
    /// Léxico vazio (o slot `en-wordlist` será sempre `False`).
    pub fn new() -> Self {
        Self {
            words: HashSet::new(),
        }
    }

    /// Léxico padrão com as palavras funcionais e verbos mais frequentes do inglês.
    pub fn english() -> Self {
        Self::from_words(BASIC_ENGLISH.iter().copied())
    }

    pub fn from_words<S: Into<String>>(words: impl IntoIterator<Item = S>) -> Self {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, word: impl Into<String>) {
        self.words.insert(word.into());
    }

    /// Verifica a palavra na forma original ou em minúsculas.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word) || self.words.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::english()
    }
}

const BASIC_ENGLISH: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
    "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "come", "could", "day", "did", "do", "does",
    "doing", "down", "during", "each", "even", "first", "for", "from", "further", "get",
    "give", "go", "good", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "itself", "just", "know", "like", "look", "make", "man", "many", "me", "more", "most",
    "my", "myself", "new", "no", "nor", "not", "now", "of", "off", "on", "once", "one",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "people",
    "same", "say", "see", "she", "should", "so", "some", "such", "take", "than", "that",
    "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they",
    "think", "this", "those", "through", "time", "to", "too", "two", "under", "until",
    "up", "us", "use", "very", "want", "was", "way", "we", "well", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "work", "would",
    "year", "you", "your", "yours", "yourself", "yourselves",
];

// ---------------------------------------------------------------------------
// POS
// ---------------------------------------------------------------------------

/// Normaliza uma palavra para o contexto do tagger POS.
///
/// - contém hífen (não inicial) → `!HYPHEN`
/// - inteiro de 4 caracteres → `!YEAR`
/// - começa com dígito → `!DIGITS`
/// - caso contrário, minúsculas
pub fn normalize(word: &str) -> String {
    let Some(first) = word.chars().next() else {
        return String::new();
    };
    if word.contains('-') && first != '-' {
        "!HYPHEN".to_string()
    } else if word.len() == 4 && word.parse::<i64>().is_ok() {
        "!YEAR".to_string()
    } else if first.is_ascii_digit() {
        "!DIGITS".to_string()
    } else {
        word.to_lowercase()
    }
}

/// Monta o contexto normalizado com as sentinelas nas bordas.
///
/// O resultado tem `tokens.len() + 4` posições; o token `i` fica em `i + 2`.
pub fn pos_context(tokens: &[Token]) -> Vec<String> {
    let mut context = Vec::with_capacity(tokens.len() + 4);
    context.extend(START.iter().map(|s| s.to_string()));
    context.extend(tokens.iter().map(|t| normalize(&t.text)));
    context.extend(END.iter().map(|s| s.to_string()));
    context
}

/// Extrai as 14 features POS do token `i`.
///
/// # Parâmetros
/// - `context`: saída de [`pos_context`] (já com sentinelas).
/// - `word`: texto literal do token (sufixo e prefixo usam a forma original).
/// - `p1`, `p2`: tags previstas para `i-1` e `i-2`.
pub fn pos_features(i: usize, context: &[String], word: &str, p1: &str, p2: &str) -> PosFeatures {
    let i = i + 2;
    debug_assert!(i + 2 < context.len(), "contexto sem sentinelas");

    let prev = &context[i - 1];
    let next = &context[i + 1];
    let first = word.chars().next().map(String::from).unwrap_or_default();

    [
        "bias".to_string(),
        format!("i suffix {}", suffix(word, 3)),
        format!("i pref1 {first}"),
        format!("i-1 tag {p1}"),
        format!("i-2 tag {p2}"),
        format!("i tag+i-2 tag {p1} {p2}"),
        format!("i word {}", context[i]),
        format!("i-1 tag+i word {p1} {}", context[i]),
        format!("i-1 word {prev}"),
        format!("i-1 suffix {}", suffix(prev, 3)),
        format!("i-2 word {}", context[i - 2]),
        format!("i+1 word {next}"),
        format!("i+1 suffix {}", suffix(next, 3)),
        format!("i+2 word {}", context[i + 2]),
    ]
}

// ---------------------------------------------------------------------------
// NER
// ---------------------------------------------------------------------------

/// Extrai as 17 features NER do token `i`.
///
/// `history` contém os rótulos BIO já atribuídos aos tokens anteriores
/// (apenas `history[i - 1]` é consultado). Os tokens precisam estar
/// etiquetados pelo tagger POS.
pub fn ner_features(i: usize, tokens: &[Token], history: &[String], lexicon: &Lexicon) -> NerFeatures {
    let token = &tokens[i];
    let word = token.text.as_str();
    let lower = word.to_lowercase();

    let (prevword, prevpos, prevtag) = if i == 0 {
        (NONE_FEAT.to_string(), NONE_FEAT.to_string(), NONE_FEAT.to_string())
    } else {
        let prev = &tokens[i - 1];
        (
            prev.text.to_lowercase(),
            simple_pos(&prev.tag).to_string(),
            history[i - 1].clone(),
        )
    };
    let prev_shape = if i >= 2 {
        shape(&tokens[i - 1].text)
    } else {
        NONE_FEAT
    };

    let (nextword, nextpos) = match tokens.get(i + 1) {
        Some(next) => (next.text.to_lowercase(), simple_pos(&next.tag).to_lowercase()),
        None => (NONE_FEAT.to_string(), NONE_FEAT.to_string()),
    };

    let in_lexicon = if lexicon.contains(word) { "True" } else { "False" };

    [
        "True".to_string(),
        in_lexicon.to_string(),
        nextpos.clone(),
        nextword,
        token.tag.clone(),
        format!("{}+{prevtag}", token.tag),
        prefix(word, 3).to_lowercase(),
        prevpos,
        prevtag.clone(),
        prevword,
        shape(word).to_string(),
        format!("{prev_shape}+{prevtag}"),
        suffix(word, 3).to_lowercase(),
        word.to_string(),
        format!("{lower}+{nextpos}"),
        lower,
        word.chars().count().to_string(),
    ]
}

/// Simplifica uma tag: verbos viram `v`; o resto perde o que vem após o primeiro `-`.
pub fn simple_pos(tag: &str) -> &str {
    if tag.starts_with('V') {
        return "v";
    }
    tag.split('-').next().unwrap_or(tag)
}

static PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+$").expect("regex válida"));
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+$").expect("regex válida"));

/// Classe ortográfica do token.
///
/// `number`, `punct`, `downcase`, `upcase` (toda palavra começa maiúscula),
/// `mixedcase` ou `other`.
pub fn shape(word: &str) -> &'static str {
    if word.parse::<f64>().is_ok() {
        "number"
    } else if PUNCT_RE.is_match(word) {
        "punct"
    } else if WORD_RE.is_match(word) {
        if word.to_lowercase() == word {
            "downcase"
        } else if is_title_case(word) {
            "upcase"
        } else {
            "mixedcase"
        }
    } else {
        "other"
    }
}

/// Verdadeiro se toda letra que inicia uma palavra já está em maiúscula.
fn is_title_case(word: &str) -> bool {
    let mut at_boundary = true;
    for c in word.chars() {
        if at_boundary && c.is_lowercase() {
            return false;
        }
        at_boundary = !(c.is_alphanumeric() || c == '_');
    }
    true
}

/// Últimos `n` caracteres.
pub fn suffix(word: &str, n: usize) -> &str {
    let count = word.chars().count();
    match word.char_indices().nth(count.saturating_sub(n)) {
        Some((pos, _)) => &word[pos..],
        None => word,
    }
}

/// Primeiros `n` caracteres.
pub fn prefix(word: &str, n: usize) -> &str {
    match word.char_indices().nth(n) {
        Some((pos, _)) => &word[..pos],
        None => word,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(pairs: &[(&str, &str)]) -> Vec<Token> {
        let words: Vec<&str> = pairs.iter().map(|(w, _)| *w).collect();
        let mut tokens = Token::from_words(&words);
        for (token, (_, tag)) in tokens.iter_mut().zip(pairs) {
            token.tag = tag.to_string();
        }
        tokens
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("well-known"), "!HYPHEN");
        assert_eq!(normalize("-LRB-"), "-lrb-");
        assert_eq!(normalize("1999"), "!YEAR");
        assert_eq!(normalize("61"), "!DIGITS");
        assert_eq!(normalize("3rd"), "!DIGITS");
        assert_eq!(normalize("Vinken"), "vinken");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_pos_features_first_token() {
        let tokens = Token::from_words(&["Pierre", "Vinken", ","]);
        let context = pos_context(&tokens);
        assert_eq!(context.len(), 7);

        let feats = pos_features(0, &context, "Pierre", START[0], START[1]);
        assert_eq!(feats.len(), POS_FEATURE_COUNT);
        assert_eq!(feats[0], "bias");
        assert_eq!(feats[1], "i suffix rre");
        assert_eq!(feats[2], "i pref1 P");
        assert_eq!(feats[3], "i-1 tag -START-");
        assert_eq!(feats[5], "i tag+i-2 tag -START- -START2-");
        assert_eq!(feats[6], "i word pierre");
        assert_eq!(feats[8], "i-1 word -START2-");
        assert_eq!(feats[10], "i-2 word -START-");
        assert_eq!(feats[11], "i+1 word vinken");
        assert_eq!(feats[12], "i+1 suffix ken");
        assert_eq!(feats[13], "i+2 word ,");
    }

    #[test]
    fn test_pos_features_last_token_sees_end_markers() {
        let tokens = Token::from_words(&["Hello", "world"]);
        let context = pos_context(&tokens);
        let feats = pos_features(1, &context, "world", "UH", START[0]);
        assert_eq!(feats[11], "i+1 word -END-");
        assert_eq!(feats[12], "i+1 suffix ND-");
        assert_eq!(feats[13], "i+2 word -END2-");
        assert_eq!(feats[7], "i-1 tag+i word UH world");
    }

    #[test]
    fn test_shape() {
        assert_eq!(shape("61"), "number");
        assert_eq!(shape("3.14"), "number");
        assert_eq!(shape(","), "punct");
        assert_eq!(shape("board"), "downcase");
        assert_eq!(shape("Vinken"), "upcase");
        assert_eq!(shape("IBM"), "upcase");
        assert_eq!(shape("iPhone"), "mixedcase");
        assert_eq!(shape("Nov."), "punct");
    }

    #[test]
    fn test_simple_pos() {
        assert_eq!(simple_pos("VBD"), "v");
        assert_eq!(simple_pos("NNP"), "NNP");
        assert_eq!(simple_pos("B-PERSON"), "B");
        assert_eq!(simple_pos(""), "");
    }

    #[test]
    fn test_ner_features_first_token_edges() {
        let tokens = tagged(&[("Pierre", "NNP"), ("Vinken", "NNP"), (",", ",")]);
        let feats = ner_features(0, &tokens, &[], &Lexicon::english());

        assert_eq!(feats[0], "True");
        assert_eq!(feats[1], "False");
        assert_eq!(feats[2], "nnp");
        assert_eq!(feats[3], "vinken");
        assert_eq!(feats[4], "NNP");
        assert_eq!(feats[5], "NNP+None");
        assert_eq!(feats[6], "pie");
        assert_eq!(feats[7], NONE_FEAT);
        assert_eq!(feats[8], NONE_FEAT);
        assert_eq!(feats[9], NONE_FEAT);
        assert_eq!(feats[10], "upcase");
        assert_eq!(feats[11], "None+None");
        assert_eq!(feats[12], "rre");
        assert_eq!(feats[13], "Pierre");
        assert_eq!(feats[14], "pierre+nnp");
        assert_eq!(feats[15], "pierre");
        assert_eq!(feats[16], "6");
    }

    #[test]
    fn test_ner_features_history_and_last_token() {
        let tokens = tagged(&[("Pierre", "NNP"), ("Vinken", "NNP"), ("will", "MD")]);
        let history = vec!["B-PERSON".to_string(), "I-PERSON".to_string()];
        let feats = ner_features(2, &tokens, &history, &Lexicon::english());

        assert_eq!(feats[1], "True");
        assert_eq!(feats[2], NONE_FEAT);
        assert_eq!(feats[3], NONE_FEAT);
        assert_eq!(feats[5], "MD+I-PERSON");
        assert_eq!(feats[7], "NNP");
        assert_eq!(feats[8], "I-PERSON");
        assert_eq!(feats[9], "vinken");
        assert_eq!(feats[11], "upcase+I-PERSON");
        assert_eq!(feats[14], "will+None");
    }

    #[test]
    fn test_second_token_has_no_previous_shape() {
        let tokens = tagged(&[("Pierre", "NNP"), ("Vinken", "NNP")]);
        let history = vec!["B-PERSON".to_string()];
        let feats = ner_features(1, &tokens, &history, &Lexicon::new());
        assert_eq!(feats[11], "None+B-PERSON");
        assert_eq!(feats[1], "False");
    }

    #[test]
    fn test_prefix_suffix_are_char_based() {
        assert_eq!(suffix("café", 3), "afé");
        assert_eq!(prefix("ão", 3), "ão");
        assert_eq!(suffix("", 3), "");
    }
}
