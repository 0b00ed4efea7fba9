//! Rule-based sentiment scoring in the VADER style.
//!
//! Valences come from an embedded word lexicon (range roughly -4..4) and are
//! adjusted by boosters, negations, ALL-CAPS emphasis, "but" shifts and
//! trailing punctuation before being folded into neg/neu/pos proportions and
//! a normalized compound score in [-1, 1].

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::report::py_float;

static LEXICON: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid sentiment lexicon")
});

const B_INCR: f64 = 0.293;
const B_DECR: f64 = -0.293;
const C_INCR: f64 = 0.733;
const N_SCALAR: f64 = -0.74;
/// Normalization constant: approximates the max expected raw sum.
const ALPHA: f64 = 15.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

/// Renders like a Python dict repr, which is what the report file shows.
impl fmt::Display for SentimentScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{'neg': {}, 'neu': {}, 'pos': {}, 'compound': {}}}",
            py_float(self.neg),
            py_float(self.neu),
            py_float(self.pos),
            py_float(self.compound)
        )
    }
}

/// Scorer seam: the runner only needs text → scores.
pub trait SentimentScorer: Send + Sync {
    fn polarity_scores(&self, text: &str) -> SentimentScores;
}

#[derive(Debug, Clone, Default)]
pub struct VaderAnalyzer;

impl VaderAnalyzer {
    pub fn new() -> Self {
        // Force lexicon parsing at construction time, not on the first request.
        Lazy::force(&LEXICON);
        Self
    }

    #[inline]
    fn valence(&self, w: &str) -> Option<f64> {
        LEXICON.get(w).copied()
    }

    #[inline]
    fn in_lexicon(&self, w: &str) -> bool {
        LEXICON.contains_key(w)
    }

    fn word_valence(&self, words: &[String], lower: &[String], i: usize, is_cap_diff: bool) -> f64 {
        let Some(mut valence) = self.valence(&lower[i]) else {
            return 0.0;
        };

        if is_cap_diff && is_upper(&words[i]) {
            valence += if valence > 0.0 { C_INCR } else { -C_INCR };
        }

        for start_i in 0..3 {
            if i <= start_i {
                break;
            }
            let prev = i - (start_i + 1);
            if self.in_lexicon(&lower[prev]) {
                continue;
            }
            let mut s = scalar_inc_dec(&words[prev], &lower[prev], valence, is_cap_diff);
            if start_i == 1 {
                s *= 0.95;
            } else if start_i == 2 {
                s *= 0.9;
            }
            valence += s;
            valence = negation_check(valence, lower, start_i, i);
        }

        self.least_check(valence, lower, i)
    }

    fn least_check(&self, valence: f64, lower: &[String], i: usize) -> f64 {
        if i > 1 && !self.in_lexicon(&lower[i - 1]) && lower[i - 1] == "least" {
            if lower[i - 2] != "at" && lower[i - 2] != "very" {
                return valence * N_SCALAR;
            }
        } else if i > 0 && !self.in_lexicon(&lower[i - 1]) && lower[i - 1] == "least" {
            return valence * N_SCALAR;
        }
        valence
    }
}

impl SentimentScorer for VaderAnalyzer {
    fn polarity_scores(&self, text: &str) -> SentimentScores {
        let words: Vec<String> = tokenize(text).collect();
        let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let is_cap_diff = allcap_differential(&words);

        let mut sentiments = Vec::with_capacity(words.len());
        for i in 0..words.len() {
            let w = lower[i].as_str();
            if booster(w).is_some() {
                sentiments.push(0.0);
                continue;
            }
            if w == "kind" && lower.get(i + 1).is_some_and(|n| n == "of") {
                sentiments.push(0.0);
                continue;
            }
            sentiments.push(self.word_valence(&words, &lower, i, is_cap_diff));
        }

        but_check(&lower, &mut sentiments);
        score_valence(&sentiments, text)
    }
}

/// Whitespace tokens; surrounding ASCII punctuation is stripped when the rest
/// is longer than two chars (keeps emoticons like ":)"). Single chars dropped.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split_whitespace()
        .map(|tok| {
            let stripped = tok.trim_matches(|c: char| c.is_ascii_punctuation());
            if stripped.chars().count() <= 2 {
                tok
            } else {
                stripped
            }
        })
        .filter(|t| t.chars().count() > 1)
        .map(str::to_string)
}

fn is_upper(w: &str) -> bool {
    w.chars().any(char::is_uppercase) && !w.chars().any(char::is_lowercase)
}

/// True when some, but not all, words are shouted.
fn allcap_differential(words: &[String]) -> bool {
    let caps = words.iter().filter(|w| is_upper(w)).count();
    caps > 0 && caps < words.len()
}

fn booster(w: &str) -> Option<f64> {
    match w {
        "absolutely" | "amazingly" | "awfully" | "completely" | "considerably" | "decidedly"
        | "deeply" | "enormously" | "entirely" | "especially" | "exceptionally" | "extremely"
        | "fabulously" | "fully" | "greatly" | "highly" | "hugely" | "incredibly" | "intensely"
        | "majorly" | "more" | "most" | "particularly" | "purely" | "quite" | "really"
        | "remarkably" | "so" | "substantially" | "thoroughly" | "totally" | "tremendously"
        | "unbelievably" | "unusually" | "utterly" | "very" => Some(B_INCR),
        "almost" | "barely" | "hardly" | "kinda" | "kindof" | "less" | "little" | "marginally"
        | "occasionally" | "partly" | "scarcely" | "slightly" | "somewhat" | "sorta"
        | "sortof" => Some(B_DECR),
        _ => None,
    }
}

fn scalar_inc_dec(word: &str, lower: &str, valence: f64, is_cap_diff: bool) -> f64 {
    let Some(mut scalar) = booster(lower) else {
        return 0.0;
    };
    if valence < 0.0 {
        scalar = -scalar;
    }
    if is_cap_diff && is_upper(word) {
        scalar += if valence > 0.0 { C_INCR } else { -C_INCR };
    }
    scalar
}

fn is_negator(w: &str) -> bool {
    matches!(
        w,
        "aint" | "arent" | "cannot" | "cant" | "couldnt" | "darent" | "didnt" | "doesnt"
            | "dont" | "hadnt" | "hasnt" | "havent" | "isnt" | "mightnt" | "mustnt"
            | "neither" | "neednt" | "never" | "none" | "nope" | "nor" | "not" | "nothing"
            | "nowhere" | "oughtnt" | "shant" | "shouldnt" | "uhuh" | "uh-uh" | "wasnt"
            | "werent" | "without" | "wont" | "wouldnt" | "rarely" | "seldom" | "despite"
    ) || w.contains("n't")
}

fn so_or_this(w: &str) -> bool {
    w == "so" || w == "this"
}

fn negation_check(valence: f64, lower: &[String], start_i: usize, i: usize) -> f64 {
    match start_i {
        0 => {
            if is_negator(&lower[i - 1]) {
                return valence * N_SCALAR;
            }
        }
        1 => {
            if lower[i - 2] == "never" && so_or_this(&lower[i - 1]) {
                return valence * 1.25;
            } else if lower[i - 2] == "without" && lower[i - 1] == "doubt" {
                return valence;
            } else if is_negator(&lower[i - 2]) {
                return valence * N_SCALAR;
            }
        }
        2 => {
            if lower[i - 3] == "never" && (so_or_this(&lower[i - 2]) || so_or_this(&lower[i - 1]))
            {
                return valence * 1.25;
            } else if lower[i - 3] == "without" && (lower[i - 2] == "doubt" || lower[i - 1] == "doubt")
            {
                return valence;
            } else if is_negator(&lower[i - 3]) {
                return valence * N_SCALAR;
            }
        }
        _ => {}
    }
    valence
}

/// Sentiment before "but" is dampened, after it amplified.
fn but_check(lower: &[String], sentiments: &mut [f64]) {
    if let Some(bi) = lower.iter().position(|w| w == "but") {
        for (idx, s) in sentiments.iter_mut().enumerate() {
            if idx < bi {
                *s *= 0.5;
            } else if idx > bi {
                *s *= 1.5;
            }
        }
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let ep = text.matches('!').count().min(4) as f64 * 0.292;
    let qm_count = text.matches('?').count();
    let qm = match qm_count {
        0 | 1 => 0.0,
        2 | 3 => qm_count as f64 * 0.18,
        _ => 0.96,
    };
    ep + qm
}

fn normalize(score: f64) -> f64 {
    (score / (score * score + ALPHA).sqrt()).clamp(-1.0, 1.0)
}

fn round_to(v: f64, places: i32) -> f64 {
    let p = 10f64.powi(places);
    (v * p).round() / p
}

fn score_valence(sentiments: &[f64], text: &str) -> SentimentScores {
    if sentiments.is_empty() {
        return SentimentScores::default();
    }

    let punct = punctuation_emphasis(text);
    let mut sum_s: f64 = sentiments.iter().sum();
    if sum_s > 0.0 {
        sum_s += punct;
    } else if sum_s < 0.0 {
        sum_s -= punct;
    }
    let compound = normalize(sum_s);

    let (mut pos_sum, mut neg_sum, mut neu_count) = (0.0f64, 0.0f64, 0usize);
    for &s in sentiments {
        if s > 0.0 {
            pos_sum += s + 1.0;
        } else if s < 0.0 {
            neg_sum += s - 1.0;
        } else {
            neu_count += 1;
        }
    }
    if pos_sum > neg_sum.abs() {
        pos_sum += punct;
    } else if pos_sum < neg_sum.abs() {
        neg_sum -= punct;
    }

    let total = pos_sum + neg_sum.abs() + neu_count as f64;
    SentimentScores {
        neg: round_to((neg_sum / total).abs(), 3),
        neu: round_to((neu_count as f64 / total).abs(), 3),
        pos: round_to((pos_sum / total).abs(), 3),
        compound: round_to(compound, 4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(text: &str) -> SentimentScores {
        VaderAnalyzer::new().polarity_scores(text)
    }

    #[test]
    fn single_positive_word() {
        let s = score("good");
        assert_eq!(s.compound, 0.4404);
        assert_eq!(s.pos, 1.0);
        assert_eq!(s.neu, 0.0);
        assert_eq!(s.neg, 0.0);
    }

    #[test]
    fn neutral_placeholder_scores_zero() {
        let s = score("Content not found");
        assert_eq!(
            s,
            SentimentScores {
                neg: 0.0,
                neu: 1.0,
                pos: 0.0,
                compound: 0.0
            }
        );
    }

    #[test]
    fn fetch_error_placeholder_is_pinned() {
        let s = score("Error: Unable to fetch content (status code: 404)");
        assert_eq!(s.neg, 0.278);
        assert_eq!(s.neu, 0.722);
        assert_eq!(s.pos, 0.0);
        assert_eq!(s.compound, -0.4019);
    }

    #[test]
    fn negation_flips_sign() {
        assert!(score("this is good").compound > 0.0);
        assert!(score("this is not good").compound < 0.0);
    }

    #[test]
    fn boosters_and_exclamations_amplify() {
        let plain = score("good").compound;
        assert!(score("very good").compound > plain);
        assert!(score("good!!!").compound > plain);
    }

    #[test]
    fn but_shifts_weight_to_the_second_clause() {
        let s = score("the food was good but the service was terrible");
        assert!(s.compound < 0.0, "got {s:?}");
    }

    #[test]
    fn empty_text_is_all_zero() {
        assert_eq!(score("   "), SentimentScores::default());
    }

    #[test]
    fn display_matches_python_dict_repr() {
        let s = SentimentScores {
            neg: 0.046,
            neu: 0.82,
            pos: 0.134,
            compound: 0.9851,
        };
        assert_eq!(
            s.to_string(),
            "{'neg': 0.046, 'neu': 0.82, 'pos': 0.134, 'compound': 0.9851}"
        );
        assert_eq!(
            SentimentScores::default().to_string(),
            "{'neg': 0.0, 'neu': 0.0, 'pos': 0.0, 'compound': 0.0}"
        );
        let tiny = SentimentScores {
            compound: 5e-6,
            ..SentimentScores::default()
        };
        assert!(tiny.to_string().ends_with("'compound': 5e-06}"));
    }
}
