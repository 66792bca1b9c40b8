// ============================================================
// Layer 4 — Instances
// ============================================================
// The example records the solvers train on, in three shapes:
//
//   TextInstance               one sentence, maybe a label
//   BackgroundInstance         sentence + its background set
//   LabeledBackgroundInstance  background set + which of its
//                              sentences are the CORRECT ones
//                              (supervision for attention
//                              pretraining, not an answer label)
//
// Plus the padding rules that turn word indices into the
// fixed-shape arrays the batchers expect:
//
//   - word sequences pad on the LEFT and truncate keeping the
//     TAIL, so the final position always holds a real word
//   - background sets keep their FIRST rows and pad with
//     all-zero rows at the end
//
// Attention targets are distributions over the merged sequence
// layout: slot 0 is the question, slot i+1 is background
// sentence i. That layout must match the model's merge stage
// exactly or the loss compares the wrong slots.

use crate::data::indexer::DataIndexer;
use crate::data::tokenizer::WordTokenizer;

// ─── TextInstance ─────────────────────────────────────────────────────────────

/// One line of a training file: a sentence with an optional
/// true/false label and an optional instance index.
#[derive(Debug, Clone, PartialEq)]
pub struct TextInstance {
    pub text:  String,
    pub label: Option<bool>,
    pub index: Option<usize>,
}

impl TextInstance {
    pub fn new(text: impl Into<String>, label: Option<bool>, index: Option<usize>) -> Self {
        Self { text: text.into(), label, index }
    }

    /// Parse one tab-separated line. Three layouts are accepted:
    ///
    ///   "sentence"                    text only
    ///   "12<TAB>sentence"             index + text (first field numeric)
    ///   "sentence<TAB>1"              text + label (second field 0/1)
    ///   "12<TAB>sentence<TAB>0"       index + text + label
    ///
    /// Anything else is an error described by the returned message;
    /// the caller attaches the file path and line number.
    pub fn from_line(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.split('\t').collect();
        match fields.as_slice() {
            [text] => Ok(Self::new(*text, None, None)),
            [first, second] => {
                if first.chars().all(|c| c.is_ascii_digit()) && !first.is_empty() {
                    let index = first
                        .parse::<usize>()
                        .map_err(|_| format!("invalid instance index '{first}'"))?;
                    Ok(Self::new(*second, None, Some(index)))
                } else {
                    let label = parse_label(second)?;
                    Ok(Self::new(*first, Some(label), None))
                }
            }
            [first, text, label] => {
                let index = first
                    .parse::<usize>()
                    .map_err(|_| format!("invalid instance index '{first}'"))?;
                let label = parse_label(label)?;
                Ok(Self::new(*text, Some(label), Some(index)))
            }
            _ => Err(format!("expected 1 to 3 tab-separated fields, found {}", fields.len())),
        }
    }

    /// Word indices for this sentence, unpadded.
    pub fn index_words(&self, indexer: &DataIndexer, tokenizer: &WordTokenizer) -> Vec<usize> {
        tokenizer
            .words(&self.text)
            .iter()
            .map(|word| indexer.index_word(word))
            .collect()
    }
}

fn parse_label(field: &str) -> Result<bool, String> {
    match field {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(format!("label must be 0 or 1, found '{other}'")),
    }
}

// ─── BackgroundInstance ───────────────────────────────────────────────────────

/// A text instance joined with its background sentences.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundInstance {
    pub instance:   TextInstance,
    pub background: Vec<String>,
}

impl BackgroundInstance {
    pub fn new(instance: TextInstance, background: Vec<String>) -> Self {
        Self { instance, background }
    }

    pub fn text(&self) -> &str {
        &self.instance.text
    }
}

// ─── LabeledBackgroundInstance ────────────────────────────────────────────────

/// A background instance whose supervision is WHICH background
/// sentences are relevant, given as 0-based indices into the
/// background list. Used only by attention pretraining.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledBackgroundInstance {
    pub instance:        BackgroundInstance,
    pub correct_indices: Vec<usize>,
}

impl LabeledBackgroundInstance {
    pub fn new(instance: BackgroundInstance, correct_indices: Vec<usize>) -> Self {
        Self { instance, correct_indices }
    }

    pub fn text(&self) -> &str {
        self.instance.text()
    }

    pub fn background(&self) -> &[String] {
        &self.instance.background
    }
}

// ─── Padding ──────────────────────────────────────────────────────────────────

/// Pad `indices` on the left with [PAD] (0), or truncate keeping
/// the tail, so the result has exactly `length` positions.
pub fn pad_word_sequence(indices: Vec<usize>, length: usize) -> Vec<usize> {
    if indices.len() >= length {
        indices[indices.len() - length..].to_vec()
    } else {
        let mut padded = vec![0usize; length - indices.len()];
        padded.extend(indices);
        padded
    }
}

/// Fix a background set to exactly `background_length` rows of
/// `sentence_length` indices each: keep the first rows, pad each
/// row like a word sequence, append all-zero rows as needed.
pub fn pad_background(
    rows:              Vec<Vec<usize>>,
    background_length: usize,
    sentence_length:   usize,
) -> Vec<Vec<usize>> {
    let mut rows: Vec<Vec<usize>> = rows
        .into_iter()
        .take(background_length)
        .map(|row| pad_word_sequence(row, sentence_length))
        .collect();
    while rows.len() < background_length {
        rows.push(vec![0usize; sentence_length]);
    }
    rows
}

/// Build the target attention distribution for a merged sequence
/// of `background_length + 1` slots (question first).
///
/// Each correct background index i that survives truncation to
/// `background_length` receives equal mass at slot i + 1. If
/// truncation removed every correct sentence the mass goes to the
/// question slot instead, keeping the row a valid distribution.
pub fn attention_label(correct_indices: &[usize], background_length: usize) -> Vec<f32> {
    let surviving: Vec<usize> = correct_indices
        .iter()
        .copied()
        .filter(|&index| index < background_length)
        .collect();

    let mut label = vec![0.0f32; background_length + 1];
    if surviving.is_empty() {
        if !correct_indices.is_empty() {
            tracing::warn!(
                "all {} correct background sentences fell outside the first {}; \
                 assigning attention mass to the question slot",
                correct_indices.len(),
                background_length,
            );
        }
        label[0] = 1.0;
    } else {
        let mass = 1.0 / surviving.len() as f32;
        for index in surviving {
            label[index + 1] = mass;
        }
    }
    label
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_line_text_only() {
        let inst = TextInstance::from_line("cats chase mice").unwrap();
        assert_eq!(inst.text, "cats chase mice");
        assert_eq!(inst.label, None);
        assert_eq!(inst.index, None);
    }

    #[test]
    fn test_from_line_index_and_text() {
        let inst = TextInstance::from_line("7\tcats chase mice").unwrap();
        assert_eq!(inst.index, Some(7));
        assert_eq!(inst.label, None);
    }

    #[test]
    fn test_from_line_text_and_label() {
        let inst = TextInstance::from_line("cats chase mice\t1").unwrap();
        assert_eq!(inst.label, Some(true));
        assert_eq!(inst.index, None);
    }

    #[test]
    fn test_from_line_full() {
        let inst = TextInstance::from_line("3\tcats chase mice\t0").unwrap();
        assert_eq!(inst.index, Some(3));
        assert_eq!(inst.label, Some(false));
        assert_eq!(inst.text, "cats chase mice");
    }

    #[test]
    fn test_from_line_rejects_bad_label() {
        assert!(TextInstance::from_line("1\tsentence\tmaybe").is_err());
        assert!(TextInstance::from_line("sentence\t2").is_err());
    }

    #[test]
    fn test_from_line_rejects_too_many_fields() {
        assert!(TextInstance::from_line("1\ta\t0\textra").is_err());
    }

    #[test]
    fn test_pad_word_sequence_pads_left() {
        assert_eq!(pad_word_sequence(vec![4, 5], 5), vec![0, 0, 0, 4, 5]);
    }

    #[test]
    fn test_pad_word_sequence_truncates_keeping_tail() {
        assert_eq!(pad_word_sequence(vec![2, 3, 4, 5], 2), vec![4, 5]);
    }

    #[test]
    fn test_pad_word_sequence_exact_length() {
        assert_eq!(pad_word_sequence(vec![8, 9], 2), vec![8, 9]);
    }

    #[test]
    fn test_pad_background_pads_rows_and_count() {
        let rows = pad_background(vec![vec![4], vec![5, 6]], 3, 2);
        assert_eq!(rows, vec![vec![0, 4], vec![5, 6], vec![0, 0]]);
    }

    #[test]
    fn test_pad_background_truncates_keeping_first() {
        let rows = pad_background(vec![vec![1], vec![2], vec![3]], 2, 1);
        assert_eq!(rows, vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_attention_label_layout_and_mass() {
        // Correct sentences 0 and 2 of a 4-slot background:
        // slot 0 (question) empty, slots 1 and 3 share the mass.
        let label = attention_label(&[0, 2], 4);
        assert_eq!(label.len(), 5);
        assert_eq!(label[0], 0.0);
        assert_eq!(label[1], 0.5);
        assert_eq!(label[2], 0.0);
        assert_eq!(label[3], 0.5);
        assert!((label.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_attention_label_renormalises_after_truncation() {
        // Index 5 does not survive truncation to 3 background rows;
        // the remaining correct sentence carries all the mass.
        let label = attention_label(&[1, 5], 3);
        assert_eq!(label, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_attention_label_falls_back_to_question_slot() {
        let label = attention_label(&[7, 9], 3);
        assert_eq!(label[0], 1.0);
        assert!((label.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_attention_label_no_correct_indices() {
        // An instance with no relevant background still gets a valid
        // distribution pointing at the question slot.
        let label = attention_label(&[], 2);
        assert_eq!(label, vec![1.0, 0.0, 0.0]);
    }
}
