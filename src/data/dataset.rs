// ============================================================
// Layer 4 — Datasets and File Readers
// ============================================================
// Reads the three tab-separated file formats and exposes the
// resulting samples through Burn's Dataset trait:
//
//   train file               "index<TAB>sentence<TAB>label"
//                            (shorter layouts tolerated, see
//                            TextInstance::from_line)
//   background file          "index<TAB>bg1<TAB>bg2..."
//   labeled background file  "index<TAB>0,2<TAB>bg1<TAB>bg2..."
//                            second field = comma-separated
//                            indices of the CORRECT sentences
//
// Background files join to instances by index, strictly in both
// directions: an instance with no background entry, or an entry
// matching no instance, is a DataFormat error. The joined result
// preserves instance order; nothing is shuffled or filtered here.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use burn::data::dataset::Dataset;

use crate::data::indexer::DataIndexer;
use crate::data::instance::{
    attention_label, pad_background, pad_word_sequence, BackgroundInstance,
    LabeledBackgroundInstance, TextInstance,
};
use crate::data::tokenizer::WordTokenizer;
use crate::domain::error::{SolverError, SolverResult};
use crate::domain::max_lengths::MaxLengths;

// ─── File readers ─────────────────────────────────────────────────────────────

/// Read a train file into instances, one per non-empty line.
pub fn read_instances(path: &Path) -> SolverResult<Vec<TextInstance>> {
    let content = fs::read_to_string(path)?;
    let mut instances = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let instance = TextInstance::from_line(line).map_err(|detail| {
            SolverError::data_format(path, format!("line {}: {}", number + 1, detail))
        })?;
        instances.push(instance);
    }
    tracing::debug!("Read {} instances from '{}'", instances.len(), path.display());
    Ok(instances)
}

/// Join instances with a background file: "index<TAB>bg1<TAB>bg2...".
pub fn read_background(
    path:      &Path,
    instances: Vec<TextInstance>,
) -> SolverResult<Vec<BackgroundInstance>> {
    let mut by_index: HashMap<usize, Vec<String>> = HashMap::new();
    for (number, fields) in background_lines(path)? {
        let index = parse_line_index(path, number, &fields)?;
        let background: Vec<String> = fields[1..].iter().map(|f| f.to_string()).collect();
        if background.is_empty() {
            return Err(SolverError::data_format(
                path,
                format!("line {number}: background entry {index} has no sentences"),
            ));
        }
        insert_unique(path, number, &mut by_index, index, background)?;
    }
    join_by_index(path, instances, by_index, BackgroundInstance::new)
}

/// Join instances with a labeled background file:
/// "index<TAB>0,2<TAB>bg1<TAB>bg2...". The label field names the
/// correct background sentences; it is supervision for attention,
/// not an answer label.
pub fn read_labeled_background(
    path:      &Path,
    instances: Vec<TextInstance>,
) -> SolverResult<Vec<LabeledBackgroundInstance>> {
    let mut by_index: HashMap<usize, (Vec<usize>, Vec<String>)> = HashMap::new();
    for (number, fields) in background_lines(path)? {
        let index = parse_line_index(path, number, &fields)?;
        if fields.len() < 3 {
            return Err(SolverError::data_format(
                path,
                format!("line {number}: expected index, label, and background sentences"),
            ));
        }
        let correct = parse_correct_indices(path, number, &fields[1])?;
        let background: Vec<String> = fields[2..].iter().map(|f| f.to_string()).collect();
        insert_unique(path, number, &mut by_index, index, (correct, background))?;
    }
    join_by_index(path, instances, by_index, |instance, (correct, background)| {
        LabeledBackgroundInstance::new(BackgroundInstance::new(instance, background), correct)
    })
}

fn background_lines(path: &Path) -> SolverResult<Vec<(usize, Vec<String>)>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            let fields = line.split('\t').map(|f| f.to_string()).collect();
            (number + 1, fields)
        })
        .collect())
}

fn parse_line_index(path: &Path, number: usize, fields: &[String]) -> SolverResult<usize> {
    let first = fields.first().map(|f| f.as_str()).unwrap_or("");
    first.parse::<usize>().map_err(|_| {
        SolverError::data_format(path, format!("line {number}: invalid instance index '{first}'"))
    })
}

fn parse_correct_indices(path: &Path, number: usize, field: &str) -> SolverResult<Vec<usize>> {
    field
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.trim().parse::<usize>().map_err(|_| {
                SolverError::data_format(
                    path,
                    format!("line {number}: invalid correct-sentence index '{part}'"),
                )
            })
        })
        .collect()
}

fn insert_unique<T>(
    path:     &Path,
    number:   usize,
    by_index: &mut HashMap<usize, T>,
    index:    usize,
    payload:  T,
) -> SolverResult<()> {
    if by_index.insert(index, payload).is_some() {
        return Err(SolverError::data_format(
            path,
            format!("line {number}: duplicate background entry for instance {index}"),
        ));
    }
    Ok(())
}

/// Pair every instance with its background payload, in instance
/// order, failing on a missing or stray entry.
fn join_by_index<T, R>(
    path:      &Path,
    instances: Vec<TextInstance>,
    mut by_index: HashMap<usize, T>,
    build:     impl Fn(TextInstance, T) -> R,
) -> SolverResult<Vec<R>> {
    let mut joined = Vec::with_capacity(instances.len());
    for instance in instances {
        let index = instance.index.ok_or_else(|| {
            SolverError::data_format(path, "cannot join background: instance has no index")
        })?;
        let payload = by_index.remove(&index).ok_or_else(|| {
            SolverError::data_format(path, format!("no background entry for instance {index}"))
        })?;
        joined.push(build(instance, payload));
    }
    if let Some(stray) = by_index.keys().next() {
        return Err(SolverError::data_format(
            path,
            format!("background entry {stray} matches no instance"),
        ));
    }
    Ok(joined)
}

// ─── Samples ──────────────────────────────────────────────────────────────────

/// One indexed and padded sentence with its true/false label.
#[derive(Debug, Clone)]
pub struct SentenceSample {
    pub tokens: Vec<usize>,
    pub label:  usize,
}

impl SentenceSample {
    /// Index and pad an instance. Fails with a description when the
    /// instance carries no label; the caller attaches the file path.
    pub fn from_instance(
        instance:  &TextInstance,
        indexer:   &DataIndexer,
        tokenizer: &WordTokenizer,
        lengths:   MaxLengths,
    ) -> Result<Self, String> {
        let label = instance
            .label
            .ok_or_else(|| "cannot train on an unlabeled instance".to_string())?;
        let tokens = pad_word_sequence(instance.index_words(indexer, tokenizer), lengths.sentence);
        Ok(Self { tokens, label: label as usize })
    }
}

/// One indexed question with its padded background set and label.
#[derive(Debug, Clone)]
pub struct MemorySample {
    pub question:   Vec<usize>,
    pub background: Vec<Vec<usize>>,
    pub label:      usize,
}

impl MemorySample {
    pub fn from_instance(
        instance:  &BackgroundInstance,
        indexer:   &DataIndexer,
        tokenizer: &WordTokenizer,
        lengths:   MaxLengths,
    ) -> Result<Self, String> {
        let label = instance
            .instance
            .label
            .ok_or_else(|| "cannot train on an unlabeled instance".to_string())?;
        let question =
            pad_word_sequence(instance.instance.index_words(indexer, tokenizer), lengths.sentence);
        let background = index_background(instance.background.as_slice(), indexer, tokenizer, lengths);
        Ok(Self { question, background, label: label as usize })
    }
}

/// One pretraining example: question, background set, and a target
/// attention distribution over background + 1 slots (question first).
#[derive(Debug, Clone)]
pub struct AttentionSample {
    pub question:   Vec<usize>,
    pub background: Vec<Vec<usize>>,
    pub target:     Vec<f32>,
}

impl AttentionSample {
    pub fn from_instance(
        instance:  &LabeledBackgroundInstance,
        indexer:   &DataIndexer,
        tokenizer: &WordTokenizer,
        lengths:   MaxLengths,
    ) -> Self {
        let question = pad_word_sequence(
            instance.instance.instance.index_words(indexer, tokenizer),
            lengths.sentence,
        );
        let background = index_background(instance.background(), indexer, tokenizer, lengths);
        let target = attention_label(&instance.correct_indices, lengths.background);
        Self { question, background, target }
    }
}

fn index_background(
    sentences: &[String],
    indexer:   &DataIndexer,
    tokenizer: &WordTokenizer,
    lengths:   MaxLengths,
) -> Vec<Vec<usize>> {
    let rows: Vec<Vec<usize>> = sentences
        .iter()
        .map(|sentence| {
            tokenizer
                .words(sentence)
                .iter()
                .map(|word| indexer.index_word(word))
                .collect()
        })
        .collect();
    pad_background(rows, lengths.background, lengths.sentence)
}

// ─── Burn Dataset impls ───────────────────────────────────────────────────────

pub struct SentenceDataset {
    samples: Vec<SentenceSample>,
}

impl SentenceDataset {
    pub fn new(samples: Vec<SentenceSample>) -> Self {
        Self { samples }
    }
}

impl Dataset<SentenceSample> for SentenceDataset {
    fn get(&self, index: usize) -> Option<SentenceSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

pub struct MemoryDataset {
    samples: Vec<MemorySample>,
}

impl MemoryDataset {
    pub fn new(samples: Vec<MemorySample>) -> Self {
        Self { samples }
    }
}

impl Dataset<MemorySample> for MemoryDataset {
    fn get(&self, index: usize) -> Option<MemorySample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

pub struct AttentionDataset {
    samples: Vec<AttentionSample>,
}

impl AttentionDataset {
    pub fn new(samples: Vec<AttentionSample>) -> Self {
        Self { samples }
    }
}

impl Dataset<AttentionSample> for AttentionDataset {
    fn get(&self, index: usize) -> Option<AttentionSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{content}").unwrap();
        path
    }

    #[test]
    fn test_read_instances_all_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "train.tsv",
            "1\tcats chase mice\t1\n\ndogs bark\t0\nplain sentence\n",
        );
        let instances = read_instances(&path).unwrap();
        assert_eq!(instances.len(), 3);
        assert_eq!(instances[0].index, Some(1));
        assert_eq!(instances[0].label, Some(true));
        assert_eq!(instances[1].label, Some(false));
        assert_eq!(instances[2].label, None);
    }

    #[test]
    fn test_read_instances_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "train.tsv", "good\t1\nbad\t7\n");
        let err = read_instances(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_read_background_joins_in_instance_order() {
        let dir = tempfile::tempdir().unwrap();
        let train = write_file(&dir, "train.tsv", "1\tfirst\t1\n2\tsecond\t0\n");
        // Background lines deliberately out of order.
        let background = write_file(&dir, "bg.tsv", "2\tbg two\n1\tbg one a\tbg one b\n");

        let instances = read_instances(&train).unwrap();
        let joined = read_background(&background, instances).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].text(), "first");
        assert_eq!(joined[0].background, vec!["bg one a", "bg one b"]);
        assert_eq!(joined[1].background, vec!["bg two"]);
    }

    #[test]
    fn test_read_background_missing_entry_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let train = write_file(&dir, "train.tsv", "1\tfirst\t1\n2\tsecond\t0\n");
        let background = write_file(&dir, "bg.tsv", "1\tbg one\n");
        let err = read_background(&background, read_instances(&train).unwrap()).unwrap_err();
        assert!(matches!(err, SolverError::DataFormat { .. }));
    }

    #[test]
    fn test_read_background_stray_entry_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let train = write_file(&dir, "train.tsv", "1\tfirst\t1\n");
        let background = write_file(&dir, "bg.tsv", "1\tbg one\n9\tstray\n");
        let err = read_background(&background, read_instances(&train).unwrap()).unwrap_err();
        assert!(err.to_string().contains("matches no instance"));
    }

    #[test]
    fn test_read_background_duplicate_entry_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let train = write_file(&dir, "train.tsv", "1\tfirst\t1\n");
        let background = write_file(&dir, "bg.tsv", "1\tbg a\n1\tbg b\n");
        let err = read_background(&background, read_instances(&train).unwrap()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_read_labeled_background_parses_correct_indices() {
        let dir = tempfile::tempdir().unwrap();
        let train = write_file(&dir, "train.tsv", "1\tquestion one\t1\n");
        let labeled = write_file(&dir, "lbg.tsv", "1\t0,2\tbg a\tbg b\tbg c\n");
        let joined = read_labeled_background(&labeled, read_instances(&train).unwrap()).unwrap();
        assert_eq!(joined[0].correct_indices, vec![0, 2]);
        assert_eq!(joined[0].background().len(), 3);
    }

    #[test]
    fn test_read_labeled_background_requires_label_field() {
        let dir = tempfile::tempdir().unwrap();
        let train = write_file(&dir, "train.tsv", "1\tquestion one\t1\n");
        let labeled = write_file(&dir, "lbg.tsv", "1\tbg only\n");
        assert!(read_labeled_background(&labeled, read_instances(&train).unwrap()).is_err());
    }

    #[test]
    fn test_sentence_sample_requires_label() {
        let indexer = DataIndexer::new();
        let tokenizer = WordTokenizer::new();
        let instance = TextInstance::new("no label here", None, None);
        let result =
            SentenceSample::from_instance(&instance, &indexer, &tokenizer, MaxLengths::new(4, 2));
        assert!(result.is_err());
    }

    #[test]
    fn test_attention_sample_shapes() {
        let mut indexer = DataIndexer::new();
        let tokenizer = WordTokenizer::new();
        indexer.fit_word_dictionary(
            &["cats chase mice".to_string(), "dogs bark".to_string()],
            1,
            &tokenizer,
        );
        let instance = LabeledBackgroundInstance::new(
            BackgroundInstance::new(
                TextInstance::new("cats chase mice", None, Some(1)),
                vec!["dogs bark".to_string(), "cats nap".to_string()],
            ),
            vec![1],
        );
        let lengths = MaxLengths::new(4, 3);
        let sample = AttentionSample::from_instance(&instance, &indexer, &tokenizer, lengths);
        assert_eq!(sample.question.len(), 4);
        assert_eq!(sample.background.len(), 3);
        assert_eq!(sample.background[0].len(), 4);
        assert_eq!(sample.target.len(), 4);
        assert_eq!(sample.target[2], 1.0);
    }

    #[test]
    fn test_dataset_preserves_order() {
        let samples = vec![
            SentenceSample { tokens: vec![1], label: 0 },
            SentenceSample { tokens: vec![2], label: 1 },
        ];
        let dataset = SentenceDataset::new(samples);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(0).unwrap().tokens, vec![1]);
        assert_eq!(dataset.get(1).unwrap().tokens, vec![2]);
        assert!(dataset.get(2).is_none());
    }
}
