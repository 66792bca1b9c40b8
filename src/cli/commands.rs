// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `score`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::ml::encoder::EncoderKind;
use crate::ml::selector::SelectorKind;
use crate::ml::trainer::SolverKind;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a solver on a sentence file (optionally with
    /// background knowledge and attention pretraining)
    Train(TrainArgs),

    /// Score sentences from a file using a trained checkpoint
    Score(ScoreArgs),
}

// ─── CLI-side enum mirrors ───────────────────────────────────────────────────
// clap's ValueEnum derive stays in this layer; the inner layers
// keep their own serde-only enums. Conversions live in From.

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SolverArg {
    TrueFalse,
    MemoryNetwork,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum EncoderArg {
    Bow,
    Lstm,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SelectorArg {
    DotProduct,
    Parameterized,
}

impl From<SolverArg> for SolverKind {
    fn from(a: SolverArg) -> Self {
        match a {
            SolverArg::TrueFalse     => SolverKind::TrueFalse,
            SolverArg::MemoryNetwork => SolverKind::MemoryNetwork,
        }
    }
}

impl From<EncoderArg> for EncoderKind {
    fn from(a: EncoderArg) -> Self {
        match a {
            EncoderArg::Bow  => EncoderKind::Bow,
            EncoderArg::Lstm => EncoderKind::Lstm,
        }
    }
}

impl From<SelectorArg> for SelectorKind {
    fn from(a: SelectorArg) -> Self {
        match a {
            SelectorArg::DotProduct    => SelectorKind::DotProduct,
            SelectorArg::Parameterized => SelectorKind::Parameterized,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Which solver to train
    #[arg(long, value_enum, default_value_t = SolverArg::TrueFalse)]
    pub solver: SolverArg,

    /// Tab-separated training sentences ("index<TAB>text<TAB>label")
    #[arg(long, default_value = "data/train.tsv")]
    pub train_file: String,

    /// Optional held-out validation sentences; without it the
    /// training file is split by --train-fraction
    #[arg(long)]
    pub validation_file: Option<String>,

    /// Background knowledge for the training sentences
    /// ("index<TAB>sentence<TAB>sentence..."), required by the
    /// memory_network solver
    #[arg(long)]
    pub background_file: Option<String>,

    /// Background knowledge for the validation sentences
    #[arg(long)]
    pub validation_background_file: Option<String>,

    /// Sentences for attention pretraining; enables the
    /// pretraining phase when set
    #[arg(long)]
    pub pretrain_file: Option<String>,

    /// Labeled background for attention pretraining
    /// ("index<TAB>correct,indices<TAB>sentence...")
    #[arg(long)]
    pub pretrain_background_file: Option<String>,

    /// Directory to save model checkpoints and the vocabulary
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Maximum words per sentence (longer ones keep their tail)
    #[arg(long, default_value_t = 50)]
    pub max_sentence_length: usize,

    /// Maximum background sentences kept per instance
    #[arg(long, default_value_t = 10)]
    pub max_knowledge_length: usize,

    /// Word embedding dimension
    #[arg(long, default_value_t = 50)]
    pub embedding_size: usize,

    /// Sentence encoder: bag-of-words mean or LSTM final state
    #[arg(long, value_enum, default_value_t = EncoderArg::Bow)]
    pub encoder: EncoderArg,

    /// LSTM hidden dimension (ignored by the bow encoder)
    #[arg(long, default_value_t = 50)]
    pub encoder_hidden_size: usize,

    /// How the knowledge selector scores background slots
    #[arg(long, value_enum, default_value_t = SelectorArg::DotProduct)]
    pub selector: SelectorArg,

    /// Hidden dimension of the parameterized selector
    #[arg(long, default_value_t = 50)]
    pub selector_hidden_size: usize,

    /// Replace the attention distribution with a one-hot argmax
    #[arg(long, default_value_t = false)]
    pub hard_selection: bool,

    /// Memory network hops (each hop attends and updates memory)
    #[arg(long, default_value_t = 1)]
    pub memory_hops: usize,

    /// Dropout probability — randomly zeroes activations during
    /// training to prevent overfitting
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// Number of samples processed together in one forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Number of passes over the attention pretraining data
    #[arg(long, default_value_t = 5)]
    pub pretrain_epochs: usize,

    /// How fast the model learns — too high causes instability,
    /// too low causes slow convergence
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Fraction of training data kept for training when no
    /// validation file is given
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Words seen fewer times than this map to the unknown token
    #[arg(long, default_value_t = 1)]
    pub min_word_count: usize,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            solver:                     a.solver.into(),
            train_file:                 a.train_file,
            validation_file:            a.validation_file,
            background_file:            a.background_file,
            validation_background_file: a.validation_background_file,
            pretrain_file:              a.pretrain_file,
            pretrain_background_file:   a.pretrain_background_file,
            checkpoint_dir:             a.checkpoint_dir,
            max_sentence_length:        a.max_sentence_length,
            max_knowledge_length:       a.max_knowledge_length,
            embedding_size:             a.embedding_size,
            encoder:                    a.encoder.into(),
            encoder_hidden_size:        a.encoder_hidden_size,
            selector:                   a.selector.into(),
            selector_hidden_size:       a.selector_hidden_size,
            hard_selection:             a.hard_selection,
            memory_hops:                a.memory_hops,
            dropout:                    a.dropout,
            batch_size:                 a.batch_size,
            epochs:                     a.epochs,
            pretrain_epochs:            a.pretrain_epochs,
            lr:                         a.lr,
            train_fraction:             a.train_fraction,
            min_word_count:             a.min_word_count,
        }
    }
}

/// All arguments for the `score` command
#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// One sentence to score directly
    #[arg(long, conflicts_with = "input_file")]
    pub sentence: Option<String>,

    /// Background sentences for --sentence (repeat the flag)
    #[arg(long = "background", requires = "sentence")]
    pub background: Vec<String>,

    /// Tab-separated sentences to score
    #[arg(long, required_unless_present = "sentence")]
    pub input_file: Option<String>,

    /// Background knowledge for the input sentences, required
    /// when the checkpoint holds a memory_network solver
    #[arg(long)]
    pub background_file: Option<String>,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}
