// ============================================================
// Layer 2 — Score Use Case
// ============================================================
// Loads a trained solver from its checkpoint directory and
// scores sentences from a file. Printing belongs to Layer 1;
// this layer only returns the verdicts.

use std::path::Path;

use anyhow::{bail, Result};

use crate::data::dataset::{read_background, read_instances};
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::scorer::{Scorer, Verdict};
use crate::ml::trainer::SolverKind;

pub struct ScoreUseCase {
    scorer: Scorer,
}

impl ScoreUseCase {
    pub fn new(checkpoint_dir: String) -> Result<Self> {
        let scorer = Scorer::from_checkpoint(
            &CheckpointManager::new(checkpoint_dir.clone()),
            &VocabStore::new(checkpoint_dir),
        )?;
        Ok(Self { scorer })
    }

    /// Score one sentence directly.
    pub fn score_sentence(&self, sentence: &str, background: &[String]) -> Result<Verdict> {
        self.scorer.score(sentence, background)
    }

    /// Score every instance in a file. The memory network solver
    /// needs the matching background file; the true/false solver
    /// ignores one if given.
    pub fn score_file(
        &self,
        input_file:      &str,
        background_file: Option<&str>,
    ) -> Result<Vec<(String, Verdict)>> {
        let instances = read_instances(Path::new(input_file))?;
        tracing::info!("Scoring {} instances from '{}'", instances.len(), input_file);

        let mut results = Vec::with_capacity(instances.len());
        match (self.scorer.kind(), background_file) {
            (SolverKind::MemoryNetwork, Some(background_path)) => {
                let joined = read_background(Path::new(background_path), instances)?;
                for item in joined {
                    let verdict = self.scorer.score(item.text(), &item.background)?;
                    results.push((item.instance.text, verdict));
                }
            }
            (SolverKind::MemoryNetwork, None) => {
                bail!("the memory_network solver needs --background-file to score");
            }
            (SolverKind::TrueFalse, _) => {
                for instance in instances {
                    let verdict = self.scorer.score(&instance.text, &[])?;
                    results.push((instance.text, verdict));
                }
            }
        }
        Ok(results)
    }
}
