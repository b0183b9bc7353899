//! Index build pipeline
//!
//! `build_artifact` is the pure core: stored values in, artifact and score
//! write-backs out, no I/O. `execute_build` wraps it with the status walk
//! (`new -> dictionary -> indexing -> completed`, any failure -> `exit`),
//! the dictionary loading, the store reads and the registry publish.
//! Rebuilding with identical inputs and parameters yields identical scores.

use crate::index::artifact::{DocFields, IndexArtifact, IndexRegistry, Posting};
use crate::index::dictionary::SynonymMap;
use crate::index::formula::Expr;
use crate::index::qgram::QGramIndex;
use crate::index::tokenizer::{tokenize, TokenFilter};
use crate::index::IndexError;
use crate::state::IndexerStatus;
use crate::storage::{
    IndexerRecord, InspectorRecord, ScoreWriteBack, SqliteStorage, Storage, StoredValue,
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

/// Everything the pure build needs
#[derive(Debug)]
pub struct BuildInput {
    pub indexer: IndexerRecord,
    pub inspectors: Vec<InspectorRecord>,
    pub values: Vec<StoredValue>,
    pub synonyms: SynonymMap,
}

/// Builds an artifact from stored values
///
/// The values are expected sorted by (document id, inspector id), which is
/// how the store returns them; the ordering makes term-frequency
/// accumulation linear and the resulting scores deterministic.
///
/// # Returns
///
/// The artifact plus the per-value organic/boosted scores to write back
/// onto the store.
pub fn build_artifact(
    input: BuildInput,
) -> Result<(IndexArtifact, Vec<ScoreWriteBack>), IndexError> {
    let indexer = &input.indexer;
    let filter = TokenFilter::new(
        &indexer.skip_words,
        &indexer.weight_words,
        indexer.small_words_threshold,
    )?;

    let formula = match indexer.boosting_formula.as_deref() {
        Some(text) if !text.trim().is_empty() => match Expr::parse(text) {
            Ok(expr) => Some(expr),
            Err(e) => {
                tracing::warn!(
                    "Indexer {}: boosting formula ignored ({}), using organic scores",
                    indexer.id,
                    e
                );
                None
            }
        },
        _ => None,
    };

    let synonyms = input.synonyms;
    let canonical = |token: String| -> String {
        if indexer.use_synonyms {
            synonyms.canonicalize(&token)
        } else {
            token
        }
    };

    // First pass: term frequencies per (document, field) and document lengths
    let mut term_occurrences: BTreeMap<String, Vec<(i64, i64, u32)>> = BTreeMap::new();
    let mut doc_lengths: HashMap<i64, u64> = HashMap::new();
    let mut docs: BTreeMap<i64, DocFields> = BTreeMap::new();

    for stored in &input.values {
        let doc = docs.entry(stored.document_id).or_insert_with(|| DocFields {
            url: stored.url.clone(),
            values: Vec::new(),
        });
        doc.values.push((stored.inspector_id, stored.value.clone()));
        doc_lengths.entry(stored.document_id).or_insert(0);

        for token in tokenize(&stored.value) {
            if !filter.keep(&token) {
                continue;
            }
            let term = canonical(token);
            *doc_lengths.entry(stored.document_id).or_insert(0) += 1;

            let occurrences = term_occurrences.entry(term).or_default();
            match occurrences.last_mut() {
                Some(last)
                    if last.0 == stored.document_id && last.1 == stored.inspector_id =>
                {
                    last.2 += 1;
                }
                _ => occurrences.push((stored.document_id, stored.inspector_id, 1)),
            }
        }
    }

    let doc_count = docs.len() as f64;
    let total_length: u64 = doc_lengths.values().sum();
    let average_length = if doc_count > 0.0 && total_length > 0 {
        total_length as f64 / doc_count
    } else {
        1.0
    };

    // Second pass: replace term frequencies with BM25 scores
    //   score = tf * (k + 1) / (tf + k * (1 - b + b * dl / avdl)) * log2(N / df)
    // then apply the per-term weight multiplier.
    let k = indexer.k_parameter;
    let b = indexer.b_parameter;

    let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
    let mut qgrams = QGramIndex::new(indexer.q_gram_q);
    let mut term_df: Vec<u64> = Vec::new();
    let mut field_totals: HashMap<(i64, i64), f64> = HashMap::new();

    for (term, occurrences) in &term_occurrences {
        let mut df = 0u64;
        let mut last_doc = None;
        for (doc_id, _, _) in occurrences {
            if last_doc != Some(*doc_id) {
                df += 1;
                last_doc = Some(*doc_id);
            }
        }

        let idf = (doc_count / df as f64).log2();
        let weight = filter.weight(term);

        let mut scored = Vec::with_capacity(occurrences.len());
        for (doc_id, inspector_id, tf) in occurrences {
            let dl = *doc_lengths.get(doc_id).unwrap_or(&0) as f64;
            let alpha = 1.0 - b + b * dl / average_length;
            let tf = *tf as f64;
            let saturated = tf * (k + 1.0) / (tf + k * alpha);
            let score = saturated * idf * weight;

            scored.push(Posting {
                doc_id: *doc_id,
                inspector_id: *inspector_id,
                score,
            });
            *field_totals.entry((*doc_id, *inspector_id)).or_insert(0.0) += score;
        }

        qgrams.insert(term);
        term_df.push(df);
        postings.insert(term.clone(), scored);
    }

    // Per-document boosted scores from whole-field totals
    let variables: HashMap<i64, String> = input
        .inspectors
        .iter()
        .filter_map(|inspector| {
            inspector
                .variable_name
                .clone()
                .map(|name| (inspector.id, name))
        })
        .collect();

    let mut write_backs = Vec::new();
    for (&doc_id, fields) in &docs {
        let mut organic = 0.0;
        let mut bound: HashMap<String, f64> = HashMap::new();
        for (inspector_id, _) in &fields.values {
            let total = field_totals
                .get(&(doc_id, *inspector_id))
                .copied()
                .unwrap_or(0.0);
            organic += total;
            if let Some(name) = variables.get(inspector_id) {
                *bound.entry(name.clone()).or_insert(0.0) += total;
            }
        }

        let boosted = match &formula {
            Some(expr) => expr.eval(&bound),
            None => organic,
        };

        for (inspector_id, _) in &fields.values {
            write_backs.push(ScoreWriteBack {
                document_id: doc_id,
                inspector_id: *inspector_id,
                organic_score: field_totals
                    .get(&(doc_id, *inspector_id))
                    .copied()
                    .unwrap_or(0.0),
                boosted_score: boosted,
            });
        }
    }

    let mut headers: Vec<(i64, String)> = input
        .inspectors
        .iter()
        .map(|inspector| (inspector.id, inspector.name.clone()))
        .collect();
    headers.sort();

    let artifact = IndexArtifact {
        indexer_id: indexer.id,
        postings,
        qgrams,
        term_df,
        synonyms,
        use_synonyms: indexer.use_synonyms,
        filter,
        formula,
        variables,
        docs,
        headers,
    };

    Ok((artifact, write_backs))
}

/// Runs the full build pipeline for one indexer
///
/// Refuses to start while a runner feeding the chosen inspectors is still
/// running. On any failure after the build has started, the indexer lands
/// in `exit` with an error message and the previously published artifact
/// (if any) stays servable.
pub fn execute_build(
    storage: &Mutex<SqliteStorage>,
    registry: &IndexRegistry,
    dictionaries_dir: &Path,
    indexer_id: i64,
) -> Result<(), IndexError> {
    let indexer = storage.lock().unwrap().get_indexer(indexer_id)?;

    {
        let guard = storage.lock().unwrap();
        if guard.any_runner_running_for_inspectors(&indexer.inspector_ids)? {
            return Err(IndexError::BuildRefused(format!(
                "indexer {}: a runner feeding its inspectors is still running",
                indexer_id
            )));
        }
    }

    let fail = |message: &str| {
        if let Err(e) = storage.lock().unwrap().update_indexer_status(
            indexer_id,
            IndexerStatus::Exit,
            Some(message),
        ) {
            tracing::error!("Failed to record build failure for {}: {}", indexer_id, e);
        }
    };

    tracing::info!("Indexer {}: loading dictionaries", indexer_id);
    storage.lock().unwrap().update_indexer_status(
        indexer_id,
        IndexerStatus::Dictionary,
        None,
    )?;

    let synonyms = if indexer.use_synonyms {
        let Some(file) = indexer.dictionary_path.as_deref() else {
            fail("use_synonyms is set but no dictionary file is configured");
            return Err(IndexError::Dictionary(
                "no dictionary file configured".to_string(),
            ));
        };
        match SynonymMap::load(&dictionaries_dir.join(file)) {
            Ok(map) => map,
            Err(e) => {
                fail(&e.to_string());
                return Err(e);
            }
        }
    } else {
        SynonymMap::empty()
    };

    tracing::info!("Indexer {}: building", indexer_id);
    storage
        .lock()
        .unwrap()
        .update_indexer_status(indexer_id, IndexerStatus::Indexing, None)?;

    let (values, inspectors) = {
        let guard = storage.lock().unwrap();
        let values = match guard.list_values_by_inspectors(&indexer.inspector_ids) {
            Ok(values) => values,
            Err(e) => {
                drop(guard);
                fail(&e.to_string());
                return Err(e.into());
            }
        };
        let inspectors = match guard.list_inspectors_by_ids(&indexer.inspector_ids) {
            Ok(inspectors) => inspectors,
            Err(e) => {
                drop(guard);
                fail(&e.to_string());
                return Err(e.into());
            }
        };
        (values, inspectors)
    };

    let input = BuildInput {
        indexer,
        inspectors,
        values,
        synonyms,
    };
    let (artifact, write_backs) = match build_artifact(input) {
        Ok(result) => result,
        Err(e) => {
            fail(&e.to_string());
            return Err(e);
        }
    };

    if let Err(e) = storage.lock().unwrap().write_back_scores(&write_backs) {
        fail(&e.to_string());
        return Err(e.into());
    }

    let documents = artifact.doc_count();
    registry.publish(artifact);
    storage
        .lock()
        .unwrap()
        .update_indexer_status(indexer_id, IndexerStatus::Completed, None)?;
    tracing::info!(
        "Indexer {}: build completed over {} documents",
        indexer_id,
        documents
    );

    Ok(())
}
