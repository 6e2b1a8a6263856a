//! Human-assisted resolution of hospital names missing from the reference info.
//!
//! The core only lists what needs a decision and applies the answers; asking
//! is delegated to a [`DecisionProvider`], so the terminal prompt is one
//! implementation among others.

use std::cmp::Ordering;
use std::io::{BufRead, Write};

use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::model::{HospitalInfo, HospitalInfoTable, SeriesStore};

/// A reference name similar to an unresolved one.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    /// Jaro-Winkler similarity in `0.0..=1.0`.
    pub score: f64,
}

/// An observed hospital with no reference entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Unresolved {
    pub name: String,
    /// Best matches first.
    pub candidates: Vec<Candidate>,
}

/// What to do with an unresolved name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Add a blank reference entry for the name.
    AddToReference,
    /// Leave the reference untouched; the gap is reported.
    Skip,
}

/// Source of decisions for unresolved names.
pub trait DecisionProvider {
    fn decide(&mut self, unresolved: &Unresolved) -> Result<Decision>;
}

/// Answers "no" to everything. Used for unattended runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclineAll;

impl DecisionProvider for DeclineAll {
    fn decide(&mut self, _unresolved: &Unresolved) -> Result<Decision> {
        Ok(Decision::Skip)
    }
}

/// Answers "yes" to everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl DecisionProvider for AcceptAll {
    fn decide(&mut self, _unresolved: &Unresolved) -> Result<Decision> {
        Ok(Decision::AddToReference)
    }
}

/// Interactive provider printing candidates to `output` and reading a yes/no
/// answer per name from `input`. End of input counts as "no".
pub struct PromptDecider<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptDecider<R, W> {
    /// Prompts on `output` and reads answers from `input`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> DecisionProvider for PromptDecider<R, W> {
    fn decide(&mut self, unresolved: &Unresolved) -> Result<Decision> {
        writeln!(self.output, "'{}' is not in the hospital info.", unresolved.name)?;
        if unresolved.candidates.is_empty() {
            writeln!(self.output, "No similar names are known.")?;
        } else {
            writeln!(self.output, "Most similar known names:")?;
            for candidate in &unresolved.candidates {
                writeln!(self.output, "  {:.3}  {}", candidate.score, candidate.name)?;
            }
        }

        loop {
            write!(self.output, "Add it as a new blank entry? [y/n] ")?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                return Ok(Decision::Skip);
            }
            match answer.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(Decision::AddToReference),
                "n" | "no" => return Ok(Decision::Skip),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }
}

/// Names added to and skipped from the reference info.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
}

impl ReconcileOutcome {
    /// True when at least one entry was added.
    pub fn changed_reference(&self) -> bool {
        !self.added.is_empty()
    }
}

/// Ranks `known` names by similarity to `name`, best first.
pub fn rank_candidates<'a, I>(name: &str, known: I, top_k: usize) -> Vec<Candidate>
where
    I: IntoIterator<Item = &'a String>,
{
    let target = name.to_lowercase();
    let mut candidates: Vec<Candidate> = known
        .into_iter()
        .map(|known_name| Candidate {
            name: known_name.clone(),
            score: strsim::jaro_winkler(&target, &known_name.to_lowercase()),
        })
        .collect();

    candidates.sort_by(|lhs, rhs| {
        rhs.score
            .partial_cmp(&lhs.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| lhs.name.cmp(&rhs.name))
    });
    candidates.truncate(top_k);
    candidates
}

/// Lists the observed hospitals that have no reference entry, each with its
/// closest reference names.
pub fn unresolved_hospitals(
    store: &SeriesStore,
    info: &HospitalInfoTable,
    top_k: usize,
) -> Vec<Unresolved> {
    store
        .observed()
        .filter(|entity| !info.contains_key(&entity.name))
        .map(|entity| Unresolved {
            name: entity.name.clone(),
            candidates: rank_candidates(&entity.name, info.keys(), top_k),
        })
        .collect()
}

/// Asks `provider` about each unresolved name and applies the answers to
/// `info`.
#[instrument(level = "info", skip_all, fields(unresolved = unresolved.len()))]
pub fn reconcile(
    unresolved: &[Unresolved],
    info: &mut HospitalInfoTable,
    provider: &mut dyn DecisionProvider,
) -> Result<ReconcileOutcome> {
    let mut outcome = ReconcileOutcome::default();

    for entry in unresolved {
        match provider.decide(entry)? {
            Decision::AddToReference => {
                info!(hospital = %entry.name, "added blank reference entry");
                info.insert(entry.name.clone(), HospitalInfo::default());
                outcome.added.push(entry.name.clone());
            }
            Decision::Skip => {
                warn!(hospital = %entry.name, "left without reference entry");
                outcome.skipped.push(entry.name.clone());
            }
        }
    }

    Ok(outcome)
}
