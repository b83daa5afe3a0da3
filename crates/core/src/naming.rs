use crate::config::{NonSequentialPattern, RenameConfiguration};
use crate::enumerator::CandidateFile;
use crate::sanitize::normalize_basename;
use chrono::{DateTime, Local};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

const DATE_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Per-run naming state. Build a fresh one for every plan; names are only
/// unique within the context that produced them.
#[derive(Debug)]
pub struct NamingContext {
    rng: StdRng,
    run_started: DateTime<Local>,
    used_random_names: HashSet<String>,
    assigned_names: HashSet<String>,
}

impl Default for NamingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl NamingContext {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy(), Local::now())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), Local::now())
    }

    fn with_rng(rng: StdRng, run_started: DateTime<Local>) -> Self {
        Self {
            rng,
            run_started,
            used_random_names: HashSet::new(),
            assigned_names: HashSet::new(),
        }
    }

    pub fn with_run_started(mut self, at: DateTime<Local>) -> Self {
        self.run_started = at;
        self
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned_names.len()
    }

    fn random_stem(&mut self, length: usize) -> String {
        loop {
            let candidate: String = (&mut self.rng)
                .sample_iter(&Alphanumeric)
                .take(length)
                .map(char::from)
                .collect();
            if self.used_random_names.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    fn reserve(&mut self, stem: &str, extension: Option<&str>) -> String {
        let name = with_extension(stem, extension);
        if self.assigned_names.insert(name.clone()) {
            return name;
        }

        let mut n = 1usize;
        loop {
            let name = with_extension(&format!("{}_{:03}", stem, n), extension);
            if self.assigned_names.insert(name.clone()) {
                return name;
            }
            n += 1;
        }
    }
}

pub fn compute_name(
    file: &CandidateFile,
    index_in_order: usize,
    config: &RenameConfiguration,
    ctx: &mut NamingContext,
) -> String {
    let stem = if config.sequential_mode {
        sequential_stem(config, index_in_order)
    } else {
        match config.non_sequential_pattern {
            NonSequentialPattern::DateTime => {
                let at = file
                    .resolved_date
                    .map(|resolved| resolved.at)
                    .unwrap_or(ctx.run_started);
                at.format(DATE_TIME_FORMAT).to_string()
            }
            NonSequentialPattern::Random => ctx.random_stem(config.random_name_length),
        }
    };

    let extension = file.extension();
    ctx.reserve(&stem, extension.as_deref())
}

pub fn sequence_number(config: &RenameConfiguration, index_in_order: usize) -> u64 {
    config.start_number.saturating_add(index_in_order as u64)
}

fn sequential_stem(config: &RenameConfiguration, index_in_order: usize) -> String {
    format!(
        "{}{:0width$}",
        normalize_basename(&config.basename),
        sequence_number(config, index_in_order),
        width = config.number_padding as usize
    )
}

fn with_extension(stem: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}
