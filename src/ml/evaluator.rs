// ============================================================
// Layer 5 — Offline Evaluator
// ============================================================
// Scores the serving path over a held-out population: every
// user with at least MIN_EVAL_EVENTS sequence-eligible events
// gets one input/target split, the recommender produces a
// top-K, and five closed-form metrics summarize the lists.
//
// All metrics land in [0,1]. Novelty approaches but never
// reaches 1 because of the Laplace smoothing.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use tracing::info;

use crate::data::dataset::EvalSample;
use crate::data::tags::{cosine_similarity, TagMatrix};
use crate::domain::activity::ActivityEvent;
use crate::ml::recommender::Recommender;

/// Users with fewer sequence-eligible events than this are
/// excluded from evaluation.
pub const MIN_EVAL_EVENTS: usize = 5;

const POPULARITY_EPS: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct EvalReport {
    pub users_evaluated: usize,

    /// Share of the catalog reached by at least one list.
    pub coverage: f64,

    /// Mean inverse smoothed popularity of recommended items.
    pub novelty: f64,

    /// Mean per-user tag dissimilarity within a list.
    pub diversity: f64,

    /// Mean across-user list dissimilarity (1 - Jaccard).
    pub personalization: f64,

    /// Share of recommendations that fall inside the top-N
    /// most tag-similar items to the user's held-out target.
    pub tag_hit_rate: f64,

    /// Mean tag similarity of that top-N neighborhood to the
    /// target, averaged over users. A diagnostic for how tight
    /// the content neighborhoods are, not a quality score.
    pub avg_target_similarity: f64,
}

impl EvalReport {
    pub fn print_summary(&self) {
        println!("Evaluated users:   {}", self.users_evaluated);
        println!("Coverage:          {:.4}", self.coverage);
        println!("Novelty:           {:.4}", self.novelty);
        println!("Diversity:         {:.4}", self.diversity);
        println!("Personalization:   {:.4}", self.personalization);
        println!("Tag hit rate:      {:.4}", self.tag_hit_rate);
        println!("Avg target sim:    {:.4}", self.avg_target_similarity);
    }
}

/// Run the serving path over every eligible held-out split and
/// compute the metric summary.
pub fn evaluate(
    recommender: &Recommender,
    samples: &[EvalSample],
    events: &[ActivityEvent],
    tags: &TagMatrix,
    k: usize,
    n: usize,
) -> Result<EvalReport> {
    let num_items = recommender.catalog().num_items();

    let mut lists: Vec<Vec<u32>> = Vec::new();
    let mut targets: Vec<u32> = Vec::new();
    for sample in samples {
        if sample.sequence_len < MIN_EVAL_EVENTS {
            continue;
        }
        let recs = recommender.rank(
            &sample.input_ids,
            &sample.positives,
            &sample.negatives,
            k,
        )?;
        if recs.is_empty() {
            continue;
        }
        lists.push(recs);
        targets.push(sample.target);
    }

    let users = lists.len();
    info!("Evaluating {} users (K={}, N={})", users, k, n);
    if users == 0 {
        return Ok(EvalReport {
            users_evaluated: 0,
            coverage: 0.0,
            novelty: 0.0,
            diversity: 0.0,
            personalization: 0.0,
            tag_hit_rate: 0.0,
            avg_target_similarity: 0.0,
        });
    }

    let (tag_hit_rate, avg_target_similarity) =
        tag_similarity_stats(&lists, &targets, tags, num_items, n);
    let report = EvalReport {
        users_evaluated: users,
        coverage: coverage(&lists, num_items),
        novelty: novelty(&lists, events, recommender, num_items),
        diversity: diversity(&lists, tags),
        personalization: personalization(&lists),
        tag_hit_rate,
        avg_target_similarity,
    };
    Ok(report)
}

/// |union of recommended items| / |catalog|.
fn coverage(lists: &[Vec<u32>], num_items: usize) -> f64 {
    let union: HashSet<u32> = lists.iter().flatten().copied().collect();
    union.len() as f64 / num_items as f64
}

/// Mean of (1 - popularity_fraction) over every recommended
/// item occurrence, with Laplace-smoothed popularity.
fn novelty(
    lists: &[Vec<u32>],
    events: &[ActivityEvent],
    recommender: &Recommender,
    num_items: usize,
) -> f64 {
    // Popularity counts only the behavioral sequence kinds;
    // skips and unlikes are not interactions.
    let mut counts: HashMap<u32, usize> = HashMap::new();
    let mut total = 0usize;
    for event in events {
        if !event.kind.is_sequence() {
            continue;
        }
        if let Some(index) = recommender.catalog().index_of(&event.track_id) {
            *counts.entry(index).or_default() += 1;
            total += 1;
        }
    }
    let denom = total as f64 + POPULARITY_EPS * num_items as f64;

    let mut sum = 0.0;
    let mut recommended = 0usize;
    for &item in lists.iter().flatten() {
        let count = counts.get(&item).copied().unwrap_or(0) as f64;
        sum += 1.0 - (count + POPULARITY_EPS) / denom;
        recommended += 1;
    }
    sum / recommended.max(1) as f64
}

/// Per-user 1 - mean pairwise tag cosine within the list,
/// averaged; single-item lists contribute 0.
fn diversity(lists: &[Vec<u32>], tags: &TagMatrix) -> f64 {
    let mut sum = 0.0;
    for list in lists {
        if list.len() < 2 {
            continue;
        }
        let mut pair_sum = 0.0f64;
        let mut pairs = 0usize;
        for i in 0..list.len() {
            for j in (i + 1)..list.len() {
                pair_sum += cosine_similarity(tags.row(list[i]), tags.row(list[j])) as f64;
                pairs += 1;
            }
        }
        sum += 1.0 - pair_sum / pairs as f64;
    }
    sum / lists.len() as f64
}

/// 1 - mean pairwise Jaccard similarity across user lists;
/// 0 with fewer than 2 users.
fn personalization(lists: &[Vec<u32>]) -> f64 {
    if lists.len() < 2 {
        return 0.0;
    }
    let sets: Vec<HashSet<u32>> = lists
        .iter()
        .map(|l| l.iter().copied().collect())
        .collect();

    let mut sum = 0.0f64;
    let mut pairs = 0usize;
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            let intersection = sets[i].intersection(&sets[j]).count() as f64;
            let union = sets[i].union(&sets[j]).count() as f64;
            sum += if union > 0.0 { intersection / union } else { 0.0 };
            pairs += 1;
        }
    }
    1.0 - sum / pairs as f64
}

/// Per user: share of recommendations inside the N catalog
/// items most tag-similar to the held-out target (the target
/// itself excluded), averaged; plus the mean similarity of that
/// neighborhood to the target as a diagnostic.
fn tag_similarity_stats(
    lists: &[Vec<u32>],
    targets: &[u32],
    tags: &TagMatrix,
    num_items: usize,
    n: usize,
) -> (f64, f64) {
    let mut hit_sum = 0.0f64;
    let mut sim_sum = 0.0f64;
    for (list, &target) in lists.iter().zip(targets) {
        let target_vec = tags.row(target);

        let mut ranked: Vec<u32> = (1..=num_items as u32).filter(|&i| i != target).collect();
        ranked.sort_by(|&a, &b| {
            let sa = cosine_similarity(tags.row(a), target_vec);
            let sb = cosine_similarity(tags.row(b), target_vec);
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(n);

        if !ranked.is_empty() {
            let total: f64 = ranked
                .iter()
                .map(|&i| cosine_similarity(tags.row(i), target_vec) as f64)
                .sum();
            sim_sum += total / ranked.len() as f64;
        }

        let neighborhood: HashSet<u32> = ranked.into_iter().collect();
        let matched = list.iter().filter(|i| neighborhood.contains(i)).count();
        hit_sum += matched as f64 / list.len() as f64;
    }
    let users = lists.len() as f64;
    (hit_sum / users, sim_sum / users)
}
