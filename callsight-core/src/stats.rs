//! Historical satisfaction aggregates shown next to a prediction.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dataset::{Dataset, MAX_RATING};

pub const SPEED_HISTOGRAM_BINS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingCount {
    pub rating: u8,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub name: String,
    pub mean_rating: f64,
    pub sessions: usize,
}

/// Five-number summary of ratings for one agent/topic pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSpread {
    pub agent: String,
    pub topic: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatisfactionSummary {
    pub rating_counts: Vec<RatingCount>,
    pub by_agent: Vec<GroupMean>,
    pub by_topic: Vec<GroupMean>,
    pub spread: Vec<RatingSpread>,
    pub speed_histogram: Vec<HistogramBin>,
}

/// Aggregate the whole table. Unrated sessions count as rating 0, the same
/// way they are stored.
pub fn summarize(dataset: &Dataset) -> SatisfactionSummary {
    let records = dataset.table.records();

    let mut counts = [0usize; MAX_RATING as usize + 1];
    let mut by_agent: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    let mut by_topic: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    let mut by_pair: BTreeMap<(u32, u32), Vec<f64>> = BTreeMap::new();

    for r in records {
        let rating = r.satisfaction_rating.min(MAX_RATING);
        counts[rating as usize] += 1;
        let rating = rating as f64;
        by_agent.entry(r.agent).or_default().push(rating);
        by_topic.entry(r.topic).or_default().push(rating);
        by_pair.entry((r.agent, r.topic)).or_default().push(rating);
    }

    let name = |enc: &crate::LabelEncoder, id: u32| {
        enc.inverse_transform(id)
            .map(str::to_string)
            .unwrap_or_else(|_| id.to_string())
    };

    let means = |groups: BTreeMap<u32, Vec<f64>>, enc: &crate::LabelEncoder| -> Vec<GroupMean> {
        groups
            .into_iter()
            .map(|(id, ratings)| GroupMean {
                name: name(enc, id),
                mean_rating: ratings.iter().sum::<f64>() / ratings.len() as f64,
                sessions: ratings.len(),
            })
            .collect()
    };

    let spread = by_pair
        .into_iter()
        .map(|((agent, topic), mut ratings)| {
            ratings.sort_by(f64::total_cmp);
            RatingSpread {
                agent: name(&dataset.agents, agent),
                topic: name(&dataset.topics, topic),
                min: ratings[0],
                q1: quantile(&ratings, 0.25),
                median: quantile(&ratings, 0.5),
                q3: quantile(&ratings, 0.75),
                max: ratings[ratings.len() - 1],
                sessions: ratings.len(),
            }
        })
        .collect();

    let speeds: Vec<f64> = records
        .iter()
        .filter_map(|r| r.speed_of_answer.map(f64::from))
        .collect();

    SatisfactionSummary {
        rating_counts: counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(rating, count)| RatingCount {
                rating: rating as u8,
                count: *count,
            })
            .collect(),
        by_agent: means(by_agent, &dataset.agents),
        by_topic: means(by_topic, &dataset.topics),
        spread,
        speed_histogram: histogram(&speeds, SPEED_HISTOGRAM_BINS),
    }
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Equal-width bins spanning min..=max. The last bin is closed on the right.
fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max == min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}
