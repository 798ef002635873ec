use std::cmp::Ordering;

use core_types::{OBJECTIVE_COUNT, ObjectiveVector, StateId};

use crate::engine::statistics::{compute_mean, compute_std, median};

/// `a` is no worse than `b` everywhere and strictly better somewhere, after
/// orienting every objective so that larger is better.
pub fn dominates(a: &ObjectiveVector, b: &ObjectiveVector) -> bool {
    let oa = a.oriented();
    let ob = b.oriented();
    let all_ge = oa.iter().zip(ob.iter()).all(|(x, y)| x >= y);
    let one_gt = oa.iter().zip(ob.iter()).any(|(x, y)| x > y);
    all_ge && one_gt
}

/// Non-dominated sorting by iterative peeling. Rank 0 is the first front.
pub fn pareto_ranks(vectors: &[ObjectiveVector]) -> Vec<usize> {
    let n = vectors.len();
    let mut ranks = vec![usize::MAX; n];
    let mut remaining: Vec<usize> = (0..n).collect();
    let mut rank = 0usize;
    while !remaining.is_empty() {
        let front: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| {
                !remaining
                    .iter()
                    .any(|&j| j != i && dominates(&vectors[j], &vectors[i]))
            })
            .collect();
        if front.is_empty() {
            break;
        }
        for &i in &front {
            ranks[i] = rank;
        }
        remaining.retain(|i| ranks[*i] == usize::MAX);
        rank += 1;
    }
    ranks
}

/// Sort key for the ranked pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankKey {
    pub rank: usize,
    pub total_score: f64,
    pub structural_quality: f64,
    pub id: StateId,
}

/// Rank ascending, total score descending, structural quality descending
/// (only inside ranks at or below `threshold`), id ascending.
pub fn compare_rank_keys(a: &RankKey, b: &RankKey, threshold: usize) -> Ordering {
    a.rank
        .cmp(&b.rank)
        .then_with(|| b.total_score.total_cmp(&a.total_score))
        .then_with(|| {
            if a.rank <= threshold && b.rank <= threshold {
                b.structural_quality.total_cmp(&a.structural_quality)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.id.cmp(&b.id))
}

/// Indices of `keys` in total order.
pub fn rank_order(keys: &[RankKey], threshold: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&l, &r| compare_rank_keys(&keys[l], &keys[r], threshold));
    order
}

/// Euclidean distance over scaled objectives divided by `sqrt(5)`.
pub fn scaled_distance(a: &ObjectiveVector, b: &ObjectiveVector) -> f64 {
    let x = a.to_array();
    let y = b.to_array();
    let s: f64 = x.iter().zip(y.iter()).map(|(p, q)| (p - q).powi(2)).sum();
    (s / OBJECTIVE_COUNT as f64).sqrt()
}

pub fn nn_distances(vs: &[ObjectiveVector]) -> Vec<f64> {
    if vs.len() < 2 {
        return Vec::new();
    }
    let mut nn = Vec::with_capacity(vs.len());
    for (i, v) in vs.iter().enumerate() {
        let mut best = f64::INFINITY;
        for (j, u) in vs.iter().enumerate() {
            if i == j {
                continue;
            }
            best = best.min(scaled_distance(v, u));
        }
        if best.is_finite() {
            nn.push(best);
        }
    }
    nn
}

pub fn mean_nn_dist(vs: &[ObjectiveVector]) -> f64 {
    compute_mean(&nn_distances(vs))
}

pub fn median_nn_dist(vs: &[ObjectiveVector]) -> f64 {
    median(nn_distances(vs))
}

/// Sample standard deviation of nearest-neighbour distances.
pub fn spacing(vs: &[ObjectiveVector]) -> f64 {
    let nn = nn_distances(vs);
    compute_std(&nn, compute_mean(&nn))
}

fn hv_2d_rect_approx(points: &[(f64, f64)]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let mut xs = vec![0.0f64];
    for (x, _) in points {
        xs.push(x.clamp(0.0, 1.0));
    }
    xs.sort_by(f64::total_cmp);
    xs.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

    let mut area = 0.0;
    for w in xs.windows(2) {
        let left = w[0];
        let right = w[1];
        if right <= left {
            continue;
        }
        let mid = (left + right) * 0.5;
        let max_y = points
            .iter()
            .filter(|(x, _)| x.clamp(0.0, 1.0) >= mid)
            .map(|(_, y)| y.clamp(0.0, 1.0))
            .fold(0.0f64, f64::max);
        area += (right - left) * max_y;
    }
    area.clamp(0.0, 1.0)
}

fn rescale_for_hv(vs: &[ObjectiveVector]) -> Vec<[f64; OBJECTIVE_COUNT]> {
    let eps = 1e-6;
    let oriented: Vec<[f64; OBJECTIVE_COUNT]> = vs.iter().map(|v| v.oriented()).collect();
    let mut minv = [f64::INFINITY; OBJECTIVE_COUNT];
    let mut maxv = [f64::NEG_INFINITY; OBJECTIVE_COUNT];
    for v in &oriented {
        for i in 0..OBJECTIVE_COUNT {
            minv[i] = minv[i].min(v[i]);
            maxv[i] = maxv[i].max(v[i]);
        }
    }
    oriented
        .iter()
        .map(|v| {
            let mut out = [0.0; OBJECTIVE_COUNT];
            for i in 0..OBJECTIVE_COUNT {
                out[i] = ((v[i] - minv[i]) / (maxv[i] - minv[i] + eps)).clamp(0.0, 1.0);
            }
            out
        })
        .collect()
}

/// Mean rectangle-union area over (Performance, -Cost) and
/// (Reliability, -Structure), after min-max rescaling into the unit square.
pub fn hv_2d(vs: &[ObjectiveVector]) -> f64 {
    if vs.is_empty() {
        return 0.0;
    }
    let scaled = rescale_for_hv(vs);
    let perf_cost: Vec<(f64, f64)> = scaled.iter().map(|v| (v[1], v[0])).collect();
    let rel_struct: Vec<(f64, f64)> = scaled.iter().map(|v| (v[2], v[3])).collect();
    (hv_2d_rect_approx(&perf_cost) + hv_2d_rect_approx(&rel_struct)) * 0.5
}
