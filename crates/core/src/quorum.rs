use std::collections::HashMap;

/// How outputs are compared when votes are tallied. The default compares
/// the raw double bits; `decimals` quantizes outputs to a fixed number of
/// decimal places first, so numerically equal computations that differ in
/// the low bits can still vote together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VotePolicy {
    pub decimals: Option<u32>,
}

impl VotePolicy {
    fn ballot(&self, output: f64) -> f64 {
        match self.decimals {
            Some(d) => {
                let scale = 10f64.powi(d as i32);
                (output * scale).round() / scale
            }
            None => output,
        }
    }
}

/// Strict majority over the collected outputs: a value wins iff its
/// multiplicity is at least n/2 + 1 (integer division), where n is the
/// number of outputs on file. At most one value can satisfy that bound;
/// the winning ballot is returned when it exists.
pub fn majority(outputs: &[f64], policy: VotePolicy) -> Option<f64> {
    let threshold = outputs.len() / 2 + 1;
    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for &output in outputs {
        let ballot = policy.ballot(output);
        counts.entry(ballot.to_bits()).or_insert((ballot, 0)).1 += 1;
    }
    counts
        .into_values()
        .find(|&(_, count)| count >= threshold)
        .map(|(ballot, _)| ballot)
}
