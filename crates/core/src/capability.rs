use std::collections::HashSet;

/// True iff every non-blank requirement appears in the worker's
/// capability set. Entries are trimmed before comparison; matching is
/// case-sensitive and exact. An empty requirement list matches every
/// worker.
pub fn matches(worker_caps: &[String], required: &[String]) -> bool {
    if required.is_empty() {
        return true;
    }
    let held: HashSet<&str> = worker_caps.iter().map(|c| c.trim()).collect();
    required
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .all(|r| held.contains(r))
}
