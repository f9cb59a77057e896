use super::Operation;

/// Shape of the payload a history record should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadPlan {
    /// Full post-state (or pre-removal state) snapshot.
    Snapshot,
    /// Structural delta against the captured original.
    Diff,
}

/// Decide snapshot-vs-diff for one lifecycle event.
///
/// Diffs are only ever produced on the update path of an entity that
/// already existed, and only when diff mode is on. Inserts always snapshot
/// the after state; removals always snapshot the pre-removal state.
pub fn select(operation: Operation, diff_only: bool, is_new: bool) -> PayloadPlan {
    match operation {
        Operation::Insert | Operation::Remove => PayloadPlan::Snapshot,
        Operation::Update if diff_only && !is_new => PayloadPlan::Diff,
        Operation::Update => PayloadPlan::Snapshot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_always_snapshots_even_in_diff_mode() {
        assert_eq!(select(Operation::Insert, true, true), PayloadPlan::Snapshot);
        assert_eq!(select(Operation::Insert, false, true), PayloadPlan::Snapshot);
    }

    #[test]
    fn remove_always_snapshots() {
        assert_eq!(select(Operation::Remove, true, false), PayloadPlan::Snapshot);
        assert_eq!(select(Operation::Remove, false, false), PayloadPlan::Snapshot);
    }

    #[test]
    fn update_diffs_only_when_diff_mode_on_and_entity_existed() {
        assert_eq!(select(Operation::Update, true, false), PayloadPlan::Diff);
        assert_eq!(select(Operation::Update, false, false), PayloadPlan::Snapshot);
        assert_eq!(select(Operation::Update, true, true), PayloadPlan::Snapshot);
    }
}
