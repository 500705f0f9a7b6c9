// Walks a single cluster chain from a known head, counting its length
// and catching cross-links and bad terminators along the way.

use super::collaborators::Oracle;
use super::common::{continuation_label, CLUST_EOF, CLUST_EOFS};
use super::descriptor::FatDescriptor;

/// What became of a chain after `checkchain` walked it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Ran cleanly to a valid EOF marker.
    Ok,
    /// Hit damage and the operator agreed to truncate at the last good
    /// cluster.
    Truncated,
    /// Hit damage and the operator declined to fix it.
    Declined,
}

/// Walk the chain starting at `head`, marking every cluster visited as
/// used. `head` must be a currently-set head cluster that is not
/// already used; callers (the lost-chain sweep, and directory
/// traversal outside this crate) are expected to have checked that.
pub fn checkchain(
    fat: &mut FatDescriptor,
    head: u32,
    oracle: &mut dyn Oracle,
) -> (ChainOutcome, usize) {
    debug_assert!(fat.is_valid(head));
    debug_assert!(fat.is_head(head));
    debug_assert!(!fat.is_used(head));

    fat.clear_head(head);
    fat.set_used(head);

    let mut length = 0usize;
    let mut current = head;
    let mut next = fat.get_next(current);

    while fat.is_valid(next) {
        if fat.is_used(next) {
            log::warn!("Cluster {head} crossed a chain at {current} with {next}");
            return truncate_at(fat, current, length, oracle);
        }
        fat.set_used(next);
        length += 1;
        current = next;
        next = fat.get_next(current);
    }

    if next >= CLUST_EOFS {
        length += 1;
        return (ChainOutcome::Ok, length);
    }

    log::warn!(
        "Cluster {current} continues with {} cluster number {next}",
        continuation_label(next)
    );
    truncate_at(fat, current, length, oracle)
}

fn truncate_at(
    fat: &mut FatDescriptor,
    current: u32,
    mut length: usize,
    oracle: &mut dyn Oracle,
) -> (ChainOutcome, usize) {
    if oracle.ask(false, "Truncate") && fat.set_next(current, CLUST_EOF).is_ok() {
        length += 1;
        (ChainOutcome::Truncated, length)
    } else {
        (ChainOutcome::Declined, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::fat::codec::ClusterWidth;
    use crate::families::fat::descriptor::FatBuffer;

    struct AlwaysAnswer(bool);
    impl Oracle for AlwaysAnswer {
        fn ask(&mut self, _default: bool, _prompt: &str) -> bool {
            self.0
        }
    }

    fn descriptor_for(entries: &[(u32, u32)], num_clusters: u32) -> FatDescriptor {
        let width = ClusterWidth::Fat16;
        let mut buf = vec![0u8; num_clusters as usize * 2];
        for &(cl, next) in entries {
            width.encode(&mut buf, cl, next);
        }
        FatDescriptor::new(width, num_clusters, FatBuffer::Heap(buf), false).unwrap()
    }

    #[test]
    fn walks_a_clean_chain_to_eof() {
        let mut fat = descriptor_for(&[(2, 3), (3, 4), (4, 0xffff_ffff)], 6);
        let mut oracle = AlwaysAnswer(true);
        let (outcome, length) = checkchain(&mut fat, 2, &mut oracle);
        assert_eq!(outcome, ChainOutcome::Ok);
        assert_eq!(length, 3);
        assert!(fat.is_used(2) && fat.is_used(3) && fat.is_used(4));
    }

    #[test]
    fn truncates_at_a_cross_link_when_asked() {
        let mut fat = descriptor_for(&[(2, 3), (3, 4), (4, 0xffff_ffff)], 6);
        let mut oracle = AlwaysAnswer(true);
        // Walk the first chain so cluster 4 is already used...
        checkchain(&mut fat, 2, &mut oracle);
        // ...then give cluster 5 a chain that crosses into it.
        fat.set_next(5, 4).unwrap();
        let (outcome, length) = checkchain(&mut fat, 5, &mut oracle);
        assert_eq!(outcome, ChainOutcome::Truncated);
        assert_eq!(length, 1);
        assert_eq!(fat.get_next(5), 0xffff_ffff);
    }

    #[test]
    fn leaves_a_bad_terminator_when_declined() {
        let mut fat = descriptor_for(&[(2, 999)], 6);
        let mut oracle = AlwaysAnswer(false);
        let (outcome, length) = checkchain(&mut fat, 2, &mut oracle);
        assert_eq!(outcome, ChainOutcome::Declined);
        assert_eq!(length, 0);
        assert_eq!(fat.get_next(2), 999);
    }
}
