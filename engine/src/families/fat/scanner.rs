// Single pass over a loaded FAT: classifies every entry, counts free and
// bad clusters, and narrows the head bitmap down to actual chain heads.
//
// A cluster starts out presumed to be a head (the bitmap is seeded all
// ones). Walking the table and clearing the bit on whatever any entry
// points to is cheaper than walking every chain from scratch to find
// its head: by the time this pass ends, every bit still set identifies
// a cluster nothing else claims as "next" - either a real file/directory
// head, or, if nothing ever visits it from the directory tree, a lost
// chain.

use super::collaborators::{BootBlock, Oracle};
use super::common::{continuation_label, CLUST_BAD, CLUST_EOF, CLUST_EOFS, CLUST_FIRST, CLUST_FREE};
use super::descriptor::FatDescriptor;
use super::status::Status;

/// Walk every entry once, repairing out-of-range continuations in
/// place and leaving the head bitmap holding exactly the clusters
/// nothing else references.
pub fn scan(fat: &mut FatDescriptor, boot: &mut dyn BootBlock, oracle: &mut dyn Oracle) -> Status {
    let mut status = Status::OK;
    let num_clusters = fat.num_clusters();
    let mut num_free = 0u32;
    let mut num_bad = 0u32;

    for cl in CLUST_FIRST..num_clusters {
        let next = fat.get_next(cl);

        if next == CLUST_FREE {
            if fat.is_head(cl) {
                fat.clear_head(cl);
            }
            num_free += 1;
        } else if next == CLUST_BAD {
            if fat.is_head(cl) {
                fat.clear_head(cl);
            }
            num_bad += 1;
        } else if next < CLUST_FIRST || (next >= num_clusters && next < CLUST_EOFS) {
            log::warn!(
                "Cluster {cl} continues with {} cluster number {next}",
                continuation_label(next)
            );
            // A decline here leaves the entry untouched and is not
            // escalated to Status::ERROR: the scan loop this mirrors
            // has no such branch, unlike chain_checker's equivalent
            // decline.
            if oracle.ask(false, "Truncate") && fat.set_next(cl, CLUST_EOF).is_ok() {
                status |= Status::FATMOD;
            }
        } else if next < num_clusters {
            if fat.is_head(next) {
                fat.clear_head(next);
            }
            // else: `next` was already claimed, a cross-link caught
            // later when its owning chain is walked.
        }
    }

    boot.set_num_free(num_free);
    boot.set_num_bad(num_bad);
    status
}
