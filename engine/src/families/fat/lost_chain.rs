// Sweeps whatever heads remain in the head bitmap after directory
// traversal: every one left is a chain no file or directory claims.
//
// Each lost chain is offered to the embedder's rescue-directory sink;
// if it can't (or won't) be reconnected, the operator is offered a
// plain "Clear" instead. Once every lost chain has been dealt with,
// FAT32's FSInfo free-space hint is reconciled against what the sweep
// actually counted.

use super::bitmap::WORD_BITS;
use super::chain_checker::{checkchain, ChainOutcome};
use super::chain_clear::clearchain;
use super::collaborators::{BootBlock, Oracle, ReconnectSink, ReconnectStatus, WriteFsInfo};
use super::common::{CLUST_FIRST, CLUST_FREE};
use super::descriptor::FatDescriptor;
use super::status::Status;

pub fn checklost(
    fat: &mut FatDescriptor,
    boot: &mut dyn BootBlock,
    oracle: &mut dyn Oracle,
    reconnect: &mut dyn ReconnectSink,
    write_fsinfo: &mut dyn WriteFsInfo,
) -> Status {
    let mut status = Status::OK;
    let num_clusters = fat.num_clusters();
    let mut chains_remaining = fat.head_count();
    let mut head = CLUST_FIRST;

    while chains_remaining > 0 && head < num_clusters {
        if head % WORD_BITS as u32 == 0 && fat.head_word_is_empty(head) {
            head += WORD_BITS as u32;
            continue;
        }

        if !fat.is_head(head) {
            head += 1;
            continue;
        }

        let (outcome, length) = checkchain(fat, head, oracle);
        let mut offer_clear = outcome == ChainOutcome::Declined;
        if outcome == ChainOutcome::Truncated {
            status |= Status::FATMOD;
        }

        if outcome != ChainOutcome::Declined {
            log::warn!("Lost cluster chain at cluster {head}, {length} cluster(s) lost");
            match reconnect.reconnect(head, length) {
                ReconnectStatus::Reconnected => status |= Status::FATMOD,
                ReconnectStatus::Declined | ReconnectStatus::NotSupported => {
                    status |= Status::ERROR;
                    offer_clear = true;
                }
            }
        }

        if status.contains(Status::FATAL) {
            break;
        }

        if offer_clear && oracle.ask(false, "Clear") {
            clearchain(fat, boot, head);
            status |= Status::FATMOD;
        }

        chains_remaining -= 1;
        head += 1;
    }

    if boot.fs_info_present() {
        let mut dirty = false;

        if boot.fs_free() != 0xffff_ffff && boot.fs_free() != boot.num_free() {
            log::warn!(
                "Free space in FSInfo block ({}) not correct ({})",
                boot.fs_free(),
                boot.num_free()
            );
            if oracle.ask(true, "Fix") {
                boot.set_fs_free(boot.num_free());
                dirty = true;
            }
        }

        let fs_next = boot.fs_next();
        if fs_next != 0xffff_ffff
            && (fs_next >= num_clusters || (boot.num_free() > 0 && fat.get_next(fs_next) != CLUST_FREE))
        {
            log::warn!(
                "Next free cluster in FSInfo block ({fs_next}) {}",
                if fs_next >= num_clusters { "invalid" } else { "not free" }
            );
            if oracle.ask(true, "Fix") {
                if let Some(free_cl) = (CLUST_FIRST..num_clusters).find(|&cl| fat.get_next(cl) == CLUST_FREE) {
                    boot.set_fs_next(free_cl);
                    dirty = true;
                }
            }
        }

        if dirty {
            status |= write_fsinfo.write_fsinfo(boot);
        }
    }

    status
}
