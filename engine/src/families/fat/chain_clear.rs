// Frees every cluster in a chain, from a given head to its terminator.
//
// Used when a lost chain's owner declines (or can't be offered) a
// rescue-directory reconnection: the chain's clusters are returned to
// the free pool instead of being left allocated but unreferenced.

use super::collaborators::BootBlock;
use super::common::CLUST_FREE;
use super::descriptor::FatDescriptor;

pub fn clearchain(fat: &mut FatDescriptor, boot: &mut dyn BootBlock, head: u32) {
    let mut current = head;
    let mut num_free = 0u32;

    while fat.is_valid(current) {
        let next = fat.get_next(current);
        if fat.set_next(current, CLUST_FREE).is_err() {
            break;
        }
        num_free += 1;
        if fat.is_used(current) {
            fat.clear_used(current);
        }
        if !fat.is_valid(next) {
            break;
        }
        current = next;
    }

    boot.set_num_free(boot.num_free() + num_free);
}
