// Filesystem families organization.
//
// The workspace groups filesystem support by family so that code shared
// across variants (FAT12/16/32, historically also exFAT) lives in one
// place. Only the FAT family's consistency-checking engine lives here.

pub mod fat;
