//! Group domain: groups, memberships, contributions, and the audit ledger.

mod contribution;
mod group;
mod ledger;
mod membership;

pub use contribution::{Contribution, ContributionStatus};
pub use group::Group;
pub use ledger::{LedgerEntry, LedgerEntryKind};
pub use membership::{Membership, MembershipStatus};
