//! Cap-table and analytics engine: current and historical snapshots derived
//! from the store, balance-change history for a single address, and
//! distribution/concentration analytics.

mod analytics;
mod error;
mod history;
mod multiplier;
mod replay;
mod snapshot;
mod types;

pub use analytics::{
    concentration_category, decentralization_score, distribution_buckets, gini_coefficient,
    herfindahl_hirschman_index, mean_balance, median_balance, overview, top_n_concentration,
    AnalyticsOverview, DistributionBucket,
};
pub use error::CapTableError;
pub use history::balance_change_history;
pub use multiplier::current_split_multiplier_bps;
pub use replay::historical_snapshot_at_block;
pub use snapshot::current_snapshot;
pub use types::{BalanceChangeEntry, BalanceChangeKind, CapTableEntry, CapTableSnapshot};
