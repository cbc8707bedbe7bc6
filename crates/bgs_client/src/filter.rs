//! CQL filter expressions for the statistics collection.

use common::config::YearRange;
use common::types::{year_end, year_start};

/// Build the server-side filter for one commodity and statistic type over
/// the inclusive year window.
pub fn build_cql_filter(commodity: &str, statistic_type: &str, years: YearRange) -> String {
    format!(
        "bgs_commodity_trans='{}' AND bgs_statistic_type_trans='{}' AND year>='{}' AND year<='{}'",
        quote(commodity),
        quote(statistic_type),
        year_start(years.min),
        year_end(years.max),
    )
}

/// CQL string literals escape a single quote by doubling it.
fn quote(value: &str) -> String {
    value.replace('\'', "''")
}
