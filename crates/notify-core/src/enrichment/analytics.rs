//! Call analytics block (tracking number, UTM tags, visitor data)

use crate::presenter::{AnalyticsField, AnalyticsRow};
use crate::stream::CallPayload;

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

/// A tracking number made of nothing but digits is noise the backend fills
/// in for untracked calls.
fn meaningful_outer_number(value: &str) -> bool {
    value
        .chars()
        .any(|c| !c.is_ascii_digit() && !c.is_whitespace())
}

/// Rows to display, in panel order. Empty means the block is hidden.
pub fn analytics_rows(call: &CallPayload) -> Vec<AnalyticsRow> {
    let outer_number = present(&call.outer_number).filter(|value| meaningful_outer_number(value));

    [
        (AnalyticsField::OuterNumber, outer_number),
        (AnalyticsField::UtmSource, present(&call.utm_source)),
        (AnalyticsField::UtmMedium, present(&call.utm_medium)),
        (AnalyticsField::UtmCampaign, present(&call.utm_campaign)),
        (AnalyticsField::UtmTerm, present(&call.utm_term)),
        (AnalyticsField::UtmContent, present(&call.utm_content)),
        (AnalyticsField::Referer, present(&call.referer)),
        (AnalyticsField::Ip, present(&call.ip)),
        (AnalyticsField::GoogleId, present(&call.google_id)),
    ]
    .into_iter()
    .filter_map(|(field, value)| {
        value.map(|value| AnalyticsRow {
            field,
            value: value.to_string(),
        })
    })
    .collect()
}
