//! Pure cleaning, parsing and validation of extracted auction data

use chrono::Utc;

use crate::models::{Auction, RawAuction};

const UNKNOWN: &str = "Unknown";

/// Transform a raw extraction into a clean auction record.
///
/// Missing or unparseable string fields become `"Unknown"`, numbers
/// become 0. The caller is expected to have checked
/// [`should_include`] first; the status is carried over as-is.
pub fn transform(raw: RawAuction) -> Auction {
    Auction {
        make: or_unknown(clean_text(raw.column_groups.make.as_deref())),
        model: or_unknown(clean_text(raw.column_groups.model.as_deref())),
        era: or_unknown(clean_text(raw.column_groups.era.as_deref())),
        origin: or_unknown(clean_text(raw.column_groups.origin.as_deref())),
        vehicle_location: or_unknown(clean_vehicle_location(raw.column_groups.location.as_deref())),

        seller: or_unknown(clean_text(raw.essentials.seller.as_deref())),
        seller_location: or_unknown(clean_text(raw.essentials.location.as_deref())),
        listing_details: raw
            .essentials
            .listing_details
            .iter()
            .map(|detail| clean_text(Some(detail.as_str())))
            .filter(|detail| !detail.is_empty())
            .collect(),
        seller_type: or_unknown(clean_text(raw.essentials.seller_type.as_deref())),

        views: parse_number(raw.stats.views.as_deref()),
        watchers: parse_number(raw.stats.watchers.as_deref()),

        status: raw.sale_info.status,
        date_sold: or_unknown(clean_text(raw.sale_info.date_sold.as_deref())),
        sale_amount: parse_number(raw.sale_info.amount.as_deref()),

        title: or_unknown(clean_text(raw.title.as_deref())),
        auction_url: raw.url,
        scraped_at: Utc::now(),
    }
}

/// Collapse all whitespace runs (including newlines and tabs) to single
/// spaces and trim the ends. Absent text becomes the empty string.
pub fn clean_text(text: Option<&str>) -> String {
    match text {
        None => String::new(),
        Some(t) => t.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Clean a vehicle location, stripping the leading "Located in" marker.
pub fn clean_vehicle_location(location: Option<&str>) -> String {
    const MARKER: &str = "located in";
    let cleaned = clean_text(location);
    match cleaned.get(..MARKER.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(MARKER) => {
            cleaned[MARKER.len()..].trim().to_string()
        }
        _ => cleaned,
    }
}

/// Parse a locale-formatted count like "7,227" into an integer.
/// Absent or unparseable input yields 0.
pub fn parse_number(value: Option<&str>) -> u64 {
    value
        .map(|v| v.replace(',', ""))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Whether the raw auction belongs in the output at all: only sold and
/// bid auctions do; withdrawn and unknown are silently skipped.
pub fn should_include(raw: &RawAuction) -> bool {
    raw.sale_info.status.is_included()
}

/// Minimum data an auction must carry to be worth keeping.
pub fn is_valid(auction: &Auction) -> bool {
    auction.make != UNKNOWN && auction.model != UNKNOWN && !auction.auction_url.is_empty()
}

fn or_unknown(value: String) -> String {
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnGroups, Essentials, SaleInfo, SaleStatus};

    fn raw_with_status(status: SaleStatus) -> RawAuction {
        RawAuction {
            title: Some("1972 Datsun 240Z".to_string()),
            column_groups: ColumnGroups {
                make: Some("Datsun".to_string()),
                model: Some("240Z".to_string()),
                era: Some("1970s".to_string()),
                origin: Some("Japan".to_string()),
                location: Some("Located in  Los Angeles, CA".to_string()),
            },
            essentials: Essentials {
                seller: Some("zcarfan".to_string()),
                location: Some("Los Angeles, CA 90001".to_string()),
                listing_details: vec![
                    "Chassis: HLS30-55555".to_string(),
                    "  ".to_string(),
                    "5-Speed Manual\nTransmission".to_string(),
                ],
                seller_type: Some("Private".to_string()),
            },
            stats: crate::models::PageStats {
                views: Some("7,227".to_string()),
                watchers: Some("412".to_string()),
            },
            sale_info: SaleInfo {
                status,
                date_sold: Some("1/15/24".to_string()),
                amount: Some("25,500".to_string()),
            },
            url: "https://bringatrailer.com/listing/1972-datsun-240z/".to_string(),
        }
    }

    #[test]
    fn parse_number_handles_separators_and_garbage() {
        assert_eq!(parse_number(Some("7,227")), 7227);
        assert_eq!(parse_number(Some("")), 0);
        assert_eq!(parse_number(None), 0);
        assert_eq!(parse_number(Some("abc")), 0);
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text(Some("  a\n\tb   c ")), "a b c");
        assert_eq!(clean_text(None), "");
    }

    #[test]
    fn vehicle_location_strips_prefix() {
        assert_eq!(
            clean_vehicle_location(Some("Located in  Los Angeles, CA")),
            "Los Angeles, CA"
        );
        assert_eq!(
            clean_vehicle_location(Some("located in Portland, OR")),
            "Portland, OR"
        );
        assert_eq!(clean_vehicle_location(None), "");
    }

    #[test]
    fn withdrawn_and_unknown_are_excluded() {
        assert!(!should_include(&raw_with_status(SaleStatus::Withdrawn)));
        assert!(!should_include(&raw_with_status(SaleStatus::Unknown)));
        assert!(should_include(&raw_with_status(SaleStatus::Sold)));
        assert!(should_include(&raw_with_status(SaleStatus::Bid)));
    }

    #[test]
    fn complete_raw_record_transforms_to_valid_auction() {
        let auction = transform(raw_with_status(SaleStatus::Sold));
        assert!(is_valid(&auction));
        assert_eq!(auction.make, "Datsun");
        assert_eq!(auction.vehicle_location, "Los Angeles, CA");
        assert_eq!(auction.views, 7227);
        assert_eq!(auction.sale_amount, 25500);
        // Empty bullets are dropped, order preserved, whitespace collapsed.
        assert_eq!(
            auction.listing_details,
            vec!["Chassis: HLS30-55555", "5-Speed Manual Transmission"]
        );
    }

    #[test]
    fn missing_fields_default_to_unknown_and_zero() {
        let mut raw = raw_with_status(SaleStatus::Bid);
        raw.column_groups.make = None;
        raw.stats.views = None;
        raw.sale_info.date_sold = None;

        let auction = transform(raw);
        assert_eq!(auction.make, "Unknown");
        assert_eq!(auction.views, 0);
        assert_eq!(auction.date_sold, "Unknown");
        assert!(!is_valid(&auction));
    }
}
