//! Data models for raw and cleaned auction records

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Outcome classification for a completed auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleStatus {
    Sold,
    Bid,
    Withdrawn,
    Unknown,
}

impl SaleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sold => "sold",
            Self::Bid => "bid",
            Self::Withdrawn => "withdrawn",
            Self::Unknown => "unknown",
        }
    }

    /// Only sold and bid auctions make it into the output.
    pub fn is_included(self) -> bool {
        matches!(self, Self::Sold | Self::Bid)
    }
}

/// Labeled attributes from the detail page's column-groups section.
#[derive(Debug, Clone, Default)]
pub struct ColumnGroups {
    pub make: Option<String>,
    pub model: Option<String>,
    pub era: Option<String>,
    pub origin: Option<String>,
    pub location: Option<String>,
}

/// Seller facts from the "BaT Essentials" section.
#[derive(Debug, Clone, Default)]
pub struct Essentials {
    pub seller: Option<String>,
    pub location: Option<String>,
    /// First 5 bullet points only; fewer is fine.
    pub listing_details: Vec<String>,
    pub seller_type: Option<String>,
}

/// View/watcher counts as they appear in the page text.
#[derive(Debug, Clone, Default)]
pub struct PageStats {
    pub views: Option<String>,
    pub watchers: Option<String>,
}

/// Sale outcome as matched from the page text.
#[derive(Debug, Clone)]
pub struct SaleInfo {
    pub status: SaleStatus,
    pub date_sold: Option<String>,
    pub amount: Option<String>,
}

impl Default for SaleInfo {
    fn default() -> Self {
        Self {
            status: SaleStatus::Unknown,
            date_sold: None,
            amount: None,
        }
    }
}

/// Raw extracted data for one auction page, before transformation.
///
/// Every field except the source URL is optional; a missing field is
/// not an extraction failure.
#[derive(Debug, Clone)]
pub struct RawAuction {
    pub title: Option<String>,
    pub column_groups: ColumnGroups,
    pub essentials: Essentials,
    pub stats: PageStats,
    pub sale_info: SaleInfo,
    pub url: String,
}

/// A cleaned, validated auction record ready for CSV export.
#[derive(Debug, Clone)]
pub struct Auction {
    pub make: String,
    pub model: String,
    pub era: String,
    pub origin: String,
    pub vehicle_location: String,

    pub seller: String,
    pub seller_location: String,
    pub listing_details: Vec<String>,
    pub seller_type: String,

    pub views: u64,
    pub watchers: u64,

    pub status: SaleStatus,
    pub date_sold: String,
    pub sale_amount: u64,

    pub title: String,
    pub auction_url: String,
    pub scraped_at: DateTime<Utc>,
}

/// A per-URL failure recorded during the run.
#[derive(Debug, Clone)]
pub struct UrlError {
    pub url: String,
    pub message: String,
}

/// Counters accumulated over one run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub sold: u32,
    pub bid: u32,
    pub skipped: u32,
    pub errors: Vec<UrlError>,
}

/// Everything a run produces.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub auctions: Vec<Auction>,
    pub stats: RunStats,
    /// Absent when the run produced no valid auctions.
    pub csv_path: Option<PathBuf>,
}
