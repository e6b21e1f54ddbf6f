//! CSV export of cleaned auction records

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::models::Auction;

const HEADERS: &[&str] = &[
    "title",
    "make",
    "model",
    "era",
    "origin",
    "vehicleLocation",
    "seller",
    "sellerLocation",
    "sellerType",
    "listingDetail1",
    "listingDetail2",
    "listingDetail3",
    "listingDetail4",
    "listingDetail5",
    "views",
    "watchers",
    "dateSold",
    "saleAmount",
    "auctionUrl",
    "scrapedAt",
];

/// Write one timestamped CSV file for the run under `output_dir`,
/// creating the directory if needed. Returns the path written.
pub fn export_to_csv(auctions: &[Auction], output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir {}", output_dir.display()))?;

    let filename = format!(
        "bat_auctions_{}.csv",
        Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let filepath = output_dir.join(filename);

    let file = File::create(&filepath)
        .with_context(|| format!("failed to create {}", filepath.display()))?;
    let mut writer = BufWriter::new(file);
    write_csv(&mut writer, auctions).context("failed to write CSV")?;
    writer.flush().context("failed to flush CSV")?;

    info!("CSV exported to {}", filepath.display());
    Ok(filepath)
}

/// Write the header and one row per auction to any writer.
pub fn write_csv<W: Write>(w: &mut W, auctions: &[Auction]) -> io::Result<()> {
    writeln!(w, "{}", HEADERS.join(","))?;

    for auction in auctions {
        let detail = |i: usize| auction.listing_details.get(i).map_or("", String::as_str);
        let fields = [
            escape_csv(&auction.title),
            escape_csv(&auction.make),
            escape_csv(&auction.model),
            escape_csv(&auction.era),
            escape_csv(&auction.origin),
            escape_csv(&auction.vehicle_location),
            escape_csv(&auction.seller),
            escape_csv(&auction.seller_location),
            escape_csv(&auction.seller_type),
            escape_csv(detail(0)),
            escape_csv(detail(1)),
            escape_csv(detail(2)),
            escape_csv(detail(3)),
            escape_csv(detail(4)),
            auction.views.to_string(),
            auction.watchers.to_string(),
            escape_csv(&auction.date_sold),
            auction.sale_amount.to_string(),
            escape_csv(&auction.auction_url),
            escape_csv(&auction.scraped_at.to_rfc3339()),
        ];
        writeln!(w, "{}", fields.join(","))?;
    }

    Ok(())
}

/// Escape one CSV field: values containing a comma, quote or newline
/// are wrapped in quotes with internal quotes doubled; empty values
/// render as an empty quoted pair.
fn escape_csv(value: &str) -> String {
    if value.is_empty() {
        return "\"\"".to_string();
    }
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
