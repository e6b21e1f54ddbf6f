//! Field extraction from an individual auction detail page.
//!
//! Navigation talks to the [`PageSession`]; everything after that is a
//! pure parse of the rendered source, so the selector and regex logic
//! is testable against fixture HTML.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::info;

use crate::browser::PageSession;
use crate::models::{ColumnGroups, Essentials, PageStats, RawAuction, SaleInfo, SaleStatus};

const CONTENT_WAIT: Duration = Duration::from_secs(10);

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static GROUP_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".column-groups .group-item").expect("valid selector"));
static GROUP_LABEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".group-title-label").expect("valid selector"));
static GROUP_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".group-title").expect("valid selector"));
static ESSENTIALS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".essentials").expect("valid selector"));
static SELLER_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".item-seller a").expect("valid selector"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("valid selector"));
static DETAIL_BULLETS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".item ul li").expect("valid selector"));
static ADDITIONAL_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".item.additional").expect("valid selector"));

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style>").expect("valid regex"));

static SELLER_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Private Party or Dealer[:\s]+(\w+)").expect("valid regex"));
static VIEWS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,3}(?:,\d{3})*)\s*views").expect("valid regex"));
static WATCHERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,3}(?:,\d{3})*)\s*watchers").expect("valid regex"));

/// One row of the sale-outcome decision table. Rules are evaluated in
/// order and the first matching pattern wins.
struct SaleRule {
    pattern: Regex,
    status: SaleStatus,
    /// Amount to record when the pattern has no amount capture.
    fixed_amount: Option<&'static str>,
}

static SALE_RULES: LazyLock<Vec<SaleRule>> = LazyLock::new(|| {
    vec![
        SaleRule {
            pattern: Regex::new(
                r"(?i)Sold for\s+USD\s+\$(?P<amount>[\d,]+)\s+on\s+(?P<date>\d{1,2}/\d{1,2}/\d{2,4})",
            )
            .expect("valid regex"),
            status: SaleStatus::Sold,
            fixed_amount: None,
        },
        SaleRule {
            pattern: Regex::new(
                r"(?i)Bid to\s+USD\s+\$(?P<amount>[\d,]+)\s+on\s+(?P<date>\d{1,2}/\d{1,2}/\d{2,4})",
            )
            .expect("valid regex"),
            status: SaleStatus::Bid,
            fixed_amount: None,
        },
        SaleRule {
            pattern: Regex::new(r"(?i)Withdrawn\s+on\s+(?P<date>\d{1,2}/\d{1,2}/\d{2,4})")
                .expect("valid regex"),
            status: SaleStatus::Withdrawn,
            fixed_amount: Some("0"),
        },
    ]
});

/// Navigate to an auction page and extract its raw fields.
///
/// A missed content wait is tolerated; extraction proceeds best-effort
/// on whatever loaded. Navigation failures propagate to the caller.
pub async fn extract_auction(page: &mut dyn PageSession, url: &str) -> Result<RawAuction> {
    info!("Extracting data from {url}");
    page.goto(url).await?;
    page.wait_for_selector(".column-groups", CONTENT_WAIT).await?;
    let html = page.content().await?;
    Ok(parse_auction_page(&html, url))
}

/// Parse the raw fields out of a rendered auction page. Every field is
/// independently optional; nothing here fails.
pub fn parse_auction_page(html: &str, url: &str) -> RawAuction {
    // Strip scripts and styles up front so the page-text regexes only
    // see what a visitor sees.
    let no_scripts = SCRIPT_RE.replace_all(html, " ");
    let stripped = STYLE_RE.replace_all(&no_scripts, " ");
    let doc = Html::parse_document(&stripped);

    let title = doc
        .select(&TITLE)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());

    let column_groups = parse_column_groups(&doc);
    let essentials = parse_essentials(&doc);

    let page_text = visible_text(&doc);
    let stats = PageStats {
        views: first_capture(&VIEWS_RE, &page_text),
        watchers: first_capture(&WATCHERS_RE, &page_text),
    };
    let sale_info = classify_sale(&page_text);

    RawAuction {
        title,
        column_groups,
        essentials,
        stats,
        sale_info,
        url: url.to_string(),
    }
}

/// Evaluate the sale-outcome rules against the page text.
pub fn classify_sale(page_text: &str) -> SaleInfo {
    for rule in SALE_RULES.iter() {
        if let Some(caps) = rule.pattern.captures(page_text) {
            let amount = caps
                .name("amount")
                .map(|m| m.as_str().to_string())
                .or_else(|| rule.fixed_amount.map(str::to_string));
            let date_sold = caps.name("date").map(|m| m.as_str().to_string());
            return SaleInfo {
                status: rule.status,
                date_sold,
                amount,
            };
        }
    }
    SaleInfo::default()
}

/// Labeled make/model/era/origin/location pairs. The label text is
/// stripped from the item's full text to yield the value; labels are
/// case-folded and only the five known keys are kept.
fn parse_column_groups(doc: &Html) -> ColumnGroups {
    let mut groups = ColumnGroups::default();

    for item in doc.select(&GROUP_ITEM) {
        let (Some(label_el), Some(title_el)) = (
            item.select(&GROUP_LABEL).next(),
            item.select(&GROUP_TITLE).next(),
        ) else {
            continue;
        };

        let label = element_text(label_el);
        let full = element_text(title_el);
        let value = full.replacen(&label, "", 1).trim().to_string();
        let value = (!value.is_empty()).then_some(value);

        match label.to_lowercase().as_str() {
            "make" => groups.make = value,
            "model" => groups.model = value,
            "era" => groups.era = value,
            "origin" => groups.origin = value,
            "location" => groups.location = value,
            _ => {}
        }
    }

    groups
}

fn parse_essentials(doc: &Html) -> Essentials {
    let Some(region) = doc.select(&ESSENTIALS).next() else {
        return Essentials::default();
    };

    let seller = region
        .select(&SELLER_LINK)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty());

    // The seller location is the one anchor pointing at a maps service.
    let location = region
        .select(&ANCHOR)
        .find(|a| {
            a.value()
                .attr("href")
                .is_some_and(|href| href.contains("google.com/maps"))
        })
        .map(element_text)
        .filter(|s| !s.is_empty());

    let listing_details = region
        .select(&DETAIL_BULLETS)
        .take(5)
        .map(element_text)
        .collect();

    let seller_type = region.select(&ADDITIONAL_ITEM).find_map(|item| {
        let text = element_text(item);
        if text.contains("Private Party or Dealer") {
            SELLER_TYPE_RE
                .captures(&text)
                .map(|caps| caps[1].to_string())
        } else {
            None
        }
    });

    Essentials {
        seller,
        location,
        listing_details,
        seller_type,
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Approximation of the page's visible text: all text nodes of the
/// (script/style-stripped) document, space-joined.
fn visible_text(doc: &Html) -> String {
    let mut out = String::new();
    for piece in doc.root_element().text() {
        out.push_str(piece);
        out.push(' ');
    }
    out
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLD_PAGE: &str = r#"
        <html><head><script>var x = "Bid to USD $1 on 1/1/11";</script></head><body>
        <h1> 1972 Datsun 240Z </h1>
        <div class="column-groups">
          <div class="group-item">
            <div class="group-title"><span class="group-title-label">Make</span>Datsun</div>
          </div>
          <div class="group-item">
            <div class="group-title"><span class="group-title-label">Model</span>240Z</div>
          </div>
          <div class="group-item">
            <div class="group-title"><span class="group-title-label">Location</span>Located in Los Angeles, CA</div>
          </div>
        </div>
        <div class="essentials">
          <div class="item item-seller">Seller: <a href="/member/zcarfan">zcarfan</a></div>
          <div class="item"><a href="https://www.google.com/maps/place/90001">Los Angeles, CA 90001</a></div>
          <div class="item"><ul>
            <li>Chassis: HLS30-55555</li>
            <li>69k Miles</li>
            <li>2.4L Inline-Six</li>
            <li>4-Speed Manual</li>
            <li>Silver Paint</li>
            <li>Extra bullet past the cap</li>
          </ul></div>
          <div class="item additional">Private Party or Dealer: Private</div>
        </div>
        <div class="stats">7,227 views and 412 watchers</div>
        <div class="listing-result">Sold for USD $25,500 on 1/15/24</div>
        </body></html>"#;

    #[test]
    fn extracts_all_fields_from_sold_page() {
        let raw = parse_auction_page(SOLD_PAGE, "https://bringatrailer.com/listing/240z/");

        assert_eq!(raw.title.as_deref(), Some("1972 Datsun 240Z"));
        assert_eq!(raw.column_groups.make.as_deref(), Some("Datsun"));
        assert_eq!(raw.column_groups.model.as_deref(), Some("240Z"));
        assert_eq!(
            raw.column_groups.location.as_deref(),
            Some("Located in Los Angeles, CA")
        );
        assert_eq!(raw.essentials.seller.as_deref(), Some("zcarfan"));
        assert_eq!(
            raw.essentials.location.as_deref(),
            Some("Los Angeles, CA 90001")
        );
        assert_eq!(raw.essentials.listing_details.len(), 5);
        assert_eq!(raw.essentials.listing_details[0], "Chassis: HLS30-55555");
        assert_eq!(raw.essentials.seller_type.as_deref(), Some("Private"));
        assert_eq!(raw.stats.views.as_deref(), Some("7,227"));
        assert_eq!(raw.stats.watchers.as_deref(), Some("412"));
        assert_eq!(raw.sale_info.status, SaleStatus::Sold);
        assert_eq!(raw.sale_info.amount.as_deref(), Some("25,500"));
        assert_eq!(raw.sale_info.date_sold.as_deref(), Some("1/15/24"));
        assert_eq!(raw.url, "https://bringatrailer.com/listing/240z/");
    }

    #[test]
    fn script_text_does_not_leak_into_classification() {
        // The fixture's script mentions "Bid to"; only the rendered
        // result line should count.
        let raw = parse_auction_page(SOLD_PAGE, "u");
        assert_eq!(raw.sale_info.status, SaleStatus::Sold);
    }

    #[test]
    fn missing_sections_yield_absent_fields() {
        let raw = parse_auction_page("<html><body><p>nothing here</p></body></html>", "u");
        assert!(raw.title.is_none());
        assert!(raw.column_groups.make.is_none());
        assert!(raw.essentials.seller.is_none());
        assert!(raw.essentials.listing_details.is_empty());
        assert!(raw.stats.views.is_none());
        assert_eq!(raw.sale_info.status, SaleStatus::Unknown);
        assert!(raw.sale_info.amount.is_none());
    }

    #[test]
    fn sold_takes_priority_over_bid() {
        let info = classify_sale("Bid to USD $9,000 on 1/2/24 Sold for USD $10,000 on 1/3/24");
        assert_eq!(info.status, SaleStatus::Sold);
        assert_eq!(info.amount.as_deref(), Some("10,000"));
    }

    #[test]
    fn bid_matches_when_not_sold() {
        let info = classify_sale("Bid to USD $42,000 on 12/30/23");
        assert_eq!(info.status, SaleStatus::Bid);
        assert_eq!(info.amount.as_deref(), Some("42,000"));
        assert_eq!(info.date_sold.as_deref(), Some("12/30/23"));
    }

    #[test]
    fn withdrawn_records_zero_amount() {
        let info = classify_sale("This auction was Withdrawn on 6/10/24");
        assert_eq!(info.status, SaleStatus::Withdrawn);
        assert_eq!(info.amount.as_deref(), Some("0"));
        assert_eq!(info.date_sold.as_deref(), Some("6/10/24"));
    }

    #[test]
    fn unmatched_text_is_unknown() {
        let info = classify_sale("Auction ends tomorrow");
        assert_eq!(info.status, SaleStatus::Unknown);
        assert!(info.amount.is_none());
        assert!(info.date_sold.is_none());
    }
}
