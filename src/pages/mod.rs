//! Handlers for the two page types the scraper visits: the completed
//! auction results listing and individual auction detail pages.

pub mod auction;
pub mod results;
