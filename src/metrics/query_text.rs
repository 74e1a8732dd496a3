//! Query texts and their placeholder substitution.
//!
//! Placeholders are literal tokens replaced textually before the query runs.

pub const PAGE_VIEW_AND_DOWNLOAD_TOTALS_QUERY: &str =
    include_str!("../../sql/page_view_and_download_totals_query.sql");
pub const PAGE_VIEWS_AND_DOWNLOADS_DAILY_QUERY: &str =
    include_str!("../../sql/page_views_and_downloads_daily_query.sql");
pub const PAGE_VIEWS_AND_DOWNLOADS_MONTHLY_QUERY: &str =
    include_str!("../../sql/page_views_and_downloads_monthly_query.sql");
pub const CROSSREF_CITATIONS_QUERY: &str = include_str!("../../sql/crossref_citations_query.sql");
pub const NON_ARTICLE_PAGE_VIEW_TOTALS_QUERY: &str =
    include_str!("../../sql/non_article_page_view_totals_query.sql");

const NUMBER_OF_DAYS_PLACEHOLDER: &str = "{number_of_days}";
const NUMBER_OF_MONTHS_PLACEHOLDER: &str = "{number_of_months}";

pub fn get_query_with_replaced_number_of_days(query: &str, number_of_days: u32) -> String {
    query.replace(NUMBER_OF_DAYS_PLACEHOLDER, &number_of_days.to_string())
}

pub fn get_query_with_replaced_number_of_months(query: &str, number_of_months: u32) -> String {
    query.replace(NUMBER_OF_MONTHS_PLACEHOLDER, &number_of_months.to_string())
}
