/// Returns the `page`-th slice of `per_page` items (pages start at 1).
///
/// A page past the end is an empty slice, not an error. Page 0 is treated
/// as page 1; bounds are validated before requests reach this crate.
pub fn paginate<T>(items: &[T], per_page: usize, page: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(per_page);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(per_page).min(items.len());
    &items[start..end]
}
