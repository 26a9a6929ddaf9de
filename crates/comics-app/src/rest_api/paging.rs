use comics_dal::{validation::validate, Filters, ValidationErrors};

mod parsers;

pub(crate) use parsers::parse_csv;

pub const DEFAULT_SORT: &str = "id";

/// Builds listing filters from raw query values.
///
/// Parse errors come first, a field reports at most one message.
pub fn parse_filters(
    page: Option<&str>,
    page_size: Option<&str>,
    sort: Option<&str>,
    default_page_size: u32,
    sort_safelist: &'static [&'static str],
) -> Result<Filters, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let page = parsers::parse_int(page, "page", 1, &mut errors);
    let page_size = parsers::parse_int(page_size, "page_size", default_page_size, &mut errors);
    let sort = match sort {
        None | Some("") => DEFAULT_SORT,
        Some(s) => s,
    };

    let filters = Filters::new(page, page_size, sort, sort_safelist);
    if let Err(range_errors) = validate(&filters) {
        errors.merge(range_errors);
    }
    errors.into_result().map(|_| filters)
}
