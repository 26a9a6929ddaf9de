use comics_dal::ValidationErrors;

pub(crate) const INTEGER_EXPECTED: &str = "must be an integer value";

/// Integer query value, `default` when absent.
///
/// An unparsable value is reported under `field` and the default is used,
/// so range checks later on do not add a second message.
pub(crate) fn parse_int(
    value: Option<&str>,
    field: &str,
    default: u32,
    errors: &mut ValidationErrors,
) -> u32 {
    match value {
        None | Some("") => default,
        Some(s) => match s.parse::<i64>() {
            Ok(n) if n < 0 => 0,
            Ok(n) => u32::try_from(n).unwrap_or(u32::MAX),
            Err(_) => {
                errors.add(field, INTEGER_EXPECTED);
                default
            }
        },
    }
}

/// Comma separated values, empty when absent.
pub(crate) fn parse_csv(value: Option<&str>) -> Vec<String> {
    match value {
        None | Some("") => Vec::new(),
        Some(s) => s.split(',').map(str::to_string).collect(),
    }
}
