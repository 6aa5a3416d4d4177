//! Small helpers shared by the format consumers.

/// Truncate an ISO date or timestamp to its date portion (YYYY-MM-DD).
///
/// Document dates often carry a full timestamp such as
/// "2022-05-26T16:26:51Z", while OPF and LaTeX title pages want the date.
///
/// ```ignore
/// assert_eq!(truncate_to_date("2022-05-26T16:26:51Z"), "2022-05-26");
/// assert_eq!(truncate_to_date("2022-05-26"), "2022-05-26");
/// ```
pub fn truncate_to_date(s: &str) -> String {
    let s = s.trim();
    match s.find(['T', ' ']) {
        Some(pos) => s[..pos].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_date() {
        assert_eq!(truncate_to_date("2022-05-26T16:26:51Z"), "2022-05-26");
        assert_eq!(truncate_to_date("2022-05-26"), "2022-05-26");
        assert_eq!(truncate_to_date("2022-05-26T16:26:51+00:00"), "2022-05-26");
        assert_eq!(truncate_to_date(" 2022-05-26 16:26 "), "2022-05-26");
        assert_eq!(truncate_to_date(""), "");
    }
}
