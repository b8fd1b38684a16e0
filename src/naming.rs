//! Canonical names for generated diff spreadsheets.
use chrono::{DateTime, Utc};

pub const PERMISSION_LIST: &str = "permission-list";

/// `<old>-<new>-<type>-<HH:MM>UTC.xlsx`, or `<new>-permission-list-<HH:MM>UTC.xlsx`.
///
/// Spaces are removed from release names; the old release is not part of a
/// permission list name.
pub fn diff_file_name(
    old_release: &str,
    new_release: &str,
    diff_type: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let time = generated_at.format("%H:%M%Z");
    let new_release = compact(new_release);
    if diff_type == PERMISSION_LIST {
        format!("{new_release}-{diff_type}-{time}.xlsx")
    } else {
        format!("{}-{new_release}-{diff_type}-{time}.xlsx", compact(old_release))
    }
}

fn compact(release: &str) -> String {
    release.replace(' ', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 30).unwrap()
    }

    #[test]
    fn includes_both_releases() {
        assert_eq!(
            diff_file_name("Spring 24", "Summer 24", "data-model", at(9, 5)),
            "Spring24-Summer24-data-model-09:05UTC.xlsx"
        );
    }

    #[test]
    fn permission_list_omits_old_release() {
        assert_eq!(
            diff_file_name("Spring 24", "Summer 24", PERMISSION_LIST, at(17, 42)),
            "Summer24-permission-list-17:42UTC.xlsx"
        );
    }
}
