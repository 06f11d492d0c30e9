use std::path::{Path, PathBuf};

use chrono::NaiveDate;

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("recap")
}

/// Default location of the OAuth token cache
pub fn get_token_cache_path() -> PathBuf {
    get_root_cache_dir().join("oauth_token.json")
}

/// Get the path for a run's report artifact (one per calendar day)
pub fn get_report_path(output_dir: &Path, run_date: NaiveDate) -> PathBuf {
    output_dir.join(format!("digest_{}.json", run_date.format("%Y-%m-%d")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_path_is_named_by_run_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(
            get_report_path(Path::new("data"), date),
            PathBuf::from("data/digest_2026-03-07.json")
        );
    }

    #[test]
    fn token_cache_lives_under_recap_dir() {
        let path = get_token_cache_path();
        assert!(path.ends_with("recap/oauth_token.json"));
    }
}
