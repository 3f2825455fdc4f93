pub mod sample;
pub mod variables;

use std::path::PathBuf;

use chrono::{Datelike, Local};
pub use sample::sample;
pub use variables::variables;

/// Default output location: a dated csv in the working directory, named
/// after the sampled variables.
pub fn make_output_file_name(variables: &[String]) -> PathBuf {
    let today = Local::now();
    let file_name = format!(
        "d2r-{}-{}-{:02}-{:02}.csv",
        variables.join("-").to_lowercase(),
        today.year(),
        today.month(),
        today.day()
    );

    PathBuf::from(file_name)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn should_name_output_after_variables() {
        let name = make_output_file_name(&["UTCI".to_string(), "MRT".to_string()]);
        let name = name.to_string_lossy();

        assert!(name.starts_with("d2r-utci-mrt-"));
        assert!(name.ends_with(".csv"));
    }
}
