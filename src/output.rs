use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

pub const QUIET_ENV: &str = "CATALOG_CACHE_QUIET";

/// Suppress progress bars and banners (`CATALOG_CACHE_QUIET=1`)
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var(QUIET_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
