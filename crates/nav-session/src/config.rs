//! Session configuration from environment.

use std::env;

use nav_core::NavigationRules;

const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the HTTP directions service, if one is used
    pub directions_url: Option<String>,
    pub rules: NavigationRules,
    /// Buffered events per subscriber before the slowest one starts lagging
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directions_url: None,
            rules: NavigationRules::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = NavigationRules::default();
        Self {
            directions_url: env::var("NAV_DIRECTIONS_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            rules: NavigationRules {
                off_route_tolerance_m: env_f64("NAV_OFF_ROUTE_TOLERANCE_M")
                    .unwrap_or(defaults.off_route_tolerance_m),
                reroute_min_distance_m: env_f64("NAV_REROUTE_MIN_DISTANCE_M")
                    .unwrap_or(defaults.reroute_min_distance_m),
                heading_tolerance_deg: env_f64("NAV_HEADING_TOLERANCE_DEG")
                    .unwrap_or(defaults.heading_tolerance_deg),
                ..defaults
            },
            event_capacity: env::var("NAV_EVENT_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_EVENT_CAPACITY),
        }
    }
}

fn env_f64(key: &str) -> Option<f64> {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_default_rules() {
        let config = Config::default();
        assert!(config.directions_url.is_none());
        assert_eq!(config.rules, NavigationRules::default());
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn env_f64_rejects_negative_and_garbage() {
        env::set_var("NAV_CONFIG_TEST_NEGATIVE", "-5");
        env::set_var("NAV_CONFIG_TEST_GARBAGE", "fifty");
        env::set_var("NAV_CONFIG_TEST_VALID", "75.5");

        assert_eq!(env_f64("NAV_CONFIG_TEST_NEGATIVE"), None);
        assert_eq!(env_f64("NAV_CONFIG_TEST_GARBAGE"), None);
        assert_eq!(env_f64("NAV_CONFIG_TEST_VALID"), Some(75.5));
        assert_eq!(env_f64("NAV_CONFIG_TEST_MISSING"), None);
    }
}
