//! Classification of natural-language edit requests.

use atelier_config::IntentConfig;

/// Pages a request applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    ActivePage,
    AllPages,
}

/// Collaborator a request is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Generate,
    /// Geocode `address`, then embed a map there.
    Map { address: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub prompt: String,
    pub scope: Scope,
    pub route: Route,
}

/// Marker-list policy deciding the scope and route of a request.
#[derive(Debug, Clone)]
pub struct IntentPolicy {
    all_pages: Vec<String>,
    map: Vec<String>,
    address: Vec<String>,
}

impl IntentPolicy {
    pub fn new(config: &IntentConfig) -> Self {
        let lower = |markers: &[String]| {
            markers
                .iter()
                .map(|marker| marker.trim().to_lowercase())
                .filter(|marker| !marker.is_empty())
                .collect()
        };
        Self {
            all_pages: lower(&config.all_pages_markers),
            map: lower(&config.map_markers),
            address: lower(&config.address_markers),
        }
    }

    pub fn classify(&self, prompt: &str) -> Intent {
        let prompt = prompt.trim();
        let lowered = prompt.to_lowercase();

        let scope = if contains_any(&lowered, &self.all_pages) {
            Scope::AllPages
        } else {
            Scope::ActivePage
        };
        let route = if self.is_address_and_map(&lowered) {
            Route::Map {
                address: prompt.to_string(),
            }
        } else {
            Route::Generate
        };

        Intent {
            prompt: prompt.to_string(),
            scope,
            route,
        }
    }

    fn is_address_and_map(&self, lowered: &str) -> bool {
        let has_address =
            lowered.chars().any(|c| c.is_ascii_digit()) || contains_any(lowered, &self.address);
        has_address && contains_any(lowered, &self.map)
    }
}

impl Default for IntentPolicy {
    fn default() -> Self {
        Self::new(&IntentConfig::default())
    }
}

fn contains_any(text: &str, markers: &[String]) -> bool {
    markers.iter().any(|marker| text.contains(marker.as_str()))
}
