use serde::{Deserialize, Serialize};

/// How collisions of the routed line are resolved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterMode {
    /// Place the line as drawn and report what it violates.
    MarkObstacles,
    /// Hug obstacles instead of crossing them.
    Walkaround,
    /// Push movable traces out of the way, hugging what cannot be pushed.
    #[default]
    Shove,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerMode {
    #[default]
    Free,
    /// Only horizontal, vertical and diagonal segments.
    Mitered45,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    pub mode: RouterMode,
    pub corner_mode: CornerMode,
    pub walkaround_iterations: usize,
    pub shove_max_depth: usize,
    pub shove_iterations: usize,
    /// Budget of a single placement; `None` means unbounded.
    pub time_limit_ms: Option<u64>,
    pub optimize: bool,
    pub via_diameter: i64,
    pub via_drill: i64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            mode: RouterMode::default(),
            corner_mode: CornerMode::default(),
            walkaround_iterations: 32,
            shove_max_depth: 8,
            shove_iterations: 256,
            time_limit_ms: Some(100),
            optimize: true,
            via_diameter: 600_000,
            via_drill: 300_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_keep_defaults() {
        let settings: RouterSettings =
            serde_json::from_str(r#"{"mode": "walkaround", "time_limit_ms": null}"#).unwrap();

        assert_eq!(settings.mode, RouterMode::Walkaround);
        assert_eq!(settings.time_limit_ms, None);
        assert_eq!(settings.shove_max_depth, RouterSettings::default().shove_max_depth);
    }
}
