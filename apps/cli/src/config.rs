// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI configuration loaded from environment variables.

use std::str::FromStr;

use sbrep_topology::{MergeStrategy, MeshBuildOptions, Tolerances};

/// Tool configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Coincidence distance (`SBREP_EPSILON`).
    pub epsilon: f64,
    /// Decimal digits kept when bucketing normals (`SBREP_NORMAL_DIGITS`).
    pub normal_digits: u32,
    /// Relative vertex merge tolerance for reconstruction
    /// (`SBREP_MERGE_TOLERANCE`).
    pub merge_tolerance: f64,
    /// `global` or `neighbourhood` (`SBREP_MERGE_STRATEGY`).
    pub merge_strategy: MergeStrategy,
    /// Number of worker threads for parallel reconstruction
    /// (`SBREP_WORKER_THREADS`).
    pub worker_threads: usize,
    /// Reconstruct meshes in parallel by default (`SBREP_PARALLEL`).
    pub parallel: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset or unparsable
    /// values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Tolerances::default();
        Self {
            epsilon: parse_or(&lookup, "SBREP_EPSILON", defaults.epsilon),
            normal_digits: parse_or(&lookup, "SBREP_NORMAL_DIGITS", defaults.normal_digits),
            merge_tolerance: parse_or(&lookup, "SBREP_MERGE_TOLERANCE", defaults.merge_tolerance),
            merge_strategy: match lookup("SBREP_MERGE_STRATEGY").as_deref().map(str::trim) {
                Some("global") => MergeStrategy::Global,
                _ => MergeStrategy::Neighbourhood,
            },
            worker_threads: parse_or(&lookup, "SBREP_WORKER_THREADS", num_cpus::get()).max(1),
            parallel: lookup("SBREP_PARALLEL")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            epsilon: self.epsilon,
            normal_digits: self.normal_digits,
            merge_tolerance: self.merge_tolerance,
            ..Tolerances::default()
        }
    }

    pub fn mesh_options(&self) -> MeshBuildOptions {
        MeshBuildOptions {
            strategy: self.merge_strategy,
            tolerances: self.tolerances(),
            ..MeshBuildOptions::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let c = config(&[]);
        assert_eq!(c.epsilon, 1e-6);
        assert_eq!(c.normal_digits, 4);
        assert_eq!(c.merge_strategy, MergeStrategy::Neighbourhood);
        assert!(c.worker_threads >= 1);
        assert!(!c.parallel);
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let c = config(&[
            ("SBREP_EPSILON", "1e-4"),
            ("SBREP_NORMAL_DIGITS", "three"),
            ("SBREP_MERGE_STRATEGY", "global"),
            ("SBREP_WORKER_THREADS", "0"),
            ("SBREP_PARALLEL", "true"),
        ]);
        assert_eq!(c.epsilon, 1e-4);
        assert_eq!(c.normal_digits, 4);
        assert_eq!(c.worker_threads, 1);
        assert!(c.parallel);
        let options = c.mesh_options();
        assert_eq!(options.strategy, MergeStrategy::Global);
        assert_eq!(options.tolerances.epsilon, 1e-4);
        assert!(options.fix_normals);
    }
}
