use colored::Colorize;
use longhome_game::DescentConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::scenarios::DescentScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    /// End states seen across iterations, e.g. `clean_stop` or `fatal:terminal_slide`.
    pub outcomes: BTreeMap<String, usize>,
    pub mean_distance: f32,
    pub max_speed: f32,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
}

pub struct DescentTester {
    config: DescentConfig,
    verbose: bool,
}

impl DescentTester {
    pub const fn new(config: DescentConfig, verbose: bool) -> Self {
        Self { config, verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &DescentScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧪 Testing scenario: {} (seed: {})",
                        scenario.key.bright_white(),
                        seed
                    );
                }
                self.run_single_scenario(scenario, seed, iterations)
            })
            .collect()
    }

    fn run_single_scenario(
        &self,
        scenario: &DescentScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut outcomes = BTreeMap::new();
        let mut durations = Vec::new();
        let mut total_distance = 0.0_f32;
        let mut max_speed = 0.0_f32;

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            match (scenario.run)(&self.config, iteration_seed) {
                Ok(summary) => {
                    successes += 1;
                    let duration = start_time.elapsed();
                    durations.push(duration);
                    total_distance += summary.distance;
                    max_speed = max_speed.max(summary.top_speed);
                    *outcomes.entry(summary.outcome_label()).or_insert(0) += 1;
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) ticks:{} outcome:{} distance:{:.1}m",
                            i + 1,
                            iterations,
                            summary.ticks,
                            summary.outcome_label(),
                            summary.distance
                        );
                    }
                }
                Err(err) => {
                    *outcomes.entry("failed".to_string()).or_insert(0) += 1;
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            err.clone().red()
                        );
                    }
                    failures.push(format!(
                        "Iteration {} (seed {iteration_seed}): {err}",
                        i + 1
                    ));
                }
            }
        }

        let average_duration = if durations.is_empty() {
            Duration::ZERO
        } else {
            durations.iter().sum::<Duration>() / u32::try_from(durations.len()).unwrap_or(1)
        };
        #[allow(clippy::cast_precision_loss)]
        let mean_distance = if successes == 0 {
            0.0
        } else {
            total_distance / successes as f32
        };

        ScenarioResult {
            scenario_name: scenario.key.to_string(),
            seed,
            passed: failures.is_empty() && iterations > 0,
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            outcomes,
            mean_distance,
            max_speed,
            average_duration,
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
