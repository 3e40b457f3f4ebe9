pub mod env;

use crate::compose;
use crate::resolve;
use anyhow::{Context, Result};
use chrono::Local;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// The fully-resolved experiment configuration: timestep budgets, population
/// bounds, logging and rendering toggles, and the `env` / `agents` / `model`
/// sections selected by the `defaults` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub n_timesteps: u64,
    pub period_eval: u64,
    pub period_video: u64,

    pub n_agents_max: u32,
    pub n_agents_initial: u32,

    #[serde(default)]
    pub seed: Option<u64>,

    // Logging toggles
    #[serde(default)]
    pub do_wandb: bool,
    #[serde(default)]
    pub do_tb: bool,
    #[serde(default = "default_true")]
    pub do_cli: bool,
    #[serde(default = "default_true")]
    pub do_progress: bool,
    #[serde(default)]
    pub do_profile: bool,

    // Video recording
    #[serde(default)]
    pub do_video: bool,
    pub n_steps_between_videos: u64,
    pub n_steps_per_video: u64,
    pub n_steps_between_frames: u64,

    pub env: env::GridworldConfig,
    pub agents: NamedSection,
    pub model: NamedSection,
}

fn default_true() -> bool {
    true
}

/// An opaque config group: a `name` selecting the implementation plus its
/// parameters, passed through to the consumer untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedSection {
    pub name: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

impl ExperimentConfig {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_yaml::from_value(value.clone())
            .context("configuration does not match the experiment schema")
    }

    /// Compose a root config file, apply `key=value` overrides, resolve all
    /// template expressions, and deserialize.
    pub fn load(path: &Path, overrides: &[String]) -> Result<Self> {
        let mut doc = compose::compose(path)?;
        for spec in overrides {
            compose::apply_override(&mut doc, spec)?;
        }
        let resolved = resolve::resolve_document(&doc)?;
        Self::from_value(&resolved)
    }

    /// The configured seed, or a fresh random one.
    pub fn seed_or_random(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            let seed = rand::thread_rng().r#gen::<u32>() as u64;
            debug!(seed, "no seed configured, drew a random one");
            seed
        })
    }

    /// Run name in the shape the log directory layout expects.
    pub fn run_name(&self, seed: u64) -> String {
        format!(
            "[{}]_{}_seed{}",
            self.env.name,
            Local::now().format("%dth%mmo_%Hh%Mmin%Ss"),
            seed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = r#"
n_timesteps: 1000
period_eval: 10
period_video: 100
n_agents_max: 50
n_agents_initial: 20
n_steps_between_videos: 100
n_steps_per_video: 50
n_steps_between_frames: 2
env:
  name: gridworld
  width: 10
  height: 8
  is_terminal: true
  period_logging: 5
  dim_appearance: 2
  list_channels_visual_field: [plants, agents]
  period_sun: 100
  method_sun: fixed
  radius_sun_effect: 5
  radius_sun_perception: 5
  proportion_plant_initial: 0.2
  p_base_plant_growth: 0.01
  p_base_plant_death: 0.1
  factor_sun_effect: 1.0
  factor_plant_reproduction: 1.0
  radius_plant_reproduction: 5
  factor_plant_asphyxia: 1.0
  radius_plant_asphyxia: 15
  list_observations: [visual_field, energy]
  list_actions: [forward, eat, idle]
  vision_range_agent: 3
  age_max: 100
  energy_max: 100.0
  energy_initial: 50.0
  energy_loss_idle: 0.3
  energy_loss_action: 1.0
  energy_food: 10.0
  energy_thr_death: 0.0
  energy_req_reprod: 60.0
  energy_cost_reprod: 30.0
  infancy_duration: 10
  metrics:
    measures:
      environmental: [n_agents]
      immediate: [do_action_eat]
      state: [energy]
      behavior: []
    aggregators_lifespan: []
    aggregators_population: []
    config_video:
      do_video: false
      n_steps_per_video: 50
      fps_video: 20
      dir_videos: logs/videos
      height_max_video: 500
      width_max_video: 500
agents:
  name: neuroevolution
  mutation_std: 0.02
model:
  name: mlp
  hidden_dims: [32, 32]
"#;

    #[test]
    fn toggles_default_sensibly() {
        let config: ExperimentConfig = serde_yaml::from_str(MINIMAL_YAML).unwrap();
        assert!(!config.do_wandb);
        assert!(!config.do_tb);
        assert!(config.do_cli);
        assert!(config.do_progress);
        assert!(!config.do_profile);
        assert!(!config.do_video);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn named_sections_keep_their_parameters() {
        let config: ExperimentConfig = serde_yaml::from_str(MINIMAL_YAML).unwrap();
        assert_eq!(config.agents.name, "neuroevolution");
        assert!(config.agents.params.contains_key("mutation_std"));
        assert_eq!(config.model.name, "mlp");
        assert!(config.model.params.contains_key("hidden_dims"));
    }

    #[test]
    fn configured_seed_wins() {
        let mut config: ExperimentConfig = serde_yaml::from_str(MINIMAL_YAML).unwrap();
        config.seed = Some(42);
        assert_eq!(config.seed_or_random(), 42);
    }

    #[test]
    fn run_name_carries_env_and_seed() {
        let config: ExperimentConfig = serde_yaml::from_str(MINIMAL_YAML).unwrap();
        let name = config.run_name(7);
        assert!(name.starts_with("[gridworld]_"));
        assert!(name.ends_with("_seed7"));
    }
}
