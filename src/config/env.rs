//! Typed view of the `env` group: the gridworld section of the experiment
//! configuration, including the metrics block.

use crate::metrics::MetricsConfig;
use serde::{Deserialize, Serialize};

/// Named colors a channel may be tagged with for rendering.
pub const COLOR_TAGS: &[(&str, [f32; 3])] = &[
    ("white", [1.0, 1.0, 1.0]),
    ("black", [0.0, 0.0, 0.0]),
    ("red", [1.0, 0.0, 0.0]),
    ("green", [0.0, 1.0, 0.0]),
    ("blue", [0.0, 0.0, 1.0]),
    ("yellow", [1.0, 1.0, 0.0]),
    ("orange", [1.0, 0.5, 0.0]),
    ("purple", [0.5, 0.0, 0.5]),
    ("cyan", [0.0, 1.0, 1.0]),
    ("magenta", [1.0, 0.0, 1.0]),
    ("brown", [0.6, 0.3, 0.1]),
    ("gray", [0.5, 0.5, 0.5]),
];

pub fn color_tag_to_rgb(tag: &str) -> Option<[f32; 3]> {
    COLOR_TAGS
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, rgb)| *rgb)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SunMethod {
    None,
    Fixed,
    Random,
    Brownian,
    Sine,
    Linear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridworldConfig {
    pub name: String,

    // Grid geometry
    pub width: u32,
    pub height: u32,
    pub is_terminal: bool,
    pub period_logging: u64,
    #[serde(default = "default_true")]
    pub allow_multiple_agents_per_tile: bool,

    // Channels
    pub dim_appearance: u32,
    pub list_channels_visual_field: Vec<String>,

    // Sun
    pub period_sun: u32,
    pub method_sun: SunMethod,
    pub radius_sun_effect: u32,
    pub radius_sun_perception: u32,

    // Plant dynamics
    pub proportion_plant_initial: f64,
    pub p_base_plant_growth: f64,
    pub p_base_plant_death: f64,
    pub factor_sun_effect: f64,
    pub factor_plant_reproduction: f64,
    pub radius_plant_reproduction: u32,
    pub factor_plant_asphyxia: f64,
    pub radius_plant_asphyxia: u32,

    // Observations and actions
    pub list_observations: Vec<String>,
    pub list_actions: Vec<String>,
    pub vision_range_agent: u32,

    // Agent internal dynamics
    pub age_max: u32,
    pub energy_max: f64,
    pub energy_initial: f64,
    pub energy_loss_idle: f64,
    pub energy_loss_action: f64,
    pub energy_food: f64,
    pub energy_thr_death: f64,
    pub energy_req_reprod: f64,
    pub energy_cost_reprod: f64,
    #[serde(default)]
    pub energy_transfer_loss: Option<f64>,
    #[serde(default)]
    pub energy_transfer_gain: Option<f64>,
    pub infancy_duration: u32,
    #[serde(default = "default_one")]
    pub infant_move_prob: f64,
    #[serde(default = "default_one")]
    pub infant_eat_prob: f64,
    #[serde(default = "default_one")]
    pub infant_food_energy_mult: f64,

    // Rendering colors
    #[serde(default = "default_background")]
    pub color_background: String,
    #[serde(default = "default_unknown_channel")]
    pub color_unknown_channel: String,

    pub metrics: MetricsConfig,
}

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

fn default_background() -> String {
    "white".to_string()
}

fn default_unknown_channel() -> String {
    "black".to_string()
}

impl GridworldConfig {
    /// Map channel names in layout order: the four fixed channels followed
    /// by one channel per appearance dimension.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = ["sun", "plants", "agents", "agent_ages"]
            .into_iter()
            .map(str::to_string)
            .collect();
        names.extend((0..self.dim_appearance).map(|i| format!("appearance_{i}")));
        names
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channel_names().iter().position(|n| n == name)
    }

    pub fn n_channels(&self) -> usize {
        4 + self.dim_appearance as usize
    }

    pub fn n_tiles(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Energy a transferring agent gives up, falling back to `energy_food`.
    pub fn energy_transfer_loss(&self) -> f64 {
        self.energy_transfer_loss.unwrap_or(self.energy_food)
    }

    /// Energy the receiving agent gains, falling back to `energy_food`.
    pub fn energy_transfer_gain(&self) -> f64 {
        self.energy_transfer_gain.unwrap_or(self.energy_food)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const GRIDWORLD_YAML: &str = r#"
name: gridworld
width: 10
height: 8
is_terminal: true
period_logging: 5
dim_appearance: 2
list_channels_visual_field: [plants, agents]
period_sun: 100
method_sun: brownian
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
list_actions: [forward, left, right, eat, idle]
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
    environmental: [n_agents, n_plants]
    immediate: [do_action_eat]
    state: [energy, age]
    behavior: []
  aggregators_lifespan: []
  aggregators_population: []
  config_video:
    do_video: false
    n_steps_per_video: 100
    fps_video: 20
    dir_videos: logs/videos
    height_max_video: 500
    width_max_video: 500
"#;

    #[test]
    fn channel_layout_follows_appearance_dims() {
        let config: GridworldConfig = serde_yaml::from_str(GRIDWORLD_YAML).unwrap();
        assert_eq!(
            config.channel_names(),
            ["sun", "plants", "agents", "agent_ages", "appearance_0", "appearance_1"]
        );
        assert_eq!(config.channel_index("plants"), Some(1));
        assert_eq!(config.channel_index("appearance_1"), Some(5));
        assert_eq!(config.channel_index("lava"), None);
        assert_eq!(config.n_channels(), 6);
    }

    #[test]
    fn transfer_energy_falls_back_to_energy_food() {
        let mut config: GridworldConfig = serde_yaml::from_str(GRIDWORLD_YAML).unwrap();
        assert_eq!(config.energy_transfer_loss(), 10.0);
        assert_eq!(config.energy_transfer_gain(), 10.0);
        config.energy_transfer_loss = Some(4.0);
        assert_eq!(config.energy_transfer_loss(), 4.0);
    }

    #[test]
    fn optional_knobs_have_defaults() {
        let config: GridworldConfig = serde_yaml::from_str(GRIDWORLD_YAML).unwrap();
        assert!(config.allow_multiple_agents_per_tile);
        assert_eq!(config.infant_move_prob, 1.0);
        assert_eq!(config.color_background, "white");
        assert_eq!(config.method_sun, SunMethod::Brownian);
    }

    #[test]
    fn color_tags_resolve() {
        assert_eq!(color_tag_to_rgb("green"), Some([0.0, 1.0, 0.0]));
        assert_eq!(color_tag_to_rgb("chartreuse"), None);
    }
}
