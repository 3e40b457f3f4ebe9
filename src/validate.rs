//! Structural validation of a resolved experiment configuration.
//!
//! Everything here is a static check on the value records: referential
//! integrity between aggregator specs and the measure catalogue, population
//! bounds, video scheduling arithmetic, and gridworld parameter sanity.

use crate::aggregators::{AggregatorRegistry, AggregatorScope};
use crate::config::env::{color_tag_to_rgb, GridworldConfig};
use crate::config::ExperimentConfig;
use crate::metrics::AggregatorSpec;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "error: {error}")?;
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {warning}")?;
        }
        Ok(())
    }
}

pub fn validate_experiment(config: &ExperimentConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_budgets(config, &mut report);
    check_population(config, &mut report);
    check_video(config, &mut report);
    check_env(&config.env, &mut report);
    check_metrics(config, &mut report);
    report
}

fn check_budgets(config: &ExperimentConfig, report: &mut ValidationReport) {
    if config.n_timesteps == 0 {
        report.error("n_timesteps must be at least 1");
    }
    if config.period_eval == 0 {
        report.error("period_eval must be at least 1");
    }
    if config.period_video == 0 {
        report.error("period_video must be at least 1");
    }
}

fn check_population(config: &ExperimentConfig, report: &mut ValidationReport) {
    if config.n_agents_max == 0 {
        report.error("n_agents_max must be at least 1");
    }
    if config.n_agents_initial > config.n_agents_max {
        report.error(format!(
            "n_agents_initial ({}) must be less than or equal to n_agents_max ({})",
            config.n_agents_initial, config.n_agents_max
        ));
    }
    if config.n_agents_initial == 0 {
        report.warn("n_agents_initial is 0, the world starts empty");
    }
    // Initial placement draws distinct tiles for the whole agent array.
    if u64::from(config.n_agents_max) > config.env.n_tiles() {
        report.error(format!(
            "n_agents_max ({}) exceeds the number of grid tiles ({}x{})",
            config.n_agents_max, config.env.width, config.env.height
        ));
    }
}

fn check_video(config: &ExperimentConfig, report: &mut ValidationReport) {
    let video = &config.env.metrics.config_video;
    if config.do_video {
        if config.n_steps_per_video > config.n_steps_between_videos {
            report.error(format!(
                "n_steps_per_video ({}) must be less than or equal to n_steps_between_videos ({})",
                config.n_steps_per_video, config.n_steps_between_videos
            ));
        }
        if config.n_steps_between_frames == 0 {
            report.error("n_steps_between_frames must be at least 1");
        }
    }
    if video.do_video {
        if video.fps_video == 0 {
            report.error("fps_video must be at least 1");
        }
        // Rendering refuses to downscale.
        if video.height_max_video < config.env.height || video.width_max_video < config.env.width {
            report.error(format!(
                "video bounds ({}x{}) must be at least the grid size ({}x{})",
                video.height_max_video, video.width_max_video, config.env.height, config.env.width
            ));
        }
    }
    if config.do_video != video.do_video {
        report.warn(format!(
            "do_video ({}) and config_video.do_video ({}) disagree",
            config.do_video, video.do_video
        ));
    }
    let channels = config.env.channel_names();
    for channel in video.dict_name_channel_to_color_tag.keys() {
        if !channels.iter().any(|c| c == channel) {
            report.warn(format!(
                "color tag assigned to unknown channel `{channel}`"
            ));
        }
    }
    for (channel, tag) in &video.dict_name_channel_to_color_tag {
        if color_tag_to_rgb(tag).is_none() {
            report.error(format!("unknown color tag `{tag}` for channel `{channel}`"));
        }
    }
}

fn check_env(env: &GridworldConfig, report: &mut ValidationReport) {
    if env.width == 0 || env.height == 0 {
        report.error("grid width and height must be at least 1");
    }
    if env.period_logging == 0 {
        report.error("period_logging must be at least 1");
    }
    if env.list_observations.is_empty() {
        report.error("list_observations must be non-empty");
    }
    if env.list_actions.is_empty() {
        report.error("list_actions must be non-empty");
    }

    let channels = env.channel_names();
    for channel in &env.list_channels_visual_field {
        if !channels.iter().any(|c| c == channel) {
            report.error(format!(
                "visual field references unknown channel `{channel}`"
            ));
        }
    }

    // The engine logit-transforms these, so the open interval is required.
    for (name, p) in [
        ("p_base_plant_growth", env.p_base_plant_growth),
        ("p_base_plant_death", env.p_base_plant_death),
    ] {
        if !(p > 0.0 && p < 1.0) {
            report.error(format!("{name} ({p}) must be strictly between 0 and 1"));
        }
    }
    if !(0.0..=1.0).contains(&env.proportion_plant_initial) {
        report.error(format!(
            "proportion_plant_initial ({}) must be between 0 and 1",
            env.proportion_plant_initial
        ));
    }
    for (name, p) in [
        ("infant_move_prob", env.infant_move_prob),
        ("infant_eat_prob", env.infant_eat_prob),
    ] {
        if !(0.0..=1.0).contains(&p) {
            report.error(format!("{name} ({p}) must be between 0 and 1"));
        }
    }

    if env.energy_thr_death >= env.energy_initial {
        report.error(format!(
            "energy_initial ({}) must be above energy_thr_death ({}), newborns would die instantly",
            env.energy_initial, env.energy_thr_death
        ));
    }
    if env.energy_initial > env.energy_max {
        report.error(format!(
            "energy_initial ({}) must not exceed energy_max ({})",
            env.energy_initial, env.energy_max
        ));
    }
    if env.age_max == 0 {
        report.error("age_max must be at least 1");
    }

    for (name, tag) in [
        ("color_background", &env.color_background),
        ("color_unknown_channel", &env.color_unknown_channel),
    ] {
        if color_tag_to_rgb(tag).is_none() {
            report.error(format!("unknown color tag `{tag}` for {name}"));
        }
    }
}

fn check_metrics(config: &ExperimentConfig, report: &mut ValidationReport) {
    let metrics = &config.env.metrics;

    for name in metrics.measures.duplicates() {
        report.error(format!(
            "measure `{name}` is listed in more than one catalogue entry"
        ));
    }

    // Action measures only make sense for actions the agents can take.
    for name in metrics.measures.all_names() {
        if let Some(action) = name.strip_prefix("do_action_") {
            if !config.env.list_actions.iter().any(|a| a == action) {
                report.error(format!(
                    "measure `{name}` references action `{action}` which is not in list_actions"
                ));
            }
        }
    }

    let mut prefixes = BTreeSet::new();
    let groups = [
        ("aggregators_lifespan", &metrics.aggregators_lifespan, AggregatorScope::Lifespan),
        ("aggregators_population", &metrics.aggregators_population, AggregatorScope::Population),
    ];
    for (group, specs, scope) in groups {
        for spec in specs.iter() {
            check_aggregator(config, group, scope, spec, &mut prefixes, report);
        }
    }
}

fn check_aggregator(
    config: &ExperimentConfig,
    group: &str,
    scope: AggregatorScope,
    spec: &AggregatorSpec,
    prefixes: &mut BTreeSet<String>,
    report: &mut ValidationReport,
) {
    let label = spec.class_name();

    match AggregatorRegistry::global().resolve(&spec.class_string) {
        None => report.error(format!(
            "{group}: unknown aggregator class `{}`",
            spec.class_string
        )),
        Some(class) => {
            if class.scope() != scope {
                report.error(format!(
                    "{group}: `{label}` is a {} aggregator and does not belong in {group}",
                    class.scope()
                ));
            }
            if let Err(e) = class.check(&spec.config) {
                report.error(e.to_string());
            }
        }
    }

    if spec.config.n_agents != config.n_agents_max {
        report.error(format!(
            "{label}: n_agents ({}) must equal n_agents_max ({})",
            spec.config.n_agents, config.n_agents_max
        ));
    }

    if !prefixes.insert(spec.config.prefix_metric.clone()) {
        report.error(format!(
            "prefix_metric `{}` is used by more than one aggregator",
            spec.config.prefix_metric
        ));
    }

    for key in &spec.config.keys_measures {
        if !config.env.metrics.measures.contains(key) {
            report.error(format!(
                "{label}: keys_measures entry `{key}` is not in the measure catalogue"
            ));
        }
    }
}
