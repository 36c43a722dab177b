//! Simulation configuration.

use std::path::PathBuf;

use anyhow::{Result, ensure};

/// Configuration for the tick loop's pacing.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Number of ticks to run.
    pub max_ticks: u64,
    /// Sleep between ticks to hold `tick_rate` instead of running flat out.
    pub realtime: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 600,
            realtime: false,
        }
    }
}

impl TickConfig {
    /// Rejects tick rates that cannot produce a finite timestep.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.tick_rate.is_finite() && self.tick_rate > 0.0,
            "tick rate must be a positive finite number, got {}",
            self.tick_rate
        );
        Ok(())
    }

    /// Fixed timestep in seconds.
    #[must_use]
    pub fn dt(&self) -> f32 {
        (1.0 / self.tick_rate) as f32
    }
}

/// Configuration for one simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Entities spawned at startup.
    pub entities: u32,
    /// Health lost per second by every entity.
    pub health_decay: f32,
    /// Tick loop pacing.
    pub tick: TickConfig,
    /// Where to write the final world snapshot, if anywhere.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            entities: 1_000,
            health_decay: 10.0,
            tick: TickConfig::default(),
            snapshot_path: None,
        }
    }
}

impl SimConfig {
    /// Override the spawned population.
    #[must_use]
    pub fn with_entities(mut self, entities: u32) -> Self {
        self.entities = entities;
        self
    }

    /// Override the tick loop pacing.
    #[must_use]
    pub fn with_tick(mut self, tick: TickConfig) -> Self {
        self.tick = tick;
        self
    }

    /// Override the per-second health decay.
    #[must_use]
    pub fn with_health_decay(mut self, decay: f32) -> Self {
        self.health_decay = decay;
        self
    }

    /// Checks the whole configuration before a run.
    pub fn validate(&self) -> Result<()> {
        self.tick.validate()?;
        ensure!(
            self.health_decay.is_finite() && self.health_decay >= 0.0,
            "health decay must be a non-negative finite number, got {}",
            self.health_decay
        );
        Ok(())
    }

    /// Write a snapshot to `path` when the run ends.
    #[must_use]
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let config = SimConfig::default()
            .with_entities(5)
            .with_health_decay(1.5)
            .with_snapshot_path("world.bin");
        assert_eq!(config.entities, 5);
        assert_eq!(config.health_decay, 1.5);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("world.bin")));
    }

    #[test]
    fn test_invalid_tick_rates_are_rejected() {
        for tick_rate in [0.0, -30.0, f64::NAN, f64::INFINITY] {
            let tick = TickConfig {
                tick_rate,
                ..TickConfig::default()
            };
            assert!(tick.validate().is_err(), "accepted {tick_rate}");
            assert!(SimConfig::default().with_tick(tick).validate().is_err());
        }
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_negative_health_decay_is_rejected() {
        assert!(SimConfig::default().with_health_decay(-1.0).validate().is_err());
    }

    #[test]
    fn test_dt_from_tick_rate() {
        let tick = TickConfig {
            tick_rate: 50.0,
            ..TickConfig::default()
        };
        assert!((tick.dt() - 0.02).abs() < f32::EPSILON);
    }
}
