//! Fixed-timestep simulation loop.
//!
//! Each tick runs the same stages over the registry:
//!
//! 1. Integrate every `(Transform, Velocity)` pair.
//! 2. Decay every `Health` and collect entities that reached zero.
//! 3. Destroy the collected entities.
//! 4. Count `(Transform, ModelRef)` pairs as the renderable set.

use std::time::{Duration, Instant};

use engine_ecs::{Entity, Registry, Result};
use glam::Vec3;
use tracing::{debug, info, warn};

use crate::components::{Health, ModelRef, Transform, Velocity};
use crate::config::{SimConfig, TickConfig};

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick counter after this tick.
    pub tick_id: u64,
    /// Entities whose transform was integrated.
    pub moved: usize,
    /// Entities destroyed because their health ran out.
    pub died: usize,
    /// Entities with both a transform and a model.
    pub renderable: usize,
}

/// The simulation's tick loop state.
#[derive(Debug)]
pub struct TickLoop {
    tick_id: u64,
    config: TickConfig,
    health_decay: f32,
    registry: Registry,
}

impl TickLoop {
    /// Create a tick loop over an empty registry.
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        Self::with_registry(config, Registry::new())
    }

    /// Create a tick loop over an existing registry, e.g. one just loaded
    /// from a snapshot.
    #[must_use]
    pub fn with_registry(config: &SimConfig, registry: Registry) -> Self {
        Self {
            tick_id: 0,
            config: config.tick.clone(),
            health_decay: config.health_decay,
            registry,
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns a reference to the registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns a mutable reference to the registry.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Consume the loop, returning its registry.
    #[must_use]
    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Spawn `count` entities with a deterministic spread of components.
    ///
    /// Every entity gets a transform, velocity and health. Even-numbered
    /// spawns also get a model. Health ranges over ten tiers so entities die
    /// at different ticks.
    ///
    /// # Errors
    ///
    /// Propagates registry errors, which only occur on a logic bug.
    pub fn spawn_population(&mut self, count: u32) -> Result<Vec<Entity>> {
        let mut spawned = Vec::with_capacity(count as usize);
        for i in 0..count {
            let entity = self.registry.create();
            let lane = (i % 3) as f32;
            self.registry.add_component(
                entity,
                Transform::from_position(Vec3::new(i as f32, 0.0, lane)),
            )?;
            self.registry
                .add_component(entity, Velocity::new(1.0, 0.0, lane - 1.0))?;
            self.registry
                .add_component(entity, Health::full(5.0 + (i % 10) as f32 * 5.0))?;
            if i % 2 == 0 {
                self.registry
                    .add_component(entity, ModelRef::new(format!("models/unit_{}.glb", i % 4)))?;
            }
            spawned.push(entity);
        }
        info!(count, alive = self.registry.entity_count(), "spawned population");
        Ok(spawned)
    }

    /// Run one tick with timestep `dt` seconds.
    ///
    /// # Errors
    ///
    /// Propagates registry errors from destroying dead entities.
    pub fn tick(&mut self, dt: f32) -> Result<TickReport> {
        self.tick_id += 1;

        let mut moved = 0;
        for (_, (transform, velocity)) in self.registry.view::<(Transform, Velocity)>() {
            transform.position += velocity.linear * dt;
            moved += 1;
        }

        let decay = self.health_decay * dt;
        let mut dead = Vec::new();
        for (entity, (health,)) in self.registry.view::<(Health,)>() {
            health.damage(decay);
            if !health.is_alive() {
                dead.push(entity);
            }
        }
        for &entity in &dead {
            self.registry.destroy(entity)?;
        }

        let renderable = self.registry.view::<(Transform, ModelRef)>().count();

        debug!(
            tick_id = self.tick_id,
            dt,
            moved,
            died = dead.len(),
            renderable,
            "tick complete"
        );

        Ok(TickReport {
            tick_id: self.tick_id,
            moved,
            died: dead.len(),
            renderable,
        })
    }

    /// Run the configured number of ticks, returning the last report.
    ///
    /// With `realtime` set the loop sleeps to hold the tick rate and warns
    /// when a tick overruns its budget.
    ///
    /// # Errors
    ///
    /// Fails up front on an unusable tick rate, then stops at the first tick
    /// that fails.
    pub fn run(&mut self) -> anyhow::Result<TickReport> {
        self.config.validate()?;
        let tick_duration = Duration::from_secs_f64(1.0 / self.config.tick_rate);
        let dt = self.config.dt();
        let mut last = TickReport {
            tick_id: self.tick_id,
            ..TickReport::default()
        };

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            realtime = self.config.realtime,
            "starting tick loop"
        );

        for _ in 0..self.config.max_ticks {
            let start = Instant::now();
            last = self.tick(dt)?;

            if !self.config.realtime {
                continue;
            }
            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }

        info!(
            ticks = self.tick_id,
            alive = self.registry.entity_count(),
            "tick loop complete"
        );
        Ok(last)
    }
}
