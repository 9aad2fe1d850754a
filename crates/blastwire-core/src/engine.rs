//! Network engine - main entry point for a map's detonation network

use hecs::{DynamicBundle, Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::components::*;
use crate::config::NetworkSettings;
use crate::error::{NetworkError, NetworkResult};
use crate::grid::{GridQuery, MapGrid};
use crate::scheduler::{DelayScheduler, ScheduledCommand};
use crate::systems::*;

/// What firing a trigger source did
#[derive(Debug, Clone)]
pub enum FireOutcome {
    Wired(SignalReport),
    Wireless(TriggerOutcome),
}

impl FireOutcome {
    /// Receivers that will get the signal
    pub fn target_count(&self) -> usize {
        match self {
            FireOutcome::Wired(report) => report.arm_requests.len(),
            FireOutcome::Wireless(outcome) => outcome.delivery_count(),
        }
    }
}

/// Detonation network for one map
pub struct NetworkEngine {
    /// ECS world containing all placed devices
    pub world: World,
    pub(crate) grid: MapGrid,
    pub(crate) scheduler: DelayScheduler,
    pub(crate) settings: NetworkSettings,
    pub(crate) tick: u64,
    /// Adjacency epoch, bumped when a wireless node leaves or moves
    pub(crate) epoch: u64,
    events: EventLog,
    rng: StdRng,
}

impl NetworkEngine {
    /// Create an empty map with default settings
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_settings(width, height, NetworkSettings::default())
    }

    pub fn with_settings(width: i32, height: i32, settings: NetworkSettings) -> Self {
        Self::build(width, height, settings, StdRng::from_entropy())
    }

    /// Reproducible engine: same seed, same signal ids and failure rolls
    pub fn with_seed(width: i32, height: i32, settings: NetworkSettings, seed: u64) -> Self {
        Self::build(width, height, settings, StdRng::seed_from_u64(seed))
    }

    fn build(width: i32, height: i32, settings: NetworkSettings, rng: StdRng) -> Self {
        Self {
            world: World::new(),
            grid: MapGrid::new(width, height),
            scheduler: DelayScheduler::new(),
            settings: settings.validated(),
            tick: 0,
            epoch: 0,
            events: EventLog::new(),
            rng,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn settings(&self) -> &NetworkSettings {
        &self.settings
    }

    pub fn grid(&self) -> &MapGrid {
        &self.grid
    }

    pub fn scheduler(&self) -> &DelayScheduler {
        &self.scheduler
    }

    pub fn events(&self) -> &[NetworkEvent] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<NetworkEvent> {
        self.events.drain()
    }

    pub fn clock(&self) -> GraphClock {
        GraphClock {
            now: self.tick,
            epoch: self.epoch,
            recache_interval: self.settings.recache_interval_ticks,
        }
    }

    // ── Placement ──────────────────────────────────────────────────────

    /// Place a device built from `bundle` at `cell`
    pub fn place(&mut self, cell: Cell, bundle: impl DynamicBundle) -> NetworkResult<Entity> {
        if !self.grid.in_bounds(cell) {
            return Err(NetworkError::OutOfBounds(cell));
        }
        let entity = self.world.spawn(bundle);
        self.world
            .insert_one(entity, Position { cell })
            .map_err(|_| NetworkError::NoSuchEntity(entity))?;
        self.grid.insert(cell, entity);
        Ok(entity)
    }

    pub fn place_wire(&mut self, cell: Cell) -> NetworkResult<Entity> {
        let conductor = Conductor::transmitter(self.settings.wired_delay_per_step);
        self.place(cell, (conductor, Label::new("wire")))
    }

    pub fn place_crossing(&mut self, cell: Cell) -> NetworkResult<Entity> {
        let conductor = Conductor::crossing(self.settings.wired_delay_per_step);
        self.place(cell, (conductor, Label::new("wire crossing")))
    }

    /// Charge that only answers wireless triggers
    pub fn place_charge(&mut self, cell: Cell, channel: u32) -> NetworkResult<Entity> {
        let channel = self.checked_channel(channel);
        self.place(cell, (RemoteCharge::new(channel), Label::new("remote charge")))
    }

    /// Charge hooked into the conductor network as well
    pub fn place_wired_charge(&mut self, cell: Cell, channel: u32) -> NetworkResult<Entity> {
        let channel = self.checked_channel(channel);
        let conductor = Conductor::receiver(self.settings.wired_delay_per_step);
        self.place(
            cell,
            (RemoteCharge::new(channel), conductor, Label::new("remote charge")),
        )
    }

    pub fn place_switch(&mut self, cell: Cell, channel: u32, on: bool) -> NetworkResult<Entity> {
        let channel = self.checked_channel(channel);
        self.place(cell, (RemoteSwitch::new(channel, on), Label::new("remote switch")))
    }

    /// Stand-alone relay node
    pub fn place_node(&mut self, cell: Cell, def: WirelessNodeDef) -> NetworkResult<Entity> {
        self.place_wireless(cell, def, (Label::new("wireless node"),))
    }

    /// Manual detonator lever, fires into the wires under it
    pub fn place_detonator(&mut self, cell: Cell) -> NetworkResult<Entity> {
        self.place(
            cell,
            (
                Conductor::sender(),
                TriggerSource::new(TriggerKind::ManualDetonator, 1),
                Label::new("manual detonator"),
            ),
        )
    }

    pub fn place_table(
        &mut self,
        cell: Cell,
        def: WirelessNodeDef,
        channel: u32,
    ) -> NetworkResult<Entity> {
        let channel = self.checked_channel(channel);
        self.place_wireless(
            cell,
            def,
            (
                TriggerSource::new(TriggerKind::DetonatorTable, channel),
                Label::new("detonator table"),
            ),
        )
    }

    pub fn place_sensor(
        &mut self,
        cell: Cell,
        def: WirelessNodeDef,
        detection_radius: f32,
        channel: u32,
    ) -> NetworkResult<Entity> {
        let channel = self.checked_channel(channel);
        self.place_wireless(
            cell,
            def,
            (
                TriggerSource::new(TriggerKind::ProximitySensor, channel),
                ProximitySensor::new(detection_radius),
                Label::new("proximity sensor"),
            ),
        )
    }

    /// Portable detonator: always a wireless endpoint
    pub fn place_portable(&mut self, cell: Cell, radius: f32, channel: u32) -> NetworkResult<Entity> {
        let channel = self.checked_channel(channel);
        self.place_wireless(
            cell,
            WirelessNodeDef::endpoint(radius),
            (
                TriggerSource::new(TriggerKind::PortableDetonator, channel),
                Label::new("portable detonator"),
            ),
        )
    }

    fn place_wireless(
        &mut self,
        cell: Cell,
        def: WirelessNodeDef,
        extra: impl DynamicBundle,
    ) -> NetworkResult<Entity> {
        if def.is_inert() {
            log::warn!(
                "wireless node at {} has no usable signal radius ({}), it will never connect",
                cell,
                def.radius
            );
        }
        let entity = self.place(cell, extra)?;
        self.world
            .insert(entity, (WirelessNode::new(def), AdjacencyCache::default()))
            .map_err(|_| NetworkError::NoSuchEntity(entity))?;
        Ok(entity)
    }

    fn checked_channel(&self, channel: u32) -> u32 {
        let clamped = self.settings.clamp_channel(channel);
        if clamped != channel {
            log::warn!(
                "channel {} outside 1..={}, using {}",
                channel,
                self.settings.channel_count,
                clamped
            );
        }
        clamped
    }

    /// Remove a device. Its pending deliveries go with it.
    pub fn remove(&mut self, entity: Entity) -> NetworkResult<()> {
        let cell = self.position_of(entity)?;
        let was_node = self.world.get::<&WirelessNode>(entity).is_ok();
        self.grid.remove(cell, entity);
        let cancelled = self.scheduler.cancel_owner(entity);
        if cancelled > 0 {
            log::debug!("cancelled {} pending deliveries owned by {:?}", cancelled, entity);
        }
        self.world
            .despawn(entity)
            .map_err(|_| NetworkError::NoSuchEntity(entity))?;
        if was_node {
            self.epoch += 1;
        }
        Ok(())
    }

    /// Move a device to another cell (portable units)
    pub fn move_device(&mut self, entity: Entity, to: Cell) -> NetworkResult<()> {
        if !self.grid.in_bounds(to) {
            return Err(NetworkError::OutOfBounds(to));
        }
        let from = self.position_of(entity)?;
        if from == to {
            return Ok(());
        }
        if let Ok(mut pos) = self.world.get::<&mut Position>(entity) {
            pos.cell = to;
        }
        self.grid.remove(from, entity);
        self.grid.insert(to, entity);
        if self.world.get::<&WirelessNode>(entity).is_ok() {
            self.epoch += 1;
        }
        Ok(())
    }

    fn position_of(&self, entity: Entity) -> NetworkResult<Cell> {
        self.world
            .get::<&Position>(entity)
            .map(|p| p.cell)
            .map_err(|_| NetworkError::NoSuchEntity(entity))
    }

    // ── Setters used by the UI and power layers ────────────────────────

    fn with_node<T>(
        &self,
        node: Entity,
        f: impl FnOnce(&mut WirelessNode) -> T,
    ) -> NetworkResult<T> {
        if !self.world.contains(node) {
            return Err(NetworkError::NoSuchEntity(node));
        }
        let mut wireless = self
            .world
            .get::<&mut WirelessNode>(node)
            .map_err(|_| NetworkError::MissingComponent {
                entity: node,
                component: "WirelessNode",
            })?;
        Ok(f(&mut *wireless))
    }

    pub fn set_powered(&mut self, node: Entity, powered: bool) -> NetworkResult<()> {
        self.with_node(node, |n| n.powered = powered)
    }

    pub fn set_enabled(&mut self, node: Entity, enabled: bool) -> NetworkResult<()> {
        self.with_node(node, |n| n.enabled = enabled)
    }

    /// Retune a trigger source or receiver
    pub fn set_channel(&mut self, entity: Entity, channel: u32) -> NetworkResult<u32> {
        if !self.world.contains(entity) {
            return Err(NetworkError::NoSuchEntity(entity));
        }
        let channel = self.checked_channel(channel);
        if let Ok(mut trigger) = self.world.get::<&mut TriggerSource>(entity) {
            trigger.channel = channel;
            return Ok(channel);
        }
        if set_receiver_channel(&self.world, entity, channel) {
            return Ok(channel);
        }
        Err(NetworkError::MissingComponent {
            entity,
            component: "channel",
        })
    }

    /// Arm or disarm a charge or a proximity sensor
    pub fn set_armed(&mut self, device: Entity, armed: bool) -> NetworkResult<()> {
        if !self.world.contains(device) {
            return Err(NetworkError::NoSuchEntity(device));
        }
        if set_armed(&self.world, device, armed) || set_sensor_armed(&self.world, device, armed) {
            Ok(())
        } else {
            Err(NetworkError::MissingComponent {
                entity: device,
                component: "RemoteCharge or ProximitySensor",
            })
        }
    }

    /// Set how wet a conductor is (rain, flooding)
    pub fn set_wetness(&mut self, conductor: Entity, value: f32) -> NetworkResult<()> {
        if self.world.get::<&Conductor>(conductor).is_err() {
            return Err(NetworkError::MissingComponent {
                entity: conductor,
                component: "Conductor",
            });
        }
        self.world
            .insert_one(conductor, Wetness::new(value))
            .map_err(|_| NetworkError::NoSuchEntity(conductor))
    }

    // ── Wired network ──────────────────────────────────────────────────

    /// Flood a fresh signal from `origin` through the conductors there
    pub fn send_signal(&mut self, origin: Cell) -> NetworkResult<SignalReport> {
        if !self.grid.in_bounds(origin) {
            return Err(NetworkError::OutOfBounds(origin));
        }
        let signal = new_signal_id(&mut self.rng);
        let report = {
            let mut gate = WetnessTest {
                rng: &mut self.rng,
                chance_when_soaked: self.settings.wet_failure_chance,
            };
            propagate_signal(
                &self.world,
                &self.grid,
                origin,
                signal,
                self.settings.max_signal_steps,
                &mut gate,
            )
        };

        for request in &report.arm_requests {
            self.scheduler.schedule(
                ScheduledCommand::StartWick {
                    target: request.receiver,
                },
                self.tick,
                request.delay,
                request.receiver,
            );
        }

        let failures = resolve_failures(
            &self.world,
            &report.failed,
            &mut self.rng,
            self.settings.wet_fire_chance,
        );
        for failure in failures {
            self.events.push(NetworkEvent::ConductorFailed { cell: failure.cell });
            if failure.ignited {
                self.events.push(NetworkEvent::FireStarted { cell: failure.cell });
            }
            self.remove(failure.conductor)?;
        }

        log::info!(
            "wired signal from {} reached {} conductors, arming {}",
            origin,
            report.conductors_reached,
            report.arm_requests.len()
        );
        Ok(report)
    }

    // ── Wireless network ───────────────────────────────────────────────

    fn require_node(&self, node: Entity) -> NetworkResult<()> {
        if !self.world.contains(node) {
            return Err(NetworkError::NoSuchEntity(node));
        }
        if self.world.get::<&WirelessNode>(node).is_err() {
            return Err(NetworkError::MissingComponent {
                entity: node,
                component: "WirelessNode",
            });
        }
        Ok(())
    }

    pub fn get_adjacent_nodes(&self, node: Entity) -> NetworkResult<Vec<Entity>> {
        self.require_node(node)?;
        Ok(get_adjacent_nodes(&self.world, node, &self.clock()))
    }

    pub fn get_reachable_nodes(&self, start: Entity) -> NetworkResult<Vec<Entity>> {
        self.require_node(start)?;
        Ok(get_reachable_nodes(&self.world, start, &self.clock()))
    }

    pub fn get_all_links(&self, start: Entity) -> NetworkResult<Vec<NetworkLink>> {
        self.require_node(start)?;
        Ok(get_all_links(&self.world, start, &self.clock()))
    }

    pub fn find_receivers_in_network_range(
        &self,
        start: Entity,
    ) -> NetworkResult<Vec<RelayedReceiver>> {
        self.require_node(start)?;
        Ok(find_receivers_in_network_range(&self.world, start, &self.clock()))
    }

    pub fn population_by_channel(
        &self,
        origin: Entity,
    ) -> NetworkResult<std::collections::BTreeMap<u32, Vec<ReceiverInfo>>> {
        self.require_node(origin)?;
        Ok(population_by_channel(&self.world, origin, &self.clock()))
    }

    /// Tooltip lines for a node's reachable receivers
    pub fn channel_summary(&self, origin: Entity) -> NetworkResult<Vec<String>> {
        Ok(channel_summary(&self.population_by_channel(origin)?))
    }

    /// Schedule delivery to ready receivers on `channel` reachable from
    /// `origin`. Deliveries are cancelled if `owner` is removed first.
    pub fn trigger_receivers(
        &mut self,
        origin: Entity,
        channel: u32,
        owner: Entity,
    ) -> NetworkResult<TriggerOutcome> {
        self.require_node(origin)?;
        let clock = self.clock();
        let outcome = trigger_receivers(
            &self.world,
            &mut self.scheduler,
            origin,
            channel,
            owner,
            &clock,
            self.settings.wireless_step_delay_ticks,
        );
        match &outcome {
            TriggerOutcome::NoTargets => {
                log::info!("no receivers on channel {} reachable from {:?}", channel, origin);
                self.events.push(NetworkEvent::NoTargets {
                    source: origin,
                    channel,
                });
            }
            TriggerOutcome::Scheduled(deliveries) => {
                log::info!(
                    "channel {} from {:?}: {} deliveries scheduled",
                    channel,
                    origin,
                    deliveries.len()
                );
            }
        }
        Ok(outcome)
    }

    // ── Trigger sources ────────────────────────────────────────────────

    /// Flag a source for a colonist to go and fire
    pub fn request_fire(&mut self, source: Entity) -> NetworkResult<()> {
        set_fire_request(&self.world, source, true)
    }

    pub fn cancel_fire_request(&mut self, source: Entity) -> NetworkResult<()> {
        set_fire_request(&self.world, source, false)
    }

    pub fn pending_fire_requests(&self) -> Vec<Entity> {
        pending_fire_requests(&self.world)
    }

    /// Fire a trigger source into whichever network it is part of
    pub fn fire(&mut self, source: Entity) -> NetworkResult<FireOutcome> {
        let route = fire_route(&self.world, source)?;
        set_fire_request(&self.world, source, false)?;
        match route {
            FireRoute::Wired { origin } => Ok(FireOutcome::Wired(self.send_signal(origin)?)),
            FireRoute::Wireless { channel } => Ok(FireOutcome::Wireless(
                self.trigger_receivers(source, channel, source)?,
            )),
        }
    }

    /// Feed an intruder position to a sensor; fires it if it trips
    pub fn sensor_detect(
        &mut self,
        sensor: Entity,
        intruder: Cell,
    ) -> NetworkResult<Option<FireOutcome>> {
        let tripped = sensor_trips(
            &self.world,
            sensor,
            intruder,
            self.tick,
            self.settings.sensor_cooldown_ticks,
        )?;
        if !tripped {
            return Ok(None);
        }
        log::info!("sensor {:?} tripped by movement at {}", sensor, intruder);
        self.fire(sensor).map(Some)
    }

    // ── Simulation ─────────────────────────────────────────────────────

    /// Advance one tick: run due deliveries, burn wicks, dry wires
    pub fn update(&mut self) {
        self.tick += 1;
        let now = self.tick;

        let world = &self.world;
        let due = self.scheduler.pop_due(now, |owner| world.contains(owner));
        for command in due {
            let target = command.target();
            match deliver_signal(&self.world, target, now, self.settings.wick_ticks) {
                Some(ReceiveEffect::WickLit { ends_at }) => {
                    self.events.push(NetworkEvent::WickLit {
                        charge: target,
                        ends_at,
                    });
                }
                Some(ReceiveEffect::Toggled { on }) => {
                    self.events.push(NetworkEvent::SwitchToggled { switch: target, on });
                }
                Some(ReceiveEffect::Ignored) => {
                    log::debug!("{:?} ignored {:?}", target, command);
                }
                None => log::debug!("{:?} target is gone", command),
            }
        }

        for (charge, cell) in burned_out_charges(&self.world, now) {
            self.events.push(NetworkEvent::Detonated { charge, cell });
            if let Err(err) = self.remove(charge) {
                log::warn!("could not remove detonated charge: {}", err);
            }
        }

        dry_conductors(&mut self.world, self.settings.wetness_dry_rate);
    }

    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.update();
        }
    }

    pub fn device_count(&self) -> usize {
        self.world.len() as usize
    }

    /// Save network state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), crate::persistence::SaveError> {
        crate::persistence::save_network(writer, self)
    }

    /// Replace this engine's state with a saved one
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), crate::persistence::SaveError> {
        let loaded = crate::persistence::load_network(reader)?;
        self.world = loaded.world;
        self.grid = loaded.grid;
        self.scheduler = loaded.scheduler;
        self.settings = loaded.settings.validated();
        self.tick = loaded.tick;
        self.epoch = loaded.epoch;
        self.events = EventLog::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> NetworkEngine {
        NetworkEngine::with_seed(64, 64, NetworkSettings::default(), 7)
    }

    #[test]
    fn test_out_of_bounds_placement() {
        let mut e = engine();
        assert_eq!(
            e.place_wire(Cell::new(-1, 0)),
            Err(NetworkError::OutOfBounds(Cell::new(-1, 0)))
        );
        assert_eq!(e.device_count(), 0);
    }

    #[test]
    fn test_removing_node_bumps_epoch() {
        let mut e = engine();
        let wire = e.place_wire(Cell::new(1, 1)).unwrap();
        e.remove(wire).unwrap();
        assert_eq!(e.epoch(), 0);

        let node = e.place_node(Cell::new(2, 2), WirelessNodeDef::relay(5.0)).unwrap();
        e.remove(node).unwrap();
        assert_eq!(e.epoch(), 1);
        assert!(e.grid().things_at(Cell::new(2, 2)).is_empty());
        assert_eq!(e.remove(node), Err(NetworkError::NoSuchEntity(node)));
    }

    #[test]
    fn test_channel_clamped() {
        let mut e = engine();
        let charge = e.place_charge(Cell::new(0, 0), 9).unwrap();
        assert_eq!(e.world.get::<&RemoteCharge>(charge).unwrap().channel, 3);
        assert_eq!(e.set_channel(charge, 0), Ok(1));
        let wire = e.place_wire(Cell::new(1, 0)).unwrap();
        assert!(e.set_channel(wire, 2).is_err());
    }

    #[test]
    fn test_node_ops_on_non_node_fail() {
        let mut e = engine();
        let wire = e.place_wire(Cell::new(1, 0)).unwrap();
        assert!(matches!(
            e.get_reachable_nodes(wire),
            Err(NetworkError::MissingComponent { .. })
        ));
        assert!(e.trigger_receivers(wire, 1, wire).is_err());
        assert!(e.set_powered(wire, false).is_err());
    }

    #[test]
    fn test_switch_toggles_through_update() {
        let mut e = engine();
        let table = e
            .place_table(Cell::new(0, 0), WirelessNodeDef::relay(8.0), 2)
            .unwrap();
        let switch = e.place_switch(Cell::new(3, 0), 2, false).unwrap();
        let outcome = e.fire(table).unwrap();
        assert_eq!(outcome.target_count(), 1);

        e.update();
        assert!(e.world.get::<&RemoteSwitch>(switch).unwrap().on);
        assert_eq!(
            e.events(),
            &[NetworkEvent::SwitchToggled { switch, on: true }]
        );
    }

    #[test]
    fn test_wetness_dries() {
        let mut settings = NetworkSettings::default();
        settings.wetness_dry_rate = 0.25;
        let mut e = NetworkEngine::with_seed(8, 8, settings, 1);
        let wire = e.place_wire(Cell::new(0, 0)).unwrap();
        e.set_wetness(wire, 1.0).unwrap();
        e.run_ticks(4);
        assert!(e.world.get::<&Wetness>(wire).unwrap().is_dry());
    }
}
