//! Budgeted gossip: reading and relaying inbound facts, pushing facts to neighbours.
//!
//! Infrastructure nodes act as hubs. They push everything a reachable teammate lacks and
//! relay flagged news to the whole team, at most once per cooldown window. Mobile agents send
//! one message per tick to the nearest hub, most urgent facts first.

use poi_protocol::{
    decode_unit, unpack, AgentId, Cell, MessageBuilder, Role, Source, Symmetry, SymmetrySet,
    WireUnit,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::rng::{scale_below, shuffle};
use crate::world::{AllyInfo, Message, WorldMut};
use crate::{CoreError, FactRef, FactStore, Observation, ProtocolConfig, RelayLimiter, SendError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub messages_read: u32,
    pub units_applied: u32,
    pub relayed_units: u32,
    pub relay_broadcasts: u32,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendStats {
    pub messages_sent: u32,
    pub units_sent: u32,
    pub refused: u32,
    pub truncated: bool,
}

/// Relay-flagged units waiting for a broadcast.
struct RelayWindow {
    slot: Option<usize>,
    buffer: MessageBuilder,
    capacity: usize,
}

impl RelayWindow {
    fn closed(capacity: usize) -> Self {
        Self {
            slot: None,
            buffer: MessageBuilder::new(),
            capacity,
        }
    }

    fn is_open(&self) -> bool {
        self.slot.is_some()
    }

    fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity
    }
}

#[derive(Debug, Clone)]
pub struct GossipScheduler {
    limiter: RelayLimiter,
    /// Messages emitted this tick, relay broadcasts included.
    emitted: u32,
}

impl GossipScheduler {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            limiter: RelayLimiter::new(config.max_facts, config.relay_cooldown_rounds),
            emitted: 0,
        }
    }

    pub fn limiter(&self) -> &RelayLimiter {
        &self.limiter
    }

    /// Messages emitted since the last [`ingest`](Self::ingest).
    pub fn emitted(&self) -> u32 {
        self.emitted
    }

    /// Applies last round's messages to `store`, relaying flagged news when this node's
    /// window is open.
    ///
    /// Stops reading once the budget drops below `ingest_budget_floor`. Only a full
    /// registry is an error; malformed units are skipped.
    pub fn ingest<W: WorldMut + ?Sized>(
        &mut self,
        config: &ProtocolConfig,
        store: &mut FactStore,
        world: &mut W,
    ) -> Result<IngestStats, CoreError> {
        self.emitted = 0;
        let mut stats = IngestStats::default();
        let mut window = self.open_relay_window(config, store, world);
        if window.is_full() {
            self.flush_relay(config, world, &mut window, &mut stats);
        }

        for message in world.read_messages() {
            if world.budget_left() < config.ingest_budget_floor {
                debug!(
                    budget = world.budget_left(),
                    read = stats.messages_read,
                    "ingest truncated"
                );
                stats.truncated = true;
                break;
            }
            stats.messages_read += 1;
            let (first, second) = unpack(message.bytes);
            for unit in std::iter::once(first).chain(second) {
                self.apply_unit(config, store, world, &mut window, &mut stats, message, unit)?;
            }
        }

        self.flush_relay(config, world, &mut window, &mut stats);
        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_unit<W: WorldMut + ?Sized>(
        &mut self,
        config: &ProtocolConfig,
        store: &mut FactStore,
        world: &mut W,
        window: &mut RelayWindow,
        stats: &mut IngestStats,
        message: Message,
        unit: u16,
    ) -> Result<(), CoreError> {
        let source = Source::Peer(message.sender);
        match decode_unit(unit) {
            WireUnit::Symmetry(claim) => {
                for sym in Symmetry::ALL {
                    if !claim.contains(sym) {
                        store.invalidate_symmetry(source, sym);
                    }
                }
                if claim == store.symmetry().valid {
                    store.mark_known(FactRef::Symmetry, message.sender);
                }
                stats.units_applied += 1;
            }
            WireUnit::Tower {
                cell,
                structure,
                relay,
            } => {
                let observation = match store.observe(source, cell, structure) {
                    Ok(observation) => observation,
                    Err(CoreError::OffMap { .. }) => {
                        warn!(sender = %message.sender, %cell, "dropping unit outside the map");
                        return Ok(());
                    }
                    Err(err) => return Err(err),
                };
                stats.units_applied += 1;
                let news = !matches!(observation, Observation::Unchanged { .. });
                if relay && news && window.is_open() {
                    trace!(%cell, "queueing unit for relay");
                    window.buffer.push(unit);
                    stats.relayed_units += 1;
                    if window.is_full() {
                        self.flush_relay(config, world, window, stats);
                    }
                }
            }
        }
        Ok(())
    }

    fn open_relay_window<W: WorldMut + ?Sized>(
        &self,
        config: &ProtocolConfig,
        store: &FactStore,
        world: &W,
    ) -> RelayWindow {
        let mut window = RelayWindow::closed(config.relay_buffer_units);
        if !world.role().is_infrastructure() {
            return window;
        }
        let Some(slot) = store.slot_of(world.location()) else {
            return window;
        };
        if !self.limiter.ready(slot, world.round()) {
            return window;
        }
        window.slot = Some(slot);
        if config.announce_self {
            if let Some(record) = store.fact(slot) {
                window.buffer.push(record.unit(true));
            }
        }
        window
    }

    /// Broadcasts whatever the window holds and closes it.
    fn flush_relay<W: WorldMut + ?Sized>(
        &mut self,
        config: &ProtocolConfig,
        world: &mut W,
        window: &mut RelayWindow,
        stats: &mut IngestStats,
    ) {
        let Some(slot) = window.slot.take() else {
            return;
        };
        let Some(message) = window.buffer.take() else {
            return;
        };
        if self.emitted >= config.message_quota {
            debug!("relay skipped, quota spent");
            return;
        }
        if !self.limiter.try_acquire(slot, world.round()) {
            return;
        }
        match world.broadcast(message) {
            Ok(()) => {
                self.emitted += 1;
                stats.relay_broadcasts += 1;
                debug!(slot, round = world.round(), "relay broadcast");
            }
            Err(err) => warn!(%err, "relay broadcast refused"),
        }
    }

    /// Pushes facts to neighbours according to this agent's role.
    pub fn disseminate<W: WorldMut + ?Sized>(
        &mut self,
        config: &ProtocolConfig,
        store: &mut FactStore,
        world: &mut W,
    ) -> SendStats {
        match world.role() {
            Role::Infrastructure => self.disseminate_hub(config, store, world),
            Role::Mobile => self.disseminate_mobile(config, store, world),
        }
    }

    fn disseminate_hub<W: WorldMut + ?Sized>(
        &mut self,
        config: &ProtocolConfig,
        store: &mut FactStore,
        world: &mut W,
    ) -> SendStats {
        let floor = config.tower_send_budget_floor;
        let mut stats = SendStats::default();
        if world.budget_left() < floor {
            stats.truncated = true;
            return stats;
        }

        let mut allies = world.nearby_allies();
        shuffle(&mut allies, |bound| scale_below(world.rand_u32(), bound));

        'allies: for ally in &allies {
            if self.emitted >= config.message_quota {
                break;
            }
            if !world.can_send(ally.cell) {
                continue;
            }
            // A tower already holds the fact about itself.
            let skip = ally.role.is_infrastructure().then_some(ally.cell);
            let pending = unknown_facts(store, ally.id, skip);
            for chunk in pending.chunks(MessageBuilder::CAPACITY) {
                if self.emitted >= config.message_quota {
                    break 'allies;
                }
                if world.budget_left() < floor {
                    debug!(to = %ally.id, "hub dissemination truncated");
                    stats.truncated = true;
                    break 'allies;
                }
                match self.send_facts(store, world, ally, chunk) {
                    Ok(units) => {
                        stats.messages_sent += 1;
                        stats.units_sent += units;
                    }
                    Err(err) => {
                        debug!(to = %ally.id, %err, "send refused");
                        stats.refused += 1;
                        continue 'allies;
                    }
                }
            }
        }
        stats
    }

    fn disseminate_mobile<W: WorldMut + ?Sized>(
        &mut self,
        config: &ProtocolConfig,
        store: &mut FactStore,
        world: &mut W,
    ) -> SendStats {
        let mut stats = SendStats::default();
        if world.budget_left() < config.mobile_send_budget_floor {
            stats.truncated = true;
            return stats;
        }

        let here = world.location();
        let target = world
            .nearby_allies()
            .into_iter()
            .filter(|ally| ally.role.is_infrastructure() && world.can_send(ally.cell))
            .min_by_key(|ally| (ally.cell.distance_squared(here), ally.id));
        let Some(target) = target else {
            return stats;
        };

        let facts = mobile_selection(config, store, &target);
        if facts.is_empty() {
            return stats;
        }
        if world.budget_left() < config.mobile_send_budget_floor {
            stats.truncated = true;
            return stats;
        }
        match self.send_facts(store, world, &target, &facts) {
            Ok(units) => {
                stats.messages_sent = 1;
                stats.units_sent = units;
            }
            Err(err) => {
                debug!(to = %target.id, %err, "send refused");
                stats.refused = 1;
            }
        }
        stats
    }

    /// Sends `facts` (at most two) in one message. Recipients are only marked after the
    /// channel accepts it.
    fn send_facts<W: WorldMut + ?Sized>(
        &mut self,
        store: &mut FactStore,
        world: &mut W,
        to: &AllyInfo,
        facts: &[FactRef],
    ) -> Result<u32, SendError> {
        let mut builder = MessageBuilder::new();
        for unit in facts.iter().filter_map(|fact| store.unit(*fact)) {
            builder.push(unit);
        }
        let units = builder.len() as u32;
        let Some(message) = builder.take() else {
            return Ok(0);
        };
        world.send(to.cell, message)?;
        self.emitted += 1;
        for fact in facts {
            store.mark_known(*fact, to.id);
            store.clear_critical(*fact);
        }
        Ok(units)
    }
}

/// Whether the symmetry bitmap says anything `id` has not heard from us.
fn symmetry_unknown(store: &FactStore, id: AgentId) -> bool {
    store.symmetry().valid != SymmetrySet::ALL && !store.knows(FactRef::Symmetry, id)
}

/// Symmetry first, then towers in slot order. Skips the tower standing on `skip`.
fn unknown_facts(store: &FactStore, id: AgentId, skip: Option<Cell>) -> Vec<FactRef> {
    let mut facts = Vec::new();
    if symmetry_unknown(store, id) {
        facts.push(FactRef::Symmetry);
    }
    facts.extend(
        store
            .towers()
            .iter()
            .enumerate()
            .filter(|(_, t)| Some(t.cell) != skip && !t.recipients.contains(id))
            .map(|(slot, _)| FactRef::Tower(slot)),
    );
    facts
}

/// Up to two facts for a mobile agent's single message: a first-hand symmetry disproof, then
/// first-hand tower changes, then anything else the hub lacks.
fn mobile_selection(config: &ProtocolConfig, store: &FactStore, target: &AllyInfo) -> Vec<FactRef> {
    let mut picked = Vec::with_capacity(MessageBuilder::CAPACITY);
    let wants_symmetry = symmetry_unknown(store, target.id);
    if wants_symmetry && store.symmetry().critical {
        picked.push(FactRef::Symmetry);
    }
    if config.prioritize_critical_towers {
        for (slot, tower) in store.towers().iter().enumerate() {
            if picked.len() >= MessageBuilder::CAPACITY {
                return picked;
            }
            if tower.critical && tower.cell != target.cell && !tower.recipients.contains(target.id) {
                picked.push(FactRef::Tower(slot));
            }
        }
    }
    for fact in unknown_facts(store, target.id, Some(target.cell)) {
        if picked.len() >= MessageBuilder::CAPACITY {
            break;
        }
        if !picked.contains(&fact) {
            picked.push(fact);
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use poi_protocol::{MapSize, Side, Team, TowerKind};

    fn hub(id: u32, x: u8, y: u8) -> AllyInfo {
        AllyInfo {
            id: AgentId(id),
            cell: Cell::new(x, y),
            role: Role::Infrastructure,
        }
    }

    fn store() -> FactStore {
        FactStore::new(&ProtocolConfig::default(), MapSize::new(30, 30), Side::A)
    }

    #[test]
    fn mobile_puts_critical_symmetry_first() {
        let mut s = store();
        s.observe_tower(Source::Peer(AgentId(9)), Cell::new(3, 3), Team::Neutral, TowerKind::Paint)
            .unwrap();
        s.invalidate_symmetry(Source::Local, Symmetry::Vertical);
        let picked = mobile_selection(&ProtocolConfig::default(), &s, &hub(1, 20, 20));
        assert_eq!(picked, vec![FactRef::Symmetry, FactRef::Tower(0)]);
    }

    #[test]
    fn mobile_prefers_critical_towers_over_relayed_ones() {
        let mut s = store();
        s.observe_tower(Source::Peer(AgentId(9)), Cell::new(3, 3), Team::Neutral, TowerKind::Paint)
            .unwrap();
        s.observe_tower(Source::Peer(AgentId(9)), Cell::new(13, 3), Team::Neutral, TowerKind::Paint)
            .unwrap();
        s.observe_tower(Source::Local, Cell::new(23, 3), Side::B.into(), TowerKind::Money)
            .unwrap();
        let picked = mobile_selection(&ProtocolConfig::default(), &s, &hub(1, 20, 20));
        assert_eq!(picked, vec![FactRef::Tower(2), FactRef::Tower(0)]);
    }

    #[test]
    fn mobile_skips_the_hub_itself() {
        let mut s = store();
        s.observe_tower(Source::Local, Cell::new(20, 20), Side::A.into(), TowerKind::Paint)
            .unwrap();
        let picked = mobile_selection(&ProtocolConfig::default(), &s, &hub(1, 20, 20));
        assert!(picked.is_empty());
    }

    #[test]
    fn undisproven_symmetry_is_not_gossiped() {
        let s = store();
        assert!(unknown_facts(&s, AgentId(1), None).is_empty());
    }
}
