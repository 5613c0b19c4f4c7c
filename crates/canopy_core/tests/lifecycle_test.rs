//! Integration tests for entity lifecycles across containers and trees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use canopy_attributes::AttributeKey;
use canopy_core::{
    ContainerError, ContainerRef, DefaultEntityContainer, DefaultEntityFactory, EntityContainer,
    EntityContainerExt, EntityEvent, EntityFactory, EntityListener, ErrorKind, LifecycleBus,
    LifecycleEvent, Lifecycle, ListenerResult,
};
use uuid::Uuid;

const COLOUR: AttributeKey<&'static str> = AttributeKey::new("colour");

/// Counts every event kind it sees.
#[derive(Default)]
struct Tally {
    created: AtomicUsize,
    killed: AtomicUsize,
    received: AtomicUsize,
    transferred: AtomicUsize,
}

impl Tally {
    fn counts(&self) -> [usize; 4] {
        [
            self.created.load(Ordering::SeqCst),
            self.killed.load(Ordering::SeqCst),
            self.received.load(Ordering::SeqCst),
            self.transferred.load(Ordering::SeqCst),
        ]
    }
}

impl EntityListener for Tally {
    fn entity_created(&self, _event: &EntityEvent) -> ListenerResult {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn entity_killed(&self, _event: &EntityEvent) -> ListenerResult {
        self.killed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn entity_received(&self, _event: &EntityEvent) -> ListenerResult {
        self.received.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn entity_transferred(&self, _event: &EntityEvent) -> ListenerResult {
        self.transferred.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn uid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn tally_on(container: &dyn EntityContainer) -> Arc<Tally> {
    let tally = Arc::new(Tally::default());
    container.add_entity_listener(tally.clone());
    tally
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_create_then_kill_updates_count() {
    let c1 = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());

    c1.new_empty_entity(uid(1)).unwrap();
    assert_eq!(c1.entity_count(), 1);
    assert!(c1.kill_entity(uid(1)).unwrap());
    assert_eq!(c1.entity_count(), 0);
}

#[test]
fn test_transfer_to_self_is_a_conflict() {
    let c1 = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    c1.new_empty_entity(uid(2)).unwrap();

    let same: ContainerRef = c1.clone();
    let err = c1.transfer_entity(uid(2), &same).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(c1.has_entity(uid(2)));
}

#[test]
fn test_same_tree_transfer_fires_no_receipt() {
    let root = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let c1 = root.new_empty_entity(uid(100)).unwrap();
    let c2 = root.new_empty_entity(uid(200)).unwrap();
    let source = tally_on(&*c1);
    let target = tally_on(&*c2);

    let seeded = c1.new_empty_entity(uid(3)).unwrap();
    seeded.attributes().set(&COLOUR, "red");

    let destination: ContainerRef = c2.clone();
    assert!(c1.transfer_entity(uid(3), &destination).unwrap());

    assert!(c1.entity(uid(3)).is_none());
    let moved = c2.entity(uid(3)).unwrap();
    assert!(Arc::ptr_eq(&moved, &seeded));
    assert_eq!(moved.attributes().get(&COLOUR).as_deref(), Some(&"red"));

    assert_eq!(source.counts(), [1, 0, 0, 1]);
    assert_eq!(target.counts(), [0, 0, 0, 0]);
}

#[test]
fn test_cross_tree_transfer_fires_one_receipt() {
    let c3 = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let c4 = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let source = tally_on(&*c3);
    let target = tally_on(&*c4);

    let entity = c3.new_empty_entity(uid(4)).unwrap();
    let destination: ContainerRef = c4.clone();
    assert!(c3.transfer_entity(uid(4), &destination).unwrap());

    assert!(!c3.has_entity(uid(4)));
    assert!(c4.has_entity(uid(4)));
    assert!(entity.is_alive());
    assert_eq!(source.counts(), [1, 0, 0, 1]);
    assert_eq!(target.counts(), [0, 0, 1, 0]);
}

// ============================================================================
// EVENTS
// ============================================================================

#[test]
fn test_cross_tree_receipt_precedes_transfer_event() {
    let bus = LifecycleBus::new(16);
    let c3 = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let c4 = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    c3.add_entity_listener(bus.sender());
    c4.add_entity_listener(bus.sender());
    let receiver = bus.receiver();

    c3.new_empty_entity(uid(5)).unwrap();
    let destination: ContainerRef = c4.clone();
    c3.transfer_entity(uid(5), &destination).unwrap();

    let events = receiver.drain();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], LifecycleEvent::Created(_)));
    assert!(matches!(events[1], LifecycleEvent::Received(_)));
    let LifecycleEvent::Transferred(transfer) = &events[2] else {
        panic!("expected a transfer event, got {:?}", events[2]);
    };
    assert_eq!(transfer.container().container_id(), c3.container_id());
    assert_eq!(
        transfer.destination().map(|d| d.container_id()),
        Some(c4.container_id())
    );
}

#[test]
fn test_events_name_the_reporting_entity() {
    let root = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let parent = root.new_empty_entity(uid(10)).unwrap();
    let (sender, receiver) = LifecycleBus::create_pair(4);
    parent.add_entity_listener(sender);

    parent.new_empty_entity(uid(11)).unwrap();

    let event = receiver.try_recv().unwrap();
    assert_eq!(event.event().container().container_id(), parent.container_id());
    assert_eq!(event.entity_id(), uid(11));
}

#[test]
fn test_killed_entity_takes_descendants_with_it() {
    let root = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let herd = root.new_empty_entity(uid(20)).unwrap();
    let tally = tally_on(&*herd);
    let sheep: Vec<_> = (21..25)
        .map(|n| herd.new_empty_entity(uid(n)).unwrap())
        .collect();

    assert!(root.kill_entity(uid(20)).unwrap());
    assert!(sheep.iter().all(|s| s.lifecycle() == Lifecycle::Dead));
    assert_eq!(tally.counts(), [4, 4, 0, 0]);
    assert!(!root.kill_entity(uid(20)).unwrap());
}

#[test]
fn test_absent_kill_is_idempotent() {
    let c = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let tally = tally_on(&*c);
    for _ in 0..5 {
        assert!(!c.kill_entity(uid(30)).unwrap());
    }
    assert_eq!(tally.counts(), [0, 0, 0, 0]);
}

// ============================================================================
// TREES
// ============================================================================

#[test]
fn test_ids_are_unique_within_a_tree() {
    let root = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let a = root.new_empty_entity(uid(40)).unwrap();
    let b = root.new_empty_entity(uid(41)).unwrap();
    a.new_empty_entity(uid(42)).unwrap();

    let err = b.new_empty_entity(uid(42)).unwrap_err();
    assert!(matches!(err, ContainerError::AlreadyAssociated(id) if id == uid(42)));
    assert_eq!(b.entity_count(), 0);
}

#[test]
fn test_entity_cannot_move_into_its_own_subtree() {
    let root = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let parent = root.new_empty_entity(uid(50)).unwrap();
    let child = parent.new_empty_entity(uid(51)).unwrap();

    let below: ContainerRef = child;
    assert!(!root.transfer_entity(uid(50), &below).unwrap());
    assert!(root.has_entity(uid(50)));
    assert!(parent.is_alive());
}

#[test]
fn test_entity_moves_with_its_children() {
    let left = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let right = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let nest = left.new_empty_entity(uid(60)).unwrap();
    nest.new_empty_entity(uid(61)).unwrap();

    let destination: ContainerRef = right.clone();
    assert!(left.transfer_entity(uid(60), &destination).unwrap());

    let nest = right.entity(uid(60)).unwrap();
    assert!(nest.has_entity(uid(61)));
    assert!(right.kill_entity(uid(60)).unwrap());
    assert_eq!(nest.entity_count(), 0);
}

#[test]
fn test_moved_entity_hosts_same_tree_moves() {
    let t1 = DefaultEntityFactory::unbounded();
    let t2 = DefaultEntityFactory::unbounded();
    let c3 = DefaultEntityContainer::new(t1.clone());
    let c4 = DefaultEntityContainer::new(t2.clone());
    let nest = c3.new_empty_entity(uid(80)).unwrap();
    nest.new_empty_entity(uid(81)).unwrap();
    c4.new_empty_entity(uid(82)).unwrap();

    let destination: ContainerRef = c4.clone();
    assert!(c3.transfer_entity(uid(80), &destination).unwrap());
    assert_eq!(t1.entity_count(), 0);
    assert_eq!(t2.owner_of(uid(81)), Some(nest.container_id()));

    assert!(t2.within_same_tree(&*c4, &*nest));
    let into_nest: ContainerRef = nest.clone();
    assert!(c4.transfer_entity(uid(82), &into_nest).unwrap());
    assert!(nest.has_entity(uid(82)));
    assert!(!c4.has_entity(uid(82)));
    assert_eq!(t2.owner_of(uid(82)), Some(nest.container_id()));
}

#[test]
fn test_moved_entity_rejects_ids_live_in_its_new_tree() {
    let c3 = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let c4 = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let nest = c3.new_empty_entity(uid(85)).unwrap();
    let chick = nest.new_empty_entity(uid(86)).unwrap();
    c4.new_empty_entity(uid(87)).unwrap();

    let destination: ContainerRef = c4.clone();
    assert!(c3.transfer_entity(uid(85), &destination).unwrap());

    let err = nest.new_empty_entity(uid(87)).unwrap_err();
    assert!(matches!(err, ContainerError::AlreadyAssociated(id) if id == uid(87)));
    assert!(chick.new_empty_entity(uid(87)).is_err());
    assert!(c4.new_empty_entity(uid(86)).is_err());

    // The old tree let go of every moved id.
    c3.new_empty_entity(uid(86)).unwrap();
    assert_eq!(nest.entity_ids().len(), 1);
}

#[test]
fn test_refused_receipt_after_export_is_a_protocol_violation() {
    let c3 = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let c4 = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let entity = c3.new_empty_entity(uid(70)).unwrap();
    c4.new_empty_entity(uid(70)).unwrap();

    let destination: ContainerRef = c4.clone();
    let err = c3.transfer_entity(uid(70), &destination).unwrap_err();
    assert!(err.is_protocol_violation());
    assert_eq!(entity.lifecycle(), Lifecycle::Exported);
}

#[test]
fn test_bulk_transfer_moves_everything() {
    let root = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    let from = root.new_empty_entity(uid(90)).unwrap();
    let to = root.new_empty_entity(uid(91)).unwrap();
    for n in 100..110 {
        from.new_empty_entity(uid(n)).unwrap();
    }

    let destination: ContainerRef = to.clone();
    assert_eq!(from.transfer_entities(&destination).unwrap(), 10);
    assert_eq!(from.entity_count(), 0);
    assert_eq!(to.entity_count(), 10);
}

#[test]
fn test_kill_entities_empties_container() {
    let c = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
    for n in 0..8 {
        c.new_empty_entity(uid(200 + n)).unwrap();
    }
    let tally = tally_on(&*c);

    c.kill_entities().unwrap();
    assert_eq!(c.entity_count(), 0);
    assert_eq!(tally.counts(), [0, 8, 0, 0]);
    c.kill_entities().unwrap();
}
