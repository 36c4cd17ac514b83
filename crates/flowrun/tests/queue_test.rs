use flowrun::RunQueue;
use uuid::Uuid;

#[test]
fn tasks_dequeue_in_enqueue_order() {
    let mut queue = RunQueue::new();
    let fs = Uuid::new_v4();
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let t1 = queue.enqueue(fs, a, None);
    let t2 = queue.enqueue(fs, b, None);
    let t3 = queue.enqueue(fs, c, None);
    assert!(t1 < t2 && t2 < t3, "task ids are monotonically increasing");

    assert_eq!(queue.dequeue().unwrap().id, t1);
    assert_eq!(queue.dequeue().unwrap().id, t2);
    assert_eq!(queue.dequeue().unwrap().id, t3);
    assert!(queue.is_empty());
}

#[test]
fn deferred_batch_reinserts_at_front_in_relative_order() {
    let mut queue = RunQueue::new();
    let fs = Uuid::new_v4();
    let busy = Uuid::new_v4();
    let fresh = Uuid::new_v4();

    let d1 = queue.enqueue(fs, busy, None);
    let d2 = queue.enqueue(fs, busy, None);
    let deferred = vec![queue.dequeue().unwrap(), queue.dequeue().unwrap()];

    // Work enqueued while the component was busy.
    let f1 = queue.enqueue(fs, fresh, None);

    queue.requeue_front_batch(deferred);

    // Deferred tasks retry first, keeping their order and identity.
    assert_eq!(queue.dequeue().unwrap().id, d1);
    assert_eq!(queue.dequeue().unwrap().id, d2);
    assert_eq!(queue.dequeue().unwrap().id, f1);
}

#[test]
fn immediate_tasks_get_ids_without_entering_the_queue() {
    let mut queue = RunQueue::new();
    let fs = Uuid::new_v4();

    let pending = queue.enqueue(fs, Uuid::new_v4(), None);
    let urgent = queue.immediate(fs, Uuid::new_v4(), None);

    assert!(urgent.id > pending, "immediate tasks share the id sequence");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.dequeue().unwrap().id, pending);
}

#[test]
fn purge_drops_only_the_finished_flow_states_tasks() {
    let mut queue = RunQueue::new();
    let finished = Uuid::new_v4();
    let live = Uuid::new_v4();

    queue.enqueue(finished, Uuid::new_v4(), None);
    let keep = queue.enqueue(live, Uuid::new_v4(), None);
    queue.enqueue(finished, Uuid::new_v4(), None);

    queue.purge_flow_state(finished);

    assert_eq!(queue.len(), 1);
    assert!(queue.contains(keep));
    assert!(!queue.has_tasks_for(finished));
    assert!(queue.has_tasks_for(live));
}
