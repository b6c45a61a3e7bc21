use std::thread;

use crate::InstancePool;

#[test]
fn concurrent_enqueue_drains_once_in_ticket_order() {
    let mut pool: InstancePool<(usize, usize)> = InstancePool::new();
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let spawns = pool.spawn_handle();
            thread::spawn(move || {
                (0..25)
                    .map(|n| spawns.enqueue((worker, n)).ticket)
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let mut tickets: Vec<u64> = Vec::new();
    for handle in handles {
        tickets.extend(handle.join().expect("worker"));
    }
    tickets.sort_unstable();
    assert_eq!(tickets, (1..=100).collect::<Vec<_>>());

    let realized = pool.realize_pending();
    assert_eq!(realized.len(), 100);
    assert!(realized.windows(2).all(|w| w[0].ticket < w[1].ticket));
    assert!(realized.windows(2).all(|w| w[0].id < w[1].id));

    // per-worker order survives the interleaving
    for worker in 0..4 {
        let seen: Vec<usize> = pool
            .iter()
            .filter(|slot| slot.value.0 == worker)
            .map(|slot| slot.value.1)
            .collect();
        assert_eq!(seen, (0..25).collect::<Vec<_>>());
    }

    assert!(pool.realize_pending().is_empty());
}
