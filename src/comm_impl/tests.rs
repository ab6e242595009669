use super::*;

#[test]
fn test_serial_collectives_are_identity() {
    let comm = Communicator::serial();
    assert_eq!(comm.rank(), 0);
    assert_eq!(comm.size(), 1);

    let mut buf = vec![1.0, 2.0];
    comm.allreduce_sum(&mut buf);
    assert_eq!(buf, vec![1.0, 2.0]);

    let gathered = comm.allgather(vec![3usize]);
    assert_eq!(gathered, vec![vec![3]]);

    comm.broadcast(&mut buf, 0);
    comm.barrier();
    assert_eq!(buf, vec![1.0, 2.0]);
}

#[test]
fn test_allreduce_is_identical_on_all_ranks() {
    let results = run_ranks(3, |comm| {
        let mut buf = vec![0.1 * (comm.rank() + 1) as f64, 1.0];
        comm.allreduce_sum(&mut buf);
        buf
    })
    .unwrap();

    for r in &results {
        assert_eq!(r, &results[0]);
    }
    assert!((results[0][0] - 0.6).abs() < 1e-12);
    assert_eq!(results[0][1], 3.0);
}

#[test]
fn test_allgather_and_broadcast() {
    let results = run_ranks(4, |comm| {
        let gathered = comm.allgather(vec![comm.rank() * 10]);
        let mut payload = if comm.rank() == 2 {
            vec!['x', 'y']
        } else {
            Vec::new()
        };
        comm.broadcast(&mut payload, 2);
        (gathered, payload)
    })
    .unwrap();

    for (gathered, payload) in results {
        assert_eq!(gathered, vec![vec![0], vec![10], vec![20], vec![30]]);
        assert_eq!(payload, vec!['x', 'y']);
    }
}

#[test]
fn test_point_to_point_matches_by_tag() {
    let results = run_ranks(2, |comm| {
        if comm.rank() == 0 {
            comm.isend(vec![1u32], 1, Tag::Point(7));
            comm.isend(vec![2u32], 1, Tag::Point(8));
            comm.isend(vec![3u32], 1, Tag::Point(7));
            Vec::new()
        } else {
            // receive out of posting order; same tag keeps send order
            let second = comm.wait::<u32>(comm.irecv(0, Tag::Point(8)));
            let first = comm.wait::<u32>(comm.irecv(0, Tag::Point(7)));
            let third = comm.wait::<u32>(comm.irecv(0, Tag::Point(7)));
            [first, second, third].concat()
        }
    })
    .unwrap();
    assert_eq!(results[1], vec![1, 2, 3]);
}

#[test]
fn test_request_registry_completes() {
    let results = run_ranks(2, |comm| {
        let peer = 1 - comm.rank();
        let mut registry = RecvRequest::<f64>::new();
        let id = registry.request_recv(&comm, peer, Tag::Row(5));

        let mut puts = BufferPutRequest::new();
        puts.stage(peer, Tag::Row(5), vec![comm.rank() as f64; 3]);
        assert_eq!(puts.flush(&comm), 1);
        assert!(puts.is_empty());

        while !registry.test(&comm) {
            std::thread::yield_now();
        }
        let mut rows = registry.into_received();
        rows.take(id).unwrap()
    })
    .unwrap();
    assert_eq!(results[0], vec![1.0; 3]);
    assert_eq!(results[1], vec![0.0; 3]);
}

#[test]
fn test_panicking_rank_aborts_world() {
    let result = run_ranks(2, |comm| {
        if comm.rank() == 0 {
            panic!("rank 0 fails");
        }
        // would wait forever without the abort flag
        comm.barrier();
    });
    assert!(result.is_err());
}
