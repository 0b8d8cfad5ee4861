use super::*;
use crate::{
    Build, BuildId, Capability, JobStatus, Mode, ResultGroup, SquadSnapshot, coverage_of_builds,
};
use std::collections::BTreeSet;

fn catalog() -> Arc<BuildCatalog> {
    Arc::new(
        BuildCatalog::new([
            Build::new(BuildId(1), "Guardian", "Firebrand", Mode::Wvw),
            Build::new(BuildId(2), "Engineer", "Scrapper", Mode::Wvw),
            Build::new(BuildId(3), "Mesmer", "Chronomancer", Mode::Wvw),
            Build::new(BuildId(4), "Necromancer", "Scourge", Mode::Pve),
        ])
        .unwrap(),
    )
}

fn store_with(size: usize) -> SquadStore {
    let builds = catalog();
    let mut store = SquadStore::new(Arc::new(CapabilityModel::standard()), Arc::clone(&builds));
    store.initialize_squad(size, builds).unwrap();
    store
}

fn assert_partition(store: &SquadStore) {
    let mut seen = BTreeSet::new();
    for group in store.groups() {
        assert!(group.len() <= GROUP_CAPACITY, "group {} overfull", group.id);
        for &id in &group.player_ids {
            assert!(seen.insert(id), "player {id} assigned twice");
            assert_eq!(store.player(id).unwrap().group_id, group.id);
        }
    }
    let all: BTreeSet<_> = store.players().map(|p| p.id).collect();
    assert_eq!(seen, all);
}

fn serialized(snapshot: &SquadSnapshot) -> String {
    serde_json::to_string(snapshot).unwrap()
}

fn manual_coverage(store: &SquadStore, group: GroupId) -> CapabilityVector {
    let group = store.group(group).unwrap();
    coverage_of_builds(
        group
            .player_ids
            .iter()
            .map(|id| store.player(*id).unwrap().build_id),
        store.catalog(),
        store.model(),
    )
}

fn server_vector(quickness: f64) -> CapabilityVector {
    CapabilityVector::from_pairs([(Capability::Quickness, quickness), (Capability::Might, 0.5)])
}

/// A reshuffled assignment of a 12 player squad, every player on build 3.
fn reshuffle_12(status: JobStatus) -> Frame {
    let groups = vec![
        ResultGroup {
            group_id: GroupId(0),
            players: [12, 11, 10, 9, 8].map(PlayerId).to_vec(),
            builds: vec![BuildId(3); 5],
        },
        ResultGroup {
            group_id: GroupId(1),
            players: [7, 6, 5, 4, 3].map(PlayerId).to_vec(),
            builds: vec![BuildId(3); 5],
        },
        ResultGroup {
            group_id: GroupId(2),
            players: [2, 1].map(PlayerId).to_vec(),
            builds: vec![BuildId(3); 2],
        },
    ];
    Frame::progress(status, 0.75, 4_000).with_result(OptimizeResult {
        status: Some(status),
        best_score: 0.75,
        elapsed_ms: 4_000,
        groups,
        coverage_by_group: vec![server_vector(0.9), server_vector(0.8), server_vector(0.7)],
        diagnostics: serde_json::Value::Null,
    })
}

#[test]
fn partition_holds_for_every_squad_size() {
    for size in MIN_SQUAD_SIZE..=MAX_SQUAD_SIZE {
        let store = store_with(size);
        assert_eq!(store.players().count(), size);
        assert_eq!(store.groups().len(), size.div_ceil(GROUP_CAPACITY));
        assert_partition(&store);
    }
}

#[test]
fn twelve_players_form_groups_of_five_five_two() {
    let store = store_with(12);
    let sizes: Vec<_> = store.groups().iter().map(Group::len).collect();
    assert_eq!(sizes, vec![5, 5, 2]);
    assert_eq!(
        store.group(GroupId(2)).unwrap().player_ids,
        vec![PlayerId(11), PlayerId(12)]
    );
    assert_eq!(store.player(PlayerId(1)).unwrap().name, "Player 1");
}

#[test]
fn builds_are_assigned_round_robin() {
    let store = store_with(6);
    let builds: Vec<_> = store.players().map(|p| p.build_id.0).collect();
    assert_eq!(builds, vec![1, 2, 3, 4, 1, 2]);
}

#[test]
fn out_of_range_resize_changes_nothing() {
    let mut store = store_with(7);
    let before = store.snapshot();

    for size in [0, MAX_SQUAD_SIZE + 1] {
        assert_eq!(
            store.initialize_squad(size, catalog()),
            Err(StoreError::SquadSize {
                size,
                min: MIN_SQUAD_SIZE,
                max: MAX_SQUAD_SIZE
            })
        );
        assert_eq!(store.snapshot(), before);
    }
}

#[test]
fn empty_catalog_is_rejected() {
    let mut store = store_with(3);
    let before = store.snapshot();
    assert_eq!(
        store.initialize_squad(3, Arc::new(BuildCatalog::default())),
        Err(StoreError::EmptyCatalog)
    );
    assert_eq!(store.snapshot(), before);
}

#[test]
fn initialize_resets_job_to_idle() {
    let mut store = store_with(5);
    store.begin_job(JobId::new("job-1"));
    let _ = store.apply_frame(&Frame::progress(JobStatus::Running, 0.4, 100));

    store.initialize_squad(10, catalog()).unwrap();
    assert_eq!(store.job(), &OptimizationJob::default());
    assert_partition(&store);
}

#[test]
fn initial_coverage_is_local_and_saturated() {
    let store = store_with(50);
    for group in store.groups() {
        assert_eq!(group.coverage_source, CoverageSource::Local);
        assert_eq!(group.coverage, manual_coverage(&store, group.id));
        assert!(group.coverage.iter().all(|(_, v)| (0.0..=1.0).contains(&v)));
    }
}

#[test]
fn move_conserves_players() {
    let mut store = store_with(12);

    let outcome = store.move_player(PlayerId(3), GroupId(2));
    assert_eq!(
        outcome,
        MoveOutcome::Moved {
            from: GroupId(0),
            to: GroupId(2)
        }
    );

    assert_eq!(store.player(PlayerId(3)).unwrap().group_id, GroupId(2));
    assert!(!store.group(GroupId(0)).unwrap().contains(PlayerId(3)));
    assert_eq!(
        store.group(GroupId(2)).unwrap().player_ids,
        vec![PlayerId(11), PlayerId(12), PlayerId(3)]
    );
    assert_eq!(store.players().count(), 12);
    assert_partition(&store);
}

#[test]
fn move_into_full_group_leaves_snapshot_untouched() {
    let mut store = store_with(12);
    let before = serialized(&store.snapshot());

    assert_eq!(store.move_player(PlayerId(11), GroupId(1)), MoveOutcome::GroupFull);
    assert_eq!(serialized(&store.snapshot()), before);
}

#[test]
fn invalid_moves_are_rejected_without_change() {
    let mut store = store_with(8);
    let before = store.snapshot();

    assert_eq!(store.move_player(PlayerId(1), GroupId(9)), MoveOutcome::UnknownGroup);
    assert_eq!(store.move_player(PlayerId(99), GroupId(1)), MoveOutcome::UnknownPlayer);
    assert_eq!(store.move_player(PlayerId(1), GroupId(0)), MoveOutcome::AlreadyInGroup);
    assert_eq!(store.snapshot(), before);
}

#[test]
fn twelve_player_scenario() {
    let mut store = store_with(12);
    let group_2 = store.group(GroupId(2)).unwrap().clone();

    assert_eq!(store.move_player(PlayerId(11), GroupId(1)), MoveOutcome::GroupFull);
    assert_eq!(store.group(GroupId(2)), Some(&group_2));

    store.recalculate_coverage();
    for group in store.groups() {
        assert_eq!(group.coverage, manual_coverage(&store, group.id));
    }
}

#[test]
fn move_recomputes_both_touched_groups() {
    let mut store = store_with(12);
    let untouched = store.group(GroupId(1)).unwrap().clone();

    assert!(store.move_player(PlayerId(1), GroupId(2)).is_moved());

    for id in [GroupId(0), GroupId(2)] {
        assert_eq!(store.group(id).unwrap().coverage, manual_coverage(&store, id));
    }
    assert_eq!(store.group(GroupId(1)), Some(&untouched));
}

#[test]
fn result_frame_replaces_membership_and_adopts_server_coverage() {
    let mut store = store_with(12);
    store.begin_job(JobId::new("job-1"));

    let outcome = store.apply_frame(&reshuffle_12(JobStatus::Running));
    assert_eq!(outcome, FrameOutcome::Reassigned);
    assert_partition(&store);

    let group_0 = store.group(GroupId(0)).unwrap();
    assert_eq!(group_0.player_ids, [12, 11, 10, 9, 8].map(PlayerId).to_vec());
    assert_eq!(group_0.coverage, server_vector(0.9));
    assert_eq!(group_0.coverage_source, CoverageSource::Server);
    assert!(store.players().all(|p| p.build_id == BuildId(3)));

    let job = store.job();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.best_score, 0.75);
    assert_eq!(job.elapsed_ms, 4_000);
    assert_eq!(job.id, Some(JobId::new("job-1")));
}

#[test]
fn applying_a_frame_twice_equals_applying_it_once() {
    let frame = reshuffle_12(JobStatus::Running);

    let mut once = store_with(12);
    let _ = once.apply_frame(&frame);

    let mut twice = store_with(12);
    let _ = twice.apply_frame(&frame);
    let _ = twice.apply_frame(&frame);

    assert_eq!(serialized(&once.snapshot()), serialized(&twice.snapshot()));
}

#[test]
fn terminal_status_freezes_the_job() {
    let mut store = store_with(12);
    let _ = store.apply_frame(&Frame::progress(JobStatus::Complete, 0.6, 9_000));
    let frozen = store.snapshot();

    assert_eq!(
        store.apply_frame(&reshuffle_12(JobStatus::Running)),
        FrameOutcome::Ignored
    );
    assert_eq!(
        store.apply_frame(&Frame::progress(JobStatus::Running, 0.99, 10_000)),
        FrameOutcome::Ignored
    );
    assert_eq!(store.snapshot(), frozen);
}

#[test]
fn every_terminal_status_freezes() {
    for status in [
        JobStatus::Complete,
        JobStatus::Cancelled,
        JobStatus::Timeout,
        JobStatus::Error,
    ] {
        let mut store = store_with(4);
        let _ = store.apply_frame(&Frame::progress(status, 0.1, 1));
        assert_eq!(
            store.apply_frame(&Frame::progress(JobStatus::Running, 0.9, 2)),
            FrameOutcome::Ignored
        );
        assert_eq!(store.job().status, status);
    }
}

#[test]
fn new_job_accepts_frames_after_terminal() {
    let mut store = store_with(4);
    let _ = store.apply_frame(&Frame::progress(JobStatus::Timeout, 0.3, 60_000));

    store.begin_job(JobId::new("job-2"));
    assert_eq!(store.job().status, JobStatus::Queued);
    assert_eq!(store.job().best_score, 0.0);
    assert_eq!(
        store.apply_frame(&Frame::progress(JobStatus::Running, 0.2, 50)),
        FrameOutcome::Progress
    );
    assert_eq!(store.job().status, JobStatus::Running);
}

#[test]
fn submission_failure_marks_error() {
    let mut store = store_with(4);
    store.begin_job(JobId::new("job-1"));
    let _ = store.apply_frame(&Frame::progress(JobStatus::Complete, 0.87, 1_200));

    store.fail_submission();
    assert_eq!(
        *store.job(),
        OptimizationJob {
            id: None,
            status: JobStatus::Error,
            best_score: 0.0,
            elapsed_ms: 0,
        }
    );
    assert_eq!(
        store.apply_frame(&Frame::progress(JobStatus::Running, 0.5, 1)),
        FrameOutcome::Ignored
    );

    store.reset_job();
    assert_eq!(store.job().status, JobStatus::Idle);
}

#[test]
fn progress_frames_overwrite_in_any_order() {
    let mut store = store_with(4);
    let _ = store.apply_frame(&Frame::progress(JobStatus::Running, 0.8, 2_000));
    let _ = store.apply_frame(&Frame::progress(JobStatus::Queued, 0.2, 500));

    let job = store.job();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.best_score, 0.2);
    assert_eq!(job.elapsed_ms, 500);
}

#[test]
fn best_score_is_clamped() {
    let mut store = store_with(4);
    let _ = store.apply_frame(&Frame::progress(JobStatus::Running, 1.7, 1));
    assert_eq!(store.job().best_score, 1.0);
}

#[test]
fn move_overrides_server_coverage_until_next_frame() {
    let mut store = store_with(12);
    let frame = reshuffle_12(JobStatus::Running);
    let _ = store.apply_frame(&frame);

    // player 8 sits in group 0 after the reshuffle; group 2 holds two players
    assert!(store.move_player(PlayerId(8), GroupId(2)).is_moved());

    for id in [GroupId(0), GroupId(2)] {
        let group = store.group(id).unwrap();
        assert_eq!(group.coverage_source, CoverageSource::Local);
        assert_eq!(group.coverage, manual_coverage(&store, id));
    }
    let untouched = store.group(GroupId(1)).unwrap();
    assert_eq!(untouched.coverage_source, CoverageSource::Server);
    assert_eq!(untouched.coverage, server_vector(0.8));

    // the next frame wins membership and coverage back
    assert_eq!(store.apply_frame(&frame), FrameOutcome::Reassigned);
    assert_eq!(store.player(PlayerId(8)).unwrap().group_id, GroupId(0));
    assert!(
        store
            .groups()
            .iter()
            .all(|g| g.coverage_source == CoverageSource::Server)
    );
    assert_partition(&store);
}

#[test]
fn recalculate_discards_server_coverage() {
    let mut store = store_with(12);
    let _ = store.apply_frame(&reshuffle_12(JobStatus::Running));

    store.recalculate_coverage();
    let first = store.snapshot();
    store.recalculate_coverage();

    assert_eq!(store.snapshot(), first);
    for group in store.groups() {
        assert_eq!(group.coverage_source, CoverageSource::Local);
        assert_eq!(group.coverage, manual_coverage(&store, group.id));
    }
}

#[test]
fn missing_server_vectors_fall_back_to_local() {
    let mut store = store_with(12);
    let mut frame = reshuffle_12(JobStatus::Running);
    if let Some(result) = frame.result.as_mut() {
        result.coverage_by_group.truncate(1);
    }

    assert_eq!(store.apply_frame(&frame), FrameOutcome::Reassigned);
    assert_eq!(
        store.group(GroupId(0)).unwrap().coverage_source,
        CoverageSource::Server
    );
    for id in [GroupId(1), GroupId(2)] {
        let group = store.group(id).unwrap();
        assert_eq!(group.coverage_source, CoverageSource::Local);
        assert_eq!(group.coverage, manual_coverage(&store, id));
    }
}

#[test]
fn invalid_results_leave_membership_but_apply_progress() {
    type Corrupt = fn(&mut OptimizeResult);
    let cases: [(Corrupt, AssignmentError); 6] = [
        (
            |r: &mut OptimizeResult| {
                r.groups[2].players.pop();
                r.groups[2].builds.pop();
            },
            AssignmentError::MissingPlayers { missing: 1 },
        ),
        (
            |r: &mut OptimizeResult| r.groups[2].players[0] = PlayerId(40),
            AssignmentError::UnknownPlayer {
                player_id: PlayerId(40),
            },
        ),
        (
            |r: &mut OptimizeResult| r.groups[2].players[0] = PlayerId(12),
            AssignmentError::DuplicatePlayer {
                player_id: PlayerId(12),
            },
        ),
        (
            |r: &mut OptimizeResult| {
                r.groups[1].players.push(PlayerId(2));
                r.groups[1].builds.push(BuildId(1));
            },
            AssignmentError::GroupOverCapacity {
                group_id: GroupId(1),
                size: 6,
            },
        ),
        (
            |r: &mut OptimizeResult| r.groups[1].group_id = GroupId(0),
            AssignmentError::DuplicateGroup {
                group_id: GroupId(0),
            },
        ),
        (
            |r: &mut OptimizeResult| {
                r.groups[0].builds.pop();
            },
            AssignmentError::BuildCountMismatch {
                group_id: GroupId(0),
                players: 5,
                builds: 4,
            },
        ),
    ];

    for (corrupt, expected) in cases {
        let mut store = store_with(12);
        let before = store.snapshot();

        let mut frame = reshuffle_12(JobStatus::Running);
        if let Some(result) = frame.result.as_mut() {
            corrupt(result);
        }

        assert_eq!(store.apply_frame(&frame), FrameOutcome::ResultRejected(expected));
        assert_eq!(store.groups(), before.groups.as_slice());
        assert_eq!(store.players().cloned().collect::<Vec<_>>(), before.players);
        assert_eq!(store.job().status, JobStatus::Running);
        assert_eq!(store.job().best_score, 0.75);
    }
}

#[test]
fn optimize_request_lists_mode_builds() {
    let store = store_with(7);
    let request = store.optimize_request(&JobOptions {
        time_limit_ms: Some(15_000),
        ..JobOptions::default()
    });

    assert_eq!(request.squad_size, 7);
    assert_eq!(request.players.len(), 7);
    assert_eq!(request.builds.len(), 4);
    assert_eq!(request.time_limit_ms, Some(15_000));
    assert!(
        request
            .players
            .iter()
            .all(|p| p.eligible_build_ids == vec![BuildId(1), BuildId(2), BuildId(3)])
    );
    assert_eq!(request.validate(), Ok(()));
}

#[test]
fn optimize_request_falls_back_to_current_build() {
    let builds = Arc::new(
        BuildCatalog::new([Build::new(BuildId(9), "Ranger", "Druid", Mode::Pve)]).unwrap(),
    );
    let mut store = SquadStore::new(Arc::new(CapabilityModel::standard()), Arc::clone(&builds));
    store.initialize_squad(2, builds).unwrap();

    let request = store.optimize_request(&JobOptions::default());
    assert!(
        request
            .players
            .iter()
            .all(|p| p.eligible_build_ids == vec![BuildId(9)])
    );
}
