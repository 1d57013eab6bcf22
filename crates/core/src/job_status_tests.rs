use super::*;

#[test]
fn transient_crd_phases_group_into_running() {
    for phase in ["Running", "Succeeding", "Failing", "Invalidating", "PendingRerun", "Restarting", "Completing", "Scaling"] {
        assert_eq!(JobStatus::from_crd_phase(phase), JobStatus::Running, "phase {phase}");
    }
}

#[test]
fn terminal_crd_phases_map_correctly() {
    assert_eq!(JobStatus::from_crd_phase("Completed"), JobStatus::Succeeded);
    assert_eq!(JobStatus::from_crd_phase("Succeed"), JobStatus::Succeeded);
    assert_eq!(JobStatus::from_crd_phase("Failed"), JobStatus::Failed);
    assert_eq!(JobStatus::from_crd_phase("FailedSubmission"), JobStatus::Failed);
    assert_eq!(JobStatus::from_crd_phase("Unknown"), JobStatus::Failed);
    assert_eq!(JobStatus::from_crd_phase("Terminated"), JobStatus::Failed);
    assert_eq!(JobStatus::from_crd_phase("Aborted"), JobStatus::Terminated);
}

#[test]
fn terminating_crd_phases_map_correctly() {
    assert_eq!(JobStatus::from_crd_phase("Terminating"), JobStatus::Terminating);
    assert_eq!(JobStatus::from_crd_phase("Aborting"), JobStatus::Terminating);
}

#[test]
fn starting_crd_phase_maps_to_pending() {
    assert_eq!(JobStatus::from_crd_phase("Starting"), JobStatus::Pending);
}

#[test]
fn unknown_phase_defaults_to_pending_not_panic() {
    assert_eq!(JobStatus::from_crd_phase("SomeFutureOperatorPhase"), JobStatus::Pending);
}

#[test]
fn batch_job_counts_prefer_succeeded_over_active() {
    assert_eq!(JobStatus::from_batch_job_counts(1, 1, 0), JobStatus::Succeeded);
    assert_eq!(JobStatus::from_batch_job_counts(0, 0, 1), JobStatus::Failed);
    assert_eq!(JobStatus::from_batch_job_counts(1, 0, 0), JobStatus::Running);
    assert_eq!(JobStatus::from_batch_job_counts(0, 0, 0), JobStatus::Pending);
}

#[test]
fn ended_and_running_like_are_disjoint() {
    for status in [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Succeeded,
        JobStatus::Failed,
        JobStatus::Terminating,
        JobStatus::Terminated,
    ] {
        assert!(!(status.is_ended() && status.is_running_like()));
    }
}
