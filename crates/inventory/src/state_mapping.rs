use kernel::domain::container::ContainerState;

/// Health-aware state mapping grounded in `docker_utils.py`'s
/// `ContainerStatusExtractor.get_status_with_exit_code`. `base_status` is
/// the engine's top-level container status string (`running`, `exited`,
/// ...); `health_status` is `State.Health.Status` when the container
/// defines a healthcheck.
pub fn map_state(base_status: &str, exit_code: Option<i64>, health_status: Option<&str>) -> (ContainerState, Option<i64>) {
    match base_status {
        "exited" => (ContainerState::Exited, exit_code),
        "dead" => (ContainerState::Dead, exit_code),
        "paused" => (ContainerState::Paused, None),
        "restarting" => (ContainerState::Restarting, None),
        "removing" => (ContainerState::Removing, None),
        "created" => (ContainerState::Created, None),
        "running" => match health_status {
            Some("healthy") => (ContainerState::Healthy, None),
            Some("unhealthy") => (ContainerState::Unhealthy, exit_code),
            Some("starting") => (ContainerState::Starting, None),
            _ => (ContainerState::Running, None),
        },
        _ => (ContainerState::Running, None),
    }
}

/// Result of an engine call that timed out or failed outright, distinct
/// from a well-formed but unrecognized base status.
pub fn timeout_state() -> (ContainerState, Option<i64>) {
    (ContainerState::Timeout, None)
}

pub fn error_state() -> (ContainerState, Option<i64>) {
    (ContainerState::Error, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exited_carries_exit_code() {
        assert_eq!(map_state("exited", Some(137), None), (ContainerState::Exited, Some(137)));
    }

    #[test]
    fn dead_carries_exit_code() {
        assert_eq!(map_state("dead", Some(1), None), (ContainerState::Dead, Some(1)));
    }

    #[test]
    fn paused_restarting_removing_created_drop_exit_code() {
        for status in ["paused", "restarting", "removing", "created"] {
            let (state, exit_code) = map_state(status, Some(0), None);
            assert_eq!(exit_code, None);
            assert_ne!(state, ContainerState::Exited);
        }
    }

    #[test]
    fn running_without_health_is_plain_running() {
        assert_eq!(map_state("running", None, None), (ContainerState::Running, None));
    }

    #[test]
    fn running_healthy_maps_to_healthy_without_exit_code() {
        assert_eq!(map_state("running", Some(0), Some("healthy")), (ContainerState::Healthy, None));
    }

    #[test]
    fn running_unhealthy_carries_exit_code() {
        assert_eq!(map_state("running", Some(1), Some("unhealthy")), (ContainerState::Unhealthy, Some(1)));
    }

    #[test]
    fn running_starting_health_has_no_exit_code() {
        assert_eq!(map_state("running", Some(0), Some("starting")), (ContainerState::Starting, None));
    }

    #[test]
    fn unrecognized_base_status_passes_through_as_running() {
        let (state, exit_code) = map_state("configured", None, None);
        assert_eq!(state, ContainerState::Running);
        assert_eq!(exit_code, None);
    }
}
