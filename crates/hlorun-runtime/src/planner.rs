//! Device assignment planning.

use crate::error::{Result, RuntimeError};
use hlorun_client::{DeviceAssignment, DeviceClient};

/// Asks a device client for its canonical replica/partition placement.
pub struct DeviceAssignmentPlanner<'a> {
    client: &'a dyn DeviceClient,
}

impl<'a> DeviceAssignmentPlanner<'a> {
    pub fn new(client: &'a dyn DeviceClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns [`RuntimeError::DeviceTopology`] if the client cannot place
    /// `replica_count x partition_count` slots.
    pub fn plan(&self, replica_count: usize, partition_count: usize) -> Result<DeviceAssignment> {
        self.client
            .default_device_assignment(replica_count, partition_count)
            .map_err(RuntimeError::DeviceTopology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlorun_client::{DeviceId, HostClient, HostClientOptions};

    #[test]
    fn test_plan_uses_client_topology() {
        let client = HostClient::with_options(HostClientOptions {
            num_devices: 4,
            ..Default::default()
        })
        .unwrap();
        let assignment = DeviceAssignmentPlanner::new(&client).plan(1, 4).unwrap();
        assert_eq!(assignment.computation_count(), 4);
        assert_eq!(assignment.get(0, 3), Some(DeviceId(3)));
    }

    #[test]
    fn test_plan_too_many_replicas() {
        let client = HostClient::new();
        let err = DeviceAssignmentPlanner::new(&client).plan(1000, 1).unwrap_err();
        assert!(matches!(err, RuntimeError::DeviceTopology(_)));
    }
}
