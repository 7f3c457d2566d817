//! Devices and logical-to-physical device assignments.

use crate::{Error, Result};
use std::fmt;

/// Globally unique identifier of a physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical device addressable by a client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    id: DeviceId,
    kind: String,
    process_index: usize,
}

impl Device {
    pub fn new(id: DeviceId, kind: impl Into<String>, process_index: usize) -> Self {
        Self {
            id,
            kind: kind.into(),
            process_index,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Device kind, e.g. `"host"`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Index of the process that owns the device.
    pub fn process_index(&self) -> usize {
        self.process_index
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Mapping from (replica, partition) pairs to physical devices.
///
/// Stored row-major: all partitions of replica 0, then replica 1, and so on.
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceAssignment {
    replica_count: usize,
    computation_count: usize,
    devices: Vec<DeviceId>,
}

impl DeviceAssignment {
    /// Create an assignment from a row-major list of device ids.
    ///
    /// # Errors
    /// Returns an error if either dimension is zero or `devices` has the wrong length.
    pub fn new(
        replica_count: usize,
        computation_count: usize,
        devices: Vec<DeviceId>,
    ) -> Result<Self> {
        if replica_count == 0 || computation_count == 0 {
            return Err(Error::InvalidArgument(format!(
                "device assignment needs at least one replica and one partition, \
                 got {replica_count}x{computation_count}"
            )));
        }
        let needed = replica_count.checked_mul(computation_count).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "device assignment {replica_count}x{computation_count} is too large"
            ))
        })?;
        if devices.len() != needed {
            return Err(Error::InvalidArgument(format!(
                "device assignment {replica_count}x{computation_count} needs {needed} devices, got {}",
                devices.len()
            )));
        }
        Ok(Self {
            replica_count,
            computation_count,
            devices,
        })
    }

    pub fn replica_count(&self) -> usize {
        self.replica_count
    }

    /// Number of partitions (computations) per replica.
    pub fn computation_count(&self) -> usize {
        self.computation_count
    }

    /// Device running `partition` of `replica`.
    pub fn get(&self, replica: usize, partition: usize) -> Option<DeviceId> {
        if replica >= self.replica_count || partition >= self.computation_count {
            return None;
        }
        self.devices
            .get(replica * self.computation_count + partition)
            .copied()
    }

    /// All assigned device ids, row-major.
    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains(&id)
    }

    /// The (replica, partition) slot a device is assigned to.
    pub fn logical_id(&self, id: DeviceId) -> Option<(usize, usize)> {
        self.devices.iter().position(|&d| d == id).map(|index| {
            (
                index / self.computation_count,
                index % self.computation_count,
            )
        })
    }
}

impl fmt::Display for DeviceAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeviceAssignment(replicas={}, partitions={}) [",
            self.replica_count, self.computation_count
        )?;
        for (replica, row) in self.devices.chunks(self.computation_count).enumerate() {
            if replica > 0 {
                f.write_str(", ")?;
            }
            let ids: Vec<String> = row.iter().map(ToString::to_string).collect();
            write!(f, "[{}]", ids.join(" "))?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[usize]) -> Vec<DeviceId> {
        raw.iter().copied().map(DeviceId).collect()
    }

    #[test]
    fn test_assignment_lookup() {
        let assignment = DeviceAssignment::new(2, 2, ids(&[0, 1, 2, 3])).unwrap();
        assert_eq!(assignment.get(0, 1), Some(DeviceId(1)));
        assert_eq!(assignment.get(1, 0), Some(DeviceId(2)));
        assert_eq!(assignment.get(2, 0), None);
        assert_eq!(assignment.logical_id(DeviceId(3)), Some((1, 1)));
        assert!(!assignment.contains(DeviceId(7)));
    }

    #[test]
    fn test_assignment_rejects_wrong_length() {
        assert!(DeviceAssignment::new(2, 1, ids(&[0])).is_err());
        assert!(DeviceAssignment::new(0, 1, vec![]).is_err());
    }

    #[test]
    fn test_assignment_dimensions_overflow() {
        let err = DeviceAssignment::new(usize::MAX, 2, vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_assignment_display() {
        let assignment = DeviceAssignment::new(2, 2, ids(&[0, 1, 2, 3])).unwrap();
        assert_eq!(
            assignment.to_string(),
            "DeviceAssignment(replicas=2, partitions=2) [[0 1], [2 3]]"
        );
    }

    #[test]
    fn test_device_display() {
        let device = Device::new(DeviceId(3), "host", 0);
        assert_eq!(device.to_string(), "host:3");
    }
}
