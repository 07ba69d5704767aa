//! Subsystem discovery registry.
//!
//! A fixed table of `(channel id, pid)` pairs, one slot per subsystem.
//! Servers register themselves at startup; clients block with bounded
//! retry until every required slot is populated with a distinct channel
//! id, then cache what they need. The supervisor revalidates the table
//! periodically and warns when an entry goes missing.

use crate::error::{ShmError, ShmResult};
use crate::platform::is_process_alive;
use crate::segment::Segment;
use atc::wire::{Subsystem, SUBSYSTEM_COUNT};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// One registry slot.
#[repr(C)]
struct RegistryEntry {
    channel_id: AtomicI32,
    pid: AtomicI32,
}

/// Registry payload: `(channelId, processId) × 4`.
#[repr(C)]
struct RegistryTable {
    entries: [RegistryEntry; SUBSYSTEM_COUNT],
}

/// Handle on the shared subsystem registry.
pub struct SubsystemRegistry {
    segment: Segment,
}

impl SubsystemRegistry {
    /// Create a fresh registry with every slot vacant.
    pub fn create(name: &str) -> ShmResult<Self> {
        let segment = Segment::create(name, core::mem::size_of::<RegistryTable>())?;
        Ok(Self { segment })
    }

    /// Attach to an existing registry.
    pub fn attach(name: &str) -> ShmResult<Self> {
        let segment = Segment::attach(name)?;
        segment.require_payload::<RegistryTable>()?;
        Ok(Self { segment })
    }

    /// Attach with bounded retry.
    pub fn attach_with_retry(name: &str, attempts: u32, interval: Duration) -> ShmResult<Self> {
        let segment = Segment::attach_with_retry(name, attempts, interval)?;
        segment.require_payload::<RegistryTable>()?;
        Ok(Self { segment })
    }

    #[inline]
    fn table(&self) -> &RegistryTable {
        unsafe { &*(self.segment.payload_ptr() as *const RegistryTable) }
    }

    #[inline]
    fn entry(&self, subsystem: Subsystem) -> &RegistryEntry {
        &self.table().entries[subsystem.index()]
    }

    /// Record this process as the given subsystem.
    pub fn register(&self, subsystem: Subsystem) {
        let entry = self.entry(subsystem);
        entry
            .pid
            .store(crate::platform::current_pid() as i32, Ordering::Release);
        entry
            .channel_id
            .store(subsystem.channel_id(), Ordering::Release);
        info!(
            subsystem = subsystem.name(),
            channel = subsystem.channel_id(),
            "registered subsystem"
        );
    }

    /// Vacate the slot on orderly shutdown.
    pub fn deregister(&self, subsystem: Subsystem) {
        let entry = self.entry(subsystem);
        entry.channel_id.store(0, Ordering::Release);
        entry.pid.store(0, Ordering::Release);
    }

    /// `(channel id, pid)` for a slot; zeros mean vacant.
    pub fn lookup(&self, subsystem: Subsystem) -> (i32, i32) {
        let entry = self.entry(subsystem);
        (
            entry.channel_id.load(Ordering::Acquire),
            entry.pid.load(Ordering::Acquire),
        )
    }

    /// Whether every required slot holds a live-looking, distinct entry.
    pub fn all_registered(&self, required: &[Subsystem]) -> bool {
        let mut seen = [0i32; SUBSYSTEM_COUNT];
        for (i, &subsystem) in required.iter().enumerate() {
            let (channel, pid) = self.lookup(subsystem);
            if channel <= 0 || pid <= 0 {
                return false;
            }
            // Channel ids must be pairwise distinct, as in any sane
            // channel namespace.
            if seen[..i].contains(&channel) {
                return false;
            }
            seen[i] = channel;
        }
        true
    }

    /// Block until every required subsystem has registered.
    ///
    /// Bounded retry; logs progress at each missed attempt. Startup
    /// ordering is enforced elsewhere — this only has to tolerate it.
    pub fn wait_for(
        &self,
        required: &[Subsystem],
        attempts: u32,
        interval: Duration,
    ) -> ShmResult<()> {
        for attempt in 0..attempts.max(1) {
            if self.all_registered(required) {
                return Ok(());
            }
            info!(
                attempt = attempt + 1,
                attempts, "waiting for subsystem registration"
            );
            std::thread::sleep(interval);
        }

        let missing: Vec<&str> = required
            .iter()
            .filter(|s| {
                let (channel, pid) = self.lookup(**s);
                channel <= 0 || pid <= 0
            })
            .map(|s| s.name())
            .collect();
        Err(ShmError::RegistryIncomplete {
            missing: missing.join(", "),
        })
    }

    /// Supervisor-side health sweep: returns subsystems whose slot is
    /// vacant or whose registered pid is no longer alive, warning for
    /// each.
    pub fn validate(&self, required: &[Subsystem]) -> Vec<Subsystem> {
        let mut unhealthy = Vec::new();
        for &subsystem in required {
            let (channel, pid) = self.lookup(subsystem);
            if channel <= 0 || pid <= 0 {
                warn!(
                    subsystem = subsystem.name(),
                    "registry entry missing or invalid"
                );
                unhealthy.push(subsystem);
            } else if !is_process_alive(pid as u32) {
                warn!(
                    subsystem = subsystem.name(),
                    pid, "registered subsystem process is dead"
                );
                unhealthy.push(subsystem);
            }
        }
        unhealthy
    }

    /// Segment name.
    pub fn name(&self) -> &str {
        self.segment.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique(name: &str) -> String {
        format!("{name}_{}", std::process::id())
    }

    #[test]
    fn register_lookup_deregister() {
        let registry = SubsystemRegistry::create(&unique("reg_basic")).unwrap();

        assert_eq!(registry.lookup(Subsystem::Operator), (0, 0));
        registry.register(Subsystem::Operator);
        let (channel, pid) = registry.lookup(Subsystem::Operator);
        assert_eq!(channel, Subsystem::Operator.channel_id());
        assert_eq!(pid, std::process::id() as i32);

        registry.deregister(Subsystem::Operator);
        assert_eq!(registry.lookup(Subsystem::Operator), (0, 0));
    }

    #[test]
    fn all_registered_requires_every_slot() {
        let registry = SubsystemRegistry::create(&unique("reg_all")).unwrap();
        let required = [Subsystem::Operator, Subsystem::Display, Subsystem::Logger];

        registry.register(Subsystem::Operator);
        registry.register(Subsystem::Display);
        assert!(!registry.all_registered(&required));

        registry.register(Subsystem::Logger);
        assert!(registry.all_registered(&required));
    }

    #[test]
    fn wait_for_sees_late_registration() {
        let registry =
            std::sync::Arc::new(SubsystemRegistry::create(&unique("reg_wait")).unwrap());

        let registrar = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                registry.register(Subsystem::Display);
            })
        };

        registry
            .wait_for(&[Subsystem::Display], 20, Duration::from_millis(10))
            .unwrap();
        registrar.join().unwrap();
    }

    #[test]
    fn wait_for_gives_up_and_names_missing() {
        let registry = SubsystemRegistry::create(&unique("reg_giveup")).unwrap();
        registry.register(Subsystem::Operator);

        let err = registry
            .wait_for(
                &[Subsystem::Operator, Subsystem::Logger],
                2,
                Duration::from_millis(1),
            )
            .unwrap_err();
        match err {
            ShmError::RegistryIncomplete { missing } => {
                assert!(missing.contains("logger"));
                assert!(!missing.contains("operator"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validate_flags_dead_pid() {
        let registry = SubsystemRegistry::create(&unique("reg_dead")).unwrap();
        registry.register(Subsystem::Computer);

        // Forge an unallocatable pid into the slot.
        registry
            .entry(Subsystem::Computer)
            .pid
            .store(i32::MAX, Ordering::Release);
        let unhealthy = registry.validate(&[Subsystem::Computer]);
        assert_eq!(unhealthy, vec![Subsystem::Computer]);
    }
}
