//! Process-wide fault aggregator. Three independently guarded
//! `BasicFaultMgr` instances — `summary_system`, `power`, `telemetry` —
//! each behind its own mutex so one subsystem's fault update never blocks
//! another's. The mutexes themselves live in `m2_server`, which owns the
//! threads; this type is the pure state each mutex protects.

use m2_common::fault::{self, Bus, FaultBit, FaultBitmap};

/// One fault manager's full bookkeeping: summary/previous/current
/// bitmaps plus the masks that gate what it's allowed to touch.
#[derive(Debug, Clone, Default)]
pub struct BasicFaultMgr {
    pub summary: FaultBitmap,
    pub previous: FaultBitmap,
    pub current: FaultBitmap,
    pub fault_enable_mask: u64,
    pub default_fault_mask: u64,
    pub affected_fault_mask: u64,
    pub affected_warn_info_mask: u64,
    pub timestamp: f64,
}

impl BasicFaultMgr {
    pub fn new(affected_fault_mask: u64, affected_warn_info_mask: u64) -> Self {
        Self {
            summary: FaultBitmap::new(),
            previous: FaultBitmap::new(),
            current: FaultBitmap::new(),
            fault_enable_mask: u64::MAX,
            default_fault_mask: u64::MAX,
            affected_fault_mask,
            affected_warn_info_mask,
            timestamp: 0.0,
        }
    }

    /// Apply `update_fault_status` and advance `previous`/`current`/`summary`:
    /// `previous` always holds the value of `summary` immediately before
    /// this recomputation.
    pub fn apply(&mut self, new_status: FaultBitmap, timestamp: f64) -> u64 {
        let (updated_summary, changed_bits) = fault::update_fault_status(
            self.summary.bits(),
            self.fault_enable_mask,
            new_status.bits(),
            self.affected_warn_info_mask,
            self.affected_fault_mask,
        );
        self.previous = self.summary;
        self.summary = FaultBitmap::from_bits(updated_summary & self.default_fault_mask);
        self.current = new_status;
        self.timestamp = timestamp;
        changed_bits
    }

    pub fn reset_faults(&mut self, mask: u64) {
        self.summary = FaultBitmap::from_bits(self.summary.bits() & !mask);
        self.current = FaultBitmap::from_bits(self.current.bits() & !mask);
        self.previous = FaultBitmap::from_bits(self.previous.bits() & !mask);
    }

    pub fn check_for_faults(&self, mask: u64) -> bool {
        self.fault_enable_mask & self.current.bits() & mask != 0
    }

    /// Sets bits in `fault_enable_mask`; returns the bits that newly
    /// became enabled.
    pub fn enable_faults_in_mask(&mut self, mask: u64) -> u64 {
        let newly_enabled = mask & !self.fault_enable_mask;
        self.fault_enable_mask |= mask;
        newly_enabled
    }
}

/// Three-manager aggregator: `summary_system` is the process-wide view,
/// `power` tracks power-subsystem-originated faults, `telemetry` tracks
/// faults surfaced to telemetry clients.
pub struct FaultMgr {
    pub summary_system: BasicFaultMgr,
    pub power: BasicFaultMgr,
    pub telemetry: BasicFaultMgr,
    com_connection_count: u32,
}

impl FaultMgr {
    pub fn new() -> Self {
        let motor_fault = fault::mask_power_subsystem_faults(Bus::Motor);
        let motor_warn = fault::mask_power_subsystem_warn(Bus::Motor);
        let comm_fault = fault::mask_power_subsystem_faults(Bus::Comm);
        let comm_warn = fault::mask_power_subsystem_warn(Bus::Comm);
        Self {
            summary_system: BasicFaultMgr::new(fault::mask_faults(), fault::mask_warn() | fault::mask_info()),
            power: BasicFaultMgr::new(motor_fault | comm_fault, motor_warn | comm_warn),
            telemetry: BasicFaultMgr::new(
                fault::telemetry_affected_fault_mask(),
                fault::telemetry_affected_warn_mask(),
            ),
            com_connection_count: 0,
        }
    }

    /// `update_power_faults`: apply to `power`, then merge the changed
    /// bits into `summary_system` and broadcast them to `telemetry`.
    /// Returns the bits that changed in the process-wide summary.
    pub fn update_power_faults(&mut self, current: FaultBitmap, timestamp: f64) -> u64 {
        let power_changed = self.power.apply(current, timestamp);
        let summary_changed = self.summary_system.apply(self.power.summary, timestamp);
        self.telemetry.apply(self.power.summary, timestamp);
        power_changed | summary_changed
    }

    /// Raises `CRIO_COMM_FAULT` when the connection count drops to zero,
    /// clears it when it rises back above zero.
    pub fn report_com_connection_count(&mut self, count: u32, timestamp: f64) {
        let was_zero = self.com_connection_count == 0;
        let is_zero = count == 0;
        self.com_connection_count = count;
        if was_zero == is_zero {
            return;
        }
        let mut next = self.summary_system.summary;
        next.set_bit(FaultBit::CrioCommFault, is_zero);
        self.summary_system.apply(next, timestamp);
    }

    /// Feeds a `MotionEngine` staleness classification into
    /// `summary_system`: `None` clears both stale-data bits, `Some(bit)`
    /// raises exactly that one.
    pub fn report_motion_staleness(&mut self, bit: Option<FaultBit>, timestamp: f64) {
        let mut next = self.summary_system.summary;
        next.set_bit(FaultBit::StaleDataWarn, bit == Some(FaultBit::StaleDataWarn));
        next.set_bit(FaultBit::StaleDataFault, bit == Some(FaultBit::StaleDataFault));
        self.summary_system.apply(next, timestamp);
    }

    pub fn reset_faults(&mut self, mask: u64) {
        self.summary_system.reset_faults(mask);
        self.power.reset_faults(mask);
        self.telemetry.reset_faults(mask);
    }

    pub fn check_for_power_subsystem_faults(&self, mask: u64) -> bool {
        self.power.check_for_faults(mask)
    }

    pub fn enable_faults_in_mask(&mut self, mask: u64) -> u64 {
        self.summary_system.enable_faults_in_mask(mask)
    }
}

impl Default for FaultMgr {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_power_faults_surfaces_into_summary() {
        let mut mgr = FaultMgr::new();
        let mut current = FaultBitmap::new();
        current.set_bit(FaultBit::MotorVoltageFault, true);
        mgr.update_power_faults(current, 1.0);
        assert!(mgr.summary_system.summary.get(FaultBit::MotorVoltageFault));
        assert!(mgr.telemetry.summary.get(FaultBit::MotorVoltageFault));
    }

    #[test]
    fn previous_tracks_summary_before_last_update() {
        let mut mgr = FaultMgr::new();
        let mut first = FaultBitmap::new();
        first.set_bit(FaultBit::MotorVoltageFault, true);
        mgr.update_power_faults(first, 1.0);
        let after_first = mgr.summary_system.summary;

        let mut second = FaultBitmap::new();
        second.set_bit(FaultBit::CommOverCurrent, true);
        mgr.update_power_faults(second, 2.0);
        assert_eq!(mgr.summary_system.previous, after_first);
    }

    #[test]
    fn com_connection_drop_to_zero_raises_crio_comm_fault() {
        let mut mgr = FaultMgr::new();
        mgr.report_com_connection_count(2, 0.0);
        assert!(!mgr.summary_system.summary.get(FaultBit::CrioCommFault));
        mgr.report_com_connection_count(0, 1.0);
        assert!(mgr.summary_system.summary.get(FaultBit::CrioCommFault));
        mgr.report_com_connection_count(1, 2.0);
        assert!(!mgr.summary_system.summary.get(FaultBit::CrioCommFault));
    }

    #[test]
    fn reset_faults_clears_masked_bits_everywhere() {
        let mut mgr = FaultMgr::new();
        let mut current = FaultBitmap::new();
        current.set_bit(FaultBit::MotorVoltageFault, true);
        mgr.update_power_faults(current, 1.0);
        mgr.reset_faults(FaultBit::MotorVoltageFault.mask());
        assert!(!mgr.summary_system.summary.get(FaultBit::MotorVoltageFault));
        assert!(!mgr.power.summary.get(FaultBit::MotorVoltageFault));
    }

    #[test]
    fn report_motion_staleness_raises_and_clears() {
        let mut mgr = FaultMgr::new();
        mgr.report_motion_staleness(Some(FaultBit::StaleDataWarn), 1.0);
        assert!(mgr.summary_system.summary.get(FaultBit::StaleDataWarn));
        mgr.report_motion_staleness(None, 2.0);
        assert!(!mgr.summary_system.summary.get(FaultBit::StaleDataWarn));
    }

    #[test]
    fn enable_faults_in_mask_reports_only_newly_enabled() {
        let mut mgr = FaultMgr::new();
        let mask = FaultBit::MotorVoltageFault.mask();
        // already enabled by default (fault_enable_mask starts at all-ones).
        let newly = mgr.enable_faults_in_mask(mask);
        assert_eq!(newly, 0);
    }
}
