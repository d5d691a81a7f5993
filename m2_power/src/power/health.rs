//! General power-supply health checks, decomposed out of
//! `queue_daq_info_read` (`PS_GeneralHealth` in the source this was
//! ported from).

use m2_common::bitmap::{InputPortBits, InputPortPos};
use m2_common::fault::{FaultBit, FaultBitmap};

/// `POWER_SUPPLY_LOAD_SHARE_ERR` and `POWER_HEALTH_FAULT`, derived purely
/// from the current `InputPortBits`.
pub fn general_health_faults(input: &InputPortBits) -> FaultBitmap {
    let mut out = FaultBitmap::new();

    let redundancy_ok = input.get_pos(InputPortPos::RedundancyOk);
    let load_distribution_ok = input.get_pos(InputPortPos::LoadDistributionOk);
    out.set_bit(
        FaultBit::PowerSupplyLoadShareErr,
        !(redundancy_ok && load_distribution_ok),
    );

    // *_CURRENT_OK bits are active-low: set means "not ok".
    let dc_ok = input.get_pos(InputPortPos::PowerSupply1DcOk)
        && input.get_pos(InputPortPos::PowerSupply2DcOk);
    let boost_current_fault = input.get_pos(InputPortPos::PowerSupply1CurrentOk)
        || input.get_pos(InputPortPos::PowerSupply2CurrentOk);
    out.set_bit(FaultBit::PowerHealthFault, !dc_ok || boost_current_fault);

    out
}
