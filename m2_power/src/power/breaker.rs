//! Breaker feed-group decoding (`check_breaker_status`).

use m2_common::bitmap::{InputPortBits, COMM_BREAKER_FEEDS, MOTOR_BREAKER_FEEDS};
use m2_common::fault::Bus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStatus {
    Ok,
    Warning,
    Fault,
}

/// Decode one 3-bit feed value. `7` (all bits set) is `Ok`; `{3,5,6}` (two
/// of three bits set) is `Warning`; `{0,1,2,4}` is `Fault`.
fn decode_feed(value: u8) -> BreakerStatus {
    match value {
        7 => BreakerStatus::Ok,
        3 | 5 | 6 => BreakerStatus::Warning,
        0 | 1 | 2 | 4 => BreakerStatus::Fault,
        _ => BreakerStatus::Fault,
    }
}

fn combine(feeds: [BreakerStatus; 3]) -> BreakerStatus {
    if feeds.iter().all(|f| *f == BreakerStatus::Ok) {
        BreakerStatus::Ok
    } else if feeds.iter().any(|f| *f == BreakerStatus::Fault) {
        BreakerStatus::Fault
    } else {
        BreakerStatus::Warning
    }
}

/// Overall breaker status for a bus: `Ok` iff all three feeds report
/// `Ok`, `Fault` iff any feed reports `Fault`, else `Warning`.
pub fn check_breaker_status(bus: Bus, input: &InputPortBits) -> BreakerStatus {
    match bus {
        Bus::Motor => {
            let feeds = MOTOR_BREAKER_FEEDS.map(|group| {
                let value = group
                    .iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, pos)| acc | ((input.get_pos(*pos) as u8) << i));
                decode_feed(value)
            });
            combine(feeds)
        }
        Bus::Comm => {
            // The COMM bus reports only two physical bits per feed. The
            // source synthesizes the third (MSB) bit as always-1; the
            // physical reason is undocumented and is retained verbatim.
            let feeds = COMM_BREAKER_FEEDS.map(|group| {
                let physical = group
                    .iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, pos)| acc | ((input.get_pos(*pos) as u8) << i));
                decode_feed(physical | 0b100)
            });
            combine(feeds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use m2_common::bitmap::MOTOR_BREAKER_FEEDS;

    #[test]
    fn all_bits_set_is_ok() {
        let mut input = InputPortBits::new();
        for group in MOTOR_BREAKER_FEEDS {
            for pos in group {
                input.set_pos(pos, true);
            }
        }
        assert_eq!(check_breaker_status(Bus::Motor, &input), BreakerStatus::Ok);
    }

    #[test]
    fn no_bits_set_is_fault() {
        let input = InputPortBits::new();
        assert_eq!(
            check_breaker_status(Bus::Motor, &input),
            BreakerStatus::Fault
        );
    }

    #[test]
    fn single_feed_two_of_three_is_warning_overall() {
        let mut input = InputPortBits::new();
        // First feed gets two of three bits (value 6 -> warning); others all-ok.
        input.set_pos(MOTOR_BREAKER_FEEDS[0][1], true);
        input.set_pos(MOTOR_BREAKER_FEEDS[0][2], true);
        for group in &MOTOR_BREAKER_FEEDS[1..] {
            for pos in *group {
                input.set_pos(pos, true);
            }
        }
        assert_eq!(
            check_breaker_status(Bus::Motor, &input),
            BreakerStatus::Warning
        );
    }

    #[test]
    fn any_fault_feed_makes_overall_fault_even_if_others_ok() {
        let mut input = InputPortBits::new();
        for group in &MOTOR_BREAKER_FEEDS[1..] {
            for pos in *group {
                input.set_pos(pos, true);
            }
        }
        // feed 0 left all-zero -> fault.
        assert_eq!(
            check_breaker_status(Bus::Motor, &input),
            BreakerStatus::Fault
        );
    }

    #[test]
    fn comm_synthesizes_third_bit_so_both_physical_bits_set_is_ok() {
        let mut input = InputPortBits::new();
        for group in COMM_BREAKER_FEEDS {
            for pos in group {
                input.set_pos(pos, true);
            }
        }
        assert_eq!(check_breaker_status(Bus::Comm, &input), BreakerStatus::Ok);
    }

    #[test]
    fn comm_no_physical_bits_set_is_fault() {
        // physical=00 | synthesized bit = 0b100 = 4 -> fault per decode_feed.
        let input = InputPortBits::new();
        assert_eq!(
            check_breaker_status(Bus::Comm, &input),
            BreakerStatus::Fault
        );
    }

    #[test]
    fn comm_one_physical_bit_set_is_warning() {
        let mut input = InputPortBits::new();
        input.set_pos(COMM_BREAKER_FEEDS[0][0], true);
        for group in &COMM_BREAKER_FEEDS[1..] {
            for pos in *group {
                input.set_pos(pos, true);
            }
        }
        assert_eq!(
            check_breaker_status(Bus::Comm, &input),
            BreakerStatus::Warning
        );
    }
}
