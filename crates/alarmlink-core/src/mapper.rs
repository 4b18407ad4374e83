// ── Raw state code mapping ──
//
// The panel service reports partition state as a bare integer. Only four
// codes are stable; everything else (0 = unknown, 8 = arming, and any
// undocumented value) leaves the last known state untouched.

use crate::model::{AlarmState, LocalState};

/// Code the service reports while a partition is mid-arm.
pub const ARMING_CODE: i64 = 8;

/// Result of interpreting a raw state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMapping {
    Mapped { local: LocalState, coarse: AlarmState },
    Unmapped { code: i64 },
}

impl StateMapping {
    pub fn local(self) -> Option<LocalState> {
        match self {
            Self::Mapped { local, .. } => Some(local),
            Self::Unmapped { .. } => None,
        }
    }
}

/// Map a raw partition state code.
///
/// | code | local         | coarse           |
/// |------|---------------|------------------|
/// | 1    | `disarmed`    | `disarmed`       |
/// | 2    | `armed_stay`  | `partially_armed`|
/// | 3    | `armed_away`  | `armed`          |
/// | 4    | `armed_night` | `partially_armed`|
pub fn map_code(code: i64) -> StateMapping {
    let local = match code {
        1 => LocalState::Disarmed,
        2 => LocalState::ArmedStay,
        3 => LocalState::ArmedAway,
        4 => LocalState::ArmedNight,
        _ => return StateMapping::Unmapped { code },
    };
    StateMapping::Mapped {
        local,
        coarse: local.coarse(),
    }
}
